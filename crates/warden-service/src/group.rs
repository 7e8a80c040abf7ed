//! Group manager: CRUD over user groups and their member sets.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::group::{CreateGroup, Group, GroupListItem, GroupMemberView, UpdateGroup};
use warden_core::models::user::UserSummary;
use warden_core::outcome::Outcome;
use warden_core::repository::{GroupMemberRepository, GroupRepository};

/// Drop repeated ids, keeping the first occurrence of each.
pub(crate) fn dedup_ordered<T: Copy + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}

pub(crate) fn required_name(field: &str, raw: &str) -> WardenResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(WardenError::validation(format!("{field} is required")));
    }
    Ok(name.to_string())
}

/// Manages user groups.
///
/// Generic over the group and membership repositories so the manager
/// has no dependency on the database crate.
pub struct GroupManager<G: GroupRepository, M: GroupMemberRepository> {
    groups: G,
    members: M,
}

impl<G: GroupRepository, M: GroupMemberRepository> GroupManager<G, M> {
    pub fn new(groups: G, members: M) -> Self {
        Self { groups, members }
    }

    /// Create a regular, visible group and return its id.
    pub async fn create_group(
        &self,
        creator_id: Uuid,
        name: &str,
        description: &str,
    ) -> WardenResult<Uuid> {
        let name = required_name("group name", name)?;
        let group = self
            .groups
            .create(CreateGroup::new(creator_id, name, description.trim()))
            .await?;
        info!(group_id = %group.id, %creator_id, "Group created");
        Ok(group.id)
    }

    /// Delete a group. Built-in and unknown groups are left alone and
    /// reported as having no effect.
    pub async fn delete_group(&self, group_id: Uuid) -> WardenResult<Outcome<()>> {
        if self.groups.delete(group_id).await? {
            info!(%group_id, "Group deleted");
            return Ok(Outcome::Done(()));
        }

        match self.groups.get_by_id(group_id).await {
            Ok(group) if group.built_in => {
                warn!(%group_id, "Refusing to delete built-in group");
                Ok(Outcome::no_effect("group is built-in"))
            }
            Ok(_) | Err(WardenError::NotFound { .. }) => {
                Ok(Outcome::no_effect("group does not exist"))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_group(
        &self,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> WardenResult<Outcome<Group>> {
        let input = UpdateGroup {
            name: input
                .name
                .map(|n| required_name("group name", &n))
                .transpose()?,
            description: input.description.map(|d| d.trim().to_string()),
        };

        match self.groups.update(group_id, input).await {
            Ok(group) => Ok(Outcome::Done(group)),
            Err(WardenError::NotFound { .. }) => Ok(Outcome::no_effect("group does not exist")),
            Err(e) => Err(e),
        }
    }

    /// Administrative lookup; hidden groups are returned too.
    pub async fn get_group(&self, group_id: Uuid) -> WardenResult<Group> {
        self.groups.get_by_id(group_id).await
    }

    pub async fn list_groups(&self) -> WardenResult<Vec<GroupListItem>> {
        let groups = self.groups.list_visible().await?;
        Ok(groups.iter().map(Group::list_item).collect())
    }

    /// Add users to a group in one atomic batch.
    ///
    /// An empty set succeeds without touching storage. Ids repeated in
    /// `user_ids` are written once.
    pub async fn add_members(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> WardenResult<bool> {
        if user_ids.is_empty() {
            return Ok(true);
        }
        self.groups.get_by_id(group_id).await?;

        let user_ids = dedup_ordered(user_ids);
        debug!(%group_id, count = user_ids.len(), "Adding group members");
        self.members
            .add_group_members(group_id, creator_id, user_ids)
            .await
    }

    pub async fn remove_members(&self, membership_ids: Vec<Uuid>) -> WardenResult<Outcome<()>> {
        let membership_ids = dedup_ordered(membership_ids);
        if self.members.remove_group_members(membership_ids).await? {
            Ok(Outcome::Done(()))
        } else {
            Ok(Outcome::no_effect("no membership matched"))
        }
    }

    pub async fn list_members(&self) -> WardenResult<Vec<GroupMemberView>> {
        self.members.list_group_members().await
    }

    pub async fn eligible_users(&self, group_id: Uuid) -> WardenResult<Vec<UserSummary>> {
        self.members.list_eligible_users(group_id).await
    }

    /// Visible groups the user belongs to.
    pub async fn user_groups(&self, user_id: Uuid) -> WardenResult<Vec<GroupListItem>> {
        let groups = self.members.get_user_groups(user_id).await?;
        Ok(groups.iter().map(Group::list_item).collect())
    }
}
