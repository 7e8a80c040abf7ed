//! Role manager: role CRUD and membership by user, job title or group.

use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::group::Group;
use warden_core::models::role::{CreateRole, Role, RoleMember, RoleMemberRef, UpdateRole};
use warden_core::models::title::Title;
use warden_core::models::user::UserSummary;
use warden_core::outcome::Outcome;
use warden_core::repository::{
    PageRequest, PaginatedResult, RoleMemberRepository, RoleRepository,
};

use crate::config::ServiceConfig;
use crate::group::{dedup_ordered, required_name};

pub struct RoleManager<R: RoleRepository, M: RoleMemberRepository> {
    roles: R,
    members: M,
    config: ServiceConfig,
}

impl<R: RoleRepository, M: RoleMemberRepository> RoleManager<R, M> {
    pub fn new(roles: R, members: M, config: ServiceConfig) -> Self {
        Self {
            roles,
            members,
            config,
        }
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> WardenResult<()> {
        match self.roles.get_by_name(name.to_string()).await {
            Ok(existing) if Some(existing.id) != except => Err(WardenError::AlreadyExists {
                entity: format!("role '{name}'"),
            }),
            Ok(_) | Err(WardenError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn create_role(
        &self,
        creator_id: Uuid,
        name: &str,
        description: &str,
    ) -> WardenResult<Uuid> {
        let name = required_name("role name", name)?;
        self.ensure_name_free(&name, None).await?;

        let role = self
            .roles
            .create(CreateRole {
                creator_id,
                name,
                description: description.trim().to_string(),
                built_in: false,
            })
            .await?;
        info!(role_id = %role.id, %creator_id, "Role created");
        Ok(role.id)
    }

    /// Delete a role with its memberships and grants. Built-in and unknown
    /// roles are reported as having no effect.
    pub async fn delete_role(&self, role_id: Uuid) -> WardenResult<Outcome<()>> {
        if self.roles.delete(role_id).await? {
            info!(%role_id, "Role deleted");
            return Ok(Outcome::Done(()));
        }

        match self.roles.get_by_id(role_id).await {
            Ok(role) if role.built_in => {
                warn!(%role_id, "Refusing to delete built-in role");
                Ok(Outcome::no_effect("role is built-in"))
            }
            Ok(_) | Err(WardenError::NotFound { .. }) => {
                Ok(Outcome::no_effect("role does not exist"))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_role(
        &self,
        role_id: Uuid,
        input: UpdateRole,
    ) -> WardenResult<Outcome<Role>> {
        let name = input
            .name
            .map(|n| required_name("role name", &n))
            .transpose()?;
        if let Some(name) = &name {
            self.ensure_name_free(name, Some(role_id)).await?;
        }
        let input = UpdateRole {
            name,
            description: input.description.map(|d| d.trim().to_string()),
        };

        match self.roles.update(role_id, input).await {
            Ok(role) => Ok(Outcome::Done(role)),
            Err(WardenError::NotFound { .. }) => Ok(Outcome::no_effect("role does not exist")),
            Err(e) => Err(e),
        }
    }

    pub async fn get_role(&self, role_id: Uuid) -> WardenResult<Role> {
        self.roles.get_by_id(role_id).await
    }

    pub async fn list_roles(
        &self,
        page: PageRequest,
        search_key: Option<String>,
    ) -> WardenResult<PaginatedResult<Role>> {
        self.roles
            .list(search_key, self.config.paginate(page))
            .await
    }

    /// Attach members of any kind to a role in one atomic batch.
    pub async fn add_members(
        &self,
        role_id: Uuid,
        creator_id: Uuid,
        members: Vec<RoleMemberRef>,
    ) -> WardenResult<bool> {
        if members.is_empty() {
            return Ok(true);
        }
        self.roles.get_by_id(role_id).await?;

        let members = dedup_ordered(members);
        debug!(%role_id, count = members.len(), "Adding role members");
        self.members
            .add_role_members(role_id, creator_id, members)
            .await
    }

    pub async fn remove_member(&self, membership_id: Uuid) -> WardenResult<Outcome<()>> {
        if self.members.remove_role_member(membership_id).await? {
            Ok(Outcome::Done(()))
        } else {
            Ok(Outcome::no_effect("no membership matched"))
        }
    }

    pub async fn list_members(&self, role_id: Uuid) -> WardenResult<Vec<RoleMember>> {
        self.members.list_role_members(role_id).await
    }

    /// Users reached through any membership path, one entry per user.
    pub async fn list_member_users(
        &self,
        role_id: Uuid,
        page: PageRequest,
    ) -> WardenResult<PaginatedResult<UserSummary>> {
        let users = self.members.list_role_member_users(role_id).await?;
        Ok(PaginatedResult::from_items(users, self.config.paginate(page)))
    }

    pub async fn eligible_titles(&self, role_id: Uuid) -> WardenResult<Vec<Title>> {
        self.members.list_eligible_titles(role_id).await
    }

    pub async fn eligible_groups(&self, role_id: Uuid) -> WardenResult<Vec<Group>> {
        self.members.list_eligible_groups(role_id).await
    }

    pub async fn eligible_users(&self, role_id: Uuid) -> WardenResult<Vec<UserSummary>> {
        self.members.list_eligible_role_users(role_id).await
    }
}
