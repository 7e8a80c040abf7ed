//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Single-entity lookups return
//! [`WardenError::NotFound`](crate::error::WardenError::NotFound) when the
//! row is missing; list operations return an empty collection instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::{
    group::{CreateGroup, Group, GroupMemberView, UpdateGroup},
    resource::{CreateResource, Grantee, GranteeKind, ResourceNode},
    role::{CreateRole, Role, RoleMember, RoleMemberRef, UpdateRole},
    title::{CreateTitle, Title},
    user::{CreateUser, UpdateUser, User, UserSummary},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Pagination {
    /// Build from a caller-supplied 1-based page number and page size.
    ///
    /// Values are never trusted: the page is clamped to at least 1, a
    /// non-positive size falls back to `default_size`, and the size is
    /// capped at `max_size`.
    pub fn from_page(page: i64, page_size: i64, default_size: u64, max_size: u64) -> Self {
        let max_size = max_size.max(1);
        let limit = if page_size <= 0 {
            default_size
        } else {
            page_size as u64
        }
        .clamp(1, max_size);
        let page = page.max(1) as u64;
        Self {
            offset: (page - 1).saturating_mul(limit),
            limit,
        }
    }
}

/// Raw paging values as supplied by a caller. Never used in a query
/// directly; see [`PageRequest::clamp`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    pub fn clamp(self, default_size: u64, max_size: u64) -> Pagination {
        Pagination::from_page(self.page, self.page_size, default_size, max_size)
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// Page through a fully materialised, already ordered list.
    pub fn from_items(items: Vec<T>, pagination: Pagination) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Self {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Principals
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    /// Soft-enable or soft-disable a user. Returns whether a row matched.
    fn set_validity(
        &self,
        id: Uuid,
        validity: bool,
    ) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Valid users ordered by login name, optionally filtered by a
    /// substring of name or login name.
    fn list(
        &self,
        search: Option<String>,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<User>>> + Send;
}

pub trait GroupRepository: Send + Sync {
    /// Insert a group and return it, including its generated key.
    fn create(&self, input: CreateGroup) -> impl Future<Output = WardenResult<Group>> + Send;
    /// Administrative lookup, not filtered by visibility.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Group>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = WardenResult<Group>> + Send;
    /// Delete a non-built-in group. Returns `false` when nothing was removed.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Visible groups in creation order.
    fn list_visible(&self) -> impl Future<Output = WardenResult<Vec<Group>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_name(&self, name: String) -> impl Future<Output = WardenResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = WardenResult<Role>> + Send;
    /// Delete a non-built-in role with its membership rows and grants.
    /// Returns `false` when nothing was removed.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Roles in creation order, optionally filtered by a name substring.
    fn list(
        &self,
        search: Option<String>,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Role>>> + Send;
}

pub trait TitleRepository: Send + Sync {
    fn create(&self, input: CreateTitle) -> impl Future<Output = WardenResult<Title>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Title>> + Send;
    fn list(&self) -> impl Future<Output = WardenResult<Vec<Title>>> + Send;
    fn add_user(
        &self,
        title_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn remove_user(
        &self,
        title_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Membership store
// ---------------------------------------------------------------------------

pub trait GroupMemberRepository: Send + Sync {
    /// Insert one membership row per user id as a single atomic batch.
    /// An empty `user_ids` succeeds without touching storage.
    fn add_group_members(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Delete membership rows by relation id as a single atomic batch.
    /// Returns `true` iff at least one row was removed.
    fn remove_group_members(
        &self,
        membership_ids: Vec<Uuid>,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    /// All memberships of valid users in visible groups, in user creation order.
    fn list_group_members(
        &self,
    ) -> impl Future<Output = WardenResult<Vec<GroupMemberView>>> + Send;

    /// Valid, non-system users not in the group, ordered by login name.
    fn list_eligible_users(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<UserSummary>>> + Send;

    /// Visible groups the user belongs to.
    fn get_user_groups(&self, user_id: Uuid)
    -> impl Future<Output = WardenResult<Vec<Group>>> + Send;
}

pub trait RoleMemberRepository: Send + Sync {
    /// Insert one role membership row per reference as a single atomic batch.
    fn add_role_members(
        &self,
        role_id: Uuid,
        creator_id: Uuid,
        members: Vec<RoleMemberRef>,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    fn remove_role_member(
        &self,
        membership_id: Uuid,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Membership rows of a role whose member is still listable (valid user,
    /// existing title, visible group), in creation order.
    fn list_role_members(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<RoleMember>>> + Send;

    /// Distinct valid users reachable through any membership path, ordered
    /// by login name.
    fn list_role_member_users(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<UserSummary>>> + Send;

    fn list_eligible_titles(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Title>>> + Send;

    fn list_eligible_groups(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Group>>> + Send;

    fn list_eligible_role_users(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<UserSummary>>> + Send;

    /// Roles the user reaches directly, through a title, or through a group.
    fn get_user_roles(&self, user_id: Uuid) -> impl Future<Output = WardenResult<Vec<Role>>> + Send;
}

// ---------------------------------------------------------------------------
// Permission catalog
// ---------------------------------------------------------------------------

pub trait ResourceRepository: Send + Sync {
    fn create(
        &self,
        input: CreateResource,
    ) -> impl Future<Output = WardenResult<ResourceNode>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<ResourceNode>> + Send;
    /// The whole catalog, or only the nodes of one application.
    fn list(
        &self,
        app_id: Option<Uuid>,
    ) -> impl Future<Output = WardenResult<Vec<ResourceNode>>> + Send;
    fn grant(
        &self,
        grantee: Grantee,
        resource_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn revoke(
        &self,
        grantee: Grantee,
        resource_id: Uuid,
    ) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Resource ids granted to any of the given principals of one kind.
    /// May contain duplicates; callers dedup by resource id.
    fn granted_resource_ids(
        &self,
        kind: GranteeKind,
        grantee_ids: Vec<Uuid>,
    ) -> impl Future<Output = WardenResult<Vec<Uuid>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_page_clamps_caller_values() {
        assert_eq!(
            Pagination::from_page(0, 0, 20, 100),
            Pagination {
                offset: 0,
                limit: 20
            }
        );
        assert_eq!(
            Pagination::from_page(-3, 10_000, 20, 100),
            Pagination {
                offset: 0,
                limit: 100
            }
        );
        assert_eq!(
            Pagination::from_page(3, 15, 20, 100),
            Pagination {
                offset: 30,
                limit: 15
            }
        );
    }

    #[test]
    fn page_request_defaults_to_first_page() {
        let pagination = PageRequest::default().clamp(20, 100);
        assert_eq!(pagination.offset, 0);
        assert_eq!(pagination.limit, 20);
    }

    #[test]
    fn from_items_slices_and_keeps_total() {
        let page = PaginatedResult::from_items(
            (1..=7).collect::<Vec<u32>>(),
            Pagination {
                offset: 5,
                limit: 5,
            },
        );
        assert_eq!(page.items, vec![6, 7]);
        assert_eq!(page.total, 7);
    }
}
