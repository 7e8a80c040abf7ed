//! Endpoint contract.
//!
//! Handlers of whatever transport sits in front of warden call into
//! [`AdminApi`] with raw string identifiers and the caller's id. Every
//! identifier is validated before storage is touched, and every result is
//! wrapped in an [`Envelope`] so callers can tell success, "no effect"
//! and failure apart.

use serde::Deserialize;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult, parse_id};
use warden_core::models::group::{Group, GroupListItem, GroupMemberView, UpdateGroup};
use warden_core::models::resource::{CreateResource, Grantee, GranteeKind, NodeType, ResourceNode};
use warden_core::models::role::{MemberKind, Role, RoleMember, RoleMemberRef, UpdateRole};
use warden_core::models::title::Title;
use warden_core::models::user::{UpdateUser, User, UserSummary};
use warden_core::outcome::Envelope;
use warden_core::repository::{
    GroupMemberRepository, GroupRepository, PageRequest, PaginatedResult, ResourceRepository,
    RoleMemberRepository, RoleRepository, TitleRepository, UserRepository,
};

use crate::catalog::PermissionCatalog;
use crate::config::ServiceConfig;
use crate::group::GroupManager;
use crate::resolver::PermissionResolver;
use crate::role::RoleManager;
use crate::title::TitleManager;
use crate::tree::PermissionNode;
use crate::user::UserManager;

/// One `{kind, id}` entry of an add-role-members request.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberInput {
    pub kind: String,
    pub id: String,
}

impl MemberInput {
    pub fn new(kind: MemberKind, id: Uuid) -> Self {
        Self {
            kind: kind.as_str().into(),
            id: id.to_string(),
        }
    }

    fn parse(&self) -> WardenResult<RoleMemberRef> {
        let kind = self
            .kind
            .trim()
            .parse::<MemberKind>()
            .map_err(WardenError::validation)?;
        Ok(RoleMemberRef {
            kind,
            id: parse_id("member id", &self.id)?,
        })
    }
}

fn parse_ids(field: &str, raw: &[String]) -> WardenResult<Vec<Uuid>> {
    raw.iter().map(|r| parse_id(field, r)).collect()
}

fn parse_opt_id(field: &str, raw: Option<&str>) -> WardenResult<Option<Uuid>> {
    raw.map(|r| parse_id(field, r)).transpose()
}

fn parse_grantee(kind: &str, id: &str) -> WardenResult<Grantee> {
    Ok(Grantee {
        kind: kind
            .trim()
            .parse::<GranteeKind>()
            .map_err(WardenError::validation)?,
        id: parse_id("grantee id", id)?,
    })
}

/// Every administrative operation, behind string ids and envelopes.
pub struct AdminApi<U, G, R, T, P, M>
where
    U: UserRepository,
    G: GroupRepository,
    R: RoleRepository + Clone,
    T: TitleRepository,
    P: ResourceRepository + Clone,
    M: GroupMemberRepository + RoleMemberRepository + Clone,
{
    users: UserManager<U, M>,
    groups: GroupManager<G, M>,
    roles: RoleManager<R, M>,
    titles: TitleManager<T>,
    catalog: PermissionCatalog<P>,
    resolver: PermissionResolver<R, M, P>,
}

impl<U, G, R, T, P, M> AdminApi<U, G, R, T, P, M>
where
    U: UserRepository,
    G: GroupRepository,
    R: RoleRepository + Clone,
    T: TitleRepository,
    P: ResourceRepository + Clone,
    M: GroupMemberRepository + RoleMemberRepository + Clone,
{
    pub fn new(
        users: U,
        groups: G,
        roles: R,
        titles: T,
        resources: P,
        members: M,
        config: ServiceConfig,
    ) -> Self {
        Self {
            users: UserManager::new(users, members.clone(), config.clone()),
            groups: GroupManager::new(groups, members.clone()),
            roles: RoleManager::new(roles.clone(), members.clone(), config),
            titles: TitleManager::new(titles),
            catalog: PermissionCatalog::new(resources.clone()),
            resolver: PermissionResolver::new(roles, members, resources),
        }
    }

    // -------------------------------------------------------------------
    // Groups
    // -------------------------------------------------------------------

    pub async fn create_group(&self, caller: Uuid, name: &str, description: &str) -> Envelope<Uuid> {
        Envelope::from_result(self.groups.create_group(caller, name, description).await)
    }

    pub async fn delete_group(&self, group_id: &str) -> Envelope<()> {
        let result = async {
            let group_id = parse_id("group id", group_id)?;
            self.groups.delete_group(group_id).await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn update_group(
        &self,
        group_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Envelope<Group> {
        let result = async {
            let group_id = parse_id("group id", group_id)?;
            self.groups
                .update_group(group_id, UpdateGroup { name, description })
                .await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn get_group(&self, group_id: &str) -> Envelope<Group> {
        let result = async {
            let group_id = parse_id("group id", group_id)?;
            self.groups.get_group(group_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_groups(&self) -> Envelope<Vec<GroupListItem>> {
        Envelope::from_result(self.groups.list_groups().await)
    }

    pub async fn add_group_members(
        &self,
        caller: Uuid,
        group_id: &str,
        user_ids: &[String],
    ) -> Envelope<bool> {
        let result = async {
            let group_id = parse_id("group id", group_id)?;
            let user_ids = parse_ids("user id", user_ids)?;
            self.groups.add_members(group_id, caller, user_ids).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn remove_members(&self, membership_ids: &[String]) -> Envelope<()> {
        let result = async {
            let ids = parse_ids("membership id", membership_ids)?;
            self.groups.remove_members(ids).await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn list_group_members(&self) -> Envelope<Vec<GroupMemberView>> {
        Envelope::from_result(self.groups.list_members().await)
    }

    pub async fn list_eligible_users(&self, group_id: &str) -> Envelope<Vec<UserSummary>> {
        let result = async {
            let group_id = parse_id("group id", group_id)?;
            self.groups.eligible_users(group_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn get_user_groups(&self, user_id: &str) -> Envelope<Vec<GroupListItem>> {
        let result = async {
            let user_id = parse_id("user id", user_id)?;
            self.groups.user_groups(user_id).await
        };
        Envelope::from_result(result.await)
    }

    // -------------------------------------------------------------------
    // Roles
    // -------------------------------------------------------------------

    pub async fn create_role(&self, caller: Uuid, name: &str, description: &str) -> Envelope<Uuid> {
        Envelope::from_result(self.roles.create_role(caller, name, description).await)
    }

    pub async fn delete_role(&self, role_id: &str) -> Envelope<()> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles.delete_role(role_id).await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn update_role(
        &self,
        role_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Envelope<Role> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles
                .update_role(role_id, UpdateRole { name, description })
                .await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn get_role(&self, role_id: &str) -> Envelope<Role> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles.get_role(role_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_roles(
        &self,
        page: i64,
        page_size: i64,
        search_key: Option<String>,
    ) -> Envelope<PaginatedResult<Role>> {
        Envelope::from_result(
            self.roles
                .list_roles(PageRequest::new(page, page_size), search_key)
                .await,
        )
    }

    pub async fn add_role_members(
        &self,
        caller: Uuid,
        role_id: &str,
        members: &[MemberInput],
    ) -> Envelope<bool> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            let members = members
                .iter()
                .map(MemberInput::parse)
                .collect::<WardenResult<Vec<_>>>()?;
            self.roles.add_members(role_id, caller, members).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn remove_role_member(&self, membership_id: &str) -> Envelope<()> {
        let result = async {
            let id = parse_id("membership id", membership_id)?;
            self.roles.remove_member(id).await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn list_role_members(&self, role_id: &str) -> Envelope<Vec<RoleMember>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles.list_members(role_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_role_member_users(
        &self,
        role_id: &str,
        page: i64,
        page_size: i64,
    ) -> Envelope<PaginatedResult<UserSummary>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles
                .list_member_users(role_id, PageRequest::new(page, page_size))
                .await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_eligible_titles(&self, role_id: &str) -> Envelope<Vec<Title>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles.eligible_titles(role_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_eligible_groups(&self, role_id: &str) -> Envelope<Vec<Group>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles.eligible_groups(role_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_eligible_role_users(&self, role_id: &str) -> Envelope<Vec<UserSummary>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            self.roles.eligible_users(role_id).await
        };
        Envelope::from_result(result.await)
    }

    // -------------------------------------------------------------------
    // Permission resolution
    // -------------------------------------------------------------------

    pub async fn resolve_permission_tree(
        &self,
        role_id: &str,
        app_id: Option<&str>,
    ) -> Envelope<Vec<PermissionNode>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            let app_id = parse_opt_id("application id", app_id)?;
            self.resolver.resolve_permission_tree(role_id, app_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn editable_permission_tree(
        &self,
        role_id: &str,
        app_id: Option<&str>,
    ) -> Envelope<Vec<PermissionNode>> {
        let result = async {
            let role_id = parse_id("role id", role_id)?;
            let app_id = parse_opt_id("application id", app_id)?;
            self.resolver.editable_permission_tree(role_id, app_id).await
        };
        Envelope::from_result(result.await)
    }

    // -------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------

    pub async fn create_user(
        &self,
        caller: Uuid,
        name: &str,
        login_name: &str,
        description: &str,
        user_type: u32,
    ) -> Envelope<User> {
        Envelope::from_result(
            self.users
                .create_user(Some(caller), name, login_name, description, user_type)
                .await,
        )
    }

    pub async fn get_user(&self, user_id: &str) -> Envelope<User> {
        let result = async {
            let user_id = parse_id("user id", user_id)?;
            self.users.get_user(user_id).await
        };
        Envelope::from_result(result.await)
    }

    /// The signed-in caller's own record.
    pub async fn get_myself(&self, caller: Uuid) -> Envelope<User> {
        Envelope::from_result(self.users.get_user(caller).await)
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Envelope<User> {
        let result = async {
            let user_id = parse_id("user id", user_id)?;
            self.users
                .update_user(user_id, UpdateUser { name, description })
                .await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn set_user_validity(&self, user_id: &str, validity: bool) -> Envelope<()> {
        let result = async {
            let user_id = parse_id("user id", user_id)?;
            self.users.set_validity(user_id, validity).await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn list_users(
        &self,
        page: i64,
        page_size: i64,
        search_key: Option<String>,
    ) -> Envelope<PaginatedResult<User>> {
        Envelope::from_result(
            self.users
                .list_users(PageRequest::new(page, page_size), search_key)
                .await,
        )
    }

    pub async fn get_user_roles(&self, user_id: &str) -> Envelope<Vec<Role>> {
        let result = async {
            let user_id = parse_id("user id", user_id)?;
            self.users.get_user_roles(user_id).await
        };
        Envelope::from_result(result.await)
    }

    // -------------------------------------------------------------------
    // Titles
    // -------------------------------------------------------------------

    pub async fn create_title(&self, name: &str, description: &str) -> Envelope<Title> {
        Envelope::from_result(self.titles.create_title(name, description).await)
    }

    pub async fn list_titles(&self) -> Envelope<Vec<Title>> {
        Envelope::from_result(self.titles.list_titles().await)
    }

    pub async fn assign_user_to_title(&self, title_id: &str, user_id: &str) -> Envelope<()> {
        let result = async {
            let title_id = parse_id("title id", title_id)?;
            let user_id = parse_id("user id", user_id)?;
            self.titles.assign_user(title_id, user_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn remove_user_from_title(&self, title_id: &str, user_id: &str) -> Envelope<()> {
        let result = async {
            let title_id = parse_id("title id", title_id)?;
            let user_id = parse_id("user id", user_id)?;
            self.titles.remove_user(title_id, user_id).await
        };
        Envelope::from_outcome(result.await)
    }

    // -------------------------------------------------------------------
    // Permission catalog
    // -------------------------------------------------------------------

    pub async fn create_resource(
        &self,
        parent_id: Option<&str>,
        node_type: &str,
        name: &str,
        alias: &str,
        sort_index: u32,
    ) -> Envelope<ResourceNode> {
        let result = async {
            let input = CreateResource {
                parent_id: parse_opt_id("parent id", parent_id)?,
                node_type: node_type
                    .trim()
                    .parse::<NodeType>()
                    .map_err(WardenError::validation)?,
                name: name.into(),
                alias: alias.into(),
                sort_index,
            };
            self.catalog.create_resource(input).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn list_resources(&self, app_id: Option<&str>) -> Envelope<Vec<ResourceNode>> {
        let result = async {
            let app_id = parse_opt_id("application id", app_id)?;
            self.catalog.list_resources(app_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn grant(&self, grantee_kind: &str, grantee_id: &str, resource_id: &str) -> Envelope<()> {
        let result = async {
            let grantee = parse_grantee(grantee_kind, grantee_id)?;
            let resource_id = parse_id("resource id", resource_id)?;
            self.catalog.grant(grantee, resource_id).await
        };
        Envelope::from_result(result.await)
    }

    pub async fn revoke(&self, grantee_kind: &str, grantee_id: &str, resource_id: &str) -> Envelope<()> {
        let result = async {
            let grantee = parse_grantee(grantee_kind, grantee_id)?;
            let resource_id = parse_id("resource id", resource_id)?;
            self.catalog.revoke(grantee, resource_id).await
        };
        Envelope::from_outcome(result.await)
    }

    pub async fn granted_resource_ids(&self, grantee_kind: &str, grantee_id: &str) -> Envelope<Vec<Uuid>> {
        let result = async {
            let grantee = parse_grantee(grantee_kind, grantee_id)?;
            self.catalog.granted_resource_ids(grantee).await
        };
        Envelope::from_result(result.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_input_rejects_unknown_kind_and_bad_id() {
        let bad_kind = MemberInput {
            kind: "Department".into(),
            id: Uuid::new_v4().to_string(),
        };
        assert!(matches!(bad_kind.parse(), Err(WardenError::Validation { .. })));

        let bad_id = MemberInput {
            kind: "Group".into(),
            id: "".into(),
        };
        assert!(matches!(bad_id.parse(), Err(WardenError::Validation { .. })));

        let id = Uuid::new_v4();
        assert_eq!(
            MemberInput::new(MemberKind::Title, id).parse().unwrap(),
            RoleMemberRef::title(id)
        );
    }

    #[test]
    fn grantee_kind_is_validated() {
        assert!(parse_grantee("User", &Uuid::new_v4().to_string()).is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_grantee(" Group ", &id.to_string()).unwrap(), Grantee::group(id));
    }
}
