//! Permission resolution for roles.
//!
//! A role holds the resources granted to it directly plus those granted to
//! the groups and job titles that are its members. Each path is read with
//! its own query and the results are unioned by resource id, so a
//! resource reached twice shows up once.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::resource::GranteeKind;
use warden_core::models::role::MemberKind;
use warden_core::repository::{ResourceRepository, RoleMemberRepository, RoleRepository};

use crate::tree::{PermissionNode, TreeMode, build_tree};

pub struct PermissionResolver<R: RoleRepository, M: RoleMemberRepository, P: ResourceRepository> {
    roles: R,
    members: M,
    resources: P,
}

impl<R, M, P> PermissionResolver<R, M, P>
where
    R: RoleRepository,
    M: RoleMemberRepository,
    P: ResourceRepository,
{
    pub fn new(roles: R, members: M, resources: P) -> Self {
        Self {
            roles,
            members,
            resources,
        }
    }

    /// `false` for unknown roles, which resolve to an empty tree.
    async fn role_exists(&self, role_id: Uuid) -> WardenResult<bool> {
        match self.roles.get_by_id(role_id).await {
            Ok(_) => Ok(true),
            Err(WardenError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Union of resource ids granted along every membership path.
    pub async fn effective_resource_ids(&self, role_id: Uuid) -> WardenResult<HashSet<Uuid>> {
        let members = self.members.list_role_members(role_id).await?;
        let ids_of = |kind: MemberKind| -> Vec<Uuid> {
            members
                .iter()
                .filter(|m| m.member.kind == kind)
                .map(|m| m.member.id)
                .collect()
        };

        let direct = self
            .resources
            .granted_resource_ids(GranteeKind::Role, vec![role_id])
            .await?;
        let via_groups = self
            .resources
            .granted_resource_ids(GranteeKind::Group, ids_of(MemberKind::Group))
            .await?;
        let via_titles = self
            .resources
            .granted_resource_ids(GranteeKind::Title, ids_of(MemberKind::Title))
            .await?;

        debug!(
            %role_id,
            direct = direct.len(),
            via_groups = via_groups.len(),
            via_titles = via_titles.len(),
            "Resolved grant paths"
        );
        Ok(direct
            .into_iter()
            .chain(via_groups)
            .chain(via_titles)
            .collect())
    }

    /// Effective permissions: granted nodes and the ancestors needed to
    /// attach them, optionally scoped to one application. Applications
    /// without any grant are left out.
    pub async fn resolve_permission_tree(
        &self,
        role_id: Uuid,
        app_id: Option<Uuid>,
    ) -> WardenResult<Vec<PermissionNode>> {
        if !self.role_exists(role_id).await? {
            return Ok(Vec::new());
        }
        let granted = self.effective_resource_ids(role_id).await?;
        if granted.is_empty() {
            return Ok(Vec::new());
        }

        let catalog = self.resources.list(app_id).await?;
        let tree = build_tree(&catalog, &granted, TreeMode::Effective);
        debug!(%role_id, granted = granted.len(), applications = tree.len(), "Effective tree built");
        Ok(tree)
    }

    /// Editable tree: the full catalog (or one application) with every
    /// node flagged, including applications the role has nothing in.
    pub async fn editable_permission_tree(
        &self,
        role_id: Uuid,
        app_id: Option<Uuid>,
    ) -> WardenResult<Vec<PermissionNode>> {
        if !self.role_exists(role_id).await? {
            return Ok(Vec::new());
        }
        let granted = self.effective_resource_ids(role_id).await?;
        let catalog = self.resources.list(app_id).await?;
        Ok(build_tree(&catalog, &granted, TreeMode::Editable))
    }
}
