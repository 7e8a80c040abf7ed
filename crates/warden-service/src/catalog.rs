//! Permission resource catalog administration and grants.

use tracing::info;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::resource::{CreateResource, Grantee, ResourceNode};
use warden_core::outcome::Outcome;
use warden_core::repository::ResourceRepository;

use crate::group::{dedup_ordered, required_name};

pub struct PermissionCatalog<P: ResourceRepository> {
    resources: P,
}

impl<P: ResourceRepository> PermissionCatalog<P> {
    pub fn new(resources: P) -> Self {
        Self { resources }
    }

    pub async fn create_resource(&self, input: CreateResource) -> WardenResult<ResourceNode> {
        let input = CreateResource {
            name: required_name("resource name", &input.name)?,
            alias: input.alias.trim().to_string(),
            ..input
        };
        let node = self.resources.create(input).await?;
        info!(resource_id = %node.id, node_type = %node.node_type, "Resource created");
        Ok(node)
    }

    pub async fn list_resources(&self, app_id: Option<Uuid>) -> WardenResult<Vec<ResourceNode>> {
        self.resources.list(app_id).await
    }

    pub async fn grant(&self, grantee: Grantee, resource_id: Uuid) -> WardenResult<()> {
        self.resources.grant(grantee, resource_id).await?;
        info!(
            grantee_kind = grantee.kind.as_str(),
            grantee_id = %grantee.id,
            %resource_id,
            "Resource granted"
        );
        Ok(())
    }

    pub async fn revoke(&self, grantee: Grantee, resource_id: Uuid) -> WardenResult<Outcome<()>> {
        if self.resources.revoke(grantee, resource_id).await? {
            Ok(Outcome::Done(()))
        } else {
            Ok(Outcome::no_effect("resource was not granted"))
        }
    }

    /// Resources granted directly to one principal.
    pub async fn granted_resource_ids(&self, grantee: Grantee) -> WardenResult<Vec<Uuid>> {
        let ids = self
            .resources
            .granted_resource_ids(grantee.kind, vec![grantee.id])
            .await?;
        Ok(dedup_ordered(ids))
    }
}
