//! SurrealDB implementation of [`ResourceRepository`]: the permission
//! resource catalog and the grants attached to its nodes.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::resource::{CreateResource, Grantee, GranteeKind, NodeType, ResourceNode};
use warden_core::repository::ResourceRepository;

use super::{CountRow, HitRow, RefRow, first_count, id_list, parse_opt_uuid, parse_refs, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ResourceRecord {
    record_id: String,
    app_id: String,
    parent_id: Option<String>,
    node_type: String,
    name: String,
    alias: String,
    sort_index: u32,
    created_at: DateTime<Utc>,
}

impl ResourceRecord {
    fn try_into_node(self) -> Result<ResourceNode, DbError> {
        Ok(ResourceNode {
            id: parse_uuid("resource", &self.record_id)?,
            app_id: parse_uuid("application", &self.app_id)?,
            parent_id: parse_opt_uuid("parent", self.parent_id.as_deref())?,
            node_type: self.node_type.parse::<NodeType>().map_err(DbError::Corrupt)?,
            name: self.name,
            alias: self.alias,
            sort_index: self.sort_index,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the permission catalog.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn create(&self, input: CreateResource) -> WardenResult<ResourceNode> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // Applications are roots; everything else hangs off a non-leaf node
        // and inherits its application.
        let app_id = match (input.node_type, input.parent_id) {
            (NodeType::Application, None) => id,
            (NodeType::Application, Some(_)) => {
                return Err(WardenError::validation("an application cannot have a parent"));
            }
            (_, None) => {
                return Err(WardenError::validation(format!(
                    "a {} needs a parent",
                    input.node_type
                )));
            }
            (_, Some(parent_id)) => {
                let parent = self.get_by_id(parent_id).await?;
                if parent.node_type == NodeType::Function {
                    return Err(WardenError::validation("a function cannot have children"));
                }
                parent.app_id
            }
        };

        let result = self
            .db
            .query(
                "CREATE type::record('resource', $id) SET \
                 app_id = $app_id, parent_id = $parent_id, \
                 node_type = $node_type, name = $name, alias = $alias, \
                 sort_index = $sort_index; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('resource', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("app_id", app_id.to_string()))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .bind(("node_type", input.node_type.as_str()))
            .bind(("name", input.name))
            .bind(("alias", input.alias))
            .bind(("sort_index", input.sort_index))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("resource", e))?;

        let rows: Vec<ResourceRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;
        Ok(row.try_into_node()?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<ResourceNode> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('resource', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;
        Ok(row.try_into_node()?)
    }

    async fn list(&self, app_id: Option<Uuid>) -> WardenResult<Vec<ResourceNode>> {
        let query = if app_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM resource \
             WHERE app_id = $app_id \
             ORDER BY sort_index ASC, created_at ASC"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM resource \
             ORDER BY sort_index ASC, created_at ASC"
        };

        let mut builder = self.db.query(query);
        if let Some(app_id) = app_id {
            builder = builder.bind(("app_id", app_id.to_string()));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<ResourceRecord> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ResourceRecord::try_into_node)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn grant(&self, grantee: Grantee, resource_id: Uuid) -> WardenResult<()> {
        self.get_by_id(resource_id).await?;

        let resource_str = resource_id.to_string();
        let grantee_str = grantee.id.to_string();

        let mut existing = self
            .db
            .query(
                "SELECT count() AS total FROM permission_grant \
                 WHERE grantee_kind = $kind AND grantee_id = $grantee_id \
                 AND resource_id = $resource_id GROUP ALL",
            )
            .bind(("kind", grantee.kind.as_str()))
            .bind(("grantee_id", grantee_str.clone()))
            .bind(("resource_id", resource_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = existing.take(0).map_err(DbError::from)?;
        if first_count(count_rows) > 0 {
            return Ok(());
        }

        self.db
            .query(
                "CREATE permission_grant SET \
                 resource_id = $resource_id, grantee_kind = $kind, \
                 grantee_id = $grantee_id",
            )
            .bind(("resource_id", resource_str))
            .bind(("kind", grantee.kind.as_str()))
            .bind(("grantee_id", grantee_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("grant", e))?;

        Ok(())
    }

    async fn revoke(&self, grantee: Grantee, resource_id: Uuid) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "DELETE permission_grant \
                 WHERE grantee_kind = $kind AND grantee_id = $grantee_id \
                 AND resource_id = $resource_id RETURN BEFORE",
            )
            .bind(("kind", grantee.kind.as_str()))
            .bind(("grantee_id", grantee.id.to_string()))
            .bind(("resource_id", resource_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HitRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn granted_resource_ids(
        &self,
        kind: GranteeKind,
        grantee_ids: Vec<Uuid>,
    ) -> WardenResult<Vec<Uuid>> {
        if grantee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT resource_id AS ref_id FROM permission_grant \
             WHERE grantee_kind = $kind AND grantee_id IN {}",
            id_list(&grantee_ids)
        );
        let mut result = self
            .db
            .query(query)
            .bind(("kind", kind.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_refs("resource", rows)?)
    }
}
