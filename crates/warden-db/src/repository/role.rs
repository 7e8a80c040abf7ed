//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::resource::GranteeKind;
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::repository::{PaginatedResult, Pagination, RoleRepository};

use super::{CountRow, delete_guarded, first_count, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(super) struct RoleRecord {
    record_id: String,
    name: String,
    description: String,
    built_in: bool,
    creator_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRecord {
    pub(super) fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid("role", &self.record_id)?,
            name: self.name,
            description: self.description,
            built_in: self.built_in,
            creator_id: parse_uuid("creator", &self.creator_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> WardenResult<Role> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description, \
                 built_in = $built_in, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('role', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("built_in", input.built_in))
            .bind(("creator_id", input.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("role", e))?;

        let rows: Vec<RoleRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;
        Ok(row.try_into_role()?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;
        Ok(row.try_into_role()?)
    }

    async fn get_by_name(&self, name: String) -> WardenResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE name = $name LIMIT 1",
            )
            .bind(("name", name.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: name,
        })?;
        Ok(row.try_into_role()?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> WardenResult<Role> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('role', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("role", e))?;

        let rows: Vec<RoleRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;
        Ok(row.try_into_role()?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<bool> {
        let deleted = delete_guarded(
            &self.db,
            "role",
            id,
            vec![
                "DELETE role_member WHERE role_id = $id".into(),
                format!(
                    "DELETE permission_grant WHERE grantee_kind = '{}' AND grantee_id = $id",
                    GranteeKind::Role.as_str()
                ),
            ],
        )
        .await?;
        if deleted {
            debug!(role_id = %id, "Role deleted with its memberships and grants");
        }

        Ok(deleted)
    }

    async fn list(
        &self,
        search: Option<String>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Role>> {
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let filter = if search.is_some() {
            "WHERE string::contains(string::lowercase(name), $search)"
        } else {
            ""
        };

        let count_query = format!("SELECT count() AS total FROM role {filter} GROUP ALL");
        let mut count_builder = self.db.query(&count_query);
        if let Some(search) = &search {
            count_builder = count_builder.bind(("search", search.clone()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(count_rows);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM role {filter} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );
        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(search) = search {
            builder = builder.bind(("search", search));
        }
        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<RoleRecord> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(RoleRecord::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
