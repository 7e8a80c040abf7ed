//! SurrealDB implementation of [`GroupRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::group::{CreateGroup, Group, UpdateGroup};
use warden_core::models::role::MemberKind;
use warden_core::models::resource::GranteeKind;
use warden_core::repository::GroupRepository;

use super::{delete_guarded, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct GroupRecord {
    record_id: String,
    name: String,
    description: String,
    built_in: bool,
    visible: bool,
    creator_id: String,
    created_at: DateTime<Utc>,
}

impl GroupRecord {
    pub(super) fn try_into_group(self) -> Result<Group, DbError> {
        Ok(Group {
            id: parse_uuid("group", &self.record_id)?,
            name: self.name,
            description: self.description,
            built_in: self.built_in,
            visible: self.visible,
            creator_id: parse_uuid("creator", &self.creator_id)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> WardenResult<Group> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user_group', $id) SET \
                 name = $name, description = $description, \
                 built_in = $built_in, visible = $visible, \
                 creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('user_group', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("built_in", input.built_in))
            .bind(("visible", input.visible))
            .bind(("creator_id", input.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("group", e))?;

        let rows: Vec<GroupRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;
        Ok(row.try_into_group()?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user_group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;
        Ok(row.try_into_group()?)
    }

    async fn update(&self, id: Uuid, input: UpdateGroup) -> WardenResult<Group> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        // Touch a field so the statement stays valid when nothing changes.
        if sets.is_empty() {
            sets.push("name = name");
        }

        let query = format!(
            "UPDATE type::record('user_group', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('user_group', $id);",
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
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<GroupRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;
        Ok(row.try_into_group()?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<bool> {
        // Membership rows and grants pointing at the group go with it.
        let deleted = delete_guarded(
            &self.db,
            "user_group",
            id,
            vec![
                "DELETE group_member WHERE group_id = $id".into(),
                format!(
                    "DELETE role_member WHERE member_kind = '{}' AND member_id = $id",
                    MemberKind::Group.as_str()
                ),
                format!(
                    "DELETE permission_grant WHERE grantee_kind = '{}' AND grantee_id = $id",
                    GranteeKind::Group.as_str()
                ),
            ],
        )
        .await?;
        if deleted {
            debug!(group_id = %id, "Group deleted with its memberships");
        }

        Ok(deleted)
    }

    async fn list_visible(&self) -> WardenResult<Vec<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_group \
                 WHERE visible = true \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRecord> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(GroupRecord::try_into_group)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
