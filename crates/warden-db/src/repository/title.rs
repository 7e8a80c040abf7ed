//! SurrealDB implementation of [`TitleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::title::{CreateTitle, Title};
use warden_core::repository::TitleRepository;

use super::{CountRow, HitRow, first_count, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(super) struct TitleRecord {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl TitleRecord {
    pub(super) fn try_into_title(self) -> Result<Title, DbError> {
        Ok(Title {
            id: parse_uuid("title", &self.record_id)?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the job title repository.
#[derive(Clone)]
pub struct SurrealTitleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTitleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TitleRepository for SurrealTitleRepository<C> {
    async fn create(&self, input: CreateTitle) -> WardenResult<Title> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('title', $id) SET \
                 name = $name, description = $description; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('title', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("title", e))?;

        let rows: Vec<TitleRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "title".into(),
            id: id_str,
        })?;
        Ok(row.try_into_title()?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Title> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('title', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TitleRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "title".into(),
            id: id_str,
        })?;
        Ok(row.try_into_title()?)
    }

    async fn list(&self) -> WardenResult<Vec<Title>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM title ORDER BY created_at ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TitleRecord> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(TitleRecord::try_into_title)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn add_user(&self, title_id: Uuid, user_id: Uuid) -> WardenResult<()> {
        let title_str = title_id.to_string();
        let user_str = user_id.to_string();

        // Holding a title twice is the same as holding it once.
        let mut existing = self
            .db
            .query(
                "SELECT count() AS total FROM title_member \
                 WHERE title_id = $title_id AND user_id = $user_id GROUP ALL",
            )
            .bind(("title_id", title_str.clone()))
            .bind(("user_id", user_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = existing.take(0).map_err(DbError::from)?;
        if first_count(count_rows) > 0 {
            return Ok(());
        }

        self.db
            .query(
                "CREATE title_member SET \
                 title_id = $title_id, user_id = $user_id",
            )
            .bind(("title_id", title_str))
            .bind(("user_id", user_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("title member", e))?;

        Ok(())
    }

    async fn remove_user(&self, title_id: Uuid, user_id: Uuid) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "DELETE title_member \
                 WHERE title_id = $title_id AND user_id = $user_id \
                 RETURN BEFORE",
            )
            .bind(("title_id", title_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HitRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }
}
