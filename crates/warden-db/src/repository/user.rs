//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::repository::{PaginatedResult, Pagination, UserRepository};

use super::{CountRow, HitRow, first_count, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct UserRecord {
    record_id: String,
    name: String,
    login_name: String,
    description: String,
    validity: bool,
    user_type: u32,
    creator_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub(super) fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            name: self.name,
            login_name: self.login_name,
            description: self.description,
            validity: self.validity,
            user_type: self.user_type,
            creator_id: parse_opt_uuid("creator", self.creator_id.as_deref())?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, login_name = $login_name, \
                 description = $description, user_type = $user_type, \
                 creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('user', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("login_name", input.login_name))
            .bind(("description", input.description))
            .bind(("user_type", input.user_type))
            .bind(("creator_id", input.creator_id.map(|c| c.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("user", e))?;

        let rows: Vec<UserRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;
        Ok(row.try_into_user()?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;
        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> WardenResult<User> {
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
            "UPDATE type::record('user', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('user', $id);",
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

        let rows: Vec<UserRecord> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;
        Ok(row.try_into_user()?)
    }

    async fn set_validity(&self, id: Uuid, validity: bool) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 validity = $validity, updated_at = time::now() \
                 RETURN BEFORE",
            )
            .bind(("id", id.to_string()))
            .bind(("validity", validity))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HitRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn list(
        &self,
        search: Option<String>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<User>> {
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let filter = if search.is_some() {
            "validity = true AND \
             (string::contains(string::lowercase(name), $search) \
             OR string::contains(string::lowercase(login_name), $search))"
        } else {
            "validity = true"
        };

        let count_query = format!("SELECT count() AS total FROM user WHERE {filter} GROUP ALL");
        let mut count_builder = self.db.query(&count_query);
        if let Some(search) = &search {
            count_builder = count_builder.bind(("search", search.clone()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(count_rows);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE {filter} \
             ORDER BY login_name ASC \
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
        let rows: Vec<UserRecord> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(UserRecord::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
