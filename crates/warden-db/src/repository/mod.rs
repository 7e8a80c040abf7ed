//! SurrealDB repository implementations.
//!
//! Multi-row mutations go through [`run_batch`] or [`delete_guarded`]. Each
//! sends one transaction, so either every row is written or none is.

mod group;
mod membership;
mod resource;
mod role;
mod title;
mod user;

pub use group::SurrealGroupRepository;
pub use membership::SurrealMembershipStore;
pub use resource::SurrealResourceRepository;
pub use role::SurrealRoleRepository;
pub use title::SurrealTitleRepository;
pub use user::SurrealUserRepository;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Row returned by `UPDATE`/`DELETE ... RETURN BEFORE`; only used to count
/// matched records.
#[derive(Debug, SurrealValue)]
struct HitRow {
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// Single string column selected with `AS ref_id`.
#[derive(Debug, SurrealValue)]
struct RefRow {
    ref_id: String,
}

fn parse_refs(field: &str, rows: Vec<RefRow>) -> Result<Vec<Uuid>, DbError> {
    rows.iter().map(|r| parse_uuid(field, &r.ref_id)).collect()
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Corrupt(format!("invalid {field} UUID: {e}")))
}

fn parse_opt_uuid(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, DbError> {
    raw.map(|r| parse_uuid(field, r)).transpose()
}

fn first_count(rows: Vec<CountRow>) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

/// Execute `statements` in order inside one transaction.
///
/// An empty list issues nothing. Statement text must only embed values
/// that cannot carry SurrealQL (UUIDs and enum tags); free text goes
/// through bound parameters instead.
async fn run_batch<C: Connection>(db: &Surreal<C>, statements: Vec<String>) -> Result<(), DbError> {
    if statements.is_empty() {
        return Ok(());
    }
    debug!(statements = statements.len(), "Running batch");

    let mut query = String::from("BEGIN TRANSACTION;\n");
    for statement in &statements {
        query.push_str(statement);
        query.push_str(";\n");
    }
    query.push_str("COMMIT TRANSACTION;");

    db.query(query)
        .await?
        .check()
        .map_err(|e| DbError::Batch(e.to_string()))?;
    Ok(())
}

/// Result slot of `RETURN $hit` in [`delete_guarded`]: BEGIN, LET and IF
/// each produce one result ahead of it.
const GUARDED_DELETE_SLOT: usize = 3;

/// Delete the non-built-in record `table:id` and, only if it was removed,
/// run `cascade` in the same transaction. `cascade` statements refer to the
/// deleted key as `$id`.
///
/// Returns whether the record was deleted. A failing cascade statement
/// cancels the whole transaction, record included.
async fn delete_guarded<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: Uuid,
    cascade: Vec<String>,
) -> Result<bool, DbError> {
    let mut query = String::from(
        "BEGIN TRANSACTION;\n\
         LET $hit = DELETE type::record($tb, $id) WHERE built_in = false RETURN BEFORE;\n\
         IF array::len($hit) > 0 {\n",
    );
    for statement in &cascade {
        query.push_str("    ");
        query.push_str(statement);
        query.push_str(";\n");
    }
    query.push_str("};\nRETURN $hit;\nCOMMIT TRANSACTION;");

    let mut result = db
        .query(query)
        .bind(("tb", table))
        .bind(("id", id.to_string()))
        .await?
        .check()
        .map_err(|e| DbError::Batch(e.to_string()))?;

    let rows: Vec<HitRow> = result.take(GUARDED_DELETE_SLOT)?;
    Ok(!rows.is_empty())
}

/// Render ids as a SurrealQL array literal of strings.
fn id_list(ids: &[Uuid]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
    format!("[{}]", quoted.join(", "))
}
