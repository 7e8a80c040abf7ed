//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as strings,
//! enums as strings with ASSERT constraints. `created_at` defaults to the
//! server clock and is the creation sequence used to order listings.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "principals_and_membership",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "permission_catalog",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: principals and membership relations
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (soft-disabled through validity, never hard-deleted)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD login_name ON TABLE user TYPE string;
DEFINE FIELD description ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD validity ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD user_type ON TABLE user TYPE int DEFAULT 1 \
    ASSERT $value >= 0;
DEFINE FIELD creator_id ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_login_name ON TABLE user \
    COLUMNS login_name UNIQUE;

-- =======================================================================
-- User groups
-- =======================================================================
DEFINE TABLE user_group SCHEMAFULL;
DEFINE FIELD name ON TABLE user_group TYPE string;
DEFINE FIELD description ON TABLE user_group TYPE string DEFAULT '';
DEFINE FIELD built_in ON TABLE user_group TYPE bool DEFAULT false;
DEFINE FIELD visible ON TABLE user_group TYPE bool DEFAULT true;
DEFINE FIELD creator_id ON TABLE user_group TYPE string;
DEFINE FIELD created_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Group membership (uniqueness of (group, user) is not enforced here;
-- readers deduplicate by user id)
-- =======================================================================
DEFINE TABLE group_member SCHEMAFULL;
DEFINE FIELD group_id ON TABLE group_member TYPE string;
DEFINE FIELD user_id ON TABLE group_member TYPE string;
DEFINE FIELD creator_id ON TABLE group_member TYPE string;
DEFINE FIELD created_at ON TABLE group_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_member_group ON TABLE group_member \
    COLUMNS group_id;
DEFINE INDEX idx_group_member_user ON TABLE group_member \
    COLUMNS user_id;

-- =======================================================================
-- Job titles and their holders
-- =======================================================================
DEFINE TABLE title SCHEMAFULL;
DEFINE FIELD name ON TABLE title TYPE string;
DEFINE FIELD description ON TABLE title TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE title TYPE datetime \
    DEFAULT time::now();

DEFINE TABLE title_member SCHEMAFULL;
DEFINE FIELD title_id ON TABLE title_member TYPE string;
DEFINE FIELD user_id ON TABLE title_member TYPE string;
DEFINE FIELD created_at ON TABLE title_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_title_member_pair ON TABLE title_member \
    COLUMNS title_id, user_id UNIQUE;

-- =======================================================================
-- Roles
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string DEFAULT '';
DEFINE FIELD built_in ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD creator_id ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

-- =======================================================================
-- Role membership, tagged by member kind
-- =======================================================================
DEFINE TABLE role_member SCHEMAFULL;
DEFINE FIELD role_id ON TABLE role_member TYPE string;
DEFINE FIELD member_kind ON TABLE role_member TYPE string \
    ASSERT $value IN ['User', 'Title', 'Group'];
DEFINE FIELD member_id ON TABLE role_member TYPE string;
DEFINE FIELD creator_id ON TABLE role_member TYPE string;
DEFINE FIELD created_at ON TABLE role_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_member_role ON TABLE role_member \
    COLUMNS role_id;
DEFINE INDEX idx_role_member_member ON TABLE role_member \
    COLUMNS member_kind, member_id;
";

// -----------------------------------------------------------------------
// Schema v2: permission resource catalog and grants
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE resource SCHEMAFULL;
DEFINE FIELD app_id ON TABLE resource TYPE string;
DEFINE FIELD parent_id ON TABLE resource TYPE option<string>;
DEFINE FIELD node_type ON TABLE resource TYPE string \
    ASSERT $value IN ['Application', 'Module', 'Function'];
DEFINE FIELD name ON TABLE resource TYPE string;
DEFINE FIELD alias ON TABLE resource TYPE string DEFAULT '';
DEFINE FIELD sort_index ON TABLE resource TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_resource_app ON TABLE resource COLUMNS app_id;

DEFINE TABLE permission_grant SCHEMAFULL;
DEFINE FIELD resource_id ON TABLE permission_grant TYPE string;
DEFINE FIELD grantee_kind ON TABLE permission_grant TYPE string \
    ASSERT $value IN ['Role', 'Group', 'Title'];
DEFINE FIELD grantee_id ON TABLE permission_grant TYPE string;
DEFINE FIELD created_at ON TABLE permission_grant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_grant_unique ON TABLE permission_grant \
    COLUMNS grantee_kind, grantee_id, resource_id UNIQUE;
";

/// Run all pending migrations against the database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn membership_tables_do_not_enforce_pair_uniqueness() {
        assert!(SCHEMA_V1.contains("DEFINE TABLE group_member"));
        assert!(!SCHEMA_V1.contains("idx_group_member_pair"));
    }
}
