//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "user",
        "user_group",
        "group_member",
        "role",
        "role_member",
        "title",
        "title_member",
        "resource",
        "permission_grant",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    let total = rows.first().map(|r| r.total);
    assert_eq!(total, Some(2));
}

#[test]
fn schema_v1_defines_membership_tables() {
    let ddl = warden_db::schema_v1();
    assert!(ddl.contains("DEFINE TABLE group_member"));
    assert!(ddl.contains("ASSERT $value IN ['User', 'Title', 'Group']"));
}

#[tokio::test]
async fn embedded_endpoint_connects_without_sign_in() {
    let config = warden_db::DbConfig {
        endpoint: "mem://".into(),
        namespace: "warden_test".into(),
        database: "connect".into(),
        username: "nobody".into(),
        password: String::new(),
    };
    let db = warden_db::connect(&config).await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    assert_eq!(rows[0].total, 2);
}
