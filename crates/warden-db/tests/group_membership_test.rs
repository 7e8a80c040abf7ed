//! Integration tests for groups and the group side of the membership store.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenError;
use warden_core::models::group::{CreateGroup, UpdateGroup};
use warden_core::models::user::CreateUser;
use warden_core::repository::{GroupMemberRepository, GroupRepository, UserRepository};
use warden_db::repository::{SurrealGroupRepository, SurrealMembershipStore, SurrealUserRepository};

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

struct Fixture {
    db: Surreal<Db>,
    groups: SurrealGroupRepository<Db>,
    store: SurrealMembershipStore<Db>,
    users: SurrealUserRepository<Db>,
    admin: Uuid,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    Fixture {
        groups: SurrealGroupRepository::new(db.clone()),
        store: SurrealMembershipStore::new(db.clone()),
        users: SurrealUserRepository::new(db.clone()),
        db,
        admin: Uuid::new_v4(),
    }
}

async fn user(fx: &Fixture, login: &str, user_type: u32) -> Uuid {
    fx.users
        .create(CreateUser {
            name: login.to_uppercase(),
            login_name: login.into(),
            description: format!("{login} account"),
            user_type,
            creator_id: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn create_returns_generated_key() {
    let fx = setup().await;
    let group = fx
        .groups
        .create(CreateGroup::new(fx.admin, "Ops", "operations"))
        .await
        .unwrap();

    let fetched = fx.groups.get_by_id(group.id).await.unwrap();
    assert_eq!(fetched.name, "Ops");
    assert_eq!(fetched.creator_id, fx.admin);
    assert!(fetched.visible);
    assert!(!fetched.built_in);
}

#[tokio::test]
async fn get_missing_group_is_not_found() {
    let fx = setup().await;
    let err = fx.groups.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let fx = setup().await;
    let group = fx
        .groups
        .create(CreateGroup::new(fx.admin, "Ops", "operations"))
        .await
        .unwrap();

    let updated = fx
        .groups
        .update(
            group.id,
            UpdateGroup {
                name: Some("SRE".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "SRE");
    assert_eq!(updated.description, "operations");

    let err = fx
        .groups
        .update(Uuid::new_v4(), UpdateGroup::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
}

#[tokio::test]
async fn built_in_group_is_never_deleted() {
    let fx = setup().await;
    let mut input = CreateGroup::new(fx.admin, "Everyone", "all users");
    input.built_in = true;
    let group = fx.groups.create(input).await.unwrap();

    for _ in 0..3 {
        assert!(!fx.groups.delete(group.id).await.unwrap());
    }
    assert!(fx.groups.get_by_id(group.id).await.is_ok());
    assert!(!fx.groups.delete(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn delete_cascades_memberships() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let group = fx
        .groups
        .create(CreateGroup::new(fx.admin, "Temp", ""))
        .await
        .unwrap();
    fx.store
        .add_group_members(group.id, fx.admin, vec![u1])
        .await
        .unwrap();

    assert!(fx.groups.delete(group.id).await.unwrap());
    assert!(fx.store.list_group_members().await.unwrap().is_empty());
    assert!(fx.store.get_user_groups(u1).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_cascade_keeps_group_and_memberships() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let group = fx
        .groups
        .create(CreateGroup::new(fx.admin, "Temp", ""))
        .await
        .unwrap();
    fx.store
        .add_group_members(group.id, fx.admin, vec![u1])
        .await
        .unwrap();

    fx.db
        .query(
            "DEFINE EVENT block_member_delete ON TABLE group_member \
             WHEN $event = 'DELETE' THEN { THROW 'storage failure' }",
        )
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = fx.groups.delete(group.id).await.unwrap_err();
    assert!(matches!(err, WardenError::Database(_)));

    assert_eq!(fx.groups.get_by_id(group.id).await.unwrap().name, "Temp");
    let rows = fx.store.list_group_members().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group_id, group.id);
}

#[tokio::test]
async fn list_visible_skips_hidden_groups_in_creation_order() {
    let fx = setup().await;
    let a = fx
        .groups
        .create(CreateGroup::new(fx.admin, "A", ""))
        .await
        .unwrap();
    let mut hidden = CreateGroup::new(fx.admin, "Hidden", "");
    hidden.visible = false;
    fx.groups.create(hidden).await.unwrap();
    let b = fx
        .groups
        .create(CreateGroup::new(fx.admin, "B", ""))
        .await
        .unwrap();

    let ids: Vec<Uuid> = fx
        .groups
        .list_visible()
        .await
        .unwrap()
        .iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[tokio::test]
async fn empty_add_issues_no_writes() {
    let fx = setup().await;
    // Any write to group_member would now fail the call.
    fx.db
        .query(
            "DEFINE EVENT reject_member_create ON TABLE group_member \
             WHEN $event = 'CREATE' THEN { THROW 'unexpected write' }",
        )
        .await
        .unwrap()
        .check()
        .unwrap();

    assert!(
        fx.store
            .add_group_members(Uuid::new_v4(), fx.admin, vec![])
            .await
            .unwrap()
    );

    let mut result = fx
        .db
        .query("SELECT count() AS total FROM group_member GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    assert_eq!(rows.first().map(|r| r.total).unwrap_or(0), 0);
}

#[tokio::test]
async fn add_list_remove_scenario() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let u2 = user(&fx, "u2", 1).await;
    let g = fx
        .groups
        .create(CreateGroup::new(fx.admin, "G", ""))
        .await
        .unwrap();

    assert!(
        fx.store
            .add_group_members(g.id, fx.admin, vec![u1, u2])
            .await
            .unwrap()
    );

    let rows = fx.store.list_group_members().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.group_id == g.id));
    // Ordered by user creation sequence.
    assert_eq!(rows[0].user_id, u1);
    assert_eq!(rows[1].user_id, u2);
    assert_eq!(rows[0].login_name, "u1");

    assert!(
        fx.store
            .remove_group_members(vec![rows[0].membership_id])
            .await
            .unwrap()
    );
    let rows = fx.store.list_group_members().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, u2);
}

#[tokio::test]
async fn remove_unknown_memberships_reports_no_rows() {
    let fx = setup().await;
    assert!(
        !fx.store
            .remove_group_members(vec![Uuid::new_v4()])
            .await
            .unwrap()
    );
    assert!(!fx.store.remove_group_members(vec![]).await.unwrap());
}

#[tokio::test]
async fn concurrent_removers_claim_a_row_once() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let g = fx
        .groups
        .create(CreateGroup::new(fx.admin, "G", ""))
        .await
        .unwrap();
    fx.store
        .add_group_members(g.id, fx.admin, vec![u1])
        .await
        .unwrap();
    let membership = fx.store.list_group_members().await.unwrap()[0].membership_id;

    let (first, second) = tokio::join!(
        fx.store.remove_group_members(vec![membership]),
        fx.store.remove_group_members(vec![membership]),
    );
    let claimed = [first, second]
        .into_iter()
        .filter(|r| matches!(r, Ok(true)))
        .count();
    assert_eq!(claimed, 1);
    assert!(fx.store.list_group_members().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_rows_are_listed_once() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let g = fx
        .groups
        .create(CreateGroup::new(fx.admin, "G", ""))
        .await
        .unwrap();

    fx.store
        .add_group_members(g.id, fx.admin, vec![u1])
        .await
        .unwrap();
    fx.store
        .add_group_members(g.id, fx.admin, vec![u1])
        .await
        .unwrap();

    let rows = fx.store.list_group_members().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(fx.store.get_user_groups(u1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn members_of_hidden_groups_and_invalid_users_are_not_listed() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let u2 = user(&fx, "u2", 1).await;
    let mut hidden = CreateGroup::new(fx.admin, "Hidden", "");
    hidden.visible = false;
    let hidden = fx.groups.create(hidden).await.unwrap();
    let g = fx
        .groups
        .create(CreateGroup::new(fx.admin, "G", ""))
        .await
        .unwrap();

    fx.store
        .add_group_members(hidden.id, fx.admin, vec![u1])
        .await
        .unwrap();
    fx.store
        .add_group_members(g.id, fx.admin, vec![u1, u2])
        .await
        .unwrap();
    fx.users.set_validity(u2, false).await.unwrap();

    let rows = fx.store.list_group_members().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].group_id, rows[0].user_id), (g.id, u1));
}

#[tokio::test]
async fn eligible_users_exclude_members_invalid_and_system_users() {
    let fx = setup().await;
    let carol = user(&fx, "carol", 1).await;
    let alice = user(&fx, "alice", 1).await;
    let bob = user(&fx, "bob", 1).await;
    let _system = user(&fx, "system", 0).await;
    let gone = user(&fx, "gone", 2).await;
    fx.users.set_validity(gone, false).await.unwrap();

    let g = fx
        .groups
        .create(CreateGroup::new(fx.admin, "G", ""))
        .await
        .unwrap();
    fx.store
        .add_group_members(g.id, fx.admin, vec![bob])
        .await
        .unwrap();

    let eligible = fx.store.list_eligible_users(g.id).await.unwrap();
    let ids: Vec<Uuid> = eligible.iter().map(|u| u.id).collect();
    // Ordered by login name.
    assert_eq!(ids, vec![alice, carol]);
}

#[tokio::test]
async fn failing_statement_rolls_back_whole_batch() {
    let fx = setup().await;
    let u1 = user(&fx, "u1", 1).await;
    let u2 = user(&fx, "u2", 1).await;
    let g = fx
        .groups
        .create(CreateGroup::new(fx.admin, "G", ""))
        .await
        .unwrap();

    // Make the second insert of the batch fail.
    fx.db
        .query(format!(
            "DEFINE FIELD OVERWRITE user_id ON TABLE group_member TYPE string \
             ASSERT $value != '{u2}'"
        ))
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = fx
        .store
        .add_group_members(g.id, fx.admin, vec![u1, u2])
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Database(_)));
    assert!(fx.store.list_group_members().await.unwrap().is_empty());
}
