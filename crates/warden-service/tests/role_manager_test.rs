//! Integration tests for role administration and role membership.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use warden_core::models::role::MemberKind;
use warden_core::outcome::{CODE_BAD_REQUEST, CODE_CONFLICT, CODE_NO_EFFECT, CODE_NOT_FOUND, CODE_OK};
use warden_db::repository::{
    SurrealGroupRepository, SurrealMembershipStore, SurrealResourceRepository,
    SurrealRoleRepository, SurrealTitleRepository, SurrealUserRepository,
};
use warden_service::{AdminApi, MemberInput, ServiceConfig};

type Api = AdminApi<
    SurrealUserRepository<Db>,
    SurrealGroupRepository<Db>,
    SurrealRoleRepository<Db>,
    SurrealTitleRepository<Db>,
    SurrealResourceRepository<Db>,
    SurrealMembershipStore<Db>,
>;

async fn setup() -> (Api, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let api = AdminApi::new(
        SurrealUserRepository::new(db.clone()),
        SurrealGroupRepository::new(db.clone()),
        SurrealRoleRepository::new(db.clone()),
        SurrealTitleRepository::new(db.clone()),
        SurrealResourceRepository::new(db.clone()),
        SurrealMembershipStore::new(db),
        ServiceConfig {
            default_page_size: 2,
            max_page_size: 3,
        },
    );
    (api, Uuid::new_v4())
}

async fn user(api: &Api, caller: Uuid, login: &str) -> Uuid {
    api.create_user(caller, login, login, "", 1)
        .await
        .data
        .unwrap()
        .id
}

#[tokio::test]
async fn role_names_are_unique() {
    let (api, caller) = setup().await;
    let first = api.create_role(caller, "auditor", "").await;
    assert_eq!(first.code, CODE_OK);
    assert_eq!(api.create_role(caller, "auditor", "").await.code, CODE_CONFLICT);

    let other = api.create_role(caller, "viewer", "").await.data.unwrap();
    let renamed = api
        .update_role(&other.to_string(), Some("auditor".into()), None)
        .await;
    assert_eq!(renamed.code, CODE_CONFLICT);

    // Renaming a role to its own name is fine.
    let same = api
        .update_role(&other.to_string(), Some("viewer".into()), Some("reads".into()))
        .await;
    assert_eq!(same.code, CODE_OK);
}

#[tokio::test]
async fn delete_and_lookup_of_unknown_roles() {
    let (api, caller) = setup().await;
    let id = api.create_role(caller, "temp", "").await.data.unwrap().to_string();
    assert_eq!(api.delete_role(&id).await.code, CODE_OK);
    assert_eq!(api.delete_role(&id).await.code, CODE_NO_EFFECT);
    assert_eq!(api.get_role(&id).await.code, CODE_NOT_FOUND);
    assert_eq!(
        api.update_role(&id, None, Some("x".into())).await.code,
        CODE_NO_EFFECT
    );
}

#[tokio::test]
async fn list_roles_clamps_paging() {
    let (api, caller) = setup().await;
    for name in ["a", "b", "c", "d", "e"] {
        api.create_role(caller, name, "").await;
    }

    let page = api.list_roles(0, 0, None).await.data.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.limit, 2);
    assert_eq!(page.items.len(), 2);

    let page = api.list_roles(2, 1000, None).await.data.unwrap();
    assert_eq!(page.limit, 3);
    assert_eq!(page.offset, 3);
    assert_eq!(page.items.len(), 2);

    let page = api.list_roles(1, 10, Some("c".into())).await.data.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn add_role_members_validates_kinds() {
    let (api, caller) = setup().await;
    let role = api.create_role(caller, "ops", "").await.data.unwrap().to_string();
    let bad = api
        .add_role_members(
            caller,
            &role,
            &[MemberInput {
                kind: "Department".into(),
                id: Uuid::new_v4().to_string(),
            }],
        )
        .await;
    assert_eq!(bad.code, CODE_BAD_REQUEST);

    let unknown_role = api
        .add_role_members(
            caller,
            &Uuid::new_v4().to_string(),
            &[MemberInput::new(MemberKind::User, Uuid::new_v4())],
        )
        .await;
    assert_eq!(unknown_role.code, CODE_NOT_FOUND);
}

#[tokio::test]
async fn member_users_are_distinct_and_paged() {
    let (api, caller) = setup().await;
    let role = api.create_role(caller, "ops", "").await.data.unwrap();
    let role_str = role.to_string();
    let alice = user(&api, caller, "alice").await;
    let bob = user(&api, caller, "bob").await;
    let carol = user(&api, caller, "carol").await;

    let title = api.create_title("Engineer", "").await.data.unwrap();
    api.assign_user_to_title(&title.id.to_string(), &alice.to_string())
        .await;
    api.assign_user_to_title(&title.id.to_string(), &bob.to_string())
        .await;
    let group = api.create_group(caller, "Oncall", "").await.data.unwrap();
    api.add_group_members(caller, &group.to_string(), &[bob.to_string(), carol.to_string()])
        .await;

    let added = api
        .add_role_members(
            caller,
            &role_str,
            &[
                MemberInput::new(MemberKind::User, alice),
                MemberInput::new(MemberKind::User, alice),
                MemberInput::new(MemberKind::Title, title.id),
                MemberInput::new(MemberKind::Group, group),
            ],
        )
        .await;
    assert_eq!(added.data, Some(true));
    assert_eq!(api.list_role_members(&role_str).await.data.unwrap().len(), 3);

    let first = api.list_role_member_users(&role_str, 1, 2).await.data.unwrap();
    assert_eq!(first.total, 3);
    let logins: Vec<&str> = first.items.iter().map(|u| u.login_name.as_str()).collect();
    assert_eq!(logins, vec!["alice", "bob"]);

    let second = api.list_role_member_users(&role_str, 2, 2).await.data.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, carol);

    let roles = api.get_user_roles(&carol.to_string()).await.data.unwrap();
    assert_eq!(roles.iter().map(|r| r.id).collect::<Vec<_>>(), vec![role]);
}

#[tokio::test]
async fn eligible_listings_branch_by_member_kind() {
    let (api, caller) = setup().await;
    let role = api.create_role(caller, "ops", "").await.data.unwrap().to_string();
    let alice = user(&api, caller, "alice").await;
    let bob = user(&api, caller, "bob").await;
    let t1 = api.create_title("T1", "").await.data.unwrap();
    let t2 = api.create_title("T2", "").await.data.unwrap();
    let g1 = api.create_group(caller, "G1", "").await.data.unwrap();
    let g2 = api.create_group(caller, "G2", "").await.data.unwrap();

    api.add_role_members(
        caller,
        &role,
        &[
            MemberInput::new(MemberKind::User, alice),
            MemberInput::new(MemberKind::Title, t1.id),
            MemberInput::new(MemberKind::Group, g1),
        ],
    )
    .await;

    let titles = api.list_eligible_titles(&role).await.data.unwrap();
    assert_eq!(titles.iter().map(|t| t.id).collect::<Vec<_>>(), vec![t2.id]);
    let groups = api.list_eligible_groups(&role).await.data.unwrap();
    assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![g2]);
    let users = api.list_eligible_role_users(&role).await.data.unwrap();
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![bob]);

    let members = api.list_role_members(&role).await.data.unwrap();
    let group_row = members
        .iter()
        .find(|m| m.member.kind == MemberKind::Group)
        .unwrap();
    assert_eq!(
        api.remove_role_member(&group_row.id.to_string()).await.code,
        CODE_OK
    );
    assert_eq!(
        api.remove_role_member(&group_row.id.to_string()).await.code,
        CODE_NO_EFFECT
    );
    assert_eq!(api.list_eligible_groups(&role).await.data.unwrap().len(), 2);
}
