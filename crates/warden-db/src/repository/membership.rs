//! The membership store: group and role membership relations.
//!
//! Membership rows reference principals by id only. Joins against users,
//! groups and titles happen here in memory, after each side has been
//! filtered by validity and visibility, so duplicate relation rows left by
//! concurrent inserts never surface twice.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::group::{Group, GroupMemberView};
use warden_core::models::role::{MemberKind, Role, RoleMember, RoleMemberRef};
use warden_core::models::title::Title;
use warden_core::models::user::{SYSTEM_USER_TYPE, User, UserSummary};
use warden_core::repository::{GroupMemberRepository, RoleMemberRepository};

use super::group::GroupRecord;
use super::role::RoleRecord;
use super::title::TitleRecord;
use super::user::UserRecord;
use super::{HitRow, RefRow, id_list, parse_refs, parse_uuid, run_batch};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GroupMemberRecord {
    record_id: String,
    group_id: String,
    user_id: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RoleMemberRecord {
    record_id: String,
    role_id: String,
    member_kind: String,
    member_id: String,
    creator_id: String,
    created_at: DateTime<Utc>,
}

impl RoleMemberRecord {
    fn member_ref(&self) -> Result<RoleMemberRef, DbError> {
        let kind = self
            .member_kind
            .parse::<MemberKind>()
            .map_err(DbError::Corrupt)?;
        Ok(RoleMemberRef {
            kind,
            id: parse_uuid("member", &self.member_id)?,
        })
    }
}

fn into_users(rows: Vec<UserRecord>) -> Result<Vec<User>, DbError> {
    rows.into_iter().map(UserRecord::try_into_user).collect()
}

fn into_groups(rows: Vec<GroupRecord>) -> Result<Vec<Group>, DbError> {
    rows.into_iter().map(GroupRecord::try_into_group).collect()
}

fn into_titles(rows: Vec<TitleRecord>) -> Result<Vec<Title>, DbError> {
    rows.into_iter().map(TitleRecord::try_into_title).collect()
}

/// SurrealDB implementation of both membership repositories.
#[derive(Clone)]
pub struct SurrealMembershipStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn role_member_rows(&self, role_id: Uuid) -> Result<Vec<RoleMemberRecord>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role_member \
                 WHERE role_id = $role_id \
                 ORDER BY created_at ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Ids of the role's members of one kind.
    async fn member_ids(&self, role_id: Uuid, kind: MemberKind) -> Result<HashSet<Uuid>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT member_id AS ref_id FROM role_member \
                 WHERE role_id = $role_id AND member_kind = $kind",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("kind", kind.as_str()))
            .await?;
        let rows: Vec<RefRow> = result.take(0)?;
        Ok(parse_refs("member", rows)?.into_iter().collect())
    }

    /// Valid users among `ids`, ordered by login name.
    async fn valid_users_in(&self, ids: &[Uuid]) -> Result<Vec<User>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE validity = true AND meta::id(id) IN {} \
             ORDER BY login_name ASC",
            id_list(ids)
        );
        let mut result = self.db.query(query).await?;
        into_users(result.take(0)?)
    }

    /// Visible groups among `ids`, in creation order.
    async fn visible_groups_in(&self, ids: &[Uuid]) -> Result<Vec<Group>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user_group \
             WHERE visible = true AND meta::id(id) IN {} \
             ORDER BY created_at ASC",
            id_list(ids)
        );
        let mut result = self.db.query(query).await?;
        into_groups(result.take(0)?)
    }

    /// Valid, non-system users not in `excluded`, ordered by login name.
    async fn assignable_users_except(
        &self,
        excluded: &HashSet<Uuid>,
    ) -> Result<Vec<UserSummary>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE validity = true AND user_type > $system_type \
                 ORDER BY login_name ASC",
            )
            .bind(("system_type", SYSTEM_USER_TYPE))
            .await?;
        let users = into_users(result.take(0)?)?;
        Ok(users
            .iter()
            .filter(|u| !excluded.contains(&u.id))
            .map(User::summary)
            .collect())
    }
}

impl<C: Connection> GroupMemberRepository for SurrealMembershipStore<C> {
    async fn add_group_members(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> WardenResult<bool> {
        if user_ids.is_empty() {
            return Ok(true);
        }

        let statements = user_ids
            .iter()
            .map(|user_id| {
                format!(
                    "CREATE group_member:`{}` SET group_id = '{group_id}', \
                     user_id = '{user_id}', creator_id = '{creator_id}'",
                    Uuid::new_v4()
                )
            })
            .collect();
        run_batch(&self.db, statements).await?;
        debug!(%group_id, added = user_ids.len(), "Group members added");

        Ok(true)
    }

    async fn remove_group_members(&self, membership_ids: Vec<Uuid>) -> WardenResult<bool> {
        if membership_ids.is_empty() {
            return Ok(false);
        }

        // Count only the rows this statement removed.
        let query = format!(
            "DELETE group_member WHERE meta::id(id) IN {} RETURN BEFORE",
            id_list(&membership_ids)
        );
        let mut result = self
            .db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let removed: Vec<HitRow> = result.take(0).map_err(DbError::from)?;
        debug!(
            requested = membership_ids.len(),
            removed = removed.len(),
            "Group members removed"
        );

        Ok(!removed.is_empty())
    }

    async fn list_group_members(&self) -> WardenResult<Vec<GroupMemberView>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_member \
                 ORDER BY created_at ASC; \
                 SELECT meta::id(id) AS record_id, * FROM user_group \
                 WHERE visible = true; \
                 SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE validity = true ORDER BY created_at ASC;",
            )
            .await
            .map_err(DbError::from)?;

        let memberships: Vec<GroupMemberRecord> = result.take(0).map_err(DbError::from)?;
        let groups = into_groups(result.take(1).map_err(DbError::from)?)?;
        let users = into_users(result.take(2).map_err(DbError::from)?)?;

        let visible: HashSet<Uuid> = groups.iter().map(|g| g.id).collect();
        // Users are already in creation order; their position is the sort key.
        let user_pos: HashMap<Uuid, (usize, &User)> = users
            .iter()
            .enumerate()
            .map(|(pos, u)| (u.id, (pos, u)))
            .collect();

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for m in memberships {
            let group_id = parse_uuid("group", &m.group_id)?;
            let user_id = parse_uuid("user", &m.user_id)?;
            if !visible.contains(&group_id) {
                continue;
            }
            let Some(&(pos, user)) = user_pos.get(&user_id) else {
                continue;
            };
            if !seen.insert((group_id, user_id)) {
                continue;
            }
            rows.push((
                pos,
                GroupMemberView {
                    membership_id: parse_uuid("membership", &m.record_id)?,
                    group_id,
                    user_id,
                    user_name: user.name.clone(),
                    login_name: user.login_name.clone(),
                    description: user.description.clone(),
                },
            ));
        }
        rows.sort_by_key(|(pos, _)| *pos);

        Ok(rows.into_iter().map(|(_, view)| view).collect())
    }

    async fn list_eligible_users(&self, group_id: Uuid) -> WardenResult<Vec<UserSummary>> {
        let mut result = self
            .db
            .query("SELECT user_id AS ref_id FROM group_member WHERE group_id = $group_id")
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<RefRow> = result.take(0).map_err(DbError::from)?;
        let members: HashSet<Uuid> = parse_refs("user", rows)?.into_iter().collect();

        Ok(self.assignable_users_except(&members).await?)
    }

    async fn get_user_groups(&self, user_id: Uuid) -> WardenResult<Vec<Group>> {
        let mut result = self
            .db
            .query("SELECT group_id AS ref_id FROM group_member WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<RefRow> = result.take(0).map_err(DbError::from)?;
        let group_ids = parse_refs("group", rows)?;

        Ok(self.visible_groups_in(&group_ids).await?)
    }
}

impl<C: Connection> RoleMemberRepository for SurrealMembershipStore<C> {
    async fn add_role_members(
        &self,
        role_id: Uuid,
        creator_id: Uuid,
        members: Vec<RoleMemberRef>,
    ) -> WardenResult<bool> {
        if members.is_empty() {
            return Ok(true);
        }

        let statements = members
            .iter()
            .map(|member| {
                format!(
                    "CREATE role_member:`{}` SET role_id = '{role_id}', \
                     member_kind = '{}', member_id = '{}', creator_id = '{creator_id}'",
                    Uuid::new_v4(),
                    member.kind.as_str(),
                    member.id
                )
            })
            .collect();
        run_batch(&self.db, statements).await?;
        debug!(%role_id, added = members.len(), "Role members added");

        Ok(true)
    }

    async fn remove_role_member(&self, membership_id: Uuid) -> WardenResult<bool> {
        let mut result = self
            .db
            .query("DELETE type::record('role_member', $id) RETURN BEFORE")
            .bind(("id", membership_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HitRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn list_role_members(&self, role_id: Uuid) -> WardenResult<Vec<RoleMember>> {
        let records = self.role_member_rows(role_id).await?;
        let refs = records
            .iter()
            .map(RoleMemberRecord::member_ref)
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids_of = |kind: MemberKind| -> Vec<Uuid> {
            refs.iter().filter(|r| r.kind == kind).map(|r| r.id).collect()
        };
        let users = self.valid_users_in(&ids_of(MemberKind::User)).await?;
        let groups = self.visible_groups_in(&ids_of(MemberKind::Group)).await?;
        let title_ids = ids_of(MemberKind::Title);
        let titles = if title_ids.is_empty() {
            Vec::new()
        } else {
            let query = format!(
                "SELECT meta::id(id) AS record_id, * FROM title WHERE meta::id(id) IN {}",
                id_list(&title_ids)
            );
            let mut result = self.db.query(query).await.map_err(DbError::from)?;
            into_titles(result.take(0).map_err(DbError::from)?)?
        };

        let mut names: HashMap<RoleMemberRef, String> = HashMap::new();
        names.extend(users.into_iter().map(|u| (RoleMemberRef::user(u.id), u.name)));
        names.extend(groups.into_iter().map(|g| (RoleMemberRef::group(g.id), g.name)));
        names.extend(titles.into_iter().map(|t| (RoleMemberRef::title(t.id), t.name)));

        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for (record, member) in records.into_iter().zip(refs) {
            let Some(name) = names.get(&member) else {
                continue;
            };
            if !seen.insert(member) {
                continue;
            }
            members.push(RoleMember {
                id: parse_uuid("membership", &record.record_id)?,
                role_id: parse_uuid("role", &record.role_id)?,
                member,
                member_name: name.clone(),
                creator_id: parse_uuid("creator", &record.creator_id)?,
                created_at: record.created_at,
            });
        }

        Ok(members)
    }

    async fn list_role_member_users(&self, role_id: Uuid) -> WardenResult<Vec<UserSummary>> {
        let records = self.role_member_rows(role_id).await?;
        let mut user_ids = Vec::new();
        let mut title_ids = Vec::new();
        let mut group_ids = Vec::new();
        for record in &records {
            let member = record.member_ref()?;
            match member.kind {
                MemberKind::User => user_ids.push(member.id),
                MemberKind::Title => title_ids.push(member.id),
                MemberKind::Group => group_ids.push(member.id),
            }
        }

        if !title_ids.is_empty() {
            let query = format!(
                "SELECT user_id AS ref_id FROM title_member WHERE title_id IN {}",
                id_list(&title_ids)
            );
            let mut result = self.db.query(query).await.map_err(DbError::from)?;
            user_ids.extend(parse_refs("user", result.take(0).map_err(DbError::from)?)?);
        }

        let visible_groups: Vec<Uuid> = self
            .visible_groups_in(&group_ids)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        if !visible_groups.is_empty() {
            let query = format!(
                "SELECT user_id AS ref_id FROM group_member WHERE group_id IN {}",
                id_list(&visible_groups)
            );
            let mut result = self.db.query(query).await.map_err(DbError::from)?;
            user_ids.extend(parse_refs("user", result.take(0).map_err(DbError::from)?)?);
        }

        let mut seen = HashSet::new();
        user_ids.retain(|id| seen.insert(*id));

        let users = self.valid_users_in(&user_ids).await?;
        Ok(users.iter().map(User::summary).collect())
    }

    async fn list_eligible_titles(&self, role_id: Uuid) -> WardenResult<Vec<Title>> {
        let members = self.member_ids(role_id, MemberKind::Title).await?;

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM title ORDER BY created_at ASC")
            .await
            .map_err(DbError::from)?;
        let titles = into_titles(result.take(0).map_err(DbError::from)?)?;

        Ok(titles
            .into_iter()
            .filter(|t| !members.contains(&t.id))
            .collect())
    }

    async fn list_eligible_groups(&self, role_id: Uuid) -> WardenResult<Vec<Group>> {
        let members = self.member_ids(role_id, MemberKind::Group).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_group \
                 WHERE visible = true ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;
        let groups = into_groups(result.take(0).map_err(DbError::from)?)?;

        Ok(groups
            .into_iter()
            .filter(|g| !members.contains(&g.id))
            .collect())
    }

    async fn list_eligible_role_users(&self, role_id: Uuid) -> WardenResult<Vec<UserSummary>> {
        let members = self.member_ids(role_id, MemberKind::User).await?;
        Ok(self.assignable_users_except(&members).await?)
    }

    async fn get_user_roles(&self, user_id: Uuid) -> WardenResult<Vec<Role>> {
        let user_str = user_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT title_id AS ref_id FROM title_member WHERE user_id = $user_id; \
                 SELECT group_id AS ref_id FROM group_member WHERE user_id = $user_id;",
            )
            .bind(("user_id", user_str.clone()))
            .await
            .map_err(DbError::from)?;
        let title_ids = parse_refs("title", result.take(0).map_err(DbError::from)?)?;
        let group_ids = parse_refs("group", result.take(1).map_err(DbError::from)?)?;
        let group_ids: Vec<Uuid> = self
            .visible_groups_in(&group_ids)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();

        let query = format!(
            "SELECT role_id AS ref_id FROM role_member WHERE \
             (member_kind = '{}' AND member_id = $user_id) \
             OR (member_kind = '{}' AND member_id IN {}) \
             OR (member_kind = '{}' AND member_id IN {})",
            MemberKind::User.as_str(),
            MemberKind::Title.as_str(),
            id_list(&title_ids),
            MemberKind::Group.as_str(),
            id_list(&group_ids),
        );
        let mut result = self
            .db
            .query(query)
            .bind(("user_id", user_str))
            .await
            .map_err(DbError::from)?;
        let mut role_ids = parse_refs("role", result.take(0).map_err(DbError::from)?)?;
        let mut seen = HashSet::new();
        role_ids.retain(|id| seen.insert(*id));
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE meta::id(id) IN {} ORDER BY created_at ASC",
            id_list(&role_ids)
        );
        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<RoleRecord> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(RoleRecord::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
