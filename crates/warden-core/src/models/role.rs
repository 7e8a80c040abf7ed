//! Role domain model and role membership.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub built_in: bool,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub creator_id: Uuid,
    pub name: String,
    pub description: String,
    pub built_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// The three structurally different ways a principal can be a member of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    User,
    Title,
    Group,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::User => "User",
            MemberKind::Title => "Title",
            MemberKind::Group => "Group",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(MemberKind::User),
            "Title" => Ok(MemberKind::Title),
            "Group" => Ok(MemberKind::Group),
            other => Err(format!("unknown member kind: {other}")),
        }
    }
}

/// Tagged reference to a role member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleMemberRef {
    pub kind: MemberKind,
    pub id: Uuid,
}

impl RoleMemberRef {
    pub fn user(id: Uuid) -> Self {
        Self {
            kind: MemberKind::User,
            id,
        }
    }

    pub fn title(id: Uuid) -> Self {
        Self {
            kind: MemberKind::Title,
            id,
        }
    }

    pub fn group(id: Uuid) -> Self {
        Self {
            kind: MemberKind::Group,
            id,
        }
    }
}

/// A role membership row, enriched with the display name of its member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMember {
    pub id: Uuid,
    pub role_id: Uuid,
    pub member: RoleMemberRef,
    pub member_name: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}
