//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `user_type` of disabled/system accounts. Anything above is a normal user.
pub const SYSTEM_USER_TYPE: u32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub login_name: String,
    pub description: String,
    /// Soft-disable flag. Users are never hard-deleted.
    pub validity: bool,
    pub user_type: u32,
    pub creator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user may be offered as a new group or role member.
    pub fn is_assignable(&self) -> bool {
        self.validity && self.user_type > SYSTEM_USER_TYPE
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            login_name: self.login_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub login_name: String,
    pub description: String,
    pub user_type: u32,
    pub creator_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// `{id, name, loginName}` projection used by member and eligibility listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub login_name: String,
}
