//! User group domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named set of users. Built-in groups cannot be deleted and invisible
/// groups never show up in listings or permission resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub built_in: bool,
    pub visible: bool,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn list_item(&self) -> GroupListItem {
        GroupListItem {
            id: self.id,
            built_in: self.built_in,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroup {
    pub creator_id: Uuid,
    pub name: String,
    pub description: String,
    pub built_in: bool,
    pub visible: bool,
}

impl CreateGroup {
    /// A regular, visible, deletable group.
    pub fn new(creator_id: Uuid, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            creator_id,
            name: name.into(),
            description: description.into(),
            built_in: false,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// `{id, builtIn, name, description}` projection returned by group listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupListItem {
    pub id: Uuid,
    pub built_in: bool,
    pub name: String,
    pub description: String,
}

/// One membership row joined to its user, as returned by the member listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberView {
    pub membership_id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub login_name: String,
    pub description: String,
}
