//! Permission resource catalog model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Application,
    Module,
    Function,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Application => "Application",
            NodeType::Module => "Module",
            NodeType::Function => "Function",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Application" => Ok(NodeType::Application),
            "Module" => Ok(NodeType::Module),
            "Function" => Ok(NodeType::Function),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

/// A node of the application → module → function hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: Uuid,
    /// Owning application. Equal to `id` for application nodes.
    pub app_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub node_type: NodeType,
    pub name: String,
    pub alias: String,
    pub sort_index: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResource {
    /// Required for modules and functions, forbidden for applications.
    pub parent_id: Option<Uuid>,
    pub node_type: NodeType,
    pub name: String,
    pub alias: String,
    pub sort_index: u32,
}

/// Principal kinds a resource can be granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GranteeKind {
    Role,
    Group,
    Title,
}

impl GranteeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranteeKind::Role => "Role",
            GranteeKind::Group => "Group",
            GranteeKind::Title => "Title",
        }
    }
}

impl FromStr for GranteeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Role" => Ok(GranteeKind::Role),
            "Group" => Ok(GranteeKind::Group),
            "Title" => Ok(GranteeKind::Title),
            other => Err(format!("unknown grantee kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grantee {
    pub kind: GranteeKind,
    pub id: Uuid,
}

impl Grantee {
    pub fn role(id: Uuid) -> Self {
        Self {
            kind: GranteeKind::Role,
            id,
        }
    }

    pub fn group(id: Uuid) -> Self {
        Self {
            kind: GranteeKind::Group,
            id,
        }
    }

    pub fn title(id: Uuid) -> Self {
        Self {
            kind: GranteeKind::Title,
            id,
        }
    }
}
