//! Job title domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job title held by users. Roles can take a title as a member, which
/// makes every holder of the title a member of the role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTitle {
    pub name: String,
    pub description: String,
}
