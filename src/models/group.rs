//! Group model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub profile_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Group row enriched with its member count for trip-level listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupSummary {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub member_count: i64,
}

/// Group member joined with profile display data
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMemberView {
    pub profile_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}
