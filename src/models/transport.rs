//! Carpooling models
//!
//! Entities for transport preferences, cars and seat assignments, plus the
//! read-only aggregate view. Pedestrian status never appears as a stored
//! entity; it is derived from membership minus assignments at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransportProfile {
    pub group_id: Uuid,
    pub profile_id: Uuid,
    pub has_license: bool,
    pub has_car: bool,
    pub updated_at: DateTime<Utc>,
}

/// Partial upsert of a member's transport flags; omitted fields keep their
/// stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransportPreferenceRequest {
    pub has_license: Option<bool>,
    pub has_car: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: Uuid,
    pub group_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCarRequest {
    pub name: String,
    pub capacity: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CarAssignment {
    pub id: Uuid,
    pub group_id: Uuid,
    pub car_id: Uuid,
    pub profile_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Group member row joined with profile display data and transport flags
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransportMemberRow {
    pub profile_id: Uuid,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub has_license: bool,
    pub has_car: bool,
}

/// One group member in the transport view; `car_id` is `None` for
/// pedestrians.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMemberView {
    pub profile_id: Uuid,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub has_license: bool,
    pub has_car: bool,
    pub car_id: Option<Uuid>,
}

/// Active car joined with its owner's display data
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CarWithOwner {
    pub id: Uuid,
    pub group_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub owner_username: Option<String>,
    pub owner_full_name: Option<String>,
}

/// Assignment joined with the occupant's display data
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentWithProfile {
    pub car_id: Uuid,
    pub profile_id: Uuid,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupantView {
    pub profile_id: Uuid,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: Option<String>,
    pub owner_full_name: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub occupants: Vec<OccupantView>,
    pub remaining_capacity: i32,
}

/// Read-only aggregate of a group's transport situation. Assembled fresh
/// from the stored entities on every read; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTransportView {
    pub group_id: Uuid,
    pub members: Vec<TransportMemberView>,
    pub cars: Vec<CarView>,
    pub pedestrians: Vec<OccupantView>,
}
