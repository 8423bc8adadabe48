//! Test data helpers for creating request payloads
//!
//! Builders for the request structs the service layer consumes, with
//! sensible defaults so tests only spell out what they assert on.

use chrono::NaiveDate;
use SkiAmi::models::{
    AddTripMemberRequest, CreateGroupRequest, CreateTripRequest, RegisterCarRequest,
    UpdateProfileRequest, UpdateTransportPreferenceRequest,
};
use uuid::Uuid;

/// Profile upsert payload with just a username and display name
pub fn profile_request(username: &str) -> UpdateProfileRequest {
    UpdateProfileRequest {
        username: Some(username.to_string()),
        full_name: Some(format!("Test {}", username)),
        ..Default::default()
    }
}

/// Trip creation payload for a one-week stay
pub fn trip_request(name: &str) -> CreateTripRequest {
    CreateTripRequest {
        name: name.to_string(),
        location: "Chamonix".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 1, 17).unwrap(),
        image_url: None,
    }
}

/// Payload adding a profile to a trip with the default role
pub fn trip_member_request(profile_id: Uuid) -> AddTripMemberRequest {
    AddTripMemberRequest {
        profile_id,
        role: None,
    }
}

pub fn group_request(name: &str) -> CreateGroupRequest {
    CreateGroupRequest {
        name: name.to_string(),
        description: None,
    }
}

pub fn car_request(name: &str, capacity: i32) -> RegisterCarRequest {
    RegisterCarRequest {
        name: name.to_string(),
        capacity,
        description: None,
    }
}

pub fn preference_request(
    has_license: Option<bool>,
    has_car: Option<bool>,
) -> UpdateTransportPreferenceRequest {
    UpdateTransportPreferenceRequest {
        has_license,
        has_car,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_request_dates_are_ordered() {
        let request = trip_request("Test Trip");
        assert!(request.end_date >= request.start_date);
    }

    #[test]
    fn test_profile_request_defaults() {
        let request = profile_request("anna");
        assert_eq!(request.username.as_deref(), Some("anna"));
        assert!(request.phone.is_none());
        assert!(request.social_links.is_none());
    }
}
