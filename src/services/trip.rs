//! Trip service implementation
//!
//! This service handles trip creation, visibility, member management and
//! admin-gated updates. Trips are only visible to their members, so lookups
//! by non-members report the trip as missing rather than forbidden.

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::repositories::{ProfileRepository, TripRepository};
use crate::models::trip::{
    AddTripMemberRequest, CreateTripRequest, Trip, TripMember, TripMemberView, UpdateTripRequest,
};
use crate::utils::errors::{Result, SkiAmiError};
use crate::utils::helpers;

const TRIP_ROLES: [&str; 2] = ["admin", "member"];

/// Trip service for managing trips and their member rosters
#[derive(Clone)]
pub struct TripService {
    trip_repository: TripRepository,
    profile_repository: ProfileRepository,
}

impl TripService {
    /// Create a new TripService instance
    pub fn new(trip_repository: TripRepository, profile_repository: ProfileRepository) -> Self {
        Self {
            trip_repository,
            profile_repository,
        }
    }

    /// Create a trip; the creator becomes its first admin
    pub async fn create_trip(&self, creator_id: Uuid, request: CreateTripRequest) -> Result<Trip> {
        debug!(creator_id = %creator_id, "Creating trip");

        self.require_profile(creator_id).await?;
        Self::validate_name(&request.name)?;
        Self::validate_location(&request.location)?;
        Self::validate_dates(request.start_date, request.end_date)?;
        if let Some(image_url) = &request.image_url {
            Self::validate_image_url(image_url)?;
        }

        let trip = self.trip_repository.create(creator_id, request).await?;
        info!(trip_id = %trip.id, creator_id = %creator_id, "Trip created");

        Ok(trip)
    }

    /// Get a trip the caller is a member of
    pub async fn get_trip(&self, trip_id: Uuid, caller_id: Uuid) -> Result<Trip> {
        debug!(trip_id = %trip_id, caller_id = %caller_id, "Fetching trip");

        let trip = self
            .trip_repository
            .find_by_id(trip_id)
            .await?
            .ok_or(SkiAmiError::TripNotFound { trip_id })?;

        if !self.trip_repository.is_member(trip_id, caller_id).await? {
            return Err(SkiAmiError::TripNotFound { trip_id });
        }

        Ok(trip)
    }

    /// List the caller's trips, newest start date first
    pub async fn list_trips(
        &self,
        caller_id: Uuid,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Vec<Trip>> {
        debug!(caller_id = %caller_id, "Listing trips");

        let (limit, offset) = helpers::clamp_pagination(page, per_page);
        self.trip_repository
            .list_for_member(caller_id, limit, offset)
            .await
    }

    /// Update trip fields; only trip admins may do this
    pub async fn update_trip(
        &self,
        trip_id: Uuid,
        caller_id: Uuid,
        request: UpdateTripRequest,
    ) -> Result<Trip> {
        debug!(trip_id = %trip_id, caller_id = %caller_id, "Updating trip");

        let trip = self.get_trip(trip_id, caller_id).await?;

        if !self.trip_repository.is_admin(trip_id, caller_id).await? {
            warn!(trip_id = %trip_id, caller_id = %caller_id, "Non-admin attempted trip update");
            return Err(SkiAmiError::PermissionDenied(
                "only trip admins can update the trip".to_string(),
            ));
        }

        if let Some(name) = &request.name {
            Self::validate_name(name)?;
        }
        if let Some(location) = &request.location {
            Self::validate_location(location)?;
        }
        if let Some(image_url) = &request.image_url {
            Self::validate_image_url(image_url)?;
        }

        // Validate the date range that would result from the patch
        let start_date = request.start_date.unwrap_or(trip.start_date);
        let end_date = request.end_date.unwrap_or(trip.end_date);
        Self::validate_dates(start_date, end_date)?;

        let updated = self.trip_repository.update(trip_id, request).await?;
        info!(trip_id = %trip_id, caller_id = %caller_id, "Trip updated");

        Ok(updated)
    }

    /// Add a member to a trip; only trip admins may do this
    pub async fn add_member(
        &self,
        trip_id: Uuid,
        caller_id: Uuid,
        request: AddTripMemberRequest,
    ) -> Result<TripMember> {
        debug!(trip_id = %trip_id, caller_id = %caller_id, profile_id = %request.profile_id, "Adding trip member");

        self.get_trip(trip_id, caller_id).await?;

        if !self.trip_repository.is_admin(trip_id, caller_id).await? {
            warn!(trip_id = %trip_id, caller_id = %caller_id, "Non-admin attempted to add trip member");
            return Err(SkiAmiError::PermissionDenied(
                "only trip admins can add members".to_string(),
            ));
        }

        self.require_profile(request.profile_id).await?;

        let role = request.role.as_deref().unwrap_or("member");
        if !TRIP_ROLES.contains(&role) {
            return Err(SkiAmiError::Validation(format!(
                "role must be one of: {}",
                TRIP_ROLES.join(", ")
            )));
        }

        let member = self
            .trip_repository
            .add_member(trip_id, request.profile_id, role)
            .await?;

        match member {
            Some(member) => {
                info!(trip_id = %trip_id, profile_id = %request.profile_id, role = %role, "Trip member added");
                Ok(member)
            }
            None => Err(SkiAmiError::Validation(
                "profile is already a member of this trip".to_string(),
            )),
        }
    }

    /// List a trip's members with profile display data
    pub async fn get_members(&self, trip_id: Uuid, caller_id: Uuid) -> Result<Vec<TripMemberView>> {
        debug!(trip_id = %trip_id, caller_id = %caller_id, "Listing trip members");

        self.get_trip(trip_id, caller_id).await?;
        self.trip_repository.get_members(trip_id).await
    }

    async fn require_profile(&self, profile_id: Uuid) -> Result<()> {
        if !self.profile_repository.exists(profile_id).await? {
            return Err(SkiAmiError::ProfileNotFound { profile_id });
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.len() < 3 || trimmed.len() > 128 {
            return Err(SkiAmiError::Validation(
                "trip name must be between 3 and 128 characters".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_location(location: &str) -> Result<()> {
        let trimmed = location.trim();
        if trimmed.len() < 2 || trimmed.len() > 128 {
            return Err(SkiAmiError::Validation(
                "trip location must be between 2 and 128 characters".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
        if end_date < start_date {
            return Err(SkiAmiError::Validation(
                "trip end date cannot be before its start date".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_image_url(image_url: &str) -> Result<()> {
        if !helpers::is_valid_url(image_url) {
            return Err(SkiAmiError::Validation(
                "image_url must be an absolute http(s) URL".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_dates() {
        assert!(TripService::validate_dates(date(2025, 1, 10), date(2025, 1, 12)).is_ok());
        assert!(TripService::validate_dates(date(2025, 1, 10), date(2025, 1, 10)).is_ok());
        assert!(TripService::validate_dates(date(2025, 1, 12), date(2025, 1, 10)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(TripService::validate_name("Les Arcs 2025").is_ok());
        assert!(TripService::validate_name("  ab  ").is_err());
        assert!(TripService::validate_name(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_image_url() {
        assert!(TripService::validate_image_url("https://example.com/cover.jpg").is_ok());
        assert!(TripService::validate_image_url("not-a-url").is_err());
    }
}
