//! Group service implementation
//!
//! This service handles groups within a trip: creation, discovery, joining
//! and leaving. Groups are visible to all trip members; leaving a group also
//! releases whatever the member held in the group's carpool.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::repositories::{GroupRepository, TransportRepository, TripRepository};
use crate::models::group::{CreateGroupRequest, Group, GroupMember, GroupMemberView, GroupSummary};
use crate::services::cache::CacheService;
use crate::utils::errors::{Result, SkiAmiError};

/// Group service for managing trip groups and their membership
#[derive(Clone)]
pub struct GroupService {
    group_repository: GroupRepository,
    trip_repository: TripRepository,
    transport_repository: TransportRepository,
    cache_service: CacheService,
}

impl GroupService {
    /// Create a new GroupService instance
    pub fn new(
        group_repository: GroupRepository,
        trip_repository: TripRepository,
        transport_repository: TransportRepository,
        cache_service: CacheService,
    ) -> Self {
        Self {
            group_repository,
            trip_repository,
            transport_repository,
            cache_service,
        }
    }

    /// Create a group in a trip; the creator becomes its leader
    pub async fn create_group(
        &self,
        trip_id: Uuid,
        creator_id: Uuid,
        request: CreateGroupRequest,
    ) -> Result<Group> {
        debug!(trip_id = %trip_id, creator_id = %creator_id, "Creating group");

        self.require_trip_member(trip_id, creator_id).await?;
        Self::validate_name(&request.name)?;
        if let Some(description) = &request.description {
            Self::validate_description(description)?;
        }

        let group = self
            .group_repository
            .create(trip_id, creator_id, request)
            .await?;
        info!(group_id = %group.id, trip_id = %trip_id, creator_id = %creator_id, "Group created");

        Ok(group)
    }

    /// Get a group; visible to any member of its trip
    pub async fn get_group(&self, group_id: Uuid, caller_id: Uuid) -> Result<Group> {
        debug!(group_id = %group_id, caller_id = %caller_id, "Fetching group");

        let group = self
            .group_repository
            .find_by_id(group_id)
            .await?
            .ok_or(SkiAmiError::GroupNotFound { group_id })?;

        if !self
            .trip_repository
            .is_member(group.trip_id, caller_id)
            .await?
        {
            return Err(SkiAmiError::GroupNotFound { group_id });
        }

        Ok(group)
    }

    /// List a trip's groups with member counts
    pub async fn list_groups(&self, trip_id: Uuid, caller_id: Uuid) -> Result<Vec<GroupSummary>> {
        debug!(trip_id = %trip_id, caller_id = %caller_id, "Listing groups");

        self.require_trip_member(trip_id, caller_id).await?;
        self.group_repository.list_by_trip(trip_id).await
    }

    /// Join a group as a regular member
    pub async fn join_group(&self, group_id: Uuid, caller_id: Uuid) -> Result<GroupMember> {
        debug!(group_id = %group_id, caller_id = %caller_id, "Joining group");

        self.get_group(group_id, caller_id).await?;

        let member = self
            .group_repository
            .add_member(group_id, caller_id, "member")
            .await?;

        match member {
            Some(member) => {
                info!(group_id = %group_id, profile_id = %caller_id, "Group member joined");
                self.bump_transport_version(group_id).await;
                Ok(member)
            }
            None => Err(SkiAmiError::Validation(
                "profile is already a member of this group".to_string(),
            )),
        }
    }

    /// Leave a group. The member's carpool state in the group is released:
    /// their seat is freed, their cars are deactivated and emptied.
    pub async fn leave_group(&self, group_id: Uuid, caller_id: Uuid) -> Result<()> {
        debug!(group_id = %group_id, caller_id = %caller_id, "Leaving group");

        self.group_repository
            .find_by_id(group_id)
            .await?
            .ok_or(SkiAmiError::GroupNotFound { group_id })?;

        let removed = self
            .group_repository
            .remove_member(group_id, caller_id)
            .await?;
        if !removed {
            warn!(group_id = %group_id, caller_id = %caller_id, "Leave attempted by non-member");
            return Err(SkiAmiError::MemberNotFound {
                profile_id: caller_id,
                group_id,
            });
        }

        self.transport_repository
            .release_member(group_id, caller_id)
            .await?;
        self.bump_transport_version(group_id).await;
        info!(group_id = %group_id, profile_id = %caller_id, "Group member left");

        Ok(())
    }

    /// List a group's members with profile display data
    pub async fn get_members(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Vec<GroupMemberView>> {
        debug!(group_id = %group_id, caller_id = %caller_id, "Listing group members");

        self.get_group(group_id, caller_id).await?;
        self.group_repository.get_members(group_id).await
    }

    async fn require_trip_member(&self, trip_id: Uuid, profile_id: Uuid) -> Result<()> {
        self.trip_repository
            .find_by_id(trip_id)
            .await?
            .ok_or(SkiAmiError::TripNotFound { trip_id })?;

        if !self.trip_repository.is_member(trip_id, profile_id).await? {
            return Err(SkiAmiError::TripNotFound { trip_id });
        }
        Ok(())
    }

    /// Cache invalidation is best-effort; a failure only delays the view
    async fn bump_transport_version(&self, group_id: Uuid) {
        if let Err(e) = self.cache_service.bump_transport_version(group_id).await {
            warn!(group_id = %group_id, error = %e, "Failed to bump transport view version");
        }
    }

    fn validate_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.len() < 2 || trimmed.len() > 128 {
            return Err(SkiAmiError::Validation(
                "group name must be between 2 and 128 characters".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_description(description: &str) -> Result<()> {
        if description.len() > 500 {
            return Err(SkiAmiError::Validation(
                "group description cannot exceed 500 characters".to_string(),
            ));
        }
        Ok(())
    }
}
