//! Transport service implementation
//!
//! This service handles a group's carpooling: transport preferences, car
//! registration and removal, seat assignments, and the aggregated transport
//! view. Capacity and single-seat rules are enforced transactionally in the
//! repository; this layer adds membership gating, input validation and the
//! versioned view cache.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::repositories::{GroupRepository, TransportRepository};
use crate::models::transport::{
    AssignmentWithProfile, Car, CarAssignment, CarView, CarWithOwner, GroupTransportView,
    OccupantView, RegisterCarRequest, TransportMemberRow, TransportMemberView, TransportProfile,
    UpdateTransportPreferenceRequest,
};
use crate::services::cache::CacheService;
use crate::utils::errors::{Result, SkiAmiError};
use crate::utils::helpers;

/// Transport service for managing a group's carpool
#[derive(Clone)]
pub struct TransportService {
    transport_repository: TransportRepository,
    group_repository: GroupRepository,
    cache_service: CacheService,
}

impl TransportService {
    /// Create a new TransportService instance
    pub fn new(
        transport_repository: TransportRepository,
        group_repository: GroupRepository,
        cache_service: CacheService,
    ) -> Self {
        Self {
            transport_repository,
            group_repository,
            cache_service,
        }
    }

    /// Set a member's transport flags in a group. Upserts: the first call
    /// creates the row, later calls patch the provided flags, and repeating
    /// a call leaves the state unchanged.
    pub async fn set_preference(
        &self,
        group_id: Uuid,
        profile_id: Uuid,
        request: UpdateTransportPreferenceRequest,
    ) -> Result<TransportProfile> {
        debug!(group_id = %group_id, profile_id = %profile_id, "Setting transport preference");

        self.require_member(group_id, profile_id).await?;

        let preference = self
            .transport_repository
            .upsert_preference(group_id, profile_id, request)
            .await?;
        self.bump_view_version(group_id).await;
        info!(
            group_id = %group_id,
            profile_id = %profile_id,
            has_license = preference.has_license,
            has_car = preference.has_car,
            "Transport preference saved"
        );

        Ok(preference)
    }

    /// Register a car in a group. The caller becomes its owner; owning a
    /// car does not occupy a seat in it.
    pub async fn register_car(
        &self,
        group_id: Uuid,
        owner_id: Uuid,
        request: RegisterCarRequest,
    ) -> Result<Car> {
        debug!(group_id = %group_id, owner_id = %owner_id, "Registering car");

        self.require_member(group_id, owner_id).await?;
        let request = Self::sanitize_car_request(request)?;

        let car = self
            .transport_repository
            .create_car(group_id, owner_id, request)
            .await?;
        self.bump_view_version(group_id).await;
        info!(group_id = %group_id, car_id = %car.id, owner_id = %owner_id, capacity = car.capacity, "Car registered");

        Ok(car)
    }

    /// Take a seat in a car. Fails with `AlreadyAssigned` if the member
    /// holds any seat in the group and with `CarFull` if the car has no
    /// seat left; both checks run atomically against concurrent joins.
    pub async fn join_car(
        &self,
        group_id: Uuid,
        profile_id: Uuid,
        car_id: Uuid,
    ) -> Result<CarAssignment> {
        debug!(group_id = %group_id, car_id = %car_id, profile_id = %profile_id, "Joining car");

        self.require_member(group_id, profile_id).await?;

        let assignment = self
            .transport_repository
            .insert_assignment(group_id, car_id, profile_id)
            .await?;
        self.bump_view_version(group_id).await;
        info!(group_id = %group_id, car_id = %car_id, profile_id = %profile_id, "Seat taken");

        Ok(assignment)
    }

    /// Give up a seat in a car, returning the member to pedestrian status
    pub async fn leave_car(&self, group_id: Uuid, profile_id: Uuid, car_id: Uuid) -> Result<()> {
        debug!(group_id = %group_id, car_id = %car_id, profile_id = %profile_id, "Leaving car");

        self.require_member(group_id, profile_id).await?;
        self.require_active_car(group_id, car_id).await?;

        let removed = self
            .transport_repository
            .delete_assignment(group_id, car_id, profile_id)
            .await?;
        if !removed {
            return Err(SkiAmiError::NotAssigned { profile_id, car_id });
        }

        self.bump_view_version(group_id).await;
        info!(group_id = %group_id, car_id = %car_id, profile_id = %profile_id, "Seat released");

        Ok(())
    }

    /// Remove a car from the group's carpool. Allowed for the car's owner
    /// and for group leaders. Occupants become pedestrians.
    pub async fn deactivate_car(&self, group_id: Uuid, actor_id: Uuid, car_id: Uuid) -> Result<()> {
        debug!(group_id = %group_id, car_id = %car_id, actor_id = %actor_id, "Deactivating car");

        self.require_member(group_id, actor_id).await?;
        let car = self.require_active_car(group_id, car_id).await?;

        if car.owner_id != actor_id && !self.group_repository.is_leader(group_id, actor_id).await? {
            warn!(group_id = %group_id, car_id = %car_id, actor_id = %actor_id, "Unauthorized car removal attempt");
            return Err(SkiAmiError::PermissionDenied(
                "only the car owner or a group leader can remove a car".to_string(),
            ));
        }

        let removed = self
            .transport_repository
            .deactivate_car(group_id, car_id)
            .await?;
        if !removed {
            // Lost a race with another removal
            return Err(SkiAmiError::CarNotFound { car_id });
        }

        self.bump_view_version(group_id).await;
        info!(group_id = %group_id, car_id = %car_id, actor_id = %actor_id, "Car deactivated");

        Ok(())
    }

    /// Aggregate a group's transport situation: members with their flags,
    /// active cars with occupants and remaining seats, and pedestrians.
    /// Served from the versioned cache when a current copy exists.
    pub async fn group_transport_view(
        &self,
        group_id: Uuid,
        caller_id: Uuid,
    ) -> Result<GroupTransportView> {
        debug!(group_id = %group_id, caller_id = %caller_id, "Building group transport view");

        self.require_member(group_id, caller_id).await?;

        let version = match self.cache_service.transport_view_version(group_id).await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(group_id = %group_id, error = %e, "Failed to read transport view version");
                None
            }
        };

        if let Some(version) = version {
            match self
                .cache_service
                .get_transport_view(group_id, version)
                .await
            {
                Ok(Some(view)) => {
                    debug!(group_id = %group_id, version = version, "Transport view served from cache");
                    return Ok(view);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(group_id = %group_id, error = %e, "Failed to read cached transport view")
                }
            }
        }

        let members = self.transport_repository.list_member_rows(group_id).await?;
        let cars = self.transport_repository.list_active_cars(group_id).await?;
        let assignments = self.transport_repository.list_assignments(group_id).await?;
        let view = build_view(group_id, members, cars, assignments);

        if let Some(version) = version {
            if let Err(e) = self
                .cache_service
                .put_transport_view(group_id, version, &view)
                .await
            {
                warn!(group_id = %group_id, error = %e, "Failed to cache transport view");
            }
        }

        Ok(view)
    }

    async fn require_member(&self, group_id: Uuid, profile_id: Uuid) -> Result<()> {
        self.group_repository
            .find_by_id(group_id)
            .await?
            .ok_or(SkiAmiError::GroupNotFound { group_id })?;

        if !self.group_repository.is_member(group_id, profile_id).await? {
            return Err(SkiAmiError::MemberNotFound {
                profile_id,
                group_id,
            });
        }
        Ok(())
    }

    /// A car outside the group or already deactivated is reported as
    /// missing, for every operation alike.
    async fn require_active_car(&self, group_id: Uuid, car_id: Uuid) -> Result<Car> {
        let car = self.transport_repository.find_car(car_id).await?;
        match car {
            Some(car) if car.group_id == group_id && car.is_active => Ok(car),
            _ => Err(SkiAmiError::CarNotFound { car_id }),
        }
    }

    /// Cache invalidation is best-effort; a failure only delays the view
    async fn bump_view_version(&self, group_id: Uuid) {
        if let Err(e) = self.cache_service.bump_transport_version(group_id).await {
            warn!(group_id = %group_id, error = %e, "Failed to bump transport view version");
        }
    }

    fn sanitize_car_request(request: RegisterCarRequest) -> Result<RegisterCarRequest> {
        let name = helpers::normalize_whitespace(&request.name);
        if name.len() < 2 || name.len() > 64 {
            return Err(SkiAmiError::Validation(
                "car name must be between 2 and 64 characters".to_string(),
            ));
        }

        if !(1..=9).contains(&request.capacity) {
            return Err(SkiAmiError::Validation(
                "car capacity must be between 1 and 9 seats".to_string(),
            ));
        }

        let description = request.description.and_then(|d| {
            let trimmed = d.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        });
        if let Some(description) = &description {
            if description.len() > 500 {
                return Err(SkiAmiError::Validation(
                    "car description cannot exceed 500 characters".to_string(),
                ));
            }
        }

        Ok(RegisterCarRequest {
            name,
            capacity: request.capacity,
            description,
        })
    }
}

/// Assemble the transport view from entity snapshots. Assignments whose car
/// is missing from the cars snapshot (removed between reads) are dropped so
/// the view stays internally consistent: every member lands either in
/// exactly one car's occupant list or among the pedestrians.
fn build_view(
    group_id: Uuid,
    members: Vec<TransportMemberRow>,
    cars: Vec<CarWithOwner>,
    assignments: Vec<AssignmentWithProfile>,
) -> GroupTransportView {
    let known_cars: HashSet<Uuid> = cars.iter().map(|car| car.id).collect();

    let mut assigned_car: HashMap<Uuid, Uuid> = HashMap::new();
    let mut occupants_by_car: HashMap<Uuid, Vec<OccupantView>> = HashMap::new();
    for assignment in &assignments {
        if !known_cars.contains(&assignment.car_id) {
            continue;
        }
        assigned_car.insert(assignment.profile_id, assignment.car_id);
        occupants_by_car
            .entry(assignment.car_id)
            .or_default()
            .push(OccupantView {
                profile_id: assignment.profile_id,
                username: assignment.username.clone(),
                full_name: assignment.full_name.clone(),
                avatar_url: assignment.avatar_url.clone(),
            });
    }

    let car_views: Vec<CarView> = cars
        .into_iter()
        .map(|car| {
            let occupants = occupants_by_car.remove(&car.id).unwrap_or_default();
            let remaining_capacity = car.capacity - occupants.len() as i32;
            CarView {
                id: car.id,
                owner_id: car.owner_id,
                owner_username: car.owner_username,
                owner_full_name: car.owner_full_name,
                name: car.name,
                description: car.description,
                capacity: car.capacity,
                occupants,
                remaining_capacity,
            }
        })
        .collect();

    let pedestrians: Vec<OccupantView> = members
        .iter()
        .filter(|member| !assigned_car.contains_key(&member.profile_id))
        .map(|member| OccupantView {
            profile_id: member.profile_id,
            username: member.username.clone(),
            full_name: member.full_name.clone(),
            avatar_url: member.avatar_url.clone(),
        })
        .collect();

    let member_views: Vec<TransportMemberView> = members
        .into_iter()
        .map(|member| {
            let car_id = assigned_car.get(&member.profile_id).copied();
            TransportMemberView {
                profile_id: member.profile_id,
                username: member.username,
                full_name: member.full_name,
                avatar_url: member.avatar_url,
                has_license: member.has_license,
                has_car: member.has_car,
                car_id,
            }
        })
        .collect();

    GroupTransportView {
        group_id,
        members: member_views,
        cars: car_views,
        pedestrians,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn member(n: u32) -> TransportMemberRow {
        TransportMemberRow {
            profile_id: Uuid::from_u128(u128::from(n) + 1),
            username: Some(format!("user{}", n)),
            full_name: Some(format!("User {}", n)),
            avatar_url: None,
            has_license: false,
            has_car: false,
        }
    }

    fn car(id: u32, owner: &TransportMemberRow, capacity: i32) -> CarWithOwner {
        CarWithOwner {
            id: Uuid::from_u128(0xCA0000 + u128::from(id)),
            group_id: Uuid::from_u128(0x6000),
            owner_id: owner.profile_id,
            name: format!("Car {}", id),
            description: None,
            capacity,
            created_at: Utc::now(),
            owner_username: owner.username.clone(),
            owner_full_name: owner.full_name.clone(),
        }
    }

    fn seat(car: &CarWithOwner, member: &TransportMemberRow) -> AssignmentWithProfile {
        AssignmentWithProfile {
            car_id: car.id,
            profile_id: member.profile_id,
            username: member.username.clone(),
            full_name: member.full_name.clone(),
            avatar_url: member.avatar_url.clone(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_view_empty_group() {
        let view = build_view(Uuid::from_u128(0x6000), vec![], vec![], vec![]);
        assert!(view.members.is_empty());
        assert!(view.cars.is_empty());
        assert!(view.pedestrians.is_empty());
    }

    #[test]
    fn test_build_view_full_car_and_pedestrian() {
        let members: Vec<_> = (0..4).map(member).collect();
        let clio = car(1, &members[0], 3);
        let assignments = vec![
            seat(&clio, &members[0]),
            seat(&clio, &members[1]),
            seat(&clio, &members[2]),
        ];

        let view = build_view(
            Uuid::from_u128(0x6000),
            members.clone(),
            vec![clio.clone()],
            assignments,
        );

        assert_eq!(view.cars.len(), 1);
        assert_eq!(view.cars[0].occupants.len(), 3);
        assert_eq!(view.cars[0].remaining_capacity, 0);
        assert_eq!(view.pedestrians.len(), 1);
        assert_eq!(view.pedestrians[0].profile_id, members[3].profile_id);
        for m in &view.members[..3] {
            assert_eq!(m.car_id, Some(clio.id));
        }
        assert_eq!(view.members[3].car_id, None);
    }

    #[test]
    fn test_build_view_owner_without_seat_is_pedestrian() {
        let members: Vec<_> = (0..2).map(member).collect();
        let owned = car(1, &members[0], 4);
        let assignments = vec![seat(&owned, &members[1])];

        let view = build_view(
            Uuid::from_u128(0x6000),
            members.clone(),
            vec![owned],
            assignments,
        );

        assert_eq!(view.cars[0].occupants.len(), 1);
        assert_eq!(view.cars[0].remaining_capacity, 3);
        assert_eq!(view.pedestrians.len(), 1);
        assert_eq!(view.pedestrians[0].profile_id, members[0].profile_id);
    }

    #[test]
    fn test_build_view_drops_assignments_for_missing_cars() {
        let members: Vec<_> = (0..2).map(member).collect();
        let gone = car(9, &members[0], 2);
        let assignments = vec![seat(&gone, &members[1])];

        let view = build_view(Uuid::from_u128(0x6000), members.clone(), vec![], assignments);

        assert!(view.cars.is_empty());
        assert_eq!(view.pedestrians.len(), 2);
        assert_eq!(view.members[1].car_id, None);
    }

    #[test]
    fn test_sanitize_car_request_rejects_bad_capacity() {
        for capacity in [0, -1, 10] {
            let result = TransportService::sanitize_car_request(RegisterCarRequest {
                name: "Clio".to_string(),
                capacity,
                description: None,
            });
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_sanitize_car_request_normalizes_fields() {
        let request = TransportService::sanitize_car_request(RegisterCarRequest {
            name: "  Red   Clio ".to_string(),
            capacity: 3,
            description: Some("   ".to_string()),
        })
        .unwrap();
        assert_eq!(request.name, "Red Clio");
        assert_eq!(request.description, None);
    }

    #[test]
    fn test_sanitize_car_request_rejects_short_name() {
        let result = TransportService::sanitize_car_request(RegisterCarRequest {
            name: " x ".to_string(),
            capacity: 3,
            description: None,
        });
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn view_partitions_members(
            member_count in 0usize..12,
            capacity in 1i32..=9,
            requested in 0usize..12,
        ) {
            let members: Vec<_> = (0..member_count as u32).map(member).collect();
            let (cars, assignments) = if members.is_empty() {
                (vec![], vec![])
            } else {
                let c = car(1, &members[0], capacity);
                let assigned = requested.min(member_count).min(capacity as usize);
                let assignments = members[..assigned].iter().map(|m| seat(&c, m)).collect();
                (vec![c], assignments)
            };
            let assigned_count = assignments.len();

            let view = build_view(Uuid::from_u128(0x6000), members, cars, assignments);

            // Every member appears exactly once, in a car or on foot
            let in_cars: usize = view.cars.iter().map(|c| c.occupants.len()).sum();
            prop_assert_eq!(in_cars + view.pedestrians.len(), member_count);
            prop_assert_eq!(in_cars, assigned_count);

            // Seat arithmetic holds and no car is overfull
            for car_view in &view.cars {
                prop_assert!(car_view.occupants.len() as i32 <= car_view.capacity);
                prop_assert_eq!(
                    car_view.remaining_capacity,
                    car_view.capacity - car_view.occupants.len() as i32
                );
            }

            // A member's car_id agrees with the occupant lists
            for m in &view.members {
                let seated = view
                    .cars
                    .iter()
                    .any(|c| c.occupants.iter().any(|o| o.profile_id == m.profile_id));
                prop_assert_eq!(m.car_id.is_some(), seated);
            }
        }
    }
}
