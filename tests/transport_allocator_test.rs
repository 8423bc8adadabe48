//! Carpool allocator integration tests
//!
//! Exercises the transport service against a real Postgres instance:
//! preference upserts, car registration, seat assignment under capacity and
//! single-seat rules (including concurrent joins), and the derived group
//! transport view.

mod helpers;

use assert_matches::assert_matches;
use futures::future::join_all;
use serial_test::serial;
use uuid::Uuid;
use SkiAmi::database::DatabaseService;
use SkiAmi::models::{CarView, GroupTransportView};
use SkiAmi::services::{CacheService, ServiceFactory};
use SkiAmi::utils::SkiAmiError;

use helpers::database_helper::TestDatabase;
use helpers::test_data;

/// A trip with one group, seeded through the services. The first profile
/// created both and leads both.
struct SeededGroup {
    trip_id: Uuid,
    group_id: Uuid,
    profiles: Vec<Uuid>,
}

async fn setup() -> (TestDatabase, ServiceFactory) {
    let db = TestDatabase::new()
        .await
        .expect("Failed to create test database");
    let services =
        ServiceFactory::with_cache(DatabaseService::new(db.pool.clone()), CacheService::disabled());
    (db, services)
}

async fn seed_group(db: &TestDatabase, services: &ServiceFactory, member_count: usize) -> SeededGroup {
    let mut profiles = Vec::with_capacity(member_count);
    for i in 0..member_count {
        let profile_id = db
            .insert_profile(&format!("member{}", i))
            .await
            .expect("Failed to insert profile");
        profiles.push(profile_id);
    }

    let organizer = profiles[0];
    let trip = services
        .trip_service
        .create_trip(organizer, test_data::trip_request("Les Arcs"))
        .await
        .expect("Failed to create trip");
    for profile_id in profiles[1..].iter().copied() {
        services
            .trip_service
            .add_member(trip.id, organizer, test_data::trip_member_request(profile_id))
            .await
            .expect("Failed to add trip member");
    }

    let group = services
        .group_service
        .create_group(trip.id, organizer, test_data::group_request("Carpool crew"))
        .await
        .expect("Failed to create group");
    for profile_id in profiles[1..].iter().copied() {
        services
            .group_service
            .join_group(group.id, profile_id)
            .await
            .expect("Failed to join group");
    }

    SeededGroup {
        trip_id: trip.id,
        group_id: group.id,
        profiles,
    }
}

fn car_view<'a>(view: &'a GroupTransportView, car_id: Uuid) -> &'a CarView {
    view.cars
        .iter()
        .find(|car| car.id == car_id)
        .expect("car missing from view")
}

fn occupant_ids(car: &CarView) -> Vec<Uuid> {
    car.occupants.iter().map(|o| o.profile_id).collect()
}

fn pedestrian_ids(view: &GroupTransportView) -> Vec<Uuid> {
    view.pedestrians.iter().map(|p| p.profile_id).collect()
}

#[tokio::test]
#[serial]
async fn test_set_preference_upserts_partial_flags() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 1).await;
    let member = seeded.profiles[0];

    let preference = services
        .transport_service
        .set_preference(
            seeded.group_id,
            member,
            test_data::preference_request(Some(true), None),
        )
        .await
        .expect("set has_license");
    assert!(preference.has_license);
    assert!(!preference.has_car);

    // Omitted flags keep their stored value
    let preference = services
        .transport_service
        .set_preference(
            seeded.group_id,
            member,
            test_data::preference_request(None, Some(true)),
        )
        .await
        .expect("set has_car");
    assert!(preference.has_license);
    assert!(preference.has_car);

    // Repeating the same call changes nothing
    let repeated = services
        .transport_service
        .set_preference(
            seeded.group_id,
            member,
            test_data::preference_request(None, Some(true)),
        )
        .await
        .expect("repeat set has_car");
    assert!(repeated.has_license);
    assert!(repeated.has_car);

    // The flags surface on the member's row in the group view
    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, member)
        .await
        .expect("view");
    let row = view
        .members
        .iter()
        .find(|m| m.profile_id == member)
        .expect("member row");
    assert!(row.has_license);
    assert!(row.has_car);
}

#[tokio::test]
#[serial]
async fn test_set_preference_requires_group_membership() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 1).await;
    let outsider = db.insert_profile("outsider").await.expect("insert profile");

    let err = services
        .transport_service
        .set_preference(
            seeded.group_id,
            outsider,
            test_data::preference_request(Some(true), None),
        )
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::MemberNotFound { profile_id, .. } if profile_id == outsider);

    let unknown_group = Uuid::new_v4();
    let err = services
        .transport_service
        .set_preference(
            unknown_group,
            seeded.profiles[0],
            test_data::preference_request(Some(true), None),
        )
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::GroupNotFound { group_id } if group_id == unknown_group);
}

#[tokio::test]
#[serial]
async fn test_register_car_validates_input() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 1).await;
    let owner = seeded.profiles[0];

    for capacity in [0, 10, -1] {
        let err = services
            .transport_service
            .register_car(seeded.group_id, owner, test_data::car_request("Clio", capacity))
            .await
            .unwrap_err();
        assert_matches!(err, SkiAmiError::Validation(msg) if msg.contains("capacity"));
    }

    let err = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("x", 4))
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::Validation(msg) if msg.contains("name"));

    // Both capacity bounds are registrable, and the name is normalized
    let solo = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Smart  Fortwo", 1))
        .await
        .expect("capacity 1");
    assert_eq!(solo.capacity, 1);
    assert_eq!(solo.name, "Smart Fortwo");

    let van = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request(" Minibus ", 9))
        .await
        .expect("capacity 9");
    assert_eq!(van.capacity, 9);
    assert_eq!(van.name, "Minibus");
    assert!(van.is_active);
}

#[tokio::test]
#[serial]
async fn test_view_reports_occupants_and_pedestrians() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 3).await;
    let (anna, bob, carol) = (seeded.profiles[0], seeded.profiles[1], seeded.profiles[2]);

    let clio = services
        .transport_service
        .register_car(seeded.group_id, anna, test_data::car_request("Clio", 3))
        .await
        .expect("register car");

    services
        .transport_service
        .join_car(seeded.group_id, anna, clio.id)
        .await
        .expect("anna joins");
    services
        .transport_service
        .join_car(seeded.group_id, bob, clio.id)
        .await
        .expect("bob joins");

    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, carol)
        .await
        .expect("view");
    assert_eq!(view.group_id, seeded.group_id);
    assert_eq!(view.cars.len(), 1);

    let car = car_view(&view, clio.id);
    assert_eq!(car.name, "Clio");
    assert_eq!(car.capacity, 3);
    assert_eq!(occupant_ids(car), vec![anna, bob]);
    assert_eq!(car.remaining_capacity, 1);
    assert_eq!(pedestrian_ids(&view), vec![carol]);

    // Member rows carry the same assignment
    for member in &view.members {
        if member.profile_id == carol {
            assert_eq!(member.car_id, None);
        } else {
            assert_eq!(member.car_id, Some(clio.id));
        }
    }

    // The last free seat goes to Carol and the group has no pedestrians left
    services
        .transport_service
        .join_car(seeded.group_id, carol, clio.id)
        .await
        .expect("carol joins");
    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, anna)
        .await
        .expect("view");
    let car = car_view(&view, clio.id);
    assert_eq!(occupant_ids(car), vec![anna, bob, carol]);
    assert_eq!(car.remaining_capacity, 0);
    assert!(view.pedestrians.is_empty());
}

#[tokio::test]
#[serial]
async fn test_join_car_rejects_second_seat() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 2).await;
    let (owner, rider) = (seeded.profiles[0], seeded.profiles[1]);

    let first = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Clio", 4))
        .await
        .expect("register first car");
    let second = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Passat", 4))
        .await
        .expect("register second car");

    services
        .transport_service
        .join_car(seeded.group_id, rider, first.id)
        .await
        .expect("first join");

    // Same car again
    let err = services
        .transport_service
        .join_car(seeded.group_id, rider, first.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::AlreadyAssigned { profile_id, .. } if profile_id == rider);

    // A different car without leaving first
    let err = services
        .transport_service
        .join_car(seeded.group_id, rider, second.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::AlreadyAssigned { profile_id, .. } if profile_id == rider);

    // The original seat is untouched
    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, owner)
        .await
        .expect("view");
    assert_eq!(occupant_ids(car_view(&view, first.id)), vec![rider]);
    assert!(car_view(&view, second.id).occupants.is_empty());
}

#[tokio::test]
#[serial]
async fn test_join_car_enforces_capacity() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 4).await;
    let owner = seeded.profiles[0];

    let car = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Smart", 2))
        .await
        .expect("register car");

    for profile_id in [seeded.profiles[0], seeded.profiles[1]] {
        services
            .transport_service
            .join_car(seeded.group_id, profile_id, car.id)
            .await
            .expect("join within capacity");
    }

    let err = services
        .transport_service
        .join_car(seeded.group_id, seeded.profiles[2], car.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::CarFull { capacity, .. } if capacity == 2);

    assert_eq!(
        db.count_records("car_assignments").await.expect("count"),
        2
    );
}

#[tokio::test]
#[serial]
async fn test_join_then_leave_restores_pedestrian() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 2).await;
    let (owner, rider) = (seeded.profiles[0], seeded.profiles[1]);

    let car = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Clio", 3))
        .await
        .expect("register car");

    services
        .transport_service
        .join_car(seeded.group_id, rider, car.id)
        .await
        .expect("join");
    services
        .transport_service
        .leave_car(seeded.group_id, rider, car.id)
        .await
        .expect("leave");

    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, owner)
        .await
        .expect("view");
    let car_row = car_view(&view, car.id);
    assert!(car_row.occupants.is_empty());
    assert_eq!(car_row.remaining_capacity, 3);
    assert!(pedestrian_ids(&view).contains(&rider));

    // No residual assignment row either
    assert_eq!(db.count_records("car_assignments").await.expect("count"), 0);

    // And the freed seat is immediately usable
    services
        .transport_service
        .join_car(seeded.group_id, rider, car.id)
        .await
        .expect("rejoin");
}

#[tokio::test]
#[serial]
async fn test_leave_car_without_seat_is_rejected() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 2).await;
    let (owner, rider) = (seeded.profiles[0], seeded.profiles[1]);

    let first = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Clio", 3))
        .await
        .expect("register first car");
    let second = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Passat", 3))
        .await
        .expect("register second car");

    // Never joined anything
    let err = services
        .transport_service
        .leave_car(seeded.group_id, rider, first.id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        SkiAmiError::NotAssigned { profile_id, car_id } if profile_id == rider && car_id == first.id
    );

    // Joined a different car than the one being left
    services
        .transport_service
        .join_car(seeded.group_id, rider, first.id)
        .await
        .expect("join");
    let err = services
        .transport_service
        .leave_car(seeded.group_id, rider, second.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::NotAssigned { car_id, .. } if car_id == second.id);

    // The held seat survived the failed leave
    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, owner)
        .await
        .expect("view");
    assert_eq!(occupant_ids(car_view(&view, first.id)), vec![rider]);
}

#[tokio::test]
#[serial]
async fn test_cars_outside_the_group_are_invisible() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 2).await;
    let (organizer, rider) = (seeded.profiles[0], seeded.profiles[1]);

    // Unknown car id
    let unknown_car = Uuid::new_v4();
    let err = services
        .transport_service
        .join_car(seeded.group_id, rider, unknown_car)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::CarNotFound { car_id } if car_id == unknown_car);

    // Deactivated car
    let retired = services
        .transport_service
        .register_car(seeded.group_id, organizer, test_data::car_request("Old Golf", 3))
        .await
        .expect("register car");
    services
        .transport_service
        .deactivate_car(seeded.group_id, organizer, retired.id)
        .await
        .expect("deactivate");
    let err = services
        .transport_service
        .join_car(seeded.group_id, rider, retired.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::CarNotFound { car_id } if car_id == retired.id);

    // A car registered in a sibling group of the same trip
    let other_group = services
        .group_service
        .create_group(seeded.trip_id, organizer, test_data::group_request("Second van"))
        .await
        .expect("create sibling group");
    let foreign = services
        .transport_service
        .register_car(other_group.id, organizer, test_data::car_request("Transit", 9))
        .await
        .expect("register foreign car");
    let err = services
        .transport_service
        .join_car(seeded.group_id, rider, foreign.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::CarNotFound { car_id } if car_id == foreign.id);
}

#[tokio::test]
#[serial]
async fn test_deactivate_car_requires_owner_or_leader() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 3).await;
    let (leader, owner, rider) = (seeded.profiles[0], seeded.profiles[1], seeded.profiles[2]);

    let car = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Clio", 3))
        .await
        .expect("register car");
    services
        .transport_service
        .join_car(seeded.group_id, rider, car.id)
        .await
        .expect("rider joins");

    // A plain member who does not own the car may not remove it
    let err = services
        .transport_service
        .deactivate_car(seeded.group_id, rider, car.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::PermissionDenied(_));

    // The owner may; occupants become pedestrians again
    services
        .transport_service
        .deactivate_car(seeded.group_id, owner, car.id)
        .await
        .expect("owner deactivates");
    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, owner)
        .await
        .expect("view");
    assert!(view.cars.is_empty());
    assert!(pedestrian_ids(&view).contains(&rider));

    // Freed occupants can take a seat elsewhere right away
    let replacement = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Passat", 3))
        .await
        .expect("register replacement");
    services
        .transport_service
        .join_car(seeded.group_id, rider, replacement.id)
        .await
        .expect("rider rejoins");

    // The group leader may remove a car they do not own
    services
        .transport_service
        .deactivate_car(seeded.group_id, leader, replacement.id)
        .await
        .expect("leader deactivates");

    // Removing it twice reports it as gone
    let err = services
        .transport_service
        .deactivate_car(seeded.group_id, owner, replacement.id)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::CarNotFound { car_id } if car_id == replacement.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_joins_fill_exactly_to_capacity() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 6).await;
    let owner = seeded.profiles[0];

    let car = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Clio", 3))
        .await
        .expect("register car");

    // Five members race for three seats
    let group_id = seeded.group_id;
    let mut handles = Vec::new();
    for profile_id in seeded.profiles[1..].iter().copied() {
        let transport = services.transport_service.clone();
        let car_id = car.id;
        handles.push(tokio::spawn(async move {
            transport.join_car(group_id, profile_id, car_id).await
        }));
    }

    let mut seats = 0;
    let mut rejected = 0;
    for outcome in join_all(handles).await {
        match outcome.expect("join task panicked") {
            Ok(_) => seats += 1,
            Err(SkiAmiError::CarFull { capacity, .. }) => {
                assert_eq!(capacity, 3);
                rejected += 1;
            }
            Err(e) => panic!("unexpected join error: {e}"),
        }
    }
    assert_eq!(seats, 3);
    assert_eq!(rejected, 2);

    assert_eq!(db.count_records("car_assignments").await.expect("count"), 3);
    let view = services
        .transport_service
        .group_transport_view(group_id, owner)
        .await
        .expect("view");
    let car_row = car_view(&view, car.id);
    assert_eq!(car_row.occupants.len(), 3);
    assert_eq!(car_row.remaining_capacity, 0);
    assert_eq!(view.pedestrians.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_joins_to_two_cars_take_one_seat() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 3).await;
    let racer = seeded.profiles[2];

    let first = services
        .transport_service
        .register_car(seeded.group_id, seeded.profiles[0], test_data::car_request("Clio", 4))
        .await
        .expect("register first car");
    let second = services
        .transport_service
        .register_car(seeded.group_id, seeded.profiles[1], test_data::car_request("Passat", 4))
        .await
        .expect("register second car");

    let group_id = seeded.group_id;
    let mut handles = Vec::new();
    for car_id in [first.id, second.id] {
        let transport = services.transport_service.clone();
        handles.push(tokio::spawn(async move {
            transport.join_car(group_id, racer, car_id).await
        }));
    }

    let mut seats = 0;
    let mut duplicates = 0;
    for outcome in join_all(handles).await {
        match outcome.expect("join task panicked") {
            Ok(_) => seats += 1,
            Err(SkiAmiError::AlreadyAssigned { profile_id, .. }) => {
                assert_eq!(profile_id, racer);
                duplicates += 1;
            }
            Err(e) => panic!("unexpected join error: {e}"),
        }
    }
    assert_eq!(seats, 1);
    assert_eq!(duplicates, 1);

    // Exactly one seat in the database, and the view agrees
    assert_eq!(db.count_records("car_assignments").await.expect("count"), 1);
    let view = services
        .transport_service
        .group_transport_view(group_id, racer)
        .await
        .expect("view");
    let occupied: usize = view.cars.iter().map(|car| car.occupants.len()).sum();
    assert_eq!(occupied, 1);
    assert!(!pedestrian_ids(&view).contains(&racer));
}

#[tokio::test]
#[serial]
async fn test_leaving_the_group_releases_seats_and_cars() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 3).await;
    let (organizer, owner, rider) = (seeded.profiles[0], seeded.profiles[1], seeded.profiles[2]);

    let car = services
        .transport_service
        .register_car(seeded.group_id, owner, test_data::car_request("Clio", 3))
        .await
        .expect("register car");
    services
        .transport_service
        .join_car(seeded.group_id, owner, car.id)
        .await
        .expect("owner joins own car");
    services
        .transport_service
        .join_car(seeded.group_id, rider, car.id)
        .await
        .expect("rider joins");

    services
        .group_service
        .leave_group(seeded.group_id, owner)
        .await
        .expect("owner leaves group");

    let view = services
        .transport_service
        .group_transport_view(seeded.group_id, organizer)
        .await
        .expect("view");
    assert_eq!(view.members.len(), 2);
    assert!(view.members.iter().all(|m| m.profile_id != owner));
    // The departed owner's car went with them, stranding the rider on foot
    assert!(view.cars.is_empty());
    assert!(pedestrian_ids(&view).contains(&rider));
    assert_eq!(db.count_records("car_assignments").await.expect("count"), 0);

    // The stranded rider is free to join another car
    let fallback = services
        .transport_service
        .register_car(seeded.group_id, organizer, test_data::car_request("Passat", 3))
        .await
        .expect("register fallback");
    services
        .transport_service
        .join_car(seeded.group_id, rider, fallback.id)
        .await
        .expect("rider joins fallback");
}

#[tokio::test]
#[serial]
async fn test_view_requires_group_membership() {
    let (db, services) = setup().await;
    let seeded = seed_group(&db, &services, 1).await;
    let outsider = db.insert_profile("outsider").await.expect("insert profile");

    let err = services
        .transport_service
        .group_transport_view(seeded.group_id, outsider)
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::MemberNotFound { profile_id, .. } if profile_id == outsider);

    let unknown_group = Uuid::new_v4();
    let err = services
        .transport_service
        .group_transport_view(unknown_group, seeded.profiles[0])
        .await
        .unwrap_err();
    assert_matches!(err, SkiAmiError::GroupNotFound { group_id } if group_id == unknown_group);
}
