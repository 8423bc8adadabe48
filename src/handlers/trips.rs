//! Trip handlers

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::AuthMember;
use crate::models::trip::{
    AddTripMemberRequest, CreateTripRequest, Trip, TripMember, TripMemberView, UpdateTripRequest,
};
use crate::services::ServiceFactory;
use crate::utils::errors::SkiAmiError;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Create a trip; the caller becomes its first admin
pub async fn create_trip(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Json(request): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), SkiAmiError> {
    let trip = services
        .trip_service
        .create_trip(member.profile_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

/// List the caller's trips
pub async fn list_trips(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Trip>>, SkiAmiError> {
    let trips = services
        .trip_service
        .list_trips(member.profile_id, pagination.page, pagination.per_page)
        .await?;
    Ok(Json(trips))
}

/// Get a trip the caller belongs to
pub async fn get_trip(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, SkiAmiError> {
    let trip = services
        .trip_service
        .get_trip(trip_id, member.profile_id)
        .await?;
    Ok(Json(trip))
}

/// Patch trip fields; admin only
pub async fn update_trip(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<UpdateTripRequest>,
) -> Result<Json<Trip>, SkiAmiError> {
    let trip = services
        .trip_service
        .update_trip(trip_id, member.profile_id, request)
        .await?;
    Ok(Json(trip))
}

/// Add a member to a trip; admin only
pub async fn add_member(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<AddTripMemberRequest>,
) -> Result<(StatusCode, Json<TripMember>), SkiAmiError> {
    let added = services
        .trip_service
        .add_member(trip_id, member.profile_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// List a trip's members
pub async fn list_members(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Vec<TripMemberView>>, SkiAmiError> {
    let members = services
        .trip_service
        .get_members(trip_id, member.profile_id)
        .await?;
    Ok(Json(members))
}
