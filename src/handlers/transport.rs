//! Transport handlers
//!
//! The carpooling endpoints: preferences, cars, seat assignments and the
//! aggregated group transport view.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::middleware::AuthMember;
use crate::models::transport::{
    Car, CarAssignment, GroupTransportView, RegisterCarRequest, TransportProfile,
    UpdateTransportPreferenceRequest,
};
use crate::services::ServiceFactory;
use crate::utils::errors::SkiAmiError;

/// Set the caller's transport flags in a group
pub async fn set_preference(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<UpdateTransportPreferenceRequest>,
) -> Result<Json<TransportProfile>, SkiAmiError> {
    let preference = services
        .transport_service
        .set_preference(group_id, member.profile_id, request)
        .await?;
    Ok(Json(preference))
}

/// Get the group's aggregated transport view
pub async fn get_transport_view(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupTransportView>, SkiAmiError> {
    let view = services
        .transport_service
        .group_transport_view(group_id, member.profile_id)
        .await?;
    Ok(Json(view))
}

/// Register a car owned by the caller
pub async fn register_car(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<RegisterCarRequest>,
) -> Result<(StatusCode, Json<Car>), SkiAmiError> {
    let car = services
        .transport_service
        .register_car(group_id, member.profile_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(car)))
}

/// Remove a car; owner or group leader only
pub async fn deactivate_car(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path((group_id, car_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, SkiAmiError> {
    services
        .transport_service
        .deactivate_car(group_id, member.profile_id, car_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take a seat in a car
pub async fn join_car(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path((group_id, car_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<CarAssignment>), SkiAmiError> {
    let assignment = services
        .transport_service
        .join_car(group_id, member.profile_id, car_id)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Give up a seat in a car
pub async fn leave_car(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path((group_id, car_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, SkiAmiError> {
    services
        .transport_service
        .leave_car(group_id, member.profile_id, car_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
