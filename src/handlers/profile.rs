//! Profile handlers

use axum::{Extension, Json};

use crate::middleware::AuthMember;
use crate::models::profile::{Profile, UpdateProfileRequest};
use crate::services::ServiceFactory;
use crate::utils::errors::SkiAmiError;

/// Get the caller's profile
pub async fn get_profile(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
) -> Result<Json<Profile>, SkiAmiError> {
    let profile = services
        .profile_service
        .get_profile(member.profile_id)
        .await?;
    Ok(Json(profile))
}

/// Create or update the caller's profile
pub async fn upsert_profile(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, SkiAmiError> {
    let profile = services
        .profile_service
        .upsert_profile(member.profile_id, request)
        .await?;
    Ok(Json(profile))
}
