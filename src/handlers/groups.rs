//! Group handlers

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::middleware::AuthMember;
use crate::models::group::{CreateGroupRequest, Group, GroupMember, GroupMemberView, GroupSummary};
use crate::services::ServiceFactory;
use crate::utils::errors::SkiAmiError;

/// Create a group in a trip; the caller becomes its leader
pub async fn create_group(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), SkiAmiError> {
    let group = services
        .group_service
        .create_group(trip_id, member.profile_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// List a trip's groups with member counts
pub async fn list_groups(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Vec<GroupSummary>>, SkiAmiError> {
    let groups = services
        .group_service
        .list_groups(trip_id, member.profile_id)
        .await?;
    Ok(Json(groups))
}

/// Get a single group
pub async fn get_group(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Group>, SkiAmiError> {
    let group = services
        .group_service
        .get_group(group_id, member.profile_id)
        .await?;
    Ok(Json(group))
}

/// Join a group
pub async fn join_group(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
) -> Result<(StatusCode, Json<GroupMember>), SkiAmiError> {
    let joined = services
        .group_service
        .join_group(group_id, member.profile_id)
        .await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

/// Leave a group, releasing any carpool state held in it
pub async fn leave_group(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, SkiAmiError> {
    services
        .group_service
        .leave_group(group_id, member.profile_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a group's members
pub async fn list_members(
    Extension(services): Extension<ServiceFactory>,
    Extension(member): Extension<AuthMember>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<GroupMemberView>>, SkiAmiError> {
    let members = services
        .group_service
        .get_members(group_id, member.profile_id)
        .await?;
    Ok(Json(members))
}
