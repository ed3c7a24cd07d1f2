use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use tutordesk_core::AppError;
use tutordesk_models::ids::GrantId;
use tutordesk_models::sharing::{
    CreateGrantDto, GrantFilterParams, UpdateGrantDto, UserLesson,
};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/user-lessons",
    params(GrantFilterParams),
    responses(
        (status = 200, description = "Grants visible to the caller, newest first", body = Vec<UserLesson>),
        (status = 400, description = "Unknown permission level", body = ErrorResponse),
        (status = 403, description = "Filtering by another user requires admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sharing"
)]
#[instrument(skip(state))]
pub async fn get_grants(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<GrantFilterParams>,
) -> Result<Json<Vec<UserLesson>>, AppError> {
    let grants = state.lessons().list_grants(&auth_user.0, &params).await?;
    Ok(Json(grants))
}

#[utoipa::path(
    post,
    path = "/api/user-lessons",
    request_body = CreateGrantDto,
    responses(
        (status = 200, description = "Grant created or its level replaced", body = UserLesson),
        (status = 400, description = "Unknown permission level", body = ErrorResponse),
        (status = 403, description = "Manage permission required", body = ErrorResponse),
        (status = 404, description = "Lesson or user not found", body = ErrorResponse),
        (status = 409, description = "Concurrent share of the same pair", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sharing"
)]
#[instrument(skip(state))]
pub async fn create_grant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateGrantDto>,
) -> Result<Json<UserLesson>, AppError> {
    let grant = state
        .lessons()
        .share(dto.lesson_id, &auth_user.0, dto.user_id, &dto.permission_level)
        .await?;
    Ok(Json(grant))
}

#[utoipa::path(
    get,
    path = "/api/user-lessons/{id}",
    params(("id" = Uuid, Path, description = "Grant ID")),
    responses(
        (status = 200, description = "Grant details", body = UserLesson),
        (status = 403, description = "Not the grantee or a lesson manager", body = ErrorResponse),
        (status = 404, description = "Grant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sharing"
)]
#[instrument(skip(state))]
pub async fn get_grant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<GrantId>,
) -> Result<Json<UserLesson>, AppError> {
    let grant = state.lessons().get_grant(id, &auth_user.0).await?;
    Ok(Json(grant))
}

#[utoipa::path(
    put,
    path = "/api/user-lessons/{id}",
    params(("id" = Uuid, Path, description = "Grant ID")),
    request_body = UpdateGrantDto,
    responses(
        (status = 200, description = "Grant level replaced", body = UserLesson),
        (status = 400, description = "Unknown permission level", body = ErrorResponse),
        (status = 403, description = "Manage permission required", body = ErrorResponse),
        (status = 404, description = "Grant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sharing"
)]
#[instrument(skip(state))]
pub async fn update_grant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<GrantId>,
    ValidatedJson(dto): ValidatedJson<UpdateGrantDto>,
) -> Result<Json<UserLesson>, AppError> {
    let grant = state
        .lessons()
        .update_grant(id, &auth_user.0, &dto.permission_level)
        .await?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/api/user-lessons/{id}",
    params(("id" = Uuid, Path, description = "Grant ID")),
    responses(
        (status = 204, description = "Grant removed"),
        (status = 403, description = "Manage permission required unless it is your own grant", body = ErrorResponse),
        (status = 404, description = "Grant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sharing"
)]
#[instrument(skip(state))]
pub async fn delete_grant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<GrantId>,
) -> Result<StatusCode, AppError> {
    state.lessons().remove_grant(id, &auth_user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
