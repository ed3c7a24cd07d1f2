use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use tutordesk_core::AppError;
use tutordesk_models::ids::{LessonId, StudentId, UserId};
use tutordesk_models::lessons::{
    AddParticipantDto, CreateLessonDto, Lesson, LessonAccessResponse, LessonQueryParams,
    PaginatedLessonsResponse, UpdateLessonDto,
};
use tutordesk_models::query::LessonFilters;
use tutordesk_models::sharing::{
    AssignOwnerDto, AssignOwnerResponse, ShareLessonDto, UserLesson,
};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/lessons",
    params(LessonQueryParams),
    responses(
        (status = 200, description = "Visible lessons, most recent first", body = PaginatedLessonsResponse),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Listing another user's lessons requires admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn get_lessons(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<LessonQueryParams>,
) -> Result<Json<PaginatedLessonsResponse>, AppError> {
    let filters = LessonFilters::compose(&params, Utc::now())?;
    let response = state.lessons().list_lessons(&auth_user.0, filters).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/lessons",
    request_body = CreateLessonDto,
    responses(
        (status = 201, description = "Lesson created, owned by the caller", body = Lesson),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown student", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state, dto))]
pub async fn create_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateLessonDto>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let lesson = state.lessons().create_lesson(&auth_user.0, dto).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    get,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson details", body = Lesson),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "No access to this lesson", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn get_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = state.lessons().require_access(&auth_user.0, id).await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    get,
    path = "/api/lessons/{id}/access",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "The caller's capabilities on the lesson", body = LessonAccessResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "No access to this lesson", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn get_lesson_access(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
) -> Result<Json<LessonAccessResponse>, AppError> {
    let service = state.lessons();
    let lesson = service.require_access(&auth_user.0, id).await?;
    let capability = service.access_level(&auth_user.0, &lesson).await;

    Ok(Json(LessonAccessResponse {
        lesson_id: lesson.id,
        can_view: capability.is_some_and(|c| c.can_view()),
        can_edit: capability.is_some_and(|c| c.can_edit()),
        can_manage: capability.is_some_and(|c| c.can_manage()),
    }))
}

#[utoipa::path(
    put,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = UpdateLessonDto,
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Edit permission required", body = ErrorResponse),
        (status = 404, description = "Lesson or student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state, dto))]
pub async fn update_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
    ValidatedJson(dto): ValidatedJson<UpdateLessonDto>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = state.lessons().update_lesson(&auth_user.0, id, dto).await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 403, description = "Manage permission required", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn delete_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
) -> Result<StatusCode, AppError> {
    state.lessons().delete_lesson(&auth_user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/lessons/{id}/students",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = AddParticipantDto,
    responses(
        (status = 200, description = "Participant added", body = Lesson),
        (status = 403, description = "Edit permission required", body = ErrorResponse),
        (status = 404, description = "Lesson or student not found", body = ErrorResponse),
        (status = 409, description = "Student already participates", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn add_participant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
    ValidatedJson(dto): ValidatedJson<AddParticipantDto>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = state
        .lessons()
        .add_participant(&auth_user.0, id, dto.student_id)
        .await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/lessons/{id}/students/{student_id}",
    params(
        ("id" = Uuid, Path, description = "Lesson ID"),
        ("student_id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Participant removed", body = Lesson),
        (status = 403, description = "Edit permission required", body = ErrorResponse),
        (status = 404, description = "Lesson or participant not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn remove_participant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, student_id)): Path<(LessonId, StudentId)>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = state
        .lessons()
        .remove_participant(&auth_user.0, id, student_id)
        .await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    post,
    path = "/api/lessons/{id}/shares",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = ShareLessonDto,
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
pub async fn share_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
    ValidatedJson(dto): ValidatedJson<ShareLessonDto>,
) -> Result<Json<UserLesson>, AppError> {
    let grant = state
        .lessons()
        .share(id, &auth_user.0, dto.user_id, &dto.permission_level)
        .await?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/api/lessons/{id}/shares/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Lesson ID"),
        ("user_id" = Uuid, Path, description = "Grantee user ID")
    ),
    responses(
        (status = 204, description = "Grant removed (or there was none)"),
        (status = 403, description = "Manage permission required unless removing your own grant", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sharing"
)]
#[instrument(skip(state))]
pub async fn unshare_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, user_id)): Path<(LessonId, UserId)>,
) -> Result<StatusCode, AppError> {
    state.lessons().unshare(id, &auth_user.0, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/lessons/assign-owner",
    request_body = AssignOwnerDto,
    responses(
        (status = 200, description = "Ownerless lessons assigned", body = AssignOwnerResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "Owner not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Lessons"
)]
#[instrument(skip(state))]
pub async fn assign_default_owner(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<AssignOwnerDto>,
) -> Result<Json<AssignOwnerResponse>, AppError> {
    let updated = state
        .lessons()
        .assign_default_owner(&auth_user.0, dto.owner_id)
        .await?;
    Ok(Json(AssignOwnerResponse { updated }))
}
