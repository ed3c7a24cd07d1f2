use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use tutordesk_core::AppError;
use tutordesk_models::history::{
    CreateLevelHistoryDto, CreateStatusHistoryDto, LevelHistoryEntry, StatusHistoryEntry,
    UpdateLevelHistoryDto, UpdateStatusHistoryDto,
};
use tutordesk_models::ids::{LevelHistoryId, StatusHistoryId, StudentId};
use tutordesk_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentDetail, StudentQueryParams,
    UpdateStudentDto,
};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created successfully", body = Student),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn create_student(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = StudentService::create_student(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// List students with optional filters and pagination
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQueryParams),
    responses(
        (status = 200, description = "Page of students", body = PaginatedStudentsResponse),
        (status = 400, description = "Malformed filter value", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_students(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<StudentQueryParams>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    let response = StudentService::get_students(state.store.as_ref(), &params).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student with current status and level", body = StudentDetail),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_student(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
) -> Result<Json<StudentDetail>, AppError> {
    let student = StudentService::get_student(state.store.as_ref(), id).await?;
    Ok(Json(student))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn update_student(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    let student = StudentService::update_student(state.store.as_ref(), id, dto).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_student(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
) -> Result<StatusCode, AppError> {
    StudentService::delete_student(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/status-history",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Status changes, newest first", body = Vec<StatusHistoryEntry>),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_status_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
) -> Result<Json<Vec<StatusHistoryEntry>>, AppError> {
    let history = StudentService::status_history(state.store.as_ref(), id).await?;
    Ok(Json(history))
}

#[utoipa::path(
    post,
    path = "/api/students/{id}/status-history",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = CreateStatusHistoryDto,
    responses(
        (status = 201, description = "Status change recorded", body = StatusHistoryEntry),
        (status = 404, description = "Student or status not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn add_status_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<CreateStatusHistoryDto>,
) -> Result<(StatusCode, Json<StatusHistoryEntry>), AppError> {
    let entry = StudentService::add_status_history(state.store.as_ref(), id, dto).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}/status-history/{entry_id}",
    params(
        ("id" = Uuid, Path, description = "Student ID"),
        ("entry_id" = Uuid, Path, description = "Status history entry ID")
    ),
    request_body = UpdateStatusHistoryDto,
    responses(
        (status = 200, description = "Status change corrected", body = StatusHistoryEntry),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Entry or status not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn update_status_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path((id, entry_id)): Path<(StudentId, StatusHistoryId)>,
    ValidatedJson(dto): ValidatedJson<UpdateStatusHistoryDto>,
) -> Result<Json<StatusHistoryEntry>, AppError> {
    let entry =
        StudentService::update_status_history(state.store.as_ref(), id, entry_id, dto).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}/status-history/{entry_id}",
    params(
        ("id" = Uuid, Path, description = "Student ID"),
        ("entry_id" = Uuid, Path, description = "Status history entry ID")
    ),
    responses(
        (status = 204, description = "Status change removed"),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_status_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path((id, entry_id)): Path<(StudentId, StatusHistoryId)>,
) -> Result<StatusCode, AppError> {
    StudentService::delete_status_history(state.store.as_ref(), id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/level-history",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Level changes, newest first", body = Vec<LevelHistoryEntry>),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_level_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
) -> Result<Json<Vec<LevelHistoryEntry>>, AppError> {
    let history = StudentService::level_history(state.store.as_ref(), id).await?;
    Ok(Json(history))
}

#[utoipa::path(
    post,
    path = "/api/students/{id}/level-history",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = CreateLevelHistoryDto,
    responses(
        (status = 201, description = "Level change recorded", body = LevelHistoryEntry),
        (status = 404, description = "Student or level not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn add_level_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<CreateLevelHistoryDto>,
) -> Result<(StatusCode, Json<LevelHistoryEntry>), AppError> {
    let entry = StudentService::add_level_history(state.store.as_ref(), id, dto).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}/level-history/{entry_id}",
    params(
        ("id" = Uuid, Path, description = "Student ID"),
        ("entry_id" = Uuid, Path, description = "Level history entry ID")
    ),
    request_body = UpdateLevelHistoryDto,
    responses(
        (status = 200, description = "Level change corrected", body = LevelHistoryEntry),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Entry or level not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn update_level_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path((id, entry_id)): Path<(StudentId, LevelHistoryId)>,
    ValidatedJson(dto): ValidatedJson<UpdateLevelHistoryDto>,
) -> Result<Json<LevelHistoryEntry>, AppError> {
    let entry =
        StudentService::update_level_history(state.store.as_ref(), id, entry_id, dto).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}/level-history/{entry_id}",
    params(
        ("id" = Uuid, Path, description = "Student ID"),
        ("entry_id" = Uuid, Path, description = "Level history entry ID")
    ),
    responses(
        (status = 204, description = "Level change removed"),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_level_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path((id, entry_id)): Path<(StudentId, LevelHistoryId)>,
) -> Result<StatusCode, AppError> {
    StudentService::delete_level_history(state.store.as_ref(), id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
