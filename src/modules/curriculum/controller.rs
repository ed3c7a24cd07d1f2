//! Reference data handlers. Reads are open to any signed-in user, writes
//! require the admin role.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::{info, instrument};
use uuid::Uuid;

use tutordesk_core::AppError;
use tutordesk_db::CurriculumStore;
use tutordesk_models::curriculum::{
    CreateCurriculumDto, CreateLevelDto, CreateQuizDto, CreateStatusDto, CreateUnitDto,
    Curriculum, Level, LevelFilterParams, Quiz, QuizFilterParams, StudentStatus, Unit,
    UnitFilterParams, UpdateUnitDto,
};
use tutordesk_models::ids::{CurriculumId, LevelId, QuizId, StatusId, UnitId};

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/student-statuses",
    responses(
        (status = 200, description = "All student statuses", body = Vec<StudentStatus>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_statuses(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<StudentStatus>>, AppError> {
    Ok(Json(state.store.list_statuses().await?))
}

#[utoipa::path(
    post,
    path = "/api/student-statuses",
    request_body = CreateStatusDto,
    responses(
        (status = 201, description = "Status created", body = StudentStatus),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Name already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn create_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateStatusDto>,
) -> Result<(StatusCode, Json<StudentStatus>), AppError> {
    let status = state.store.create_status(&dto).await?;
    info!(status_id = %status.id, name = %status.name, "Student status created");
    Ok((StatusCode::CREATED, Json(status)))
}

#[utoipa::path(
    delete,
    path = "/api/student-statuses/{id}",
    params(("id" = Uuid, Path, description = "Status ID")),
    responses(
        (status = 204, description = "Status deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Status not found", body = ErrorResponse),
        (status = 409, description = "Status is still referenced", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn delete_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<StatusId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_status(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/curricula",
    responses(
        (status = 200, description = "All curricula", body = Vec<Curriculum>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_curricula(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Curriculum>>, AppError> {
    Ok(Json(state.store.list_curricula().await?))
}

#[utoipa::path(
    post,
    path = "/api/curricula",
    request_body = CreateCurriculumDto,
    responses(
        (status = 201, description = "Curriculum created", body = Curriculum),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn create_curriculum(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateCurriculumDto>,
) -> Result<(StatusCode, Json<Curriculum>), AppError> {
    let curriculum = state.store.create_curriculum(&dto).await?;
    Ok((StatusCode::CREATED, Json(curriculum)))
}

#[utoipa::path(
    delete,
    path = "/api/curricula/{id}",
    params(("id" = Uuid, Path, description = "Curriculum ID")),
    responses(
        (status = 204, description = "Curriculum deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Curriculum not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn delete_curriculum(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CurriculumId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_curriculum(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/levels",
    params(LevelFilterParams),
    responses(
        (status = 200, description = "Levels, optionally of one curriculum", body = Vec<Level>),
        (status = 400, description = "Malformed curriculum_id", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_levels(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<LevelFilterParams>,
) -> Result<Json<Vec<Level>>, AppError> {
    Ok(Json(state.store.list_levels(params.curriculum_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/levels",
    request_body = CreateLevelDto,
    responses(
        (status = 201, description = "Level created", body = Level),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Curriculum not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn create_level(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateLevelDto>,
) -> Result<(StatusCode, Json<Level>), AppError> {
    let level = state.store.create_level(&dto).await?;
    Ok((StatusCode::CREATED, Json(level)))
}

#[utoipa::path(
    delete,
    path = "/api/levels/{id}",
    params(("id" = Uuid, Path, description = "Level ID")),
    responses(
        (status = 204, description = "Level deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Level not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn delete_level(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<LevelId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_level(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/units",
    params(UnitFilterParams),
    responses(
        (status = 200, description = "Units, optionally of one level", body = Vec<Unit>),
        (status = 400, description = "Malformed level_id", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_units(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<UnitFilterParams>,
) -> Result<Json<Vec<Unit>>, AppError> {
    Ok(Json(state.store.list_units(params.level_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/units",
    request_body = CreateUnitDto,
    responses(
        (status = 201, description = "Unit created", body = Unit),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Level not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn create_unit(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateUnitDto>,
) -> Result<(StatusCode, Json<Unit>), AppError> {
    let unit = state.store.create_unit(&dto).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

#[utoipa::path(
    put,
    path = "/api/units/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = UpdateUnitDto,
    responses(
        (status = 200, description = "Unit updated", body = Unit),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unit or level not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn update_unit(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UnitId>,
    ValidatedJson(dto): ValidatedJson<UpdateUnitDto>,
) -> Result<Json<Unit>, AppError> {
    Ok(Json(state.store.update_unit(id, &dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/units/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 204, description = "Unit deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn delete_unit(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UnitId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_unit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/quizzes",
    params(QuizFilterParams),
    responses(
        (status = 200, description = "Quizzes, optionally of one unit", body = Vec<Quiz>),
        (status = 400, description = "Malformed unit_id", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_quizzes(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<QuizFilterParams>,
) -> Result<Json<Vec<Quiz>>, AppError> {
    Ok(Json(state.store.list_quizzes(params.unit_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/quizzes",
    request_body = CreateQuizDto,
    responses(
        (status = 201, description = "Quiz created", body = Quiz),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn create_quiz(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateQuizDto>,
) -> Result<(StatusCode, Json<Quiz>), AppError> {
    let quiz = state.store.create_quiz(&dto).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
#[instrument(skip(state, _admin))]
pub async fn delete_quiz(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<QuizId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_quiz(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
