use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use tutordesk_core::AppError;
use tutordesk_models::ids::{LessonId, QuizResultId};
use tutordesk_models::quiz_results::{
    CreateQuizResultDto, PaginatedQuizResultsResponse, QuizResultFilterParams, StudentLessonQuiz,
    UpdateQuizResultDto,
};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::quiz_results::service::QuizResultService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/student-lesson-quizzes",
    request_body = CreateQuizResultDto,
    responses(
        (status = 201, description = "Quiz result recorded", body = StudentLessonQuiz),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Edit permission on the lesson required", body = ErrorResponse),
        (status = 404, description = "Lesson, student or quiz not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz Results"
)]
#[instrument(skip(state))]
pub async fn create_quiz_result(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateQuizResultDto>,
) -> Result<(StatusCode, Json<StudentLessonQuiz>), AppError> {
    let result = QuizResultService::new(state.store.clone())
        .record(&auth_user.0, &dto)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// List quiz results on lessons the caller can access, newest first
#[utoipa::path(
    get,
    path = "/api/student-lesson-quizzes",
    params(QuizResultFilterParams),
    responses(
        (status = 200, description = "Page of quiz results", body = PaginatedQuizResultsResponse),
        (status = 400, description = "Malformed filter value", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz Results"
)]
#[instrument(skip(state))]
pub async fn list_quiz_results(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<QuizResultFilterParams>,
) -> Result<Json<PaginatedQuizResultsResponse>, AppError> {
    let response = QuizResultService::new(state.store.clone())
        .list(&auth_user.0, &params)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/student-lesson-quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz result ID")),
    request_body = UpdateQuizResultDto,
    responses(
        (status = 200, description = "Quiz result updated", body = StudentLessonQuiz),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Edit permission on the lesson required", body = ErrorResponse),
        (status = 404, description = "Quiz result or quiz not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz Results"
)]
#[instrument(skip(state))]
pub async fn update_quiz_result(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<QuizResultId>,
    ValidatedJson(dto): ValidatedJson<UpdateQuizResultDto>,
) -> Result<Json<StudentLessonQuiz>, AppError> {
    let result = QuizResultService::new(state.store.clone())
        .update(&auth_user.0, id, &dto)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    delete,
    path = "/api/student-lesson-quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz result ID")),
    responses(
        (status = 204, description = "Quiz result deleted"),
        (status = 403, description = "Edit permission on the lesson required", body = ErrorResponse),
        (status = 404, description = "Quiz result not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz Results"
)]
#[instrument(skip(state))]
pub async fn delete_quiz_result(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<QuizResultId>,
) -> Result<StatusCode, AppError> {
    QuizResultService::new(state.store.clone())
        .delete(&auth_user.0, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/lessons/{id}/quiz-results",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Quiz results recorded in the lesson", body = Vec<StudentLessonQuiz>),
        (status = 403, description = "No access to this lesson", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz Results"
)]
#[instrument(skip(state))]
pub async fn get_lesson_quiz_results(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
) -> Result<Json<Vec<StudentLessonQuiz>>, AppError> {
    let results = QuizResultService::new(state.store.clone())
        .for_lesson(&auth_user.0, id)
        .await?;
    Ok(Json(results))
}
