use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use tutordesk_core::pagination::deserialize_optional_i64;
use tutordesk_core::serde::deserialize_optional_parsed;
use tutordesk_core::{PageParams, PageRequest, PaginationMeta};

use crate::ids::{LessonId, QuizId, QuizResultId, StudentId};
use crate::query::LessonScope;

/// Points a student earned in a lesson, optionally against a template quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentLessonQuiz {
    pub id: QuizResultId,
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub quiz_id: Option<QuizId>,
    pub points: Option<f64>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateQuizResultDto {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub quiz_id: Option<QuizId>,
    #[validate(range(min = 0.0))]
    pub points: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Absent fields keep their current value. The student and lesson are fixed.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateQuizResultDto {
    pub quiz_id: Option<QuizId>,
    #[validate(range(min = 0.0))]
    pub points: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuizResultFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub lesson_id: Option<LessonId>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub quiz_id: Option<QuizId>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub per_page: Option<i64>,
}

impl QuizResultFilterParams {
    pub fn pagination(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Store-level quiz result query; `scope` limits the lessons considered.
#[derive(Debug, Clone)]
pub struct QuizResultFilter {
    pub scope: LessonScope,
    pub student_id: Option<StudentId>,
    pub lesson_id: Option<LessonId>,
    pub quiz_id: Option<QuizId>,
    pub page: PageRequest,
}

impl QuizResultFilter {
    pub fn matches(&self, result: &StudentLessonQuiz) -> bool {
        self.scope.contains(result.lesson_id)
            && self.student_id.is_none_or(|id| result.student_id == id)
            && self.lesson_id.is_none_or(|id| result.lesson_id == id)
            && self.quiz_id.is_none_or(|id| result.quiz_id == Some(id))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedQuizResultsResponse {
    pub data: Vec<StudentLessonQuiz>,
    pub meta: PaginationMeta,
}
