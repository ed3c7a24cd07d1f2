//! Lesson records and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use tutordesk_core::PageParams;
use tutordesk_core::PaginationMeta;
use tutordesk_core::pagination::deserialize_optional_i64;
use tutordesk_core::serde::{deserialize_optional_parsed, deserialize_optional_trimmed};

use crate::ids::{LessonId, StudentId, UserId};

/// A lesson together with its participant ids.
///
/// `owner_id` is `None` only for legacy records created before lessons had
/// owners; such lessons are visible to admins only until an owner is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: LessonId,
    pub datetime: DateTime<Utc>,
    pub plan: Option<String>,
    pub concepts: Option<String>,
    pub notes: Option<String>,
    pub owner_id: Option<UserId>,
    /// Participants, sorted by id
    pub student_ids: Vec<StudentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn participant_count(&self) -> usize {
        self.student_ids.len()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub datetime: DateTime<Utc>,
    pub plan: Option<String>,
    pub concepts: Option<String>,
    pub notes: Option<String>,
    pub owner_id: Option<UserId>,
    /// Must be free of duplicates.
    pub student_ids: Vec<StudentId>,
}

#[derive(Debug, Clone, Default)]
pub struct LessonPatch {
    pub datetime: Option<DateTime<Utc>>,
    pub plan: Option<String>,
    pub concepts: Option<String>,
    pub notes: Option<String>,
    /// Replaces the participant set when present.
    pub student_ids: Option<Vec<StudentId>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLessonDto {
    pub datetime: DateTime<Utc>,
    #[validate(length(max = 10000))]
    pub plan: Option<String>,
    #[validate(length(max = 10000))]
    pub concepts: Option<String>,
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLessonDto {
    pub datetime: Option<DateTime<Utc>>,
    #[validate(length(max = 10000))]
    pub plan: Option<String>,
    #[validate(length(max = 10000))]
    pub concepts: Option<String>,
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
    pub student_ids: Option<Vec<StudentId>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddParticipantDto {
    pub student_id: StudentId,
}

/// Raw list filters; parsed and validated by the lesson query composer.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LessonQueryParams {
    /// Only lessons with this participant
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub student_id: Option<StudentId>,
    /// Lessons visible to this user (self, or any user for admins)
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub user_id: Option<UserId>,
    /// Include lessons shared with the user (default true)
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub include_shared: Option<String>,
    /// Window start (YYYY-MM-DD or RFC 3339)
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub start: Option<String>,
    /// Inclusive window end; takes priority over range_length
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub end: Option<String>,
    /// Window length in days when no end is given (default 7)
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub range_length: Option<String>,
    /// true: more than one participant, false: exactly one
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub per_page: Option<i64>,
}

impl LessonQueryParams {
    pub fn pagination(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedLessonsResponse {
    pub data: Vec<Lesson>,
    /// Present only when page or per_page was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

/// The caller's resolved capabilities on one lesson.
#[derive(Debug, Serialize, ToSchema)]
pub struct LessonAccessResponse {
    pub lesson_id: LessonId,
    pub can_view: bool,
    pub can_edit: bool,
    pub can_manage: bool,
}
