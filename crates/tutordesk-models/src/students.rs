//! Student records and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use tutordesk_core::pagination::deserialize_optional_i64;
use tutordesk_core::serde::deserialize_optional_trimmed;
use tutordesk_core::{PageParams, PaginationMeta};

use crate::ids::StudentId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub date_started: Option<NaiveDate>,
    pub classes_per_week: Option<i32>,
    pub notes_general: Option<String>,
    pub notes_strengths: Option<String>,
    pub notes_weaknesses: Option<String>,
    pub notes_future: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A student with its derived current status and level names.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    pub current_status: Option<String>,
    pub current_level: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: Option<String>,
    pub date_started: Option<NaiveDate>,
    pub classes_per_week: Option<i32>,
    pub notes_general: Option<String>,
    pub notes_strengths: Option<String>,
    pub notes_weaknesses: Option<String>,
    pub notes_future: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_started: Option<NaiveDate>,
    pub classes_per_week: Option<i32>,
    pub notes_general: Option<String>,
    pub notes_strengths: Option<String>,
    pub notes_weaknesses: Option<String>,
    pub notes_future: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    pub date_started: Option<NaiveDate>,
    #[validate(range(min = 0, max = 14))]
    pub classes_per_week: Option<i32>,
    pub notes_general: Option<String>,
    pub notes_strengths: Option<String>,
    pub notes_weaknesses: Option<String>,
    pub notes_future: Option<String>,
}

impl From<CreateStudentDto> for NewStudent {
    fn from(dto: CreateStudentDto) -> Self {
        Self {
            first_name: dto.first_name,
            last_name: dto.last_name,
            date_started: dto.date_started,
            classes_per_week: dto.classes_per_week,
            notes_general: dto.notes_general,
            notes_strengths: dto.notes_strengths,
            notes_weaknesses: dto.notes_weaknesses,
            notes_future: dto.notes_future,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    pub date_started: Option<NaiveDate>,
    #[validate(range(min = 0, max = 14))]
    pub classes_per_week: Option<i32>,
    pub notes_general: Option<String>,
    pub notes_strengths: Option<String>,
    pub notes_weaknesses: Option<String>,
    pub notes_future: Option<String>,
}

impl From<UpdateStudentDto> for StudentPatch {
    fn from(dto: UpdateStudentDto) -> Self {
        Self {
            first_name: dto.first_name,
            last_name: dto.last_name,
            date_started: dto.date_started,
            classes_per_week: dto.classes_per_week,
            notes_general: dto.notes_general,
            notes_strengths: dto.notes_strengths,
            notes_weaknesses: dto.notes_weaknesses,
            notes_future: dto.notes_future,
        }
    }
}

/// Raw list filters; parsed and validated by the student query composer.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentQueryParams {
    /// Case-insensitive substring of first or last name
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    /// Current status name
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub status: Option<String>,
    /// Current level name
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub level: Option<String>,
    /// Has a lesson at or after this instant
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub lesson_start: Option<String>,
    /// Has a lesson at or before this instant
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub lesson_end: Option<String>,
    /// true: has a group lesson, false: has a one-to-one lesson
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub is_in_group: Option<String>,
    /// Started on or after this date
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub started_after: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub classes_per_week: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub per_page: Option<i64>,
}

impl StudentQueryParams {
    pub fn pagination(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}
