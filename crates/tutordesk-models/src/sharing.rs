//! Lesson sharing grants (user-lesson permission records).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use tutordesk_core::serde::{deserialize_optional_parsed, deserialize_optional_trimmed};

use crate::ids::{GrantId, LessonId, UserId};
use crate::permission::PermissionLevel;

/// At most one grant exists per (user, lesson) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserLesson {
    pub id: GrantId,
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub permission_level: PermissionLevel,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct GrantFilter {
    pub lesson_id: Option<LessonId>,
    pub user_id: Option<UserId>,
    pub permission_level: Option<PermissionLevel>,
}

/// Body of `POST /lessons/{id}/shares`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ShareLessonDto {
    pub user_id: UserId,
    /// One of view, edit, manage
    pub permission_level: String,
}

/// Body of `POST /user-lessons`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGrantDto {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    /// One of view, edit, manage
    pub permission_level: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGrantDto {
    /// One of view, edit, manage
    pub permission_level: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GrantFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub lesson_id: Option<LessonId>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub user_id: Option<UserId>,
    /// One of view, edit, manage
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub permission_level: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignOwnerDto {
    pub owner_id: UserId,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignOwnerResponse {
    /// Number of previously ownerless lessons that received the owner
    pub updated: u64,
}
