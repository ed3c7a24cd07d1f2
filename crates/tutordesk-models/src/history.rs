//! Student status and level history streams.
//!
//! A student's *current* status (or level) is the entry with the latest
//! `changed_at`; ties go to the entry recorded last. Nothing is denormalized
//! onto the student record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{LevelHistoryId, LevelId, StatusHistoryId, StatusId, StudentId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StatusHistoryEntry {
    pub id: StatusHistoryId,
    pub student_id: StudentId,
    pub status_id: StatusId,
    /// Status name, resolved through the status reference
    pub status: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LevelHistoryEntry {
    pub id: LevelHistoryId,
    pub student_id: StudentId,
    pub level_id: LevelId,
    /// Level name, resolved through the level reference
    pub level: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStatusHistoryDto {
    pub status_id: StatusId,
    /// Defaults to now
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLevelHistoryDto {
    pub level_id: LevelId,
    /// Defaults to now
    pub changed_at: Option<DateTime<Utc>>,
}

/// Corrects a recorded status change. Absent fields keep their value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusHistoryDto {
    pub status_id: Option<StatusId>,
    pub changed_at: Option<DateTime<Utc>>,
}

/// Corrects a recorded level change. Absent fields keep their value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLevelHistoryDto {
    pub level_id: Option<LevelId>,
    pub changed_at: Option<DateTime<Utc>>,
}
