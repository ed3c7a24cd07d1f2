//! Reference data: student statuses and the Curriculum → Level → Unit → Quiz hierarchy.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use tutordesk_core::serde::deserialize_optional_parsed;

use crate::ids::{CurriculumId, LevelId, QuizId, StatusId, UnitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentStatus {
    pub id: StatusId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Curriculum {
    pub id: CurriculumId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub curriculum_id: CurriculumId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub level_id: LevelId,
}

/// Curriculum-template quiz. `unit_id` is optional for standalone quizzes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Quiz {
    pub id: QuizId,
    pub name: String,
    pub max_points: Option<i32>,
    pub unit_id: Option<UnitId>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStatusDto {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCurriculumDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLevelDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub curriculum_id: CurriculumId,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUnitDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub level_id: LevelId,
}

/// Renames a unit or moves it to another level.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUnitDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub level_id: Option<LevelId>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0))]
    pub max_points: Option<i32>,
    pub unit_id: Option<UnitId>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LevelFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub curriculum_id: Option<CurriculumId>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UnitFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub level_id: Option<LevelId>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuizFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub unit_id: Option<UnitId>,
}
