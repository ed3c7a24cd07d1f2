//! Entity store traits shared by every backend.
//!
//! Each mutation is atomic: it either applies completely or not at all.
//! Lookups by id return `Ok(None)` for missing records; mutations that need
//! an existing record return [`StoreError::NotFound`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tutordesk_core::{AppError, ErrorKind, Page};
use tutordesk_models::curriculum::{
    CreateCurriculumDto, CreateLevelDto, CreateQuizDto, CreateStatusDto, CreateUnitDto,
    Curriculum, Level, Quiz, StudentStatus, Unit, UpdateUnitDto,
};
use tutordesk_models::history::{
    LevelHistoryEntry, StatusHistoryEntry, UpdateLevelHistoryDto, UpdateStatusHistoryDto,
};
use tutordesk_models::ids::{
    CurriculumId, GrantId, LessonId, LevelHistoryId, LevelId, QuizId, QuizResultId,
    StatusHistoryId, StatusId, StudentId, UnitId, UserId,
};
use tutordesk_models::lessons::{Lesson, LessonPatch, NewLesson};
use tutordesk_models::query::{LessonQuery, StudentQuery};
use tutordesk_models::quiz_results::{
    CreateQuizResultDto, QuizResultFilter, StudentLessonQuiz, UpdateQuizResultDto,
};
use tutordesk_models::sharing::{GrantFilter, UserLesson};
use tutordesk_models::students::{NewStudent, Student, StudentPatch};
use tutordesk_models::users::{NewUser, User, UserFilter, UserPatch};
use tutordesk_models::PermissionLevel;

pub mod memory;
pub mod postgres;

mod filters;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Unexpected(_) => ErrorKind::Internal,
        };
        AppError::new(kind, err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) const LAST_ADMIN: &str = "At least one admin account must remain";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Ordered by email.
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;
    /// `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// `Conflict` when the email is taken or the last admin would be demoted.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User>;
    /// Deletes the user's grants and leaves their lessons ownerless.
    /// `Conflict` when the user is the last admin.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
    async fn record_login(&self, id: UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn find_lesson(&self, id: LessonId) -> StoreResult<Option<Lesson>>;
    async fn all_lessons(&self) -> StoreResult<Vec<Lesson>>;
    /// `None` selects ownerless lessons.
    async fn lessons_owned_by(&self, owner: Option<UserId>) -> StoreResult<Vec<Lesson>>;
    async fn lessons_granted_to(&self, user: UserId) -> StoreResult<Vec<Lesson>>;
    /// Ordered by datetime descending, then id. `total_count` counts every match.
    async fn query_lessons(&self, query: &LessonQuery) -> StoreResult<Page<Lesson>>;
    async fn create_lesson(&self, lesson: NewLesson) -> StoreResult<Lesson>;
    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> StoreResult<Lesson>;
    /// Deletes participants, grants and quiz results along with the lesson.
    async fn delete_lesson(&self, id: LessonId) -> StoreResult<()>;
    /// `Conflict` when the student already participates.
    async fn add_participant(&self, lesson: LessonId, student: StudentId) -> StoreResult<Lesson>;
    async fn remove_participant(&self, lesson: LessonId, student: StudentId)
    -> StoreResult<Lesson>;

    async fn find_grant(&self, user: UserId, lesson: LessonId) -> StoreResult<Option<UserLesson>>;
    async fn find_grant_by_id(&self, id: GrantId) -> StoreResult<Option<UserLesson>>;
    async fn list_grants(&self, filter: &GrantFilter) -> StoreResult<Vec<UserLesson>>;
    /// Creates the (user, lesson) grant or overwrites its level. Losing a
    /// concurrent insert race on the same pair yields `Conflict`.
    async fn upsert_grant(
        &self,
        user: UserId,
        lesson: LessonId,
        level: PermissionLevel,
    ) -> StoreResult<UserLesson>;
    async fn update_grant_level(
        &self,
        id: GrantId,
        level: PermissionLevel,
    ) -> StoreResult<UserLesson>;
    /// Returns whether a grant existed.
    async fn delete_grant(&self, user: UserId, lesson: LessonId) -> StoreResult<bool>;
    async fn delete_grant_by_id(&self, id: GrantId) -> StoreResult<()>;
    /// Sets the owner of every ownerless lesson and returns how many changed.
    async fn assign_default_owner(&self, owner: UserId) -> StoreResult<u64>;
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn find_student(&self, id: StudentId) -> StoreResult<Option<Student>>;
    /// Ordered by last name, first name, id.
    async fn query_students(&self, query: &StudentQuery) -> StoreResult<Page<Student>>;
    async fn create_student(&self, student: NewStudent) -> StoreResult<Student>;
    async fn update_student(&self, id: StudentId, patch: StudentPatch) -> StoreResult<Student>;
    /// Deletes history, lesson memberships and quiz results along with the student.
    async fn delete_student(&self, id: StudentId) -> StoreResult<()>;

    async fn current_status(&self, id: StudentId) -> StoreResult<Option<String>>;
    async fn current_level(&self, id: StudentId) -> StoreResult<Option<String>>;
    async fn add_status_history(
        &self,
        student: StudentId,
        status: StatusId,
        changed_at: DateTime<Utc>,
    ) -> StoreResult<StatusHistoryEntry>;
    /// Newest first.
    async fn status_history(&self, student: StudentId) -> StoreResult<Vec<StatusHistoryEntry>>;
    /// `NotFound` unless the entry belongs to `student`.
    async fn update_status_history(
        &self,
        student: StudentId,
        id: StatusHistoryId,
        dto: &UpdateStatusHistoryDto,
    ) -> StoreResult<StatusHistoryEntry>;
    async fn delete_status_history(&self, student: StudentId, id: StatusHistoryId)
    -> StoreResult<()>;
    async fn add_level_history(
        &self,
        student: StudentId,
        level: LevelId,
        changed_at: DateTime<Utc>,
    ) -> StoreResult<LevelHistoryEntry>;
    /// Newest first.
    async fn level_history(&self, student: StudentId) -> StoreResult<Vec<LevelHistoryEntry>>;
    /// `NotFound` unless the entry belongs to `student`.
    async fn update_level_history(
        &self,
        student: StudentId,
        id: LevelHistoryId,
        dto: &UpdateLevelHistoryDto,
    ) -> StoreResult<LevelHistoryEntry>;
    async fn delete_level_history(&self, student: StudentId, id: LevelHistoryId)
    -> StoreResult<()>;
}

#[async_trait]
pub trait CurriculumStore: Send + Sync {
    async fn list_statuses(&self) -> StoreResult<Vec<StudentStatus>>;
    async fn create_status(&self, dto: &CreateStatusDto) -> StoreResult<StudentStatus>;
    async fn delete_status(&self, id: StatusId) -> StoreResult<()>;

    async fn list_curricula(&self) -> StoreResult<Vec<Curriculum>>;
    async fn create_curriculum(&self, dto: &CreateCurriculumDto) -> StoreResult<Curriculum>;
    async fn delete_curriculum(&self, id: CurriculumId) -> StoreResult<()>;

    async fn list_levels(&self, curriculum: Option<CurriculumId>) -> StoreResult<Vec<Level>>;
    async fn create_level(&self, dto: &CreateLevelDto) -> StoreResult<Level>;
    async fn delete_level(&self, id: LevelId) -> StoreResult<()>;

    async fn list_units(&self, level: Option<LevelId>) -> StoreResult<Vec<Unit>>;
    async fn create_unit(&self, dto: &CreateUnitDto) -> StoreResult<Unit>;
    async fn update_unit(&self, id: UnitId, dto: &UpdateUnitDto) -> StoreResult<Unit>;
    async fn delete_unit(&self, id: UnitId) -> StoreResult<()>;

    async fn list_quizzes(&self, unit: Option<UnitId>) -> StoreResult<Vec<Quiz>>;
    async fn create_quiz(&self, dto: &CreateQuizDto) -> StoreResult<Quiz>;
    /// Results that referenced the quiz keep existing with no quiz.
    async fn delete_quiz(&self, id: QuizId) -> StoreResult<()>;

    async fn record_quiz_result(&self, dto: &CreateQuizResultDto)
    -> StoreResult<StudentLessonQuiz>;
    async fn find_quiz_result(&self, id: QuizResultId) -> StoreResult<Option<StudentLessonQuiz>>;
    async fn update_quiz_result(
        &self,
        id: QuizResultId,
        dto: &UpdateQuizResultDto,
    ) -> StoreResult<StudentLessonQuiz>;
    async fn delete_quiz_result(&self, id: QuizResultId) -> StoreResult<()>;
    /// Newest first, then id.
    async fn list_quiz_results(
        &self,
        filter: &QuizResultFilter,
    ) -> StoreResult<Page<StudentLessonQuiz>>;
    async fn quiz_results_for_lesson(&self, lesson: LessonId)
    -> StoreResult<Vec<StudentLessonQuiz>>;
}

/// Everything the application needs from persistence.
#[async_trait]
pub trait EntityStore: UserStore + LessonStore + StudentStore + CurriculumStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_kinds() {
        let err: AppError = StoreError::NotFound("Lesson".into()).into();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Lesson not found");

        let err: AppError = StoreError::Conflict(LAST_ADMIN.into()).into();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err: AppError = StoreError::Unexpected(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(err.kind, ErrorKind::Internal);
    }
}
