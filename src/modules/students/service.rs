use anyhow::anyhow;
use chrono::Utc;
use tracing::{info, instrument};

use tutordesk_core::{AppError, PaginationMeta};
use tutordesk_db::{EntityStore, StudentStore};
use tutordesk_models::history::{
    CreateLevelHistoryDto, CreateStatusHistoryDto, LevelHistoryEntry, StatusHistoryEntry,
    UpdateLevelHistoryDto, UpdateStatusHistoryDto,
};
use tutordesk_models::ids::{LevelHistoryId, StatusHistoryId, StudentId};
use tutordesk_models::query::StudentQuery;
use tutordesk_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentDetail, StudentQueryParams,
    UpdateStudentDto,
};

pub struct StudentService;

impl StudentService {
    #[instrument(skip(store, dto))]
    pub async fn create_student(
        store: &dyn EntityStore,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        let student = store.create_student(dto.into()).await?;
        info!(student_id = %student.id, "Student created");
        Ok(student)
    }

    /// Filters are parsed up front so a malformed value fails the whole
    /// request instead of being ignored.
    #[instrument(skip(store))]
    pub async fn get_students(
        store: &dyn EntityStore,
        params: &StudentQueryParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let query = StudentQuery::compose(params)?;
        let page = store.query_students(&query).await?;

        Ok(PaginatedStudentsResponse {
            meta: PaginationMeta::new(&query.page, page.total_count),
            data: page.items,
        })
    }

    async fn find_student(store: &dyn EntityStore, id: StudentId) -> Result<Student, AppError> {
        store
            .find_student(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    pub async fn get_student(
        store: &dyn EntityStore,
        id: StudentId,
    ) -> Result<StudentDetail, AppError> {
        let student = Self::find_student(store, id).await?;
        let current_status = store.current_status(id).await?;
        let current_level = store.current_level(id).await?;

        Ok(StudentDetail {
            student,
            current_status,
            current_level,
        })
    }

    #[instrument(skip(store, dto))]
    pub async fn update_student(
        store: &dyn EntityStore,
        id: StudentId,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        Ok(store.update_student(id, dto.into()).await?)
    }

    #[instrument(skip(store))]
    pub async fn delete_student(store: &dyn EntityStore, id: StudentId) -> Result<(), AppError> {
        store.delete_student(id).await?;
        info!(student_id = %id, "Student deleted");
        Ok(())
    }

    pub async fn status_history(
        store: &dyn EntityStore,
        id: StudentId,
    ) -> Result<Vec<StatusHistoryEntry>, AppError> {
        Self::find_student(store, id).await?;
        Ok(store.status_history(id).await?)
    }

    #[instrument(skip(store, dto))]
    pub async fn add_status_history(
        store: &dyn EntityStore,
        id: StudentId,
        dto: CreateStatusHistoryDto,
    ) -> Result<StatusHistoryEntry, AppError> {
        let changed_at = dto.changed_at.unwrap_or_else(Utc::now);
        Ok(store.add_status_history(id, dto.status_id, changed_at).await?)
    }

    /// Corrects a recorded status change. The entry must belong to `id`.
    #[instrument(skip(store, dto))]
    pub async fn update_status_history(
        store: &dyn EntityStore,
        id: StudentId,
        entry: StatusHistoryId,
        dto: UpdateStatusHistoryDto,
    ) -> Result<StatusHistoryEntry, AppError> {
        Ok(store.update_status_history(id, entry, &dto).await?)
    }

    #[instrument(skip(store))]
    pub async fn delete_status_history(
        store: &dyn EntityStore,
        id: StudentId,
        entry: StatusHistoryId,
    ) -> Result<(), AppError> {
        store.delete_status_history(id, entry).await?;
        info!(student_id = %id, entry_id = %entry, "Status history entry deleted");
        Ok(())
    }

    pub async fn level_history(
        store: &dyn EntityStore,
        id: StudentId,
    ) -> Result<Vec<LevelHistoryEntry>, AppError> {
        Self::find_student(store, id).await?;
        Ok(store.level_history(id).await?)
    }

    #[instrument(skip(store, dto))]
    pub async fn add_level_history(
        store: &dyn EntityStore,
        id: StudentId,
        dto: CreateLevelHistoryDto,
    ) -> Result<LevelHistoryEntry, AppError> {
        let changed_at = dto.changed_at.unwrap_or_else(Utc::now);
        Ok(store.add_level_history(id, dto.level_id, changed_at).await?)
    }

    #[instrument(skip(store, dto))]
    pub async fn update_level_history(
        store: &dyn EntityStore,
        id: StudentId,
        entry: LevelHistoryId,
        dto: UpdateLevelHistoryDto,
    ) -> Result<LevelHistoryEntry, AppError> {
        Ok(store.update_level_history(id, entry, &dto).await?)
    }

    #[instrument(skip(store))]
    pub async fn delete_level_history(
        store: &dyn EntityStore,
        id: StudentId,
        entry: LevelHistoryId,
    ) -> Result<(), AppError> {
        store.delete_level_history(id, entry).await?;
        info!(student_id = %id, entry_id = %entry, "Level history entry deleted");
        Ok(())
    }
}
