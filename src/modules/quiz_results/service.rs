use std::sync::Arc;

use anyhow::anyhow;
use tracing::instrument;

use tutordesk_core::{AppError, PaginationMeta};
use tutordesk_db::{CurriculumStore, EntityStore};
use tutordesk_models::ids::{LessonId, QuizResultId};
use tutordesk_models::quiz_results::{
    CreateQuizResultDto, PaginatedQuizResultsResponse, QuizResultFilter, QuizResultFilterParams,
    StudentLessonQuiz, UpdateQuizResultDto,
};
use tutordesk_models::users::User;

use crate::modules::lessons::LessonService;

/// Quiz scores are part of a lesson: recording or deleting one needs edit
/// rights on the lesson, reading them needs view rights.
pub struct QuizResultService {
    store: Arc<dyn EntityStore>,
    lessons: LessonService,
}

impl QuizResultService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            lessons: LessonService::new(store.clone()),
            store,
        }
    }

    #[instrument(skip(self, requester, dto), fields(requester = %requester.id, lesson_id = %dto.lesson_id))]
    pub async fn record(
        &self,
        requester: &User,
        dto: &CreateQuizResultDto,
    ) -> Result<StudentLessonQuiz, AppError> {
        self.lessons.require_edit(requester, dto.lesson_id).await?;
        Ok(self.store.record_quiz_result(dto).await?)
    }

    #[instrument(skip(self, requester, dto), fields(requester = %requester.id))]
    pub async fn update(
        &self,
        requester: &User,
        id: QuizResultId,
        dto: &UpdateQuizResultDto,
    ) -> Result<StudentLessonQuiz, AppError> {
        let result = self.find(id).await?;
        self.lessons.require_edit(requester, result.lesson_id).await?;
        Ok(self.store.update_quiz_result(id, dto).await?)
    }

    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn delete(&self, requester: &User, id: QuizResultId) -> Result<(), AppError> {
        let result = self.find(id).await?;
        self.lessons.require_edit(requester, result.lesson_id).await?;
        Ok(self.store.delete_quiz_result(id).await?)
    }

    pub async fn for_lesson(
        &self,
        requester: &User,
        lesson: LessonId,
    ) -> Result<Vec<StudentLessonQuiz>, AppError> {
        self.lessons.require_access(requester, lesson).await?;
        Ok(self.store.quiz_results_for_lesson(lesson).await?)
    }

    /// Results on lessons the requester can see, owned or shared.
    #[instrument(skip(self, requester, params), fields(requester = %requester.id))]
    pub async fn list(
        &self,
        requester: &User,
        params: &QuizResultFilterParams,
    ) -> Result<PaginatedQuizResultsResponse, AppError> {
        let filter = QuizResultFilter {
            scope: self.lessons.accessible_lesson_ids(requester, true).await?,
            student_id: params.student_id,
            lesson_id: params.lesson_id,
            quiz_id: params.quiz_id,
            page: params.pagination().to_request(),
        };
        let page = self.store.list_quiz_results(&filter).await?;
        Ok(PaginatedQuizResultsResponse {
            meta: PaginationMeta::new(&filter.page, page.total_count),
            data: page.items,
        })
    }

    async fn find(&self, id: QuizResultId) -> Result<StudentLessonQuiz, AppError> {
        self.store
            .find_quiz_result(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Quiz result not found")))
    }
}
