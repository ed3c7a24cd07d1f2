use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use tutordesk_core::PaginationMeta;
use tutordesk_models::PermissionLevel;
use tutordesk_models::auth::{LoginRequest, LoginResponse};
use tutordesk_models::curriculum::{
    CreateCurriculumDto, CreateLevelDto, CreateQuizDto, CreateStatusDto, CreateUnitDto,
    Curriculum, Level, Quiz, StudentStatus, Unit, UpdateUnitDto,
};
use tutordesk_models::history::{
    CreateLevelHistoryDto, CreateStatusHistoryDto, LevelHistoryEntry, StatusHistoryEntry,
    UpdateLevelHistoryDto, UpdateStatusHistoryDto,
};
use tutordesk_models::lessons::{
    AddParticipantDto, CreateLessonDto, Lesson, LessonAccessResponse, PaginatedLessonsResponse,
    UpdateLessonDto,
};
use tutordesk_models::quiz_results::{
    CreateQuizResultDto, PaginatedQuizResultsResponse, StudentLessonQuiz, UpdateQuizResultDto,
};
use tutordesk_models::sharing::{
    AssignOwnerDto, AssignOwnerResponse, CreateGrantDto, ShareLessonDto, UpdateGrantDto,
    UserLesson,
};
use tutordesk_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentDetail, UpdateStudentDto,
};
use tutordesk_models::users::{CreateUserDto, UpdateUserDto, UserResponse, UserRole};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::me,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::lessons::controller::get_lessons,
        crate::modules::lessons::controller::create_lesson,
        crate::modules::lessons::controller::get_lesson,
        crate::modules::lessons::controller::get_lesson_access,
        crate::modules::lessons::controller::update_lesson,
        crate::modules::lessons::controller::delete_lesson,
        crate::modules::lessons::controller::add_participant,
        crate::modules::lessons::controller::remove_participant,
        crate::modules::lessons::controller::share_lesson,
        crate::modules::lessons::controller::unshare_lesson,
        crate::modules::lessons::controller::assign_default_owner,
        crate::modules::sharing::controller::get_grants,
        crate::modules::sharing::controller::create_grant,
        crate::modules::sharing::controller::get_grant,
        crate::modules::sharing::controller::update_grant,
        crate::modules::sharing::controller::delete_grant,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::students::controller::get_status_history,
        crate::modules::students::controller::add_status_history,
        crate::modules::students::controller::update_status_history,
        crate::modules::students::controller::delete_status_history,
        crate::modules::students::controller::get_level_history,
        crate::modules::students::controller::add_level_history,
        crate::modules::students::controller::update_level_history,
        crate::modules::students::controller::delete_level_history,
        crate::modules::curriculum::controller::get_statuses,
        crate::modules::curriculum::controller::create_status,
        crate::modules::curriculum::controller::delete_status,
        crate::modules::curriculum::controller::get_curricula,
        crate::modules::curriculum::controller::create_curriculum,
        crate::modules::curriculum::controller::delete_curriculum,
        crate::modules::curriculum::controller::get_levels,
        crate::modules::curriculum::controller::create_level,
        crate::modules::curriculum::controller::delete_level,
        crate::modules::curriculum::controller::get_units,
        crate::modules::curriculum::controller::create_unit,
        crate::modules::curriculum::controller::update_unit,
        crate::modules::curriculum::controller::delete_unit,
        crate::modules::curriculum::controller::get_quizzes,
        crate::modules::curriculum::controller::create_quiz,
        crate::modules::curriculum::controller::delete_quiz,
        crate::modules::quiz_results::controller::list_quiz_results,
        crate::modules::quiz_results::controller::create_quiz_result,
        crate::modules::quiz_results::controller::update_quiz_result,
        crate::modules::quiz_results::controller::delete_quiz_result,
        crate::modules::quiz_results::controller::get_lesson_quiz_results,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            LoginRequest,
            LoginResponse,
            UserRole,
            UserResponse,
            CreateUserDto,
            UpdateUserDto,
            PermissionLevel,
            Lesson,
            CreateLessonDto,
            UpdateLessonDto,
            AddParticipantDto,
            LessonAccessResponse,
            PaginatedLessonsResponse,
            UserLesson,
            ShareLessonDto,
            CreateGrantDto,
            UpdateGrantDto,
            AssignOwnerDto,
            AssignOwnerResponse,
            Student,
            StudentDetail,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            StatusHistoryEntry,
            LevelHistoryEntry,
            CreateStatusHistoryDto,
            CreateLevelHistoryDto,
            UpdateStatusHistoryDto,
            UpdateLevelHistoryDto,
            StudentStatus,
            Curriculum,
            Level,
            Unit,
            Quiz,
            CreateStatusDto,
            CreateCurriculumDto,
            CreateLevelDto,
            CreateUnitDto,
            UpdateUnitDto,
            CreateQuizDto,
            StudentLessonQuiz,
            CreateQuizResultDto,
            UpdateQuizResultDto,
            PaginatedQuizResultsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "User authentication endpoints"),
        (name = "Users", description = "User account management (admin only)"),
        (name = "Lessons", description = "Lessons, participants and ownership"),
        (name = "Sharing", description = "Per-user lesson grants"),
        (name = "Students", description = "Student records and status/level history"),
        (name = "Curriculum", description = "Statuses, curricula, levels, units and quizzes"),
        (name = "Quiz Results", description = "Quiz points recorded in lessons")
    ),
    info(
        title = "Tutordesk API",
        version = "0.1.0",
        description = "Tutoring management API: students, lessons and curricula, with per-lesson sharing and JWT authentication.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
