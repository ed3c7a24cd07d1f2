use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::modules::lessons::controller::{
    add_participant, assign_default_owner, create_lesson, delete_lesson, get_lesson,
    get_lesson_access, get_lessons, remove_participant, share_lesson, unshare_lesson,
    update_lesson,
};
use crate::modules::quiz_results::controller::get_lesson_quiz_results;
use crate::state::AppState;

pub fn init_lessons_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_lessons).post(create_lesson))
        .route("/assign-owner", post(assign_default_owner))
        .route(
            "/{id}",
            get(get_lesson).put(update_lesson).delete(delete_lesson),
        )
        .route("/{id}/access", get(get_lesson_access))
        .route("/{id}/students", post(add_participant))
        .route("/{id}/students/{student_id}", delete(remove_participant))
        .route("/{id}/shares", post(share_lesson))
        .route("/{id}/shares/{user_id}", delete(unshare_lesson))
        .route("/{id}/quiz-results", get(get_lesson_quiz_results))
}
