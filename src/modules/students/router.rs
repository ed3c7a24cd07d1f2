use axum::{
    Router,
    routing::{get, put},
};

use crate::modules::students::controller::{
    add_level_history, add_status_history, create_student, delete_level_history,
    delete_status_history, delete_student, get_level_history, get_status_history, get_student,
    get_students, update_level_history, update_status_history, update_student,
};
use crate::state::AppState;

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_students).post(create_student))
        .route(
            "/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route(
            "/{id}/status-history",
            get(get_status_history).post(add_status_history),
        )
        .route(
            "/{id}/status-history/{entry_id}",
            put(update_status_history).delete(delete_status_history),
        )
        .route(
            "/{id}/level-history",
            get(get_level_history).post(add_level_history),
        )
        .route(
            "/{id}/level-history/{entry_id}",
            put(update_level_history).delete(delete_level_history),
        )
}
