use axum::{
    Router,
    routing::{delete, get, put},
};

use crate::modules::curriculum::controller::{
    create_curriculum, create_level, create_quiz, create_status, create_unit, delete_curriculum,
    delete_level, delete_quiz, delete_status, delete_unit, get_curricula, get_levels, get_quizzes,
    get_statuses, get_units, update_unit,
};
use crate::state::AppState;

pub fn init_statuses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_statuses).post(create_status))
        .route("/{id}", delete(delete_status))
}

pub fn init_curricula_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_curricula).post(create_curriculum))
        .route("/{id}", delete(delete_curriculum))
}

pub fn init_levels_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_levels).post(create_level))
        .route("/{id}", delete(delete_level))
}

pub fn init_units_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_units).post(create_unit))
        .route("/{id}", put(update_unit).delete(delete_unit))
}

pub fn init_quizzes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_quizzes).post(create_quiz))
        .route("/{id}", delete(delete_quiz))
}
