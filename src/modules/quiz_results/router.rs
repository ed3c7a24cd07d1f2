use axum::{
    Router,
    routing::{get, put},
};

use crate::modules::quiz_results::controller::{
    create_quiz_result, delete_quiz_result, list_quiz_results, update_quiz_result,
};
use crate::state::AppState;

pub fn init_quiz_results_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quiz_results).post(create_quiz_result))
        .route("/{id}", put(update_quiz_result).delete(delete_quiz_result))
}
