use axum::{Router, routing::get};

use crate::modules::users::controller::{create_user, delete_user, get_user, get_users, update_user};
use crate::state::AppState;

/// Admin-only; the caller layers `require_admin` over these routes.
pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}
