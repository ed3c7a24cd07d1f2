use axum::{Router, routing::get};

use crate::modules::sharing::controller::{
    create_grant, delete_grant, get_grant, get_grants, update_grant,
};
use crate::state::AppState;

pub fn init_sharing_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_grants).post(create_grant))
        .route(
            "/{id}",
            get(get_grant).put(update_grant).delete(delete_grant),
        )
}
