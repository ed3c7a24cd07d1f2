//! Admin-only access, as route middleware or as a handler extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use tutordesk_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

fn ensure_admin(auth_user: AuthUser) -> Result<AuthUser, AppError> {
    if auth_user.is_admin() {
        Ok(auth_user)
    } else {
        Err(AppError::forbidden("Access denied. Admin role required"))
    }
}

/// Middleware rejecting every non-admin caller.
///
/// ```rust,ignore
/// let admin_routes = Router::new()
///     .route("/", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
/// ```
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let checked = match AuthUser::from_request_parts(&mut parts, &state).await {
        Ok(user) => ensure_admin(user),
        Err(err) => Err(err),
    };

    match checked {
        Ok(_) => next.run(Request::from_parts(parts, body)).await,
        Err(err) => err.into_response(),
    }
}

/// Extractor for handlers whose route mixes open reads with admin-only writes.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        ensure_admin(auth_user).map(RequireAdmin)
    }
}
