use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use tutordesk_auth::verify_token;
use tutordesk_core::AppError;
use tutordesk_db::UserStore;
use tutordesk_models::ids::UserId;
use tutordesk_models::users::User;

use crate::state::AppState;

/// Extractor that validates the bearer JWT and loads the caller's current
/// user record.
///
/// The record is re-read on every request, so a role change or account
/// deletion takes effect before the token expires.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = verify_token(token, &state.jwt_config)?;
        let user_id = UserId::from_uuid(claims.user_id()?);

        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        Ok(AuthUser(user))
    }
}
