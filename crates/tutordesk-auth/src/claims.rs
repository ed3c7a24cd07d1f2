use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use tutordesk_core::AppError;

/// JWT claims for access tokens.
///
/// `role` is informational: authorization always re-reads the user record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    /// User's email address at issue time
    pub email: String,
    /// User's role at issue time
    pub role: String,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }
}
