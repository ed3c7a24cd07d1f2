use tracing::{info, instrument, warn};

use tutordesk_auth::create_access_token;
use tutordesk_config::JwtConfig;
use tutordesk_core::{AppError, verify_password};
use tutordesk_db::{EntityStore, UserStore};
use tutordesk_models::auth::{LoginRequest, LoginResponse};

use crate::metrics::{track_jwt_issued, track_user_login_failure, track_user_login_success};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService;

impl AuthService {
    /// Checks credentials and issues a bearer token. Unknown emails and wrong
    /// passwords fail with the same message.
    #[instrument(skip(store, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login_user(
        store: &dyn EntityStore,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let Some(user) = store.find_user_by_email(&dto.email).await? else {
            track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(&dto.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Rejected login with wrong password");
            track_user_login_failure("invalid_password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        store.record_login(user.id).await?;

        let access_token =
            create_access_token(user.id.into_inner(), &user.email, user.role.as_str(), jwt_config)?;
        track_jwt_issued();
        track_user_login_success(user.role.as_str());
        info!(user_id = %user.id, "User logged in");

        let user = store.find_user(user.id).await?.unwrap_or(user);

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user: user.into(),
        })
    }
}
