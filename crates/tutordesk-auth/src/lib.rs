//! # Tutordesk Auth
//!
//! Authentication types and JWT utilities for the Tutordesk API.
//!
//! - [`claims`]: JWT claim structure for access tokens
//! - [`jwt`]: Token creation and verification
//!
//! Tokens only establish *who* the caller is. Role and lesson capabilities are
//! resolved against the entity store on every request, so a role change takes
//! effect without waiting for the token to expire.
//!
//! # Example
//!
//! ```ignore
//! use tutordesk_auth::{create_access_token, verify_token};
//! use tutordesk_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "tutor@example.com", "instructor", &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.user_id()?, user_id);
//! ```

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
