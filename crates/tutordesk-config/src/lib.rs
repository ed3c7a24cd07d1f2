//! # Tutordesk Config
//!
//! Configuration types for the Tutordesk API.
//!
//! This crate provides configuration structures loaded from environment variables:
//!
//! - [`jwt`]: JWT authentication configuration
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`server`]: Listen address
//! - [`store`]: Entity store backend selection (Postgres or in-memory)
//!
//! # Example
//!
//! ```ignore
//! use tutordesk_config::{CorsConfig, JwtConfig, ServerConfig, StoreBackend};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let server_config = ServerConfig::from_env();
//! let backend = StoreBackend::from_env();
//! ```

pub mod cors;
pub mod jwt;
pub mod server;
pub mod store;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use server::ServerConfig;
pub use store::StoreBackend;
