//! # Tutordesk Core
//!
//! Core types, errors, and utilities for the Tutordesk API.
//!
//! This crate provides foundational types used throughout the Tutordesk application:
//!
//! - [`errors`]: Application error kinds with HTTP response conversion
//! - [`pagination`]: Page-based pagination parameters and envelopes
//! - [`password`]: Password hashing and verification
//! - [`params`]: Parsing of raw date, flag and integer query parameters
//! - [`serde`]: Custom serde deserialization helpers for query strings
//!
//! # Example
//!
//! ```ignore
//! use tutordesk_core::errors::{AppError, ErrorKind};
//! use tutordesk_core::pagination::{PageParams, PaginationMeta};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Lesson not found"));
//! assert_eq!(error.kind, ErrorKind::NotFound);
//!
//! let params = PageParams::default();
//! let request = params.to_request();
//! let meta = PaginationMeta::new(&request, 42);
//! ```

pub mod errors;
pub mod pagination;
pub mod params;
pub mod password;
pub mod serde;

// Re-export commonly used types at crate root
pub use errors::{AppError, ErrorKind};
pub use pagination::{Page, PageParams, PageRequest, PaginationMeta};
pub use password::{hash_password, verify_password};
