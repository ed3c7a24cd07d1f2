//! # Tutordesk Models
//!
//! Domain models and DTOs for the Tutordesk API.
//!
//! # Modules
//!
//! - [`ids`]: Strongly typed UUID newtypes
//! - [`permission`]: Lesson capability tiers (`view`, `edit`, `manage`)
//! - [`users`]: Accounts and roles
//! - [`lessons`]: Lessons and participants
//! - [`sharing`]: User-lesson grants
//! - [`students`]: Students
//! - [`history`]: Student status and level history
//! - [`curriculum`]: Statuses, curricula, levels, units and quizzes
//! - [`quiz_results`]: Per-lesson quiz scores
//! - [`query`]: Typed list filters and their composers
//! - [`auth`]: Login request/response

pub mod auth;
pub mod curriculum;
pub mod history;
pub mod ids;
pub mod lessons;
pub mod permission;
pub mod query;
pub mod quiz_results;
pub mod sharing;
pub mod students;
pub mod users;

pub use lessons::Lesson;
pub use permission::PermissionLevel;
pub use sharing::UserLesson;
pub use students::Student;
pub use users::{User, UserRole};
