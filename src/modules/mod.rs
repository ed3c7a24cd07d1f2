pub mod auth;
pub mod curriculum;
pub mod lessons;
pub mod quiz_results;
pub mod sharing;
pub mod students;
pub mod users;
