//! Grant-id based sharing endpoints (`/user-lessons`). Authorization lives
//! in [`LessonService`](crate::modules::lessons::LessonService).

pub mod controller;
pub mod router;

pub use router::init_sharing_router;
