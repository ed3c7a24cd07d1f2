pub mod controller;
pub mod router;

pub use router::{
    init_curricula_router, init_levels_router, init_quizzes_router, init_statuses_router,
    init_units_router,
};
