//! Evaluation types, evaluations, grades and subject results.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{
    init_evaluation_types_router, init_evaluations_router, init_grades_router,
    init_results_router,
};
