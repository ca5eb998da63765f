pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{
    init_buildings_router, init_conflicts_router, init_courses_router, init_rooms_router,
    init_time_slots_router,
};
