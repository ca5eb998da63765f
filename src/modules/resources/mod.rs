pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{init_equipment_router, init_maintenances_router, init_reservations_router};
