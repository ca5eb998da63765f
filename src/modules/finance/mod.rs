pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::*;
pub use router::{
    init_fees_router, init_invoices_router, init_payments_router, init_scholarships_router,
};
