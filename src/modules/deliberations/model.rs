pub use campus_models::deliberations::*;
