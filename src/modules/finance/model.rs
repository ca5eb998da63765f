pub use campus_models::finance::*;
