pub use campus_models::evaluations::*;
