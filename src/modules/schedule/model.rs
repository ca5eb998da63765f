pub use campus_models::schedule::*;
