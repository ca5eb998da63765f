pub use campus_models::academic::*;
