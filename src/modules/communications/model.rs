pub use campus_models::communications::*;
