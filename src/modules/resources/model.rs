pub use campus_models::resources::*;
