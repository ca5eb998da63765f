pub use campus_models::documents::*;
