//! # Campus Core
//!
//! Core types, errors, and utilities for the Campus API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Pagination utilities for list endpoints
//! - [`password`]: Password hashing and verification
//! - [`permissions`]: Permission name constants
//! - [`rounding`]: Two-decimal rounding for money and averages
//! - [`serde`]: Query-string friendly deserialization helpers
//!
//! # Example
//!
//! ```ignore
//! use campus_core::errors::AppError;
//! use campus_core::pagination::PaginationParams;
//! use campus_core::password::hash_password;
//!
//! let error = AppError::not_found(anyhow::anyhow!("Student not found"));
//! let hash = hash_password("secure_password")?;
//! let limit = PaginationParams::default().limit();
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod rounding;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use rounding::round2;
