//! Request extractors for authentication and permission checks.
//!
//! 1. The client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] verifies the token and exposes its claims
//! 3. A `RequireXxx` extractor rejects the request with 403 unless the
//!    claims carry the matching permission
//!
//! ```ignore
//! use crate::middleware::auth::{AuthUser, RequireGradesWrite};
//!
//! async fn me(auth_user: AuthUser) -> impl IntoResponse { /* any valid token */ }
//!
//! async fn enter_grades(RequireGradesWrite(auth_user): RequireGradesWrite) -> impl IntoResponse {
//!     // only with "grades:write"
//! }
//! ```

pub mod auth;
