//! # Campus Models
//!
//! Domain models, DTOs and business rules for the Campus API.
//!
//! Row types derive `sqlx::FromRow`, request types derive `validator::Validate`
//! and everything exposed over HTTP derives `utoipa::ToSchema`. Rules that do
//! not need the database (averages, decisions, conflict detection, invoice
//! amounts, template rendering) live next to the types they act on.
//!
//! # Modules
//!
//! - [`academic`]: years, faculties, departments, programs, subjects
//! - [`students`]: students and enrollments
//! - [`teachers`]: teachers and teaching assignments
//! - [`evaluations`]: evaluation types, evaluations, grades, results
//! - [`deliberations`]: sessions, jury and decisions
//! - [`schedule`]: buildings, rooms, time slots, courses, conflicts
//! - [`finance`]: fees, payments, scholarships, invoices
//! - [`documents`]: templates and official documents
//! - [`communications`]: announcements, notifications, messages
//! - [`resources`]: equipment, reservations, maintenance
//!
//! ```ignore
//! use campus_models::evaluations::{weighted_average, Mention};
//!
//! let average = weighted_average(&[(12.0, 1.0), (15.0, 2.0)]);
//! assert_eq!(Mention::from_average(average), Some(Mention::Good));
//! ```

pub mod academic;
pub mod auth;
pub mod common;
pub mod communications;
pub mod deliberations;
pub mod documents;
pub(crate) mod enums;
pub mod evaluations;
pub mod finance;
pub mod ids;
pub mod numbering;
pub mod resources;
pub mod roles;
pub mod schedule;
pub mod students;
pub mod teachers;
pub mod users;

pub use common::{LabelCount, MessageResponse, YearScope};
pub use enums::ParseEnumError;
pub use roles::{Permission, Role, RoleWithPermissions, system_roles};
pub use users::{User, UserWithRoles};
