//! Shared helpers that do not belong to a single module.
//!
//! - [`email`]: SMTP delivery for e-mail notifications

pub mod email;
