//! # Campus CLI
//!
//! Administration and database seeding utilities for development setups.
//!
//! ```ignore
//! use campus_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 faculties with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod seeder;
