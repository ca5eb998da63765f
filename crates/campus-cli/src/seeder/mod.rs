//! Database seeding for development and load testing.
//!
//! - [`academic`] - faculties, departments, programs, subjects and the seed year
//! - [`people`] - teachers and students with their accounts, roles and profiles
//! - [`models`] - seed rows and [`SeedConfig`]
//!
//! Seeded rows are tagged so they can be removed again without touching
//! data created through the API: academic codes start with
//! [`SEED_CODE_PREFIX`], accounts use [`SEED_EMAIL_DOMAIN`].
//!
//! # Performance
//!
//! - Parallel data generation using Rayon
//! - Batch inserts with multi-value INSERT statements
//! - Single bcrypt hash reused for all users (cost 4 for speed)

pub mod academic;
pub mod models;
pub mod people;

pub use models::{PeoplePerUnit, SeedConfig, StructurePerFaculty};

use sqlx::PgPool;
use std::time::Instant;

pub type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

pub const SEED_CODE_PREFIX: &str = "SD";
pub const SEED_YEAR_PREFIX: &str = "SEED-";
pub const SEED_EMAIL_DOMAIN: &str = "seed.campus.test";

/// Password of every seeded account.
pub const SEED_PASSWORD: &str = "password123";

/// `($1, $2), ($3, $4), ...` for `rows` rows of `columns` parameters.
pub(crate) fn values_placeholders(rows: usize, columns: usize) -> String {
    (0..rows)
        .map(|row| {
            let params: Vec<String> = (1..=columns)
                .map(|col| format!("${}", row * columns + col))
                .collect();
            format!("({})", params.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn seed_password_hash() -> SeedResult<String> {
    Ok(bcrypt::hash(SEED_PASSWORD, 4)?)
}

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> SeedResult<()> {
    let start_time = Instant::now();
    println!("🌱 Starting database seeding...");
    println!(
        "   {} faculties, {} departments, {} programs, {} teachers, {} students",
        config.num_faculties,
        config.total_departments(),
        config.total_programs(),
        config.total_teachers(),
        config.total_students()
    );
    println!();

    let password_hash = seed_password_hash()?;

    let faculties = academic::seed_faculties(db, config.num_faculties).await?;
    let departments =
        academic::seed_departments(db, &faculties, config.structure.departments).await?;
    let programs = academic::seed_programs(
        db,
        &departments,
        config.structure.programs_per_department,
    )
    .await?;

    let program_codes: Vec<_> = programs
        .iter()
        .map(|(id, code, _)| (*id, code.clone()))
        .collect();
    academic::seed_subjects(db, &program_codes, config.structure.subjects_per_program).await?;

    let year_id = academic::seed_academic_year(db).await?;

    people::seed_teachers(
        db,
        &departments,
        config.people.teachers_per_department,
        &password_hash,
    )
    .await?;
    people::seed_students(
        db,
        &programs,
        year_id,
        config.people.students_per_program,
        &password_hash,
    )
    .await?;

    println!();
    println!("✅ Seeding completed in {:?}", start_time.elapsed());
    println!("   Seeded accounts use the password '{}'", SEED_PASSWORD);

    Ok(())
}

/// Removes everything [`seed_all`] created. People go first since
/// enrollments restrict program deletion.
pub async fn clear_all(db: &PgPool) -> SeedResult<()> {
    let start_time = Instant::now();

    people::clear_people(db).await?;
    academic::clear_structure(db).await?;

    println!("✅ Cleared seeded data in {:?}", start_time.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_placeholders_numbers_sequentially() {
        assert_eq!(values_placeholders(2, 3), "($1, $2, $3), ($4, $5, $6)");
        assert_eq!(values_placeholders(1, 1), "($1)");
        assert_eq!(values_placeholders(0, 4), "");
    }
}
