//! Academic structure seeding: faculties, departments, programs, subjects
//! and the academic year seeded students are enrolled into.

use campus_models::academic::Cycle;
use campus_models::ids::{AcademicYearId, DepartmentId, FacultyId, ProgramId, SubjectId};
use chrono::{Datelike, NaiveDate, Utc};
use fake::Fake;
use fake::faker::company::en::{BuzzwordMiddle, BuzzwordTail, Industry};
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{DepartmentSeed, FacultySeed, ProgramSeed, SubjectSeed};
use super::{SEED_CODE_PREFIX, SEED_YEAR_PREFIX, SeedResult, values_placeholders};

const DISCIPLINES: &[&str] = &[
    "Sciences and Technology",
    "Letters and Humanities",
    "Law and Political Science",
    "Economics and Management",
    "Medicine and Pharmacy",
    "Engineering",
    "Education",
    "Arts",
];

fn full_name() -> String {
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    format!("{} {}", first, last)
}

pub fn generate_faculties(count: usize) -> Vec<FacultySeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| FacultySeed {
            code: format!("{}F{:02}", SEED_CODE_PREFIX, idx + 1),
            name: format!("Faculty of {}", DISCIPLINES[idx % DISCIPLINES.len()]),
            dean: full_name(),
        })
        .collect()
}

pub fn generate_departments(
    faculties: &[(FacultyId, String)],
    per_faculty: usize,
) -> Vec<DepartmentSeed> {
    faculties
        .par_iter()
        .flat_map(|(faculty_id, faculty_code)| {
            (0..per_faculty)
                .map(|idx| {
                    let field: String = Industry().fake();
                    DepartmentSeed {
                        faculty_id: *faculty_id,
                        code: format!("{}D{}", faculty_code, idx + 1),
                        name: format!("Department of {}", field),
                        head: full_name(),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn generate_programs(
    departments: &[(DepartmentId, String)],
    per_department: usize,
) -> Vec<ProgramSeed> {
    departments
        .par_iter()
        .flat_map(|(department_id, department_code)| {
            (0..per_department)
                .map(|idx| {
                    let cycle = if idx % 2 == 0 {
                        Cycle::Licence
                    } else {
                        Cycle::Master
                    };
                    let duration_years = match cycle {
                        Cycle::Master => 2,
                        _ => 3,
                    };
                    let field: String = Industry().fake();
                    let fee_steps: i32 = (5..16).fake();

                    ProgramSeed {
                        department_id: *department_id,
                        code: format!("{}P{}", department_code, idx + 1),
                        name: format!("{} in {}", cycle.as_str(), field),
                        cycle,
                        duration_years,
                        registration_fee: f64::from(fee_steps) * 10_000.0,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn generate_subjects(programs: &[(ProgramId, String)], per_program: usize) -> Vec<SubjectSeed> {
    programs
        .par_iter()
        .flat_map(|(program_id, program_code)| {
            (0..per_program)
                .map(|idx| {
                    let middle: String = BuzzwordMiddle().fake();
                    let tail: String = BuzzwordTail().fake();

                    SubjectSeed {
                        program_id: *program_id,
                        code: format!("{}S{:02}", program_code, idx + 1),
                        name: format!("{} {}", middle, tail),
                        coefficient: (1..5).fake(),
                        credits: (2..7).fake(),
                        // first half in semester 1
                        semester: if idx < per_program.div_ceil(2) { 1 } else { 2 },
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_faculties(db: &PgPool, count: usize) -> SeedResult<Vec<(FacultyId, String)>> {
    let start_time = Instant::now();
    println!("🏛️  Seeding {} faculties...", count);

    let faculties = generate_faculties(count);
    let mut tx = db.begin().await?;
    let mut inserted = Vec::with_capacity(faculties.len());

    for chunk in faculties.chunks(1000) {
        let query = format!(
            "INSERT INTO faculties (code, name, dean) VALUES {} RETURNING id, code",
            values_placeholders(chunk.len(), 3)
        );
        let mut q = sqlx::query_as::<_, (FacultyId, String)>(&query);
        for faculty in chunk {
            q = q.bind(&faculty.code).bind(&faculty.name).bind(&faculty.dean);
        }
        inserted.extend(q.fetch_all(&mut *tx).await?);
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} faculties in {:?}",
        inserted.len(),
        start_time.elapsed()
    );

    Ok(inserted)
}

pub async fn seed_departments(
    db: &PgPool,
    faculties: &[(FacultyId, String)],
    per_faculty: usize,
) -> SeedResult<Vec<(DepartmentId, String)>> {
    let start_time = Instant::now();
    println!(
        "🏢 Seeding {} departments ({} per faculty)...",
        faculties.len() * per_faculty,
        per_faculty
    );

    let departments = generate_departments(faculties, per_faculty);
    let mut tx = db.begin().await?;
    let mut inserted = Vec::with_capacity(departments.len());

    for chunk in departments.chunks(1000) {
        let query = format!(
            "INSERT INTO departments (faculty_id, code, name, head) VALUES {} RETURNING id, code",
            values_placeholders(chunk.len(), 4)
        );
        let mut q = sqlx::query_as::<_, (DepartmentId, String)>(&query);
        for department in chunk {
            q = q
                .bind(department.faculty_id)
                .bind(&department.code)
                .bind(&department.name)
                .bind(&department.head);
        }
        inserted.extend(q.fetch_all(&mut *tx).await?);
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} departments in {:?}",
        inserted.len(),
        start_time.elapsed()
    );

    Ok(inserted)
}

/// Returns `(id, code, registration fee)` for each inserted program.
pub async fn seed_programs(
    db: &PgPool,
    departments: &[(DepartmentId, String)],
    per_department: usize,
) -> SeedResult<Vec<(ProgramId, String, f64)>> {
    let start_time = Instant::now();
    println!(
        "🎓 Seeding {} programs ({} per department)...",
        departments.len() * per_department,
        per_department
    );

    let programs = generate_programs(departments, per_department);
    let mut tx = db.begin().await?;
    let mut inserted = Vec::with_capacity(programs.len());

    for chunk in programs.chunks(1000) {
        let query = format!(
            "INSERT INTO programs (department_id, code, name, cycle, duration_years, registration_fee)
             VALUES {} RETURNING id, code, registration_fee",
            values_placeholders(chunk.len(), 6)
        );
        let mut q = sqlx::query_as::<_, (ProgramId, String, f64)>(&query);
        for program in chunk {
            q = q
                .bind(program.department_id)
                .bind(&program.code)
                .bind(&program.name)
                .bind(program.cycle)
                .bind(program.duration_years)
                .bind(program.registration_fee);
        }
        inserted.extend(q.fetch_all(&mut *tx).await?);
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} programs in {:?}",
        inserted.len(),
        start_time.elapsed()
    );

    Ok(inserted)
}

/// Inserts subjects and attaches each one to the program it was generated for.
pub async fn seed_subjects(
    db: &PgPool,
    programs: &[(ProgramId, String)],
    per_program: usize,
) -> SeedResult<usize> {
    let start_time = Instant::now();
    println!(
        "📘 Seeding {} subjects ({} per program)...",
        programs.len() * per_program,
        per_program
    );

    let subjects = generate_subjects(programs, per_program);
    let mut tx = db.begin().await?;
    let mut total = 0;

    for chunk in subjects.chunks(1000) {
        let ids = insert_subjects_chunk(&mut tx, chunk).await?;
        link_subjects_chunk(&mut tx, chunk, &ids).await?;
        total += ids.len();
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} subjects in {:?}",
        total,
        start_time.elapsed()
    );

    Ok(total)
}

async fn insert_subjects_chunk(
    tx: &mut Transaction<'_, Postgres>,
    subjects: &[SubjectSeed],
) -> SeedResult<Vec<SubjectId>> {
    if subjects.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "INSERT INTO subjects (code, name, coefficient, credits, semester, hours_lecture) VALUES {} RETURNING id",
        values_placeholders(subjects.len(), 6)
    );
    let mut q = sqlx::query_scalar::<_, SubjectId>(&query);
    for subject in subjects {
        q = q
            .bind(&subject.code)
            .bind(&subject.name)
            .bind(subject.coefficient)
            .bind(subject.credits)
            .bind(subject.semester)
            .bind(subject.credits * 10);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

async fn link_subjects_chunk(
    tx: &mut Transaction<'_, Postgres>,
    subjects: &[SubjectSeed],
    ids: &[SubjectId],
) -> SeedResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let query = format!(
        "INSERT INTO program_subjects (program_id, subject_id) VALUES {} ON CONFLICT DO NOTHING",
        values_placeholders(ids.len(), 2)
    );
    let mut q = sqlx::query(&query);
    for (subject, id) in subjects.iter().zip(ids) {
        q = q.bind(subject.program_id).bind(id);
    }

    q.execute(&mut **tx).await?;
    Ok(())
}

/// Seed year running September to July, starting in the current calendar
/// year. Reused when it already exists. Left inactive so it never takes the
/// place of a year configured through the API.
pub async fn seed_academic_year(db: &PgPool) -> SeedResult<AcademicYearId> {
    let year = Utc::now().year();
    let start_date = NaiveDate::from_ymd_opt(year, 9, 1).ok_or("invalid start date")?;
    let end_date = NaiveDate::from_ymd_opt(year + 1, 7, 31).ok_or("invalid end date")?;

    let id = sqlx::query_scalar::<_, AcademicYearId>(
        r#"INSERT INTO academic_years (code, start_date, end_date, is_active)
           VALUES ($1, $2, $3, FALSE)
           ON CONFLICT (code) DO UPDATE SET updated_at = NOW()
           RETURNING id"#,
    )
    .bind(format!("{}{}-{}", SEED_YEAR_PREFIX, year, year + 1))
    .bind(start_date)
    .bind(end_date)
    .fetch_one(db)
    .await?;

    println!("📅 Using academic year {}-{}", year, year + 1);
    Ok(id)
}

/// Deletes seeded faculties (cascading to departments and programs),
/// seeded subjects and seeded academic years.
pub async fn clear_structure(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded academic structure...");

    let pattern = format!("{}%", SEED_CODE_PREFIX);
    let mut tx = db.begin().await?;

    let subjects = sqlx::query("DELETE FROM subjects WHERE code LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let faculties = sqlx::query("DELETE FROM faculties WHERE code LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let years = sqlx::query("DELETE FROM academic_years WHERE code LIKE $1")
        .bind(format!("{}%", SEED_YEAR_PREFIX))
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    println!(
        "   ✓ Deleted {} faculties, {} subjects and {} academic years in {:?}",
        faculties,
        subjects,
        years,
        start_time.elapsed()
    );

    Ok(faculties + subjects + years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faculty_codes_are_prefixed_and_numbered() {
        let faculties = generate_faculties(3);
        let codes: Vec<&str> = faculties.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["SDF01", "SDF02", "SDF03"]);
        assert!(faculties[0].name.starts_with("Faculty of "));
    }

    #[test]
    fn test_programs_alternate_cycles() {
        let departments = vec![(DepartmentId::new(), "SDF01D1".to_string())];
        let programs = generate_programs(&departments, 2);

        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].cycle, Cycle::Licence);
        assert_eq!(programs[0].duration_years, 3);
        assert_eq!(programs[1].cycle, Cycle::Master);
        assert_eq!(programs[1].duration_years, 2);
        assert_eq!(programs[1].code, "SDF01D1P2");
        assert!(programs.iter().all(|p| p.registration_fee >= 50_000.0));
    }

    #[test]
    fn test_subjects_split_across_semesters() {
        let programs = vec![(ProgramId::new(), "SDF01D1P1".to_string())];
        let subjects = generate_subjects(&programs, 5);

        let first: Vec<_> = subjects.iter().filter(|s| s.semester == 1).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(subjects.len() - first.len(), 2);
        assert!(subjects.iter().all(|s| (1..=4).contains(&s.coefficient)));
        assert!(subjects.iter().all(|s| s.code.len() <= 20));
    }
}
