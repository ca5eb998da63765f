//! Teacher and student seeding.
//!
//! Each person gets a user account, the matching system role and a profile
//! row carrying a registration number from the same series the API uses.
//! Students are also enrolled in level 1 of their program.

use campus_models::ids::{AcademicYearId, DepartmentId, ProgramId, RoleId, StudentId, UserId};
use campus_models::numbering::{
    STUDENT_PREFIX, TEACHER_PREFIX, next_sequence, registration_number, registration_stem,
};
use campus_models::students::Sex;
use campus_models::system_roles;
use campus_models::teachers::TeacherGrade;
use chrono::{Datelike, NaiveDate, Utc};
use fake::Fake;
use fake::faker::address::en::CityName;
use fake::faker::company::en::Profession;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{StudentSeed, TeacherSeed, UserSeed};
use super::{SEED_EMAIL_DOMAIN, SeedResult, values_placeholders};

fn slug(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn random_sex() -> Sex {
    if (0..2).fake::<u8>() == 0 {
        Sex::Male
    } else {
        Sex::Female
    }
}

fn generate_user(role_id: RoleId, tag: &str, number: usize, password_hash: &str) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    let email = format!(
        "{}.{}+{}{}@{}",
        slug(&first_name),
        slug(&last_name),
        tag,
        number,
        SEED_EMAIL_DOMAIN
    );

    UserSeed {
        first_name,
        last_name,
        email,
        password_hash: password_hash.to_string(),
        role_id,
    }
}

/// Birth date making the student 18 to 25 years old.
fn student_birth_date() -> NaiveDate {
    let year = Utc::now().year() - (18..26).fake::<i32>();
    let month: u32 = (1..13).fake();
    let day: u32 = (1..29).fake();
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

pub fn generate_teachers(
    departments: &[(DepartmentId, String)],
    per_department: usize,
    password_hash: &str,
) -> Vec<TeacherSeed> {
    departments
        .par_iter()
        .enumerate()
        .flat_map(|(department_idx, (department_id, _))| {
            (0..per_department)
                .map(|idx| {
                    let grade_idx = (0..TeacherGrade::ALL.len()).fake::<usize>();
                    TeacherSeed {
                        user: generate_user(
                            system_roles::TEACHER,
                            "teacher",
                            department_idx * 1000 + idx,
                            password_hash,
                        ),
                        department_id: *department_id,
                        grade: TeacherGrade::ALL[grade_idx],
                        specialty: Profession().fake(),
                        sex: random_sex(),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn generate_students(
    programs: &[(ProgramId, String, f64)],
    per_program: usize,
    password_hash: &str,
) -> Vec<StudentSeed> {
    programs
        .par_iter()
        .enumerate()
        .flat_map(|(program_idx, (program_id, _, fee))| {
            (0..per_program)
                .map(|idx| StudentSeed {
                    user: generate_user(
                        system_roles::STUDENT,
                        "student",
                        program_idx * 1000 + idx,
                        password_hash,
                    ),
                    program_id: *program_id,
                    registration_fee: *fee,
                    date_of_birth: student_birth_date(),
                    place_of_birth: CityName().fake(),
                    sex: random_sex(),
                    city: CityName().fake(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Locks a registration series and returns the first free sequence number.
async fn reserve_series(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    stem: &str,
) -> SeedResult<u32> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{}.registration_number:{}", table, stem))
        .execute(&mut **tx)
        .await?;

    let last = sqlx::query_scalar::<_, String>(&format!(
        r#"SELECT registration_number FROM {table}
           WHERE registration_number LIKE $1 || '%'
           ORDER BY LENGTH(registration_number) DESC, registration_number DESC
           LIMIT 1"#
    ))
    .bind(stem)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(next_sequence(stem, last.as_deref()))
}

async fn insert_users_chunk<'a>(
    tx: &mut Transaction<'_, Postgres>,
    users: impl ExactSizeIterator<Item = &'a UserSeed> + Clone,
) -> SeedResult<Vec<UserId>> {
    if users.len() == 0 {
        return Ok(Vec::new());
    }

    let query = format!(
        "INSERT INTO users (first_name, last_name, email, password) VALUES {} RETURNING id",
        values_placeholders(users.len(), 4)
    );
    let mut q = sqlx::query_scalar::<_, UserId>(&query);
    for user in users.clone() {
        q = q
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash);
    }
    let ids = q.fetch_all(&mut **tx).await?;

    let query = format!(
        "INSERT INTO user_roles (user_id, role_id) VALUES {} ON CONFLICT (user_id, role_id) DO NOTHING",
        values_placeholders(ids.len(), 2)
    );
    let mut q = sqlx::query(&query);
    for (id, user) in ids.iter().zip(users) {
        q = q.bind(id).bind(user.role_id);
    }
    q.execute(&mut **tx).await?;

    Ok(ids)
}

pub async fn seed_teachers(
    db: &PgPool,
    departments: &[(DepartmentId, String)],
    per_department: usize,
    password_hash: &str,
) -> SeedResult<usize> {
    let start_time = Instant::now();
    println!(
        "👩‍🏫 Seeding {} teachers ({} per department)...",
        departments.len() * per_department,
        per_department
    );

    let teachers = generate_teachers(departments, per_department, password_hash);
    let year = Utc::now().year();
    let stem = registration_stem(TEACHER_PREFIX, year);

    let mut tx = db.begin().await?;
    let mut sequence = reserve_series(&mut tx, "teachers", &stem).await?;

    // 7 params per teacher profile
    for chunk in teachers.chunks(1000) {
        let user_ids = insert_users_chunk(&mut tx, chunk.iter().map(|t| &t.user)).await?;

        let query = format!(
            "INSERT INTO teachers (user_id, department_id, registration_number, grade, specialty, sex, hired_on) VALUES {}",
            values_placeholders(chunk.len(), 7)
        );
        let mut q = sqlx::query(&query);
        for (user_id, teacher) in user_ids.iter().zip(chunk) {
            q = q
                .bind(user_id)
                .bind(teacher.department_id)
                .bind(registration_number(TEACHER_PREFIX, year, sequence))
                .bind(teacher.grade)
                .bind(&teacher.specialty)
                .bind(teacher.sex)
                .bind(Utc::now().date_naive());
            sequence += 1;
        }
        q.execute(&mut *tx).await?;
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} teachers in {:?}",
        teachers.len(),
        start_time.elapsed()
    );

    Ok(teachers.len())
}

pub async fn seed_students(
    db: &PgPool,
    programs: &[(ProgramId, String, f64)],
    academic_year_id: AcademicYearId,
    per_program: usize,
    password_hash: &str,
) -> SeedResult<usize> {
    let start_time = Instant::now();
    println!(
        "🧑‍🎓 Seeding {} students ({} per program)...",
        programs.len() * per_program,
        per_program
    );

    let students = generate_students(programs, per_program, password_hash);
    let year = Utc::now().year();
    let stem = registration_stem(STUDENT_PREFIX, year);

    let mut tx = db.begin().await?;
    let mut sequence = reserve_series(&mut tx, "students", &stem).await?;

    for chunk in students.chunks(1000) {
        let user_ids = insert_users_chunk(&mut tx, chunk.iter().map(|s| &s.user)).await?;

        let query = format!(
            "INSERT INTO students (user_id, registration_number, date_of_birth, place_of_birth, sex, nationality, city)
             VALUES {} RETURNING id",
            values_placeholders(chunk.len(), 7)
        );
        let mut q = sqlx::query_scalar::<_, StudentId>(&query);
        for (user_id, student) in user_ids.iter().zip(chunk) {
            q = q
                .bind(user_id)
                .bind(registration_number(STUDENT_PREFIX, year, sequence))
                .bind(student.date_of_birth)
                .bind(&student.place_of_birth)
                .bind(student.sex)
                .bind("Senegalese")
                .bind(&student.city);
            sequence += 1;
        }
        let student_ids = q.fetch_all(&mut *tx).await?;

        let query = format!(
            "INSERT INTO enrollments (student_id, program_id, academic_year_id, level, registration_fee) VALUES {}",
            values_placeholders(student_ids.len(), 5)
        );
        let mut q = sqlx::query(&query);
        for (student_id, student) in student_ids.iter().zip(chunk) {
            q = q
                .bind(student_id)
                .bind(student.program_id)
                .bind(academic_year_id)
                .bind(1_i32)
                .bind(student.registration_fee);
        }
        q.execute(&mut *tx).await?;
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted and enrolled {} students in {:?}",
        students.len(),
        start_time.elapsed()
    );

    Ok(students.len())
}

/// Deletes seeded accounts, cascading to their profiles and enrollments.
/// System administrators are never removed.
pub async fn clear_people(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let deleted = sqlx::query(
        r#"DELETE FROM users u
           WHERE u.email LIKE '%@' || $1
             AND NOT EXISTS (
                 SELECT 1 FROM user_roles ur
                 WHERE ur.user_id = u.id AND ur.role_id = $2
             )"#,
    )
    .bind(SEED_EMAIL_DOMAIN)
    .bind(system_roles::SYSTEM_ADMIN)
    .execute(db)
    .await?
    .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        deleted,
        start_time.elapsed()
    );

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_keeps_ascii_alphanumerics() {
        assert_eq!(slug("O'Keefe"), "okeefe");
        assert_eq!(slug("Anne-Marie"), "annemarie");
    }

    #[test]
    fn test_students_are_spread_over_programs() {
        let programs = vec![
            (ProgramId::new(), "SDF01D1P1".to_string(), 75_000.0),
            (ProgramId::new(), "SDF01D1P2".to_string(), 120_000.0),
        ];
        let students = generate_students(&programs, 3, "hash");

        assert_eq!(students.len(), 6);
        assert_eq!(
            students
                .iter()
                .filter(|s| s.program_id == programs[1].0)
                .count(),
            3
        );
        assert!(
            students
                .iter()
                .all(|s| s.user.email.ends_with(SEED_EMAIL_DOMAIN))
        );
        assert!(
            students
                .iter()
                .all(|s| s.user.role_id == system_roles::STUDENT)
        );
    }

    #[test]
    fn test_student_ages_are_plausible() {
        let today = Utc::now().date_naive();
        for _ in 0..50 {
            let age = today.year() - student_birth_date().year();
            assert!((18..=25).contains(&age));
        }
    }

    #[test]
    fn test_teacher_emails_are_unique_per_department() {
        let departments = vec![
            (DepartmentId::new(), "SDF01D1".to_string()),
            (DepartmentId::new(), "SDF01D2".to_string()),
        ];
        let teachers = generate_teachers(&departments, 4, "hash");

        let mut emails: Vec<&str> = teachers.iter().map(|t| t.user.email.as_str()).collect();
        emails.sort_unstable();
        emails.dedup();
        assert_eq!(emails.len(), 8);
    }
}
