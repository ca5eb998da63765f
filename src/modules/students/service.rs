use anyhow::anyhow;
use chrono::{Datelike, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::ids::{EnrollmentId, StudentId};
use campus_models::numbering::{STUDENT_PREFIX, registration_number, registration_stem};
use campus_models::{LabelCount, system_roles};

use crate::metrics;
use crate::modules::search_pattern;
use crate::modules::sequence::next_in_series;
use crate::modules::users::service::UserService;

use super::model::{
    CreateEnrollmentDto, CreateStudentDto, Enrollment, EnrollmentFilterParams,
    EnrollmentStatistics, PaginatedEnrollmentsResponse, PaginatedStudentsResponse, PaymentStatus,
    Student, StudentFilterParams, StudentStatistics, UpdateEnrollmentDto, UpdateStudentDto,
    remaining_amount,
};

const STUDENT_SELECT: &str = r#"SELECT s.id, s.user_id, u.first_name, u.last_name, u.email,
        s.registration_number, s.date_of_birth, s.place_of_birth, s.sex, s.nationality, s.phone,
        s.personal_email, s.address, s.city, s.country, s.guardian_name, s.guardian_phone,
        s.guardian_email, s.status, s.created_at, s.updated_at
    FROM students s
    INNER JOIN users u ON u.id = s.user_id"#;

pub(crate) const ENROLLMENT_COLUMNS: &str = "id, student_id, program_id, academic_year_id, level, enrolled_on, \
     status, registration_fee, amount_paid, payment_status, remaining_amount, notes, created_at, updated_at";

pub struct StudentService;

impl StudentService {
    /// Creates the account with the student role, then the student with the next registration number.
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create(db: &PgPool, dto: CreateStudentDto) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let user_id = UserService::insert_account(
            &mut tx,
            &dto.first_name,
            &dto.last_name,
            &dto.email,
            &dto.password,
            system_roles::STUDENT,
        )
        .await?;

        let year = Utc::now().year();
        let stem = registration_stem(STUDENT_PREFIX, year);
        let sequence = next_in_series(&mut tx, "students", "registration_number", &stem).await?;
        let number = registration_number(STUDENT_PREFIX, year, sequence);

        let id = sqlx::query_scalar::<_, StudentId>(
            r#"INSERT INTO students
                (user_id, registration_number, date_of_birth, place_of_birth, sex, nationality, phone,
                 personal_email, address, city, country, guardian_name, guardian_phone, guardian_email)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(&number)
        .bind(dto.date_of_birth)
        .bind(&dto.place_of_birth)
        .bind(dto.sex)
        .bind(&dto.nationality)
        .bind(&dto.phone)
        .bind(&dto.personal_email)
        .bind(&dto.address)
        .bind(&dto.city)
        .bind(&dto.country)
        .bind(&dto.guardian_name)
        .bind(&dto.guardian_phone)
        .bind(&dto.guardian_email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Registration number already taken", "Invalid reference"))?;

        tx.commit().await?;
        info!(registration_number = %number, "Student registered");

        Self::get(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: StudentFilterParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::TEXT IS NULL OR s.status = $1)
              AND ($2::TEXT IS NULL OR s.sex = $2)
              AND ($3::UUID IS NULL OR EXISTS (
                    SELECT 1 FROM enrollments e WHERE e.student_id = s.id AND e.program_id = $3))
              AND ($4::TEXT IS NULL OR u.first_name ILIKE $4 OR u.last_name ILIKE $4
                    OR u.email ILIKE $4 OR s.registration_number ILIKE $4)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM students s INNER JOIN users u ON u.id = s.user_id{WHERE}"
        ))
        .bind(filters.status)
        .bind(filters.sex)
        .bind(filters.program_id)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, Student>(&format!(
            "{STUDENT_SELECT}{WHERE} ORDER BY u.last_name, u.first_name{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.status)
        .bind(filters.sex)
        .bind(filters.program_id)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedStudentsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: StudentId) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!("{STUDENT_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        id: StudentId,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let user_id = sqlx::query_scalar::<_, campus_models::ids::UserId>(
            r#"UPDATE students
               SET date_of_birth = COALESCE($1, date_of_birth),
                   place_of_birth = COALESCE($2, place_of_birth),
                   sex = COALESCE($3, sex),
                   nationality = COALESCE($4, nationality),
                   phone = COALESCE($5, phone),
                   personal_email = COALESCE($6, personal_email),
                   address = COALESCE($7, address),
                   city = COALESCE($8, city),
                   country = COALESCE($9, country),
                   guardian_name = COALESCE($10, guardian_name),
                   guardian_phone = COALESCE($11, guardian_phone),
                   guardian_email = COALESCE($12, guardian_email),
                   status = COALESCE($13, status),
                   updated_at = NOW()
               WHERE id = $14
               RETURNING user_id"#,
        )
        .bind(dto.date_of_birth)
        .bind(&dto.place_of_birth)
        .bind(dto.sex)
        .bind(&dto.nationality)
        .bind(&dto.phone)
        .bind(&dto.personal_email)
        .bind(&dto.address)
        .bind(&dto.city)
        .bind(&dto.country)
        .bind(&dto.guardian_name)
        .bind(&dto.guardian_phone)
        .bind(&dto.guardian_email)
        .bind(dto.status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))?;

        if dto.first_name.is_some() || dto.last_name.is_some() {
            sqlx::query(
                r#"UPDATE users
                   SET first_name = COALESCE($1, first_name),
                       last_name = COALESCE($2, last_name),
                       updated_at = NOW()
                   WHERE id = $3"#,
            )
            .bind(&dto.first_name)
            .bind(&dto.last_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Self::get(db, id).await
    }

    /// Removes the student together with the account.
    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: StudentId) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = (SELECT user_id FROM students WHERE id = $1)",
        )
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Student cannot be deleted", "Student still has payments or documents")
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Student not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn enrollments(db: &PgPool, id: StudentId) -> Result<Vec<Enrollment>, AppError> {
        Self::get(db, id).await?;
        let enrollments = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student_id = $1 ORDER BY enrolled_on DESC"
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(enrollments)
    }

    /// The ENROLLED enrollment of the active academic year.
    #[instrument(skip(db))]
    pub async fn active_enrollment(db: &PgPool, id: StudentId) -> Result<Enrollment, AppError> {
        Self::get(db, id).await?;
        sqlx::query_as::<_, Enrollment>(
            r#"SELECT e.id, e.student_id, e.program_id, e.academic_year_id, e.level, e.enrolled_on,
                      e.status, e.registration_fee, e.amount_paid, e.payment_status, e.remaining_amount,
                      e.notes, e.created_at, e.updated_at
               FROM enrollments e
               INNER JOIN academic_years ay ON ay.id = e.academic_year_id
               WHERE e.student_id = $1 AND ay.is_active AND e.status = 'ENROLLED'
               LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student has no enrollment in the active year")))
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<StudentStatistics, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(db)
            .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM students GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        let by_sex = sqlx::query_as::<_, LabelCount>(
            "SELECT sex AS label, COUNT(*) AS count FROM students GROUP BY sex ORDER BY sex",
        )
        .fetch_all(db)
        .await?;

        Ok(StudentStatistics {
            total,
            by_status,
            by_sex,
        })
    }
}

pub struct EnrollmentService;

impl EnrollmentService {
    /// The fee defaults to the program's registration fee; level cannot exceed the program duration.
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateEnrollmentDto) -> Result<Enrollment, AppError> {
        let (duration_years, program_fee) = sqlx::query_as::<_, (i32, f64)>(
            "SELECT duration_years, registration_fee FROM programs WHERE id = $1",
        )
        .bind(dto.program_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Program not found")))?;

        check_level(dto.level, duration_years)?;

        let fee = dto.registration_fee.unwrap_or(program_fee);
        let payment_status = PaymentStatus::from_amounts(fee, dto.amount_paid);

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            r#"INSERT INTO enrollments
                (student_id, program_id, academic_year_id, level, enrolled_on, registration_fee,
                 amount_paid, payment_status, notes)
               VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE), $6, $7, $8, $9)
               RETURNING {ENROLLMENT_COLUMNS}"#
        ))
        .bind(dto.student_id)
        .bind(dto.program_id)
        .bind(dto.academic_year_id)
        .bind(dto.level)
        .bind(dto.enrolled_on)
        .bind(fee)
        .bind(dto.amount_paid)
        .bind(payment_status)
        .bind(&dto.notes)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "Student is already enrolled in this program for this academic year",
                "Student or academic year does not exist",
            )
        })?;

        metrics::track_enrollment_created(enrollment.level);
        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: EnrollmentFilterParams,
    ) -> Result<PaginatedEnrollmentsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR student_id = $1)
              AND ($2::UUID IS NULL OR program_id = $2)
              AND ($3::UUID IS NULL OR academic_year_id = $3)
              AND ($4::INTEGER IS NULL OR level = $4)
              AND ($5::TEXT IS NULL OR status = $5)
              AND ($6::TEXT IS NULL OR payment_status = $6)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM enrollments{WHERE}"))
            .bind(filters.student_id)
            .bind(filters.program_id)
            .bind(filters.academic_year_id)
            .bind(filters.level)
            .bind(filters.status)
            .bind(filters.payment_status)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments{WHERE} ORDER BY enrolled_on DESC, created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.student_id)
        .bind(filters.program_id)
        .bind(filters.academic_year_id)
        .bind(filters.level)
        .bind(filters.status)
        .bind(filters.payment_status)
        .fetch_all(db)
        .await?;

        Ok(PaginatedEnrollmentsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: EnrollmentId) -> Result<Enrollment, AppError> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: EnrollmentId,
        dto: UpdateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        let existing = Self::get(db, id).await?;

        if let Some(level) = dto.level {
            let duration_years =
                sqlx::query_scalar::<_, i32>("SELECT duration_years FROM programs WHERE id = $1")
                    .bind(existing.program_id)
                    .fetch_one(db)
                    .await?;
            check_level(level, duration_years)?;
        }

        let fee = dto.registration_fee.unwrap_or(existing.registration_fee);
        let payment_status = PaymentStatus::from_amounts(fee, existing.amount_paid);

        sqlx::query_as::<_, Enrollment>(&format!(
            r#"UPDATE enrollments
               SET level = COALESCE($1, level),
                   status = COALESCE($2, status),
                   registration_fee = $3,
                   payment_status = $4,
                   notes = COALESCE($5, notes),
                   updated_at = NOW()
               WHERE id = $6
               RETURNING {ENROLLMENT_COLUMNS}"#
        ))
        .bind(dto.level)
        .bind(dto.status)
        .bind(fee)
        .bind(payment_status)
        .bind(&dto.notes)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Duplicate enrollment", "Invalid reference"))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: EnrollmentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(e, "Enrollment cannot be deleted", "Enrollment still has payments or invoices")
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Enrollment not found")));
        }
        Ok(())
    }

    /// Records a payment on the registration fee. The amount may not exceed what remains.
    #[instrument(skip(db))]
    pub async fn pay(db: &PgPool, id: EnrollmentId, amount: f64) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;

        let (fee, paid) = sqlx::query_as::<_, (f64, f64)>(
            "SELECT registration_fee, amount_paid FROM enrollments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        let remaining = remaining_amount(fee, paid);
        if amount > remaining {
            return Err(AppError::bad_request(anyhow!(
                "Amount {:.2} exceeds the remaining balance of {:.2}",
                amount,
                remaining
            )));
        }

        let enrollment = Self::credit(&mut tx, id, amount).await?;
        tx.commit().await?;
        Ok(enrollment)
    }

    /// Adds to `amount_paid` and recomputes the payment status.
    pub(crate) async fn credit(
        tx: &mut Transaction<'_, Postgres>,
        id: EnrollmentId,
        amount: f64,
    ) -> Result<Enrollment, AppError> {
        let (fee, paid) = sqlx::query_as::<_, (f64, f64)>(
            "SELECT registration_fee, amount_paid FROM enrollments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        let new_paid = campus_core::round2(paid + amount);
        let payment_status = PaymentStatus::from_amounts(fee, new_paid);

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            r#"UPDATE enrollments
               SET amount_paid = $1, payment_status = $2, updated_at = NOW()
               WHERE id = $3
               RETURNING {ENROLLMENT_COLUMNS}"#
        ))
        .bind(new_paid)
        .bind(payment_status)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<EnrollmentStatistics, AppError> {
        let (total, total_fees, total_collected, total_remaining) =
            sqlx::query_as::<_, (i64, f64, f64, f64)>(
                r#"SELECT COUNT(*),
                          COALESCE(SUM(registration_fee), 0),
                          COALESCE(SUM(amount_paid), 0),
                          COALESCE(SUM(remaining_amount), 0)
                   FROM enrollments"#,
            )
            .fetch_one(db)
            .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM enrollments GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        let by_payment_status = sqlx::query_as::<_, LabelCount>(
            r#"SELECT payment_status AS label, COUNT(*) AS count
               FROM enrollments GROUP BY payment_status ORDER BY payment_status"#,
        )
        .fetch_all(db)
        .await?;

        Ok(EnrollmentStatistics {
            total,
            by_status,
            by_payment_status,
            total_fees: campus_core::round2(total_fees),
            total_collected: campus_core::round2(total_collected),
            total_remaining: campus_core::round2(total_remaining),
        })
    }
}

fn check_level(level: i32, duration_years: i32) -> Result<(), AppError> {
    if level > duration_years {
        return Err(AppError::bad_request(anyhow!(
            "level {} exceeds the program duration of {} years",
            level,
            duration_years
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_within_program_duration() {
        assert!(check_level(3, 3).is_ok());
        assert_eq!(
            check_level(4, 3).unwrap_err().status,
            axum::http::StatusCode::BAD_REQUEST
        );
    }
}
