use anyhow::anyhow;
use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::ids::{AcademicYearId, AssignmentId, TeacherId, UserId};
use campus_models::numbering::{TEACHER_PREFIX, registration_number, registration_stem};
use campus_models::{LabelCount, system_roles};

use crate::modules::search_pattern;
use crate::modules::sequence::next_in_series;
use crate::modules::users::service::UserService;

use super::model::{
    AssignmentFilterParams, CreateAssignmentDto, CreateTeacherDto, PaginatedAssignmentsResponse,
    PaginatedTeachersResponse, Teacher, TeacherFilterParams, TeacherStatistics,
    TeachingAssignment, UpdateAssignmentDto, UpdateTeacherDto, Workload,
};

const TEACHER_SELECT: &str = r#"SELECT t.id, t.user_id, u.first_name, u.last_name, u.email,
        t.department_id, t.registration_number, t.grade, t.specialty, t.date_of_birth, t.sex,
        t.phone, t.hired_on, t.status, t.created_at, t.updated_at
    FROM teachers t
    INNER JOIN users u ON u.id = t.user_id"#;

const ASSIGNMENT_COLUMNS: &str =
    "id, teacher_id, subject_id, academic_year_id, kind, assigned_hours, created_at, updated_at";

pub struct TeacherService;

impl TeacherService {
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create(db: &PgPool, dto: CreateTeacherDto) -> Result<Teacher, AppError> {
        let mut tx = db.begin().await?;

        let user_id = UserService::insert_account(
            &mut tx,
            &dto.first_name,
            &dto.last_name,
            &dto.email,
            &dto.password,
            system_roles::TEACHER,
        )
        .await?;

        let year = Utc::now().year();
        let stem = registration_stem(TEACHER_PREFIX, year);
        let sequence = next_in_series(&mut tx, "teachers", "registration_number", &stem).await?;
        let number = registration_number(TEACHER_PREFIX, year, sequence);

        let id = sqlx::query_scalar::<_, TeacherId>(
            r#"INSERT INTO teachers
                (user_id, department_id, registration_number, grade, specialty, date_of_birth, sex,
                 phone, hired_on)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(dto.department_id)
        .bind(&number)
        .bind(dto.grade)
        .bind(&dto.specialty)
        .bind(dto.date_of_birth)
        .bind(dto.sex)
        .bind(&dto.phone)
        .bind(dto.hired_on)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Registration number already taken", "Department does not exist"))?;

        tx.commit().await?;
        info!(registration_number = %number, "Teacher registered");

        Self::get(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: TeacherFilterParams,
    ) -> Result<PaginatedTeachersResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR t.department_id = $1)
              AND ($2::TEXT IS NULL OR t.grade = $2)
              AND ($3::TEXT IS NULL OR t.status = $3)
              AND ($4::TEXT IS NULL OR u.first_name ILIKE $4 OR u.last_name ILIKE $4
                    OR u.email ILIKE $4 OR t.registration_number ILIKE $4 OR t.specialty ILIKE $4)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM teachers t INNER JOIN users u ON u.id = t.user_id{WHERE}"
        ))
        .bind(filters.department_id)
        .bind(filters.grade)
        .bind(filters.status)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, Teacher>(&format!(
            "{TEACHER_SELECT}{WHERE} ORDER BY u.last_name, u.first_name{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.department_id)
        .bind(filters.grade)
        .bind(filters.status)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedTeachersResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: TeacherId) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(&format!("{TEACHER_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        id: TeacherId,
        dto: UpdateTeacherDto,
    ) -> Result<Teacher, AppError> {
        let mut tx = db.begin().await?;

        let user_id = sqlx::query_scalar::<_, UserId>(
            r#"UPDATE teachers
               SET department_id = COALESCE($1, department_id),
                   grade = COALESCE($2, grade),
                   specialty = COALESCE($3, specialty),
                   date_of_birth = COALESCE($4, date_of_birth),
                   sex = COALESCE($5, sex),
                   phone = COALESCE($6, phone),
                   hired_on = COALESCE($7, hired_on),
                   status = COALESCE($8, status),
                   updated_at = NOW()
               WHERE id = $9
               RETURNING user_id"#,
        )
        .bind(dto.department_id)
        .bind(dto.grade)
        .bind(&dto.specialty)
        .bind(dto.date_of_birth)
        .bind(dto.sex)
        .bind(&dto.phone)
        .bind(dto.hired_on)
        .bind(dto.status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Duplicate teacher", "Department does not exist"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))?;

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

    /// Removes the teacher together with the account; assignments cascade.
    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: TeacherId) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = (SELECT user_id FROM teachers WHERE id = $1)",
        )
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Teacher cannot be deleted", "Teacher is still scheduled for courses")
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Teacher not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn assignments(
        db: &PgPool,
        id: TeacherId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<Vec<TeachingAssignment>, AppError> {
        Self::get(db, id).await?;
        let assignments = sqlx::query_as::<_, TeachingAssignment>(&format!(
            r#"SELECT {ASSIGNMENT_COLUMNS} FROM teaching_assignments
               WHERE teacher_id = $1 AND ($2::UUID IS NULL OR academic_year_id = $2)
               ORDER BY created_at"#
        ))
        .bind(id)
        .bind(academic_year_id)
        .fetch_all(db)
        .await?;
        Ok(assignments)
    }

    #[instrument(skip(db))]
    pub async fn workload(
        db: &PgPool,
        id: TeacherId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<Workload, AppError> {
        let assignments = Self::assignments(db, id, academic_year_id).await?;
        Ok(Workload::from_assignments(id, academic_year_id, &assignments))
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<TeacherStatistics, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM teachers")
            .fetch_one(db)
            .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM teachers GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        let by_grade = sqlx::query_as::<_, LabelCount>(
            "SELECT grade AS label, COUNT(*) AS count FROM teachers GROUP BY grade ORDER BY grade",
        )
        .fetch_all(db)
        .await?;

        Ok(TeacherStatistics {
            total,
            by_status,
            by_grade,
        })
    }
}

pub struct AssignmentService;

impl AssignmentService {
    #[instrument(skip(db))]
    pub async fn create(
        db: &PgPool,
        dto: CreateAssignmentDto,
    ) -> Result<TeachingAssignment, AppError> {
        sqlx::query_as::<_, TeachingAssignment>(&format!(
            r#"INSERT INTO teaching_assignments
                (teacher_id, subject_id, academic_year_id, kind, assigned_hours)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {ASSIGNMENT_COLUMNS}"#
        ))
        .bind(dto.teacher_id)
        .bind(dto.subject_id)
        .bind(dto.academic_year_id)
        .bind(dto.kind)
        .bind(dto.assigned_hours)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "Teacher already has this assignment for the subject and year",
                "Teacher, subject or academic year does not exist",
            )
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: AssignmentFilterParams,
    ) -> Result<PaginatedAssignmentsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR teacher_id = $1)
              AND ($2::UUID IS NULL OR subject_id = $2)
              AND ($3::UUID IS NULL OR academic_year_id = $3)
              AND ($4::TEXT IS NULL OR kind = $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM teaching_assignments{WHERE}"
        ))
        .bind(filters.teacher_id)
        .bind(filters.subject_id)
        .bind(filters.academic_year_id)
        .bind(filters.kind)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, TeachingAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM teaching_assignments{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.teacher_id)
        .bind(filters.subject_id)
        .bind(filters.academic_year_id)
        .bind(filters.kind)
        .fetch_all(db)
        .await?;

        Ok(PaginatedAssignmentsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: AssignmentId) -> Result<TeachingAssignment, AppError> {
        sqlx::query_as::<_, TeachingAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM teaching_assignments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: AssignmentId,
        dto: UpdateAssignmentDto,
    ) -> Result<TeachingAssignment, AppError> {
        sqlx::query_as::<_, TeachingAssignment>(&format!(
            r#"UPDATE teaching_assignments
               SET kind = COALESCE($1, kind),
                   assigned_hours = COALESCE($2, assigned_hours),
                   updated_at = NOW()
               WHERE id = $3
               RETURNING {ASSIGNMENT_COLUMNS}"#
        ))
        .bind(dto.kind)
        .bind(dto.assigned_hours)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Teacher already has this assignment for the subject and year", "Invalid reference")
        })?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: AssignmentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teaching_assignments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Assignment not found")));
        }
        Ok(())
    }
}
