use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::ids::{AcademicYearId, DepartmentId, FacultyId, ProgramId, SubjectId};

use crate::modules::search_pattern;

use super::model::{
    AcademicYear, AcademicYearFilterParams, CreateAcademicYearDto, CreateDepartmentDto,
    CreateFacultyDto, CreateProgramDto, CreateSubjectDto, Department, DepartmentFilterParams,
    Faculty, FacultyFilterParams, FacultyStatistics, PaginatedAcademicYearsResponse,
    PaginatedDepartmentsResponse, PaginatedFacultiesResponse, PaginatedProgramsResponse,
    PaginatedSubjectsResponse, Program, ProgramFilterParams, Subject, SubjectDetail,
    SubjectFilterParams, UpdateAcademicYearDto, UpdateDepartmentDto, UpdateFacultyDto,
    UpdateProgramDto, UpdateSubjectDto, check_year_dates,
};

const YEAR_COLUMNS: &str = "id, code, start_date, end_date, is_active, created_at, updated_at";
const FACULTY_COLUMNS: &str =
    "id, code, name, description, dean, email, phone, created_at, updated_at";
const DEPARTMENT_COLUMNS: &str =
    "id, faculty_id, code, name, description, head, created_at, updated_at";
const PROGRAM_COLUMNS: &str = "id, department_id, code, name, cycle, duration_years, description, \
     registration_fee, is_active, created_at, updated_at";
const SUBJECT_COLUMNS: &str = "id, code, name, description, coefficient, credits, hours_lecture, \
     hours_tutorial, hours_practical, semester, is_optional, created_at, updated_at";

// =============================================================================
// Academic years
// =============================================================================

pub struct AcademicYearService;

impl AcademicYearService {
    /// Creating an active year deactivates every other year in the same transaction.
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateAcademicYearDto) -> Result<AcademicYear, AppError> {
        check_year_dates(dto.start_date, dto.end_date)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let mut tx = db.begin().await?;

        if dto.is_active {
            sqlx::query("UPDATE academic_years SET is_active = FALSE, updated_at = NOW() WHERE is_active")
                .execute(&mut *tx)
                .await?;
        }

        let year = sqlx::query_as::<_, AcademicYear>(&format!(
            r#"INSERT INTO academic_years (code, start_date, end_date, is_active)
               VALUES ($1, $2, $3, $4)
               RETURNING {YEAR_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(dto.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from_db(e, "An academic year with this code already exists", "Invalid reference")
        })?;

        tx.commit().await?;
        Ok(year)
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: AcademicYearFilterParams,
    ) -> Result<PaginatedAcademicYearsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
              AND ($2::TEXT IS NULL OR code ILIKE $2)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM academic_years{WHERE}"))
            .bind(filters.is_active)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, AcademicYear>(&format!(
            "SELECT {YEAR_COLUMNS} FROM academic_years{WHERE} ORDER BY start_date DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.is_active)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedAcademicYearsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: AcademicYearId) -> Result<AcademicYear, AppError> {
        sqlx::query_as::<_, AcademicYear>(&format!(
            "SELECT {YEAR_COLUMNS} FROM academic_years WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Academic year not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_active(db: &PgPool) -> Result<AcademicYear, AppError> {
        Self::find_active(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No active academic year")))
    }

    pub async fn find_active(db: &PgPool) -> Result<Option<AcademicYear>, AppError> {
        let year = sqlx::query_as::<_, AcademicYear>(&format!(
            "SELECT {YEAR_COLUMNS} FROM academic_years WHERE is_active"
        ))
        .fetch_optional(db)
        .await?;
        Ok(year)
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: AcademicYearId,
        dto: UpdateAcademicYearDto,
    ) -> Result<AcademicYear, AppError> {
        let existing = Self::get(db, id).await?;
        check_year_dates(
            dto.start_date.unwrap_or(existing.start_date),
            dto.end_date.unwrap_or(existing.end_date),
        )
        .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        sqlx::query_as::<_, AcademicYear>(&format!(
            r#"UPDATE academic_years
               SET code = COALESCE($1, code),
                   start_date = COALESCE($2, start_date),
                   end_date = COALESCE($3, end_date),
                   updated_at = NOW()
               WHERE id = $4
               RETURNING {YEAR_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "An academic year with this code already exists", "Invalid reference")
        })
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: AcademicYearId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM academic_years WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(
                    e,
                    "Academic year cannot be deleted",
                    "Academic year is still referenced by enrollments or fees",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Academic year not found")));
        }
        Ok(())
    }

    /// Deactivates every year, then activates this one, atomically.
    #[instrument(skip(db))]
    pub async fn activate(db: &PgPool, id: AcademicYearId) -> Result<AcademicYear, AppError> {
        let mut tx = db.begin().await?;

        sqlx::query(
            "UPDATE academic_years SET is_active = FALSE, updated_at = NOW() WHERE is_active AND id <> $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let year = sqlx::query_as::<_, AcademicYear>(&format!(
            r#"UPDATE academic_years SET is_active = TRUE, updated_at = NOW()
               WHERE id = $1
               RETURNING {YEAR_COLUMNS}"#
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Academic year not found")))?;

        tx.commit().await?;
        info!(code = %year.code, "Academic year activated");
        Ok(year)
    }

    #[instrument(skip(db))]
    pub async fn close(db: &PgPool, id: AcademicYearId) -> Result<AcademicYear, AppError> {
        sqlx::query_as::<_, AcademicYear>(&format!(
            r#"UPDATE academic_years SET is_active = FALSE, updated_at = NOW()
               WHERE id = $1
               RETURNING {YEAR_COLUMNS}"#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Academic year not found")))
    }
}

// =============================================================================
// Faculties
// =============================================================================

pub struct FacultyService;

impl FacultyService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateFacultyDto) -> Result<Faculty, AppError> {
        sqlx::query_as::<_, Faculty>(&format!(
            r#"INSERT INTO faculties (code, name, description, dean, email, phone)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {FACULTY_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.dean)
        .bind(&dto.email)
        .bind(&dto.phone)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "A faculty with this code already exists", "Invalid reference"))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: FacultyFilterParams,
    ) -> Result<PaginatedFacultiesResponse, AppError> {
        const WHERE: &str = " WHERE ($1::TEXT IS NULL OR code ILIKE $1 OR name ILIKE $1)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM faculties{WHERE}"))
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Faculty>(&format!(
            "SELECT {FACULTY_COLUMNS} FROM faculties{WHERE} ORDER BY name{}",
            filters.pagination.sql_suffix()
        ))
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedFacultiesResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: FacultyId) -> Result<Faculty, AppError> {
        sqlx::query_as::<_, Faculty>(&format!("SELECT {FACULTY_COLUMNS} FROM faculties WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Faculty not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: FacultyId,
        dto: UpdateFacultyDto,
    ) -> Result<Faculty, AppError> {
        sqlx::query_as::<_, Faculty>(&format!(
            r#"UPDATE faculties
               SET code = COALESCE($1, code),
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   dean = COALESCE($4, dean),
                   email = COALESCE($5, email),
                   phone = COALESCE($6, phone),
                   updated_at = NOW()
               WHERE id = $7
               RETURNING {FACULTY_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.dean)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::from_db(e, "A faculty with this code already exists", "Invalid reference"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Faculty not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: FacultyId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM faculties WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(
                    e,
                    "Faculty cannot be deleted",
                    "Faculty still has programs with enrollments",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Faculty not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn departments(db: &PgPool, id: FacultyId) -> Result<Vec<Department>, AppError> {
        Self::get(db, id).await?;
        let departments = sqlx::query_as::<_, Department>(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE faculty_id = $1 ORDER BY name"
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(departments)
    }

    /// Structure counts plus students currently enrolled in the active year.
    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool, id: FacultyId) -> Result<FacultyStatistics, AppError> {
        Self::get(db, id).await?;
        let stats = sqlx::query_as::<_, FacultyStatistics>(
            r#"SELECT
                (SELECT COUNT(*) FROM departments d WHERE d.faculty_id = $1) AS department_count,
                (SELECT COUNT(*) FROM programs p
                   INNER JOIN departments d ON d.id = p.department_id
                   WHERE d.faculty_id = $1) AS program_count,
                (SELECT COUNT(*) FROM teachers t
                   INNER JOIN departments d ON d.id = t.department_id
                   WHERE d.faculty_id = $1) AS teacher_count,
                (SELECT COUNT(DISTINCT e.student_id) FROM enrollments e
                   INNER JOIN programs p ON p.id = e.program_id
                   INNER JOIN departments d ON d.id = p.department_id
                   INNER JOIN academic_years ay ON ay.id = e.academic_year_id
                   WHERE d.faculty_id = $1 AND ay.is_active AND e.status = 'ENROLLED') AS enrolled_student_count"#,
        )
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(stats)
    }
}

// =============================================================================
// Departments
// =============================================================================

pub struct DepartmentService;

impl DepartmentService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateDepartmentDto) -> Result<Department, AppError> {
        sqlx::query_as::<_, Department>(&format!(
            r#"INSERT INTO departments (faculty_id, code, name, description, head)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {DEPARTMENT_COLUMNS}"#
        ))
        .bind(dto.faculty_id)
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.head)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A department with this code already exists", "Faculty does not exist")
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: DepartmentFilterParams,
    ) -> Result<PaginatedDepartmentsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR faculty_id = $1)
              AND ($2::TEXT IS NULL OR code ILIKE $2 OR name ILIKE $2)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM departments{WHERE}"))
            .bind(filters.faculty_id)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Department>(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments{WHERE} ORDER BY name{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.faculty_id)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedDepartmentsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: DepartmentId) -> Result<Department, AppError> {
        sqlx::query_as::<_, Department>(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Department not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: DepartmentId,
        dto: UpdateDepartmentDto,
    ) -> Result<Department, AppError> {
        sqlx::query_as::<_, Department>(&format!(
            r#"UPDATE departments
               SET faculty_id = COALESCE($1, faculty_id),
                   code = COALESCE($2, code),
                   name = COALESCE($3, name),
                   description = COALESCE($4, description),
                   head = COALESCE($5, head),
                   updated_at = NOW()
               WHERE id = $6
               RETURNING {DEPARTMENT_COLUMNS}"#
        ))
        .bind(dto.faculty_id)
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.head)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A department with this code already exists", "Faculty does not exist")
        })?
        .ok_or_else(|| AppError::not_found(anyhow!("Department not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: DepartmentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(
                    e,
                    "Department cannot be deleted",
                    "Department still has programs with enrollments",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Department not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn programs(db: &PgPool, id: DepartmentId) -> Result<Vec<Program>, AppError> {
        Self::get(db, id).await?;
        let programs = sqlx::query_as::<_, Program>(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs WHERE department_id = $1 ORDER BY name"
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(programs)
    }
}

// =============================================================================
// Programs
// =============================================================================

pub struct ProgramService;

impl ProgramService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateProgramDto) -> Result<Program, AppError> {
        sqlx::query_as::<_, Program>(&format!(
            r#"INSERT INTO programs
                (department_id, code, name, cycle, duration_years, description, registration_fee, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {PROGRAM_COLUMNS}"#
        ))
        .bind(dto.department_id)
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(dto.cycle)
        .bind(dto.duration_years)
        .bind(&dto.description)
        .bind(dto.registration_fee)
        .bind(dto.is_active)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A program with this code already exists", "Department does not exist")
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: ProgramFilterParams,
    ) -> Result<PaginatedProgramsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR department_id = $1)
              AND ($2::TEXT IS NULL OR cycle = $2)
              AND ($3::BOOLEAN IS NULL OR is_active = $3)
              AND ($4::TEXT IS NULL OR code ILIKE $4 OR name ILIKE $4)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM programs{WHERE}"))
            .bind(filters.department_id)
            .bind(filters.cycle)
            .bind(filters.is_active)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Program>(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs{WHERE} ORDER BY name{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.department_id)
        .bind(filters.cycle)
        .bind(filters.is_active)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedProgramsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: ProgramId) -> Result<Program, AppError> {
        sqlx::query_as::<_, Program>(&format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Program not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: ProgramId,
        dto: UpdateProgramDto,
    ) -> Result<Program, AppError> {
        sqlx::query_as::<_, Program>(&format!(
            r#"UPDATE programs
               SET department_id = COALESCE($1, department_id),
                   code = COALESCE($2, code),
                   name = COALESCE($3, name),
                   cycle = COALESCE($4, cycle),
                   duration_years = COALESCE($5, duration_years),
                   description = COALESCE($6, description),
                   registration_fee = COALESCE($7, registration_fee),
                   is_active = COALESCE($8, is_active),
                   updated_at = NOW()
               WHERE id = $9
               RETURNING {PROGRAM_COLUMNS}"#
        ))
        .bind(dto.department_id)
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(dto.cycle)
        .bind(dto.duration_years)
        .bind(&dto.description)
        .bind(dto.registration_fee)
        .bind(dto.is_active)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A program with this code already exists", "Department does not exist")
        })?
        .ok_or_else(|| AppError::not_found(anyhow!("Program not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: ProgramId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM programs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(e, "Program cannot be deleted", "Program still has enrollments")
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Program not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn subjects(db: &PgPool, id: ProgramId) -> Result<Vec<SubjectDetail>, AppError> {
        Self::get(db, id).await?;
        let subjects = sqlx::query_as::<_, Subject>(
            r#"SELECT s.id, s.code, s.name, s.description, s.coefficient, s.credits, s.hours_lecture,
                      s.hours_tutorial, s.hours_practical, s.semester, s.is_optional, s.created_at, s.updated_at
               FROM subjects s
               INNER JOIN program_subjects ps ON ps.subject_id = s.id
               WHERE ps.program_id = $1
               ORDER BY s.semester, s.code"#,
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        SubjectService::with_programs(db, subjects).await
    }

    /// Links a subject to the program. Linking twice is a no-op.
    #[instrument(skip(db))]
    pub async fn link_subject(
        db: &PgPool,
        id: ProgramId,
        subject_id: SubjectId,
    ) -> Result<Vec<SubjectDetail>, AppError> {
        Self::get(db, id).await?;
        SubjectService::get(db, subject_id).await?;

        sqlx::query(
            r#"INSERT INTO program_subjects (program_id, subject_id) VALUES ($1, $2)
               ON CONFLICT (program_id, subject_id) DO NOTHING"#,
        )
        .bind(id)
        .bind(subject_id)
        .execute(db)
        .await?;

        Self::subjects(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn unlink_subject(
        db: &PgPool,
        id: ProgramId,
        subject_id: SubjectId,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM program_subjects WHERE program_id = $1 AND subject_id = $2")
                .bind(id)
                .bind(subject_id)
                .execute(db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Subject is not linked to this program")));
        }
        Ok(())
    }
}

// =============================================================================
// Subjects
// =============================================================================

pub struct SubjectService;

impl SubjectService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateSubjectDto) -> Result<SubjectDetail, AppError> {
        let mut tx = db.begin().await?;

        let subject = sqlx::query_as::<_, Subject>(&format!(
            r#"INSERT INTO subjects
                (code, name, description, coefficient, credits, hours_lecture, hours_tutorial,
                 hours_practical, semester, is_optional)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING {SUBJECT_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.coefficient)
        .bind(dto.credits)
        .bind(dto.hours_lecture)
        .bind(dto.hours_tutorial)
        .bind(dto.hours_practical)
        .bind(dto.semester)
        .bind(dto.is_optional)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "A subject with this code already exists", "Invalid reference"))?;

        Self::set_programs(&mut tx, subject.id, &dto.program_ids).await?;
        tx.commit().await?;

        let program_ids = Self::program_ids(db, subject.id).await?;
        Ok(SubjectDetail::new(subject, program_ids))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: SubjectFilterParams,
    ) -> Result<PaginatedSubjectsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR EXISTS (
                SELECT 1 FROM program_subjects ps WHERE ps.subject_id = subjects.id AND ps.program_id = $1))
              AND ($2::INTEGER IS NULL OR semester = $2)
              AND ($3::BOOLEAN IS NULL OR is_optional = $3)
              AND ($4::TEXT IS NULL OR code ILIKE $4 OR name ILIKE $4)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM subjects{WHERE}"))
            .bind(filters.program_id)
            .bind(filters.semester)
            .bind(filters.is_optional)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let subjects = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects{WHERE} ORDER BY semester, code{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.program_id)
        .bind(filters.semester)
        .bind(filters.is_optional)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedSubjectsResponse {
            data: Self::with_programs(db, subjects).await?,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: SubjectId) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Subject not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_detail(db: &PgPool, id: SubjectId) -> Result<SubjectDetail, AppError> {
        let subject = Self::get(db, id).await?;
        let program_ids = Self::program_ids(db, id).await?;
        Ok(SubjectDetail::new(subject, program_ids))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: SubjectId,
        dto: UpdateSubjectDto,
    ) -> Result<SubjectDetail, AppError> {
        let mut tx = db.begin().await?;

        let subject = sqlx::query_as::<_, Subject>(&format!(
            r#"UPDATE subjects
               SET code = COALESCE($1, code),
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   coefficient = COALESCE($4, coefficient),
                   credits = COALESCE($5, credits),
                   hours_lecture = COALESCE($6, hours_lecture),
                   hours_tutorial = COALESCE($7, hours_tutorial),
                   hours_practical = COALESCE($8, hours_practical),
                   semester = COALESCE($9, semester),
                   is_optional = COALESCE($10, is_optional),
                   updated_at = NOW()
               WHERE id = $11
               RETURNING {SUBJECT_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.coefficient)
        .bind(dto.credits)
        .bind(dto.hours_lecture)
        .bind(dto.hours_tutorial)
        .bind(dto.hours_practical)
        .bind(dto.semester)
        .bind(dto.is_optional)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "A subject with this code already exists", "Invalid reference"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Subject not found")))?;

        if let Some(program_ids) = &dto.program_ids {
            sqlx::query("DELETE FROM program_subjects WHERE subject_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::set_programs(&mut tx, id, program_ids).await?;
        }
        tx.commit().await?;

        let program_ids = Self::program_ids(db, id).await?;
        Ok(SubjectDetail::new(subject, program_ids))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: SubjectId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(e, "Subject cannot be deleted", "Subject still has evaluations or results")
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Subject not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn by_semester(db: &PgPool, semester: i32) -> Result<Vec<SubjectDetail>, AppError> {
        if !(1..=2).contains(&semester) {
            return Err(AppError::bad_request(anyhow!("semester must be 1 or 2")));
        }

        let subjects = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE semester = $1 ORDER BY code"
        ))
        .bind(semester)
        .fetch_all(db)
        .await?;

        Self::with_programs(db, subjects).await
    }

    async fn program_ids(db: &PgPool, id: SubjectId) -> Result<Vec<ProgramId>, AppError> {
        let ids = sqlx::query_scalar::<_, ProgramId>(
            "SELECT program_id FROM program_subjects WHERE subject_id = $1",
        )
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(ids)
    }

    /// Attaches linked program ids to each subject with a single query.
    pub(crate) async fn with_programs(
        db: &PgPool,
        subjects: Vec<Subject>,
    ) -> Result<Vec<SubjectDetail>, AppError> {
        let ids: Vec<SubjectId> = subjects.iter().map(|s| s.id).collect();
        let links = sqlx::query_as::<_, (SubjectId, ProgramId)>(
            "SELECT subject_id, program_id FROM program_subjects WHERE subject_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(db)
        .await?;

        Ok(subjects
            .into_iter()
            .map(|subject| {
                let program_ids = links
                    .iter()
                    .filter(|(subject_id, _)| *subject_id == subject.id)
                    .map(|(_, program_id)| *program_id)
                    .collect();
                SubjectDetail::new(subject, program_ids)
            })
            .collect())
    }

    async fn set_programs(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: SubjectId,
        program_ids: &[ProgramId],
    ) -> Result<(), AppError> {
        if program_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"INSERT INTO program_subjects (program_id, subject_id)
               SELECT UNNEST($1::uuid[]), $2
               ON CONFLICT (program_id, subject_id) DO NOTHING"#,
        )
        .bind(program_ids)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::from_db(e, "Duplicate program link", "One or more programs do not exist"))?;

        Ok(())
    }
}
