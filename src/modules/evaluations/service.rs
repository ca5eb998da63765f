use anyhow::anyhow;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument, warn};

use campus_core::{AppError, PaginationParams};
use campus_models::LabelCount;
use campus_models::ids::{
    AcademicYearId, EvaluationId, EvaluationTypeId, GradeId, ResultId, StudentId, SubjectId,
};

use crate::metrics;
use crate::modules::search_pattern;

use super::model::{
    BulkGradeDto, BulkGradeError, BulkGradeResponse, ComputeSubjectResultsResponse,
    CreateEvaluationDto, CreateEvaluationTypeDto, CreateGradeDto, DuplicateEvaluationDto,
    Evaluation, EvaluationFilterParams, EvaluationStatistics, EvaluationType, Grade,
    GradeFilterParams, Mention, PaginatedEvaluationTypesResponse, PaginatedEvaluationsResponse,
    PaginatedGradesResponse, PaginatedResultsResponse, ResultFilterParams, ResultStatistics,
    ResultStatisticsParams, ResultStatus, SubjectResult, Transcript, UpdateEvaluationDto,
    UpdateEvaluationTypeDto, UpdateGradeDto, appreciation, check_coefficient_range, check_grade,
    competition_ranks, score_over_20, weighted_average,
};

const TYPE_COLUMNS: &str =
    "id, code, name, min_coefficient, max_coefficient, description, created_at, updated_at";

const EVALUATION_COLUMNS: &str = "id, subject_id, evaluation_type_id, academic_year_id, title, date, \
     coefficient, max_score, duration_minutes, description, created_at, updated_at";

const GRADE_COLUMNS: &str = "id, evaluation_id, student_id, score, out_of, score_over_20, remarks, \
     is_absent, created_at, updated_at";

const RESULT_COLUMNS: &str = "id, student_id, subject_id, academic_year_id, average, credits_earned, \
     mention, status, rank, created_at, updated_at";

// =============================================================================
// Evaluation types
// =============================================================================

pub struct EvaluationTypeService;

impl EvaluationTypeService {
    #[instrument(skip(db))]
    pub async fn create(
        db: &PgPool,
        dto: CreateEvaluationTypeDto,
    ) -> Result<EvaluationType, AppError> {
        check_coefficient_range(dto.min_coefficient, dto.max_coefficient)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        sqlx::query_as::<_, EvaluationType>(&format!(
            r#"INSERT INTO evaluation_types (code, name, min_coefficient, max_coefficient, description)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {TYPE_COLUMNS}"#
        ))
        .bind(dto.code)
        .bind(&dto.name)
        .bind(dto.min_coefficient)
        .bind(dto.max_coefficient)
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "An evaluation type with this code already exists", "Invalid reference")
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        pagination: PaginationParams,
    ) -> Result<PaginatedEvaluationTypesResponse, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM evaluation_types")
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, EvaluationType>(&format!(
            "SELECT {TYPE_COLUMNS} FROM evaluation_types ORDER BY code{}",
            pagination.sql_suffix()
        ))
        .fetch_all(db)
        .await?;

        Ok(PaginatedEvaluationTypesResponse {
            data,
            meta: pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: EvaluationTypeId) -> Result<EvaluationType, AppError> {
        sqlx::query_as::<_, EvaluationType>(&format!(
            "SELECT {TYPE_COLUMNS} FROM evaluation_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Evaluation type not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: EvaluationTypeId,
        dto: UpdateEvaluationTypeDto,
    ) -> Result<EvaluationType, AppError> {
        let existing = Self::get(db, id).await?;
        let min = dto.min_coefficient.unwrap_or(existing.min_coefficient);
        let max = dto.max_coefficient.unwrap_or(existing.max_coefficient);
        check_coefficient_range(min, max).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let updated = sqlx::query_as::<_, EvaluationType>(&format!(
            r#"UPDATE evaluation_types
               SET name = COALESCE($1, name),
                   min_coefficient = $2,
                   max_coefficient = $3,
                   description = COALESCE($4, description),
                   updated_at = NOW()
               WHERE id = $5
               RETURNING {TYPE_COLUMNS}"#
        ))
        .bind(&dto.name)
        .bind(min)
        .bind(max)
        .bind(&dto.description)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(updated)
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: EvaluationTypeId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM evaluation_types WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(e, "Evaluation type cannot be deleted", "Evaluation type is still used by evaluations")
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Evaluation type not found")));
        }
        Ok(())
    }

    /// 400 unless the coefficient lies within the type's range.
    async fn check_coefficient(
        db: &PgPool,
        type_id: EvaluationTypeId,
        coefficient: f64,
    ) -> Result<(), AppError> {
        let evaluation_type = Self::get(db, type_id).await.map_err(|e| {
            if e.status == axum::http::StatusCode::NOT_FOUND {
                AppError::bad_request(anyhow!("Evaluation type does not exist"))
            } else {
                e
            }
        })?;

        if !evaluation_type.allows_coefficient(coefficient) {
            return Err(AppError::bad_request(anyhow!(
                "coefficient must be between {} and {} for {} evaluations",
                evaluation_type.min_coefficient,
                evaluation_type.max_coefficient,
                evaluation_type.code
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Evaluations
// =============================================================================

pub struct EvaluationService;

impl EvaluationService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateEvaluationDto) -> Result<Evaluation, AppError> {
        EvaluationTypeService::check_coefficient(db, dto.evaluation_type_id, dto.coefficient)
            .await?;

        sqlx::query_as::<_, Evaluation>(&format!(
            r#"INSERT INTO evaluations
                (subject_id, evaluation_type_id, academic_year_id, title, date, coefficient, max_score,
                 duration_minutes, description)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {EVALUATION_COLUMNS}"#
        ))
        .bind(dto.subject_id)
        .bind(dto.evaluation_type_id)
        .bind(dto.academic_year_id)
        .bind(&dto.title)
        .bind(dto.date)
        .bind(dto.coefficient)
        .bind(dto.max_score)
        .bind(dto.duration_minutes)
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "An evaluation with this title already exists for the subject and year",
                "Subject or academic year does not exist",
            )
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: EvaluationFilterParams,
    ) -> Result<PaginatedEvaluationsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR subject_id = $1)
              AND ($2::UUID IS NULL OR evaluation_type_id = $2)
              AND ($3::UUID IS NULL OR academic_year_id = $3)
              AND ($4::TEXT IS NULL OR title ILIKE $4)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM evaluations{WHERE}"))
            .bind(filters.subject_id)
            .bind(filters.evaluation_type_id)
            .bind(filters.academic_year_id)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Evaluation>(&format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluations{WHERE} ORDER BY date DESC, title{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.subject_id)
        .bind(filters.evaluation_type_id)
        .bind(filters.academic_year_id)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedEvaluationsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: EvaluationId) -> Result<Evaluation, AppError> {
        sqlx::query_as::<_, Evaluation>(&format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Evaluation not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: EvaluationId,
        dto: UpdateEvaluationDto,
    ) -> Result<Evaluation, AppError> {
        let existing = Self::get(db, id).await?;

        if dto.evaluation_type_id.is_some() || dto.coefficient.is_some() {
            EvaluationTypeService::check_coefficient(
                db,
                dto.evaluation_type_id.unwrap_or(existing.evaluation_type_id),
                dto.coefficient.unwrap_or(existing.coefficient),
            )
            .await?;
        }

        sqlx::query_as::<_, Evaluation>(&format!(
            r#"UPDATE evaluations
               SET evaluation_type_id = COALESCE($1, evaluation_type_id),
                   title = COALESCE($2, title),
                   date = COALESCE($3, date),
                   coefficient = COALESCE($4, coefficient),
                   max_score = COALESCE($5, max_score),
                   duration_minutes = COALESCE($6, duration_minutes),
                   description = COALESCE($7, description),
                   updated_at = NOW()
               WHERE id = $8
               RETURNING {EVALUATION_COLUMNS}"#
        ))
        .bind(dto.evaluation_type_id)
        .bind(&dto.title)
        .bind(dto.date)
        .bind(dto.coefficient)
        .bind(dto.max_score)
        .bind(dto.duration_minutes)
        .bind(&dto.description)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "An evaluation with this title already exists for the subject and year",
                "Invalid reference",
            )
        })
    }

    /// Grades of the evaluation cascade.
    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: EvaluationId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM evaluations WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Evaluation not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn grades(db: &PgPool, id: EvaluationId) -> Result<Vec<Grade>, AppError> {
        Self::get(db, id).await?;
        let grades = sqlx::query_as::<_, Grade>(
            r#"SELECT g.id, g.evaluation_id, g.student_id, g.score, g.out_of, g.score_over_20,
                      g.remarks, g.is_absent, g.created_at, g.updated_at
               FROM grades g
               INNER JOIN students s ON s.id = g.student_id
               INNER JOIN users u ON u.id = s.user_id
               WHERE g.evaluation_id = $1
               ORDER BY u.last_name, u.first_name"#,
        )
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(grades)
    }

    #[instrument(skip(db))]
    pub async fn statistics(
        db: &PgPool,
        id: EvaluationId,
    ) -> Result<EvaluationStatistics, AppError> {
        Self::get(db, id).await?;

        let rows = sqlx::query_as::<_, (f64, bool)>(
            "SELECT score_over_20, is_absent FROM grades WHERE evaluation_id = $1",
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        let present: Vec<f64> = rows
            .iter()
            .filter(|(_, absent)| !absent)
            .map(|(score, _)| *score)
            .collect();
        let absent_count = (rows.len() - present.len()) as i64;

        Ok(EvaluationStatistics::compute(id, &present, absent_count))
    }

    /// Copies an evaluation under a new title and date, without grades.
    #[instrument(skip(db))]
    pub async fn duplicate(
        db: &PgPool,
        id: EvaluationId,
        dto: DuplicateEvaluationDto,
    ) -> Result<Evaluation, AppError> {
        let source = Self::get(db, id).await?;

        sqlx::query_as::<_, Evaluation>(&format!(
            r#"INSERT INTO evaluations
                (subject_id, evaluation_type_id, academic_year_id, title, date, coefficient, max_score,
                 duration_minutes, description)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {EVALUATION_COLUMNS}"#
        ))
        .bind(source.subject_id)
        .bind(source.evaluation_type_id)
        .bind(source.academic_year_id)
        .bind(&dto.title)
        .bind(dto.date)
        .bind(source.coefficient)
        .bind(source.max_score)
        .bind(source.duration_minutes)
        .bind(&source.description)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "An evaluation with this title already exists for the subject and year",
                "Invalid reference",
            )
        })
    }
}

// =============================================================================
// Grades
// =============================================================================

pub struct GradeService;

impl GradeService {
    /// `out_of` defaults to the evaluation's max score and the remark to the appreciation.
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateGradeDto) -> Result<Grade, AppError> {
        let evaluation = EvaluationService::get(db, dto.evaluation_id).await?;
        let out_of = dto.out_of.unwrap_or(evaluation.max_score);
        check_grade(dto.score, out_of, dto.is_absent)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let normalized = score_over_20(dto.score, out_of, dto.is_absent);
        let remarks = dto
            .remarks
            .unwrap_or_else(|| appreciation(normalized, dto.is_absent).to_string());

        let grade = sqlx::query_as::<_, Grade>(&format!(
            r#"INSERT INTO grades (evaluation_id, student_id, score, out_of, score_over_20, remarks, is_absent)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {GRADE_COLUMNS}"#
        ))
        .bind(dto.evaluation_id)
        .bind(dto.student_id)
        .bind(if dto.is_absent { None } else { dto.score })
        .bind(out_of)
        .bind(normalized)
        .bind(&remarks)
        .bind(dto.is_absent)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "The student already has a grade for this evaluation",
                "Student does not exist",
            )
        })?;

        metrics::track_grades_entered(1);
        Ok(grade)
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: GradeFilterParams,
    ) -> Result<PaginatedGradesResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR evaluation_id = $1)
              AND ($2::UUID IS NULL OR student_id = $2)
              AND ($3::BOOLEAN IS NULL OR is_absent = $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM grades{WHERE}"))
            .bind(filters.evaluation_id)
            .bind(filters.student_id)
            .bind(filters.is_absent)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.evaluation_id)
        .bind(filters.student_id)
        .bind(filters.is_absent)
        .fetch_all(db)
        .await?;

        Ok(PaginatedGradesResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: GradeId) -> Result<Grade, AppError> {
        sqlx::query_as::<_, Grade>(&format!("SELECT {GRADE_COLUMNS} FROM grades WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Grade not found")))
    }

    /// Re-normalizes the score; the remark is regenerated unless one is supplied.
    #[instrument(skip(db))]
    pub async fn update(db: &PgPool, id: GradeId, dto: UpdateGradeDto) -> Result<Grade, AppError> {
        let existing = Self::get(db, id).await?;

        let is_absent = dto.is_absent.unwrap_or(existing.is_absent);
        let out_of = dto.out_of.unwrap_or(existing.out_of);
        let score = if is_absent {
            None
        } else {
            dto.score.or(existing.score)
        };
        check_grade(score, out_of, is_absent).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let normalized = score_over_20(score, out_of, is_absent);
        let remarks = dto
            .remarks
            .unwrap_or_else(|| appreciation(normalized, is_absent).to_string());

        let grade = sqlx::query_as::<_, Grade>(&format!(
            r#"UPDATE grades
               SET score = $1, out_of = $2, score_over_20 = $3, remarks = $4, is_absent = $5,
                   updated_at = NOW()
               WHERE id = $6
               RETURNING {GRADE_COLUMNS}"#
        ))
        .bind(score)
        .bind(out_of)
        .bind(normalized)
        .bind(&remarks)
        .bind(is_absent)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(grade)
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: GradeId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM grades WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Grade not found")));
        }
        Ok(())
    }

    /// Upserts every entry on the evaluation's scale. Invalid entries are
    /// reported per student and do not stop the others.
    #[instrument(skip(db, dto), fields(evaluation_id = %dto.evaluation_id, entries = dto.grades.len()))]
    pub async fn bulk(db: &PgPool, dto: BulkGradeDto) -> Result<BulkGradeResponse, AppError> {
        let evaluation = EvaluationService::get(db, dto.evaluation_id).await?;
        let out_of = evaluation.max_score;
        let mut response = BulkGradeResponse::default();

        for entry in dto.grades {
            if let Err(error) = check_grade(entry.score, out_of, entry.is_absent) {
                response.errors.push(BulkGradeError {
                    student_id: entry.student_id,
                    error,
                });
                continue;
            }

            let normalized = score_over_20(entry.score, out_of, entry.is_absent);
            let remarks = entry
                .remarks
                .unwrap_or_else(|| appreciation(normalized, entry.is_absent).to_string());

            let inserted = sqlx::query_scalar::<_, bool>(
                r#"INSERT INTO grades (evaluation_id, student_id, score, out_of, score_over_20, remarks, is_absent)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)
                   ON CONFLICT (evaluation_id, student_id) DO UPDATE
                   SET score = EXCLUDED.score,
                       out_of = EXCLUDED.out_of,
                       score_over_20 = EXCLUDED.score_over_20,
                       remarks = EXCLUDED.remarks,
                       is_absent = EXCLUDED.is_absent,
                       updated_at = NOW()
                   RETURNING (xmax = 0)"#,
            )
            .bind(evaluation.id)
            .bind(entry.student_id)
            .bind(if entry.is_absent { None } else { entry.score })
            .bind(out_of)
            .bind(normalized)
            .bind(&remarks)
            .bind(entry.is_absent)
            .fetch_one(db)
            .await;

            match inserted {
                Ok(true) => response.created += 1,
                Ok(false) => response.updated += 1,
                Err(e) => {
                    warn!(student_id = %entry.student_id, error = %e, "Bulk grade entry rejected");
                    let error = AppError::from_db(e, "Duplicate grade", "Student does not exist");
                    response.errors.push(BulkGradeError {
                        student_id: entry.student_id,
                        error: error.error.to_string(),
                    });
                }
            }
        }

        metrics::track_grades_entered((response.created + response.updated) as usize);
        info!(
            created = response.created,
            updated = response.updated,
            errors = response.errors.len(),
            "Bulk grades saved"
        );
        Ok(response)
    }

    #[instrument(skip(db))]
    pub async fn by_student(
        db: &PgPool,
        student_id: StudentId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<Vec<Grade>, AppError> {
        let grades = sqlx::query_as::<_, Grade>(
            r#"SELECT g.id, g.evaluation_id, g.student_id, g.score, g.out_of, g.score_over_20,
                      g.remarks, g.is_absent, g.created_at, g.updated_at
               FROM grades g
               INNER JOIN evaluations e ON e.id = g.evaluation_id
               WHERE g.student_id = $1 AND ($2::UUID IS NULL OR e.academic_year_id = $2)
               ORDER BY e.date, e.title"#,
        )
        .bind(student_id)
        .bind(academic_year_id)
        .fetch_all(db)
        .await?;
        Ok(grades)
    }
}

// =============================================================================
// Results
// =============================================================================

pub struct ResultService;

impl ResultService {
    /// Computes and upserts one student's result for a subject and year.
    #[instrument(skip(db))]
    pub async fn compute(
        db: &PgPool,
        student_id: StudentId,
        subject_id: SubjectId,
        academic_year_id: AcademicYearId,
    ) -> Result<SubjectResult, AppError> {
        let credits = subject_credits(db, subject_id).await?;

        let mut tx = db.begin().await?;
        let result =
            upsert_result(&mut tx, student_id, subject_id, academic_year_id, credits).await?;
        tx.commit().await?;

        metrics::track_results_computed(1);
        Ok(result)
    }

    /// Computes the result of every graded student, then ranks them.
    #[instrument(skip(db))]
    pub async fn compute_subject(
        db: &PgPool,
        subject_id: SubjectId,
        academic_year_id: AcademicYearId,
    ) -> Result<ComputeSubjectResultsResponse, AppError> {
        let credits = subject_credits(db, subject_id).await?;

        let mut tx = db.begin().await?;

        let student_ids = sqlx::query_scalar::<_, StudentId>(
            r#"SELECT DISTINCT g.student_id
               FROM grades g
               INNER JOIN evaluations e ON e.id = g.evaluation_id
               WHERE e.subject_id = $1 AND e.academic_year_id = $2"#,
        )
        .bind(subject_id)
        .bind(academic_year_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut results = Vec::with_capacity(student_ids.len());
        for student_id in student_ids {
            results.push(
                upsert_result(&mut tx, student_id, subject_id, academic_year_id, credits).await?,
            );
        }

        results.sort_by(|a, b| b.average.total_cmp(&a.average));
        let averages: Vec<f64> = results.iter().map(|r| r.average).collect();
        for (result, rank) in results.iter_mut().zip(competition_ranks(&averages)) {
            sqlx::query("UPDATE results SET rank = $1, updated_at = NOW() WHERE id = $2")
                .bind(rank)
                .bind(result.id)
                .execute(&mut *tx)
                .await?;
            result.rank = Some(rank);
        }

        tx.commit().await?;

        metrics::track_results_computed(results.len());
        info!(computed = results.len(), "Subject results computed");

        Ok(ComputeSubjectResultsResponse {
            computed: results.len() as i64,
            results,
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: ResultFilterParams,
    ) -> Result<PaginatedResultsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR student_id = $1)
              AND ($2::UUID IS NULL OR subject_id = $2)
              AND ($3::UUID IS NULL OR academic_year_id = $3)
              AND ($4::TEXT IS NULL OR status = $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM results{WHERE}"))
            .bind(filters.student_id)
            .bind(filters.subject_id)
            .bind(filters.academic_year_id)
            .bind(filters.status)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, SubjectResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results{WHERE} ORDER BY average DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.student_id)
        .bind(filters.subject_id)
        .bind(filters.academic_year_id)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(PaginatedResultsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: ResultId) -> Result<SubjectResult, AppError> {
        sqlx::query_as::<_, SubjectResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Result not found")))
    }

    #[instrument(skip(db))]
    pub async fn transcript(
        db: &PgPool,
        student_id: StudentId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<Transcript, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)")
            .bind(student_id)
            .fetch_one(db)
            .await?;
        if !exists {
            return Err(AppError::not_found(anyhow!("Student not found")));
        }

        let results = Self::for_student(db, student_id, academic_year_id).await?;
        Ok(Transcript::new(student_id, academic_year_id, results))
    }

    /// A student's results ordered by semester and subject code.
    pub(crate) async fn for_student(
        db: &PgPool,
        student_id: StudentId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<Vec<SubjectResult>, AppError> {
        let results = sqlx::query_as::<_, SubjectResult>(
            r#"SELECT r.id, r.student_id, r.subject_id, r.academic_year_id, r.average,
                      r.credits_earned, r.mention, r.status, r.rank, r.created_at, r.updated_at
               FROM results r
               INNER JOIN subjects s ON s.id = r.subject_id
               WHERE r.student_id = $1 AND ($2::UUID IS NULL OR r.academic_year_id = $2)
               ORDER BY s.semester, s.code"#,
        )
        .bind(student_id)
        .bind(academic_year_id)
        .fetch_all(db)
        .await?;
        Ok(results)
    }

    #[instrument(skip(db))]
    pub async fn statistics(
        db: &PgPool,
        params: ResultStatisticsParams,
    ) -> Result<ResultStatistics, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR academic_year_id = $1)
              AND ($2::UUID IS NULL OR subject_id = $2)";

        let (total, average) = sqlx::query_as::<_, (i64, Option<f64>)>(&format!(
            "SELECT COUNT(*), AVG(average) FROM results{WHERE}"
        ))
        .bind(params.academic_year_id)
        .bind(params.subject_id)
        .fetch_one(db)
        .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(&format!(
            "SELECT status AS label, COUNT(*) AS count FROM results{WHERE} GROUP BY status ORDER BY status"
        ))
        .bind(params.academic_year_id)
        .bind(params.subject_id)
        .fetch_all(db)
        .await?;

        let by_mention = sqlx::query_as::<_, LabelCount>(&format!(
            r#"SELECT mention AS label, COUNT(*) AS count FROM results{WHERE}
               AND mention IS NOT NULL GROUP BY mention ORDER BY mention"#
        ))
        .bind(params.academic_year_id)
        .bind(params.subject_id)
        .fetch_all(db)
        .await?;

        Ok(ResultStatistics {
            total,
            by_status,
            by_mention,
            average: average.map(campus_core::round2),
        })
    }
}

async fn subject_credits(db: &PgPool, subject_id: SubjectId) -> Result<i32, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT credits FROM subjects WHERE id = $1")
        .bind(subject_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Subject not found")))
}

/// Averages the student's present grades for the subject and year and stores the result.
async fn upsert_result(
    tx: &mut Transaction<'_, Postgres>,
    student_id: StudentId,
    subject_id: SubjectId,
    academic_year_id: AcademicYearId,
    subject_credits: i32,
) -> Result<SubjectResult, AppError> {
    let scores = sqlx::query_as::<_, (f64, f64)>(
        r#"SELECT g.score_over_20, e.coefficient
           FROM grades g
           INNER JOIN evaluations e ON e.id = g.evaluation_id
           WHERE g.student_id = $1 AND e.subject_id = $2 AND e.academic_year_id = $3
             AND NOT g.is_absent"#,
    )
    .bind(student_id)
    .bind(subject_id)
    .bind(academic_year_id)
    .fetch_all(&mut **tx)
    .await?;

    let average = weighted_average(&scores);
    let status = ResultStatus::from_average(average);
    let mention = Mention::from_average(average);

    let result = sqlx::query_as::<_, SubjectResult>(&format!(
        r#"INSERT INTO results (student_id, subject_id, academic_year_id, average, credits_earned, mention, status)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (student_id, subject_id, academic_year_id) DO UPDATE
           SET average = EXCLUDED.average,
               credits_earned = EXCLUDED.credits_earned,
               mention = EXCLUDED.mention,
               status = EXCLUDED.status,
               updated_at = NOW()
           RETURNING {RESULT_COLUMNS}"#
    ))
    .bind(student_id)
    .bind(subject_id)
    .bind(academic_year_id)
    .bind(average)
    .bind(status.credits_earned(subject_credits))
    .bind(mention)
    .bind(status)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::from_db(e, "Duplicate result", "Student or academic year does not exist"))?;

    Ok(result)
}
