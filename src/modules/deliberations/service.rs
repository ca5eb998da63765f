use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::evaluations::competition_ranks;
use campus_models::ids::{DecisionId, DeliberationId, JuryMemberId, StudentId};

use super::model::{
    AddJuryMemberDto, CreateDeliberationDto, DEFAULT_CREDITS_REQUIRED, DecisionKind,
    DecisionStatistics, DecisionsResponse, DeliberationFilterParams, DeliberationSession,
    GenerateDecisionsDto, GenerateDecisionsResponse, JuryDecision, JuryMember,
    PaginatedDeliberationsResponse, SessionStatus, UpdateDecisionDto, UpdateDeliberationDto,
    credit_rate,
};

const SESSION_COLUMNS: &str = "id, academic_year_id, program_id, level, semester, date, location, \
     jury_president, minutes, status, created_at, updated_at";

const DECISION_COLUMNS: &str = "id, session_id, student_id, average, credits_earned, credits_required, \
     credit_rate, decision, mention, class_rank, observations, created_at, updated_at";

const JURY_COLUMNS: &str = "id, session_id, teacher_id, role, present, created_at";

pub struct DeliberationService;

impl DeliberationService {
    #[instrument(skip(db))]
    pub async fn create(
        db: &PgPool,
        dto: CreateDeliberationDto,
    ) -> Result<DeliberationSession, AppError> {
        sqlx::query_as::<_, DeliberationSession>(&format!(
            r#"INSERT INTO deliberation_sessions
                (academic_year_id, program_id, level, semester, date, location, jury_president)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {SESSION_COLUMNS}"#
        ))
        .bind(dto.academic_year_id)
        .bind(dto.program_id)
        .bind(dto.level)
        .bind(dto.semester)
        .bind(dto.date)
        .bind(&dto.location)
        .bind(&dto.jury_president)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "A session already exists for this year, program, level and semester",
                "Academic year or program does not exist",
            )
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: DeliberationFilterParams,
    ) -> Result<PaginatedDeliberationsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR academic_year_id = $1)
              AND ($2::UUID IS NULL OR program_id = $2)
              AND ($3::INTEGER IS NULL OR level = $3)
              AND ($4::TEXT IS NULL OR status = $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM deliberation_sessions{WHERE}"
        ))
        .bind(filters.academic_year_id)
        .bind(filters.program_id)
        .bind(filters.level)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, DeliberationSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM deliberation_sessions{WHERE} ORDER BY date DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.academic_year_id)
        .bind(filters.program_id)
        .bind(filters.level)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(PaginatedDeliberationsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: DeliberationId) -> Result<DeliberationSession, AppError> {
        sqlx::query_as::<_, DeliberationSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM deliberation_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Deliberation session not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: DeliberationId,
        dto: UpdateDeliberationDto,
    ) -> Result<DeliberationSession, AppError> {
        let session = Self::get(db, id).await?;
        ensure_not_validated(session.status)?;

        let updated = sqlx::query_as::<_, DeliberationSession>(&format!(
            r#"UPDATE deliberation_sessions
               SET date = COALESCE($1, date),
                   location = COALESCE($2, location),
                   jury_president = COALESCE($3, jury_president),
                   minutes = COALESCE($4, minutes),
                   updated_at = NOW()
               WHERE id = $5
               RETURNING {SESSION_COLUMNS}"#
        ))
        .bind(dto.date)
        .bind(&dto.location)
        .bind(&dto.jury_president)
        .bind(&dto.minutes)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(updated)
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: DeliberationId) -> Result<(), AppError> {
        let session = Self::get(db, id).await?;
        ensure_not_validated(session.status)?;

        sqlx::query("DELETE FROM deliberation_sessions WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Decisions ordered by class rank, with admission statistics.
    #[instrument(skip(db))]
    pub async fn decisions(
        db: &PgPool,
        id: DeliberationId,
    ) -> Result<DecisionsResponse, AppError> {
        Self::get(db, id).await?;

        let data = sqlx::query_as::<_, JuryDecision>(&format!(
            r#"SELECT {DECISION_COLUMNS} FROM jury_decisions
               WHERE session_id = $1
               ORDER BY class_rank NULLS LAST, average DESC"#
        ))
        .bind(id)
        .fetch_all(db)
        .await?;

        let statistics = DecisionStatistics::from_decisions(&data);
        Ok(DecisionsResponse { data, statistics })
    }

    /// Derives a decision for every enrolled student of the session's
    /// program, level and year who has results for the session semester.
    #[instrument(skip(db))]
    pub async fn generate_decisions(
        db: &PgPool,
        id: DeliberationId,
        dto: GenerateDecisionsDto,
    ) -> Result<GenerateDecisionsResponse, AppError> {
        let mut tx = db.begin().await?;

        let session = sqlx::query_as::<_, DeliberationSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM deliberation_sessions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Deliberation session not found")))?;
        ensure_not_validated(session.status)?;

        let aggregates = sqlx::query_as::<_, (StudentId, f64, i32)>(
            r#"SELECT e.student_id, AVG(r.average), SUM(r.credits_earned)::INTEGER
               FROM enrollments e
               INNER JOIN results r
                   ON r.student_id = e.student_id AND r.academic_year_id = e.academic_year_id
               INNER JOIN subjects s ON s.id = r.subject_id
               WHERE e.program_id = $1 AND e.level = $2 AND e.academic_year_id = $3
                 AND e.status = 'ENROLLED' AND s.semester = $4
               GROUP BY e.student_id"#,
        )
        .bind(session.program_id)
        .bind(session.level)
        .bind(session.academic_year_id)
        .bind(session.semester)
        .fetch_all(&mut *tx)
        .await?;

        let mut decisions = Vec::with_capacity(aggregates.len());
        for (student_id, average, credits_earned) in aggregates {
            let average = campus_core::round2(average);
            let kind =
                DecisionKind::from_average(average, dto.admission_threshold, dto.resit_threshold);

            let decision = sqlx::query_as::<_, JuryDecision>(&format!(
                r#"INSERT INTO jury_decisions
                    (session_id, student_id, average, credits_earned, credits_required, credit_rate,
                     decision, mention)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   ON CONFLICT (session_id, student_id) DO UPDATE
                   SET average = EXCLUDED.average,
                       credits_earned = EXCLUDED.credits_earned,
                       credits_required = EXCLUDED.credits_required,
                       credit_rate = EXCLUDED.credit_rate,
                       decision = EXCLUDED.decision,
                       mention = EXCLUDED.mention,
                       updated_at = NOW()
                   RETURNING {DECISION_COLUMNS}"#
            ))
            .bind(id)
            .bind(student_id)
            .bind(average)
            .bind(credits_earned)
            .bind(DEFAULT_CREDITS_REQUIRED)
            .bind(credit_rate(credits_earned, DEFAULT_CREDITS_REQUIRED))
            .bind(kind)
            .bind(kind.mention(average))
            .fetch_one(&mut *tx)
            .await?;

            decisions.push(decision);
        }

        decisions.sort_by(|a, b| b.average.total_cmp(&a.average));
        let averages: Vec<f64> = decisions.iter().map(|d| d.average).collect();
        for (decision, rank) in decisions.iter_mut().zip(competition_ranks(&averages)) {
            sqlx::query("UPDATE jury_decisions SET class_rank = $1 WHERE id = $2")
                .bind(rank)
                .bind(decision.id)
                .execute(&mut *tx)
                .await?;
            decision.class_rank = Some(rank);
        }

        if session.status == SessionStatus::Planned {
            sqlx::query(
                "UPDATE deliberation_sessions SET status = $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(SessionStatus::InProgress)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(session_id = %id, generated = decisions.len(), "Jury decisions generated");

        Ok(GenerateDecisionsResponse {
            generated: decisions.len() as i64,
            decisions,
        })
    }

    /// Jury override of a single decision. The mention follows the new decision.
    #[instrument(skip(db))]
    pub async fn update_decision(
        db: &PgPool,
        decision_id: DecisionId,
        dto: UpdateDecisionDto,
    ) -> Result<JuryDecision, AppError> {
        let (current, average, status) = sqlx::query_as::<_, (DecisionKind, f64, SessionStatus)>(
            r#"SELECT d.decision, d.average, s.status
               FROM jury_decisions d
               INNER JOIN deliberation_sessions s ON s.id = d.session_id
               WHERE d.id = $1"#,
        )
        .bind(decision_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Decision not found")))?;

        ensure_not_validated(status)?;

        let kind = dto.decision.unwrap_or(current);

        let decision = sqlx::query_as::<_, JuryDecision>(&format!(
            r#"UPDATE jury_decisions
               SET decision = $1,
                   mention = $2,
                   observations = COALESCE($3, observations),
                   updated_at = NOW()
               WHERE id = $4
               RETURNING {DECISION_COLUMNS}"#
        ))
        .bind(kind)
        .bind(kind.mention(average))
        .bind(&dto.observations)
        .bind(decision_id)
        .fetch_one(db)
        .await?;

        Ok(decision)
    }

    #[instrument(skip(db))]
    pub async fn close(db: &PgPool, id: DeliberationId) -> Result<DeliberationSession, AppError> {
        let session = Self::get(db, id).await?;
        let next = session
            .status
            .close()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        Self::set_status(db, id, next).await
    }

    /// Only a closed session can be validated; decisions are frozen afterwards.
    #[instrument(skip(db))]
    pub async fn validate(
        db: &PgPool,
        id: DeliberationId,
    ) -> Result<DeliberationSession, AppError> {
        let session = Self::get(db, id).await?;
        let next = session
            .status
            .validate_session()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        let session = Self::set_status(db, id, next).await?;
        info!(session_id = %id, "Deliberation session validated");
        Ok(session)
    }

    async fn set_status(
        db: &PgPool,
        id: DeliberationId,
        status: SessionStatus,
    ) -> Result<DeliberationSession, AppError> {
        let session = sqlx::query_as::<_, DeliberationSession>(&format!(
            r#"UPDATE deliberation_sessions SET status = $1, updated_at = NOW()
               WHERE id = $2
               RETURNING {SESSION_COLUMNS}"#
        ))
        .bind(status)
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn jury(db: &PgPool, id: DeliberationId) -> Result<Vec<JuryMember>, AppError> {
        Self::get(db, id).await?;
        let members = sqlx::query_as::<_, JuryMember>(&format!(
            "SELECT {JURY_COLUMNS} FROM jury_members WHERE session_id = $1 ORDER BY role, created_at"
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(members)
    }

    #[instrument(skip(db))]
    pub async fn add_jury_member(
        db: &PgPool,
        id: DeliberationId,
        dto: AddJuryMemberDto,
    ) -> Result<JuryMember, AppError> {
        Self::get(db, id).await?;
        sqlx::query_as::<_, JuryMember>(&format!(
            r#"INSERT INTO jury_members (session_id, teacher_id, role, present)
               VALUES ($1, $2, $3, $4)
               RETURNING {JURY_COLUMNS}"#
        ))
        .bind(id)
        .bind(dto.teacher_id)
        .bind(dto.role)
        .bind(dto.present)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Teacher is already on this jury", "Teacher does not exist")
        })
    }

    #[instrument(skip(db))]
    pub async fn remove_jury_member(
        db: &PgPool,
        id: DeliberationId,
        member_id: JuryMemberId,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM jury_members WHERE id = $1 AND session_id = $2")
            .bind(member_id)
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Jury member not found")));
        }
        Ok(())
    }
}

fn ensure_not_validated(status: SessionStatus) -> Result<(), AppError> {
    if status.is_validated() {
        return Err(AppError::bad_request(anyhow!(
            "The session has been validated and can no longer change"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_sessions_are_frozen() {
        assert!(ensure_not_validated(SessionStatus::Closed).is_ok());
        assert!(ensure_not_validated(SessionStatus::Validated).is_err());
    }
}
