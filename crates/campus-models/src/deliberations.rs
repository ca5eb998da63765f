//! Deliberation sessions, their jury and the decisions they take.

use crate::enums::define_enum;
use crate::evaluations::{Mention, PASS_MARK, RESIT_MARK};
use crate::ids::{
    AcademicYearId, DecisionId, DeliberationId, JuryMemberId, ProgramId, StudentId, TeacherId,
};
use campus_core::serde::{deserialize_optional_from_str, deserialize_optional_i32};
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

pub const DEFAULT_CREDITS_REQUIRED: i32 = 60;

define_enum!(
    SessionStatus {
        Planned => "PLANNED",
        InProgress => "IN_PROGRESS",
        Closed => "CLOSED",
        Validated => "VALIDATED",
    }
);

impl SessionStatus {
    pub fn is_validated(&self) -> bool {
        matches!(self, SessionStatus::Validated)
    }

    /// Status after closing, or why the session cannot be closed.
    pub fn close(self) -> Result<SessionStatus, &'static str> {
        match self {
            SessionStatus::Validated => Err("A validated session cannot be closed"),
            _ => Ok(SessionStatus::Closed),
        }
    }

    pub fn validate_session(self) -> Result<SessionStatus, &'static str> {
        match self {
            SessionStatus::Closed => Ok(SessionStatus::Validated),
            _ => Err("Only a closed session can be validated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DeliberationSession {
    pub id: DeliberationId,
    pub academic_year_id: AcademicYearId,
    pub program_id: ProgramId,
    pub level: i32,
    pub semester: i32,
    pub date: NaiveDate,
    pub location: Option<String>,
    pub jury_president: Option<String>,
    pub minutes: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDeliberationDto {
    pub academic_year_id: AcademicYearId,
    pub program_id: ProgramId,
    #[validate(range(min = 1, max = 8, message = "level must be between 1 and 8"))]
    pub level: i32,
    #[validate(range(min = 1, max = 2, message = "semester must be 1 or 2"))]
    pub semester: i32,
    pub date: NaiveDate,
    pub location: Option<String>,
    pub jury_president: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliberationDto {
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub jury_president: Option<String>,
    pub minutes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliberationFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub program_id: Option<ProgramId>,
    #[serde(default, deserialize_with = "deserialize_optional_i32")]
    pub level: Option<i32>,
    pub status: Option<SessionStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedDeliberationsResponse {
    pub data: Vec<DeliberationSession>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Jury
// =============================================================================

define_enum!(
    JuryRole {
        President => "PRESIDENT",
        Member => "MEMBER",
        Secretary => "SECRETARY",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct JuryMember {
    pub id: JuryMemberId,
    pub session_id: DeliberationId,
    pub teacher_id: TeacherId,
    pub role: JuryRole,
    pub present: bool,
    pub created_at: DateTime<Utc>,
}

fn default_jury_role() -> JuryRole {
    JuryRole::Member
}

fn default_present() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddJuryMemberDto {
    pub teacher_id: TeacherId,
    #[serde(default = "default_jury_role")]
    pub role: JuryRole,
    #[serde(default = "default_present")]
    pub present: bool,
}

// =============================================================================
// Decisions
// =============================================================================

define_enum!(
    DecisionKind {
        Admitted => "ADMITTED",
        AdmittedWithReservation => "ADMITTED_WITH_RESERVATION",
        Deferred => "DEFERRED",
        Repeat => "REPEAT",
        Excluded => "EXCLUDED",
    }
);

impl DecisionKind {
    /// Threshold rule applied when decisions are generated.
    pub fn from_average(average: f64, admission_threshold: f64, resit_threshold: f64) -> Self {
        if average >= admission_threshold {
            DecisionKind::Admitted
        } else if average >= resit_threshold {
            DecisionKind::Deferred
        } else {
            DecisionKind::Repeat
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(
            self,
            DecisionKind::Admitted | DecisionKind::AdmittedWithReservation
        )
    }

    /// Only admitted students receive a mention.
    pub fn mention(&self, average: f64) -> Option<Mention> {
        if self.is_admitted() {
            Mention::from_average(average)
        } else {
            None
        }
    }
}

pub fn credit_rate(earned: i32, required: i32) -> f64 {
    if required <= 0 {
        return 0.0;
    }
    round2(f64::from(earned) / f64::from(required) * 100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct JuryDecision {
    pub id: DecisionId,
    pub session_id: DeliberationId,
    pub student_id: StudentId,
    pub average: f64,
    pub credits_earned: i32,
    pub credits_required: i32,
    pub credit_rate: f64,
    pub decision: DecisionKind,
    pub mention: Option<Mention>,
    pub class_rank: Option<i32>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_admission_threshold() -> f64 {
    PASS_MARK
}

fn default_resit_threshold() -> f64 {
    RESIT_MARK
}

fn validate_thresholds(dto: &GenerateDecisionsDto) -> Result<(), ValidationError> {
    if dto.resit_threshold > dto.admission_threshold {
        let mut err = ValidationError::new("thresholds");
        err.message = Some("resit_threshold cannot exceed admission_threshold".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_thresholds"))]
pub struct GenerateDecisionsDto {
    #[serde(default = "default_admission_threshold")]
    #[validate(range(min = 0.0, max = 20.0, message = "admission_threshold must be within 0-20"))]
    pub admission_threshold: f64,
    #[serde(default = "default_resit_threshold")]
    #[validate(range(min = 0.0, max = 20.0, message = "resit_threshold must be within 0-20"))]
    pub resit_threshold: f64,
}

impl Default for GenerateDecisionsDto {
    fn default() -> Self {
        Self {
            admission_threshold: PASS_MARK,
            resit_threshold: RESIT_MARK,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateDecisionDto {
    pub decision: Option<DecisionKind>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DecisionStatistics {
    pub total: i64,
    pub admitted: i64,
    pub success_rate: f64,
}

impl DecisionStatistics {
    pub fn from_decisions(decisions: &[JuryDecision]) -> Self {
        let total = decisions.len() as i64;
        let admitted = decisions.iter().filter(|d| d.decision.is_admitted()).count() as i64;
        let success_rate = if total == 0 {
            0.0
        } else {
            round2(admitted as f64 / total as f64 * 100.0)
        };
        Self {
            total,
            admitted,
            success_rate,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionsResponse {
    pub data: Vec<JuryDecision>,
    pub statistics: DecisionStatistics,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateDecisionsResponse {
    pub generated: i64,
    pub decisions: Vec<JuryDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(kind: DecisionKind) -> JuryDecision {
        JuryDecision {
            id: DecisionId::new(),
            session_id: DeliberationId::new(),
            student_id: StudentId::new(),
            average: 11.0,
            credits_earned: 30,
            credits_required: 60,
            credit_rate: 50.0,
            decision: kind,
            mention: None,
            class_rank: None,
            observations: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_decision_thresholds() {
        assert_eq!(DecisionKind::from_average(12.0, 10.0, 7.0), DecisionKind::Admitted);
        assert_eq!(DecisionKind::from_average(10.0, 10.0, 7.0), DecisionKind::Admitted);
        assert_eq!(DecisionKind::from_average(8.5, 10.0, 7.0), DecisionKind::Deferred);
        assert_eq!(DecisionKind::from_average(6.0, 10.0, 7.0), DecisionKind::Repeat);
        assert_eq!(DecisionKind::from_average(11.0, 12.0, 9.0), DecisionKind::Deferred);
    }

    #[test]
    fn test_mention_only_for_admitted() {
        assert_eq!(DecisionKind::Admitted.mention(14.2), Some(Mention::Good));
        assert_eq!(
            DecisionKind::AdmittedWithReservation.mention(10.5),
            Some(Mention::Pass)
        );
        assert_eq!(DecisionKind::Deferred.mention(14.2), None);
        assert_eq!(DecisionKind::Excluded.mention(18.0), None);
    }

    #[test]
    fn test_credit_rate() {
        assert_eq!(credit_rate(45, 60), 75.0);
        assert_eq!(credit_rate(20, 60), 33.33);
        assert_eq!(credit_rate(10, 0), 0.0);
    }

    #[test]
    fn test_session_transitions() {
        assert_eq!(SessionStatus::InProgress.close(), Ok(SessionStatus::Closed));
        assert!(SessionStatus::Validated.close().is_err());
        assert_eq!(
            SessionStatus::Closed.validate_session(),
            Ok(SessionStatus::Validated)
        );
        assert!(SessionStatus::Planned.validate_session().is_err());
    }

    #[test]
    fn test_decision_statistics() {
        let decisions = vec![
            decision(DecisionKind::Admitted),
            decision(DecisionKind::AdmittedWithReservation),
            decision(DecisionKind::Deferred),
        ];
        let stats = DecisionStatistics::from_decisions(&decisions);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.success_rate, 66.67);
        assert_eq!(DecisionStatistics::from_decisions(&[]).success_rate, 0.0);
    }

    #[test]
    fn test_generate_thresholds_validation() {
        let dto: GenerateDecisionsDto = serde_json::from_str("{}").unwrap();
        assert_eq!(dto.admission_threshold, 10.0);
        assert_eq!(dto.resit_threshold, 7.0);
        assert!(dto.validate().is_ok());

        let inverted = GenerateDecisionsDto {
            admission_threshold: 8.0,
            resit_threshold: 9.0,
        };
        assert!(inverted.validate().is_err());
    }
}
