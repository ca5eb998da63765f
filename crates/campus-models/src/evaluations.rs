//! Evaluations, grades and subject results.
//!
//! Scores are always compared on a /20 scale. A grade stores its raw score
//! and `out_of`, plus the normalized `score_over_20` used by every average.

use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{
    AcademicYearId, EvaluationId, EvaluationTypeId, GradeId, ResultId, StudentId, SubjectId,
};
use campus_core::serde::{deserialize_optional_bool, deserialize_optional_from_str};
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const PASS_MARK: f64 = 10.0;
pub const RESIT_MARK: f64 = 7.0;

// =============================================================================
// Evaluation types
// =============================================================================

define_enum!(
    EvaluationTypeCode {
        Assignment => "ASSIGNMENT",
        Exam => "EXAM",
        Resit => "RESIT",
        Tutorial => "TUTORIAL",
        Practical => "PRACTICAL",
        Project => "PROJECT",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EvaluationType {
    pub id: EvaluationTypeId,
    pub code: EvaluationTypeCode,
    pub name: String,
    pub min_coefficient: f64,
    pub max_coefficient: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationType {
    pub fn allows_coefficient(&self, coefficient: f64) -> bool {
        coefficient >= self.min_coefficient && coefficient <= self.max_coefficient
    }
}

pub fn check_coefficient_range(min: f64, max: f64) -> Result<(), String> {
    if min > max {
        return Err("min_coefficient cannot exceed max_coefficient".to_string());
    }
    Ok(())
}

fn default_min_coefficient() -> f64 {
    1.0
}

fn default_max_coefficient() -> f64 {
    3.0
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEvaluationTypeDto {
    pub code: EvaluationTypeCode,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default = "default_min_coefficient")]
    #[validate(range(exclusive_min = 0.0, message = "min_coefficient must be positive"))]
    pub min_coefficient: f64,
    #[serde(default = "default_max_coefficient")]
    #[validate(range(exclusive_min = 0.0, message = "max_coefficient must be positive"))]
    pub max_coefficient: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEvaluationTypeDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub min_coefficient: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub max_coefficient: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedEvaluationTypesResponse {
    pub data: Vec<EvaluationType>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Evaluations
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub subject_id: SubjectId,
    pub evaluation_type_id: EvaluationTypeId,
    pub academic_year_id: AcademicYearId,
    pub title: String,
    pub date: NaiveDate,
    pub coefficient: f64,
    pub max_score: f64,
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_max_score() -> f64 {
    20.0
}

fn default_eval_coefficient() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEvaluationDto {
    pub subject_id: SubjectId,
    pub evaluation_type_id: EvaluationTypeId,
    pub academic_year_id: AcademicYearId,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    pub date: NaiveDate,
    #[serde(default = "default_eval_coefficient")]
    #[validate(range(exclusive_min = 0.0, message = "coefficient must be positive"))]
    pub coefficient: f64,
    #[serde(default = "default_max_score")]
    #[validate(range(exclusive_min = 0.0, message = "max_score must be positive"))]
    pub max_score: f64,
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEvaluationDto {
    pub evaluation_type_id: Option<EvaluationTypeId>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    #[validate(range(exclusive_min = 0.0, message = "coefficient must be positive"))]
    pub coefficient: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "max_score must be positive"))]
    pub max_score: Option<f64>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DuplicateEvaluationDto {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EvaluationFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub evaluation_type_id: Option<EvaluationTypeId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    /// Matches the title
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedEvaluationsResponse {
    pub data: Vec<Evaluation>,
    pub meta: PaginationMeta,
}

/// Number of present students per /20 band. Lower bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScoreDistribution {
    pub from_18: i64,
    pub from_16_to_18: i64,
    pub from_14_to_16: i64,
    pub from_12_to_14: i64,
    pub from_10_to_12: i64,
    pub below_10: i64,
}

impl ScoreDistribution {
    fn add(&mut self, score: f64) {
        match score {
            s if s >= 18.0 => self.from_18 += 1,
            s if s >= 16.0 => self.from_16_to_18 += 1,
            s if s >= 14.0 => self.from_14_to_16 += 1,
            s if s >= 12.0 => self.from_12_to_14 += 1,
            s if s >= 10.0 => self.from_10_to_12 += 1,
            _ => self.below_10 += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EvaluationStatistics {
    pub evaluation_id: EvaluationId,
    pub present_count: i64,
    pub absent_count: i64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pass_rate: f64,
    pub distribution: ScoreDistribution,
}

impl EvaluationStatistics {
    /// `present_scores` are /20 scores of students who sat the evaluation.
    pub fn compute(evaluation_id: EvaluationId, present_scores: &[f64], absent_count: i64) -> Self {
        let mut distribution = ScoreDistribution::default();
        for score in present_scores {
            distribution.add(*score);
        }

        let present_count = present_scores.len() as i64;
        let (average, min, max, pass_rate) = if present_scores.is_empty() {
            (None, None, None, 0.0)
        } else {
            let sum: f64 = present_scores.iter().sum();
            let min = present_scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = present_scores
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let passed = present_scores.iter().filter(|s| **s >= PASS_MARK).count();
            (
                Some(round2(sum / present_count as f64)),
                Some(min),
                Some(max),
                round2(passed as f64 / present_count as f64 * 100.0),
            )
        };

        Self {
            evaluation_id,
            present_count,
            absent_count,
            average,
            min,
            max,
            pass_rate,
            distribution,
        }
    }
}

// =============================================================================
// Grades
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grade {
    pub id: GradeId,
    pub evaluation_id: EvaluationId,
    pub student_id: StudentId,
    pub score: Option<f64>,
    pub out_of: f64,
    pub score_over_20: f64,
    pub remarks: Option<String>,
    pub is_absent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalizes a raw score to /20. Absent or missing scores count as 0.
pub fn score_over_20(score: Option<f64>, out_of: f64, is_absent: bool) -> f64 {
    match score {
        Some(score) if !is_absent && out_of > 0.0 => round2(score / out_of * 20.0),
        _ => 0.0,
    }
}

/// Remark used when the grader leaves none.
pub fn appreciation(score_over_20: f64, is_absent: bool) -> &'static str {
    if is_absent {
        return "Absent";
    }
    match score_over_20 {
        s if s >= 18.0 => "Excellent",
        s if s >= 16.0 => "Very good",
        s if s >= 14.0 => "Good",
        s if s >= 12.0 => "Fairly good",
        s if s >= 10.0 => "Pass",
        _ => "Insufficient",
    }
}

/// Score must be present unless absent, non-negative and at most `out_of`.
pub fn check_grade(score: Option<f64>, out_of: f64, is_absent: bool) -> Result<(), String> {
    if out_of <= 0.0 {
        return Err("out_of must be positive".to_string());
    }
    match score {
        None if !is_absent => Err("score is required unless the student is absent".to_string()),
        Some(s) if s < 0.0 => Err("score cannot be negative".to_string()),
        Some(s) if s > out_of => Err(format!("score cannot exceed {}", out_of)),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGradeDto {
    pub evaluation_id: EvaluationId,
    pub student_id: StudentId,
    #[validate(range(min = 0.0, message = "score cannot be negative"))]
    pub score: Option<f64>,
    /// Defaults to the evaluation's max_score
    #[validate(range(exclusive_min = 0.0, message = "out_of must be positive"))]
    pub out_of: Option<f64>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub is_absent: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateGradeDto {
    #[validate(range(min = 0.0, message = "score cannot be negative"))]
    pub score: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "out_of must be positive"))]
    pub out_of: Option<f64>,
    pub remarks: Option<String>,
    pub is_absent: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkGradeEntry {
    pub student_id: StudentId,
    pub score: Option<f64>,
    #[serde(default)]
    pub is_absent: bool,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkGradeDto {
    pub evaluation_id: EvaluationId,
    #[validate(length(min = 1, message = "grades cannot be empty"))]
    pub grades: Vec<BulkGradeEntry>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkGradeError {
    pub student_id: StudentId,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BulkGradeResponse {
    pub created: i64,
    pub updated: i64,
    pub errors: Vec<BulkGradeError>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GradeFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub evaluation_id: Option<EvaluationId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_absent: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedGradesResponse {
    pub data: Vec<Grade>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Results
// =============================================================================

define_enum!(
    Mention {
        Excellent => "EXCELLENT",
        VeryGood => "VERY_GOOD",
        Good => "GOOD",
        FairlyGood => "FAIRLY_GOOD",
        Pass => "PASS",
    }
);

impl Mention {
    pub fn from_average(average: f64) -> Option<Self> {
        match average {
            a if a >= 18.0 => Some(Mention::Excellent),
            a if a >= 16.0 => Some(Mention::VeryGood),
            a if a >= 14.0 => Some(Mention::Good),
            a if a >= 12.0 => Some(Mention::FairlyGood),
            a if a >= 10.0 => Some(Mention::Pass),
            _ => None,
        }
    }
}

define_enum!(
    ResultStatus {
        Passed => "PASSED",
        Resit => "RESIT",
        Failed => "FAILED",
    }
);

impl ResultStatus {
    pub fn from_average(average: f64) -> Self {
        if average >= PASS_MARK {
            ResultStatus::Passed
        } else if average >= RESIT_MARK {
            ResultStatus::Resit
        } else {
            ResultStatus::Failed
        }
    }

    /// Subject credits are earned only when passed.
    pub fn credits_earned(&self, subject_credits: i32) -> i32 {
        match self {
            ResultStatus::Passed => subject_credits,
            _ => 0,
        }
    }
}

/// Σ(score × coefficient) / Σ coefficient over `(score_over_20, coefficient)`.
///
/// Rounded to 2 decimals; 0 when there is nothing to average.
pub fn weighted_average(scores: &[(f64, f64)]) -> f64 {
    let total_coefficient: f64 = scores.iter().map(|(_, c)| c).sum();
    if total_coefficient <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = scores.iter().map(|(s, c)| s * c).sum();
    round2(weighted / total_coefficient)
}

/// Ranks for averages already sorted best first. Equal averages share a
/// rank and the next distinct average skips ahead (1, 2, 2, 4).
pub fn competition_ranks(sorted_averages: &[f64]) -> Vec<i32> {
    let mut ranks = Vec::with_capacity(sorted_averages.len());
    for (index, average) in sorted_averages.iter().enumerate() {
        let rank = match index {
            0 => 1,
            i if sorted_averages[i - 1] == *average => ranks[i - 1],
            i => i as i32 + 1,
        };
        ranks.push(rank);
    }
    ranks
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubjectResult {
    pub id: ResultId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub academic_year_id: AcademicYearId,
    pub average: f64,
    pub credits_earned: i32,
    pub mention: Option<Mention>,
    pub status: ResultStatus,
    pub rank: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ComputeResultDto {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub academic_year_id: AcademicYearId,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ComputeSubjectResultsDto {
    pub subject_id: SubjectId,
    pub academic_year_id: AcademicYearId,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComputeSubjectResultsResponse {
    pub computed: i64,
    pub results: Vec<SubjectResult>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResultFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    pub status: Option<ResultStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResultsResponse {
    pub data: Vec<SubjectResult>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Transcript {
    pub student_id: StudentId,
    pub academic_year_id: Option<AcademicYearId>,
    pub results: Vec<SubjectResult>,
    pub total_credits: i64,
    pub overall_average: f64,
    pub count: i64,
}

impl Transcript {
    /// The overall average is the plain mean of the subject averages.
    pub fn new(
        student_id: StudentId,
        academic_year_id: Option<AcademicYearId>,
        results: Vec<SubjectResult>,
    ) -> Self {
        let count = results.len() as i64;
        let total_credits = results.iter().map(|r| i64::from(r.credits_earned)).sum();
        let overall_average = if results.is_empty() {
            0.0
        } else {
            round2(results.iter().map(|r| r.average).sum::<f64>() / count as f64)
        };
        Self {
            student_id,
            academic_year_id,
            results,
            total_credits,
            overall_average,
            count,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResultStatisticsParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub subject_id: Option<SubjectId>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResultStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_mention: Vec<LabelCount>,
    pub average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_grades_cannot_be_empty() {
        let empty: BulkGradeDto =
            serde_json::from_value(serde_json::json!({
                "evaluation_id": EvaluationId::new(),
                "grades": []
            }))
            .unwrap();
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("grades"));

        let one = BulkGradeDto {
            grades: vec![BulkGradeEntry {
                student_id: StudentId::new(),
                score: Some(12.0),
                is_absent: false,
                remarks: None,
            }],
            ..empty
        };
        assert!(one.validate().is_ok());
    }

    #[test]
    fn test_score_over_20() {
        assert_eq!(score_over_20(Some(15.0), 20.0, false), 15.0);
        assert_eq!(score_over_20(Some(45.0), 60.0, false), 15.0);
        assert_eq!(score_over_20(Some(7.0), 30.0, false), 4.67);
        assert_eq!(score_over_20(Some(18.0), 20.0, true), 0.0);
        assert_eq!(score_over_20(None, 20.0, false), 0.0);
    }

    #[test]
    fn test_appreciation_thresholds() {
        assert_eq!(appreciation(18.0, false), "Excellent");
        assert_eq!(appreciation(17.99, false), "Very good");
        assert_eq!(appreciation(14.0, false), "Good");
        assert_eq!(appreciation(12.5, false), "Fairly good");
        assert_eq!(appreciation(10.0, false), "Pass");
        assert_eq!(appreciation(9.99, false), "Insufficient");
        assert_eq!(appreciation(19.0, true), "Absent");
    }

    #[test]
    fn test_check_grade() {
        assert!(check_grade(Some(12.0), 20.0, false).is_ok());
        assert!(check_grade(None, 20.0, true).is_ok());
        assert!(check_grade(None, 20.0, false).is_err());
        assert!(check_grade(Some(21.0), 20.0, false).is_err());
        assert!(check_grade(Some(-1.0), 20.0, false).is_err());
        assert!(check_grade(Some(1.0), 0.0, false).is_err());
    }

    #[test]
    fn test_weighted_average() {
        // (12×1 + 15×2) / 3 = 14
        assert_eq!(weighted_average(&[(12.0, 1.0), (15.0, 2.0)]), 14.0);
        assert_eq!(weighted_average(&[(10.0, 1.0), (11.0, 1.0), (11.0, 1.0)]), 10.67);
        assert_eq!(weighted_average(&[]), 0.0);
    }

    #[test]
    fn test_mention_and_status_from_average() {
        assert_eq!(Mention::from_average(18.0), Some(Mention::Excellent));
        assert_eq!(Mention::from_average(16.5), Some(Mention::VeryGood));
        assert_eq!(Mention::from_average(10.0), Some(Mention::Pass));
        assert_eq!(Mention::from_average(9.99), None);

        assert_eq!(ResultStatus::from_average(10.0), ResultStatus::Passed);
        assert_eq!(ResultStatus::from_average(7.0), ResultStatus::Resit);
        assert_eq!(ResultStatus::from_average(6.99), ResultStatus::Failed);

        assert_eq!(ResultStatus::Passed.credits_earned(6), 6);
        assert_eq!(ResultStatus::Resit.credits_earned(6), 0);
    }

    #[test]
    fn test_competition_ranks_share_ties() {
        assert_eq!(competition_ranks(&[15.0, 14.0, 14.0, 12.0]), vec![1, 2, 2, 4]);
        assert_eq!(competition_ranks(&[11.0, 11.0]), vec![1, 1]);
        assert!(competition_ranks(&[]).is_empty());
    }

    #[test]
    fn test_evaluation_statistics_buckets() {
        let stats = EvaluationStatistics::compute(
            EvaluationId::new(),
            &[18.0, 17.0, 16.0, 14.5, 12.0, 10.0, 9.5],
            2,
        );
        assert_eq!(stats.present_count, 7);
        assert_eq!(stats.absent_count, 2);
        assert_eq!(stats.min, Some(9.5));
        assert_eq!(stats.max, Some(18.0));
        assert_eq!(stats.average, Some(13.86));
        assert_eq!(
            stats.distribution,
            ScoreDistribution {
                from_18: 1,
                from_16_to_18: 2,
                from_14_to_16: 1,
                from_12_to_14: 1,
                from_10_to_12: 1,
                below_10: 1,
            }
        );
        assert_eq!(stats.pass_rate, 85.71);
    }

    #[test]
    fn test_evaluation_statistics_without_present_students() {
        let stats = EvaluationStatistics::compute(EvaluationId::new(), &[], 3);
        assert_eq!(stats.average, None);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.absent_count, 3);
    }

    #[test]
    fn test_coefficient_range() {
        assert!(check_coefficient_range(1.0, 3.0).is_ok());
        assert!(check_coefficient_range(2.0, 2.0).is_ok());
        assert!(check_coefficient_range(4.0, 3.0).is_err());
    }
}
