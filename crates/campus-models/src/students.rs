//! Students and their yearly enrollments.

use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{AcademicYearId, EnrollmentId, ProgramId, StudentId, UserId};
use campus_core::serde::{deserialize_optional_from_str, deserialize_optional_i32};
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

define_enum!(
    Sex {
        Male => "M",
        Female => "F",
    }
);

define_enum!(
    StudentStatus {
        Active => "ACTIVE",
        Suspended => "SUSPENDED",
        Graduated => "GRADUATED",
        DroppedOut => "DROPPED_OUT",
    }
);

/// A student joined with the identity fields of their user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Matricule, e.g. `ETU2025001`
    pub registration_number: String,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub sex: Sex,
    pub nationality: String,
    pub phone: Option<String>,
    pub personal_email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn default_country() -> String {
    "Senegal".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 1, max = 100, message = "place_of_birth is required"))]
    pub place_of_birth: String,
    pub sex: Sex,
    #[validate(length(min = 1, max = 50, message = "nationality is required"))]
    pub nationality: String,
    pub phone: Option<String>,
    #[validate(email(message = "personal_email must be a valid address"))]
    pub personal_email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    #[validate(email(message = "guardian_email must be a valid address"))]
    pub guardian_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(min = 1, max = 100))]
    pub place_of_birth: Option<String>,
    pub sex: Option<Sex>,
    #[validate(length(min = 1, max = 50))]
    pub nationality: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub personal_email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    #[validate(email)]
    pub guardian_email: Option<String>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilterParams {
    pub status: Option<StudentStatus>,
    pub sex: Option<Sex>,
    /// Students with at least one enrollment in this program
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub program_id: Option<ProgramId>,
    /// Matches names, e-mail or registration number
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_sex: Vec<LabelCount>,
}

// =============================================================================
// Enrollments
// =============================================================================

define_enum!(
    EnrollmentStatus {
        Enrolled => "ENROLLED",
        Dropped => "DROPPED",
        Transferred => "TRANSFERRED",
    }
);

define_enum!(
    PaymentStatus {
        Unpaid => "UNPAID",
        Partial => "PARTIAL",
        Paid => "PAID",
    }
);

impl PaymentStatus {
    /// Derived from the amounts, never set by clients.
    pub fn from_amounts(fee: f64, paid: f64) -> Self {
        if paid >= fee {
            PaymentStatus::Paid
        } else if paid > 0.0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

pub fn remaining_amount(fee: f64, paid: f64) -> f64 {
    round2((fee - paid).max(0.0))
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub academic_year_id: AcademicYearId,
    pub level: i32,
    pub enrolled_on: NaiveDate,
    pub status: EnrollmentStatus,
    pub registration_fee: f64,
    pub amount_paid: f64,
    pub payment_status: PaymentStatus,
    pub remaining_amount: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollmentDto {
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub academic_year_id: AcademicYearId,
    #[validate(range(min = 1, max = 8, message = "level must be between 1 and 8"))]
    pub level: i32,
    /// Defaults to today
    pub enrolled_on: Option<NaiveDate>,
    /// Defaults to the program's registration fee
    #[validate(range(min = 0.0, message = "registration_fee cannot be negative"))]
    pub registration_fee: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "amount_paid cannot be negative"))]
    pub amount_paid: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEnrollmentDto {
    #[validate(range(min = 1, max = 8, message = "level must be between 1 and 8"))]
    pub level: Option<i32>,
    pub status: Option<EnrollmentStatus>,
    #[validate(range(min = 0.0, message = "registration_fee cannot be negative"))]
    pub registration_fee: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EnrollmentPaymentDto {
    #[validate(range(exclusive_min = 0.0, message = "amount must be positive"))]
    pub amount: f64,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub program_id: Option<ProgramId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(default, deserialize_with = "deserialize_optional_i32")]
    pub level: Option<i32>,
    pub status: Option<EnrollmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedEnrollmentsResponse {
    pub data: Vec<Enrollment>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_payment_status: Vec<LabelCount>,
    pub total_fees: f64,
    pub total_collected: f64,
    pub total_remaining: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_from_amounts() {
        assert_eq!(PaymentStatus::from_amounts(150_000.0, 0.0), PaymentStatus::Unpaid);
        assert_eq!(
            PaymentStatus::from_amounts(150_000.0, 50_000.0),
            PaymentStatus::Partial
        );
        assert_eq!(
            PaymentStatus::from_amounts(150_000.0, 150_000.0),
            PaymentStatus::Paid
        );
        assert_eq!(PaymentStatus::from_amounts(0.0, 0.0), PaymentStatus::Paid);
    }

    #[test]
    fn test_remaining_amount_is_never_negative() {
        assert_eq!(remaining_amount(100.0, 40.5), 59.5);
        assert_eq!(remaining_amount(100.0, 120.0), 0.0);
    }

    #[test]
    fn test_enrollment_level_bounds() {
        let dto = CreateEnrollmentDto {
            student_id: StudentId::new(),
            program_id: ProgramId::new(),
            academic_year_id: AcademicYearId::new(),
            level: 1,
            enrolled_on: None,
            registration_fee: None,
            amount_paid: 0.0,
            notes: None,
        };
        assert!(dto.validate().is_ok());
        assert!(CreateEnrollmentDto { level: 0, ..dto.clone() }.validate().is_err());
        assert!(CreateEnrollmentDto { level: 9, ..dto }.validate().is_err());
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        assert!(EnrollmentPaymentDto { amount: 0.0 }.validate().is_err());
        assert!(EnrollmentPaymentDto { amount: 10.0 }.validate().is_ok());
    }

    #[test]
    fn test_student_country_default() {
        let json = r#"{
            "first_name":"Awa","last_name":"Diallo","email":"awa@campus.test",
            "password":"password123","date_of_birth":"2004-03-12",
            "place_of_birth":"Dakar","sex":"F","nationality":"Senegalese"
        }"#;
        let dto: CreateStudentDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.country, "Senegal");
        assert_eq!(dto.sex, Sex::Female);
        assert!(dto.validate().is_ok());
    }
}
