//! Tuition fees, payments, scholarships and invoices.

use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{
    AcademicYearId, EnrollmentId, FeeId, InvoiceId, PaymentId, ProgramId, ScholarshipId,
    StudentId, UserId,
};
use campus_core::serde::{
    deserialize_optional_bool, deserialize_optional_from_str, deserialize_optional_i32,
};
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Days granted to pay an invoice when neither the request nor the fee says.
pub const DEFAULT_PAYMENT_TERM_DAYS: u64 = 30;

// =============================================================================
// Tuition fees
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TuitionFee {
    pub id: FeeId,
    pub program_id: ProgramId,
    pub academic_year_id: AcademicYearId,
    pub level: i32,
    pub total_amount: f64,
    pub installments: i32,
    pub amount_per_installment: f64,
    pub payment_deadline: Option<NaiveDate>,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn amount_per_installment(total: f64, installments: i32) -> f64 {
    if installments <= 0 {
        return total;
    }
    round2(total / f64::from(installments))
}

fn default_installments() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFeeDto {
    pub program_id: ProgramId,
    pub academic_year_id: AcademicYearId,
    #[validate(range(min = 1, max = 8, message = "level must be between 1 and 8"))]
    pub level: i32,
    #[validate(range(exclusive_min = 0.0, message = "total_amount must be positive"))]
    pub total_amount: f64,
    #[serde(default = "default_installments")]
    #[validate(range(min = 1, max = 12, message = "installments must be between 1 and 12"))]
    pub installments: i32,
    pub payment_deadline: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateFeeDto {
    #[validate(range(exclusive_min = 0.0, message = "total_amount must be positive"))]
    pub total_amount: Option<f64>,
    #[validate(range(min = 1, max = 12, message = "installments must be between 1 and 12"))]
    pub installments: Option<i32>,
    pub payment_deadline: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub program_id: Option<ProgramId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(default, deserialize_with = "deserialize_optional_i32")]
    pub level: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedFeesResponse {
    pub data: Vec<TuitionFee>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Payments
// =============================================================================

define_enum!(
    PaymentMethod {
        Cash => "CASH",
        BankTransfer => "BANK_TRANSFER",
        MobileMoney => "MOBILE_MONEY",
        Cheque => "CHEQUE",
        Other => "OTHER",
    }
);

define_enum!(
    PaymentState {
        Pending => "PENDING",
        Validated => "VALIDATED",
        Rejected => "REJECTED",
        Cancelled => "CANCELLED",
    }
);

impl PaymentState {
    /// Validation, rejection and cancellation all start from `PENDING`.
    pub fn ensure_pending(&self) -> Result<(), String> {
        match self {
            PaymentState::Pending => Ok(()),
            PaymentState::Validated => Err("Payment already validated".to_string()),
            other => Err(format!("Payment is {} and can no longer change", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: PaymentId,
    pub enrollment_id: EnrollmentId,
    /// `REC-YYYY-NNNNNN`
    pub receipt_number: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub paid_on: NaiveDate,
    pub transaction_reference: Option<String>,
    pub status: PaymentState,
    pub validated_by: Option<UserId>,
    pub validated_at: Option<DateTime<Utc>>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentDto {
    pub enrollment_id: EnrollmentId,
    #[validate(range(exclusive_min = 0.0, message = "amount must be positive"))]
    pub amount: f64,
    pub method: PaymentMethod,
    /// Defaults to today
    pub paid_on: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub transaction_reference: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectPaymentDto {
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub enrollment_id: Option<EnrollmentId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    pub status: Option<PaymentState>,
    pub method: Option<PaymentMethod>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedPaymentsResponse {
    pub data: Vec<Payment>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Scholarships
// =============================================================================

define_enum!(
    ScholarshipKind {
        Full => "FULL",
        Partial => "PARTIAL",
        FixedAmount => "FIXED_AMOUNT",
    }
);

define_enum!(
    ScholarshipSource {
        Government => "GOVERNMENT",
        University => "UNIVERSITY",
        Company => "COMPANY",
        Ngo => "NGO",
        Other => "OTHER",
    }
);

define_enum!(
    ScholarshipStatus {
        Active => "ACTIVE",
        Suspended => "SUSPENDED",
        Ended => "ENDED",
        Cancelled => "CANCELLED",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Scholarship {
    pub id: ScholarshipId,
    pub student_id: StudentId,
    pub academic_year_id: AcademicYearId,
    pub kind: ScholarshipKind,
    pub source: ScholarshipSource,
    pub percentage: Option<f64>,
    pub fixed_amount: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub organization: Option<String>,
    pub reference: Option<String>,
    pub conditions: Option<String>,
    pub observations: Option<String>,
    pub status: ScholarshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scholarship {
    /// Amount taken off `amount` by this scholarship.
    pub fn reduction(&self, amount: f64) -> f64 {
        scholarship_reduction(self.kind, self.percentage, self.fixed_amount, amount)
    }

    pub fn is_effective(&self, today: NaiveDate) -> bool {
        self.status == ScholarshipStatus::Active
            && today >= self.start_date
            && self.end_date.is_none_or(|end| today <= end)
    }
}

pub fn scholarship_reduction(
    kind: ScholarshipKind,
    percentage: Option<f64>,
    fixed_amount: Option<f64>,
    amount: f64,
) -> f64 {
    let reduction = match kind {
        ScholarshipKind::Full => amount,
        ScholarshipKind::Partial => amount * percentage.unwrap_or(0.0) / 100.0,
        ScholarshipKind::FixedAmount => fixed_amount.unwrap_or(0.0).min(amount),
    };
    round2(reduction)
}

/// A partial scholarship needs a percentage and a fixed one an amount.
pub fn check_scholarship_terms(
    kind: ScholarshipKind,
    percentage: Option<f64>,
    fixed_amount: Option<f64>,
) -> Result<(), String> {
    match kind {
        ScholarshipKind::Partial if percentage.is_none() => {
            Err("percentage is required for a partial scholarship".to_string())
        }
        ScholarshipKind::FixedAmount if fixed_amount.is_none() => {
            Err("fixed_amount is required for a fixed-amount scholarship".to_string())
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateScholarshipDto {
    pub student_id: StudentId,
    pub academic_year_id: AcademicYearId,
    pub kind: ScholarshipKind,
    pub source: ScholarshipSource,
    #[validate(range(min = 0.0, max = 100.0, message = "percentage must be within 0-100"))]
    pub percentage: Option<f64>,
    #[validate(range(min = 0.0, message = "fixed_amount cannot be negative"))]
    pub fixed_amount: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub organization: Option<String>,
    pub reference: Option<String>,
    pub conditions: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateScholarshipDto {
    pub kind: Option<ScholarshipKind>,
    pub source: Option<ScholarshipSource>,
    #[validate(range(min = 0.0, max = 100.0, message = "percentage must be within 0-100"))]
    pub percentage: Option<f64>,
    #[validate(range(min = 0.0, message = "fixed_amount cannot be negative"))]
    pub fixed_amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub organization: Option<String>,
    pub reference: Option<String>,
    pub conditions: Option<String>,
    pub observations: Option<String>,
    pub status: Option<ScholarshipStatus>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScholarshipFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    pub status: Option<ScholarshipStatus>,
    pub kind: Option<ScholarshipKind>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedScholarshipsResponse {
    pub data: Vec<Scholarship>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Invoices
// =============================================================================

define_enum!(
    InvoiceStatus {
        Unpaid => "UNPAID",
        Partial => "PARTIAL",
        Paid => "PAID",
        Cancelled => "CANCELLED",
    }
);

impl InvoiceStatus {
    /// Recomputed from the amounts; a cancelled invoice stays cancelled.
    pub fn recompute(self, net_amount: f64, amount_paid: f64) -> Self {
        if self == InvoiceStatus::Cancelled {
            return self;
        }
        if net_amount - amount_paid <= 0.0 {
            InvoiceStatus::Paid
        } else if amount_paid > 0.0 {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Unpaid
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

pub fn payment_rate(net_amount: f64, amount_paid: f64) -> f64 {
    if net_amount <= 0.0 {
        return 100.0;
    }
    round2(amount_paid / net_amount * 100.0)
}

/// Request value, then the fee deadline, then `issued_on` + 30 days.
pub fn resolve_due_date(
    requested: Option<NaiveDate>,
    fee_deadline: Option<NaiveDate>,
    issued_on: NaiveDate,
) -> NaiveDate {
    requested.or(fee_deadline).unwrap_or_else(|| {
        issued_on
            .checked_add_days(Days::new(DEFAULT_PAYMENT_TERM_DAYS))
            .unwrap_or(issued_on)
    })
}

/// Amounts of a freshly generated invoice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceAmounts {
    pub gross_amount: f64,
    pub discount_amount: f64,
    pub net_amount: f64,
    pub amount_paid: f64,
    pub status: InvoiceStatus,
}

impl InvoiceAmounts {
    /// Discounts are summed and capped at the gross amount.
    pub fn compute(gross_amount: f64, reductions: &[f64], amount_paid: f64) -> Self {
        let discount_amount = round2(reductions.iter().sum::<f64>().min(gross_amount));
        let net_amount = round2(gross_amount - discount_amount);
        Self {
            gross_amount,
            discount_amount,
            net_amount,
            amount_paid,
            status: InvoiceStatus::Unpaid.recompute(net_amount, amount_paid),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: InvoiceId,
    /// `FACT-YYYY-NNNNNN`
    pub number: String,
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub academic_year_id: AcademicYearId,
    pub gross_amount: f64,
    pub discount_amount: f64,
    pub net_amount: f64,
    pub amount_paid: f64,
    pub balance: f64,
    pub status: InvoiceStatus,
    pub issued_on: NaiveDate,
    pub due_date: NaiveDate,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_settled() && today > self.due_date
    }
}

/// An invoice with the figures derived at read time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payment_rate: f64,
    pub is_overdue: bool,
}

impl InvoiceView {
    pub fn new(invoice: Invoice, today: NaiveDate) -> Self {
        Self {
            payment_rate: payment_rate(invoice.net_amount, invoice.amount_paid),
            is_overdue: invoice.is_overdue(today),
            invoice,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateInvoiceDto {
    pub enrollment_id: EnrollmentId,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilterParams {
    pub status: Option<InvoiceStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedInvoicesResponse {
    pub data: Vec<InvoiceView>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverdueInvoicesResponse {
    pub data: Vec<InvoiceView>,
    pub count: i64,
    pub total_outstanding: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub total_billed: f64,
    pub total_discounts: f64,
    pub total_collected: f64,
    pub total_outstanding: f64,
    pub collection_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scholarship(kind: ScholarshipKind, status: ScholarshipStatus) -> Scholarship {
        Scholarship {
            id: ScholarshipId::new(),
            student_id: StudentId::new(),
            academic_year_id: AcademicYearId::new(),
            kind,
            source: ScholarshipSource::Government,
            percentage: Some(40.0),
            fixed_amount: Some(50_000.0),
            start_date: date(2024, 10, 1),
            end_date: Some(date(2025, 7, 31)),
            organization: None,
            reference: None,
            conditions: None,
            observations: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_scholarship_reduction_by_kind() {
        let active = ScholarshipStatus::Active;
        assert_eq!(scholarship(ScholarshipKind::Full, active).reduction(300_000.0), 300_000.0);
        assert_eq!(
            scholarship(ScholarshipKind::Partial, active).reduction(300_000.0),
            120_000.0
        );
        assert_eq!(
            scholarship(ScholarshipKind::FixedAmount, active).reduction(300_000.0),
            50_000.0
        );
        assert_eq!(
            scholarship(ScholarshipKind::FixedAmount, active).reduction(20_000.0),
            20_000.0
        );
    }

    #[test]
    fn test_scholarship_effective_window() {
        let s = scholarship(ScholarshipKind::Full, ScholarshipStatus::Active);
        assert!(s.is_effective(date(2024, 10, 1)));
        assert!(s.is_effective(date(2025, 7, 31)));
        assert!(!s.is_effective(date(2024, 9, 30)));
        assert!(!s.is_effective(date(2025, 8, 1)));

        let suspended = scholarship(ScholarshipKind::Full, ScholarshipStatus::Suspended);
        assert!(!suspended.is_effective(date(2025, 1, 1)));

        let open_ended = Scholarship {
            end_date: None,
            ..s
        };
        assert!(open_ended.is_effective(date(2030, 1, 1)));
    }

    #[test]
    fn test_scholarship_terms() {
        assert!(check_scholarship_terms(ScholarshipKind::Partial, None, None).is_err());
        assert!(check_scholarship_terms(ScholarshipKind::Partial, Some(50.0), None).is_ok());
        assert!(check_scholarship_terms(ScholarshipKind::FixedAmount, None, None).is_err());
        assert!(check_scholarship_terms(ScholarshipKind::Full, None, None).is_ok());
    }

    #[test]
    fn test_invoice_status_recompute() {
        assert_eq!(InvoiceStatus::Unpaid.recompute(100.0, 0.0), InvoiceStatus::Unpaid);
        assert_eq!(InvoiceStatus::Unpaid.recompute(100.0, 30.0), InvoiceStatus::Partial);
        assert_eq!(InvoiceStatus::Partial.recompute(100.0, 100.0), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::Unpaid.recompute(0.0, 0.0), InvoiceStatus::Paid);
        assert_eq!(
            InvoiceStatus::Cancelled.recompute(100.0, 100.0),
            InvoiceStatus::Cancelled
        );
    }

    #[test]
    fn test_invoice_amounts_cap_discount() {
        let amounts = InvoiceAmounts::compute(300_000.0, &[120_000.0, 50_000.0], 0.0);
        assert_eq!(amounts.discount_amount, 170_000.0);
        assert_eq!(amounts.net_amount, 130_000.0);
        assert_eq!(amounts.status, InvoiceStatus::Unpaid);

        let capped = InvoiceAmounts::compute(300_000.0, &[300_000.0, 50_000.0], 0.0);
        assert_eq!(capped.discount_amount, 300_000.0);
        assert_eq!(capped.net_amount, 0.0);
        assert_eq!(capped.status, InvoiceStatus::Paid);

        let partial = InvoiceAmounts::compute(100_000.0, &[], 25_000.0);
        assert_eq!(partial.status, InvoiceStatus::Partial);
    }

    #[test]
    fn test_payment_rate() {
        assert_eq!(payment_rate(200.0, 50.0), 25.0);
        assert_eq!(payment_rate(0.0, 0.0), 100.0);
    }

    #[test]
    fn test_due_date_resolution() {
        let issued = date(2025, 1, 10);
        assert_eq!(
            resolve_due_date(Some(date(2025, 3, 1)), Some(date(2025, 2, 1)), issued),
            date(2025, 3, 1)
        );
        assert_eq!(
            resolve_due_date(None, Some(date(2025, 2, 1)), issued),
            date(2025, 2, 1)
        );
        assert_eq!(resolve_due_date(None, None, issued), date(2025, 2, 9));
    }

    #[test]
    fn test_payment_state_transitions() {
        assert!(PaymentState::Pending.ensure_pending().is_ok());
        assert_eq!(
            PaymentState::Validated.ensure_pending().unwrap_err(),
            "Payment already validated"
        );
        assert!(PaymentState::Rejected.ensure_pending().is_err());
    }

    #[test]
    fn test_amount_per_installment() {
        assert_eq!(amount_per_installment(300_000.0, 3), 100_000.0);
        assert_eq!(amount_per_installment(100.0, 3), 33.33);
    }
}
