use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::LabelCount;
use campus_models::ids::{EnrollmentId, FeeId, InvoiceId, PaymentId, ScholarshipId, StudentId, UserId};
use campus_models::numbering::{INVOICE_PREFIX, RECEIPT_PREFIX, document_number, document_stem};
use campus_models::students::Enrollment;

use crate::metrics;
use crate::modules::sequence::next_in_series;
use crate::modules::students::service::{ENROLLMENT_COLUMNS, EnrollmentService};

use super::model::{
    CreateFeeDto, CreatePaymentDto, CreateScholarshipDto, FeeFilterParams, GenerateInvoiceDto,
    Invoice, InvoiceAmounts, InvoiceFilterParams, InvoiceStatistics, InvoiceStatus, InvoiceView,
    OverdueInvoicesResponse, PaginatedFeesResponse, PaginatedInvoicesResponse,
    PaginatedPaymentsResponse, PaginatedScholarshipsResponse, Payment, PaymentFilterParams,
    PaymentState, Scholarship, ScholarshipFilterParams, ScholarshipStatus, TuitionFee,
    UpdateFeeDto, UpdateScholarshipDto, check_scholarship_terms, payment_rate, resolve_due_date,
};

const FEE_COLUMNS: &str = "id, program_id, academic_year_id, level, total_amount, installments, \
     amount_per_installment, payment_deadline, is_active, description, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, enrollment_id, receipt_number, amount, method, paid_on, \
     transaction_reference, status, validated_by, validated_at, observations, created_at, updated_at";

const SCHOLARSHIP_COLUMNS: &str = "id, student_id, academic_year_id, kind, source, percentage, \
     fixed_amount, start_date, end_date, organization, reference, conditions, observations, status, \
     created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, number, enrollment_id, student_id, academic_year_id, \
     gross_amount, discount_amount, net_amount, amount_paid, balance, status, issued_on, due_date, \
     observations, created_at, updated_at";

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn views(invoices: Vec<Invoice>) -> Vec<InvoiceView> {
    let today = today();
    invoices
        .into_iter()
        .map(|invoice| InvoiceView::new(invoice, today))
        .collect()
}

// =============================================================================
// Tuition fees
// =============================================================================

pub struct FeeService;

impl FeeService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateFeeDto) -> Result<TuitionFee, AppError> {
        sqlx::query_as::<_, TuitionFee>(&format!(
            r#"INSERT INTO tuition_fees
                (program_id, academic_year_id, level, total_amount, installments,
                 payment_deadline, is_active, description)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {FEE_COLUMNS}"#
        ))
        .bind(dto.program_id)
        .bind(dto.academic_year_id)
        .bind(dto.level)
        .bind(dto.total_amount)
        .bind(dto.installments)
        .bind(dto.payment_deadline)
        .bind(dto.is_active)
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(
                e,
                "A fee already exists for this program, year and level",
                "Program or academic year does not exist",
            )
        })
    }

    #[instrument(skip(db))]
    pub async fn list(db: &PgPool, filters: FeeFilterParams) -> Result<PaginatedFeesResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR program_id = $1)
              AND ($2::UUID IS NULL OR academic_year_id = $2)
              AND ($3::INTEGER IS NULL OR level = $3)
              AND ($4::BOOLEAN IS NULL OR is_active = $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tuition_fees{WHERE}"))
            .bind(filters.program_id)
            .bind(filters.academic_year_id)
            .bind(filters.level)
            .bind(filters.is_active)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, TuitionFee>(&format!(
            "SELECT {FEE_COLUMNS} FROM tuition_fees{WHERE} ORDER BY level, created_at{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.program_id)
        .bind(filters.academic_year_id)
        .bind(filters.level)
        .bind(filters.is_active)
        .fetch_all(db)
        .await?;

        Ok(PaginatedFeesResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: FeeId) -> Result<TuitionFee, AppError> {
        sqlx::query_as::<_, TuitionFee>(&format!("SELECT {FEE_COLUMNS} FROM tuition_fees WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Tuition fee not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(db: &PgPool, id: FeeId, dto: UpdateFeeDto) -> Result<TuitionFee, AppError> {
        sqlx::query_as::<_, TuitionFee>(&format!(
            r#"UPDATE tuition_fees
               SET total_amount = COALESCE($1, total_amount),
                   installments = COALESCE($2, installments),
                   payment_deadline = COALESCE($3, payment_deadline),
                   is_active = COALESCE($4, is_active),
                   description = COALESCE($5, description),
                   updated_at = NOW()
               WHERE id = $6
               RETURNING {FEE_COLUMNS}"#
        ))
        .bind(dto.total_amount)
        .bind(dto.installments)
        .bind(dto.payment_deadline)
        .bind(dto.is_active)
        .bind(&dto.description)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Tuition fee not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: FeeId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tuition_fees WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Tuition fee not found")));
        }
        Ok(())
    }
}

// =============================================================================
// Payments
// =============================================================================

pub struct PaymentService;

impl PaymentService {
    /// Records a pending payment under the next `REC-YYYY-NNNNNN` receipt.
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreatePaymentDto) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM enrollments WHERE id = $1)")
            .bind(dto.enrollment_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::bad_request(anyhow!("Enrollment does not exist")));
        }

        let year = Utc::now().year();
        let stem = document_stem(RECEIPT_PREFIX, year);
        let sequence = next_in_series(&mut tx, "payments", "receipt_number", &stem).await?;
        let receipt_number = document_number(RECEIPT_PREFIX, year, sequence);

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"INSERT INTO payments
                (enrollment_id, receipt_number, amount, method, paid_on, transaction_reference, observations)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(dto.enrollment_id)
        .bind(&receipt_number)
        .bind(dto.amount)
        .bind(dto.method)
        .bind(dto.paid_on.unwrap_or_else(today))
        .bind(&dto.transaction_reference)
        .bind(&dto.observations)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(receipt = %payment.receipt_number, amount = payment.amount, "Payment recorded");
        Ok(payment)
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: PaymentFilterParams,
    ) -> Result<PaginatedPaymentsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR enrollment_id = $1)
              AND ($2::UUID IS NULL OR enrollment_id IN (SELECT id FROM enrollments WHERE student_id = $2))
              AND ($3::TEXT IS NULL OR status = $3)
              AND ($4::TEXT IS NULL OR method = $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM payments{WHERE}"))
            .bind(filters.enrollment_id)
            .bind(filters.student_id)
            .bind(filters.status)
            .bind(filters.method)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments{WHERE} ORDER BY paid_on DESC, created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.enrollment_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .bind(filters.method)
        .fetch_all(db)
        .await?;

        Ok(PaginatedPaymentsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: PaymentId) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Payment not found")))
    }

    /// Validates a pending payment and credits its enrollment and invoice.
    #[instrument(skip(db))]
    pub async fn validate(db: &PgPool, id: PaymentId, validated_by: UserId) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;

        let payment = Self::lock_pending(&mut tx, id).await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"UPDATE payments
               SET status = $1, validated_by = $2, validated_at = NOW(), updated_at = NOW()
               WHERE id = $3
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(PaymentState::Validated)
        .bind(validated_by)
        .bind(payment.id)
        .fetch_one(&mut *tx)
        .await?;

        EnrollmentService::credit(&mut tx, payment.enrollment_id, payment.amount).await?;
        InvoiceService::credit(&mut tx, payment.enrollment_id, payment.amount).await?;

        tx.commit().await?;

        metrics::track_payment_validated(payment.amount);
        info!(receipt = %payment.receipt_number, "Payment validated");
        Ok(payment)
    }

    /// The reason is appended to the observations.
    #[instrument(skip(db))]
    pub async fn reject(db: &PgPool, id: PaymentId, reason: String) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;
        Self::lock_pending(&mut tx, id).await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"UPDATE payments
               SET status = $1,
                   observations = CONCAT_WS(E'\n', observations, 'Rejected: ' || $2),
                   updated_at = NOW()
               WHERE id = $3
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(PaymentState::Rejected)
        .bind(&reason)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    #[instrument(skip(db))]
    pub async fn cancel(db: &PgPool, id: PaymentId) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;
        Self::lock_pending(&mut tx, id).await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"UPDATE payments SET status = $1, updated_at = NOW()
               WHERE id = $2
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(PaymentState::Cancelled)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    async fn lock_pending(
        tx: &mut Transaction<'_, Postgres>,
        id: PaymentId,
    ) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Payment not found")))?;

        payment
            .status
            .ensure_pending()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        Ok(payment)
    }
}

// =============================================================================
// Scholarships
// =============================================================================

pub struct ScholarshipService;

impl ScholarshipService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateScholarshipDto) -> Result<Scholarship, AppError> {
        check_scholarship_terms(dto.kind, dto.percentage, dto.fixed_amount)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        check_period(dto.start_date, dto.end_date)?;

        sqlx::query_as::<_, Scholarship>(&format!(
            r#"INSERT INTO scholarships
                (student_id, academic_year_id, kind, source, percentage, fixed_amount, start_date,
                 end_date, organization, reference, conditions, observations)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING {SCHOLARSHIP_COLUMNS}"#
        ))
        .bind(dto.student_id)
        .bind(dto.academic_year_id)
        .bind(dto.kind)
        .bind(dto.source)
        .bind(dto.percentage)
        .bind(dto.fixed_amount)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(&dto.organization)
        .bind(&dto.reference)
        .bind(&dto.conditions)
        .bind(&dto.observations)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Duplicate scholarship", "Student or academic year does not exist"))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: ScholarshipFilterParams,
    ) -> Result<PaginatedScholarshipsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR student_id = $1)
              AND ($2::UUID IS NULL OR academic_year_id = $2)
              AND ($3::TEXT IS NULL OR status = $3)
              AND ($4::TEXT IS NULL OR kind = $4)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM scholarships{WHERE}"))
            .bind(filters.student_id)
            .bind(filters.academic_year_id)
            .bind(filters.status)
            .bind(filters.kind)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Scholarship>(&format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships{WHERE} ORDER BY start_date DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.student_id)
        .bind(filters.academic_year_id)
        .bind(filters.status)
        .bind(filters.kind)
        .fetch_all(db)
        .await?;

        Ok(PaginatedScholarshipsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: ScholarshipId) -> Result<Scholarship, AppError> {
        sqlx::query_as::<_, Scholarship>(&format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Scholarship not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: ScholarshipId,
        dto: UpdateScholarshipDto,
    ) -> Result<Scholarship, AppError> {
        let existing = Self::get(db, id).await?;

        let kind = dto.kind.unwrap_or(existing.kind);
        let percentage = dto.percentage.or(existing.percentage);
        let fixed_amount = dto.fixed_amount.or(existing.fixed_amount);
        check_scholarship_terms(kind, percentage, fixed_amount)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;
        check_period(
            dto.start_date.unwrap_or(existing.start_date),
            dto.end_date.or(existing.end_date),
        )?;

        let scholarship = sqlx::query_as::<_, Scholarship>(&format!(
            r#"UPDATE scholarships
               SET kind = $1,
                   source = COALESCE($2, source),
                   percentage = $3,
                   fixed_amount = $4,
                   start_date = COALESCE($5, start_date),
                   end_date = COALESCE($6, end_date),
                   organization = COALESCE($7, organization),
                   reference = COALESCE($8, reference),
                   conditions = COALESCE($9, conditions),
                   observations = COALESCE($10, observations),
                   status = COALESCE($11, status),
                   updated_at = NOW()
               WHERE id = $12
               RETURNING {SCHOLARSHIP_COLUMNS}"#
        ))
        .bind(kind)
        .bind(dto.source)
        .bind(percentage)
        .bind(fixed_amount)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(&dto.organization)
        .bind(&dto.reference)
        .bind(&dto.conditions)
        .bind(&dto.observations)
        .bind(dto.status)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(scholarship)
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: ScholarshipId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM scholarships WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Scholarship not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn suspend(db: &PgPool, id: ScholarshipId) -> Result<Scholarship, AppError> {
        Self::transition(db, id, ScholarshipStatus::Active, ScholarshipStatus::Suspended).await
    }

    #[instrument(skip(db))]
    pub async fn reactivate(db: &PgPool, id: ScholarshipId) -> Result<Scholarship, AppError> {
        Self::transition(db, id, ScholarshipStatus::Suspended, ScholarshipStatus::Active).await
    }

    async fn transition(
        db: &PgPool,
        id: ScholarshipId,
        from: ScholarshipStatus,
        to: ScholarshipStatus,
    ) -> Result<Scholarship, AppError> {
        let existing = Self::get(db, id).await?;
        if existing.status != from {
            return Err(AppError::bad_request(anyhow!(
                "Scholarship is {}, expected {}",
                existing.status,
                from
            )));
        }

        let scholarship = sqlx::query_as::<_, Scholarship>(&format!(
            r#"UPDATE scholarships SET status = $1, updated_at = NOW()
               WHERE id = $2
               RETURNING {SCHOLARSHIP_COLUMNS}"#
        ))
        .bind(to)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(scholarship)
    }
}

fn check_period(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), AppError> {
    match end {
        Some(end) if end < start => Err(AppError::bad_request(anyhow!(
            "end_date must not be before start_date"
        ))),
        _ => Ok(()),
    }
}

// =============================================================================
// Invoices
// =============================================================================

pub struct InvoiceService;

impl InvoiceService {
    /// Bills an enrollment from its tuition fee, less effective scholarships.
    #[instrument(skip(db))]
    pub async fn generate(db: &PgPool, dto: GenerateInvoiceDto) -> Result<InvoiceView, AppError> {
        let mut tx = db.begin().await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(dto.enrollment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        let already_billed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM invoices WHERE enrollment_id = $1)",
        )
        .bind(enrollment.id)
        .fetch_one(&mut *tx)
        .await?;
        if already_billed {
            return Err(AppError::bad_request(anyhow!(
                "An invoice already exists for this enrollment"
            )));
        }

        let fee = sqlx::query_as::<_, TuitionFee>(&format!(
            r#"SELECT {FEE_COLUMNS} FROM tuition_fees
               WHERE program_id = $1 AND academic_year_id = $2 AND level = $3 AND is_active"#
        ))
        .bind(enrollment.program_id)
        .bind(enrollment.academic_year_id)
        .bind(enrollment.level)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(anyhow!(
                "No active tuition fee for this program, year and level"
            ))
        })?;

        let scholarships = sqlx::query_as::<_, Scholarship>(&format!(
            r#"SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships
               WHERE student_id = $1 AND academic_year_id = $2"#
        ))
        .bind(enrollment.student_id)
        .bind(enrollment.academic_year_id)
        .fetch_all(&mut *tx)
        .await?;

        let issued_on = today();
        let reductions: Vec<f64> = scholarships
            .iter()
            .filter(|s| s.is_effective(issued_on))
            .map(|s| s.reduction(fee.total_amount))
            .collect();

        let amount_paid = sqlx::query_scalar::<_, f64>(
            r#"SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM payments
               WHERE enrollment_id = $1 AND status = 'VALIDATED'"#,
        )
        .bind(enrollment.id)
        .fetch_one(&mut *tx)
        .await?;

        let amounts = InvoiceAmounts::compute(fee.total_amount, &reductions, amount_paid);
        let due_date = resolve_due_date(dto.due_date, fee.payment_deadline, issued_on);

        let year = issued_on.year();
        let stem = document_stem(INVOICE_PREFIX, year);
        let sequence = next_in_series(&mut tx, "invoices", "number", &stem).await?;
        let number = document_number(INVOICE_PREFIX, year, sequence);

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"INSERT INTO invoices
                (number, enrollment_id, student_id, academic_year_id, gross_amount,
                 discount_amount, net_amount, amount_paid, status, issued_on, due_date)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING {INVOICE_COLUMNS}"#
        ))
        .bind(&number)
        .bind(enrollment.id)
        .bind(enrollment.student_id)
        .bind(enrollment.academic_year_id)
        .bind(amounts.gross_amount)
        .bind(amounts.discount_amount)
        .bind(amounts.net_amount)
        .bind(amounts.amount_paid)
        .bind(amounts.status)
        .bind(issued_on)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from_db(e, "An invoice already exists for this enrollment", "Invalid reference")
        })?;

        tx.commit().await?;

        info!(number = %invoice.number, net = invoice.net_amount, "Invoice generated");
        Ok(InvoiceView::new(invoice, issued_on))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: InvoiceFilterParams,
    ) -> Result<PaginatedInvoicesResponse, AppError> {
        const WHERE: &str = " WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR student_id = $2)
              AND ($3::UUID IS NULL OR academic_year_id = $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM invoices{WHERE}"))
            .bind(filters.status)
            .bind(filters.student_id)
            .bind(filters.academic_year_id)
            .fetch_one(db)
            .await?;

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices{WHERE} ORDER BY issued_on DESC, number DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.status)
        .bind(filters.student_id)
        .bind(filters.academic_year_id)
        .fetch_all(db)
        .await?;

        Ok(PaginatedInvoicesResponse {
            data: views(invoices),
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: InvoiceId) -> Result<InvoiceView, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Invoice not found")))?;

        Ok(InvoiceView::new(invoice, today()))
    }

    /// UNPAID and PARTIAL invoices, oldest due first.
    #[instrument(skip(db))]
    pub async fn unpaid(db: &PgPool) -> Result<Vec<InvoiceView>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"SELECT {INVOICE_COLUMNS} FROM invoices
               WHERE status IN ('UNPAID', 'PARTIAL')
               ORDER BY due_date, number"#
        ))
        .fetch_all(db)
        .await?;
        Ok(views(invoices))
    }

    #[instrument(skip(db))]
    pub async fn overdue(db: &PgPool) -> Result<OverdueInvoicesResponse, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"SELECT {INVOICE_COLUMNS} FROM invoices
               WHERE status IN ('UNPAID', 'PARTIAL') AND due_date < $1
               ORDER BY due_date, number"#
        ))
        .bind(today())
        .fetch_all(db)
        .await?;

        let total_outstanding =
            campus_core::round2(invoices.iter().map(|i| i.balance).sum::<f64>());
        Ok(OverdueInvoicesResponse {
            count: invoices.len() as i64,
            total_outstanding,
            data: views(invoices),
        })
    }

    #[instrument(skip(db))]
    pub async fn settled(db: &PgPool) -> Result<Vec<InvoiceView>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = 'PAID' ORDER BY updated_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(views(invoices))
    }

    #[instrument(skip(db))]
    pub async fn by_student(db: &PgPool, student_id: StudentId) -> Result<Vec<InvoiceView>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE student_id = $1 ORDER BY issued_on DESC"
        ))
        .bind(student_id)
        .fetch_all(db)
        .await?;
        Ok(views(invoices))
    }

    /// Cancelled invoices are left out of the amounts.
    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<InvoiceStatistics, AppError> {
        let (total, total_billed, total_discounts, total_net, total_collected) =
            sqlx::query_as::<_, (i64, f64, f64, f64, f64)>(
                r#"SELECT COUNT(*),
                          COALESCE(SUM(gross_amount) FILTER (WHERE status <> 'CANCELLED'), 0)::DOUBLE PRECISION,
                          COALESCE(SUM(discount_amount) FILTER (WHERE status <> 'CANCELLED'), 0)::DOUBLE PRECISION,
                          COALESCE(SUM(net_amount) FILTER (WHERE status <> 'CANCELLED'), 0)::DOUBLE PRECISION,
                          COALESCE(SUM(amount_paid) FILTER (WHERE status <> 'CANCELLED'), 0)::DOUBLE PRECISION
                   FROM invoices"#,
            )
            .fetch_one(db)
            .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM invoices GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        Ok(InvoiceStatistics {
            total,
            by_status,
            total_billed: campus_core::round2(total_billed),
            total_discounts: campus_core::round2(total_discounts),
            total_collected: campus_core::round2(total_collected),
            total_outstanding: campus_core::round2((total_net - total_collected).max(0.0)),
            collection_rate: payment_rate(total_net, total_collected),
        })
    }

    /// Paid and cancelled invoices cannot be cancelled.
    #[instrument(skip(db))]
    pub async fn cancel(db: &PgPool, id: InvoiceId) -> Result<InvoiceView, AppError> {
        let existing = Self::get(db, id).await?;
        if existing.invoice.status.is_settled() {
            return Err(AppError::bad_request(anyhow!(
                "Invoice is already {}",
                existing.invoice.status
            )));
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"UPDATE invoices SET status = $1, updated_at = NOW()
               WHERE id = $2
               RETURNING {INVOICE_COLUMNS}"#
        ))
        .bind(InvoiceStatus::Cancelled)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(InvoiceView::new(invoice, today()))
    }

    /// Adds a validated payment to the enrollment's invoice, when one exists.
    pub(crate) async fn credit(
        tx: &mut Transaction<'_, Postgres>,
        enrollment_id: EnrollmentId,
        amount: f64,
    ) -> Result<(), AppError> {
        let invoice = sqlx::query_as::<_, (InvoiceId, f64, f64, InvoiceStatus)>(
            "SELECT id, net_amount, amount_paid, status FROM invoices WHERE enrollment_id = $1 FOR UPDATE",
        )
        .bind(enrollment_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some((id, net_amount, paid, status)) = invoice else {
            return Ok(());
        };

        let amount_paid = campus_core::round2(paid + amount);
        sqlx::query(
            r#"UPDATE invoices SET amount_paid = $1, status = $2, updated_at = NOW()
               WHERE id = $3"#,
        )
        .bind(amount_paid)
        .bind(status.recompute(net_amount, amount_paid))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
