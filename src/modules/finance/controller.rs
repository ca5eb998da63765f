use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{FeeId, InvoiceId, PaymentId, ScholarshipId, StudentId};

use crate::middleware::auth::{RequireFinanceRead, RequireFinanceWrite, RequirePaymentsValidate};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    CreateFeeDto, CreatePaymentDto, CreateScholarshipDto, FeeFilterParams, GenerateInvoiceDto,
    InvoiceFilterParams, InvoiceStatistics, InvoiceView, OverdueInvoicesResponse,
    PaginatedFeesResponse, PaginatedInvoicesResponse, PaginatedPaymentsResponse,
    PaginatedScholarshipsResponse, Payment, PaymentFilterParams, RejectPaymentDto, Scholarship,
    ScholarshipFilterParams, TuitionFee, UpdateFeeDto, UpdateScholarshipDto,
};
use super::service::{FeeService, InvoiceService, PaymentService, ScholarshipService};

// =============================================================================
// Tuition fees
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/fees",
    request_body = CreateFeeDto,
    responses(
        (status = 201, description = "Tuition fee created", body = TuitionFee),
        (status = 400, description = "A fee already exists for this program, year and level")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_fee(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    ValidatedJson(dto): ValidatedJson<CreateFeeDto>,
) -> Result<(StatusCode, Json<TuitionFee>), AppError> {
    let fee = FeeService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

#[utoipa::path(
    get,
    path = "/api/fees",
    params(FeeFilterParams),
    responses((status = 200, description = "Tuition fees", body = PaginatedFeesResponse)),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_fees(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Query(filters): Query<FeeFilterParams>,
) -> Result<Json<PaginatedFeesResponse>, AppError> {
    Ok(Json(FeeService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/fees/{id}",
    params(("id" = String, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Tuition fee", body = TuitionFee),
        (status = 404, description = "Tuition fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_fee(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Path(id): Path<FeeId>,
) -> Result<Json<TuitionFee>, AppError> {
    Ok(Json(FeeService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/fees/{id}",
    params(("id" = String, Path, description = "Fee ID")),
    request_body = UpdateFeeDto,
    responses(
        (status = 200, description = "Tuition fee updated", body = TuitionFee),
        (status = 404, description = "Tuition fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_fee(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<FeeId>,
    ValidatedJson(dto): ValidatedJson<UpdateFeeDto>,
) -> Result<Json<TuitionFee>, AppError> {
    Ok(Json(FeeService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/fees/{id}",
    params(("id" = String, Path, description = "Fee ID")),
    responses(
        (status = 204, description = "Tuition fee deleted"),
        (status = 404, description = "Tuition fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_fee(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<FeeId>,
) -> Result<StatusCode, AppError> {
    FeeService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Payments
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentDto,
    responses(
        (status = 201, description = "Payment recorded as pending", body = Payment),
        (status = 400, description = "Enrollment does not exist")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_payment(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    ValidatedJson(dto): ValidatedJson<CreatePaymentDto>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment = PaymentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    params(PaymentFilterParams),
    responses((status = 200, description = "Payments, most recent first", body = PaginatedPaymentsResponse)),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_payments(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Query(filters): Query<PaymentFilterParams>,
) -> Result<Json<PaginatedPaymentsResponse>, AppError> {
    Ok(Json(PaymentService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = Payment),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_payment(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, AppError> {
    Ok(Json(PaymentService::get(&state.db, id).await?))
}

/// Validate a pending payment and credit the enrollment and its invoice
#[utoipa::path(
    post,
    path = "/api/payments/{id}/validate",
    params(("id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment validated", body = Payment),
        (status = 400, description = "Payment is not pending"),
        (status = 403, description = "Forbidden - requires payments:validate permission"),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn validate_payment(
    State(state): State<AppState>,
    RequirePaymentsValidate(auth_user): RequirePaymentsValidate,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, AppError> {
    Ok(Json(
        PaymentService::validate(&state.db, id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/reject",
    params(("id" = String, Path, description = "Payment ID")),
    request_body = RejectPaymentDto,
    responses(
        (status = 200, description = "Payment rejected", body = Payment),
        (status = 400, description = "Payment is not pending"),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn reject_payment(
    State(state): State<AppState>,
    RequirePaymentsValidate(_auth_user): RequirePaymentsValidate,
    Path(id): Path<PaymentId>,
    ValidatedJson(dto): ValidatedJson<RejectPaymentDto>,
) -> Result<Json<Payment>, AppError> {
    Ok(Json(PaymentService::reject(&state.db, id, dto.reason).await?))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/cancel",
    params(("id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment cancelled", body = Payment),
        (status = 400, description = "Payment is not pending"),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_payment(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, AppError> {
    Ok(Json(PaymentService::cancel(&state.db, id).await?))
}

// =============================================================================
// Scholarships
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/scholarships",
    request_body = CreateScholarshipDto,
    responses(
        (status = 201, description = "Scholarship granted", body = Scholarship),
        (status = 400, description = "Missing percentage or amount for the kind")
    ),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_scholarship(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    ValidatedJson(dto): ValidatedJson<CreateScholarshipDto>,
) -> Result<(StatusCode, Json<Scholarship>), AppError> {
    let scholarship = ScholarshipService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(scholarship)))
}

#[utoipa::path(
    get,
    path = "/api/scholarships",
    params(ScholarshipFilterParams),
    responses((status = 200, description = "Scholarships", body = PaginatedScholarshipsResponse)),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_scholarships(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Query(filters): Query<ScholarshipFilterParams>,
) -> Result<Json<PaginatedScholarshipsResponse>, AppError> {
    Ok(Json(ScholarshipService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/scholarships/{id}",
    params(("id" = String, Path, description = "Scholarship ID")),
    responses(
        (status = 200, description = "Scholarship", body = Scholarship),
        (status = 404, description = "Scholarship not found")
    ),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_scholarship(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Path(id): Path<ScholarshipId>,
) -> Result<Json<Scholarship>, AppError> {
    Ok(Json(ScholarshipService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/scholarships/{id}",
    params(("id" = String, Path, description = "Scholarship ID")),
    request_body = UpdateScholarshipDto,
    responses(
        (status = 200, description = "Scholarship updated", body = Scholarship),
        (status = 400, description = "Missing percentage or amount for the kind"),
        (status = 404, description = "Scholarship not found")
    ),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_scholarship(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<ScholarshipId>,
    ValidatedJson(dto): ValidatedJson<UpdateScholarshipDto>,
) -> Result<Json<Scholarship>, AppError> {
    Ok(Json(ScholarshipService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/scholarships/{id}",
    params(("id" = String, Path, description = "Scholarship ID")),
    responses(
        (status = 204, description = "Scholarship deleted"),
        (status = 404, description = "Scholarship not found")
    ),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_scholarship(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<ScholarshipId>,
) -> Result<StatusCode, AppError> {
    ScholarshipService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/scholarships/{id}/suspend",
    params(("id" = String, Path, description = "Scholarship ID")),
    responses(
        (status = 200, description = "Scholarship suspended", body = Scholarship),
        (status = 400, description = "Scholarship is not active"),
        (status = 404, description = "Scholarship not found")
    ),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn suspend_scholarship(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<ScholarshipId>,
) -> Result<Json<Scholarship>, AppError> {
    Ok(Json(ScholarshipService::suspend(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/scholarships/{id}/reactivate",
    params(("id" = String, Path, description = "Scholarship ID")),
    responses(
        (status = 200, description = "Scholarship active again", body = Scholarship),
        (status = 400, description = "Scholarship is not suspended"),
        (status = 404, description = "Scholarship not found")
    ),
    tag = "Scholarships",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn reactivate_scholarship(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<ScholarshipId>,
) -> Result<Json<Scholarship>, AppError> {
    Ok(Json(ScholarshipService::reactivate(&state.db, id).await?))
}

// =============================================================================
// Invoices
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/invoices/generate",
    request_body = GenerateInvoiceDto,
    responses(
        (status = 201, description = "Invoice issued", body = InvoiceView),
        (status = 400, description = "No matching fee, or enrollment already invoiced"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn generate_invoice(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    ValidatedJson(dto): ValidatedJson<GenerateInvoiceDto>,
) -> Result<(StatusCode, Json<InvoiceView>), AppError> {
    let invoice = InvoiceService::generate(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/invoices",
    params(InvoiceFilterParams),
    responses((status = 200, description = "Invoices", body = PaginatedInvoicesResponse)),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_invoices(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Query(filters): Query<InvoiceFilterParams>,
) -> Result<Json<PaginatedInvoicesResponse>, AppError> {
    Ok(Json(InvoiceService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/unpaid",
    responses((status = 200, description = "Unpaid and partially paid invoices", body = Vec<InvoiceView>)),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_unpaid_invoices(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
) -> Result<Json<Vec<InvoiceView>>, AppError> {
    Ok(Json(InvoiceService::unpaid(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/overdue",
    responses((status = 200, description = "Invoices past due with the total outstanding", body = OverdueInvoicesResponse)),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_overdue_invoices(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
) -> Result<Json<OverdueInvoicesResponse>, AppError> {
    Ok(Json(InvoiceService::overdue(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/settled",
    responses((status = 200, description = "Fully paid invoices", body = Vec<InvoiceView>)),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_settled_invoices(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
) -> Result<Json<Vec<InvoiceView>>, AppError> {
    Ok(Json(InvoiceService::settled(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/statistics",
    responses((status = 200, description = "Billing and collection totals", body = InvoiceStatistics)),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_invoice_statistics(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
) -> Result<Json<InvoiceStatistics>, AppError> {
    Ok(Json(InvoiceService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/by-student/{student_id}",
    params(("student_id" = String, Path, description = "Student ID")),
    responses((status = 200, description = "The student's invoices", body = Vec<InvoiceView>)),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_invoices_by_student(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Path(student_id): Path<StudentId>,
) -> Result<Json<Vec<InvoiceView>>, AppError> {
    Ok(Json(InvoiceService::by_student(&state.db, student_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceView),
        (status = 404, description = "Invoice not found")
    ),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    RequireFinanceRead(_auth_user): RequireFinanceRead,
    Path(id): Path<InvoiceId>,
) -> Result<Json<InvoiceView>, AppError> {
    Ok(Json(InvoiceService::get(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/invoices/{id}/cancel",
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice cancelled", body = InvoiceView),
        (status = 400, description = "Invoice already paid or cancelled"),
        (status = 404, description = "Invoice not found")
    ),
    tag = "Invoices",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    RequireFinanceWrite(_auth_user): RequireFinanceWrite,
    Path(id): Path<InvoiceId>,
) -> Result<Json<InvoiceView>, AppError> {
    Ok(Json(InvoiceService::cancel(&state.db, id).await?))
}
