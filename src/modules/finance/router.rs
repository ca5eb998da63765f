use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_invoice, cancel_payment, create_fee, create_payment, create_scholarship, delete_fee,
    delete_scholarship, generate_invoice, get_fee, get_fees, get_invoice, get_invoice_statistics,
    get_invoices, get_invoices_by_student, get_overdue_invoices, get_payment, get_payments,
    get_scholarship, get_scholarships, get_settled_invoices, get_unpaid_invoices,
    reactivate_scholarship, reject_payment, suspend_scholarship, update_fee, update_scholarship,
    validate_payment,
};

pub fn init_fees_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_fee).get(get_fees))
        .route("/{id}", get(get_fee).put(update_fee).delete(delete_fee))
}

pub fn init_payments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment).get(get_payments))
        .route("/{id}", get(get_payment))
        .route("/{id}/validate", post(validate_payment))
        .route("/{id}/reject", post(reject_payment))
        .route("/{id}/cancel", post(cancel_payment))
}

pub fn init_scholarships_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_scholarship).get(get_scholarships))
        .route(
            "/{id}",
            get(get_scholarship)
                .put(update_scholarship)
                .delete(delete_scholarship),
        )
        .route("/{id}/suspend", post(suspend_scholarship))
        .route("/{id}/reactivate", post(reactivate_scholarship))
}

pub fn init_invoices_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_invoices))
        .route("/generate", post(generate_invoice))
        .route("/unpaid", get(get_unpaid_invoices))
        .route("/overdue", get(get_overdue_invoices))
        .route("/settled", get(get_settled_invoices))
        .route("/statistics", get(get_invoice_statistics))
        .route("/by-student/{student_id}", get(get_invoices_by_student))
        .route("/{id}", get(get_invoice))
        .route("/{id}/cancel", post(cancel_invoice))
}
