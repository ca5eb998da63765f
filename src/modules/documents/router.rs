use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_document, create_document, create_template, delete_document, delete_template,
    deliver_document, duplicate_template, generate_document, get_active_templates, get_document,
    get_document_statistics, get_documents, get_my_documents, get_pending_documents,
    get_template, get_templates, preview_template, request_document, update_template,
    verify_document,
};

pub fn init_document_templates_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_template).get(get_templates))
        .route("/active", get(get_active_templates))
        .route(
            "/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/{id}/preview", post(preview_template))
        .route("/{id}/duplicate", post(duplicate_template))
}

pub fn init_documents_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_document).get(get_documents))
        .route("/request", post(request_document))
        .route("/mine", get(get_my_documents))
        .route("/pending", get(get_pending_documents))
        .route("/verify", post(verify_document))
        .route("/statistics", get(get_document_statistics))
        .route("/{id}", get(get_document).delete(delete_document))
        .route("/{id}/generate", post(generate_document))
        .route("/{id}/deliver", post(deliver_document))
        .route("/{id}/cancel", post(cancel_document))
}
