use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::modules::academic::{
    init_academic_years_router, init_departments_router, init_faculties_router,
    init_programs_router, init_subjects_router,
};
use crate::modules::audit_logs::init_audit_logs_router;
use crate::modules::auth::init_auth_router;
use crate::modules::communications::{
    init_announcements_router, init_messages_router, init_notification_preferences_router,
    init_notifications_router,
};
use crate::modules::deliberations::init_deliberations_router;
use crate::modules::documents::{init_document_templates_router, init_documents_router};
use crate::modules::evaluations::{
    init_evaluation_types_router, init_evaluations_router, init_grades_router,
    init_results_router,
};
use crate::modules::finance::{
    init_fees_router, init_invoices_router, init_payments_router, init_scholarships_router,
};
use crate::modules::resources::{
    init_equipment_router, init_maintenances_router, init_reservations_router,
};
use crate::modules::roles::init_roles_router;
use crate::modules::schedule::{
    init_buildings_router, init_conflicts_router, init_courses_router, init_rooms_router,
    init_time_slots_router,
};
use crate::modules::students::{init_enrollments_router, init_students_router};
use crate::modules::teachers::{init_assignments_router, init_teachers_router};
use crate::modules::users::init_users_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

/// Every feature router, nested under `/api`.
fn api_router() -> Router<AppState> {
    Router::new()
        // users, roles, audit
        .nest("/auth", init_auth_router())
        .nest("/users", init_users_router())
        .nest("/roles", init_roles_router())
        .nest("/audit-logs", init_audit_logs_router())
        // academic structure
        .nest("/academic-years", init_academic_years_router())
        .nest("/faculties", init_faculties_router())
        .nest("/departments", init_departments_router())
        .nest("/programs", init_programs_router())
        .nest("/subjects", init_subjects_router())
        // people
        .nest("/students", init_students_router())
        .nest("/enrollments", init_enrollments_router())
        .nest("/teachers", init_teachers_router())
        .nest("/assignments", init_assignments_router())
        // evaluations
        .nest("/evaluation-types", init_evaluation_types_router())
        .nest("/evaluations", init_evaluations_router())
        .nest("/grades", init_grades_router())
        .nest("/results", init_results_router())
        .nest("/deliberations", init_deliberations_router())
        // schedule
        .nest("/buildings", init_buildings_router())
        .nest("/rooms", init_rooms_router())
        .nest("/time-slots", init_time_slots_router())
        .nest("/courses", init_courses_router())
        .nest("/conflicts", init_conflicts_router())
        // finance
        .nest("/fees", init_fees_router())
        .nest("/payments", init_payments_router())
        .nest("/scholarships", init_scholarships_router())
        .nest("/invoices", init_invoices_router())
        // documents
        .nest("/document-templates", init_document_templates_router())
        .nest("/documents", init_documents_router())
        // communications
        .nest("/announcements", init_announcements_router())
        .nest("/notifications", init_notifications_router())
        .nest("/messages", init_messages_router())
        .nest(
            "/notification-preferences",
            init_notification_preferences_router(),
        )
        // resources
        .nest("/equipment", init_equipment_router())
        .nest("/reservations", init_reservations_router())
        .nest("/maintenances", init_maintenances_router())
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

pub fn init_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest("/api", api_router())
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
