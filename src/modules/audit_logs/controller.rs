use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use campus_core::AppError;

use crate::middleware::auth::RequireAuditRead;
use crate::state::AppState;

use super::model::{AuditLogFilterParams, PaginatedAuditLogsResponse};
use super::service::AuditService;

#[utoipa::path(
    get,
    path = "/api/audit-logs",
    params(AuditLogFilterParams),
    responses(
        (status = 200, description = "Audit entries, newest first", body = PaginatedAuditLogsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires audit:read permission")
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_audit_logs(
    State(state): State<AppState>,
    RequireAuditRead(_auth_user): RequireAuditRead,
    Query(filters): Query<AuditLogFilterParams>,
) -> Result<Json<PaginatedAuditLogsResponse>, AppError> {
    let logs = AuditService::get_audit_logs(&state.db, filters).await?;
    Ok(Json(logs))
}
