use axum::{Json, extract::State};
use tracing::instrument;

use campus_core::AppError;

use crate::middleware::auth::RequireRolesRead;
use crate::state::AppState;

use super::model::RoleWithPermissions;
use super::service;

#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "Roles with their permission names", body = Vec<RoleWithPermissions>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires roles:read permission")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_roles(
    State(state): State<AppState>,
    RequireRolesRead(_auth_user): RequireRolesRead,
) -> Result<Json<Vec<RoleWithPermissions>>, AppError> {
    let roles = service::get_roles(&state.db).await?;
    Ok(Json(roles))
}
