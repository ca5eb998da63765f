use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{DecisionId, DeliberationId, JuryMemberId};

use crate::middleware::auth::{
    RequireDeliberationsRead, RequireDeliberationsValidate, RequireDeliberationsWrite,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    AddJuryMemberDto, CreateDeliberationDto, DecisionsResponse, DeliberationFilterParams,
    DeliberationSession, GenerateDecisionsDto, GenerateDecisionsResponse, JuryDecision,
    JuryMember, PaginatedDeliberationsResponse, UpdateDecisionDto, UpdateDeliberationDto,
};
use super::service::DeliberationService;

#[utoipa::path(
    post,
    path = "/api/deliberations",
    request_body = CreateDeliberationDto,
    responses(
        (status = 201, description = "Session planned", body = DeliberationSession),
        (status = 400, description = "A session already exists for this year, program, level and semester")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_deliberation(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    ValidatedJson(dto): ValidatedJson<CreateDeliberationDto>,
) -> Result<(StatusCode, Json<DeliberationSession>), AppError> {
    let session = DeliberationService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/deliberations",
    params(DeliberationFilterParams),
    responses((status = 200, description = "Sessions, latest first", body = PaginatedDeliberationsResponse)),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_deliberations(
    State(state): State<AppState>,
    RequireDeliberationsRead(_auth_user): RequireDeliberationsRead,
    Query(filters): Query<DeliberationFilterParams>,
) -> Result<Json<PaginatedDeliberationsResponse>, AppError> {
    Ok(Json(DeliberationService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/deliberations/{id}",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session", body = DeliberationSession),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_deliberation(
    State(state): State<AppState>,
    RequireDeliberationsRead(_auth_user): RequireDeliberationsRead,
    Path(id): Path<DeliberationId>,
) -> Result<Json<DeliberationSession>, AppError> {
    Ok(Json(DeliberationService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/deliberations/{id}",
    params(("id" = String, Path, description = "Session ID")),
    request_body = UpdateDeliberationDto,
    responses(
        (status = 200, description = "Session updated", body = DeliberationSession),
        (status = 400, description = "Session already validated"),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_deliberation(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path(id): Path<DeliberationId>,
    ValidatedJson(dto): ValidatedJson<UpdateDeliberationDto>,
) -> Result<Json<DeliberationSession>, AppError> {
    Ok(Json(DeliberationService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/deliberations/{id}",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 400, description = "Session already validated"),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_deliberation(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path(id): Path<DeliberationId>,
) -> Result<StatusCode, AppError> {
    DeliberationService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/deliberations/{id}/decisions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Decisions by rank with success rate", body = DecisionsResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_decisions(
    State(state): State<AppState>,
    RequireDeliberationsRead(_auth_user): RequireDeliberationsRead,
    Path(id): Path<DeliberationId>,
) -> Result<Json<DecisionsResponse>, AppError> {
    Ok(Json(DeliberationService::decisions(&state.db, id).await?))
}

/// Derive decisions from the results of the session's enrolled students
#[utoipa::path(
    post,
    path = "/api/deliberations/{id}/generate-decisions",
    params(("id" = String, Path, description = "Session ID")),
    request_body(content = GenerateDecisionsDto, description = "Optional. Thresholds default to 10 and 7"),
    responses(
        (status = 200, description = "Decisions generated and ranked", body = GenerateDecisionsResponse),
        (status = 400, description = "Session already validated"),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn generate_decisions(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path(id): Path<DeliberationId>,
    body: Option<ValidatedJson<GenerateDecisionsDto>>,
) -> Result<Json<GenerateDecisionsResponse>, AppError> {
    let dto = body.map(|ValidatedJson(dto)| dto).unwrap_or_default();
    Ok(Json(
        DeliberationService::generate_decisions(&state.db, id, dto).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/deliberations/decisions/{decision_id}",
    params(("decision_id" = String, Path, description = "Decision ID")),
    request_body = UpdateDecisionDto,
    responses(
        (status = 200, description = "Decision overridden", body = JuryDecision),
        (status = 400, description = "Session already validated"),
        (status = 404, description = "Decision not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_decision(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path(decision_id): Path<DecisionId>,
    ValidatedJson(dto): ValidatedJson<UpdateDecisionDto>,
) -> Result<Json<JuryDecision>, AppError> {
    Ok(Json(
        DeliberationService::update_decision(&state.db, decision_id, dto).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/deliberations/{id}/close",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session closed", body = DeliberationSession),
        (status = 400, description = "Session already validated"),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn close_deliberation(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path(id): Path<DeliberationId>,
) -> Result<Json<DeliberationSession>, AppError> {
    Ok(Json(DeliberationService::close(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/deliberations/{id}/validate",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session validated", body = DeliberationSession),
        (status = 400, description = "Session is not closed"),
        (status = 403, description = "Forbidden - requires deliberations:validate permission"),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn validate_deliberation(
    State(state): State<AppState>,
    RequireDeliberationsValidate(_auth_user): RequireDeliberationsValidate,
    Path(id): Path<DeliberationId>,
) -> Result<Json<DeliberationSession>, AppError> {
    Ok(Json(DeliberationService::validate(&state.db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/deliberations/{id}/jury",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Jury members", body = Vec<JuryMember>),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_jury(
    State(state): State<AppState>,
    RequireDeliberationsRead(_auth_user): RequireDeliberationsRead,
    Path(id): Path<DeliberationId>,
) -> Result<Json<Vec<JuryMember>>, AppError> {
    Ok(Json(DeliberationService::jury(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/deliberations/{id}/jury",
    params(("id" = String, Path, description = "Session ID")),
    request_body = AddJuryMemberDto,
    responses(
        (status = 201, description = "Member added", body = JuryMember),
        (status = 400, description = "Teacher already on the jury"),
        (status = 404, description = "Session not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn add_jury_member(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path(id): Path<DeliberationId>,
    ValidatedJson(dto): ValidatedJson<AddJuryMemberDto>,
) -> Result<(StatusCode, Json<JuryMember>), AppError> {
    let member = DeliberationService::add_jury_member(&state.db, id, dto).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/api/deliberations/{id}/jury/{member_id}",
    params(
        ("id" = String, Path, description = "Session ID"),
        ("member_id" = String, Path, description = "Jury member ID")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 404, description = "Jury member not found")
    ),
    tag = "Deliberations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn remove_jury_member(
    State(state): State<AppState>,
    RequireDeliberationsWrite(_auth_user): RequireDeliberationsWrite,
    Path((id, member_id)): Path<(DeliberationId, JuryMemberId)>,
) -> Result<StatusCode, AppError> {
    DeliberationService::remove_jury_member(&state.db, id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
