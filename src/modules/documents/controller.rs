use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{DocumentId, TemplateId};

use crate::middleware::auth::{AuthUser, RequireDocumentsRead, RequireDocumentsWrite};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    CreateDocumentDto, CreateTemplateDto, Document, DocumentFilterParams, DocumentStatistics,
    DocumentTemplate, DuplicateTemplateDto, PaginatedDocumentsResponse,
    PaginatedTemplatesResponse, PreviewTemplateDto, RequestDocumentDto, TemplateFilterParams,
    TemplatePreview, UpdateTemplateDto, VerificationResponse, VerifyDocumentDto,
};
use super::service::{DocumentService, TemplateService};

// =============================================================================
// Templates
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/document-templates",
    request_body = CreateTemplateDto,
    responses(
        (status = 201, description = "Template created", body = DocumentTemplate),
        (status = 400, description = "A template already exists for this document type")
    ),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_template(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    ValidatedJson(dto): ValidatedJson<CreateTemplateDto>,
) -> Result<(StatusCode, Json<DocumentTemplate>), AppError> {
    let template = TemplateService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/document-templates",
    params(TemplateFilterParams),
    responses((status = 200, description = "Templates", body = PaginatedTemplatesResponse)),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_templates(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
    Query(filters): Query<TemplateFilterParams>,
) -> Result<Json<PaginatedTemplatesResponse>, AppError> {
    Ok(Json(TemplateService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/document-templates/active",
    responses((status = 200, description = "Active templates", body = Vec<DocumentTemplate>)),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_active_templates(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
) -> Result<Json<Vec<DocumentTemplate>>, AppError> {
    Ok(Json(TemplateService::active(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/document-templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template", body = DocumentTemplate),
        (status = 404, description = "Template not found")
    ),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
    Path(id): Path<TemplateId>,
) -> Result<Json<DocumentTemplate>, AppError> {
    Ok(Json(TemplateService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/document-templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    request_body = UpdateTemplateDto,
    responses(
        (status = 200, description = "Template updated", body = DocumentTemplate),
        (status = 404, description = "Template not found")
    ),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_template(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    Path(id): Path<TemplateId>,
    ValidatedJson(dto): ValidatedJson<UpdateTemplateDto>,
) -> Result<Json<DocumentTemplate>, AppError> {
    Ok(Json(TemplateService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/document-templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found")
    ),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_template(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    Path(id): Path<TemplateId>,
) -> Result<StatusCode, AppError> {
    TemplateService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Render a template with sample data and optional overrides
#[utoipa::path(
    post,
    path = "/api/document-templates/{id}/preview",
    params(("id" = String, Path, description = "Template ID")),
    request_body = PreviewTemplateDto,
    responses(
        (status = 200, description = "Rendered HTML", body = TemplatePreview),
        (status = 404, description = "Template not found")
    ),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn preview_template(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
    Path(id): Path<TemplateId>,
    ValidatedJson(dto): ValidatedJson<PreviewTemplateDto>,
) -> Result<Json<TemplatePreview>, AppError> {
    Ok(Json(TemplateService::preview(&state.db, id, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/document-templates/{id}/duplicate",
    params(("id" = String, Path, description = "Template ID")),
    request_body = DuplicateTemplateDto,
    responses(
        (status = 201, description = "Inactive copy created", body = DocumentTemplate),
        (status = 400, description = "A template already exists for the target type"),
        (status = 404, description = "Template not found")
    ),
    tag = "Document Templates",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn duplicate_template(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    Path(id): Path<TemplateId>,
    ValidatedJson(dto): ValidatedJson<DuplicateTemplateDto>,
) -> Result<(StatusCode, Json<DocumentTemplate>), AppError> {
    let template = TemplateService::duplicate(&state.db, id, dto).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

// =============================================================================
// Documents
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/documents",
    request_body = CreateDocumentDto,
    responses(
        (status = 201, description = "Draft document created", body = Document),
        (status = 400, description = "A referenced record does not exist")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_document(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    ValidatedJson(dto): ValidatedJson<CreateDocumentDto>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let document = DocumentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/documents",
    params(DocumentFilterParams),
    responses((status = 200, description = "Documents, latest first", body = PaginatedDocumentsResponse)),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_documents(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
    Query(filters): Query<DocumentFilterParams>,
) -> Result<Json<PaginatedDocumentsResponse>, AppError> {
    Ok(Json(DocumentService::list(&state.db, filters).await?))
}

/// Ask for a document as the signed-in student
#[utoipa::path(
    post,
    path = "/api/documents/request",
    request_body = RequestDocumentDto,
    responses(
        (status = 201, description = "Request recorded as a draft", body = Document),
        (status = 404, description = "No student profile for this account")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn request_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<RequestDocumentDto>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let document = DocumentService::request(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/documents/mine",
    responses((status = 200, description = "The signed-in student's documents", body = Vec<Document>)),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_documents(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(DocumentService::mine(&state.db, auth_user.user_id()?).await?))
}

#[utoipa::path(
    get,
    path = "/api/documents/pending",
    responses((status = 200, description = "Drafts awaiting generation", body = Vec<Document>)),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_pending_documents(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(DocumentService::pending(&state.db).await?))
}

/// Check a document's authenticity. No authentication required.
#[utoipa::path(
    post,
    path = "/api/documents/verify",
    request_body = VerifyDocumentDto,
    responses((status = 200, description = "Verification outcome", body = VerificationResponse)),
    tag = "Documents"
)]
#[instrument(skip(state))]
pub async fn verify_document(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<VerifyDocumentDto>,
) -> Result<Json<VerificationResponse>, AppError> {
    Ok(Json(DocumentService::verify(&state.db, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/documents/statistics",
    responses((status = 200, description = "Counts by status and type", body = DocumentStatistics)),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_document_statistics(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
) -> Result<Json<DocumentStatistics>, AppError> {
    Ok(Json(DocumentService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document", body = Document),
        (status = 404, description = "Document not found")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_document(
    State(state): State<AppState>,
    RequireDocumentsRead(_auth_user): RequireDocumentsRead,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(DocumentService::get(&state.db, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_document(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    Path(id): Path<DocumentId>,
) -> Result<StatusCode, AppError> {
    DocumentService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Render the document from the active template of its type
#[utoipa::path(
    post,
    path = "/api/documents/{id}/generate",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document generated", body = Document),
        (status = 400, description = "Already generated, or no active template"),
        (status = 404, description = "Document not found")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn generate_document(
    State(state): State<AppState>,
    RequireDocumentsWrite(auth_user): RequireDocumentsWrite,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(
        DocumentService::generate(&state.db, id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/documents/{id}/deliver",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document delivered", body = Document),
        (status = 400, description = "Document is not generated"),
        (status = 404, description = "Document not found")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn deliver_document(
    State(state): State<AppState>,
    RequireDocumentsWrite(auth_user): RequireDocumentsWrite,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(
        DocumentService::deliver(&state.db, id, auth_user.user_id()?).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/documents/{id}/cancel",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document cancelled", body = Document),
        (status = 400, description = "Document delivered or already cancelled"),
        (status = 404, description = "Document not found")
    ),
    tag = "Documents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_document(
    State(state): State<AppState>,
    RequireDocumentsWrite(_auth_user): RequireDocumentsWrite,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(DocumentService::cancel(&state.db, id).await?))
}
