use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::LabelCount;
use campus_models::ids::{DocumentId, StudentId, TemplateId, UserId};
use campus_models::numbering::{document_number, document_stem};

use crate::metrics;
use crate::modules::sequence::next_in_series;

use super::model::{
    CreateDocumentDto, CreateTemplateDto, Document, DocumentFilterParams, DocumentStatistics,
    DocumentStatus, DocumentTemplate, DocumentType, DuplicateTemplateDto,
    PaginatedDocumentsResponse, PaginatedTemplatesResponse, PreviewTemplateDto,
    RequestDocumentDto, TemplateContext, TemplateFilterParams, TemplatePreview,
    UpdateTemplateDto, VerificationResponse, VerifiedDocument, VerifyDocumentDto,
    context_from_json, sample_context, verification_code,
};

const TEMPLATE_COLUMNS: &str = "id, document_type, name, description, body_html, styles_css, \
     header_html, footer_html, watermark, is_active, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, number, document_type, student_id, enrollment_id, result_id, \
     payment_id, status, content_html, generated_by, generated_at, delivered_by, delivered_at, \
     verification_code, request_reason, observations, created_at, updated_at";

// =============================================================================
// Templates
// =============================================================================

pub struct TemplateService;

impl TemplateService {
    #[instrument(skip(db, dto))]
    pub async fn create(db: &PgPool, dto: CreateTemplateDto) -> Result<DocumentTemplate, AppError> {
        sqlx::query_as::<_, DocumentTemplate>(&format!(
            r#"INSERT INTO document_templates
                (document_type, name, description, body_html, styles_css, header_html,
                 footer_html, watermark, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(dto.document_type)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.body_html)
        .bind(&dto.styles_css)
        .bind(&dto.header_html)
        .bind(&dto.footer_html)
        .bind(&dto.watermark)
        .bind(dto.is_active)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A template already exists for this document type", "Invalid reference")
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: TemplateFilterParams,
    ) -> Result<PaginatedTemplatesResponse, AppError> {
        const WHERE: &str = " WHERE ($1::TEXT IS NULL OR document_type = $1)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM document_templates{WHERE}"
        ))
        .bind(filters.document_type)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, DocumentTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM document_templates{WHERE} ORDER BY document_type{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.document_type)
        .fetch_all(db)
        .await?;

        Ok(PaginatedTemplatesResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn active(db: &PgPool) -> Result<Vec<DocumentTemplate>, AppError> {
        let templates = sqlx::query_as::<_, DocumentTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM document_templates WHERE is_active ORDER BY document_type"
        ))
        .fetch_all(db)
        .await?;
        Ok(templates)
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: TemplateId) -> Result<DocumentTemplate, AppError> {
        sqlx::query_as::<_, DocumentTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM document_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Template not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        id: TemplateId,
        dto: UpdateTemplateDto,
    ) -> Result<DocumentTemplate, AppError> {
        sqlx::query_as::<_, DocumentTemplate>(&format!(
            r#"UPDATE document_templates
               SET name = COALESCE($1, name),
                   description = COALESCE($2, description),
                   body_html = COALESCE($3, body_html),
                   styles_css = COALESCE($4, styles_css),
                   header_html = COALESCE($5, header_html),
                   footer_html = COALESCE($6, footer_html),
                   watermark = COALESCE($7, watermark),
                   is_active = COALESCE($8, is_active),
                   updated_at = NOW()
               WHERE id = $9
               RETURNING {TEMPLATE_COLUMNS}"#
        ))
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.body_html)
        .bind(&dto.styles_css)
        .bind(&dto.header_html)
        .bind(&dto.footer_html)
        .bind(&dto.watermark)
        .bind(dto.is_active)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Template not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: TemplateId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM document_templates WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Template not found")));
        }
        Ok(())
    }

    /// Renders with the sample data, overridden by any supplied values.
    #[instrument(skip(db, dto))]
    pub async fn preview(
        db: &PgPool,
        id: TemplateId,
        dto: PreviewTemplateDto,
    ) -> Result<TemplatePreview, AppError> {
        let template = Self::get(db, id).await?;

        let mut context = sample_context();
        if let Some(values) = &dto.context {
            context.extend(context_from_json(values));
        }

        Ok(TemplatePreview {
            html: template.render(&context),
        })
    }

    /// The copy starts inactive under the new document type.
    #[instrument(skip(db))]
    pub async fn duplicate(
        db: &PgPool,
        id: TemplateId,
        dto: DuplicateTemplateDto,
    ) -> Result<DocumentTemplate, AppError> {
        let source = Self::get(db, id).await?;
        let name = dto
            .name
            .unwrap_or_else(|| format!("{} (copy)", source.name));

        Self::create(
            db,
            CreateTemplateDto {
                document_type: dto.document_type,
                name,
                description: source.description,
                body_html: source.body_html,
                styles_css: source.styles_css,
                header_html: source.header_html,
                footer_html: source.footer_html,
                watermark: source.watermark,
                is_active: false,
            },
        )
        .await
    }
}

// =============================================================================
// Documents
// =============================================================================

pub struct DocumentService;

impl DocumentService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateDocumentDto) -> Result<Document, AppError> {
        let mut tx = db.begin().await?;
        let document = insert_draft(&mut tx, dto).await?;
        tx.commit().await?;
        Ok(document)
    }

    /// A student asking for one of their own documents.
    #[instrument(skip(db))]
    pub async fn request(
        db: &PgPool,
        user_id: UserId,
        dto: RequestDocumentDto,
    ) -> Result<Document, AppError> {
        let student_id = student_of_user(db, user_id).await?;

        let mut tx = db.begin().await?;
        let document = insert_draft(
            &mut tx,
            CreateDocumentDto {
                student_id,
                document_type: dto.document_type,
                enrollment_id: dto.enrollment_id,
                result_id: None,
                payment_id: None,
                request_reason: dto.request_reason,
                observations: None,
            },
        )
        .await?;
        tx.commit().await?;

        info!(number = %document.number, "Document requested");
        Ok(document)
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: DocumentFilterParams,
    ) -> Result<PaginatedDocumentsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR student_id = $1)
              AND ($2::TEXT IS NULL OR document_type = $2)
              AND ($3::TEXT IS NULL OR status = $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM documents{WHERE}"))
            .bind(filters.student_id)
            .bind(filters.document_type)
            .bind(filters.status)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.student_id)
        .bind(filters.document_type)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(PaginatedDocumentsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn mine(db: &PgPool, user_id: UserId) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            r#"SELECT {DOCUMENT_COLUMNS} FROM documents
               WHERE student_id IN (SELECT id FROM students WHERE user_id = $1)
               ORDER BY created_at DESC"#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(documents)
    }

    /// Drafts waiting to be generated, oldest first.
    #[instrument(skip(db))]
    pub async fn pending(db: &PgPool) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE status = 'DRAFT' ORDER BY created_at"
        ))
        .fetch_all(db)
        .await?;
        Ok(documents)
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: DocumentId) -> Result<Document, AppError> {
        sqlx::query_as::<_, Document>(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Document not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: DocumentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Document not found")));
        }
        Ok(())
    }

    /// Renders the active template of the document's type and seals the result
    /// with a verification code.
    #[instrument(skip(db))]
    pub async fn generate(
        db: &PgPool,
        id: DocumentId,
        generated_by: UserId,
    ) -> Result<Document, AppError> {
        let mut tx = db.begin().await?;

        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Document not found")))?;

        document
            .status
            .ensure_generatable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let template = sqlx::query_as::<_, DocumentTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM document_templates WHERE document_type = $1 AND is_active"
        ))
        .bind(document.document_type)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(anyhow!(
                "No active template for {}",
                document.document_type
            ))
        })?;

        let now = Utc::now();
        let (context, registration_number) = build_context(&mut tx, &document, now.date_naive()).await?;
        let content_html = template.render(&context);
        let code = verification_code(&document.number, &registration_number, now.timestamp());

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"UPDATE documents
               SET status = $1, content_html = $2, verification_code = $3,
                   generated_by = $4, generated_at = $5, updated_at = NOW()
               WHERE id = $6
               RETURNING {DOCUMENT_COLUMNS}"#
        ))
        .bind(DocumentStatus::Generated)
        .bind(&content_html)
        .bind(&code)
        .bind(generated_by)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::track_document_generated(document.document_type.as_str());
        info!(number = %document.number, "Document generated");
        Ok(document)
    }

    #[instrument(skip(db))]
    pub async fn deliver(
        db: &PgPool,
        id: DocumentId,
        delivered_by: UserId,
    ) -> Result<Document, AppError> {
        let existing = Self::get(db, id).await?;
        existing
            .status
            .ensure_deliverable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"UPDATE documents
               SET status = $1, delivered_by = $2, delivered_at = NOW(), updated_at = NOW()
               WHERE id = $3
               RETURNING {DOCUMENT_COLUMNS}"#
        ))
        .bind(DocumentStatus::Delivered)
        .bind(delivered_by)
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(document)
    }

    #[instrument(skip(db))]
    pub async fn cancel(db: &PgPool, id: DocumentId) -> Result<Document, AppError> {
        let existing = Self::get(db, id).await?;
        existing
            .status
            .ensure_cancellable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"UPDATE documents SET status = $1, updated_at = NOW()
               WHERE id = $2
               RETURNING {DOCUMENT_COLUMNS}"#
        ))
        .bind(DocumentStatus::Cancelled)
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(document)
    }

    /// Public check of a number and verification code pair.
    #[instrument(skip(db))]
    pub async fn verify(db: &PgPool, dto: VerifyDocumentDto) -> Result<VerificationResponse, AppError> {
        let document = sqlx::query_as::<_, VerifiedDocument>(
            r#"SELECT d.number, d.document_type, d.status,
                      (u.first_name || ' ' || u.last_name) AS student_name,
                      s.registration_number, d.generated_at
               FROM documents d
               INNER JOIN students s ON s.id = d.student_id
               INNER JOIN users u ON u.id = s.user_id
               WHERE d.number = $1 AND d.verification_code = $2 AND d.status <> 'CANCELLED'"#,
        )
        .bind(dto.number.trim())
        .bind(dto.verification_code.trim())
        .fetch_optional(db)
        .await?;

        Ok(VerificationResponse {
            valid: document.is_some(),
            document,
        })
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<DocumentStatistics, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents")
            .fetch_one(db)
            .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM documents GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        let by_type = sqlx::query_as::<_, LabelCount>(
            r#"SELECT document_type AS label, COUNT(*) AS count FROM documents
               GROUP BY document_type ORDER BY count DESC, document_type"#,
        )
        .fetch_all(db)
        .await?;

        Ok(DocumentStatistics {
            total,
            by_status,
            by_type,
        })
    }
}

async fn student_of_user(db: &PgPool, user_id: UserId) -> Result<StudentId, AppError> {
    sqlx::query_scalar::<_, StudentId>("SELECT id FROM students WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("No student profile for this account")))
}

/// Inserts a DRAFT under the next `{prefix}-{YYYY}-{NNNNNN}` number.
async fn insert_draft(
    tx: &mut Transaction<'_, Postgres>,
    dto: CreateDocumentDto,
) -> Result<Document, AppError> {
    let year = Utc::now().year();
    let prefix = dto.document_type.prefix();
    let stem = document_stem(prefix, year);
    let sequence = next_in_series(tx, "documents", "number", &stem).await?;
    let number = document_number(prefix, year, sequence);

    sqlx::query_as::<_, Document>(&format!(
        r#"INSERT INTO documents
            (number, document_type, student_id, enrollment_id, result_id, payment_id,
             request_reason, observations)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING {DOCUMENT_COLUMNS}"#
    ))
    .bind(&number)
    .bind(dto.document_type)
    .bind(dto.student_id)
    .bind(dto.enrollment_id)
    .bind(dto.result_id)
    .bind(dto.payment_id)
    .bind(&dto.request_reason)
    .bind(&dto.observations)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::from_db(e, "Duplicate document number", "A referenced record does not exist"))
}

/// Values available to the template, plus the student's registration number.
async fn build_context(
    tx: &mut Transaction<'_, Postgres>,
    document: &Document,
    today: NaiveDate,
) -> Result<(TemplateContext, String), AppError> {
    let (first_name, last_name, registration_number, date_of_birth, place_of_birth, nationality) =
        sqlx::query_as::<_, (String, String, String, Option<NaiveDate>, Option<String>, Option<String>)>(
            r#"SELECT u.first_name, u.last_name, s.registration_number, s.date_of_birth,
                      s.place_of_birth, s.nationality
               FROM students s
               INNER JOIN users u ON u.id = s.user_id
               WHERE s.id = $1"#,
        )
        .bind(document.student_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Student no longer exists")))?;

    let mut context = TemplateContext::new();
    context.insert("full_name".into(), format!("{} {}", first_name, last_name));
    context.insert("first_name".into(), first_name);
    context.insert("last_name".into(), last_name);
    context.insert("registration_number".into(), registration_number.clone());
    context.insert(
        "date_of_birth".into(),
        date_of_birth.map(|d| d.to_string()).unwrap_or_default(),
    );
    context.insert("place_of_birth".into(), place_of_birth.unwrap_or_default());
    context.insert("nationality".into(), nationality.unwrap_or_default());

    if let Some(enrollment_id) = document.enrollment_id {
        let row = sqlx::query_as::<_, (String, i32, String)>(
            r#"SELECT p.name, e.level, y.code
               FROM enrollments e
               INNER JOIN programs p ON p.id = e.program_id
               INNER JOIN academic_years y ON y.id = e.academic_year_id
               WHERE e.id = $1"#,
        )
        .bind(enrollment_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some((program, level, academic_year)) = row {
            context.insert("program".into(), program);
            context.insert("level".into(), level.to_string());
            context.insert("academic_year".into(), academic_year);
        }
    }

    if let Some(result_id) = document.result_id {
        let row = sqlx::query_as::<_, (String, f64, Option<String>)>(
            r#"SELECT sub.name, r.average, r.mention
               FROM results r
               INNER JOIN subjects sub ON sub.id = r.subject_id
               WHERE r.id = $1"#,
        )
        .bind(result_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some((subject, average, mention)) = row {
            context.insert("subject".into(), subject);
            context.insert("average".into(), format!("{:.2}", average));
            context.insert("mention".into(), mention.unwrap_or_default());
        }
    }

    if let Some(payment_id) = document.payment_id {
        let row = sqlx::query_as::<_, (String, f64, NaiveDate)>(
            "SELECT receipt_number, amount, paid_on FROM payments WHERE id = $1",
        )
        .bind(payment_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some((receipt_number, amount, paid_on)) = row {
            context.insert("receipt_number".into(), receipt_number);
            context.insert("amount".into(), format!("{:.2}", amount));
            context.insert("payment_date".into(), paid_on.to_string());
        }
    }

    context.insert("document_number".into(), document.number.clone());
    context.insert("date".into(), today.to_string());

    Ok((context, registration_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_numbers_use_type_prefix() {
        let stem = document_stem(DocumentType::Transcript.prefix(), 2025);
        assert_eq!(stem, "REL-NOT-2025-");
        assert_eq!(
            document_number(DocumentType::StudentCard.prefix(), 2025, 12),
            "CARTE-2025-000012"
        );
    }
}
