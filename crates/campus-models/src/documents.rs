//! Document templates and the official documents rendered from them.
//!
//! Templates are HTML with `{{ key }}` placeholders. Rendering replaces each
//! placeholder with the matching context value; unknown keys render empty.

use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{DocumentId, EnrollmentId, PaymentId, ResultId, StudentId, TemplateId, UserId};
use campus_core::serde::deserialize_optional_from_str;
use campus_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub type TemplateContext = BTreeMap<String, String>;

define_enum!(
    DocumentType {
        SchoolAttestation => "SCHOOL_ATTESTATION",
        EnrollmentAttestation => "ENROLLMENT_ATTESTATION",
        SuccessAttestation => "SUCCESS_ATTESTATION",
        SchoolCertificate => "SCHOOL_CERTIFICATE",
        Transcript => "TRANSCRIPT",
        ReportCard => "REPORT_CARD",
        EnrollmentSlip => "ENROLLMENT_SLIP",
        PaymentReceipt => "PAYMENT_RECEIPT",
        StudentCard => "STUDENT_CARD",
    }
);

impl DocumentType {
    /// Prefix of the document number, e.g. `ATT-SCO-2025-000001`.
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentType::SchoolAttestation => "ATT-SCO",
            DocumentType::EnrollmentAttestation => "ATT-INS",
            DocumentType::SuccessAttestation => "ATT-REU",
            DocumentType::SchoolCertificate => "CERT-SCO",
            DocumentType::Transcript => "REL-NOT",
            DocumentType::ReportCard => "BUL-NOT",
            DocumentType::EnrollmentSlip => "BOR-INS",
            DocumentType::PaymentReceipt => "REC-PAI",
            DocumentType::StudentCard => "CARTE",
        }
    }
}

define_enum!(
    DocumentStatus {
        Draft => "DRAFT",
        Generated => "GENERATED",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
);

impl DocumentStatus {
    pub fn ensure_generatable(&self) -> Result<(), &'static str> {
        match self {
            DocumentStatus::Draft => Ok(()),
            DocumentStatus::Generated => Err("Document already generated"),
            DocumentStatus::Delivered => Err("Document already delivered"),
            DocumentStatus::Cancelled => Err("Document is cancelled"),
        }
    }

    pub fn ensure_deliverable(&self) -> Result<(), &'static str> {
        match self {
            DocumentStatus::Generated => Ok(()),
            _ => Err("Only a generated document can be delivered"),
        }
    }

    pub fn ensure_cancellable(&self) -> Result<(), &'static str> {
        match self {
            DocumentStatus::Delivered => Err("A delivered document cannot be cancelled"),
            DocumentStatus::Cancelled => Err("Document is already cancelled"),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DocumentTemplate {
    pub id: TemplateId,
    pub document_type: DocumentType,
    pub name: String,
    pub description: Option<String>,
    pub body_html: String,
    pub styles_css: Option<String>,
    pub header_html: Option<String>,
    pub footer_html: Option<String>,
    pub watermark: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentTemplate {
    /// Full HTML: styles, header, body then footer.
    pub fn render(&self, context: &TemplateContext) -> String {
        let mut html = String::new();
        if let Some(css) = self.styles_css.as_deref().filter(|css| !css.is_empty()) {
            html.push_str("<style>");
            html.push_str(css);
            html.push_str("</style>\n");
        }
        if let Some(header) = &self.header_html {
            html.push_str(&render_template(header, context));
            html.push('\n');
        }
        html.push_str(&render_template(&self.body_html, context));
        if let Some(footer) = &self.footer_html {
            html.push('\n');
            html.push_str(&render_template(footer, context));
        }
        html
    }
}

/// Replaces every `{{ key }}` in `template` with the HTML-escaped value.
/// Whitespace inside the braces is ignored and an unterminated `{{` is kept
/// as is.
pub fn render_template(template: &str, context: &TemplateContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = after_open[..end].trim();
                if let Some(value) = context.get(key) {
                    push_escaped(&mut out, value);
                }
                rest = &after_open[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn push_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
}

/// Flattens a JSON object into a template context. Nulls render empty.
pub fn context_from_json(values: &serde_json::Map<String, serde_json::Value>) -> TemplateContext {
    values
        .iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

/// Placeholder values used when previewing a template.
pub fn sample_context() -> TemplateContext {
    [
        ("first_name", "Awa"),
        ("last_name", "Diallo"),
        ("full_name", "Awa Diallo"),
        ("registration_number", "ETU2025001"),
        ("date_of_birth", "2004-03-12"),
        ("place_of_birth", "Dakar"),
        ("nationality", "Senegalese"),
        ("program", "Computer Science"),
        ("level", "1"),
        ("academic_year", "2024-2025"),
        ("subject", "Algorithms"),
        ("average", "14.50"),
        ("mention", "GOOD"),
        ("receipt_number", "REC-2025-000001"),
        ("amount", "150000.00"),
        ("payment_date", "2025-01-15"),
        ("document_number", "ATT-SCO-2025-000001"),
        ("date", "2025-01-15"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// First 32 hex characters of SHA-256 over `{number}-{registration}-{timestamp}`.
pub fn verification_code(number: &str, registration_number: &str, timestamp: i64) -> String {
    let digest = Sha256::digest(format!("{}-{}-{}", number, registration_number, timestamp));
    let mut code = hex::encode(digest);
    code.truncate(32);
    code
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateDto {
    pub document_type: DocumentType,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "body_html is required"))]
    pub body_html: String,
    pub styles_css: Option<String>,
    pub header_html: Option<String>,
    pub footer_html: Option<String>,
    pub watermark: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTemplateDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub body_html: Option<String>,
    pub styles_css: Option<String>,
    pub header_html: Option<String>,
    pub footer_html: Option<String>,
    pub watermark: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PreviewTemplateDto {
    /// Values overriding the sample data
    #[schema(value_type = Option<Object>)]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplatePreview {
    pub html: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DuplicateTemplateDto {
    pub document_type: DocumentType,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TemplateFilterParams {
    pub document_type: Option<DocumentType>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedTemplatesResponse {
    pub data: Vec<DocumentTemplate>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Document {
    pub id: DocumentId,
    pub number: String,
    pub document_type: DocumentType,
    pub student_id: StudentId,
    pub enrollment_id: Option<EnrollmentId>,
    pub result_id: Option<ResultId>,
    pub payment_id: Option<PaymentId>,
    pub status: DocumentStatus,
    pub content_html: Option<String>,
    pub generated_by: Option<UserId>,
    pub generated_at: Option<DateTime<Utc>>,
    pub delivered_by: Option<UserId>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub verification_code: Option<String>,
    pub request_reason: Option<String>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDocumentDto {
    pub student_id: StudentId,
    pub document_type: DocumentType,
    pub enrollment_id: Option<EnrollmentId>,
    pub result_id: Option<ResultId>,
    pub payment_id: Option<PaymentId>,
    pub request_reason: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RequestDocumentDto {
    pub document_type: DocumentType,
    pub enrollment_id: Option<EnrollmentId>,
    #[validate(length(max = 500))]
    pub request_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VerifyDocumentDto {
    #[validate(length(min = 1, message = "number is required"))]
    pub number: String,
    #[validate(length(min = 1, message = "verification_code is required"))]
    pub verification_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VerifiedDocument {
    pub number: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub student_name: String,
    pub registration_number: String,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationResponse {
    pub valid: bool,
    pub document: Option<VerifiedDocument>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    pub document_type: Option<DocumentType>,
    pub status: Option<DocumentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedDocumentsResponse {
    pub data: Vec<Document>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_type: Vec<LabelCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> TemplateContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let ctx = context(&[("first_name", "Awa"), ("registration_number", "ETU2025001")]);
        assert_eq!(
            render_template("<p>{{first_name}} ({{ registration_number }})</p>", &ctx),
            "<p>Awa (ETU2025001)</p>"
        );
    }

    #[test]
    fn test_render_unknown_keys_are_empty() {
        let ctx = context(&[]);
        assert_eq!(render_template("Hello {{ nobody }}!", &ctx), "Hello !");
    }

    #[test]
    fn test_render_keeps_unterminated_braces() {
        let ctx = context(&[("a", "1")]);
        assert_eq!(render_template("{{ a }} and {{ b", &ctx), "1 and {{ b");
    }

    #[test]
    fn test_render_escapes_values() {
        let ctx = context(&[
            ("last_name", "<script>alert(1)</script>"),
            ("reason", "Tom & Jerry's \"visa\""),
        ]);
        assert_eq!(
            render_template("<p>{{ last_name }}</p>", &ctx),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
        assert_eq!(
            render_template("{{reason}}", &ctx),
            "Tom &amp; Jerry&#x27;s &quot;visa&quot;"
        );
    }

    #[test]
    fn test_template_render_concatenates_sections() {
        let template = DocumentTemplate {
            id: TemplateId::new(),
            document_type: DocumentType::SchoolAttestation,
            name: "Attestation".to_string(),
            description: None,
            body_html: "<main>{{ full_name }}</main>".to_string(),
            styles_css: Some("main{color:#000}".to_string()),
            header_html: Some("<header>{{ document_number }}</header>".to_string()),
            footer_html: Some("<footer>{{ date }}</footer>".to_string()),
            watermark: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let html = template.render(&sample_context());
        assert_eq!(
            html,
            "<style>main{color:#000}</style>\n<header>ATT-SCO-2025-000001</header>\n<main>Awa Diallo</main>\n<footer>2025-01-15</footer>"
        );
    }

    #[test]
    fn test_context_from_json() {
        let json = serde_json::json!({"name": "Awa", "level": 2, "missing": null});
        let ctx = context_from_json(json.as_object().unwrap());
        assert_eq!(ctx["name"], "Awa");
        assert_eq!(ctx["level"], "2");
        assert_eq!(ctx["missing"], "");
    }

    #[test]
    fn test_verification_code_is_stable() {
        let a = verification_code("ATT-SCO-2025-000001", "ETU2025001", 1_736_900_000);
        let b = verification_code("ATT-SCO-2025-000001", "ETU2025001", 1_736_900_000);
        let c = verification_code("ATT-SCO-2025-000002", "ETU2025001", 1_736_900_000);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_prefixes_are_unique() {
        let prefixes: std::collections::HashSet<_> =
            DocumentType::ALL.iter().map(|t| t.prefix()).collect();
        assert_eq!(prefixes.len(), DocumentType::ALL.len());
        assert_eq!(DocumentType::StudentCard.prefix(), "CARTE");
    }

    #[test]
    fn test_status_transitions() {
        assert!(DocumentStatus::Draft.ensure_generatable().is_ok());
        assert_eq!(
            DocumentStatus::Generated.ensure_generatable(),
            Err("Document already generated")
        );
        assert!(DocumentStatus::Generated.ensure_deliverable().is_ok());
        assert!(DocumentStatus::Draft.ensure_deliverable().is_err());
        assert!(DocumentStatus::Delivered.ensure_cancellable().is_err());
        assert!(DocumentStatus::Generated.ensure_cancellable().is_ok());
    }
}
