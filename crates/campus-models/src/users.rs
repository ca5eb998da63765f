//! User accounts and the audit trail.

use crate::enums::define_enum;
use crate::ids::{AuditLogId, RoleId, UserId};
use campus_core::serde::{deserialize_optional_bool, deserialize_optional_from_str};
use campus_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Row used by login: the user plus the password hash, never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: User,
    pub role_ids: Vec<RoleId>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the user's roles when present
    pub role_ids: Option<Vec<RoleId>>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub role_id: Option<RoleId>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    /// Matches first name, last name or e-mail
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}

define_enum!(
    AuditAction {
        Create => "CREATE",
        Update => "UPDATE",
        Delete => "DELETE",
        Login => "LOGIN",
        Logout => "LOGOUT",
        View => "VIEW",
        Export => "EXPORT",
        Import => "IMPORT",
        Other => "OTHER",
    }
);

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub table_name: String,
    pub object_id: Option<String>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub user_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub table_name: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAuditLogsResponse {
    pub data: Vec<AuditLog>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_dto_validation() {
        let dto = CreateUserDto {
            first_name: "Awa".to_string(),
            last_name: "Diallo".to_string(),
            email: "awa.diallo@campus.test".to_string(),
            password: "password123".to_string(),
            role_ids: vec![],
        };
        assert!(dto.validate().is_ok());

        let bad_email = CreateUserDto {
            email: "not-an-email".to_string(),
            ..dto.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = CreateUserDto {
            password: "short".to_string(),
            ..dto
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_filter_params_from_query_values() {
        let params: UserFilterParams =
            serde_json::from_str(r#"{"is_active":"false","search":"awa","limit":"5"}"#).unwrap();
        assert_eq!(params.is_active, Some(false));
        assert_eq!(params.search.as_deref(), Some("awa"));
        assert_eq!(params.pagination.limit(), 5);
    }

    #[test]
    fn test_audit_action_codes() {
        assert_eq!(AuditAction::Login.as_str(), "LOGIN");
        assert_eq!("EXPORT".parse::<AuditAction>().unwrap(), AuditAction::Export);
    }
}
