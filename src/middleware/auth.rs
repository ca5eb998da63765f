use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use campus_auth::{Claims, verify_token};
use campus_core::{AppError, permissions};
use campus_models::ids::{RoleId, UserId};
use campus_models::system_roles;

use crate::state::AppState;

/// Claims of the caller, taken from a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.permissions.iter().any(|p| p == permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| self.has_permission(p))
    }

    pub fn has_role(&self, role_id: &RoleId) -> bool {
        self.0.role_ids.contains(&role_id.into_inner())
    }

    pub fn has_any_role(&self, role_ids: &[RoleId]) -> bool {
        role_ids.iter().any(|r| self.has_role(r))
    }

    /// System admins and office staff.
    pub fn is_staff(&self) -> bool {
        self.has_any_role(&[system_roles::SYSTEM_ADMIN, system_roles::ADMIN])
    }

    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that authenticates the caller and then requires one permission.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = campus_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !auth_user.has_permission($permission) {
                    return Err(campus_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

// Users, roles, audit
require_permission!(RequireUsersCreate, permissions::USERS_CREATE);
require_permission!(RequireUsersRead, permissions::USERS_READ);
require_permission!(RequireUsersUpdate, permissions::USERS_UPDATE);
require_permission!(RequireUsersDelete, permissions::USERS_DELETE);
require_permission!(RequireRolesRead, permissions::ROLES_READ);
require_permission!(RequireAuditRead, permissions::AUDIT_READ);

// Academic structure
require_permission!(RequireAcademicRead, permissions::ACADEMIC_READ);
require_permission!(RequireAcademicWrite, permissions::ACADEMIC_WRITE);

// Students, enrollments, teachers
require_permission!(RequireStudentsRead, permissions::STUDENTS_READ);
require_permission!(RequireStudentsWrite, permissions::STUDENTS_WRITE);
require_permission!(RequireEnrollmentsRead, permissions::ENROLLMENTS_READ);
require_permission!(RequireEnrollmentsWrite, permissions::ENROLLMENTS_WRITE);
require_permission!(RequireTeachersRead, permissions::TEACHERS_READ);
require_permission!(RequireTeachersWrite, permissions::TEACHERS_WRITE);

// Evaluations, grades, results, deliberations
require_permission!(RequireEvaluationsRead, permissions::EVALUATIONS_READ);
require_permission!(RequireEvaluationsWrite, permissions::EVALUATIONS_WRITE);
require_permission!(RequireGradesRead, permissions::GRADES_READ);
require_permission!(RequireGradesWrite, permissions::GRADES_WRITE);
require_permission!(RequireResultsRead, permissions::RESULTS_READ);
require_permission!(RequireResultsCompute, permissions::RESULTS_COMPUTE);
require_permission!(RequireDeliberationsRead, permissions::DELIBERATIONS_READ);
require_permission!(RequireDeliberationsWrite, permissions::DELIBERATIONS_WRITE);
require_permission!(RequireDeliberationsValidate, permissions::DELIBERATIONS_VALIDATE);

// Scheduling
require_permission!(RequireScheduleRead, permissions::SCHEDULE_READ);
require_permission!(RequireScheduleWrite, permissions::SCHEDULE_WRITE);

// Finance
require_permission!(RequireFinanceRead, permissions::FINANCE_READ);
require_permission!(RequireFinanceWrite, permissions::FINANCE_WRITE);
require_permission!(RequirePaymentsValidate, permissions::PAYMENTS_VALIDATE);

// Documents and communications
require_permission!(RequireDocumentsRead, permissions::DOCUMENTS_READ);
require_permission!(RequireDocumentsWrite, permissions::DOCUMENTS_WRITE);
require_permission!(RequireAnnouncementsWrite, permissions::ANNOUNCEMENTS_WRITE);
require_permission!(RequireNotificationsSend, permissions::NOTIFICATIONS_SEND);

// Resources
require_permission!(RequireResourcesRead, permissions::RESOURCES_READ);
require_permission!(RequireResourcesWrite, permissions::RESOURCES_WRITE);
require_permission!(RequireReservationsValidate, permissions::RESERVATIONS_VALIDATE);

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn create_test_claims(permissions: Vec<String>, role_ids: Vec<Uuid>) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "registrar@campus.test".to_string(),
            role_ids,
            permissions,
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn test_has_permission() {
        let auth_user = AuthUser(create_test_claims(
            vec!["grades:read".to_string(), "grades:write".to_string()],
            vec![],
        ));

        assert!(auth_user.has_permission("grades:read"));
        assert!(auth_user.has_permission("grades:write"));
        assert!(!auth_user.has_permission("results:compute"));
    }

    #[test]
    fn test_has_any_and_all_permissions() {
        let auth_user = AuthUser(create_test_claims(
            vec!["finance:read".to_string(), "finance:write".to_string()],
            vec![],
        ));

        assert!(auth_user.has_any_permission(&["finance:read", "payments:validate"]));
        assert!(!auth_user.has_any_permission(&["payments:validate"]));
        assert!(auth_user.has_all_permissions(&["finance:read", "finance:write"]));
        assert!(!auth_user.has_all_permissions(&["finance:read", "payments:validate"]));
    }

    #[test]
    fn test_staff_roles() {
        let admin = AuthUser(create_test_claims(vec![], vec![system_roles::ADMIN.into_inner()]));
        assert!(admin.is_staff());
        assert!(admin.has_role(&system_roles::ADMIN));

        let teacher = AuthUser(create_test_claims(
            vec![],
            vec![system_roles::TEACHER.into_inner()],
        ));
        assert!(!teacher.is_staff());
        assert!(teacher.has_any_role(&[system_roles::STUDENT, system_roles::TEACHER]));
    }

    #[test]
    fn test_user_id() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            ..create_test_claims(vec![], vec![])
        };
        assert_eq!(AuthUser(claims).user_id().unwrap(), UserId::from_uuid(user_id));
    }

    #[test]
    fn test_malformed_subject_is_unauthorized() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            ..create_test_claims(vec![], vec![])
        };
        let err = AuthUser(claims).user_id().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }
}
