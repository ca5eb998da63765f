use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use campus_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use campus_config::JwtConfig;
use campus_core::{AppError, verify_password};
use campus_models::ids::{RoleId, UserId};
use campus_models::users::{User, UserCredentials};

use crate::metrics;
use crate::modules::audit_logs::{AuditAction, AuditService, ClientInfo};
use crate::modules::roles::service as roles;

use super::model::{LoginRequest, LoginResponse, RefreshTokenResponse};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
        client: &ClientInfo,
    ) -> Result<LoginResponse, AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            r#"SELECT id, first_name, last_name, email, password, is_active
               FROM users WHERE LOWER(email) = LOWER($1)"#,
        )
        .bind(&dto.email)
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            metrics::track_login_failure("unknown_email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(&dto.password, &credentials.password)? {
            metrics::track_login_failure("wrong_password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        if !credentials.is_active {
            metrics::track_login_failure("inactive");
            warn!(user_id = %credentials.id, "Login attempt on inactive account");
            return Err(AppError::unauthorized("Account is inactive"));
        }

        let (role_ids, permissions) = Self::load_access(db, credentials.id).await?;

        let access_token = create_access_token(
            credentials.id.into_inner(),
            &credentials.email,
            role_ids.iter().map(|r| r.into_inner()).collect(),
            permissions.clone(),
            jwt_config,
        )?;
        let refresh_token =
            create_refresh_token(credentials.id.into_inner(), &credentials.email, jwt_config)?;

        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, is_active, created_at, updated_at
               FROM users WHERE id = $1"#,
        )
        .bind(credentials.id)
        .fetch_one(db)
        .await?;

        AuditService::record(
            db,
            Some(user.id),
            AuditAction::Login,
            "users",
            Some(user.id.to_string()),
            json!({ "email": user.email }),
            client,
        )
        .await;
        metrics::track_login_success();
        info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
            role_ids,
            permissions,
        })
    }

    /// Issues a fresh token pair with roles and permissions re-read from the database.
    #[instrument(skip(db, refresh_token, jwt_config))]
    pub async fn refresh_access_token(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<RefreshTokenResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))?;

        let (email, is_active) = sqlx::query_as::<_, (String, bool)>(
            "SELECT email, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid or expired refresh token"))?;

        if !is_active {
            return Err(AppError::unauthorized("Account is inactive"));
        }

        let (role_ids, permissions) = Self::load_access(db, user_id).await?;

        let access_token = create_access_token(
            user_id.into_inner(),
            &email,
            role_ids.iter().map(|r| r.into_inner()).collect(),
            permissions,
            jwt_config,
        )?;
        let refresh_token = create_refresh_token(user_id.into_inner(), &email, jwt_config)?;

        Ok(RefreshTokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
        })
    }

    async fn load_access(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<(Vec<RoleId>, Vec<String>), AppError> {
        let role_ids = roles::get_user_role_ids(db, user_id).await?;
        let permissions = roles::get_user_permissions(db, user_id).await?;
        Ok((role_ids, permissions))
    }
}
