//! Token creation and verification.
//!
//! ```ignore
//! use campus_auth::{create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "dean@campus.test", role_ids, permissions, &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use uuid::Uuid;

use campus_config::JwtConfig;
use campus_core::AppError;

use crate::claims::{Claims, RefreshTokenClaims};

fn sign<T: Serialize>(claims: &T, jwt_config: &JwtConfig, kind: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create {}: {}", kind, e)))
}

/// Creates an access token embedding the user's roles and permissions.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    role_ids: Vec<Uuid>,
    permissions: Vec<String>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role_ids,
        permissions,
        exp: now + jwt_config.access_token_expiry as usize,
        iat: now,
    };

    sign(&claims, jwt_config, "token")
}

/// Verifies signature and expiry of an access token.
///
/// Any failure maps to 401 without detail.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

pub fn create_refresh_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: now + jwt_config.refresh_token_expiry as usize,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    sign(&claims, jwt_config, "refresh token")
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604_800,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();

        let token = create_access_token(
            user_id,
            "teacher@campus.test",
            vec![role_id],
            vec!["grades:write".to_string(), "grades:read".to_string()],
            &config,
        )
        .unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "teacher@campus.test");
        assert_eq!(claims.role_ids, vec![role_id]);
        assert_eq!(claims.permissions.len(), 2);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let err = verify_token("not-a-token", &test_config()).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token =
            create_access_token(Uuid::new_v4(), "a@b.test", vec![], vec![], &test_config())
                .unwrap();

        let other = JwtConfig {
            secret: "another-secret-key-at-least-32-characters".to_string(),
            ..test_config()
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_refresh_token_outlives_access_token() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let access = create_access_token(user_id, "a@b.test", vec![], vec![], &config).unwrap();
        let refresh = create_refresh_token(user_id, "a@b.test", &config).unwrap();

        let access_claims = verify_token(&access, &config).unwrap();
        let refresh_claims = verify_refresh_token(&refresh, &config).unwrap();
        assert_eq!(refresh_claims.sub, user_id.to_string());
        assert!(refresh_claims.exp > access_claims.exp);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let config = test_config();
        let refresh = create_refresh_token(Uuid::new_v4(), "a@b.test", &config).unwrap();
        assert!(verify_token(&refresh, &config).is_err());
    }
}
