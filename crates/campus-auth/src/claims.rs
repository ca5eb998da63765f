use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role_ids: Vec<Uuid>,
    /// Permission names granted through the user's roles
    pub permissions: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

/// Refresh token claims. `jti` keeps two tokens issued in the same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_round_trip_through_json() {
        let role_id = Uuid::new_v4();
        let claims = Claims {
            sub: "user-id-123".to_string(),
            email: "registrar@campus.test".to_string(),
            role_ids: vec![role_id],
            permissions: vec!["grades:write".to_string()],
            exp: 1_234_567_890,
            iat: 1_234_567_800,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains(r#""sub":"user-id-123""#));

        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role_ids, vec![role_id]);
        assert_eq!(back.permissions, vec!["grades:write".to_string()]);
    }

    #[test]
    fn test_refresh_claims_deserialize() {
        let json = r#"{"sub":"u1","email":"a@b.test","exp":10,"iat":5,"jti":"abc"}"#;
        let claims: RefreshTokenClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.jti, "abc");
        assert_eq!(claims.exp, 10);
    }
}
