use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::user::Role;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to validate token: {0}")]
    TokenValidationError(String),
    #[error("Token expired")]
    TokenExpired,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,      // Subject (user id)
    pub email: String,    // User email
    pub role: Role,
    pub exp: i64,         // Expiration time
    pub iat: i64,         // Issued at
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// Validates tokens issued by the accounts service. Signing lives there.
#[derive(Clone)]
pub struct JwtService {
    secret: String,
}

impl JwtService {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = jsonwebtoken::Validation::default();
        validation.validate_exp = true;

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::TokenValidationError(e.to_string()),
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    pub(crate) fn sign(secret: &str, claims: &Claims) -> String {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    pub(crate) fn claims_for(user_id: Uuid, role: Role, token_type: TokenType, ttl_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: user_id.to_string(),
            email: "someone@example.com".to_string(),
            role,
            exp: now + ttl_secs,
            iat: now,
            token_type,
        }
    }

    #[test]
    fn test_validate_invalid_token() {
        let service = JwtService::new("secret".to_string());
        let result = service.validate_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_round_trips_role() {
        let service = JwtService::new("secret".to_string());
        let claims = claims_for(Uuid::new_v4(), Role::Host, TokenType::Access, 3600);
        let token = sign("secret", &claims);

        let decoded = service.validate_token(&token).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.role, Role::Host);
    }

    #[test]
    fn test_validate_expired_token() {
        let service = JwtService::new("secret".to_string());
        let claims = claims_for(Uuid::new_v4(), Role::Guest, TokenType::Access, -3600);
        let token = sign("secret", &claims);

        assert!(matches!(service.validate_token(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_validate_wrong_secret() {
        let service = JwtService::new("secret".to_string());
        let token = sign("other", &claims_for(Uuid::new_v4(), Role::Admin, TokenType::Access, 3600));

        assert!(matches!(service.validate_token(&token), Err(JwtError::TokenValidationError(_))));
    }
}
