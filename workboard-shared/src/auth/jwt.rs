//! Session token issuance and validation
//!
//! Tokens are HS256 JWTs signed with the server secret. The claims carry the
//! account id, its tenant (absent for platform accounts) and its role, but the
//! credential verifier treats them only as a pointer to the account row: role,
//! tenant and active flag are always re-read from the database.
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use uuid::Uuid;
//! use workboard_shared::auth::jwt::{create_token, validate_token, Claims};
//! use workboard_shared::models::account::Role;
//!
//! let claims = Claims::new(Uuid::new_v4(), Some(Uuid::new_v4()), Role::User, Duration::hours(24));
//! let token = create_token(&claims, "a-very-long-secret-key-for-signing-tokens").unwrap();
//!
//! let decoded = validate_token(&token, "a-very-long-secret-key-for-signing-tokens").unwrap();
//! assert_eq!(decoded.sub, claims.sub);
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::Role;

/// Issuer embedded in and required of every token
pub const TOKEN_ISSUER: &str = "workboard";

/// Default session lifetime
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    /// `None` for platform accounts
    pub tenant_id: Option<Uuid>,

    /// Role at issuance time; informational only
    pub role: Role,
}

impl Claims {
    pub fn new(account_id: Uuid, tenant_id: Option<Uuid>, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: account_id,
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            tenant_id,
            role,
        }
    }

    /// Seconds until the token expires, or 0 if it already has
    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Signs claims into a compact JWT
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, issuer, `exp` and `nbf`, and returns the claims
///
/// # Errors
///
/// - [`JwtError::Expired`] once `exp` has passed (with the library's default leeway)
/// - [`JwtError::Invalid`] for a bad signature, wrong issuer or malformed token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-signing-at-least-32-chars";

    #[test]
    fn test_create_and_validate_token() {
        let account_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let claims = Claims::new(account_id, Some(tenant_id), Role::TenantAdmin, Duration::hours(1));

        let token = create_token(&claims, SECRET).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = validate_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, account_id);
        assert_eq!(decoded.tenant_id, Some(tenant_id));
        assert_eq!(decoded.role, Role::TenantAdmin);
        assert_eq!(decoded.iss, TOKEN_ISSUER);
    }

    #[test]
    fn test_platform_token_has_no_tenant() {
        let claims = Claims::new(Uuid::new_v4(), None, Role::SuperAdmin, Duration::hours(1));
        let token = create_token(&claims, SECRET).unwrap();

        let decoded = validate_token(&token, SECRET).unwrap();
        assert_eq!(decoded.tenant_id, None);
        assert_eq!(decoded.role, Role::SuperAdmin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = Claims::new(Uuid::new_v4(), None, Role::SuperAdmin, Duration::hours(1));
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-that-is-long-enough");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims::new(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            Role::User,
            Duration::hours(-2),
        );
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
        assert_eq!(claims.expires_in(), 0);
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), None, Role::SuperAdmin, Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_token("not.a.token", SECRET),
            Err(JwtError::Invalid(_))
        ));
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_expires_in_positive_for_fresh_token() {
        let claims = Claims::new(Uuid::new_v4(), None, Role::SuperAdmin, Duration::hours(24));
        let remaining = claims.expires_in();
        assert!(remaining > 86_000 && remaining <= 86_400);
    }
}
