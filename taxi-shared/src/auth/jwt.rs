/// Bearer tokens for API clients
///
/// Browser clients authenticate with the session cookie set at login;
/// scripted clients exchange their credentials for an HS256 token at
/// `POST /v1/auth/token` and send it as `Authorization: Bearer <token>`.
///
/// # Example
///
/// ```
/// use taxi_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-key-of-at-least-32-bytes!";
/// let driver_id = Uuid::new_v4();
///
/// let token = create_token(&Claims::new(driver_id), secret)?;
/// assert_eq!(validate_token(&token, secret)?.sub, driver_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim
pub const ISSUER: &str = "taxi";

/// Default token lifetime in hours
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Driver id
    pub sub: Uuid,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
}

impl Claims {
    /// Claims for `driver_id` valid for [`TOKEN_TTL_HOURS`]
    pub fn new(driver_id: Uuid) -> Self {
        Self::with_expiration(driver_id, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn with_expiration(driver_id: Uuid, expires_in: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: driver_id,
            iss: ISSUER.to_string(),
            iat: now,
            exp: now + expires_in.num_seconds(),
            nbf: now,
        }
    }

    /// Seconds until expiry, zero once expired
    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Verifies signature, issuer, `exp` and `nbf`, returning the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    #[test]
    fn test_round_trip() {
        let driver_id = Uuid::new_v4();
        let claims = Claims::new(driver_id);
        let token = create_token(&claims, SECRET).unwrap();

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated, claims);
        assert!(validated.expires_in() > 0);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(&Claims::new(Uuid::new_v4()), SECRET).unwrap();
        assert!(matches!(
            validate_token(&token, "another-secret-key-that-is-long"),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_rejected() {
        let claims = Claims::with_expiration(Uuid::new_v4(), Duration::hours(-1));
        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = Claims::new(Uuid::new_v4());
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();
        assert!(validate_token(&token, SECRET).is_err());
    }
}
