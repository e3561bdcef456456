//! JWT Authentication for REST API

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token type announced to clients
pub const TOKEN_TYPE: &str = "Bearer";

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// User id
    pub uid: i64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

/// A freshly signed token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: u64,
    pub requested_at: chrono::DateTime<Utc>,
}

/// JWT configuration
pub struct JwtConfig {
    /// Secret key for signing tokens
    secret: String,
    /// Lifetime of a regular session
    session: Duration,
    /// Lifetime when the user asked to be remembered
    remember_me: Duration,
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: String, session_hours: u64, remember_me_days: u64) -> Self {
        Self {
            secret,
            session: Duration::from_secs(session_hours * 3600),
            remember_me: Duration::from_secs(remember_me_days * 24 * 3600),
        }
    }

    /// Token lifetime for the given remember-me choice
    pub fn expires_span(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me
        } else {
            self.session
        }
    }

    /// Create a new JWT token for a user
    pub fn create_token(
        &self,
        user_id: i64,
        username: &str,
        remember_me: bool,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let requested_at = Utc::now();
        let now = requested_at.timestamp().max(0) as u64;
        let expires_in = self.expires_span(remember_me).as_secs();

        let claims = Claims {
            sub: username.to_string(),
            uid: user_id,
            exp: now + expires_in,
            iat: now,
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(IssuedToken {
            access_token,
            token_type: TOKEN_TYPE,
            expires_in,
            requested_at,
        })
    }

    /// Validate a JWT token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::new("change-me-in-production".to_string(), 1, 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_validate_token() {
        let config = JwtConfig::new("test-secret".to_string(), 1, 30);

        let issued = config.create_token(7, "alice", false).unwrap();
        assert!(!issued.access_token.is_empty());
        assert_eq!(issued.expires_in, 3600);
        assert_eq!(issued.token_type, "Bearer");

        let claims = config.validate_token(&issued.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.uid, 7);
    }

    #[test]
    fn test_remember_me_lasts_longer() {
        let config = JwtConfig::new("test-secret".to_string(), 1, 30);

        let issued = config.create_token(1, "alice", true).unwrap();
        assert_eq!(issued.expires_in, 30 * 24 * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::new("test-secret".to_string(), 1, 30);

        let result = config.validate_token("invalid-token");
        assert!(result.is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issued = JwtConfig::new("one".to_string(), 1, 30)
            .create_token(1, "alice", false)
            .unwrap();

        let other = JwtConfig::new("two".to_string(), 1, 30);
        assert!(other.validate_token(&issued.access_token).is_err());
    }
}
