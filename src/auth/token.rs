use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::utils::error::AppError;

/// Lifetime of an issued token. There is no refresh flow.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Identity carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Stateless HS256 signer/verifier. Cheap to clone; keys are shared.
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        self.issue_at(user, Utc::now())
    }

    pub(crate) fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("failed to sign token: {e}")))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::AuthError("Invalid token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 42,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "irrelevant".into(),
        }
    }

    #[test]
    fn test_round_trip_reproduces_identity() {
        let service = TokenService::new("secret");
        let token = service.issue(&user()).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.id, 42);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = TokenService::new("secret");
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS) - Duration::seconds(5);
        let token = service.issue_at(&user(), issued).unwrap();

        assert!(matches!(service.verify(&token), Err(AppError::AuthError(_))));
    }

    #[test]
    fn test_token_still_valid_just_inside_window() {
        let service = TokenService::new("secret");
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS) + Duration::minutes(5);
        let token = service.issue_at(&user(), issued).unwrap();

        assert!(service.verify(&token).is_ok());
    }

    #[test]
    fn test_signature_mismatch_is_rejected() {
        let token = TokenService::new("one").issue(&user()).unwrap();
        assert!(TokenService::new("two").verify(&token).is_err());
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let service = TokenService::new("secret");
        assert!(service.verify("not.a.jwt").is_err());
        assert!(service.verify("").is_err());
    }
}
