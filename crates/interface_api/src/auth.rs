//! Bearer-token authentication
//!
//! Every protected operation runs on behalf of exactly one therapist, so the
//! token carries nothing but that identity: the JWT subject is the therapist
//! id, and handlers scope every query to it.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::TherapistId;

use crate::error::ApiError;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the therapist id
    pub sub: String,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

impl Claims {
    /// The authenticated therapist
    pub fn therapist_id(&self) -> Result<TherapistId, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::BadRequest("invalid therapist id in token".to_string()))
    }
}

/// Token failures surfaced to the middleware
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Signs an access token for a therapist
pub fn issue_token(
    therapist_id: TherapistId,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, AuthError> {
    let issued = Utc::now();
    let claims = Claims {
        sub: therapist_id.as_uuid().to_string(),
        iat: issued.timestamp(),
        exp: (issued + Duration::seconds(ttl_secs as i64)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::Invalid)
}

/// Verifies a token's signature and expiry, returning its claims
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let therapist = TherapistId::new();
        let token = issue_token(therapist, "secret", 3600).unwrap();

        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.therapist_id().unwrap(), therapist);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issue_token(TherapistId::new(), "secret", 3600).unwrap();
        assert!(matches!(
            decode_token(&token, "other-secret"),
            Err(AuthError::Invalid)
        ));
    }

    #[test]
    fn test_expired_token_is_reported_as_such() {
        let therapist = TherapistId::new();
        // Issued already expired; jsonwebtoken applies default leeway, so
        // back-date well past it
        let issued = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: therapist.as_uuid().to_string(),
            iat: issued.timestamp(),
            exp: (issued + Duration::seconds(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            decode_token(&token, "secret"),
            Err(AuthError::Expired)
        ));
    }
}
