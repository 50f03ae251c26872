use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

pub mod password;

/// Purpose tag baked into every session token. A token carrying any other
/// purpose is rejected, which keeps session tokens from being replayed
/// against unrelated token-verifying features.
pub const SESSION_PURPOSE: &str = "auth";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Owning user id
    pub sub: Uuid,
    /// Purpose tag, always [`SESSION_PURPOSE`] for session tokens
    pub purpose: String,
    /// Unique token id. `iat`/`exp` only have second granularity, so this
    /// is what keeps two sessions opened in the same second from sharing
    /// one token string; logout removes list entries by string match and
    /// must never catch a sibling session's token.
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn session(user_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.token_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            purpose: SESSION_PURPOSE.to_string(),
            jti: Uuid::new_v4(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature mismatch, malformed encoding and wrong purpose tag all
    /// collapse into this variant; callers must not be able to tell the
    /// verification failure modes apart.
    #[error("invalid token")]
    InvalidToken,

    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("token generation failed: {0}")]
    Generation(String),
}

/// Issue a signed session token bound to `user_id`.
pub fn issue_token(user_id: Uuid) -> Result<String, TokenError> {
    let secret = &config::config().security.token_secret;

    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, &Claims::session(user_id), &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify a session token and return the user id it is bound to.
///
/// Fails uniformly with [`TokenError::InvalidToken`] on any verification
/// problem. Membership in the owner's active-token list is checked
/// separately by the auth middleware; this is a pure cryptographic check.
pub fn verify_token(token: &str) -> Result<Uuid, TokenError> {
    let secret = &config::config().security.token_secret;

    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|_| TokenError::InvalidToken)?;

    if token_data.claims.purpose != SESSION_PURPOSE {
        return Err(TokenError::InvalidToken);
    }

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id).unwrap();
        assert_eq!(verify_token(&token).unwrap(), user_id);
    }

    #[test]
    fn concurrent_sessions_get_distinct_tokens() {
        // Back-to-back issuance lands in the same second, where iat/exp
        // cannot tell the tokens apart; jti must.
        let user_id = Uuid::new_v4();
        let first = issue_token(user_id).unwrap();
        let second = issue_token(user_id).unwrap();

        assert_ne!(first, second);
        assert_eq!(verify_token(&first).unwrap(), user_id);
        assert_eq!(verify_token(&second).unwrap(), user_id);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = issue_token(Uuid::new_v4()).unwrap();
        let mut tampered = token.clone();
        // Flip a character in the signature segment
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(matches!(verify_token(&tampered), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(verify_token("not-a-token"), Err(TokenError::InvalidToken)));
        assert!(matches!(verify_token(""), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn wrong_purpose_is_rejected_uniformly() {
        // Sign a structurally valid token with the real secret but a
        // different purpose tag; it must fail exactly like a bad signature.
        let secret = &config::config().security.token_secret;
        let claims = Claims {
            purpose: "password-reset".to_string(),
            ..Claims::session(Uuid::new_v4())
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify_token(&token), Err(TokenError::InvalidToken)));
    }
}
