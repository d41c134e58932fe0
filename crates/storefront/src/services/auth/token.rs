//! Signed bearer tokens.
//!
//! A token is `base64url(claims_json) "." base64url(hmac_sha256(claims_json))`.
//! The claims carry the account id, which is the only identity the cart API
//! trusts.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use essence_core::UserId;

use crate::models::user::User;

type HmacSha256 = Hmac<Sha256>;

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("signing key rejected")]
    InvalidKey,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub email: String,
    pub name: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expires at, unix seconds.
    pub exp: i64,
}

/// The verified caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    key: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the secret cannot key an HMAC.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, TokenError> {
        let key = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { key, ttl })
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> HmacSha256 {
        self.key.clone()
    }

    /// Issue a token for `user`, valid from `now` for the configured lifetime.
    #[must_use]
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> String {
        let claims = Claims {
            sub: user.id,
            email: user.email.to_string(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        // Serializing plain strings and integers cannot fail.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();

        let mut mac = self.mac();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, signed with another
    /// key, or expired at `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use essence_core::Email;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            &SecretString::from("kR8#vQ2!mZ5@tW9$yB4^nL7&pX1*cF6"),
            Duration::days(30),
        )
        .unwrap()
    }

    fn user() -> User {
        User {
            id: UserId::generate(),
            name: "Demo User".to_owned(),
            email: Email::parse("user@example.com").unwrap(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let user = user();
        let now = Utc::now();
        let token = signer().issue(&user, now);

        let claims = signer().verify(&token, now).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let token = signer().issue(&user(), now);
        let later = now + Duration::days(31);
        assert_eq!(signer().verify(&token, later), Err(TokenError::Expired));
    }

    #[test]
    fn test_other_key_rejected() {
        let now = Utc::now();
        let token = signer().issue(&user(), now);
        let other = TokenSigner::new(
            &SecretString::from("Zq7!Lw3@Rt8#Yp1$Mn6%Kb2^Hd9&Gs4"),
            Duration::days(30),
        )
        .unwrap();
        assert_eq!(other.verify(&token, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = Utc::now();
        let token = signer().issue(&user(), now);
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!(
            "{}.{signature}",
            URL_SAFE_NO_PAD.encode(br#"{"sub":"65f1a2b3c4d5e6f7a8b9c0d1","email":"a@b.c","name":"x","iat":0,"exp":99999999999}"#)
        );
        assert_eq!(signer().verify(&forged, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let now = Utc::now();
        assert_eq!(signer().verify("not-a-token", now), Err(TokenError::Malformed));
        assert_eq!(signer().verify("a.b.c", now), Err(TokenError::Malformed));
    }

    #[test]
    fn test_debug_redacts_key() {
        assert!(format!("{:?}", signer()).contains("[REDACTED]"));
    }
}
