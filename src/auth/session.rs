//! Session management
//!
//! Uses HMAC-signed tokens stored in the `token` cookie.
//! No server-side session storage needed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Longest accepted session lifetime (10 years)
pub const MAX_SESSION_AGE_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Who a session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub username: String,
}

impl From<&crate::data::User> for Identity {
    fn from(user: &crate::data::User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Decoded session token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: Identity,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Check if the token has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Signs and verifies session tokens
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// Built once from configuration. Changing the secret invalidates every
/// token issued under the old one.
pub struct SessionCodec {
    secret: Vec<u8>,
    max_age: Duration,
}

impl SessionCodec {
    /// `max_age_seconds` is clamped to `0..=MAX_SESSION_AGE_SECONDS`
    pub fn new(secret: &str, max_age_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            max_age: Duration::seconds(max_age_seconds.clamp(0, MAX_SESSION_AGE_SECONDS)),
        }
    }

    pub fn from_config(config: &crate::config::AuthConfig) -> Self {
        Self::new(&config.session_secret, config.session_max_age)
    }

    /// Token lifetime
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AppError::Encryption(e.to_string()))
    }

    /// Issue a token for `identity` expiring `max_age` from now
    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, AppError> {
        let expires_at = now.checked_add_signed(self.max_age).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session expiry overflows at {now}"))
        })?;
        let claims = Claims {
            identity: identity.clone(),
            issued_at: now,
            expires_at,
        };

        let payload =
            serde_json::to_string(&claims).map_err(|e| AppError::Internal(e.into()))?;
        let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        Ok(format!("{}.{}", payload_b64, signature_b64))
    }

    /// Verify a token and return its claims
    ///
    /// # Errors
    /// `AppError::InvalidToken` if the token is malformed, the signature
    /// does not match, or the token has expired
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(AppError::InvalidToken)?;
        if signature_b64.contains('.') {
            return Err(AppError::InvalidToken);
        }

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AppError::InvalidToken)?;

        // verify_slice compares in constant time
        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::InvalidToken)?;

        let payload = general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AppError::InvalidToken)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AppError::InvalidToken)?;

        if claims.is_expired_at(now) {
            return Err(AppError::InvalidToken);
        }

        Ok(claims)
    }
}

/// Build the session cookie carrying `token`
pub fn session_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Build a cookie that removes the session cookie
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-32-bytes!";

    fn alice() -> Identity {
        Identity {
            user_id: "01HZX0000000000000000ALICE".to_string(),
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let codec = SessionCodec::new(SECRET, 604_800);
        let token = codec.issue(&alice()).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.identity, alice());
        assert_eq!(claims.expires_at - claims.issued_at, Duration::days(7));
    }

    #[test]
    fn expired_token_is_invalid() {
        let codec = SessionCodec::new(SECRET, 60);
        let issued = Utc::now() - Duration::seconds(120);
        let token = codec.issue_at(&alice(), issued).unwrap();

        assert!(matches!(codec.verify(&token), Err(AppError::InvalidToken)));
        assert!(
            codec
                .verify_at(&token, issued + Duration::seconds(59))
                .is_ok()
        );
        assert!(matches!(
            codec.verify_at(&token, issued + Duration::seconds(60)),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let issuer = SessionCodec::new("another-secret-that-is-32-bytes-long", 3600);
        let verifier = SessionCodec::new(SECRET, 3600);
        let token = issuer.issue(&alice()).unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let codec = SessionCodec::new(SECRET, 3600);
        let token = codec.issue(&alice()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            identity: Identity {
                username: "mallory".to_string(),
                ..alice()
            },
            issued_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(365),
        };
        let forged_payload = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(codec.verify(&forged), Err(AppError::InvalidToken)));
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let codec = SessionCodec::new(SECRET, 3600);

        for token in ["", "no-dot", "a.b.c", "!!!.???", "e30.AAAA"] {
            assert!(
                matches!(codec.verify(token), Err(AppError::InvalidToken)),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        let codec = SessionCodec::new(SECRET, i64::MAX);
        assert_eq!(
            codec.max_age(),
            Duration::seconds(MAX_SESSION_AGE_SECONDS)
        );

        let token = codec.issue(&alice()).unwrap();
        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn expiry_past_calendar_range_is_an_error() {
        let codec = SessionCodec::new(SECRET, 3600);
        let result = codec.issue_at(&alice(), DateTime::<Utc>::MAX_UTC);

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), Duration::days(7), false);
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Max-Age=604800"));
        assert!(!rendered.contains("Secure"));

        let secure = session_cookie("abc".to_string(), Duration::days(7), true);
        assert!(secure.to_string().contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let rendered = clear_session_cookie().to_string();
        assert!(rendered.starts_with("token="));
        assert!(rendered.contains("Max-Age=0"));
    }
}
