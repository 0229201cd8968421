//! Bearer-token authentication for the rally API.
//!
//! Every `/api` route requires an `Authorization: Bearer <token>` header. The
//! token is checked by a [`TokenVerifier`]; the service ships with
//! [`HmacTokenVerifier`], which accepts tokens minted with a shared secret.
//!
//! # Token Format
//!
//! ```text
//! token     = "{exp}.{signature}.{uid}"
//! signature = hex(HMAC-SHA256(secret, "{exp}.{uid}"))
//! ```
//!
//! `exp` is a Unix timestamp in seconds. The uid is last so it may contain
//! dots.
//!
//! # Example
//!
//! ```rust
//! use rally_api::server::auth::HmacTokenVerifier;
//! use std::time::Duration;
//!
//! let verifier = HmacTokenVerifier::new("my-secret-key").unwrap();
//! let token = verifier.issue("staff-42", Duration::from_secs(3600));
//! assert_eq!(verifier.verify_token(&token).unwrap().uid, "staff-42");
//! ```

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::AppState;
use crate::store::DocumentStore;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header, or an empty token
    MissingToken,

    /// Token is not `{exp}.{signature}.{uid}`
    MalformedToken,

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing bearer token"),
            AuthError::MalformedToken => write!(f, "Malformed bearer token"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Token expired at {} (current time: {})",
                expired_at, current_time
            ),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Every authentication failure is a bare 401.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let error_type = match &self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::Expired { .. } => "token_expired",
            AuthError::InvalidSignature => "invalid_signature",
        };

        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Authentication failed: {}",
            self
        );

        status.into_response()
    }
}

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
}

// =============================================================================
// Token Verifier
// =============================================================================

/// Verifies bearer tokens presented by API callers.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// Shared-secret token verifier using HMAC-SHA256.
#[derive(Clone)]
pub struct HmacTokenVerifier {
    /// MAC keyed with the secret; cloned per computation
    mac: HmacSha256,
}

impl HmacTokenVerifier {
    /// Create a verifier for the given secret key.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret_key.as_ref())?,
        })
    }

    /// Mint a token for `uid` valid for `ttl`.
    pub fn issue(&self, uid: &str, ttl: Duration) -> String {
        self.issue_with_expiry(uid, unix_now() + ttl.as_secs())
    }

    /// Mint a token for `uid` expiring at `expiry` (Unix seconds).
    pub fn issue_with_expiry(&self, uid: &str, expiry: u64) -> String {
        format!("{}.{}.{}", expiry, self.compute_signature(uid, expiry), uid)
    }

    /// Check a token synchronously.
    pub fn verify_token(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let mut parts = token.splitn(3, '.');
        let (Some(expiry), Some(signature), Some(uid)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken);
        };
        if uid.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        let expiry: u64 = expiry.parse().map_err(|_| AuthError::MalformedToken)?;

        let current_time = unix_now();
        if current_time > expiry {
            return Err(AuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        let provided = hex::decode(signature).map_err(|_| AuthError::MalformedToken)?;
        let expected = self.mac_bytes(uid, expiry);

        if provided.ct_eq(&expected).into() {
            Ok(VerifiedToken {
                uid: uid.to_string(),
            })
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    fn compute_signature(&self, uid: &str, expiry: u64) -> String {
        hex::encode(self.mac_bytes(uid, expiry))
    }

    fn mac_bytes(&self, uid: &str, expiry: u64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(format!("{}.{}", expiry, uid).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[async_trait]
impl TokenVerifier for HmacTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        self.verify_token(token)
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller of a request.
///
/// Handlers take this as their first extractor so that authentication is
/// decided before any parameter or body is looked at.
#[derive(Debug, Clone)]
pub struct Caller {
    pub uid: String,
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
    S: DocumentStore + 'static,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let verified = state.verifier.verify(token).await?;
        debug!(uid = %verified.uid, path = %parts.uri.path(), "Authenticated request");
        Ok(Caller { uid: verified.uid })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Tests
// =============================================================================
