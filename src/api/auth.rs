//! HTTP basic auth for the gallery endpoints.
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, AppResult};

#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub pass: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials").field("user", &self.user).field("pass", &"<redacted>").finish()
    }
}

impl BasicCredentials {
    /// Both halves must be configured for the gallery to accept anyone.
    pub fn from_parts(user: Option<String>, pass: Option<String>) -> Option<Self> {
        Some(BasicCredentials { user: user?, pass: pass? })
    }
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
pub fn parse_basic(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some(BasicCredentials { user: user.to_string(), pass: pass.to_string() })
}

/// `Ok` only when the request carries exactly the configured credentials.
/// With nothing configured every request is rejected.
pub fn require_basic(headers: &HeaderMap, expected: Option<&BasicCredentials>) -> AppResult<()> {
    let expected = expected.ok_or(AppError::Unauthorized)?;
    match parse_basic(headers) {
        Some(given) if given == *expected => Ok(()),
        Some(given) => {
            tracing::warn!(user = %given.user, "Rejected gallery credentials");
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}
