// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer token lifecycle: token values, the refreshing manager, and the
//! bounded unauthorized-retry policy shared by mailbox reads.

pub mod manager;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::clock::Clock;
use crate::error::ApiError;

pub use manager::TokenManager;

/// Retries allowed after a 401 before giving up on a request.
pub const MAX_UNAUTHORIZED_RETRIES: u32 = 1;

/// Default buffer for [`AuthToken::will_expire_soon`].
pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 10;

/// Immutable bearer token with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at_ms: u64,
}

impl AuthToken {
    /// Create a token issued at `now_ms`, valid for `validity`.
    pub fn new(value: impl Into<String>, now_ms: u64, validity: Duration) -> Self {
        let validity_ms = u64::try_from(validity.as_millis()).unwrap_or(u64::MAX);
        Self { value: value.into(), expires_at_ms: now_ms.saturating_add(validity_ms) }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expiry as milliseconds since Unix epoch.
    pub fn expires_at_ms(&self) -> u64 {
        self.expires_at_ms
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    pub fn will_expire_soon_at(&self, now_ms: u64, buffer_secs: u64) -> bool {
        now_ms >= self.expires_at_ms.saturating_sub(buffer_secs.saturating_mul(1000))
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.is_expired_at(clock.now_ms())
    }

    pub fn will_expire_soon(&self, clock: &dyn Clock, buffer_secs: u64) -> bool {
        self.will_expire_soon_at(clock.now_ms(), buffer_secs)
    }
}

/// Token manager state published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub current: Option<AuthToken>,
    pub last_error: Option<String>,
}

/// Timing knobs for the token manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    /// Lifetime stamped onto each new token.
    pub validity: Duration,
    /// Delay between successful background refreshes.
    pub refresh_interval: Duration,
    /// Delay after a failed background refresh.
    pub error_backoff: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            validity: Duration::from_secs(300),
            refresh_interval: Duration::from_secs(290),
            error_backoff: Duration::from_secs(30),
        }
    }
}

/// Why a single refresh attempt produced no token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    Offline,
    EmptyToken,
    Endpoint(ApiError),
    /// The attempt panicked or was aborted before finishing.
    Aborted(String),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("No internet connection"),
            Self::EmptyToken => f.write_str("Received empty token"),
            Self::Endpoint(e) => write!(f, "{e}"),
            Self::Aborted(msg) => write!(f, "token refresh aborted: {msg}"),
        }
    }
}

impl std::error::Error for RefreshError {}

/// Strip whitespace and one layer of surrounding quotes from a raw token.
///
/// Returns `None` when nothing usable remains.
pub fn normalize_raw_token(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    if trimmed.trim().is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Failure of a bearer-authenticated call after the retry policy ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// No usable token could be obtained up front.
    NoToken,
    /// The server kept rejecting the token, or the forced refresh failed.
    RefreshFailed,
    Api(ApiError),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoToken => f.write_str("No valid token available"),
            Self::RefreshFailed => f.write_str("Failed to refresh token"),
            Self::Api(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CallError {}

/// Run `call` with a valid token, forcing one refresh and retrying once if
/// the server answers 401.
///
/// `call` is invoked at most `1 + MAX_UNAUTHORIZED_RETRIES` times.
pub async fn call_with_token<T, F, Fut>(tokens: &TokenManager, mut call: F) -> Result<T, CallError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut token = tokens.current_token().await.ok_or(CallError::NoToken)?;
    let mut retries = 0;
    loop {
        match call(token.value().to_owned()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_unauthorized() => {
                if retries >= MAX_UNAUTHORIZED_RETRIES {
                    return Err(CallError::RefreshFailed);
                }
                retries += 1;
                info!("token rejected, forcing refresh");
                token = tokens.force_refresh_token().await.ok_or(CallError::RefreshFailed)?;
            }
            Err(e) => return Err(CallError::Api(e)),
        }
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
