// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failure reported by the mail service collaborators.
///
/// The polling core only branches on [`ApiError::is_unauthorized`]; every
/// other variant is surfaced to the user via its `Display` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 401: the bearer token was rejected.
    Unauthorized { message: String },
    /// Any other non-success HTTP status.
    Status { code: u16, message: String },
    /// Connection, TLS or timeout failure before a status was received.
    Transport(String),
    /// The response body could not be decoded.
    Decode(String),
    /// The server answered with an empty body where one was required.
    EmptyBody,
}

impl ApiError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == 401 {
            Self::Unauthorized { message }
        } else {
            Self::Status { code, message }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { code, .. } => Some(*code),
            Self::Transport(_) | Self::Decode(_) | Self::EmptyBody => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { message } => write!(f, "HTTP 401: {message}"),
            Self::Status { code, message } => write!(f, "HTTP {code}: {message}"),
            Self::Transport(msg) => write!(f, "request failed: {msg}"),
            Self::Decode(msg) => write!(f, "invalid response: {msg}"),
            Self::EmptyBody => f.write_str("Empty response body"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Decode(e.to_string());
        }
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), e.to_string()),
            None => Self::Transport(e.to_string()),
        }
    }
}

/// Failure reading or writing the local message detail cache.
#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Message id is not usable as a single file name.
    InvalidId(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cache io: {e}"),
            Self::Json(e) => write!(f, "cache entry: {e}"),
            Self::InvalidId(id) => write!(f, "invalid message id: {id:?}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::InvalidId(_) => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
