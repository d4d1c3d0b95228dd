// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the mail service REST API.

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::warn;

use crate::api::{ApiFuture, AuthEndpoint, MailboxClient};
use crate::error::ApiError;
use crate::model::{Message, MessageDetail};

/// Default public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mail.cx/api/v1";

const AUTH_PATH: [&str; 2] = ["auth", "authorize_token"];

/// HTTP client wrapper for the mail service.
pub struct MailApi {
    base_url: String,
    client: Client,
}

impl MailApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        install_crypto_provider();
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client }
    }

    /// Base URL with `segments` appended, each percent-encoded as one
    /// path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorize(&self) -> Result<String, ApiError> {
        let url = self.url(&AUTH_PATH)?;
        let resp = self.client.post(url.clone()).body("").send().await?;
        let resp = check_status(resp, url.as_str()).await?;
        let body = resp.text().await?;
        if body.is_empty() {
            return Err(ApiError::EmptyBody);
        }
        Ok(body)
    }

    async fn mailbox(&self, address: &str, token: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.url(&["mailbox", address])?;
        let resp = self.client.get(url.clone()).bearer_auth(token).send().await?;
        let resp = check_status(resp, url.as_str()).await?;
        let bytes = resp.bytes().await?;
        // An empty mailbox may come back as an empty body instead of `[]`.
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn message(
        &self,
        address: &str,
        message_id: &str,
        token: &str,
    ) -> Result<MessageDetail, ApiError> {
        let url = self.url(&["mailbox", address, message_id])?;
        let resp = self.client.get(url.clone()).bearer_auth(token).send().await?;
        let resp = check_status(resp, url.as_str()).await?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyBody);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl AuthEndpoint for MailApi {
    fn fetch_raw_token(&self) -> ApiFuture<'_, String> {
        Box::pin(self.authorize())
    }
}

impl MailboxClient for MailApi {
    fn list_messages<'a>(
        &'a self,
        address: &'a str,
        token: &'a str,
    ) -> ApiFuture<'a, Vec<Message>> {
        Box::pin(self.mailbox(address, token))
    }

    fn get_message_detail<'a>(
        &'a self,
        address: &'a str,
        message_id: &'a str,
        token: &'a str,
    ) -> ApiFuture<'a, MessageDetail> {
        Box::pin(self.message(address, message_id, token))
    }
}

/// Map a non-success response to an [`ApiError`] carrying URL and body text.
async fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let reason = status.canonical_reason().unwrap_or("");
    warn!(status = status.as_u16(), %url, "mail api request failed");
    Err(ApiError::from_status(status.as_u16(), format!("{reason}, URL: {url}, Body: {body}")))
}

/// reqwest is built without a default TLS provider; install ring once.
fn install_crypto_provider() {
    // Err only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
