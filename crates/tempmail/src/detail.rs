// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-message view: cache first, then the network with the same
//! unauthorized-retry policy as the mailbox list.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::MailboxClient;
use crate::auth::{call_with_token, CallError, TokenManager};
use crate::cache::DetailCache;
use crate::model::MessageDetail;

/// Observable state of the detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailViewState {
    pub detail: Option<MessageDetail>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct DetailLoader {
    tokens: Arc<TokenManager>,
    client: Arc<dyn MailboxClient>,
    cache: Option<DetailCache>,
    state_tx: watch::Sender<DetailViewState>,
}

impl DetailLoader {
    /// `cache` of `None` always goes to the network.
    pub fn new(
        tokens: Arc<TokenManager>,
        client: Arc<dyn MailboxClient>,
        cache: Option<DetailCache>,
    ) -> Self {
        let (state_tx, _) = watch::channel(DetailViewState::default());
        Self { tokens, client, cache, state_tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailViewState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> DetailViewState {
        self.state_tx.borrow().clone()
    }

    pub fn clear_error(&self) {
        self.state_tx.send_modify(|s| s.error = None);
    }

    /// Load message `id` of `address`, publishing the result.
    pub async fn load(&self, address: &str, id: &str) -> Result<MessageDetail, CallError> {
        if let Some(detail) = self.cache.as_ref().and_then(|c| c.get(id)) {
            debug!(%id, "message detail served from cache");
            self.state_tx.send_modify(|s| {
                s.detail = Some(detail.clone());
                s.error = None;
            });
            return Ok(detail);
        }

        self.state_tx.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        let client = &self.client;
        let result = call_with_token(&self.tokens, |token| async move {
            client.get_message_detail(address, id, &token).await
        })
        .await;

        match &result {
            Ok(detail) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(detail) {
                        warn!(%id, err = %e, "failed to cache message detail");
                    }
                }
                self.state_tx.send_modify(|s| {
                    s.detail = Some(detail.clone());
                    s.is_loading = false;
                });
            }
            Err(e) => {
                warn!(%address, %id, err = %e, "failed to load message detail");
                let msg = e.to_string();
                self.state_tx.send_modify(|s| {
                    s.error = Some(msg);
                    s.is_loading = false;
                });
            }
        }
        result
    }
}

#[cfg(test)]
#[path = "detail_tests.rs"]
mod tests;
