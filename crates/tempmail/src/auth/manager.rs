// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token manager: holds the current bearer token, refreshes it on a fixed
//! cadence in the background, and refreshes on demand when a caller finds
//! it missing or expired.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{AuthEndpoint, Connectivity};
use crate::auth::{normalize_raw_token, AuthToken, RefreshError, TokenSettings, TokenState};
use crate::clock::Clock;

/// Owns the process's bearer token. Share it as `Arc<TokenManager>`.
pub struct TokenManager {
    endpoint: Arc<dyn AuthEndpoint>,
    connectivity: Arc<dyn Connectivity>,
    clock: Arc<dyn Clock>,
    settings: TokenSettings,
    state_tx: watch::Sender<TokenState>,
    /// Cancel handle of the running background loop, if any.
    refresh_task: Mutex<Option<CancellationToken>>,
    /// Parent of every loop token; cancelled by [`TokenManager::cleanup`].
    shutdown: CancellationToken,
}

impl TokenManager {
    pub fn new(
        endpoint: Arc<dyn AuthEndpoint>,
        connectivity: Arc<dyn Connectivity>,
        clock: Arc<dyn Clock>,
        settings: TokenSettings,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(TokenState::default());
        Arc::new(Self {
            endpoint,
            connectivity,
            clock,
            settings,
            state_tx,
            refresh_task: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to token state changes.
    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TokenState {
        self.state_tx.borrow().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state_tx.borrow().last_error.clone()
    }

    /// The held token, expired or not, without refreshing.
    pub fn peek(&self) -> Option<AuthToken> {
        self.state_tx.borrow().current.clone()
    }

    pub fn settings(&self) -> TokenSettings {
        self.settings
    }

    /// Start the periodic refresh loop, replacing any loop already running.
    ///
    /// No-op after [`TokenManager::cleanup`].
    pub fn start_background_refresh(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            debug!("token manager shut down, not starting refresh loop");
            return;
        }
        let cancel = self.shutdown.child_token();
        if let Some(prev) = self.refresh_task.lock().replace(cancel.clone()) {
            prev.cancel();
        }
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.refresh_loop(cancel).await;
        });
    }

    /// Stop the periodic refresh loop. Safe to call when not running.
    pub fn stop_background_refresh(&self) {
        if let Some(cancel) = self.refresh_task.lock().take() {
            cancel.cancel();
        }
    }

    pub fn is_background_refresh_running(&self) -> bool {
        self.refresh_task.lock().as_ref().is_some_and(|c| !c.is_cancelled())
    }

    /// Return the held token if it is still valid, refreshing first if it is
    /// missing or expired. `None` means no usable token.
    pub async fn current_token(&self) -> Option<AuthToken> {
        if let Some(token) = self.valid_token() {
            return Some(token);
        }
        let _ = self.refresh_once().await;
        self.valid_token()
    }

    /// Refresh now, regardless of the held token's age.
    pub async fn force_refresh(&self) -> bool {
        self.force_refresh_token().await.is_some()
    }

    /// Refresh now and return the token this attempt produced.
    pub async fn force_refresh_token(&self) -> Option<AuthToken> {
        self.refresh_once().await.ok()
    }

    /// Stop the loop and release the manager's task context for good.
    pub fn cleanup(&self) {
        self.stop_background_refresh();
        self.shutdown.cancel();
    }

    fn valid_token(&self) -> Option<AuthToken> {
        let now = self.clock.now_ms();
        self.state_tx.borrow().current.clone().filter(|t| !t.is_expired_at(now))
    }

    /// One refresh attempt. Publishes the outcome; never leaves a stale error.
    pub(crate) async fn refresh_once(&self) -> Result<AuthToken, RefreshError> {
        debug!("refreshing token");
        self.state_tx.send_modify(|s| s.last_error = None);

        let result = self.fetch_token().await;
        match &result {
            Ok(token) => {
                let token = token.clone();
                debug!(expires_at_ms = token.expires_at_ms(), "token refreshed");
                self.state_tx.send_modify(|s| s.current = Some(token));
            }
            Err(e) => {
                warn!(err = %e, "token refresh failed");
                self.record_error(e);
            }
        }
        result
    }

    async fn fetch_token(&self) -> Result<AuthToken, RefreshError> {
        if !self.connectivity.is_online() {
            return Err(RefreshError::Offline);
        }
        let raw = self.endpoint.fetch_raw_token().await.map_err(RefreshError::Endpoint)?;
        let value = normalize_raw_token(&raw).ok_or(RefreshError::EmptyToken)?;
        Ok(AuthToken::new(value, self.clock.now_ms(), self.settings.validity))
    }

    fn record_error(&self, e: &RefreshError) {
        let msg = e.to_string();
        self.state_tx.send_modify(|s| s.last_error = Some(msg));
    }

    async fn refresh_loop(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            interval_secs = self.settings.refresh_interval.as_secs(),
            "token refresh loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            // Each attempt runs in its own task so a panic cannot end the loop.
            let manager = Arc::clone(&self);
            let attempt = tokio::spawn(async move { manager.refresh_once().await.is_ok() }).await;
            let delay = match attempt {
                Ok(true) => self.settings.refresh_interval,
                Ok(false) => self.settings.error_backoff,
                Err(e) => {
                    error!(err = %e, "token refresh task failed");
                    self.record_error(&RefreshError::Aborted(e.to_string()));
                    self.settings.error_backoff
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("token refresh loop stopped");
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
