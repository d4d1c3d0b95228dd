// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::MailboxClient;
use crate::auth::{call_with_token, CallError, TokenManager};
use crate::mailbox::MailboxViewState;

/// Auto-refresh period while the mailbox is visible.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one `load_messages` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list was replaced with this many messages.
    Loaded(usize),
    /// The load failed; the message was published as the view error.
    Failed(String),
    /// Another load was in flight, or the coordinator is closed.
    Skipped,
}

/// Loads one mailbox's messages and keeps them fresh while active.
///
/// Dropping the coordinator stops its timer.
pub struct MailboxCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    tokens: Arc<TokenManager>,
    client: Arc<dyn MailboxClient>,
    poll_interval: Duration,
    state_tx: watch::Sender<MailboxViewState>,
    /// Address of the most recent load; timer ticks reload it.
    address: Mutex<Option<String>>,
    /// Guarded by `timer` for transitions.
    active: AtomicBool,
    timer: Mutex<Option<CancellationToken>>,
    in_flight: tokio::sync::Mutex<()>,
    lifetime: CancellationToken,
}

impl MailboxCoordinator {
    pub fn new(
        tokens: Arc<TokenManager>,
        client: Arc<dyn MailboxClient>,
        poll_interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(MailboxViewState::default());
        Self {
            inner: Arc::new(Inner {
                tokens,
                client,
                poll_interval,
                state_tx,
                address: Mutex::new(None),
                active: AtomicBool::new(true),
                timer: Mutex::new(None),
                in_flight: tokio::sync::Mutex::new(()),
                lifetime: CancellationToken::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MailboxViewState> {
        self.inner.state_tx.subscribe()
    }

    pub fn state(&self) -> MailboxViewState {
        self.inner.state_tx.borrow().clone()
    }

    /// Address the timer reloads, once one has been loaded.
    pub fn address(&self) -> Option<String> {
        self.inner.address.lock().clone()
    }

    /// Fetch `address`'s messages and publish them.
    ///
    /// A 401 forces one token refresh and one retry. Returns
    /// [`LoadOutcome::Skipped`] without touching the network when another
    /// load is still in flight.
    pub async fn load_messages(&self, address: &str) -> LoadOutcome {
        self.inner.load(address).await
    }

    /// Reload now and restart the auto-refresh countdown.
    pub async fn refresh_emails(&self, address: &str) -> LoadOutcome {
        let was_running = self.inner.stop_timer();
        let outcome = self.inner.load(address).await;
        if was_running {
            self.inner.ensure_timer();
        }
        outcome
    }

    /// The view became visible: resume auto-refresh.
    pub fn on_active(&self) {
        debug!("mailbox active");
        self.inner.active.store(true, Ordering::Release);
        self.inner.ensure_timer();
    }

    /// The view was hidden: stop auto-refresh.
    pub fn on_inactive(&self) {
        debug!("mailbox inactive");
        let mut timer = self.inner.timer.lock();
        self.inner.active.store(false, Ordering::Release);
        if let Some(cancel) = timer.take() {
            cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn is_auto_refresh_running(&self) -> bool {
        self.inner.timer.lock().as_ref().is_some_and(|c| !c.is_cancelled())
    }

    pub fn clear_error(&self) {
        self.inner.state_tx.send_modify(|s| s.error = None);
    }

    pub fn clear_messages(&self) {
        self.inner.state_tx.send_modify(|s| s.messages.clear());
    }

    /// Tear down: stop the timer, refuse further loads, drop the list.
    pub fn close(&self) {
        self.inner.stop_timer();
        self.inner.lifetime.cancel();
        self.clear_messages();
    }
}

impl Drop for MailboxCoordinator {
    fn drop(&mut self) {
        self.inner.lifetime.cancel();
    }
}

impl Inner {
    async fn load(self: &Arc<Self>, address: &str) -> LoadOutcome {
        *self.address.lock() = Some(address.to_owned());

        let Ok(_flight) = self.in_flight.try_lock() else {
            debug!(%address, "load already in flight, skipping");
            return LoadOutcome::Skipped;
        };
        if self.lifetime.is_cancelled() {
            return LoadOutcome::Skipped;
        }

        let _loading = LoadingGuard::begin(&self.state_tx);
        debug!(%address, "loading messages");
        let client = &self.client;
        let result = call_with_token(&self.tokens, |token| async move {
            client.list_messages(address, &token).await
        })
        .await;

        // Closed while the request was out: publish nothing.
        if self.lifetime.is_cancelled() {
            return LoadOutcome::Skipped;
        }

        match result {
            Ok(messages) => {
                let count = messages.len();
                debug!(%address, count, "messages loaded");
                self.state_tx.send_modify(|s| s.messages = messages);
                self.ensure_timer();
                LoadOutcome::Loaded(count)
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(%address, err = %msg, "failed to load messages");
                let clear = matches!(e, CallError::NoToken);
                self.state_tx.send_modify(|s| {
                    if clear {
                        s.messages.clear();
                    }
                    s.error = Some(msg.clone());
                });
                LoadOutcome::Failed(msg)
            }
        }
    }

    /// Start the timer unless inactive, closed, or already running.
    fn ensure_timer(self: &Arc<Self>) {
        let mut timer = self.timer.lock();
        if !self.active.load(Ordering::Acquire) || self.lifetime.is_cancelled() {
            return;
        }
        if timer.as_ref().is_some_and(|c| !c.is_cancelled()) {
            return;
        }
        let cancel = self.lifetime.child_token();
        *timer = Some(cancel.clone());
        drop(timer);

        tokio::spawn(poll_loop(Arc::downgrade(self), cancel, self.poll_interval));
    }

    /// Returns whether a timer was running.
    fn stop_timer(&self) -> bool {
        match self.timer.lock().take() {
            Some(cancel) => {
                let running = !cancel.is_cancelled();
                cancel.cancel();
                running
            }
            None => false,
        }
    }
}

async fn poll_loop(inner: Weak<Inner>, cancel: CancellationToken, interval: Duration) {
    debug!(interval_ms = interval.as_millis() as u64, "auto-refresh started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let Some(inner) = inner.upgrade() else { break };
        let Some(address) = inner.address.lock().clone() else { continue };
        inner.load(&address).await;
    }
    debug!("auto-refresh stopped");
}

/// Marks the view loading for the lifetime of one request.
struct LoadingGuard<'a> {
    state_tx: &'a watch::Sender<MailboxViewState>,
}

impl<'a> LoadingGuard<'a> {
    fn begin(state_tx: &'a watch::Sender<MailboxViewState>) -> Self {
        state_tx.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        Self { state_tx }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state_tx.send_modify(|s| s.is_loading = false);
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
