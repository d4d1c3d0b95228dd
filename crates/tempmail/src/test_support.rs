// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: mock collaborators, a manual clock, and
//! assertion helpers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::api::{ApiFuture, AuthEndpoint, Connectivity, MailboxClient};
use crate::auth::{TokenManager, TokenSettings};
use crate::clock::Clock;
use crate::error::ApiError;
use crate::model::{Message, MessageBody, MessageDetail};

/// [`Clock`] that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self { now_ms: AtomicU64::new(now_ms) }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

/// [`Connectivity`] that can be switched off mid-test.
#[derive(Debug)]
pub struct ToggleConnectivity {
    online: AtomicBool,
}

impl ToggleConnectivity {
    pub fn new(online: bool) -> Self {
        Self { online: AtomicBool::new(online) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Connectivity for ToggleConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

/// What a mock auth endpoint answers once its queue is drained.
enum TokenFallback {
    /// Issue `"{prefix}-{n}"` for the n-th call (1-based).
    Numbered(String),
    Fail(ApiError),
}

/// Scripted [`AuthEndpoint`].
///
/// Queued responses are served first; afterwards the fallback applies.
pub struct MockAuthEndpoint {
    queue: Mutex<VecDeque<Result<String, ApiError>>>,
    fallback: Mutex<TokenFallback>,
    calls: AtomicU32,
}

impl MockAuthEndpoint {
    /// Endpoint issuing `tok-1`, `tok-2`, ... on successive calls.
    pub fn numbered() -> Arc<Self> {
        Self::with_fallback(TokenFallback::Numbered("tok".to_owned()))
    }

    /// Endpoint that always fails with `err`.
    pub fn failing(err: ApiError) -> Arc<Self> {
        Self::with_fallback(TokenFallback::Fail(err))
    }

    fn with_fallback(fallback: TokenFallback) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicU32::new(0),
        })
    }

    /// Queue a one-off response ahead of the fallback.
    pub fn push(&self, response: Result<String, ApiError>) {
        self.queue.lock().push_back(response);
    }

    /// Switch the fallback to numbered tokens.
    pub fn succeed(&self) {
        *self.fallback.lock() = TokenFallback::Numbered("tok".to_owned());
    }

    /// Switch the fallback to a failure.
    pub fn fail_with(&self, err: ApiError) {
        *self.fallback.lock() = TokenFallback::Fail(err);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    fn next(&self) -> Result<String, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(queued) = self.queue.lock().pop_front() {
            return queued;
        }
        match &*self.fallback.lock() {
            TokenFallback::Numbered(prefix) => Ok(format!("\"{prefix}-{n}\"\n")),
            TokenFallback::Fail(err) => Err(err.clone()),
        }
    }
}

impl AuthEndpoint for MockAuthEndpoint {
    fn fetch_raw_token(&self) -> ApiFuture<'_, String> {
        let response = self.next();
        Box::pin(async move { response })
    }
}

/// Scripted [`MailboxClient`] recording the tokens it was called with.
pub struct MockMailbox {
    list_queue: Mutex<VecDeque<Result<Vec<Message>, ApiError>>>,
    list_fallback: Mutex<Result<Vec<Message>, ApiError>>,
    detail_queue: Mutex<VecDeque<Result<MessageDetail, ApiError>>>,
    list_tokens: Mutex<Vec<String>>,
    detail_tokens: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
}

impl MockMailbox {
    /// Mailbox whose list call returns `messages` until told otherwise.
    pub fn with_messages(messages: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            list_queue: Mutex::new(VecDeque::new()),
            list_fallback: Mutex::new(Ok(messages)),
            detail_queue: Mutex::new(VecDeque::new()),
            list_tokens: Mutex::new(Vec::new()),
            detail_tokens: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    /// Queue a one-off list response ahead of the fallback.
    pub fn push_list(&self, response: Result<Vec<Message>, ApiError>) {
        self.list_queue.lock().push_back(response);
    }

    pub fn set_list_fallback(&self, response: Result<Vec<Message>, ApiError>) {
        *self.list_fallback.lock() = response;
    }

    /// Queue a detail response. Detail calls with an empty queue fail 404.
    pub fn push_detail(&self, response: Result<MessageDetail, ApiError>) {
        self.detail_queue.lock().push_back(response);
    }

    /// Make every call wait `delay` (tokio time) before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn list_calls(&self) -> usize {
        self.list_tokens.lock().len()
    }

    /// Tokens passed to `list_messages`, in call order.
    pub fn list_tokens(&self) -> Vec<String> {
        self.list_tokens.lock().clone()
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_tokens.lock().len()
    }

    pub fn detail_tokens(&self) -> Vec<String> {
        self.detail_tokens.lock().clone()
    }
}

impl MailboxClient for MockMailbox {
    fn list_messages<'a>(
        &'a self,
        _address: &'a str,
        token: &'a str,
    ) -> ApiFuture<'a, Vec<Message>> {
        self.list_tokens.lock().push(token.to_owned());
        let response = match self.list_queue.lock().pop_front() {
            Some(queued) => queued,
            None => self.list_fallback.lock().clone(),
        };
        let delay = *self.delay.lock();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }

    fn get_message_detail<'a>(
        &'a self,
        _address: &'a str,
        message_id: &'a str,
        token: &'a str,
    ) -> ApiFuture<'a, MessageDetail> {
        self.detail_tokens.lock().push(token.to_owned());
        let response = self.detail_queue.lock().pop_front().unwrap_or_else(|| {
            Err(ApiError::from_status(404, format!("no scripted detail for {message_id}")))
        });
        let delay = *self.delay.lock();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }
}

/// Token manager wired to mocks with the default 300 s / 290 s / 30 s timing.
pub fn token_manager(
    endpoint: Arc<MockAuthEndpoint>,
    clock: Arc<ManualClock>,
) -> Arc<TokenManager> {
    TokenManager::new(
        endpoint,
        Arc::new(ToggleConnectivity::new(true)),
        clock,
        TokenSettings::default(),
    )
}

/// A message summary with predictable field values.
pub fn message(id: &str) -> Message {
    Message {
        id: id.to_owned(),
        mailbox: "box@example.com".to_owned(),
        from: format!("sender-{id}@example.com"),
        to: vec!["box@example.com".to_owned()],
        subject: format!("subject {id}"),
        date: "2026-01-01T00:00:00Z".to_owned(),
        posix_millis: 0,
        size: 128,
        seen: false,
    }
}

/// A message detail with an HTML body.
pub fn detail(id: &str) -> MessageDetail {
    MessageDetail {
        id: id.to_owned(),
        from: format!("sender-{id}@example.com"),
        to: vec!["box@example.com".to_owned()],
        subject: format!("subject {id}"),
        body: MessageBody {
            text: Some(format!("body {id}")),
            html: Some(format!("<p>body {id}</p>")),
        },
        date: "2026-01-01T00:00:00Z".to_owned(),
    }
}

/// The 401 a mailbox answers with when it rejects a token.
pub fn unauthorized() -> ApiError {
    ApiError::from_status(401, "Unauthorized")
}

/// Assert that an expression returns `Err` whose message contains `substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
