// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiFuture, AuthEndpoint};
use crate::error::ApiError;
use crate::test_support::{token_manager, ManualClock, MockAuthEndpoint, ToggleConnectivity};

use super::*;

fn setup() -> (Arc<MockAuthEndpoint>, Arc<ManualClock>, Arc<TokenManager>) {
    let endpoint = MockAuthEndpoint::numbered();
    let clock = Arc::new(ManualClock::new(0));
    let manager = token_manager(Arc::clone(&endpoint), Arc::clone(&clock));
    (endpoint, clock, manager)
}

#[tokio::test]
async fn current_token_fetches_when_empty_and_strips_quotes() {
    let (endpoint, _clock, manager) = setup();
    assert!(manager.peek().is_none());

    let token = manager.current_token().await.expect("token");
    assert_eq!(token.value(), "tok-1");
    assert_eq!(token.expires_at_ms(), 300_000);
    assert_eq!(endpoint.calls(), 1);
    assert_eq!(manager.peek(), Some(token));
}

#[tokio::test]
async fn current_token_reuses_valid_token() {
    let (endpoint, _clock, manager) = setup();
    let first = manager.current_token().await.expect("first");
    let second = manager.current_token().await.expect("second");
    assert_eq!(first, second);
    assert_eq!(endpoint.calls(), 1);
}

#[tokio::test]
async fn held_token_expiry_scenario() {
    let (endpoint, clock, manager) = setup();

    assert!(manager.force_refresh().await);
    assert_eq!(endpoint.calls(), 1);

    clock.set(289_000);
    let token = manager.current_token().await.expect("still valid");
    assert_eq!(token.value(), "tok-1");
    assert_eq!(endpoint.calls(), 1);

    clock.set(301_000);
    let token = manager.current_token().await.expect("refreshed");
    assert_eq!(token.value(), "tok-2");
    assert_eq!(token.expires_at_ms(), 601_000);
    assert_eq!(endpoint.calls(), 2);
}

#[tokio::test]
async fn failed_refresh_records_error_and_keeps_token() {
    let (endpoint, _clock, manager) = setup();
    assert!(manager.force_refresh().await);

    endpoint.fail_with(ApiError::from_status(503, "Service Unavailable"));
    assert!(!manager.force_refresh().await);

    let state = manager.state();
    assert_eq!(state.current.as_ref().map(|t| t.value()), Some("tok-1"));
    let err = state.last_error.expect("error recorded");
    assert!(err.contains("HTTP 503"), "got: {err}");
}

#[tokio::test]
async fn successful_refresh_clears_previous_error() {
    let (endpoint, _clock, manager) = setup();
    endpoint.push(Err(ApiError::Transport("connection reset".to_owned())));

    assert!(!manager.force_refresh().await);
    assert!(manager.last_error().is_some());

    assert!(manager.force_refresh().await);
    assert_eq!(manager.last_error(), None);
}

#[tokio::test]
async fn offline_short_circuits_without_calling_endpoint() {
    let endpoint = MockAuthEndpoint::numbered();
    let connectivity = Arc::new(ToggleConnectivity::new(false));
    let manager = TokenManager::new(
        Arc::clone(&endpoint) as Arc<dyn AuthEndpoint>,
        Arc::clone(&connectivity) as Arc<dyn crate::api::Connectivity>,
        Arc::new(ManualClock::new(0)),
        TokenSettings::default(),
    );

    assert!(manager.current_token().await.is_none());
    assert_eq!(endpoint.calls(), 0);
    assert_eq!(manager.last_error().as_deref(), Some("No internet connection"));

    connectivity.set_online(true);
    assert!(manager.current_token().await.is_some());
    assert_eq!(manager.last_error(), None);
}

#[tokio::test]
async fn blank_token_is_rejected() {
    for raw in ["", "  \n", "\"\""] {
        let (endpoint, _clock, manager) = setup();
        endpoint.push(Ok(raw.to_owned()));

        assert!(!manager.force_refresh().await, "accepted {raw:?}");
        assert!(manager.peek().is_none());
        assert_eq!(manager.last_error().as_deref(), Some("Received empty token"));
    }
}

#[tokio::test]
async fn expired_token_and_failed_refresh_yields_none() {
    let (endpoint, clock, manager) = setup();
    assert!(manager.force_refresh().await);

    endpoint.fail_with(ApiError::Transport("timed out".to_owned()));
    clock.set(300_000);
    assert!(manager.current_token().await.is_none());
    assert!(manager.peek().is_some(), "held token is kept for inspection");
}

#[tokio::test]
async fn subscribers_see_refreshes() {
    let (_endpoint, _clock, manager) = setup();
    let mut rx = manager.subscribe();

    assert!(manager.force_refresh().await);
    rx.changed().await.expect("sender alive");
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.current.map(|t| t.value().to_owned()), Some("tok-1".to_owned()));
}

#[tokio::test(start_paused = true)]
async fn background_loop_refreshes_on_interval() {
    let (endpoint, _clock, manager) = setup();
    manager.start_background_refresh();
    assert!(manager.is_background_refresh_running());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(endpoint.calls(), 1);

    tokio::time::sleep(Duration::from_secs(290)).await;
    assert_eq!(endpoint.calls(), 2);
    assert_eq!(manager.peek().map(|t| t.value().to_owned()), Some("tok-2".to_owned()));

    manager.stop_background_refresh();
}

#[tokio::test(start_paused = true)]
async fn starting_twice_runs_one_loop() {
    let (endpoint, _clock, manager) = setup();
    manager.start_background_refresh();
    manager.start_background_refresh();

    // Attempts at t=0, 290, 580.
    tokio::time::sleep(Duration::from_secs(590)).await;
    assert_eq!(endpoint.calls(), 3);

    manager.stop_background_refresh();
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_retries_after_backoff() {
    let (endpoint, _clock, manager) = setup();
    endpoint.fail_with(ApiError::from_status(500, "Internal Server Error"));
    manager.start_background_refresh();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(endpoint.calls(), 1);
    assert!(manager.last_error().is_some());

    endpoint.succeed();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(endpoint.calls(), 2);
    assert_eq!(manager.last_error(), None);

    // Back on the regular cadence: next attempt at t=320.
    tokio::time::sleep(Duration::from_secs(200)).await;
    assert_eq!(endpoint.calls(), 2);

    manager.stop_background_refresh();
}

#[tokio::test(start_paused = true)]
async fn stop_halts_refreshes() {
    let (endpoint, _clock, manager) = setup();
    manager.start_background_refresh();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(endpoint.calls(), 1);

    manager.stop_background_refresh();
    assert!(!manager.is_background_refresh_running());
    tokio::time::sleep(Duration::from_secs(1_000)).await;
    assert_eq!(endpoint.calls(), 1);

    // Stopping again is harmless.
    manager.stop_background_refresh();
}

#[tokio::test(start_paused = true)]
async fn cleanup_prevents_restart() {
    let (endpoint, _clock, manager) = setup();
    manager.cleanup();
    manager.start_background_refresh();
    assert!(!manager.is_background_refresh_running());

    tokio::time::sleep(Duration::from_secs(1_000)).await;
    assert_eq!(endpoint.calls(), 0);
}

/// Panics on its first call, then issues tokens.
struct PanicOnceEndpoint {
    calls: AtomicU32,
}

impl AuthEndpoint for PanicOnceEndpoint {
    fn fetch_raw_token(&self) -> ApiFuture<'_, String> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n == 0 {
            panic!("endpoint exploded");
        }
        Box::pin(async move { Ok(format!("tok-{n}")) })
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_attempt_does_not_end_loop() {
    let endpoint = Arc::new(PanicOnceEndpoint { calls: AtomicU32::new(0) });
    let manager = TokenManager::new(
        Arc::clone(&endpoint) as Arc<dyn AuthEndpoint>,
        Arc::new(ToggleConnectivity::new(true)),
        Arc::new(ManualClock::new(0)),
        TokenSettings::default(),
    );
    manager.start_background_refresh();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let err = manager.last_error().expect("panic recorded");
    assert!(err.contains("aborted"), "got: {err}");
    assert!(manager.is_background_refresh_running());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(endpoint.calls.load(Ordering::Relaxed), 2);
    assert_eq!(manager.peek().map(|t| t.value().to_owned()), Some("tok-1".to_owned()));
    assert_eq!(manager.last_error(), None);

    manager.cleanup();
}
