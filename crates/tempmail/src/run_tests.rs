// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::api::MailboxClient;
use crate::error::ApiError;
use crate::mailbox::DEFAULT_POLL_INTERVAL;
use crate::test_support::{detail, message, token_manager, ManualClock, MockAuthEndpoint, MockMailbox};

use super::*;

fn loaded(ids: &[&str]) -> MailboxViewState {
    MailboxViewState {
        messages: ids.iter().map(|id| message(id)).collect(),
        is_loading: false,
        error: None,
    }
}

#[test]
fn printer_prints_list_once() {
    let mut printer = ViewPrinter::default();

    let lines = printer.update(&loaded(&["m2", "m1"]));
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "2 message(s):");
    assert!(lines[1].contains("m2"));

    assert!(printer.update(&loaded(&["m2", "m1"])).is_empty());
}

#[test]
fn printer_waits_out_loading_states() {
    let mut printer = ViewPrinter::default();
    let mut state = loaded(&[]);
    state.is_loading = true;
    assert!(printer.update(&state).is_empty());

    state.is_loading = false;
    assert_eq!(printer.update(&state), vec!["(no messages)"]);
}

#[test]
fn printer_reports_new_errors_only() {
    let mut printer = ViewPrinter::default();
    printer.update(&loaded(&["m1"]));

    let mut failed = loaded(&["m1"]);
    failed.error = Some("HTTP 500: boom".to_owned());
    assert_eq!(printer.update(&failed), vec!["error: HTTP 500: boom"]);
    assert!(printer.update(&failed).is_empty());

    // Recovery clears the error silently; the next failure prints again.
    assert!(printer.update(&loaded(&["m1"])).is_empty());
    assert_eq!(printer.update(&failed).len(), 1);
}

#[tokio::test]
async fn history_reads_configured_cache() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    DetailCache::open(dir.path())?.put(&detail("m1"))?;

    let mut config = Config::test();
    config.cache_dir = Some(dir.path().to_path_buf());
    run(config).await?;
    Ok(())
}

#[tokio::test]
async fn new_prints_an_address() -> anyhow::Result<()> {
    let mut config = Config::test();
    config.command = Command::New;
    run(config).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watching_keeps_polling_after_failed_first_load() {
    let endpoint = MockAuthEndpoint::failing(ApiError::from_status(503, "Service Unavailable"));
    let tokens = token_manager(Arc::clone(&endpoint), Arc::new(ManualClock::new(0)));
    let mailbox = MockMailbox::with_messages(vec![message("m1")]);
    let coordinator = MailboxCoordinator::new(
        tokens,
        Arc::clone(&mailbox) as Arc<dyn MailboxClient>,
        DEFAULT_POLL_INTERVAL,
    );

    let first = start_watching(&coordinator, "box@example.com").await;
    assert_eq!(first, LoadOutcome::Failed("No valid token available".to_owned()));
    assert!(coordinator.is_auto_refresh_running());

    // Auth comes back; the next tick picks the mailbox up.
    endpoint.succeed();
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(mailbox.list_calls(), 1);
    assert_eq!(coordinator.state().messages.len(), 1);
    assert_eq!(coordinator.state().error, None);
}
