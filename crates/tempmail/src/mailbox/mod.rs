// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-mailbox message list with auto-refresh.

pub mod coordinator;

use crate::model::Message;

pub use coordinator::{LoadOutcome, MailboxCoordinator, DEFAULT_POLL_INTERVAL};

/// Observable state of one mailbox view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxViewState {
    /// Messages in server order, replaced wholesale on each successful load.
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
}
