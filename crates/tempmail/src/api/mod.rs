// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mail service collaborators: token endpoint, mailbox endpoints, and
//! network reachability.
//!
//! The core only sees these traits; [`http::MailApi`] is the production
//! implementation.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use crate::error::ApiError;
use crate::model::{Message, MessageDetail};

/// Boxed future returned by collaborator calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Issues fresh bearer tokens.
///
/// Object-safe for use as `Arc<dyn AuthEndpoint>`.
pub trait AuthEndpoint: Send + Sync {
    /// Fetch a raw token string. The value may carry surrounding quotes and
    /// whitespace; callers normalize it.
    fn fetch_raw_token(&self) -> ApiFuture<'_, String>;
}

/// Bearer-authenticated mailbox reads.
pub trait MailboxClient: Send + Sync {
    fn list_messages<'a>(&'a self, address: &'a str, token: &'a str)
        -> ApiFuture<'a, Vec<Message>>;

    fn get_message_detail<'a>(
        &'a self,
        address: &'a str,
        message_id: &'a str,
        token: &'a str,
    ) -> ApiFuture<'a, MessageDetail>;
}

/// Reports whether a network is currently reachable.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// [`Connectivity`] that always reports online; transport errors surface
/// through the normal failure path instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
