// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the mail service.

use serde::{Deserialize, Serialize};

/// A message summary as listed by the mailbox endpoint.
///
/// Server response order is preserved by callers; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub mailbox: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub posix_millis: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub seen: bool,
}

/// Message body in the formats the server provides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Full message as returned by the detail endpoint and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: MessageBody,
    #[serde(default)]
    pub date: String,
}

impl MessageDetail {
    /// Summary row for the history view. Fields the detail lacks are zeroed.
    pub fn to_summary(&self) -> Message {
        Message {
            id: self.id.clone(),
            mailbox: String::new(),
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            date: self.date.clone(),
            posix_millis: 0,
            size: 0,
            seen: true,
        }
    }
}

/// A generated disposable address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailAddress {
    pub id: uuid::Uuid,
    pub address: String,
    pub created_at: u64,
}
