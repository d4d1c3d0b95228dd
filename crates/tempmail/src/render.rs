// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering of messages for the terminal.

use crate::model::{Message, MessageBody, MessageDetail};

/// Column width used when wrapping HTML bodies.
pub const BODY_WIDTH: usize = 80;

const NO_CONTENT: &str = "[No displayable content]";

/// Render a body: HTML converted to text when present, else the plain text.
pub fn body_text(body: &MessageBody, width: usize) -> String {
    if let Some(html) = body.html.as_deref().filter(|h| !h.trim().is_empty()) {
        match html2text::from_read(html.as_bytes(), width) {
            Ok(text) => return text,
            Err(e) => tracing::debug!(err = %e, "html render failed, using text body"),
        }
    }
    match body.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text.to_owned(),
        _ => NO_CONTENT.to_owned(),
    }
}

/// One line per message in list views.
pub fn message_line(message: &Message) -> String {
    let marker = if message.seen { ' ' } else { '*' };
    let subject = if message.subject.is_empty() { "(no subject)" } else { &message.subject };
    format!("{marker} {id}  {date}  {from}  {subject}", id = message.id, date = message.date, from = message.from)
}

/// Header block printed above a message body.
pub fn detail_header(detail: &MessageDetail) -> String {
    format!(
        "From:    {}\nTo:      {}\nDate:    {}\nSubject: {}\n",
        detail.from,
        detail.to.join(", "),
        detail.date,
        detail.subject,
    )
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
