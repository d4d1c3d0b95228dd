// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random disposable address generation.

use rand::Rng;

use crate::clock::epoch_ms;
use crate::model::MailAddress;

/// Domains accepted by the default mail service.
pub const DEFAULT_DOMAINS: &[&str] = &["qabq.com", "nqmo.com", "end.tw", "uuf.me", "6n9.net"];

/// Returned when no domain is configured.
pub const FALLBACK_ADDRESS: &str = "error@example.com";

const LOCAL_PART_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const LOCAL_PART_LEN: usize = 8;

/// `<8 chars of [a-z0-9]>@<domain>` with a uniformly chosen domain.
pub fn generate_address<R: Rng + ?Sized>(domains: &[String], rng: &mut R) -> String {
    if domains.is_empty() {
        return FALLBACK_ADDRESS.to_owned();
    }
    let local: String = (0..LOCAL_PART_LEN)
        .map(|_| LOCAL_PART_CHARSET[rng.random_range(0..LOCAL_PART_CHARSET.len())] as char)
        .collect();
    let domain = &domains[rng.random_range(0..domains.len())];
    format!("{local}@{domain}")
}

/// A fresh address record stamped with a new id and the current time.
pub fn new_mail_address(domains: &[String]) -> MailAddress {
    MailAddress {
        id: uuid::Uuid::new_v4(),
        address: generate_address(domains, &mut rand::rng()),
        created_at: epoch_ms(),
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
