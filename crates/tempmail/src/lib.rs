// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tempmail: disposable-mailbox client with a self-refreshing bearer token
//! and per-mailbox polling.

pub mod address;
pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod detail;
pub mod error;
pub mod mailbox;
pub mod model;
pub mod render;
pub mod run;
pub mod test_support;
