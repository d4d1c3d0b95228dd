// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::address::DEFAULT_DOMAINS;
use crate::api::http::DEFAULT_BASE_URL;
use crate::auth::TokenSettings;

/// Disposable mailbox client.
#[derive(Debug, Parser)]
#[command(name = "tempmail", version, about)]
pub struct Config {
    /// Mail service API root.
    #[arg(long, env = "TEMPMAIL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Domains to generate addresses under (comma-separated).
    #[arg(long, env = "TEMPMAIL_DOMAINS", value_delimiter = ',')]
    pub domains: Vec<String>,

    /// Directory for cached message details.
    #[arg(long, env = "TEMPMAIL_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "TEMPMAIL_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TEMPMAIL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,

    // -- Duration overrides (skip from CLI; set in Config::test()) --------
    #[clap(skip)]
    pub token_validity_ms: Option<u64>,
    #[clap(skip)]
    pub token_refresh_ms: Option<u64>,
    #[clap(skip)]
    pub refresh_backoff_ms: Option<u64>,
    #[clap(skip)]
    pub poll_interval_ms: Option<u64>,
    #[clap(skip)]
    pub http_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print a freshly generated address.
    New,
    /// Poll a mailbox and print its messages as they change.
    Watch {
        /// Mailbox to watch; a new one is generated when omitted.
        address: Option<String>,
    },
    /// Print one message.
    Show { address: String, id: String },
    /// List messages opened before.
    History,
}

fn env_duration_ms(var: &str, default: u64) -> Duration {
    let ms = std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default);
    Duration::from_millis(ms)
}

macro_rules! duration_field {
    ($method:ident, $field:ident, $env:literal, $default:expr) => {
        pub fn $method(&self) -> Duration {
            match self.$field {
                Some(ms) => Duration::from_millis(ms),
                None => env_duration_ms($env, $default),
            }
        }
    };
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("--base-url must be an http(s) URL: {}", self.base_url);
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("--log-format must be json or text, got {}", self.log_format);
        }
        if let Some(bad) = self.domains.iter().find(|d| d.is_empty() || d.contains('@')) {
            anyhow::bail!("invalid domain: {bad:?}");
        }
        if let Command::Show { id, .. } = &self.command {
            if id.is_empty() || id.contains(['/', '\\']) {
                anyhow::bail!("invalid message id: {id:?}");
            }
        }

        // A token must outlive the gap between background refreshes.
        let settings = self.token_settings();
        if settings.refresh_interval.is_zero() || settings.error_backoff.is_zero() {
            anyhow::bail!("token refresh intervals must be non-zero");
        }
        if settings.refresh_interval >= settings.validity {
            anyhow::bail!(
                "token refresh interval ({}ms) must be shorter than token validity ({}ms)",
                settings.refresh_interval.as_millis(),
                settings.validity.as_millis(),
            );
        }
        if self.poll_interval().is_zero() {
            anyhow::bail!("poll interval must be non-zero");
        }
        Ok(())
    }

    // -- Tuning knobs (field override → env var → compiled default) --------

    duration_field!(token_validity, token_validity_ms, "TEMPMAIL_TOKEN_VALIDITY_MS", 300_000);
    duration_field!(token_refresh, token_refresh_ms, "TEMPMAIL_TOKEN_REFRESH_MS", 290_000);
    duration_field!(refresh_backoff, refresh_backoff_ms, "TEMPMAIL_REFRESH_BACKOFF_MS", 30_000);
    duration_field!(poll_interval, poll_interval_ms, "TEMPMAIL_POLL_INTERVAL_MS", 10_000);
    duration_field!(http_timeout, http_timeout_ms, "TEMPMAIL_HTTP_TIMEOUT_MS", 30_000);

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            validity: self.token_validity(),
            refresh_interval: self.token_refresh(),
            error_backoff: self.refresh_backoff(),
        }
    }

    /// Configured domains, or the built-in list when none are given.
    pub fn domain_list(&self) -> Vec<String> {
        if self.domains.is_empty() {
            DEFAULT_DOMAINS.iter().map(|d| (*d).to_owned()).collect()
        } else {
            self.domains.clone()
        }
    }

    /// Cache directory: flag/env, then `$XDG_CACHE_HOME/tempmail`, then
    /// `$HOME/.cache/tempmail`, then `.tempmail/cache`.
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(xdg).join("tempmail");
        }
        if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(home).join(".cache").join("tempmail");
        }
        PathBuf::from(".tempmail").join("cache")
    }

    /// Build a minimal `Config` for tests (short intervals, `history`).
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            base_url: "http://127.0.0.1:0".into(),
            domains: vec!["example.org".into()],
            cache_dir: None,
            log_format: "text".into(),
            log_level: "debug".into(),
            command: Command::History,
            token_validity_ms: Some(3_000),
            token_refresh_ms: Some(2_900),
            refresh_backoff_ms: Some(300),
            poll_interval_ms: Some(100),
            http_timeout_ms: Some(1_000),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
