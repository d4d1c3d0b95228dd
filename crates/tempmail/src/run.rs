// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand runners, shared by `main` and integration tests.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::address::new_mail_address;
use crate::api::http::MailApi;
use crate::api::AlwaysOnline;
use crate::auth::TokenManager;
use crate::cache::DetailCache;
use crate::clock::SystemClock;
use crate::config::{Command, Config};
use crate::detail::DetailLoader;
use crate::mailbox::{LoadOutcome, MailboxCoordinator, MailboxViewState};
use crate::model::Message;
use crate::render;

/// Run the configured subcommand to completion.
pub async fn run(config: Config) -> anyhow::Result<()> {
    match config.command.clone() {
        Command::New => {
            println!("{}", new_mail_address(&config.domain_list()).address);
            Ok(())
        }
        Command::Watch { address } => watch(&config, address).await,
        Command::Show { address, id } => show(&config, &address, &id).await,
        Command::History => history(&config),
    }
}

/// Initialize tracing/logging from config. Logs go to stderr; stdout is
/// reserved for command output.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

fn token_manager(config: &Config, api: Arc<MailApi>) -> Arc<TokenManager> {
    TokenManager::new(api, Arc::new(AlwaysOnline), Arc::new(SystemClock), config.token_settings())
}

async fn watch(config: &Config, address: Option<String>) -> anyhow::Result<()> {
    let address = address.unwrap_or_else(|| new_mail_address(&config.domain_list()).address);
    println!("watching {address} (Ctrl-C to stop)");

    let api = Arc::new(MailApi::new(config.base_url.clone(), config.http_timeout()));
    let tokens = token_manager(config, Arc::clone(&api));
    tokens.start_background_refresh();

    let coordinator = MailboxCoordinator::new(Arc::clone(&tokens), api, config.poll_interval());
    let mut view_rx = coordinator.subscribe();
    let mut token_rx = tokens.subscribe();
    let mut printer = ViewPrinter::default();

    start_watching(&coordinator, &address).await;
    for line in printer.update(&view_rx.borrow_and_update()) {
        println!("{line}");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_token_error: Option<String> = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = view_rx.borrow_and_update().clone();
                for line in printer.update(&state) {
                    println!("{line}");
                }
            }
            changed = token_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let err = token_rx.borrow_and_update().last_error.clone();
                if err != last_token_error {
                    if let Some(e) = &err {
                        eprintln!("token: {e}");
                    }
                    last_token_error = err;
                }
            }
        }
    }

    info!(%address, "stopping");
    coordinator.on_inactive();
    coordinator.close();
    tokens.cleanup();
    Ok(())
}

/// Bring a mailbox on screen: arm auto-refresh, then load once. A failed
/// first load is retried by the next tick.
pub async fn start_watching(coordinator: &MailboxCoordinator, address: &str) -> LoadOutcome {
    coordinator.on_active();
    coordinator.load_messages(address).await
}

async fn show(config: &Config, address: &str, id: &str) -> anyhow::Result<()> {
    let cache = match DetailCache::open(config.cache_dir()) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(err = %e, "detail cache unavailable");
            None
        }
    };
    let api = Arc::new(MailApi::new(config.base_url.clone(), config.http_timeout()));
    let tokens = token_manager(config, Arc::clone(&api));
    let loader = DetailLoader::new(Arc::clone(&tokens), api, cache);

    let result = loader.load(address, id).await;
    tokens.cleanup();
    let detail = result?;

    println!("{}", render::detail_header(&detail));
    println!("{}", render::body_text(&detail.body, render::BODY_WIDTH));
    Ok(())
}

fn history(config: &Config) -> anyhow::Result<()> {
    let cache = DetailCache::open(config.cache_dir())?;
    let messages = cache.history()?;
    if messages.is_empty() {
        println!("no cached messages");
    }
    for message in &messages {
        println!("{}", render::message_line(message));
    }
    Ok(())
}

/// Turns successive view states into output lines, printing only what
/// changed since the previous state.
#[derive(Debug, Default)]
pub struct ViewPrinter {
    messages: Option<Vec<Message>>,
    error: Option<String>,
}

impl ViewPrinter {
    pub fn update(&mut self, state: &MailboxViewState) -> Vec<String> {
        let mut lines = Vec::new();
        if state.error != self.error {
            if let Some(err) = &state.error {
                lines.push(format!("error: {err}"));
            }
            self.error = state.error.clone();
        }
        // Mid-load states carry the previous list; wait for the outcome.
        if state.is_loading {
            return lines;
        }
        if self.messages.as_ref() != Some(&state.messages) {
            if state.messages.is_empty() {
                lines.push("(no messages)".to_owned());
            } else {
                lines.push(format!("{} message(s):", state.messages.len()));
                lines.extend(state.messages.iter().map(render::message_line));
            }
            self.messages = Some(state.messages.clone());
        }
        lines
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
