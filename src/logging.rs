// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup for the `graph-client` binary.
//!
//! The library only emits events; hosts install their own subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{env_or_default, LOG_FORMAT_ENV};
use crate::error::ConnectError;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Anything other than `json` selects the pretty format.
    pub fn parse(raw: &str) -> LogFormat {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`) and
/// `LOG_FORMAT` output format.
pub fn init_tracing() -> Result<(), ConnectError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let format = LogFormat::parse(&env_or_default(LOG_FORMAT_ENV, "pretty"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    };

    result.map_err(|e| ConnectError::Config(format!("Failed to initialize tracing: {e}")))
}
