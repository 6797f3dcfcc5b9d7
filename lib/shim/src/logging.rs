// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup for chaincode processes.
//!
//! The peer launches chaincode with `CORE_CHAINCODE_LOGGING_LEVEL` set to
//! one of its own level names; [`init`] maps that onto a tracing filter.
//! A `RUST_LOG` value takes precedence and supports full filter directives.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Level applied when neither environment variable is set.
const DEFAULT_FILTER_LEVEL: &str = "info";

/// ENV the peer uses to set the chaincode log level.
const PEER_LEVEL_ENV: &str = "CORE_CHAINCODE_LOGGING_LEVEL";

static INIT: Once = Once::new();

/// Installs the global tracing subscriber. Safe to call more than once;
/// only the first call takes effect.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    });
}

/// Maps the peer's level names onto tracing levels and quiets the HTTP/2
/// plumbing underneath the stream.
fn default_directives() -> String {
    let level = match std::env::var(PEER_LEVEL_ENV)
        .map(|level| level.to_ascii_uppercase())
        .as_deref()
    {
        Ok("CRITICAL") | Ok("ERROR") => "error",
        Ok("WARNING") => "warn",
        Ok("DEBUG") => "debug",
        Ok("NOTICE") | Ok("INFO") => "info",
        _ => DEFAULT_FILTER_LEVEL,
    };
    format!("{level},h2=error,tower=error,hyper_util=error,rustls=error,tonic=error")
}
