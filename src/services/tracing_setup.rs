//! Tracing subscriber setup
//!
//! This module provides shared tracing configuration used by both
//! the server binary and tests.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when RUST_LOG is not set. The SSH library is chatty at info.
pub const DEFAULT_DIRECTIVES: &str = "info,russh=warn,russh_keys=warn";

/// Initialize the global tracing subscriber.
///
/// This sets up:
/// - Appending to `log_file_path` when given, stderr otherwise
/// - Environment-based filtering (RUST_LOG) with INFO default
pub fn init_global(log_file_path: Option<&Path>) -> io::Result<()> {
    let filter = default_filter();

    match log_file_path {
        Some(path) => {
            let log_file = OpenOptions::new().create(true).append(true).open(path)?;
            build_subscriber(Arc::new(log_file), false, filter)
                .try_init()
                .map_err(io::Error::other)
        }
        None => build_subscriber(io::stderr, true, filter)
            .try_init()
            .map_err(io::Error::other),
    }
}

/// RUST_LOG if set and valid, [`DEFAULT_DIRECTIVES`] otherwise
pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Build a subscriber writing formatted events to `writer`.
///
/// This is the core subscriber configuration shared between production and tests.
pub fn build_subscriber<W>(
    writer: W,
    ansi: bool,
    filter: EnvFilter,
) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(ansi);

    tracing_subscriber::registry().with(fmt_layer).with(filter)
}
