//! Connection lifecycle logging

use crate::services::notifier::SharedNotifier;
use crate::services::time_source::SharedTimeSource;
use std::time::{Duration, Instant};

/// What is known about a client when its session starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub user: String,
    pub remote_addr: String,
    /// Whether the client authenticated with a public key
    pub public_key: bool,
    /// Command line for `exec` requests
    pub command: Option<String>,
    /// Empty when no PTY was requested
    pub term: String,
    pub width: u16,
    pub height: u16,
}

/// Logs and notifies on connection open and close
#[derive(Clone)]
pub struct ConnectionLogger {
    notifier: SharedNotifier,
    time_source: SharedTimeSource,
}

impl ConnectionLogger {
    pub fn new(notifier: SharedNotifier, time_source: SharedTimeSource) -> Self {
        Self {
            notifier,
            time_source,
        }
    }

    /// Returns the instant to hand back to [`ConnectionLogger::closed`]
    pub fn opened(&self, info: &ConnectionInfo) -> Instant {
        tracing::info!(
            user = %info.user,
            remote_addr = %info.remote_addr,
            public_key = info.public_key,
            command = info.command.as_deref().unwrap_or(""),
            term = %info.term,
            width = info.width,
            height = info.height,
            "New connection"
        );
        self.notifier.notify(format!(
            "New connection from {} (user: {}, term: {}, {}x{})",
            info.remote_addr,
            info.user,
            if info.term.is_empty() { "none" } else { &info.term },
            info.width,
            info.height
        ));
        self.time_source.now()
    }

    pub fn closed(&self, remote_addr: &str, opened_at: Instant) -> Duration {
        let duration = self.time_source.elapsed_since(opened_at);
        tracing::info!(remote_addr, duration = ?duration, "Connection closed");
        self.notifier.notify(format!(
            "Connection closed: {remote_addr} after {}",
            format_duration(duration)
        ));
        duration
    }
}

/// Whole seconds, with minutes and hours when they apply
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m{s}s"),
        (h, m, s) => format!("{h}h{m}m{s}s"),
    }
}
