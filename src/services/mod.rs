//! Services that sit around the session core: SSH transport, notifications,
//! connection logging, time and tracing setup.

pub mod connection_log;
pub mod notifier;
pub mod ssh;
pub mod time_source;
pub mod tracing_setup;
