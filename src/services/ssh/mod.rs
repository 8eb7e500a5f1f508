//! SSH transport
//!
//! Host key handling, the per-connection russh handler and the accept loop.

pub mod handler;
pub mod host_key;
pub mod output;
pub mod server;

pub use server::SshServer;
