//! Session output bound to an SSH channel

use crate::app::SessionOutput;
use async_trait::async_trait;
use russh::server::Handle;
use russh::{ChannelId, CryptoVec};
use std::io;

/// Extended data type for stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

#[derive(Clone)]
pub struct ChannelOutput {
    handle: Handle,
    channel: ChannelId,
}

impl ChannelOutput {
    pub fn new(handle: Handle, channel: ChannelId) -> Self {
        Self { handle, channel }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "SSH channel closed")
}

#[async_trait]
impl SessionOutput for ChannelOutput {
    async fn write(&mut self, bytes: Vec<u8>) -> io::Result<()> {
        self.handle
            .data(self.channel, CryptoVec::from_slice(&bytes))
            .await
            .map_err(|_| closed())
    }

    async fn write_error(&mut self, message: &str) -> io::Result<()> {
        let line = format!("{message}\r\n");
        self.handle
            .extended_data(
                self.channel,
                SSH_EXTENDED_DATA_STDERR,
                CryptoVec::from_slice(line.as_bytes()),
            )
            .await
            .map_err(|_| closed())
    }

    async fn close(&mut self, exit_status: u32) {
        // The client may already be gone
        let _ = self.handle.exit_status_request(self.channel, exit_status).await;
        let _ = self.handle.eof(self.channel).await;
        let _ = self.handle.close(self.channel).await;
    }
}
