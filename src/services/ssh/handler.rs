//! Per-connection SSH handler
//!
//! Accepts every client, remembers the PTY request and starts one terminal
//! session on the first `shell` or `exec` request. Channel data and window
//! changes are forwarded to the session.

use crate::app::model::clamp_size;
use crate::app::{HostError, PtyInfo, SessionHandle, SessionHost};
use crate::services::connection_log::{ConnectionInfo, ConnectionLogger};
use crate::services::ssh::output::ChannelOutput;
use async_trait::async_trait;
use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, ChannelId, Pty};
use russh_keys::key::PublicKey;
use std::net::SocketAddr;
use std::time::Instant;

pub struct ConnectionHandler {
    host: SessionHost,
    logger: ConnectionLogger,
    remote_addr: String,
    user: String,
    public_key: bool,
    channel: Option<ChannelId>,
    pty: Option<PtyInfo>,
    session: Option<SessionHandle>,
    opened_at: Option<Instant>,
}

impl ConnectionHandler {
    pub fn new(host: SessionHost, logger: ConnectionLogger, peer: Option<SocketAddr>) -> Self {
        Self {
            host,
            logger,
            remote_addr: peer.map_or_else(|| "unknown".to_string(), |addr| addr.to_string()),
            user: String::new(),
            public_key: false,
            channel: None,
            pty: None,
            session: None,
            opened_at: None,
        }
    }

    fn is_current(&self, channel: ChannelId) -> bool {
        self.channel == Some(channel)
    }

    async fn start_session(
        &mut self,
        channel: ChannelId,
        command: Option<String>,
        session: &mut Session,
    ) {
        if !self.is_current(channel) || self.opened_at.is_some() {
            return;
        }

        let info = ConnectionInfo {
            user: self.user.clone(),
            remote_addr: self.remote_addr.clone(),
            public_key: self.public_key,
            command,
            term: self.pty.as_ref().map(|p| p.term.clone()).unwrap_or_default(),
            width: self.pty.as_ref().map_or(0, |p| p.width),
            height: self.pty.as_ref().map_or(0, |p| p.height),
        };
        self.opened_at = Some(self.logger.opened(&info));

        session.channel_success(channel);

        let output = ChannelOutput::new(session.handle(), channel);
        match self.host.start(self.pty.clone(), output).await {
            Ok(handle) => self.session = Some(handle),
            Err(HostError::NoTerminal) => {}
            Err(e) => tracing::warn!(remote_addr = %self.remote_addr, error = %e, "Failed to start session"),
        }
    }

    fn end_session(&mut self) {
        // Dropping the handle disconnects the loop
        self.session.take();
        if let Some(opened_at) = self.opened_at.take() {
            self.logger.closed(&self.remote_addr, opened_at);
        }
    }
}

#[async_trait]
impl Handler for ConnectionHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        self.user = user.to_string();
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        self.user = user.to_string();
        Ok(Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        self.user = user.to_string();
        self.public_key = true;
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        // One interactive session per connection
        if self.channel.is_some() {
            tracing::debug!(remote_addr = %self.remote_addr, "Rejecting extra session channel");
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_current(channel) {
            return Ok(());
        }
        let (width, height) = clamp_size(col_width, row_height);
        self.pty = Some(PtyInfo {
            term: term.to_string(),
            width,
            height,
        });
        session.channel_success(channel);
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_current(channel) {
            return Ok(());
        }
        let (width, height) = clamp_size(col_width, row_height);
        if let Some(pty) = self.pty.as_mut() {
            pty.width = width;
            pty.height = height;
        }
        if let Some(handle) = &self.session {
            handle.resize(width, height);
        }
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.start_session(channel, None, session).await;
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let command = String::from_utf8_lossy(data).into_owned();
        self.start_session(channel, Some(command), session).await;
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_current(channel) {
            return Ok(());
        }
        if let Some(handle) = &self.session {
            handle.send_input(data);
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        // Nothing more will be typed; the session restores the client's
        // screen and closes the channel
        if let (true, Some(handle)) = (self.is_current(channel), &self.session) {
            handle.close_input();
        }
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_current(channel) {
            self.end_session();
        }
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.end_session();
    }
}
