//! SSH accept loop with graceful shutdown

use crate::app::SessionHost;
use crate::services::connection_log::ConnectionLogger;
use crate::services::ssh::handler::ConnectionHandler;
use anyhow::Context;
use russh_keys::key::KeyPair;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(3600);
const AUTH_REJECTION_TIME: Duration = Duration::from_secs(3);

pub struct SshServer {
    config: Arc<russh::server::Config>,
    host: SessionHost,
    logger: ConnectionLogger,
    shutdown_timeout: Duration,
}

impl SshServer {
    pub fn new(host_key: KeyPair, host: SessionHost, logger: ConnectionLogger) -> Self {
        let config = russh::server::Config {
            keys: vec![host_key],
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            auth_rejection_time: AUTH_REJECTION_TIME,
            auth_rejection_time_initial: Some(Duration::ZERO),
            ..Default::default()
        };

        Self {
            config: Arc::new(config),
            host,
            logger,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Bind `address` and serve until `shutdown` resolves
    pub async fn run(self, address: &str, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("failed to listen on {address}"))?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections until `shutdown` resolves, then give open
    /// connections the shutdown timeout to finish before aborting them.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "Starting SSH server");

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let _ = stream.set_nodelay(true);

                    let handler = ConnectionHandler::new(
                        self.host.clone(),
                        self.logger.clone(),
                        Some(peer),
                    );
                    let config = self.config.clone();
                    connections.spawn(async move {
                        match russh::server::run_stream(config, stream, handler).await {
                            Ok(session) => {
                                if let Err(e) = session.await {
                                    tracing::debug!(%peer, error = %e, "Connection ended with error");
                                }
                            }
                            Err(e) => tracing::debug!(%peer, error = %e, "SSH handshake failed"),
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        tracing::info!("Stopping SSH server");
        drop(listener);

        if !connections.is_empty() {
            tracing::info!(
                open = connections.len(),
                timeout = ?self.shutdown_timeout,
                "Waiting for open connections"
            );
            let drained = tokio::time::timeout(self.shutdown_timeout, async {
                while connections.join_next().await.is_some() {}
            })
            .await;

            if drained.is_err() {
                tracing::warn!(
                    remaining = connections.len(),
                    "Shutdown timeout reached, closing remaining connections"
                );
                connections.shutdown().await;
            }
        }

        Ok(())
    }
}
