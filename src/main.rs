use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use termfolio::app::{SessionHost, SessionOptions};
use termfolio::config::{Config, TelegramConfig};
use termfolio::content::ContentSource;
use termfolio::input::keybindings::KeyBindings;
use termfolio::services::connection_log::ConnectionLogger;
use termfolio::services::notifier::{
    DisabledNotifier, RecipientGuard, SharedNotifier, TelegramClient, TelegramCredentials,
    TelegramNotifier, TELEGRAM_API_URL,
};
use termfolio::services::ssh::{host_key, SshServer};
use termfolio::services::time_source::RealTimeSource;
use termfolio::services::tracing_setup;
use termfolio::view::renderer::Renderer;
use termfolio::view::theme::Theme;

/// A personal website served over SSH
#[derive(Parser, Debug)]
#[command(name = "termfolio")]
#[command(about = "Serve a Markdown bio as a scrollable terminal UI over SSH", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long, short)]
    port: Option<u16>,

    /// ed25519 host key, generated if missing
    #[arg(long, value_name = "PATH")]
    host_key: Option<PathBuf>,

    /// Markdown file to serve instead of the embedded bio
    #[arg(long, value_name = "PATH")]
    content: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Hide the key help footer
    #[arg(long)]
    no_help: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(path) = &self.host_key {
            config.host_key_path = path.clone();
        }
        if let Some(path) = &self.content {
            config.content_path = Some(path.clone());
        }
        if self.no_help {
            config.show_help = false;
        }
    }
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if args.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    tracing_setup::init_global(args.log_file.as_deref()).context("Failed to initialize logging")?;

    if let Err(e) = run(config) {
        tracing::error!(error = %format!("{e:#}"), "Server failed");
        return Err(e);
    }
    Ok(())
}

fn run(config: Config) -> AnyhowResult<()> {
    let source = ContentSource::from_path(config.content_path.as_deref());
    let content = source
        .load()
        .with_context(|| format!("Failed to load {source}"))?;
    tracing::info!(%source, bytes = content.len(), "Loaded content");

    let theme = Theme::from_name(&config.theme).unwrap_or_default();
    let bindings = KeyBindings::with_overrides(&config.keybindings)?;
    let host_key = host_key::load_or_generate(&config.host_key_path)?;
    let notifier = start_notifier(&config.telegram)?;
    let time_source = RealTimeSource::shared();

    let options = SessionOptions {
        show_help: config.show_help,
        content,
        min_width: config.min_width,
        min_height: config.min_height,
    };
    let host = SessionHost::new(
        Arc::new(options),
        Arc::new(bindings),
        Arc::new(Renderer::new(theme, config.preserve_newlines)),
        time_source.clone(),
    )
    .with_tick_interval(Duration::from_millis(config.tick_interval_ms));
    let logger = ConnectionLogger::new(notifier, time_source);

    let server = SshServer::new(host_key, host, logger)
        .with_shutdown_timeout(Duration::from_secs(config.shutdown_timeout_secs));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(server.run(&config.listen.address(), shutdown_signal()))
}

/// Telegram when enabled and credentials are set, otherwise a no-op.
/// A rejected token is fatal.
fn start_notifier(config: &TelegramConfig) -> AnyhowResult<SharedNotifier> {
    if !config.enabled {
        tracing::info!("Telegram notifications disabled in config");
        return Ok(Arc::new(DisabledNotifier));
    }

    let Some(credentials) = TelegramCredentials::from_env()? else {
        tracing::info!("TELEGRAM_CHAT_ID or TELEGRAM_TOKEN not set, notifications disabled");
        return Ok(Arc::new(DisabledNotifier));
    };

    let client = TelegramClient::new(TELEGRAM_API_URL, credentials.token);
    let notifier = TelegramNotifier::connect(
        client,
        credentials.chat_id,
        RecipientGuard::new(config.expected_recipient.clone()),
    )
    .context("Failed to connect to Telegram")?;

    Ok(Arc::new(notifier))
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
