//! Connection notifications
//!
//! Sessions report connection open/close through the [`Notify`] trait. The
//! Telegram implementation talks to the Bot API over HTTPS with `ureq` and
//! delivers messages one at a time from a dedicated worker thread, so a slow
//! API never blocks a session.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";
pub const TOKEN_VAR: &str = "TELEGRAM_TOKEN";
pub const STARTUP_MESSAGE: &str = "Bot has been started";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget notification sink shared by all sessions
pub trait Notify: Send + Sync {
    fn notify(&self, message: String);
}

pub type SharedNotifier = Arc<dyn Notify>;

/// Used when no credentials are configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

impl Notify for DisabledNotifier {
    fn notify(&self, message: String) {
        tracing::trace!(%message, "Notifications disabled, dropping message");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// Malformed TELEGRAM_CHAT_ID or similar
    Credentials(String),
    /// Transport failure (DNS, TLS, timeout)
    Http(String),
    /// The API answered with `ok: false`
    Api(String),
    /// The response body was not what the API documents
    Decode(String),
    /// The delivery thread could not be started
    Worker(String),
}

impl std::fmt::Display for NotifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierError::Credentials(msg) => write!(f, "invalid credentials: {msg}"),
            NotifierError::Http(msg) => write!(f, "HTTP error: {msg}"),
            NotifierError::Api(msg) => write!(f, "Telegram API error: {msg}"),
            NotifierError::Decode(msg) => write!(f, "unexpected response: {msg}"),
            NotifierError::Worker(msg) => write!(f, "notifier worker: {msg}"),
        }
    }
}

impl std::error::Error for NotifierError {}

/// Bot token and target chat, taken from the environment
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub chat_id: i64,
    pub token: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("chat_id", &self.chat_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramCredentials {
    /// Read `TELEGRAM_CHAT_ID` and `TELEGRAM_TOKEN`.
    ///
    /// Returns `Ok(None)` when either is unset or empty.
    pub fn from_env() -> Result<Option<Self>, NotifierError> {
        Self::from_vars(
            std::env::var(CHAT_ID_VAR).ok(),
            std::env::var(TOKEN_VAR).ok(),
        )
    }

    pub fn from_vars(
        chat_id: Option<String>,
        token: Option<String>,
    ) -> Result<Option<Self>, NotifierError> {
        let chat_id = chat_id.filter(|s| !s.trim().is_empty());
        let token = token.filter(|s| !s.trim().is_empty());

        match (chat_id, token) {
            (Some(chat_id), Some(token)) => {
                let chat_id = chat_id.trim().parse::<i64>().map_err(|e| {
                    NotifierError::Credentials(format!("{CHAT_ID_VAR} is not a number: {e}"))
                })?;
                Ok(Some(Self {
                    chat_id,
                    token: token.trim().to_string(),
                }))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// The bot's own account, as returned by `getMe`
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub first_name: Option<String>,
}

/// Confirmation returned by `sendMessage`
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
    pub chat: Chat,
}

/// Minimal blocking Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Transport errors include the request URL, which carries the token
    fn redact(&self, message: String) -> String {
        if self.token.is_empty() {
            message
        } else {
            message.replace(&self.token, "<token>")
        }
    }

    fn decode<T: DeserializeOwned>(
        &self,
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<T, NotifierError> {
        let response = match result {
            Ok(response) => response,
            // Error statuses still carry the API's JSON description
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(NotifierError::Http(self.redact(e.to_string()))),
        };

        let body: ApiResponse<T> = response
            .into_json()
            .map_err(|e| NotifierError::Decode(self.redact(e.to_string())))?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(NotifierError::Decode("missing result".to_string())),
            (false, _) => Err(NotifierError::Api(
                body.description
                    .unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }

    pub fn get_me(&self) -> Result<BotUser, NotifierError> {
        let result = self.agent.get(&self.method_url("getMe")).call();
        self.decode(result)
    }

    pub fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, NotifierError> {
        let result = self
            .agent
            .post(&self.method_url("sendMessage"))
            .send_json(serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            }));
        self.decode(result)
    }
}

/// Stops the server when a message lands in the wrong chat.
///
/// Inactive unless an expected first name is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientGuard {
    expected: Option<String>,
}

impl RecipientGuard {
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }

    /// `Err` carries the first name the message was actually delivered to
    pub fn check(&self, sent: &SentMessage) -> Result<(), String> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };
        let actual = sent.chat.first_name.as_deref().unwrap_or("");
        if actual == expected {
            Ok(())
        } else {
            Err(actual.to_string())
        }
    }
}

/// Telegram-backed [`Notify`] with a single delivery thread
pub struct TelegramNotifier {
    sender: Option<mpsc::Sender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl TelegramNotifier {
    /// Verify the token with `getMe`, start the delivery thread and queue the
    /// startup message. Fails if the token is rejected.
    pub fn connect(
        client: TelegramClient,
        chat_id: i64,
        guard: RecipientGuard,
    ) -> Result<Self, NotifierError> {
        let me = client.get_me()?;
        tracing::info!(
            username = me.username.as_deref().unwrap_or(&me.first_name),
            "Authorized on account"
        );

        let (sender, receiver) = mpsc::channel::<String>();
        let worker = thread::Builder::new()
            .name("telegram-notifier".to_string())
            .spawn(move || {
                for message in receiver {
                    deliver(&client, chat_id, &guard, &message);
                }
            })
            .map_err(|e| NotifierError::Worker(e.to_string()))?;

        let notifier = Self {
            sender: Some(sender),
            worker: Some(worker),
        };
        notifier.notify(STARTUP_MESSAGE.to_string());
        Ok(notifier)
    }
}

fn deliver(client: &TelegramClient, chat_id: i64, guard: &RecipientGuard, message: &str) {
    match client.send_message(chat_id, message) {
        Ok(sent) => {
            tracing::info!(
                message_id = sent.message_id,
                chat_id = sent.chat.id,
                "Message sent"
            );
            if let Err(firstname) = guard.check(&sent) {
                tracing::error!(%firstname, "Recipient is not me");
                std::process::exit(1);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to send notification"),
    }
}

impl Notify for TelegramNotifier {
    fn notify(&self, message: String) {
        if let Some(sender) = &self.sender {
            if sender.send(message).is_err() {
                tracing::warn!("Notifier worker has stopped, dropping message");
            }
        }
    }
}

impl Drop for TelegramNotifier {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
