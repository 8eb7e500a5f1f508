//! Server configuration, loaded from JSON with every field defaulted

use crate::input::keybindings::{Action, KeyBindings};
use crate::view::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Rows taken by the border (2) and the help footer (4)
const MIN_USABLE_HEIGHT: u16 = 7;

/// Columns taken by the border (2) and the right padding (2), plus one
const MIN_USABLE_WIDTH: u16 = 5;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,

    /// ed25519 host key, generated on first start if missing
    #[serde(default = "default_host_key_path")]
    pub host_key_path: PathBuf,

    /// Markdown document to serve instead of the embedded one
    #[serde(default)]
    pub content_path: Option<PathBuf>,

    #[serde(default = "default_theme_name")]
    pub theme: String,

    /// Show the key help footer below the viewport
    #[serde(default = "default_true")]
    pub show_help: bool,

    /// Keep line breaks from the Markdown source
    #[serde(default = "default_true")]
    pub preserve_newlines: bool,

    #[serde(default = "default_min_width")]
    pub min_width: u16,

    #[serde(default = "default_min_height")]
    pub min_height: u16,

    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Grace period for open sessions after SIGINT/SIGTERM
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-action key overrides; actions not listed keep their defaults
    #[serde(default)]
    pub keybindings: Vec<KeybindingConfig>,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

fn default_host_key_path() -> PathBuf {
    PathBuf::from(".ssh/term_info_ed25519")
}

fn default_theme_name() -> String {
    "dark".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_width() -> u16 {
    80
}

fn default_min_height() -> u16 {
    24
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Address the SSH server binds to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    23234
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenConfig {
    /// `host:port` form accepted by `TcpListener::bind`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Key override for a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindingConfig {
    /// Action to rebind (e.g. "quit", "page_down")
    pub action: Action,

    /// Key chords (e.g. ["q", "ctrl+c"])
    pub keys: Vec<String>,
}

/// Connection notifications over the Telegram Bot API.
///
/// Credentials come from the environment (`TELEGRAM_CHAT_ID`,
/// `TELEGRAM_TOKEN`), never from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First name the bot expects to be talking to. When set, a sent message
    /// addressed to anyone else stops the server.
    #[serde(default)]
    pub expected_recipient: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expected_recipient: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            host_key_path: default_host_key_path(),
            content_path: None,
            theme: default_theme_name(),
            show_help: true,
            preserve_newlines: true,
            min_width: default_min_width(),
            min_height: default_min_height(),
            tick_interval_ms: default_tick_interval(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            keybindings: Vec::new(),
            telegram: TelegramConfig::default(),
        }
    }
}

/// `<config dir>/termfolio/config.json`, e.g. `~/.config/termfolio/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("termfolio").join("config.json"))
}

impl Config {
    /// Load `explicit` if given, otherwise the default config file if one
    /// exists, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Effective configuration as pretty JSON (for `--dump-config`)
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "listen.host cannot be empty".to_string(),
            ));
        }

        if self.min_width < MIN_USABLE_WIDTH {
            return Err(ConfigError::ValidationError(format!(
                "min_width must be >= {MIN_USABLE_WIDTH}"
            )));
        }

        if self.min_height < MIN_USABLE_HEIGHT {
            return Err(ConfigError::ValidationError(format!(
                "min_height must be >= {MIN_USABLE_HEIGHT}"
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if Theme::from_name(&self.theme).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "unknown theme '{}' (expected dark or light)",
                self.theme
            )));
        }

        KeyBindings::with_overrides(&self.keybindings)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen.address(), "localhost:23234");
        assert_eq!(config.host_key_path, PathBuf::from(".ssh/term_info_ed25519"));
        assert_eq!(config.min_width, 80);
        assert_eq!(config.min_height, 24);
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert!(config.show_help);
        assert!(config.preserve_newlines);
        assert!(config.keybindings.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.theme = "solarized".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.min_height = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.listen.host = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_keybinding_fails_validation() {
        let mut config = Config::default();
        config.keybindings.push(KeybindingConfig {
            action: Action::Quit,
            keys: vec!["hyper+q".to_string()],
        });

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quit"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{ "listen": { "port": 2222 }, "theme": "light" }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.listen.host, "localhost");
        assert_eq!(config.listen.port, 2222);
        assert_eq!(config.theme, "light");
        assert_eq!(config.min_width, 80);
        assert!(config.telegram.enabled);
        assert!(config.telegram.expected_recipient.is_none());
    }

    #[test]
    fn test_dump_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut config = Config::default();
        config.content_path = Some(PathBuf::from("bio.md"));
        std::fs::write(&config_path, config.to_json_pretty().unwrap()).unwrap();

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.content_path, config.content_path);
        assert_eq!(loaded.listen.port, config.listen.port);
    }

    #[test]
    fn test_config_with_custom_keybinding() {
        let json = r#"{
            "keybindings": [
                { "action": "page_down", "keys": ["n", "ctrl+f"] }
            ],
            "telegram": { "expected_recipient": "N" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.keybindings.len(), 1);
        assert_eq!(config.keybindings[0].action, Action::PageDown);
        assert_eq!(config.keybindings[0].keys, vec!["n", "ctrl+f"]);
        assert_eq!(config.telegram.expected_recipient.as_deref(), Some("N"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_path_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.json");
        std::fs::write(&config_path, r#"{ "show_help": false }"#).unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert!(!config.show_help);

        assert!(Config::load(Some(&temp_dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_default_config_path_is_namespaced() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("termfolio/config.json"));
        }
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let temp_dir = tempfile::tempdir().unwrap();

        let missing = Config::load_from_file(temp_dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::IoError(_))));

        let bad_path = temp_dir.path().join("bad.json");
        std::fs::write(&bad_path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from_file(&bad_path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
