//! Key binding set
//!
//! Maps logical session actions to key chords and carries the help text the
//! footer shows for each of them. Built once at startup (defaults plus any
//! overrides from the config file) and shared by every session.

use crate::config::KeybindingConfig;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

/// Actions a session understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    GotoTop,
    GotoBottom,
    ToggleView,
    ToggleHelp,
    Quit,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::ScrollUp,
        Action::ScrollDown,
        Action::PageUp,
        Action::PageDown,
        Action::HalfPageUp,
        Action::HalfPageDown,
        Action::GotoTop,
        Action::GotoBottom,
        Action::ToggleView,
        Action::ToggleHelp,
        Action::Quit,
    ];

    /// Name used in the config file
    pub fn name(&self) -> &'static str {
        match self {
            Action::ScrollUp => "scroll_up",
            Action::ScrollDown => "scroll_down",
            Action::PageUp => "page_up",
            Action::PageDown => "page_down",
            Action::HalfPageUp => "half_page_up",
            Action::HalfPageDown => "half_page_down",
            Action::GotoTop => "goto_top",
            Action::GotoBottom => "goto_bottom",
            Action::ToggleView => "toggle_view",
            Action::ToggleHelp => "toggle_help",
            Action::Quit => "quit",
        }
    }

    fn default_keys(&self) -> &'static [&'static str] {
        match self {
            Action::ScrollUp => &["up", "k"],
            Action::ScrollDown => &["down", "j"],
            Action::PageUp => &["pgup", "b"],
            Action::PageDown => &["pgdown", "space", "f"],
            Action::HalfPageUp => &["u", "ctrl+u"],
            Action::HalfPageDown => &["d", "ctrl+d"],
            Action::GotoTop => &["home", "g"],
            Action::GotoBottom => &["end", "G"],
            Action::ToggleView => &["tab"],
            Action::ToggleHelp => &["?"],
            Action::Quit => &["q", "esc", "ctrl+c"],
        }
    }

    fn default_help_key(&self) -> &'static str {
        match self {
            Action::ScrollUp => "↑/k",
            Action::ScrollDown => "↓/j",
            Action::PageUp => "b/pgup",
            Action::PageDown => "f/pgdn",
            Action::HalfPageUp => "u",
            Action::HalfPageDown => "d",
            Action::GotoTop => "g/home",
            Action::GotoBottom => "G/end",
            Action::ToggleView => "tab",
            Action::ToggleHelp => "?",
            Action::Quit => "q",
        }
    }

    fn help_desc(&self) -> &'static str {
        match self {
            Action::ScrollUp => "up",
            Action::ScrollDown => "down",
            Action::PageUp => "page up",
            Action::PageDown => "page down",
            Action::HalfPageUp => "½ page up",
            Action::HalfPageDown => "½ page down",
            Action::GotoTop => "top",
            Action::GotoBottom => "bottom",
            Action::ToggleView => "info",
            Action::ToggleHelp => "more",
            Action::Quit => "quit",
        }
    }
}

/// Error produced when a key name cannot be understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParseError(pub String);

impl std::fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key '{}'", self.0)
    }
}

impl std::error::Error for KeyParseError {}

/// A key plus the modifiers that must be held with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    /// Parse a chord such as `"q"`, `"pgdown"` or `"ctrl+u"`.
    ///
    /// Character keys are case sensitive (`"G"` is not `"g"`); everything
    /// else is matched case-insensitively.
    pub fn parse(text: &str) -> Result<Self, KeyParseError> {
        let error = || KeyParseError(text.to_string());

        let mut parts: Vec<&str> = text.split('+').collect();
        let key = match parts.pop() {
            Some("") if text.ends_with('+') && parts.last() == Some(&"") => {
                // "ctrl++" style chord binding the plus key itself
                parts.pop();
                "+"
            }
            Some(key) if !key.is_empty() => key,
            _ => return Err(error()),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in parts {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" | "meta" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return Err(error()),
            };
        }

        let mut chars = key.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) => KeyCode::Char(c),
            _ => match key.to_ascii_lowercase().as_str() {
                "up" => KeyCode::Up,
                "down" => KeyCode::Down,
                "left" => KeyCode::Left,
                "right" => KeyCode::Right,
                "pgup" | "pageup" => KeyCode::PageUp,
                "pgdown" | "pgdn" | "pagedown" => KeyCode::PageDown,
                "home" => KeyCode::Home,
                "end" => KeyCode::End,
                "tab" => KeyCode::Tab,
                "esc" | "escape" => KeyCode::Esc,
                "enter" | "return" => KeyCode::Enter,
                "backspace" => KeyCode::Backspace,
                "space" => KeyCode::Char(' '),
                lower => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => return Err(error()),
                },
            },
        };

        Ok(Self { code, modifiers })
    }

    /// Whether a decoded key event triggers this chord.
    ///
    /// Shift is ignored for character keys since it is already folded into
    /// the character itself.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if self.code != event.code {
            return false;
        }
        match self.code {
            KeyCode::Char(_) => {
                self.modifiers.difference(KeyModifiers::SHIFT)
                    == event.modifiers.difference(KeyModifiers::SHIFT)
            }
            _ => self.modifiers == event.modifiers,
        }
    }

    /// Short label for help text
    pub fn label(&self) -> String {
        let key = match self.code {
            KeyCode::Up => "↑".to_string(),
            KeyCode::Down => "↓".to_string(),
            KeyCode::Left => "←".to_string(),
            KeyCode::Right => "→".to_string(),
            KeyCode::PageUp => "pgup".to_string(),
            KeyCode::PageDown => "pgdn".to_string(),
            KeyCode::Home => "home".to_string(),
            KeyCode::End => "end".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::Esc => "esc".to_string(),
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Backspace => "backspace".to_string(),
            KeyCode::Char(' ') => "space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::F(n) => format!("f{n}"),
            other => format!("{other:?}").to_lowercase(),
        };

        let mut label = String::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            label.push_str("ctrl+");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            label.push_str("alt+");
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            label.push_str("shift+");
        }
        label.push_str(&key);
        label
    }
}

/// One action with its chords and help text
#[derive(Debug, Clone)]
pub struct Binding {
    pub action: Action,
    pub keys: Vec<KeyChord>,
    pub help_key: String,
    pub help_desc: &'static str,
}

/// Error building a binding set from config overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyBindingError {
    InvalidKey {
        action: Action,
        source: KeyParseError,
    },
    NoKeys(Action),
}

impl std::fmt::Display for KeyBindingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyBindingError::InvalidKey { action, source } => {
                write!(f, "keybinding for {}: {source}", action.name())
            }
            KeyBindingError::NoKeys(action) => {
                write!(f, "keybinding for {} has no keys", action.name())
            }
        }
    }
}

impl std::error::Error for KeyBindingError {}

/// The process-wide binding set
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: Vec<Binding>,
}

impl KeyBindings {
    /// The default bindings
    pub fn new() -> Self {
        let bindings = Action::ALL
            .iter()
            .map(|action| Binding {
                action: *action,
                keys: action
                    .default_keys()
                    .iter()
                    .filter_map(|key| KeyChord::parse(key).ok())
                    .collect(),
                help_key: action.default_help_key().to_string(),
                help_desc: action.help_desc(),
            })
            .collect();

        Self { bindings }
    }

    /// Defaults with the keys of some actions replaced.
    ///
    /// The help label of an overridden action is rebuilt from its first two
    /// chords.
    pub fn with_overrides(overrides: &[KeybindingConfig]) -> Result<Self, KeyBindingError> {
        let mut bindings = Self::new();

        for entry in overrides {
            if entry.keys.is_empty() {
                return Err(KeyBindingError::NoKeys(entry.action));
            }
            let keys = entry
                .keys
                .iter()
                .map(|key| KeyChord::parse(key))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| KeyBindingError::InvalidKey {
                    action: entry.action,
                    source,
                })?;

            if let Some(binding) = bindings
                .bindings
                .iter_mut()
                .find(|b| b.action == entry.action)
            {
                binding.help_key = keys
                    .iter()
                    .take(2)
                    .map(KeyChord::label)
                    .collect::<Vec<_>>()
                    .join("/");
                binding.keys = keys;
            }
        }

        Ok(bindings)
    }

    /// Action bound to a key event, if any. Earlier actions win on conflict.
    pub fn resolve(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|binding| binding.keys.iter().any(|chord| chord.matches(event)))
            .map(|binding| binding.action)
    }

    pub fn binding(&self, action: Action) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.action == action)
    }

    /// Bindings listed in the one-line help
    pub fn short_help(&self) -> Vec<&Binding> {
        [
            Action::ScrollUp,
            Action::ScrollDown,
            Action::ToggleHelp,
            Action::Quit,
        ]
        .iter()
        .filter_map(|action| self.binding(*action))
        .collect()
    }

    /// Bindings listed in the expanded help, one inner vector per column
    pub fn full_help(&self) -> Vec<Vec<&Binding>> {
        let columns: [&[Action]; 3] = [
            &[
                Action::ScrollUp,
                Action::ScrollDown,
                Action::PageUp,
                Action::PageDown,
            ],
            &[
                Action::HalfPageUp,
                Action::HalfPageDown,
                Action::GotoTop,
                Action::GotoBottom,
            ],
            &[Action::ToggleView, Action::ToggleHelp, Action::Quit],
        ];

        columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .filter_map(|action| self.binding(*action))
                    .collect()
            })
            .collect()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}
