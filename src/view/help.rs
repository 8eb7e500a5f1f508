//! Key help footer
//!
//! The short form lists a few bindings on one line; the full form lays every
//! binding out in columns.

use crate::input::keybindings::{Action, Binding, KeyBindings};
use crate::view::theme::Theme;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

const LEFT_PADDING: &str = "  ";
const SHORT_SEPARATOR: &str = " • ";
const COLUMN_GAP: &str = "    ";

/// Most rows the full help can take
pub const MAX_HELP_ROWS: usize = 4;

fn description(binding: &Binding, show_all: bool) -> &'static str {
    if show_all && binding.action == Action::ToggleHelp {
        "close help"
    } else {
        binding.help_desc
    }
}

/// Build the footer lines
pub fn help_lines(bindings: &KeyBindings, show_all: bool, theme: &Theme) -> Vec<Line<'static>> {
    let key_style = Style::default()
        .fg(theme.help_key_fg)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(theme.help_desc_fg);

    if !show_all {
        let separator = Style::default().fg(theme.help_separator_fg);
        let mut spans = vec![Span::raw(LEFT_PADDING)];
        for (i, binding) in bindings.short_help().into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(SHORT_SEPARATOR, separator));
            }
            spans.push(Span::styled(binding.help_key.clone(), key_style));
            spans.push(Span::styled(
                format!(" {}", description(binding, false)),
                desc_style,
            ));
        }
        return vec![Line::from(spans)];
    }

    let columns = bindings.full_help();
    let rows = columns
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .min(MAX_HELP_ROWS);

    // Column widths so keys and descriptions line up
    let layout: Vec<(usize, usize)> = columns
        .iter()
        .map(|column| {
            let key_width = column.iter().map(|b| b.help_key.width()).max().unwrap_or(0);
            let desc_width = column
                .iter()
                .map(|b| description(b, true).width())
                .max()
                .unwrap_or(0);
            (key_width, desc_width)
        })
        .collect();

    (0..rows)
        .map(|row| {
            let mut spans = vec![Span::raw(LEFT_PADDING)];
            for (col, column) in columns.iter().enumerate() {
                let (key_width, desc_width) = layout[col];
                if col > 0 {
                    spans.push(Span::raw(COLUMN_GAP));
                }
                match column.get(row) {
                    Some(binding) => {
                        let key_pad = key_width.saturating_sub(binding.help_key.width());
                        let desc = description(binding, true);
                        let desc_pad = desc_width.saturating_sub(desc.width());
                        spans.push(Span::styled(
                            format!("{}{}", binding.help_key, " ".repeat(key_pad)),
                            key_style,
                        ));
                        spans.push(Span::styled(
                            format!(" {desc}{}", " ".repeat(desc_pad)),
                            desc_style,
                        ));
                    }
                    None => spans.push(Span::raw(" ".repeat(key_width + 1 + desc_width))),
                }
            }
            // Trailing padding carries no information
            Line::from(trim_trailing(spans))
        })
        .collect()
}

fn trim_trailing(mut spans: Vec<Span<'static>>) -> Vec<Span<'static>> {
    while let Some(last) = spans.last_mut() {
        let trimmed = last.content.trim_end().to_string();
        if trimmed.is_empty() {
            spans.pop();
        } else {
            last.content = trimmed.into();
            break;
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeybindingConfig;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_short_help() {
        let lines = help_lines(&KeyBindings::new(), false, &Theme::dark());

        assert_eq!(lines.len(), 1);
        assert_eq!(text(&lines[0]), "  ↑/k up • ↓/j down • ? more • q quit");
    }

    #[test]
    fn test_full_help_columns() {
        let lines = help_lines(&KeyBindings::new(), true, &Theme::dark());

        assert_eq!(lines.len(), 4);
        assert!(text(&lines[0]).starts_with("  ↑/k    up"));
        assert!(text(&lines[0]).contains("u      ½ page up"));
        assert!(text(&lines[0]).ends_with("tab info"));
        assert!(text(&lines[1]).ends_with("?   close help"));
        assert!(text(&lines[2]).ends_with("q   quit"));
        // Third column is shorter than the others
        assert!(text(&lines[3]).ends_with("G/end  bottom"));
    }

    #[test]
    fn test_help_reflects_overrides() {
        let bindings = KeyBindings::with_overrides(&[KeybindingConfig {
            action: Action::Quit,
            keys: vec!["x".to_string()],
        }])
        .unwrap();
        let lines = help_lines(&bindings, false, &Theme::dark());

        assert!(text(&lines[0]).ends_with("x quit"));
    }

    #[test]
    fn test_help_uses_theme_color() {
        let theme = Theme::dark();
        let lines = help_lines(&KeyBindings::new(), false, &theme);

        let key = lines[0].spans.iter().find(|s| s.content == "q").unwrap();
        assert_eq!(key.style.fg, Some(theme.help_key_fg));
    }
}
