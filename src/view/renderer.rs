//! Document renderer
//!
//! Turns the Markdown document into wrapped, styled lines for a given width.
//! Rendering is pure; callers keep their previous lines when it fails.

use crate::view::markdown::{parse_markdown, wrap_styled_lines, MarkdownOptions};
use crate::view::theme::Theme;
use ratatui::text::Line;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Wrap width was zero or negative
    InvalidWidth(i32),
    /// The renderer panicked on this input
    Panicked(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::InvalidWidth(width) => write!(f, "invalid wrap width {width}"),
            RenderError::Panicked(msg) => write!(f, "renderer panicked: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Shared, immutable rendering settings
#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
    preserve_newlines: bool,
}

impl Renderer {
    pub fn new(theme: Theme, preserve_newlines: bool) -> Self {
        Self {
            theme,
            preserve_newlines,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Render `document` word-wrapped to `wrap_width` columns.
    ///
    /// `wrap_width` is signed because callers derive it from a viewport size
    /// minus chrome, which can go below zero on tiny terminals.
    pub fn render(&self, document: &str, wrap_width: i32) -> Result<Vec<Line<'static>>, RenderError> {
        if wrap_width <= 0 {
            return Err(RenderError::InvalidWidth(wrap_width));
        }
        let width = wrap_width as usize;
        let options = MarkdownOptions {
            width,
            preserve_newlines: self.preserve_newlines,
        };

        panic::catch_unwind(AssertUnwindSafe(|| {
            let lines = parse_markdown(document, &self.theme, options);
            wrap_styled_lines(&lines, width)
                .iter()
                .map(|line| line.to_line())
                .collect()
        }))
        .map_err(|payload| {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            RenderError::Panicked(msg)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_rejects_non_positive_width() {
        let renderer = Renderer::new(Theme::dark(), true);

        assert_eq!(
            renderer.render("# hi", 0),
            Err(RenderError::InvalidWidth(0))
        );
        assert_eq!(
            renderer.render("# hi", -4),
            Err(RenderError::InvalidWidth(-4))
        );
    }

    #[test]
    fn test_render_wraps_to_width() {
        let renderer = Renderer::new(Theme::dark(), true);
        let lines = renderer
            .render("one two three four five six seven eight nine ten", 12)
            .unwrap();

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width() <= 12, "{:?} too wide", line_text(line));
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = Renderer::new(Theme::light(), true);
        let doc = crate::content::EMBEDDED_DOCUMENT;

        assert_eq!(renderer.render(doc, 76), renderer.render(doc, 76));
    }

    #[test]
    fn test_preserve_newlines_option() {
        let doc = "first\nsecond";

        let kept = Renderer::new(Theme::dark(), true).render(doc, 40).unwrap();
        assert_eq!(kept.len(), 2);

        let joined = Renderer::new(Theme::dark(), false).render(doc, 40).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(line_text(&joined[0]), "first second");
    }
}
