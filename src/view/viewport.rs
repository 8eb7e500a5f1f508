//! Scrollable, bordered view over pre-rendered lines

use crate::view::theme::Theme;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};
use ratatui::Frame;

/// Rows taken by the top and bottom border
const BORDER_ROWS: u16 = 2;

/// Columns taken by the borders plus the right padding
pub const HORIZONTAL_CHROME: u16 = 4;

/// Pure scroll state - knows nothing about content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// Scroll offset in rows
    pub offset: u16,
    /// Viewport height
    pub viewport: u16,
    /// Total content height
    pub content_height: u16,
}

impl ScrollState {
    /// Create new scroll state
    pub fn new(viewport: u16) -> Self {
        Self {
            offset: 0,
            viewport,
            content_height: 0,
        }
    }

    /// Update viewport height
    pub fn set_viewport(&mut self, height: u16) {
        self.viewport = height;
        self.clamp_offset();
    }

    /// Update content height (call when content changes)
    pub fn set_content_height(&mut self, height: u16) {
        self.content_height = height;
        self.clamp_offset();
    }

    /// Maximum scroll offset
    pub fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport)
    }

    /// Clamp offset to valid range
    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    /// Scroll by delta rows (positive = down, negative = up)
    pub fn scroll_by(&mut self, delta: i32) {
        let magnitude = u16::try_from(delta.unsigned_abs()).unwrap_or(u16::MAX);
        if delta < 0 {
            self.offset = self.offset.saturating_sub(magnitude);
        } else {
            self.offset = self.offset.saturating_add(magnitude);
        }
        self.clamp_offset();
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }
}

/// Bordered viewport showing a window of the rendered document
#[derive(Debug, Clone, Default)]
pub struct Viewport {
    lines: Vec<Line<'static>>,
    scroll: ScrollState,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outer height (including the border)
    pub fn set_height(&mut self, height: u16) {
        self.scroll.set_viewport(height.saturating_sub(BORDER_ROWS));
    }

    /// Replace the content, keeping the offset where possible
    pub fn set_content(&mut self, lines: Vec<Line<'static>>) {
        let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        self.lines = lines;
        self.scroll.set_content_height(height);
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn offset(&self) -> u16 {
        self.scroll.offset
    }

    pub fn max_offset(&self) -> u16 {
        self.scroll.max_offset()
    }

    /// Rows available for content
    pub fn inner_height(&self) -> u16 {
        self.scroll.viewport
    }

    pub fn line_up(&mut self, n: u16) {
        self.scroll.scroll_by(-i32::from(n));
    }

    pub fn line_down(&mut self, n: u16) {
        self.scroll.scroll_by(i32::from(n));
    }

    pub fn page_up(&mut self) {
        self.line_up(self.inner_height().max(1));
    }

    pub fn page_down(&mut self) {
        self.line_down(self.inner_height().max(1));
    }

    pub fn half_page_up(&mut self) {
        self.line_up((self.inner_height() / 2).max(1));
    }

    pub fn half_page_down(&mut self) {
        self.line_down((self.inner_height() / 2).max(1));
    }

    pub fn goto_top(&mut self) {
        self.scroll.scroll_to_top();
    }

    pub fn goto_bottom(&mut self) {
        self.scroll.scroll_to_bottom();
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border_fg))
            .padding(Padding::right(2));

        let start = usize::from(self.scroll.offset).min(self.lines.len());
        let end = (start + usize::from(self.scroll.viewport)).min(self.lines.len());
        let visible = self.lines[start..end].to_vec();

        frame.render_widget(Paragraph::new(visible).block(block), area);
    }
}
