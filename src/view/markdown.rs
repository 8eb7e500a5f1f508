//! Markdown parsing and rendering for terminal display
//!
//! Converts the served document into styled lines and word-wraps them to the
//! viewport width. Block structure (headings, lists, quotes, code blocks,
//! tables and rules) is flattened into plain lines with text prefixes; inline
//! formatting becomes ratatui styles.

use crate::view::theme::Theme;
use pulldown_cmark::{Alignment, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A styled span for markdown rendering
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
}

/// A line of styled spans for markdown rendering
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
    /// Prefix repeated on continuation lines when this line is wrapped
    /// (quote bars, list indentation)
    pub hang: Option<StyledSpan>,
}

impl StyledLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: String, style: Style) {
        self.spans.push(StyledSpan { text, style });
    }

    /// Display width in terminal columns
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.text.width()).sum()
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn to_line(&self) -> Line<'static> {
        Line::from(
            self.spans
                .iter()
                .map(|s| Span::styled(s.text.clone(), s.style))
                .collect::<Vec<_>>(),
        )
    }
}

/// Layout options for [`parse_markdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Target width, used for horizontal rules
    pub width: usize,
    /// Turn soft breaks into line breaks instead of spaces
    pub preserve_newlines: bool,
}

/// Word-wrap styled lines to fit within a given width.
/// Breaks at word boundaries (spaces) when possible, preserving styling.
/// Falls back to character-based breaking for words longer than max_width.
pub fn wrap_styled_lines(lines: &[StyledLine], max_width: usize) -> Vec<StyledLine> {
    if max_width == 0 {
        return lines.to_vec();
    }

    let mut result = Vec::new();

    for line in lines {
        if line.width() <= max_width {
            // Line fits, no wrapping needed
            result.push(line.clone());
            continue;
        }

        // A hang that eats most of the line would leave no room for text
        let hang = line
            .hang
            .as_ref()
            .filter(|h| h.text.width() * 2 <= max_width);

        // Flatten spans into styled segments (spaces + word)
        let mut segments: Vec<(String, Style)> = Vec::new();
        for span in &line.spans {
            let mut chars = span.text.chars().peekable();
            while chars.peek().is_some() {
                let mut segment = String::new();

                // Collect spaces
                while let Some(&ch) = chars.peek() {
                    if ch != ' ' {
                        break;
                    }
                    segment.push(ch);
                    chars.next();
                }

                // Collect non-spaces (word)
                while let Some(&ch) = chars.peek() {
                    if ch == ' ' {
                        break;
                    }
                    segment.push(ch);
                    chars.next();
                }

                if !segment.is_empty() {
                    segments.push((segment, span.style));
                }
            }
        }

        let mut current = StyledLine::new();
        let mut current_width = 0;
        // Nothing but the hang on the current output line
        let mut fresh = true;
        let mut continuation = false;

        for (segment, style) in segments {
            let mut text = segment.as_str();

            if !fresh && current_width + text.width() > max_width {
                result.push(std::mem::take(&mut current));
                (current, current_width) = continuation_line(hang);
                fresh = true;
                continuation = true;
            }

            if fresh && continuation {
                // Leading spaces at a wrap point are dropped
                text = text.trim_start_matches(' ');
                if text.is_empty() {
                    continue;
                }
            }

            let width = text.width();
            if current_width + width <= max_width {
                current.push(text.to_string(), style);
                current_width += width;
                fresh = false;
                continue;
            }

            // Segment too long for a line, must break mid-word
            let mut remaining = text;
            loop {
                let available = max_width.saturating_sub(current_width);
                let (take, rest, take_width) = split_at_width(remaining, available);
                current.push(take.to_string(), style);
                current_width += take_width;
                fresh = false;
                if rest.is_empty() {
                    break;
                }
                result.push(std::mem::take(&mut current));
                (current, current_width) = continuation_line(hang);
                fresh = true;
                continuation = true;
                remaining = rest;
            }
        }

        if !fresh {
            result.push(current);
        }
    }

    result
}

fn continuation_line(hang: Option<&StyledSpan>) -> (StyledLine, usize) {
    let mut line = StyledLine::new();
    match hang {
        Some(hang) => {
            line.push(hang.text.clone(), hang.style);
            (line, hang.text.width())
        }
        None => (line, 0),
    }
}

/// Split off the longest prefix that fits in `available` columns.
/// Always takes at least one character.
fn split_at_width(text: &str, available: usize) -> (&str, &str, usize) {
    let mut take_chars = 0;
    let mut take_width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(1);
        if take_width + w > available && take_chars > 0 {
            break;
        }
        take_width += w;
        take_chars += 1;
    }

    let byte_idx = text
        .char_indices()
        .nth(take_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (take, rest) = text.split_at(byte_idx);
    (take, rest, take_width)
}

/// Parse markdown text into styled lines for terminal rendering
pub fn parse_markdown(text: &str, theme: &Theme, options: MarkdownOptions) -> Vec<StyledLine> {
    let mut parser_options = Options::empty();
    parser_options.insert(Options::ENABLE_STRIKETHROUGH);
    parser_options.insert(Options::ENABLE_TABLES);

    let mut builder = MarkdownBuilder::new(theme, options);
    for event in Parser::new_ext(text, parser_options) {
        builder.event(event);
    }
    builder.finish()
}

struct ListState {
    /// Next number for ordered lists, None for bullet lists
    next_number: Option<u64>,
    /// Width of the current item's marker
    hang_width: usize,
}

struct LinkState {
    url: String,
    text: String,
}

struct TableState {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<Vec<StyledSpan>>>,
    row: Vec<Vec<StyledSpan>>,
    cell: Vec<StyledSpan>,
    head_rows: usize,
}

struct MarkdownBuilder<'a> {
    theme: &'a Theme,
    options: MarkdownOptions,
    lines: Vec<StyledLine>,
    current: StyledLine,
    // Style stack for nested formatting
    style_stack: Vec<Style>,
    list_stack: Vec<ListState>,
    pending_marker: Option<String>,
    quote_depth: usize,
    in_code_block: bool,
    link: Option<LinkState>,
    table: Option<TableState>,
    needs_blank: bool,
}

impl<'a> MarkdownBuilder<'a> {
    fn new(theme: &'a Theme, options: MarkdownOptions) -> Self {
        Self {
            theme,
            options,
            lines: Vec::new(),
            current: StyledLine::new(),
            style_stack: vec![Style::default().fg(theme.text_fg)],
            list_stack: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            in_code_block: false,
            link: None,
            table: None,
            needs_blank: false,
        }
    }

    fn base_style(&self) -> Style {
        Style::default().fg(self.theme.text_fg)
    }

    fn current_style(&self) -> Style {
        self.style_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.base_style())
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let style = f(self.current_style());
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag_end) => self.end_tag(tag_end),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                // Inline code
                let style = Style::default()
                    .fg(self.theme.inline_code_fg)
                    .bg(self.theme.inline_code_bg);
                self.push_span(format!(" {code} "), style);
            }
            Event::SoftBreak => {
                if self.options.preserve_newlines {
                    self.flush_line();
                } else {
                    let style = self.current_style();
                    self.push_span(" ", style);
                }
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.begin_block();
                let width = match self.options.width {
                    0 => 40,
                    w => w.saturating_sub(2 * self.quote_depth).max(1),
                };
                let style = Style::default().fg(self.theme.rule_fg);
                self.push_span("─".repeat(width), style);
                self.flush_line();
                self.needs_blank = true;
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.begin_block(),
            Tag::Heading { level, .. } => {
                self.begin_block();
                let level = level as usize;
                if level == 1 {
                    let title = Style::default()
                        .fg(self.theme.title_fg)
                        .bg(self.theme.title_bg)
                        .add_modifier(Modifier::BOLD);
                    self.style_stack.push(title);
                    self.push_span(" ", title);
                } else {
                    let heading = Style::default()
                        .fg(self.theme.heading_fg)
                        .add_modifier(Modifier::BOLD);
                    self.style_stack.push(heading);
                    self.push_span(format!("{} ", "#".repeat(level)), heading);
                }
            }
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::CodeBlock(_) => {
                self.begin_block();
                self.in_code_block = true;
            }
            Tag::BlockQuote(_) => {
                self.begin_block();
                self.quote_depth += 1;
                let quote = self.theme.quote_fg;
                self.push_style(|s| s.fg(quote).add_modifier(Modifier::ITALIC));
            }
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                let link_text = self.theme.link_text_fg;
                self.push_style(|s| s.fg(link_text).add_modifier(Modifier::BOLD));
                self.link = Some(LinkState {
                    url: dest_url.to_string(),
                    text: String::new(),
                });
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.begin_block();
                } else {
                    self.flush_line();
                }
                self.list_stack.push(ListState {
                    next_number: start,
                    hang_width: 2,
                });
            }
            Tag::Item => {
                self.flush_line();
                if let Some(list) = self.list_stack.last_mut() {
                    let marker = match list.next_number {
                        Some(n) => {
                            list.next_number = Some(n + 1);
                            format!("{n}. ")
                        }
                        None => "• ".to_string(),
                    };
                    list.hang_width = marker.width();
                    self.pending_marker = Some(marker);
                }
            }
            Tag::Table(alignments) => {
                self.begin_block();
                self.table = Some(TableState {
                    alignments,
                    rows: Vec::new(),
                    row: Vec::new(),
                    cell: Vec::new(),
                    head_rows: 0,
                });
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => {
                self.flush_line();
                self.needs_blank = true;
            }
            TagEnd::Heading(level) => {
                if level as usize == 1 {
                    let style = self.current_style();
                    self.push_span(" ", style);
                }
                self.pop_style();
                self.flush_line();
                self.needs_blank = true;
            }
            TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::CodeBlock => {
                self.flush_line();
                self.in_code_block = false;
                self.needs_blank = true;
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.needs_blank = true;
            }
            TagEnd::Link | TagEnd::Image => {
                self.pop_style();
                if let Some(link) = self.link.take() {
                    // Print the target after the text unless it adds nothing
                    let bare = link.url.strip_prefix("mailto:").unwrap_or(&link.url);
                    if !link.url.is_empty() && bare != link.text {
                        let style = Style::default()
                            .fg(self.theme.link_fg)
                            .add_modifier(Modifier::UNDERLINED);
                        let base = self.base_style();
                        self.push_span(" ", base);
                        self.push_span(link.url, style);
                    }
                }
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.needs_blank = true;
                }
            }
            TagEnd::Item => {
                self.flush_line();
                self.pending_marker = None;
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                    table.head_rows = table.rows.len();
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.render_table(table);
                }
                self.needs_blank = true;
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            let style = Style::default().fg(self.theme.code_block_fg);
            for (i, part) in text.split('\n').enumerate() {
                if i > 0 {
                    self.end_code_line();
                }
                if !part.is_empty() {
                    self.push_span(format!("  {}", part.replace('\t', "    ")), style);
                }
            }
            return;
        }

        let style = self.current_style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_line();
            }
            self.push_span(part, style);
        }
    }

    fn push_span(&mut self, text: impl Into<String>, style: Style) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(&text);
        }
        if let Some(table) = self.table.as_mut() {
            table.cell.push(StyledSpan { text, style });
            return;
        }
        self.start_line();
        self.current.push(text, style);
    }

    /// Emit quote bars and list markers at the start of a new line
    fn start_line(&mut self) {
        if !self.current.spans.is_empty() {
            return;
        }

        let base = self.base_style();
        let mut hang = String::new();

        if self.quote_depth > 0 {
            let bars = "│ ".repeat(self.quote_depth);
            self.current
                .push(bars.clone(), Style::default().fg(self.theme.quote_fg));
            hang.push_str(&bars);
        }

        if let Some((list, parents)) = self.list_stack.split_last() {
            let indent: usize = parents.iter().map(|l| l.hang_width).sum();
            let hang_width = indent + list.hang_width;
            match self.pending_marker.take() {
                Some(marker) => {
                    let style = Style::default().fg(self.theme.list_marker_fg);
                    self.current
                        .push(format!("{}{marker}", " ".repeat(indent)), style);
                }
                None => self.current.push(" ".repeat(hang_width), base),
            }
            hang.push_str(&" ".repeat(hang_width));
        }

        if !hang.is_empty() {
            self.current.hang = Some(StyledSpan {
                text: hang,
                style: Style::default().fg(self.theme.quote_fg),
            });
        }
    }

    fn flush_line(&mut self) {
        if !self.current.spans.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    /// Finish a code line, keeping it even when it is empty
    fn end_code_line(&mut self) {
        self.start_line();
        self.lines.push(std::mem::take(&mut self.current));
    }

    /// Separate a new block from the previous one by a blank line
    fn begin_block(&mut self) {
        self.flush_line();
        if self.needs_blank && !self.lines.is_empty() {
            self.lines.push(StyledLine::new());
        }
        self.needs_blank = false;
    }

    fn render_table(&mut self, table: TableState) {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }

        let cell_width = |cell: &[StyledSpan]| -> usize { cell.iter().map(|s| s.text.width()).sum() };

        let mut widths = vec![0usize; columns];
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell_width(cell));
            }
        }

        let border = Style::default().fg(self.theme.table_border_fg);
        let base = self.base_style();

        for (row_index, row) in table.rows.iter().enumerate() {
            let is_head = row_index < table.head_rows;
            for (col, width) in widths.iter().enumerate() {
                if col > 0 {
                    self.push_span(" │ ", border);
                }
                let cell = row.get(col).map(Vec::as_slice).unwrap_or(&[]);
                let pad = width.saturating_sub(cell_width(cell));
                let (left, right) = match table.alignments.get(col) {
                    Some(Alignment::Right) => (pad, 0),
                    Some(Alignment::Center) => (pad / 2, pad - pad / 2),
                    _ => (0, pad),
                };

                self.push_span(" ".repeat(left), base);
                for span in cell {
                    let style = if is_head {
                        span.style.add_modifier(Modifier::BOLD)
                    } else {
                        span.style
                    };
                    self.push_span(span.text.clone(), style);
                }
                self.push_span(" ".repeat(right), base);
            }
            self.flush_line();

            if row_index + 1 == table.head_rows {
                let rule = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.push_span(rule, border);
                self.flush_line();
            }
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        self.flush_line();

        // Remove trailing empty lines
        while self.lines.last().map(|l| l.spans.is_empty()).unwrap_or(false) {
            self.lines.pop();
        }

        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::theme::{self, Theme};

    fn options(width: usize) -> MarkdownOptions {
        MarkdownOptions {
            width,
            preserve_newlines: true,
        }
    }

    fn parse(text: &str) -> Vec<StyledLine> {
        let theme = Theme::from_name(theme::THEME_DARK).unwrap();
        parse_markdown(text, &theme, options(60))
    }

    fn get_line_text(line: &StyledLine) -> String {
        line.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn texts(lines: &[StyledLine]) -> Vec<String> {
        lines.iter().map(get_line_text).collect()
    }

    fn has_modifier(line: &StyledLine, text: &str, modifier: Modifier) -> bool {
        line.spans
            .iter()
            .any(|s| s.text == text && s.style.add_modifier.contains(modifier))
    }

    #[test]
    fn test_plain_text() {
        let lines = parse("Hello world");

        assert_eq!(lines.len(), 1);
        assert_eq!(get_line_text(&lines[0]), "Hello world");
    }

    #[test]
    fn test_inline_formatting() {
        let lines = parse("This is **bold**, *italic* and ~~gone~~");

        assert_eq!(lines.len(), 1);
        assert_eq!(get_line_text(&lines[0]), "This is bold, italic and gone");
        assert!(has_modifier(&lines[0], "bold", Modifier::BOLD));
        assert!(has_modifier(&lines[0], "italic", Modifier::ITALIC));
        assert!(has_modifier(&lines[0], "gone", Modifier::CROSSED_OUT));
    }

    #[test]
    fn test_inline_code() {
        let theme = Theme::dark();
        let lines = parse("Use `println!` to print");

        assert_eq!(get_line_text(&lines[0]), "Use  println!  to print");
        let code = lines[0]
            .spans
            .iter()
            .find(|s| s.text.contains("println!"))
            .unwrap();
        assert_eq!(code.style.bg, Some(theme.inline_code_bg));
    }

    #[test]
    fn test_code_block_keeps_lines() {
        let lines = parse("```\nfirst\n\n  indented\n```");

        assert_eq!(texts(&lines), vec!["  first", "", "    indented"]);
    }

    #[test]
    fn test_headings() {
        let theme = Theme::dark();
        let lines = parse("# Title\n\n## Section\n\nContent");

        assert_eq!(
            texts(&lines),
            vec![" Title ", "", "## Section", "", "Content"]
        );
        assert!(lines[0].spans.iter().all(|s| s.style.bg == Some(theme.title_bg)));
        assert!(has_modifier(&lines[2], "Section", Modifier::BOLD));
    }

    #[test]
    fn test_link_shows_target() {
        let lines = parse("Click [here](https://example.com) for more");

        assert_eq!(
            get_line_text(&lines[0]),
            "Click here https://example.com for more"
        );
    }

    #[test]
    fn test_autolink_is_not_repeated() {
        let lines = parse("<https://example.com> and <me@example.com>");

        assert_eq!(
            get_line_text(&lines[0]),
            "https://example.com and me@example.com"
        );
    }

    #[test]
    fn test_unordered_list() {
        let lines = parse("- Item 1\n- Item 2\n- Item 3");

        assert_eq!(texts(&lines), vec!["• Item 1", "• Item 2", "• Item 3"]);
    }

    #[test]
    fn test_ordered_and_nested_lists() {
        let lines = parse("3. three\n4. four\n   - inner");

        assert_eq!(texts(&lines), vec!["3. three", "4. four", "   • inner"]);
    }

    #[test]
    fn test_block_quote() {
        let lines = parse("> quoted\n> text");

        assert_eq!(texts(&lines), vec!["│ quoted", "│ text"]);
    }

    #[test]
    fn test_paragraph_separation() {
        let lines = parse("First paragraph.\n\nSecond paragraph.");

        assert_eq!(
            texts(&lines),
            vec!["First paragraph.", "", "Second paragraph."]
        );
    }

    #[test]
    fn test_soft_breaks() {
        let theme = Theme::dark();

        let kept = parse_markdown("Line one\nLine two", &theme, options(60));
        assert_eq!(texts(&kept), vec!["Line one", "Line two"]);

        let joined = parse_markdown(
            "Line one\nLine two",
            &theme,
            MarkdownOptions {
                width: 60,
                preserve_newlines: false,
            },
        );
        assert_eq!(texts(&joined), vec!["Line one Line two"]);
    }

    #[test]
    fn test_rule_spans_width() {
        let theme = Theme::dark();
        let lines = parse_markdown("above\n\n---\n\nbelow", &theme, options(30));

        assert_eq!(get_line_text(&lines[2]), "─".repeat(30));
    }

    #[test]
    fn test_table_columns() {
        let lines = parse("| A | Long header |\n|---|--:|\n| xx | 1 |\n| y | 22 |");

        assert_eq!(
            texts(&lines),
            vec![
                "A  │ Long header".to_string(),
                format!("{}┼{}", "─".repeat(3), "─".repeat(12)),
                format!("xx │ {}1", " ".repeat(10)),
                format!("y  │ {}22", " ".repeat(9)),
            ]
        );
        assert!(has_modifier(&lines[0], "A", Modifier::BOLD));
    }

    #[test]
    fn test_wrap_at_word_boundaries() {
        let lines = parse("the quick brown fox jumps over the lazy dog");
        let wrapped = wrap_styled_lines(&lines, 15);

        assert_eq!(
            texts(&wrapped),
            vec!["the quick brown", "fox jumps over", "the lazy dog"]
        );
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = parse("abcdefghijklmnopqrstuvwxyz");
        let wrapped = wrap_styled_lines(&lines, 10);

        assert_eq!(texts(&wrapped), vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn test_wrap_keeps_list_hang() {
        let lines = parse("- alpha beta gamma delta");
        let wrapped = wrap_styled_lines(&lines, 12);

        assert_eq!(texts(&wrapped), vec!["• alpha beta", "  gamma", "  delta"]);
    }

    #[test]
    fn test_wrap_keeps_quote_bars() {
        let lines = parse("> alpha beta gamma");
        let wrapped = wrap_styled_lines(&lines, 12);

        assert_eq!(texts(&wrapped), vec!["│ alpha beta", "│ gamma"]);
    }

    #[test]
    fn test_wrapped_lines_fit() {
        let theme = Theme::dark();
        let text = crate::content::EMBEDDED_DOCUMENT;
        for width in [10usize, 20, 37, 76, 120] {
            let lines = parse_markdown(text, &theme, options(width));
            for line in wrap_styled_lines(&lines, width) {
                assert!(
                    line.width() <= width,
                    "line {:?} wider than {width}",
                    line.text()
                );
            }
        }
    }

    #[test]
    fn test_to_line_keeps_styles() {
        let lines = parse("plain **bold**");
        let line = lines[0].to_line();

        assert_eq!(line.spans.len(), 2);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }
}
