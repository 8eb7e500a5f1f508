use ratatui::style::Color;

pub const THEME_DARK: &str = "dark";
pub const THEME_LIGHT: &str = "light";

/// Colors used by the document renderer and the session chrome
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,

    // Document colors
    pub text_fg: Color,
    pub title_fg: Color,
    pub title_bg: Color,
    pub heading_fg: Color,
    pub link_fg: Color,
    pub link_text_fg: Color,
    pub inline_code_fg: Color,
    pub inline_code_bg: Color,
    pub code_block_fg: Color,
    pub quote_fg: Color,
    pub list_marker_fg: Color,
    pub rule_fg: Color,
    pub table_border_fg: Color,

    // Session chrome
    pub border_fg: Color,
    pub help_key_fg: Color,
    pub help_desc_fg: Color,
    pub help_separator_fg: Color,
    pub info_label_fg: Color,
    pub placeholder_fg: Color,
}

impl Theme {
    /// Default theme for dark terminal backgrounds
    pub fn dark() -> Self {
        Self {
            name: THEME_DARK.to_string(),

            text_fg: Color::Indexed(252),
            title_fg: Color::Indexed(228),
            title_bg: Color::Indexed(63),
            heading_fg: Color::Indexed(39),
            link_fg: Color::Indexed(30),
            link_text_fg: Color::Indexed(35),
            inline_code_fg: Color::Indexed(203),
            inline_code_bg: Color::Indexed(236),
            code_block_fg: Color::Indexed(244),
            quote_fg: Color::Indexed(245),
            list_marker_fg: Color::Indexed(252),
            rule_fg: Color::Indexed(240),
            table_border_fg: Color::Indexed(240),

            border_fg: Color::Indexed(62),
            help_key_fg: Color::Indexed(241),
            help_desc_fg: Color::Indexed(241),
            help_separator_fg: Color::Indexed(239),
            info_label_fg: Color::Indexed(62),
            placeholder_fg: Color::Indexed(252),
        }
    }

    /// Theme for light terminal backgrounds
    pub fn light() -> Self {
        Self {
            name: THEME_LIGHT.to_string(),

            text_fg: Color::Indexed(234),
            title_fg: Color::Indexed(228),
            title_bg: Color::Indexed(63),
            heading_fg: Color::Indexed(27),
            link_fg: Color::Indexed(36),
            link_text_fg: Color::Indexed(29),
            inline_code_fg: Color::Indexed(203),
            inline_code_bg: Color::Indexed(254),
            code_block_fg: Color::Indexed(242),
            quote_fg: Color::Indexed(244),
            list_marker_fg: Color::Indexed(234),
            rule_fg: Color::Indexed(249),
            table_border_fg: Color::Indexed(249),

            border_fg: Color::Indexed(62),
            help_key_fg: Color::Indexed(241),
            help_desc_fg: Color::Indexed(241),
            help_separator_fg: Color::Indexed(250),
            info_label_fg: Color::Indexed(62),
            placeholder_fg: Color::Indexed(234),
        }
    }

    /// Look up a built-in theme by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            THEME_DARK => Some(Self::dark()),
            THEME_LIGHT => Some(Self::light()),
            _ => None,
        }
    }

    pub fn available_themes() -> Vec<String> {
        vec![THEME_DARK.to_string(), THEME_LIGHT.to_string()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Theme::from_name("dark").unwrap().name, THEME_DARK);
        assert_eq!(Theme::from_name("Light").unwrap().name, THEME_LIGHT);
        assert!(Theme::from_name("high-contrast").is_none());
    }

    #[test]
    fn test_chrome_colors_match_across_themes() {
        for name in Theme::available_themes() {
            let theme = Theme::from_name(&name).unwrap();
            assert_eq!(theme.border_fg, Color::Indexed(62));
            assert_eq!(theme.help_key_fg, Color::Indexed(241));
        }
    }
}
