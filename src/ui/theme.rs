use crate::parser::semantic::SemanticKind;
use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    #[allow(dead_code)]
    pub bg: Color,
    pub fg: Color,
    pub primary: Color,   // Blue
    pub secondary: Color, // Orange
    pub comment: Color,   // Grey
    pub success: Color,   // Green
    pub error: Color,     // Red
    pub warning: Color,   // Yellow
    pub keyword: Color,
    pub string: Color,
    pub number: Color,
    pub type_name: Color,
    pub constant: Color,
    pub field: Color,
    pub local: Color,
    pub method: Color,
    pub argument: Color,
    pub operator: Color,
    pub preprocessor: Color,
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),
    secondary: Color::Rgb(250, 179, 135),
    comment: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    warning: Color::Rgb(249, 226, 175),
    keyword: Color::Rgb(203, 166, 247),      // Mauve
    string: Color::Rgb(166, 227, 161),       // Green
    number: Color::Rgb(250, 179, 135),       // Peach
    type_name: Color::Rgb(148, 226, 213),    // Teal
    constant: Color::Rgb(250, 179, 135),     // Peach
    field: Color::Rgb(180, 190, 254),        // Lavender
    local: Color::Rgb(205, 214, 244),        // Text
    method: Color::Rgb(137, 180, 250),       // Blue
    argument: Color::Rgb(235, 160, 172),     // Maroon
    operator: Color::Rgb(137, 220, 235),     // Sky
    preprocessor: Color::Rgb(245, 194, 231), // Pink
    border_focused: Color::Rgb(249, 226, 175),
    border_normal: Color::Rgb(108, 112, 134),
    current_line_bg: Color::Rgb(50, 50, 70),
};

impl Theme {
    /// Text style for a semantic class; unclassified text uses `fg`.
    pub fn style_for(&self, kind: Option<SemanticKind>) -> Style {
        let Some(kind) = kind else {
            return Style::default().fg(self.fg);
        };
        match kind {
            SemanticKind::Comment => Style::default()
                .fg(self.comment)
                .add_modifier(Modifier::ITALIC),
            SemanticKind::Preprocessor => Style::default().fg(self.preprocessor),
            SemanticKind::Keyword => Style::default()
                .fg(self.keyword)
                .add_modifier(Modifier::BOLD),
            SemanticKind::TypeName => Style::default().fg(self.type_name),
            SemanticKind::ConstantName => Style::default().fg(self.constant),
            SemanticKind::Number => Style::default().fg(self.number),
            SemanticKind::String => Style::default().fg(self.string),
            SemanticKind::Field => Style::default().fg(self.field),
            SemanticKind::Local => Style::default().fg(self.local),
            SemanticKind::Method => Style::default().fg(self.method),
            SemanticKind::Argument => Style::default()
                .fg(self.argument)
                .add_modifier(Modifier::ITALIC),
            SemanticKind::Operator => Style::default().fg(self.operator),
            SemanticKind::SpecialToken => Style::default().fg(self.comment),
            SemanticKind::Invalid => Style::default()
                .fg(self.error)
                .add_modifier(Modifier::UNDERLINED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_is_underlined() {
        let style = DEFAULT_THEME.style_for(Some(SemanticKind::Invalid));
        assert_eq!(style.fg, Some(DEFAULT_THEME.error));
        assert!(style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(DEFAULT_THEME.style_for(None).fg, Some(DEFAULT_THEME.fg));
    }
}
