//! Diagnostics of the open document

use super::{border_style, follow};
use crate::parser::parse::{Diagnostic, Severity};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_diagnostics_pane(
    frame: &mut Frame,
    area: Rect,
    diagnostics: &[Diagnostic],
    selected: usize,
    is_focused: bool,
    scroll: &mut usize,
) {
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let block = Block::default()
        .title(format!(
            " Problems: {} error(s), {} warning(s) ",
            errors,
            diagnostics.len() - errors
        ))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = follow(*scroll, selected, visible_height);

    if diagnostics.is_empty() {
        let line = Line::from(Span::styled(
            "No problems",
            Style::default().fg(DEFAULT_THEME.success),
        ));
        frame.render_widget(Paragraph::new(line).block(block), area);
        return;
    }

    let lines: Vec<Line> = diagnostics
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, diagnostic)| {
            let color = match diagnostic.severity {
                Severity::Error => DEFAULT_THEME.error,
                Severity::Warning => DEFAULT_THEME.warning,
            };
            let mut text_style = Style::default().fg(DEFAULT_THEME.fg);
            if idx == selected && is_focused {
                text_style = text_style.bg(DEFAULT_THEME.current_line_bg);
            }
            Line::from(vec![
                Span::styled(
                    format!("{:7} ", diagnostic.severity.to_string()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:4} ", diagnostic.line),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(diagnostic.message.as_str(), text_style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
