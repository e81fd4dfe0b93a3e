//! Status bar rendering with keybindings and the tooltip under the cursor

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub struct StatusRenderData<'a> {
    pub message: &'a str,
    /// Zero-based cursor line and column.
    pub position: Option<(usize, usize)>,
    pub tooltip: Option<String>,
    pub has_errors: bool,
}

pub fn render_status_bar(frame: &mut Frame, area: Rect, data: StatusRenderData<'_>) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let bar = Style::default().bg(DEFAULT_THEME.current_line_bg);
    let position = match data.position {
        Some((line, column)) => format!(" Ln {}, Col {} ", line + 1, column + 1),
        None => " -- ".to_string(),
    };

    let mut left_spans = vec![
        Span::styled(
            position,
            Style::default()
                .bg(if data.has_errors {
                    DEFAULT_THEME.error
                } else {
                    DEFAULT_THEME.primary
                })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", bar.fg(DEFAULT_THEME.comment)),
    ];
    match data.tooltip {
        Some(tooltip) => left_spans.push(Span::styled(
            format!(" {} ", tooltip),
            bar.fg(DEFAULT_THEME.type_name),
        )),
        None => left_spans.push(Span::styled(
            format!(" {} ", data.message),
            bar.fg(DEFAULT_THEME.fg),
        )),
    }

    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(bar)
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar.fg(DEFAULT_THEME.fg);
    let sep_style = bar.fg(DEFAULT_THEME.comment);

    let right_spans = vec![
        Span::styled(" ⇥ ", key_style),
        Span::styled(" focus ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ", desc_style),
        Span::styled(" ↵ ", key_style),
        Span::styled(" open ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ", desc_style),
        Span::styled(" ^S ", key_style),
        Span::styled(" save ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ", desc_style),
        Span::styled(" esc ", key_style),
        Span::styled(" quit ", desc_style),
    ];

    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(bar)
            .alignment(Alignment::Right),
        layout[1],
    );
}
