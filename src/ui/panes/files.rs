//! Project file list

use super::{border_style, follow};
use crate::project::{Document, FileKind};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_files_pane(
    frame: &mut Frame,
    area: Rect,
    documents: &[Document],
    selected: usize,
    open: Option<usize>,
    is_focused: bool,
    scroll: &mut usize,
) {
    let block = Block::default()
        .title(format!(" Files ({}) ", documents.len()))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = follow(*scroll, selected, visible_height);

    let lines: Vec<Line> = documents
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, doc)| {
            let failed = doc.unit.as_ref().is_some_and(|unit| unit.has_errors());
            let warned = !failed && !doc.diagnostics().is_empty();
            let marker = if failed {
                Span::styled("✗ ", Style::default().fg(DEFAULT_THEME.error))
            } else if warned {
                Span::styled("! ", Style::default().fg(DEFAULT_THEME.warning))
            } else {
                Span::raw("  ")
            };

            let mut style = match doc.kind {
                FileKind::ZScript => Style::default().fg(DEFAULT_THEME.fg),
                FileKind::Text => Style::default().fg(DEFAULT_THEME.comment),
            };
            if Some(idx) == open {
                style = style.add_modifier(Modifier::BOLD);
            }
            if idx == selected && is_focused {
                style = style.bg(DEFAULT_THEME.current_line_bg);
            }

            let name = if doc.modified {
                format!("{} [+]", doc.path)
            } else {
                doc.path.clone()
            };
            Line::from(vec![marker, Span::styled(name, style)])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
