//! Source pane rendering with semantic highlighting
//!
//! # Features
//!
//! - Colors come from the document's semantic tokens, not from a local
//!   tokenizer, so cross-file resolution shows up directly
//! - Unresolved names are underlined in red
//! - Lines with diagnostics get a marker in the gutter
//! - The cursor line is highlighted and kept in view

use super::{border_style, follow};
use crate::parser::parse::Severity;
use crate::parser::semantic::{SemanticKind, SemanticToken};
use crate::project::Document;
use crate::ui::editor;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Semantic class of every byte of `text`. Later tokens override earlier ones.
pub fn classify(text: &str, tokens: &[SemanticToken]) -> Vec<Option<SemanticKind>> {
    let mut kinds = vec![None; text.len()];
    for token in tokens {
        let end = token.end.min(text.len());
        if token.start < end {
            kinds[token.start..end].fill(Some(token.kind));
        }
    }
    kinds
}

/// Spans for the byte range `start..end`, grouping chars of equal class.
fn highlight_line<'a>(
    text: &'a str,
    start: usize,
    end: usize,
    kinds: &[Option<SemanticKind>],
    cursor: Option<usize>,
) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    let mut run_start = start;
    let mut run_kind = kinds.get(start).copied().flatten();

    for (i, c) in text[start..end].char_indices() {
        let at = start + i;
        let kind = kinds.get(at).copied().flatten();
        if Some(at) == cursor {
            if run_start < at {
                spans.push(Span::styled(&text[run_start..at], DEFAULT_THEME.style_for(run_kind)));
            }
            let next = at + c.len_utf8();
            spans.push(Span::styled(
                &text[at..next],
                DEFAULT_THEME
                    .style_for(kind)
                    .add_modifier(Modifier::REVERSED),
            ));
            run_start = next;
            run_kind = kinds.get(next).copied().flatten();
            continue;
        }
        if kind != run_kind {
            if run_start < at {
                spans.push(Span::styled(&text[run_start..at], DEFAULT_THEME.style_for(run_kind)));
            }
            run_start = at;
            run_kind = kind;
        }
    }
    if run_start < end {
        spans.push(Span::styled(&text[run_start..end], DEFAULT_THEME.style_for(run_kind)));
    }
    // Cursor past the last char of the line.
    if cursor == Some(end) {
        spans.push(Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)));
    }
    spans
}

/// Render the source pane for `document`, keeping `cursor` visible.
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    document: Option<&Document>,
    cursor: usize,
    is_focused: bool,
    scroll: &mut usize,
) {
    let title = match document {
        Some(doc) if doc.modified => format!(" {} [+] ", doc.path),
        Some(doc) => format!(" {} ", doc.path),
        None => " Source ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let Some(document) = document else {
        let hint = Paragraph::new(Line::from(Span::styled(
            "No file open",
            Style::default().fg(DEFAULT_THEME.comment),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    };

    let text = document.text.as_str();
    let kinds = classify(text, document.semantic());
    let starts = editor::line_starts(text);
    let (cursor_line, _) = editor::line_col(text, cursor);

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = follow(*scroll, cursor_line, visible_height);

    let visible_lines: Vec<Line> = starts
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, &start)| {
            let mut end = starts.get(idx + 1).map_or(text.len(), |&next| next - 1);
            if text[start..end].ends_with('\r') {
                end -= 1;
            }
            let line_num = idx + 1;
            let is_current = idx == cursor_line;

            let severity = document
                .diagnostics()
                .iter()
                .filter(|d| d.line == line_num)
                .map(|d| d.severity)
                .min_by_key(|s| matches!(s, Severity::Warning));
            let (marker, marker_style) = match severity {
                Some(Severity::Error) => ("●", Style::default().fg(DEFAULT_THEME.error)),
                Some(Severity::Warning) => ("●", Style::default().fg(DEFAULT_THEME.warning)),
                None => (" ", Style::default()),
            };

            let num_style = if is_current {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let line_cursor = is_current.then_some(cursor);
            let mut content = highlight_line(text, start, end, &kinds, line_cursor);
            if is_current {
                for span in &mut content {
                    span.style = span.style.bg(DEFAULT_THEME.current_line_bg);
                }
            }

            let mut spans = vec![
                Span::styled(marker, marker_style),
                Span::styled(format!("{:4} ", line_num), num_style),
            ];
            spans.extend(content);
            Line::from(spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(start: usize, end: usize, kind: SemanticKind) -> SemanticToken {
        SemanticToken {
            start,
            end,
            kind,
            reference: None,
            qualified_name: None,
        }
    }

    #[test]
    fn test_classify_later_tokens_win() {
        let tokens = vec![
            token(0, 5, SemanticKind::Keyword),
            token(6, 9, SemanticKind::TypeName),
            token(6, 9, SemanticKind::Invalid),
        ];
        let kinds = classify("class Foo", &tokens);
        assert_eq!(kinds[0], Some(SemanticKind::Keyword));
        assert_eq!(kinds[5], None);
        assert_eq!(kinds[7], Some(SemanticKind::Invalid));
    }

    #[test]
    fn test_highlight_line_groups_runs() {
        let text = "class Foo";
        let tokens = vec![
            token(0, 5, SemanticKind::Keyword),
            token(6, 9, SemanticKind::TypeName),
        ];
        let kinds = classify(text, &tokens);
        let spans = highlight_line(text, 0, text.len(), &kinds, None);
        let pieces: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(pieces, vec!["class", " ", "Foo"]);

        let spans = highlight_line(text, 0, text.len(), &kinds, Some(7));
        let pieces: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(pieces, vec!["class", " ", "F", "o", "o"]);
        assert!(spans[3].style.add_modifier.contains(Modifier::REVERSED));
    }
}
