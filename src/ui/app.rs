//! Main TUI application state and logic

use crate::parser::ast::FileId;
use crate::project::{Document, FileKind, Project};
use crate::ui::editor;
use crate::ui::panes::{self, StatusRenderData};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout},
};
use std::io;
use std::time::Duration;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Files,
    Source,
    Diagnostics,
}

impl FocusedPane {
    /// Move focus to the next pane (files -> source -> diagnostics)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Files => FocusedPane::Source,
            FocusedPane::Source => FocusedPane::Diagnostics,
            FocusedPane::Diagnostics => FocusedPane::Files,
        }
    }

    /// Move focus to the previous pane
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Files => FocusedPane::Diagnostics,
            FocusedPane::Source => FocusedPane::Files,
            FocusedPane::Diagnostics => FocusedPane::Source,
        }
    }
}

/// The main application state
pub struct App {
    pub project: Project,

    /// Document shown in the source pane
    pub open: Option<FileId>,

    /// Byte offset of the cursor in the open document
    pub cursor: usize,

    pub focused_pane: FocusedPane,

    /// Selection in the files and diagnostics panes
    pub file_selected: usize,
    pub diagnostic_selected: usize,

    /// Per-pane scroll offsets
    pub files_scroll: usize,
    pub source_scroll: usize,
    pub diagnostics_scroll: usize,

    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,
}

impl App {
    /// Create the app and open the first ZScript document, if any.
    pub fn new(project: Project) -> Self {
        let first = project
            .documents()
            .iter()
            .find(|doc| doc.kind == FileKind::ZScript)
            .map(|doc| doc.id);
        let status_message = if project.has_errors() {
            String::from("Project has errors")
        } else {
            String::from("Ready!")
        };
        App {
            project,
            open: first,
            cursor: 0,
            focused_pane: if first.is_some() {
                FocusedPane::Source
            } else {
                FocusedPane::Files
            },
            file_selected: first.map_or(0, |id| id.0),
            diagnostic_selected: 0,
            files_scroll: 0,
            source_scroll: 0,
            diagnostics_scroll: 0,
            should_quit: false,
            status_message,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn document(&self) -> Option<&Document> {
        self.open.and_then(|id| self.project.document(id))
    }

    /// Tooltip of the semantic token under the cursor
    pub fn tooltip(&self) -> Option<String> {
        let id = self.open?;
        self.project.token_at(id, self.cursor).map(|t| t.tooltip())
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        // Files | Source over Diagnostics
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(22), Constraint::Percentage(78)])
            .split(main_chunks[0]);

        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
            .split(columns[1]);

        panes::render_files_pane(
            frame,
            columns[0],
            self.project.documents(),
            self.file_selected,
            self.open.map(|id| id.0),
            self.focused_pane == FocusedPane::Files,
            &mut self.files_scroll,
        );

        let document = self.open.and_then(|id| self.project.document(id));
        panes::render_source_pane(
            frame,
            right_rows[0],
            document,
            self.cursor,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_diagnostics_pane(
            frame,
            right_rows[1],
            document.map_or(&[][..], |doc| doc.diagnostics()),
            self.diagnostic_selected,
            self.focused_pane == FocusedPane::Diagnostics,
            &mut self.diagnostics_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                position: document.map(|doc| editor::line_col(&doc.text, self.cursor)),
                tooltip: self.tooltip(),
                has_errors: self.project.has_errors(),
            },
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('q') if control => self.should_quit = true,
            KeyCode::Char('s') if control => self.save(),
            KeyCode::Tab => self.focused_pane = self.focused_pane.next(),
            KeyCode::BackTab => self.focused_pane = self.focused_pane.prev(),
            _ => match self.focused_pane {
                FocusedPane::Files => self.handle_files_key(key.code),
                FocusedPane::Source if !control => self.handle_source_key(key.code),
                FocusedPane::Source => {}
                FocusedPane::Diagnostics => self.handle_diagnostics_key(key.code),
            },
        }
    }

    fn handle_files_key(&mut self, code: KeyCode) {
        let count = self.project.documents().len();
        match code {
            KeyCode::Up => self.file_selected = self.file_selected.saturating_sub(1),
            KeyCode::Down if self.file_selected + 1 < count => self.file_selected += 1,
            KeyCode::Enter if self.file_selected < count => {
                self.open_document(FileId(self.file_selected));
            }
            _ => {}
        }
    }

    fn handle_diagnostics_key(&mut self, code: KeyCode) {
        let Some(document) = self.document() else {
            return;
        };
        let count = document.diagnostics().len();
        let target = document
            .diagnostics()
            .get(self.diagnostic_selected)
            .map(|d| editor::offset_at(&document.text, d.line.saturating_sub(1), 0));
        match code {
            KeyCode::Up => self.diagnostic_selected = self.diagnostic_selected.saturating_sub(1),
            KeyCode::Down if self.diagnostic_selected + 1 < count => {
                self.diagnostic_selected += 1;
            }
            KeyCode::Enter => {
                if let Some(offset) = target {
                    self.cursor = offset;
                    self.focused_pane = FocusedPane::Source;
                }
            }
            _ => {}
        }
    }

    fn handle_source_key(&mut self, code: KeyCode) {
        let Some(id) = self.open else {
            return;
        };
        let Some(document) = self.project.document(id) else {
            return;
        };
        let text = document.text.as_str();
        match code {
            KeyCode::Left => self.cursor = editor::prev_boundary(text, self.cursor),
            KeyCode::Right => self.cursor = editor::next_boundary(text, self.cursor),
            KeyCode::Up => self.cursor = editor::move_vertical(text, self.cursor, false),
            KeyCode::Down => self.cursor = editor::move_vertical(text, self.cursor, true),
            KeyCode::Home => {
                let (line, _) = editor::line_col(text, self.cursor);
                self.cursor = editor::offset_at(text, line, 0);
            }
            KeyCode::End => {
                let (line, _) = editor::line_col(text, self.cursor);
                self.cursor = editor::offset_at(text, line, usize::MAX);
            }
            KeyCode::Char(c) => self.insert(&c.to_string()),
            KeyCode::Enter => self.insert("\n"),
            KeyCode::Backspace if self.cursor > 0 => {
                let start = editor::prev_boundary(text, self.cursor);
                self.replace(start, self.cursor, "");
            }
            KeyCode::Delete if self.cursor < text.len() => {
                let end = editor::next_boundary(text, self.cursor);
                self.replace(self.cursor, end, "");
            }
            _ => {}
        }
    }

    fn open_document(&mut self, id: FileId) {
        let Some(document) = self.project.document(id) else {
            return;
        };
        self.status_message = format!("Opened {}", document.path);
        self.open = Some(id);
        self.cursor = 0;
        self.source_scroll = 0;
        self.diagnostic_selected = 0;
        self.diagnostics_scroll = 0;
        self.focused_pane = FocusedPane::Source;
    }

    fn insert(&mut self, text: &str) {
        self.replace(self.cursor, self.cursor, text);
    }

    /// Replace `start..end` of the open document and rebuild the project.
    fn replace(&mut self, start: usize, end: usize, with: &str) {
        let Some(id) = self.open else {
            return;
        };
        let Some(document) = self.project.document(id) else {
            return;
        };
        let mut text = document.text.clone();
        text.replace_range(start..end, with);
        match self.project.set_contents(id, text) {
            Ok(()) => {
                self.cursor = start + with.len();
                let count = self.document().map_or(0, |doc| doc.diagnostics().len());
                self.diagnostic_selected = self.diagnostic_selected.min(count.saturating_sub(1));
            }
            Err(e) => self.status_message = format!("Error: {}", e),
        }
    }

    fn save(&mut self) {
        let Some(id) = self.open else {
            self.status_message = "No file open".to_string();
            return;
        };
        self.status_message = match self.project.save(id) {
            Ok(()) => match self.project.document(id) {
                Some(doc) => format!("Saved {}", doc.path),
                None => "Saved".to_string(),
            },
            Err(e) => format!("Save failed: {}", e),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app() -> App {
        App::new(Project::from_sources([
            ("base.zs", "class Base { int x; }"),
            ("derived.zs", "class Derived : Base { }"),
        ]))
    }

    #[test]
    fn test_focus_cycle() {
        let pane = FocusedPane::Files;
        assert_eq!(pane.next().next().next(), pane);
        assert_eq!(pane.prev(), FocusedPane::Diagnostics);
        assert_eq!(pane.next().prev(), pane);
    }

    #[test]
    fn test_typing_rebuilds_project() {
        let mut app = App::new(Project::from_sources([("a.zs", "class A { }")]));
        assert_eq!(app.open, Some(FileId(0)));
        assert_eq!(app.focused_pane, FocusedPane::Source);

        for _ in 0.."class A".len() {
            app.handle_key_event(key(KeyCode::Right));
        }
        for c in " : Nope".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        let doc = app.document().expect("document");
        assert_eq!(doc.text, "class A : Nope { }");
        assert!(doc.modified);
        assert!(!doc.diagnostics().is_empty());

        for _ in 0.." : Nope".len() {
            app.handle_key_event(key(KeyCode::Backspace));
        }
        let doc = app.document().expect("document");
        assert_eq!(doc.text, "class A { }");
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn test_open_from_file_list() {
        let mut app = app();
        assert_eq!(app.open, Some(FileId(0)));

        app.handle_key_event(key(KeyCode::BackTab));
        assert_eq!(app.focused_pane, FocusedPane::Files);
        app.handle_key_event(key(KeyCode::Down));
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.open, Some(FileId(1)));
        assert_eq!(app.focused_pane, FocusedPane::Source);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_tooltip_follows_cursor() {
        let mut app = app();
        for _ in 0.."class B".len() {
            app.handle_key_event(key(KeyCode::Right));
        }
        assert_eq!(app.tooltip().as_deref(), Some("type Base"));
    }

    #[test]
    fn test_quit_and_save_without_root() {
        let mut app = app();
        app.handle_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(app.status_message.starts_with("Save failed"));
        assert!(!app.should_quit);
        app.handle_key_event(key(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
