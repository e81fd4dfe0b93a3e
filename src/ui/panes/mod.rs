//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`files`]: Project tree with per-file problem markers
//! - [`source`]: The open document, colored by its semantic tokens
//! - [`diagnostics`]: Errors and warnings of the open document
//! - [`status`]: Cursor position, tooltip under the cursor, keybindings
//!
//! Each module exports a `render_*` function that only reads state, apart
//! from the scroll offset it keeps in range.

pub mod diagnostics;
pub mod files;
pub mod source;
pub mod status;

pub use diagnostics::render_diagnostics_pane;
pub use files::render_files_pane;
pub use source::render_source_pane;
pub use status::{render_status_bar, StatusRenderData};

use crate::ui::theme::DEFAULT_THEME;
use ratatui::style::{Modifier, Style};

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Scroll offset that keeps `selected` inside a window of `height` rows.
fn follow(scroll: usize, selected: usize, height: usize) -> usize {
    if selected < scroll {
        selected
    } else if selected >= scroll + height {
        selected + 1 - height
    } else {
        scroll
    }
}
