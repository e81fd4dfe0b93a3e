//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! - **[`app`]**: application state, keyboard event loop, pane focus, editing
//! - **[`editor`]**: cursor arithmetic over document text
//! - **[`panes`]**: render functions for each visible pane
//! - **[`theme`]**: color palette and the style of each semantic class
//!
//! Construct an [`App`] from a loaded [`Project`](crate::project::Project)
//! and call [`App::run`](app::App::run). Every edit rebuilds the project, so
//! highlighting and diagnostics always reflect all open files.

pub mod app;
pub mod editor;
pub mod panes;
pub mod theme;

pub use app::App;
