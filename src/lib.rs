//! # Introduction
//!
//! zsedit is a terminal editor for ZScript projects. Every file in the
//! project is parsed into a syntax tree, names are resolved across files,
//! and the result drives highlighting, tooltips and diagnostics in a
//! [ratatui](https://docs.rs/ratatui) TUI.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Declarations → Fields → Type links → Bodies → Semantic tokens → TUI
//!                        └──────── project-wide type index ────────┘
//! ```
//!
//! 1. [`parser`]: tokenises each file and parses declarations, member
//!    signatures and method bodies.
//! 2. [`resolver`]: the project-wide type index, name lookup, class links
//!    and expression typing.
//! 3. [`project`]: the documents of a project and the phase driver that
//!    rebuilds them together after each edit.
//! 4. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Phases
//!
//! Each phase runs over every file before the next one starts, so a file
//! can refer to types declared in files parsed after it:
//!
//! 1. top-level declarations and includes
//! 2. fields, method signatures, constants and properties
//! 3. class parent, extension and replacement links
//! 4. method bodies and expression highlighting

pub mod parser;
pub mod project;
pub mod resolver;
pub mod ui;
