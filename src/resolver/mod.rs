//! Name resolution and semantic tagging
//!
//! - [`universe`]: the project-wide [`TypeIndex`] and the read-only
//!   [`Universe`] snapshot handed to each phase
//! - `lookup`: type and symbol lookup (`impl Parser`)
//! - `link`: phase 3, class links and the TypeName re-walk
//! - `highlight`: semantic tokens and result types for expressions
//!
//! Resolution never fails a parse. An unknown name leaves the reference
//! empty, marks the token [`Invalid`](crate::parser::semantic::SemanticKind::Invalid)
//! and adds a warning.

mod highlight;
mod link;
mod lookup;
pub mod universe;

pub(crate) use highlight::Scope;
pub use universe::{ClassEntry, TypeIndex, Universe};
