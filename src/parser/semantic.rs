//! Semantic tokens: the highlighting side channel
//!
//! The parser emits one [`SemanticToken`] per classified source range. Later
//! entries win when ranges coincide, which is how an already emitted type
//! name is re-marked as [`SemanticKind::Invalid`].

use super::ast::Target;
use super::lexer::Token;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticKind {
    Comment,
    Preprocessor,
    Keyword,
    TypeName,
    ConstantName,
    Number,
    String,
    Field,
    Local,
    Method,
    Argument,
    Operator,
    SpecialToken,
    Invalid,
}

impl fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SemanticKind::Comment => "comment",
            SemanticKind::Preprocessor => "preprocessor",
            SemanticKind::Keyword => "keyword",
            SemanticKind::TypeName => "type",
            SemanticKind::ConstantName => "constant",
            SemanticKind::Number => "number",
            SemanticKind::String => "string",
            SemanticKind::Field => "field",
            SemanticKind::Local => "local",
            SemanticKind::Method => "method",
            SemanticKind::Argument => "argument",
            SemanticKind::Operator => "operator",
            SemanticKind::SpecialToken => "punctuation",
            SemanticKind::Invalid => "unresolved",
        };
        f.write_str(text)
    }
}

/// A classified byte range
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticToken {
    pub start: usize,
    pub end: usize,
    pub kind: SemanticKind,
    pub reference: Option<Target>,
    /// Dotted name used for tooltips.
    pub qualified_name: Option<String>,
}

impl SemanticToken {
    pub fn new(token: &Token, kind: SemanticKind) -> Self {
        Self {
            start: token.start,
            end: token.end,
            kind,
            reference: None,
            qualified_name: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<Target>) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.qualified_name = Some(name.into());
        self
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Tooltip text for presentation layers.
    pub fn tooltip(&self) -> String {
        match (&self.qualified_name, self.kind) {
            (Some(name), SemanticKind::Invalid) => format!("unresolved: {}", name),
            (Some(name), kind) => format!("{} {}", kind, name),
            (None, kind) => kind.to_string(),
        }
    }
}

/// Last token covering `offset`; later entries override earlier ones.
pub fn token_at(tokens: &[SemanticToken], offset: usize) -> Option<&SemanticToken> {
    tokens.iter().rev().find(|t| t.contains(offset))
}
