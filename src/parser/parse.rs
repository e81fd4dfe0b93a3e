//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct, the per-file [`ParsedFile`]
//! result and the error and diagnostic types shared by every parsing phase.
//!
//! # Parser Architecture
//!
//! One file goes through four phases, each a method on [`ParsedFile`]:
//!
//! 1. [`ParsedFile::parse`]: tokenize and build the declaration skeleton
//!    (`declarations`). Class and struct bodies are kept as raw tokens.
//! 2. [`ParsedFile::parse_fields`]: fields, method signatures and nested
//!    types (`fields`), once every top-level type name is known.
//! 3. [`ParsedFile::set_type_information`]: class links and type name
//!    re-resolution (`crate::resolver::link`).
//! 4. [`ParsedFile::parse_bodies`]: method bodies (`statements`), with every
//!    expression (`expressions`) highlighted on the spot.
//!
//! Phases 2 to 4 read the rest of the project through a
//! [`Universe`](crate::resolver::Universe) snapshot.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::semantic::{SemanticKind, SemanticToken};
use crate::parser::stream::{TokenSet, TokenStream};
use crate::resolver::Universe;
use std::fmt;

/// Parser error type
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}): {}", self.severity, self.line, self.message)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: err.message,
            line: err.line,
        }
    }
}

/// Everything the pipeline knows about one file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub id: FileId,
    /// Full lossless token stream.
    pub tokens: Vec<Token>,
    pub tree: SyntaxTree,
    pub semantic: Vec<SemanticToken>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when a declaration-level error aborted the file.
    pub failed: bool,
}

impl ParsedFile {
    pub(crate) fn empty(id: FileId, tokens: Vec<Token>) -> Self {
        Self {
            id,
            tokens,
            tree: SyntaxTree::new(),
            semantic: Vec::new(),
            diagnostics: Vec::new(),
            failed: false,
        }
    }

    /// Handles to this file's top-level declarations, for other files' universes.
    pub fn top_level(&self) -> Vec<DeclRef> {
        self.tree
            .declarations()
            .map(|node| DeclRef::new(self.id, node))
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// First top-level declaration with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.tree
            .declarations()
            .find(|id| self.tree[*id].is_named(name))
    }
}

/// Arena, semantic token and diagnostic lengths, for rolling back a failed construct.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mark {
    nodes: usize,
    semantic: usize,
    diagnostics: usize,
}

/// Recursive descent parser working on one file
pub struct Parser<'a> {
    pub(crate) file: &'a mut ParsedFile,
    pub(crate) universe: &'a Universe<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a mut ParsedFile, universe: &'a Universe<'a>) -> Self {
        Self { file, universe }
    }

    // ===== Tree access =====

    pub(crate) fn tree(&self) -> &SyntaxTree {
        &self.file.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut SyntaxTree {
        &mut self.file.tree
    }

    pub(crate) fn here(&self, node: NodeId) -> DeclRef {
        DeclRef::new(self.file.id, node)
    }

    /// Node behind a handle, in this file or elsewhere in the universe.
    pub(crate) fn node(&self, decl: DeclRef) -> Option<&Node> {
        if decl.file == self.file.id {
            self.file.tree.get(decl.node)
        } else {
            self.universe.node(decl)
        }
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark {
            nodes: self.file.tree.len(),
            semantic: self.file.semantic.len(),
            diagnostics: self.file.diagnostics.len(),
        }
    }

    /// Undo everything since `mark`, semantic tokens and diagnostics included.
    pub(crate) fn rollback(&mut self, mark: Mark) {
        self.file.tree.truncate(mark.nodes);
        self.file.semantic.truncate(mark.semantic);
        self.file.diagnostics.truncate(mark.diagnostics);
    }

    /// Drop nodes created since `mark` but keep the highlighting, minus any
    /// reference into the dropped nodes.
    pub(crate) fn discard_nodes(&mut self, mark: Mark) {
        let file = self.file.id;
        self.file.tree.truncate(mark.nodes);
        for token in &mut self.file.semantic[mark.semantic..] {
            if let Some(Target::Decl(decl)) = token.reference {
                if decl.file == file && decl.node >= mark.nodes {
                    token.reference = None;
                }
            }
        }
    }

    // ===== Semantic tokens =====

    pub(crate) fn emit(&mut self, token: &Token, kind: SemanticKind) {
        self.file.semantic.push(SemanticToken::new(token, kind));
    }

    pub(crate) fn emit_all(&mut self, tokens: &[Token], kind: SemanticKind) {
        for token in tokens {
            self.emit(token, kind);
        }
    }

    pub(crate) fn emit_ref(
        &mut self,
        token: &Token,
        kind: SemanticKind,
        reference: Option<Target>,
        name: impl Into<String>,
    ) {
        self.file.semantic.push(
            SemanticToken::new(token, kind)
                .with_reference(reference)
                .with_name(name),
        );
    }

    // ===== Diagnostics =====

    pub(crate) fn report(&mut self, err: ParseError) {
        log::debug!("file {}: {}", self.file.id.0, err);
        self.file.diagnostics.push(err.into());
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, line: usize) {
        let message = message.into();
        log::warn!("file {} line {}: {}", self.file.id.0, line, message);
        self.file.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            line,
        });
    }

    /// Record an error that aborts the rest of the file.
    pub(crate) fn fail(&mut self, err: ParseError) {
        self.report(err);
        self.file.failed = true;
    }

    // ===== Token helpers =====

    pub(crate) fn unexpected(stream: &TokenStream, expected: &str) -> ParseError {
        match stream.peek() {
            Some(token) => ParseError::new(
                format!("unexpected {}, expected {}", token, expected),
                token.line,
            ),
            None => ParseError::new(
                format!("unexpected end of input, expected {}", expected),
                stream.last_line(),
            ),
        }
    }

    pub(crate) fn unexpected_token(token: &Token, expected: &str) -> ParseError {
        ParseError::new(
            format!("unexpected {}, expected {}", token, expected),
            token.line,
        )
    }

    pub(crate) fn expect<'t>(
        stream: &mut TokenStream<'t>,
        kinds: impl Into<TokenSet>,
        expected: &str,
    ) -> Result<&'t Token, ParseError> {
        match stream.expect(kinds) {
            Some(token) => Ok(token),
            None => Err(Self::unexpected(stream, expected)),
        }
    }

    pub(crate) fn expect_identifier<'t>(
        stream: &mut TokenStream<'t>,
        what: &str,
    ) -> Result<&'t Token, ParseError> {
        Self::expect(stream, TokenKind::Identifier, what)
    }

    /// Read `{ ... }` and return the tokens between the braces.
    pub(crate) fn expect_braced_body(
        &mut self,
        stream: &mut TokenStream,
        what: &str,
    ) -> Result<Vec<Token>, ParseError> {
        let open = Self::expect(stream, TokenKind::OpenCurly, &format!("'{{' {}", what))?;
        self.emit(open, SemanticKind::SpecialToken);
        let body = stream.consume_balanced(TokenSet::EMPTY);
        let close = Self::expect(stream, TokenKind::CloseCurly, &format!("'}}' closing {}", what))?;
        self.emit(close, SemanticKind::SpecialToken);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::new("unexpected ';'", 4);
        assert_eq!(err.to_string(), "Parse error at line 4: unexpected ';'");
        let diag: Diagnostic = err.into();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.to_string(), "error (line 4): unexpected ';'");
    }
}
