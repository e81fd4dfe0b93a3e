//! ZScript source parser
//!
//! This module turns source text into a syntax tree plus a list of semantic
//! tokens:
//! - [`lexer`]: Tokenization (source text → lossless tokens)
//! - [`stream`]: Token cursor with balanced-bracket consumption
//! - [`ast`]: Node arena, expressions and compound types
//! - [`parse`]: The [`Parser`](parse::Parser) and per-file [`ParsedFile`](parse::ParsedFile)
//! - [`semantic`]: Semantic tokens for highlighting and tooltips
//! - [`system_types`]: Builtin type catalog
//! - [`evaluate`]: Constant folding of expressions
//!
//! # Supported language
//!
//! - Top level: `version`, `#include`, classes, `extend class`, structs,
//!   enums and constants
//! - Members: fields, method signatures, properties, nested types;
//!   `default`, `states`, `flagdef` and `mixin` are skipped
//! - Statements: locals, `let`, `if`, `for`, `while`, `do`, `return`,
//!   `break`, `continue`, expression statements
//! - No `switch`, no state labels, no error recovery inside a construct
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent for declarations and statements, a
//! two-phase collect-and-reduce parser for expressions.

pub mod ast;
mod declarations;
pub mod evaluate;
mod expressions;
mod fields;
pub mod lexer;
pub mod parse;
pub mod semantic;
mod statements;
pub mod stream;
pub mod system_types;

use ast::{Expression, FileId};
use lexer::{Lexer, Token};
use parse::{ParseError, ParsedFile, Parser};
use stream::{TokenSet, TokenStream};
use system_types::SystemTypes;

/// Parse a standalone expression, with no surrounding declarations.
pub fn parse_expression(source: &str, system: &SystemTypes) -> Result<Expression, ParseError> {
    let tokens: Vec<Token> = Lexer::new(source)
        .tokenize()
        .into_iter()
        .filter(|t| !t.is_trivia())
        .collect();
    let index = crate::resolver::TypeIndex::default();
    let universe = crate::resolver::Universe::detached(&index, system);
    let mut file = ParsedFile::empty(FileId::default(), Vec::new());
    let parser = Parser::new(&mut file, &universe);

    let mut stream = TokenStream::new(&tokens);
    let expr = parser.parse_expression(&mut stream, TokenSet::EMPTY)?;
    match stream.peek() {
        Some(token) => Err(Parser::unexpected_token(token, "end of expression")),
        None => Ok(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Operator;

    #[test]
    fn test_parse_standalone_expression() {
        let system = SystemTypes::new();
        let expr = parse_expression("a = b + 1", &system).expect("Parsing failed");
        assert_eq!(expr.op, Operator::Assign);
        assert!(parse_expression("a +", &system).is_err());
        assert!(parse_expression("", &system).is_err());
    }
}
