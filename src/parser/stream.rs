//! Backtrackable cursor over a token slice
//!
//! [`TokenStream`] borrows a slice of significant tokens and keeps an integer
//! position that callers save and restore for unbounded lookahead. Nested
//! constructs (call arguments, subscripts, deferred bodies) are cut out with
//! [`TokenStream::consume_balanced`] and parsed through a fresh stream over
//! the collected tokens.

use super::lexer::{Token, TokenKind};
use std::ops::BitOr;

/// A set of [`TokenKind`]s, used for `expect` and stop conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);

    pub const fn of(kind: TokenKind) -> TokenSet {
        TokenSet(1u64 << kind as u8)
    }

    pub const fn with(self, kind: TokenKind) -> TokenSet {
        TokenSet(self.0 | (1u64 << kind as u8))
    }

    pub fn contains(self, kind: TokenKind) -> bool {
        self.0 & (1u64 << kind as u8) != 0
    }
}

impl From<TokenKind> for TokenSet {
    fn from(kind: TokenKind) -> Self {
        TokenSet::of(kind)
    }
}

impl BitOr for TokenSet {
    type Output = TokenSet;

    fn bitor(self, rhs: TokenSet) -> TokenSet {
        TokenSet(self.0 | rhs.0)
    }
}

impl BitOr<TokenKind> for TokenSet {
    type Output = TokenSet;

    fn bitor(self, rhs: TokenKind) -> TokenSet {
        self.with(rhs)
    }
}

impl BitOr for TokenKind {
    type Output = TokenSet;

    fn bitor(self, rhs: TokenKind) -> TokenSet {
        TokenSet::of(self).with(rhs)
    }
}

/// Cursor over a borrowed token slice
pub struct TokenStream<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> TokenStream<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.tokens.len());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    pub fn peek_ahead(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.position + n)
    }

    pub fn read(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Step back `n` tokens.
    pub fn rewind(&mut self, n: usize) {
        self.position = self.position.saturating_sub(n);
    }

    /// Read the next token only if its kind is in `kinds`.
    pub fn expect(&mut self, kinds: impl Into<TokenSet>) -> Option<&'t Token> {
        let token = self.peek()?;
        if kinds.into().contains(token.kind) {
            self.position += 1;
            Some(token)
        } else {
            None
        }
    }

    /// Read the next token only if it is the given identifier (case-insensitive).
    pub fn expect_keyword(&mut self, keyword: &str) -> Option<&'t Token> {
        let token = self.peek()?;
        if token.is_keyword(keyword) {
            self.position += 1;
            Some(token)
        } else {
            None
        }
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    /// The last token, for end-of-input error lines.
    pub fn last_line(&self) -> usize {
        self.tokens
            .get(self.position.min(self.tokens.len()).saturating_sub(1))
            .map_or(1, |t| t.line)
    }

    /// Collect tokens up to the first member of `stop` at bracket depth zero.
    ///
    /// `(){}[]` nesting is tracked on a stack. The stop token is not consumed.
    /// A closer met with an empty stack ends the run early and is left unread.
    /// A closer that does not match the innermost opener is kept as a plain
    /// token.
    pub fn consume_balanced(&mut self, stop: impl Into<TokenSet>) -> Vec<Token> {
        let stop = stop.into();
        let mut stack: Vec<TokenKind> = Vec::new();
        let mut collected = Vec::new();

        while let Some(token) = self.read() {
            if stack.is_empty() && stop.contains(token.kind) {
                self.rewind(1);
                break;
            }

            match token.kind {
                TokenKind::OpenParen | TokenKind::OpenCurly | TokenKind::OpenSquare => {
                    stack.push(token.kind);
                }
                TokenKind::CloseParen | TokenKind::CloseCurly | TokenKind::CloseSquare => {
                    let opener = match token.kind {
                        TokenKind::CloseParen => TokenKind::OpenParen,
                        TokenKind::CloseCurly => TokenKind::OpenCurly,
                        _ => TokenKind::OpenSquare,
                    };
                    match stack.last() {
                        None => {
                            self.rewind(1);
                            break;
                        }
                        Some(top) if *top == opener => {
                            stack.pop();
                        }
                        Some(_) => {}
                    }
                }
                _ => {}
            }

            collected.push(token.clone());
        }

        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;

    fn significant(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .collect()
    }

    #[test]
    fn test_token_set() {
        let set = TokenKind::Comma | TokenKind::Semicolon;
        assert!(set.contains(TokenKind::Comma));
        assert!(set.contains(TokenKind::Semicolon));
        assert!(!set.contains(TokenKind::Colon));
        assert!(!TokenSet::EMPTY.contains(TokenKind::Invalid));
        assert!((set | TokenKind::Increment).contains(TokenKind::Increment));
    }

    #[test]
    fn test_expect_leaves_position_on_mismatch() {
        let tokens = significant("a ;");
        let mut stream = TokenStream::new(&tokens);
        assert!(stream.expect(TokenKind::Semicolon).is_none());
        assert_eq!(stream.position(), 0);
        assert!(stream.expect(TokenKind::Identifier).is_some());
        assert!(stream.expect(TokenKind::Semicolon).is_some());
        assert!(stream.read().is_none());
    }

    #[test]
    fn test_consume_balanced_stops_at_closer() {
        let tokens = significant("{ a(b[c]) } x ) y");
        let mut stream = TokenStream::new(&tokens);
        let inner = stream.consume_balanced(TokenSet::EMPTY);
        let text: Vec<&str> = inner.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, vec!["{", "a", "(", "b", "[", "c", "]", ")", "}", "x"]);
        assert!(stream.check(TokenKind::CloseParen));
    }

    #[test]
    fn test_consume_balanced_respects_depth_for_stop() {
        let tokens = significant("f(a, b), c");
        let mut stream = TokenStream::new(&tokens);
        let first = stream.consume_balanced(TokenKind::Comma);
        assert_eq!(first.len(), 6);
        assert!(stream.check(TokenKind::Comma));
    }

    #[test]
    fn test_mismatched_closer_is_kept() {
        let tokens = significant("( ] ) ;");
        let mut stream = TokenStream::new(&tokens);
        let run = stream.consume_balanced(TokenKind::Semicolon);
        assert_eq!(run.len(), 3);
        assert!(stream.check(TokenKind::Semicolon));
    }
}
