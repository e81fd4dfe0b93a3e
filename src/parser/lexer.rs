//! Lexer (tokenizer) for ZScript source
//!
//! Converts raw source text into a flat, lossless [`Token`] stream. Whitespace,
//! newlines and comments are real tokens, so concatenating the `text` of every
//! token reproduces the input exactly. The parser filters the trivia out
//! before it starts, the highlighter keeps the comments.
//!
//! # Classification order
//!
//! At every position the first matching rule wins:
//!
//! 1. whitespace run (newline excluded, it is a named token)
//! 2. identifier `[A-Za-z_][A-Za-z0-9_]*`
//! 3. numeric literal
//! 4. string `"..."`, name `'...'`, line comment, block comment
//! 5. longest fixed punctuation from [`PUNCTUATION`]
//! 6. a single invalid character
//!
//! The lexer never fails. Malformed input becomes an [`TokenKind::Invalid`]
//! token or a token with `valid == false`, and scanning always advances.

use std::fmt;

/// Token categories produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    Invalid,
    Whitespace,
    Newline,
    Identifier,
    Integer,
    Double,
    String,
    Name,
    LineComment,
    BlockComment,

    // Punctuation
    Preprocessor,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    Dot,
    Comma,
    Semicolon,
    Colon,
    DoubleColon,
    Questionmark,
    Ellipsis,
    Concat,
    Arrow,

    // Operators
    Equals,
    SomewhatEquals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Spaceship,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    RightShiftUnsigned,
    Negate,
    Xor,
    BitAnd,
    BitOr,
    LogicalNot,
    LogicalAnd,
    LogicalOr,
    Assign,
    Increment,
    Decrement,
}

/// Fixed punctuation, longest literals first so the first hit is the longest match.
pub const PUNCTUATION: &[(&str, TokenKind)] = &[
    (">>>", TokenKind::RightShiftUnsigned),
    ("...", TokenKind::Ellipsis),
    ("<>=", TokenKind::Spaceship),
    ("<=>", TokenKind::Spaceship),
    ("~==", TokenKind::SomewhatEquals),
    ("==", TokenKind::Equals),
    ("!=", TokenKind::NotEquals),
    ("<=", TokenKind::LessOrEqual),
    (">=", TokenKind::GreaterOrEqual),
    ("<<", TokenKind::LeftShift),
    (">>", TokenKind::RightShift),
    ("&&", TokenKind::LogicalAnd),
    ("||", TokenKind::LogicalOr),
    ("++", TokenKind::Increment),
    ("--", TokenKind::Decrement),
    ("..", TokenKind::Concat),
    ("::", TokenKind::DoubleColon),
    ("->", TokenKind::Arrow),
    ("\n", TokenKind::Newline),
    ("#", TokenKind::Preprocessor),
    ("{", TokenKind::OpenCurly),
    ("}", TokenKind::CloseCurly),
    ("(", TokenKind::OpenParen),
    (")", TokenKind::CloseParen),
    ("[", TokenKind::OpenSquare),
    ("]", TokenKind::CloseSquare),
    (".", TokenKind::Dot),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
    ("?", TokenKind::Questionmark),
    ("<", TokenKind::LessThan),
    (">", TokenKind::GreaterThan),
    ("+", TokenKind::Add),
    ("-", TokenKind::Subtract),
    ("*", TokenKind::Multiply),
    ("/", TokenKind::Divide),
    ("%", TokenKind::Modulo),
    ("~", TokenKind::Negate),
    ("^", TokenKind::Xor),
    ("&", TokenKind::BitAnd),
    ("|", TokenKind::BitOr),
    ("!", TokenKind::LogicalNot),
    ("=", TokenKind::Assign),
];

impl TokenKind {
    /// Whitespace, newlines and comments.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Newline
                | TokenKind::LineComment
                | TokenKind::BlockComment
        )
    }

    fn literal(self) -> Option<&'static str> {
        PUNCTUATION
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(text, _)| *text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Invalid => write!(f, "invalid character"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Integer => write!(f, "integer"),
            TokenKind::Double => write!(f, "number"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Name => write!(f, "name"),
            TokenKind::LineComment | TokenKind::BlockComment => write!(f, "comment"),
            other => match other.literal() {
                Some(text) => write!(f, "'{}'", text),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

/// A classified slice of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text, delimiters included.
    pub text: String,
    pub int_value: i64,
    pub float_value: f64,
    /// Byte range `[start, end)` in the source.
    pub start: usize,
    pub end: usize,
    /// 1-based source line of the first character.
    pub line: usize,
    /// `false` for unterminated strings and names.
    pub valid: bool,
}

impl Token {
    /// Literal content without delimiters: the inside of a string or name,
    /// the body of a comment. Other tokens return their text.
    pub fn content(&self) -> &str {
        let text = self.text.as_str();
        match self.kind {
            TokenKind::String | TokenKind::Name => {
                let inner = &text[1..];
                if self.valid && !inner.is_empty() {
                    &inner[..inner.len() - 1]
                } else {
                    inner
                }
            }
            TokenKind::LineComment => &text[2..],
            TokenKind::BlockComment => {
                let inner = &text[2..];
                inner.strip_suffix("*/").unwrap_or(inner)
            }
            _ => text,
        }
    }

    /// Case-insensitive keyword check against an identifier token.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier => write!(f, "'{}'", self.text),
            TokenKind::Integer | TokenKind::Double | TokenKind::String | TokenKind::Name => {
                write!(f, "{} {}", self.kind, self.text)
            }
            kind => write!(f, "{}", kind),
        }
    }
}

/// Lexer for ZScript source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    offset: usize,
    line: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            offset: 0,
            line: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Vec<Token> {
        self.reset();
        self.collect()
    }

    /// Rewind to the start of the input.
    pub fn reset(&mut self) {
        self.position = 0;
        self.offset = 0;
        self.line = 1;
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn matches_at(&self, literal: &str) -> bool {
        literal
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_ahead(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)))
    }

    /// Get next token
    fn next_token(&mut self) -> Option<Token> {
        if self.is_at_end() {
            return None;
        }

        let start = Checkpoint {
            position: self.position,
            offset: self.offset,
            line: self.line,
        };

        let kind = if self.read_whitespace() {
            TokenKind::Whitespace
        } else if self.read_identifier() {
            TokenKind::Identifier
        } else if let Some(token) = self.read_number(&start) {
            return Some(token);
        } else if let Some(token) = self.read_quoted(&start) {
            return Some(token);
        } else if let Some(kind) = self.read_comment() {
            kind
        } else if let Some(kind) = self.read_punctuation() {
            kind
        } else {
            self.advance();
            TokenKind::Invalid
        };

        Some(self.finish(&start, kind))
    }

    fn finish(&self, start: &Checkpoint, kind: TokenKind) -> Token {
        Token {
            kind,
            text: self.input[start.position..self.position].iter().collect(),
            int_value: 0,
            float_value: 0.0,
            start: start.offset,
            end: self.offset,
            line: start.line,
            valid: true,
        }
    }

    fn read_whitespace(&mut self) -> bool {
        let mut any = false;
        while let Some(c) = self.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.advance();
            any = true;
        }
        any
    }

    fn read_identifier(&mut self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            self.advance();
        }
        true
    }

    fn read_number(&mut self, start: &Checkpoint) -> Option<Token> {
        let first = self.peek()?;
        let mut is_float = false;
        let mut is_hex = false;
        let mut is_octal = false;
        let mut has_exponent = false;

        if first == '.' {
            if !self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                return None;
            }
            is_float = true;
            self.advance();
        } else if !first.is_ascii_digit() {
            return None;
        } else if first == '0'
            && matches!(self.peek_ahead(1), Some('x') | Some('X'))
            && self.peek_ahead(2).is_some_and(|c| c.is_ascii_hexdigit())
        {
            is_hex = true;
            self.advance();
            self.advance();
        } else if first == '0' {
            is_octal = true;
        }

        let mut dot_allowed = !is_float && !is_hex;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                if c >= '8' {
                    is_octal = false;
                }
                self.advance();
            } else if is_hex && c.is_ascii_hexdigit() {
                self.advance();
            } else if !is_hex && !has_exponent && (c == 'e' || c == 'E') {
                let digit_at = match self.peek_ahead(1) {
                    Some('+') | Some('-') => 2,
                    _ => 1,
                };
                if !self.peek_ahead(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                    break;
                }
                for _ in 0..digit_at {
                    self.advance();
                }
                has_exponent = true;
                is_float = true;
                dot_allowed = false;
            } else if c == '.' && dot_allowed && self.peek_ahead(1) != Some('.') {
                dot_allowed = false;
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }

        let mut token = self.finish(start, TokenKind::Integer);
        let text = token.text.as_str();
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => {
                    token.kind = TokenKind::Double;
                    token.float_value = value;
                    token.int_value = value as i64;
                }
                Err(_) => token.kind = TokenKind::Invalid,
            }
        } else {
            let parsed = if is_hex {
                i64::from_str_radix(&text[2..], 16)
            } else if is_octal && text.len() > 1 {
                i64::from_str_radix(&text[1..], 8)
            } else {
                text.parse::<i64>()
            };
            match parsed {
                Ok(value) => {
                    token.int_value = value;
                    token.float_value = value as f64;
                }
                Err(_) => token.kind = TokenKind::Invalid,
            }
        }
        Some(token)
    }

    fn read_quoted(&mut self, start: &Checkpoint) -> Option<Token> {
        let quote = self.peek()?;
        let kind = match quote {
            '"' => TokenKind::String,
            '\'' => TokenKind::Name,
            _ => return None,
        };
        self.advance();

        let mut terminated = false;
        while let Some(c) = self.advance() {
            if c == '\\' {
                self.advance();
            } else if c == quote {
                terminated = true;
                break;
            }
        }

        let mut token = self.finish(start, kind);
        token.valid = terminated;
        Some(token)
    }

    fn read_comment(&mut self) -> Option<TokenKind> {
        if self.matches_at("//") {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
            Some(TokenKind::LineComment)
        } else if self.matches_at("/*") {
            self.advance();
            self.advance();
            while !self.is_at_end() {
                if self.matches_at("*/") {
                    self.advance();
                    self.advance();
                    break;
                }
                self.advance();
            }
            Some(TokenKind::BlockComment)
        } else {
            None
        }
    }

    fn read_punctuation(&mut self) -> Option<TokenKind> {
        let (literal, kind) = PUNCTUATION
            .iter()
            .find(|(literal, _)| self.matches_at(literal))?;
        for _ in literal.chars() {
            self.advance();
        }
        Some(*kind)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

struct Checkpoint {
    position: usize,
    offset: usize,
    line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lossless() {
        let source = "class Foo : Bar {\n\tint x; // hi\n\t/* block */ \"str\\\"\" 'nm' 0x1F\n}";
        let tokens = Lexer::new(source).tokenize();
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn test_identifiers_and_whitespace() {
        assert_eq!(
            kinds("class  Foo\n"),
            vec![
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Newline
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 0x1f 017 09 1.5 .25 3e2 2E-1").tokenize();
        let numbers: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();

        assert_eq!(numbers[0].kind, TokenKind::Integer);
        assert_eq!(numbers[0].int_value, 42);
        assert_eq!(numbers[1].int_value, 31);
        assert_eq!(numbers[2].int_value, 15);
        assert_eq!(numbers[3].int_value, 9);
        assert_eq!(numbers[4].kind, TokenKind::Double);
        assert_eq!(numbers[4].float_value, 1.5);
        assert_eq!(numbers[5].float_value, 0.25);
        assert_eq!(numbers[6].kind, TokenKind::Double);
        assert_eq!(numbers[6].float_value, 300.0);
        assert!((numbers[7].float_value - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_integer_keeps_float_value() {
        let tokens = Lexer::new("7").tokenize();
        assert_eq!(tokens[0].int_value, 7);
        assert_eq!(tokens[0].float_value, 7.0);
    }

    #[test]
    fn test_overflow_is_invalid() {
        let tokens = Lexer::new("99999999999999999999999").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
    }

    #[test]
    fn test_dot_forms() {
        assert_eq!(kinds("a.b"), vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]);
        assert_eq!(kinds("a..b"), vec![TokenKind::Identifier, TokenKind::Concat, TokenKind::Identifier]);
        assert_eq!(kinds("..."), vec![TokenKind::Ellipsis]);
        assert_eq!(kinds("1..2"), vec![TokenKind::Integer, TokenKind::Concat, TokenKind::Integer]);
    }

    #[test]
    fn test_longest_punctuation() {
        assert_eq!(
            kinds(">>>= ~== <>= ++"),
            vec![
                TokenKind::RightShiftUnsigned,
                TokenKind::Assign,
                TokenKind::Whitespace,
                TokenKind::SomewhatEquals,
                TokenKind::Whitespace,
                TokenKind::Spaceship,
                TokenKind::Whitespace,
                TokenKind::Increment
            ]
        );
    }

    #[test]
    fn test_strings_and_names() {
        let tokens = Lexer::new(r#""a\"b" 'Actor'"#).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].content(), r#"a\"b"#);
        assert!(tokens[0].valid);
        assert_eq!(tokens[2].kind, TokenKind::Name);
        assert_eq!(tokens[2].content(), "Actor");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("\"abc").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert!(!tokens[0].valid);
        assert_eq!(tokens[0].text, "\"abc");
        assert_eq!(tokens[0].content(), "abc");
    }

    #[test]
    fn test_comments() {
        let tokens = Lexer::new("// line\n/* block */x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::LineComment);
        assert_eq!(tokens[0].text, "// line");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].kind, TokenKind::BlockComment);
        assert_eq!(tokens[2].content(), " block ");
        assert_eq!(tokens[3].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_unterminated_block_comment_stays_valid() {
        let tokens = Lexer::new("/* open").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::BlockComment);
        assert!(tokens[0].valid);
    }

    #[test]
    fn test_invalid_character_advances_by_one() {
        let tokens = Lexer::new("@$").tokenize();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Invalid));
    }

    #[test]
    fn test_byte_ranges_and_lines() {
        let source = "é\nab";
        let tokens = Lexer::new(source).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 2));
        assert_eq!(tokens[2].start, 3);
        assert_eq!(tokens[2].line, 2);
        assert_eq!(&source[tokens[2].start..tokens[2].end], "ab");
    }
}
