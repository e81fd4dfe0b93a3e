//! Declaration parsing implementation
//!
//! Phase 1 builds the top-level skeleton of a file:
//!
//! - `version "x.y"` as the very first item
//! - `#include "path"`
//! - Class definitions and `extend class`
//! - Struct definitions
//! - Enums and constants
//!
//! Class and struct bodies are not parsed here. Their tokens are stored on
//! the node and handled by phase 2 once every type name is known.
//!
//! # Grammar
//!
//! ```text
//! root      ::= ["version" string] item*
//! item      ::= "#" "include" string | class | struct | enum | const | ";"
//! class     ::= ["extend"] "class" ident [":" ident] ["replaces" ident] flag* "{" body "}"
//! struct    ::= "struct" ident flag* "{" body "}"
//! enum      ::= "enum" ident [":" type] "{" (ident ["=" expr]),* [","] "}"
//! const     ::= "const" ident "=" expr ";"
//! flag      ::= ident | ("version" | "deprecated") "(" string ")"
//! ```
//!
//! A syntax error at this level aborts the whole file.

use crate::parser::ast::*;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use crate::parser::parse::{ParseError, ParsedFile, Parser};
use crate::parser::semantic::{SemanticKind, SemanticToken};
use crate::parser::stream::TokenStream;
use crate::parser::system_types::SystemTypes;
use crate::resolver::{TypeIndex, Universe};

/// Keywords accepted between a class or struct header and its body
const TYPE_FLAGS: &[&str] = &[
    "abstract",
    "clearscope",
    "deprecated",
    "final",
    "native",
    "play",
    "ui",
    "version",
];

/// Flags, `version(...)` and `deprecated(...)` of a declaration
#[derive(Debug, Default)]
pub(crate) struct DeclFlags {
    pub flags: Vec<String>,
    pub version: Option<String>,
    pub deprecated: Option<String>,
}

impl ParsedFile {
    /// Phase 1: tokenize `source` and build the declaration skeleton.
    pub fn parse(id: FileId, source: &str, system: &SystemTypes) -> ParsedFile {
        let tokens = Lexer::new(source).tokenize();
        let significant: Vec<Token> = tokens.iter().filter(|t| !t.is_trivia()).cloned().collect();
        let mut file = ParsedFile::empty(id, tokens);

        for token in &file.tokens {
            if matches!(token.kind, TokenKind::LineComment | TokenKind::BlockComment) {
                file.semantic.push(SemanticToken::new(token, SemanticKind::Comment));
            }
        }

        let index = TypeIndex::default();
        let universe = Universe::detached(&index, system);
        {
            let mut parser = Parser::new(&mut file, &universe);
            let mut stream = TokenStream::new(&significant);
            if let Err(err) = parser.parse_root(&mut stream) {
                parser.fail(err);
            }
        }

        file.mark_anomalies();
        log::debug!(
            "file {}: {} tokens, {} declarations",
            id.0,
            file.tokens.len(),
            file.tree.declarations().count()
        );
        file
    }

    /// Overlay every invalid or unterminated token.
    fn mark_anomalies(&mut self) {
        for token in &self.tokens {
            if token.kind == TokenKind::Invalid || !token.valid {
                self.semantic
                    .push(SemanticToken::new(token, SemanticKind::Invalid).with_name(token.text.clone()));
            }
        }
    }
}

impl<'a> Parser<'a> {
    /// Parse top-level items until the end of input.
    pub(crate) fn parse_root(&mut self, stream: &mut TokenStream) -> Result<(), ParseError> {
        let mut first = true;

        while let Some(token) = stream.read() {
            let leading = std::mem::replace(&mut first, false);

            match token.kind {
                TokenKind::Semicolon => self.emit(token, SemanticKind::SpecialToken),
                TokenKind::Preprocessor => self.parse_directive(stream, token)?,
                TokenKind::Identifier if leading && token.is_keyword("version") => {
                    let value = stream
                        .peek()
                        .filter(|t| t.kind == TokenKind::String && t.line == token.line)
                        .ok_or_else(|| Self::unexpected(stream, "version string"))?;
                    stream.read();
                    self.emit(token, SemanticKind::Keyword);
                    self.emit(value, SemanticKind::String);
                    if let NodeKind::FileRoot(root) = &mut self.tree_mut()[SyntaxTree::ROOT].kind {
                        root.version = Some(value.content().to_string());
                    }
                }
                TokenKind::Identifier if token.is_keyword("class") => {
                    self.parse_class(stream, token, None)?;
                }
                TokenKind::Identifier if token.is_keyword("extend") => {
                    let class = stream
                        .expect_keyword("class")
                        .ok_or_else(|| Self::unexpected(stream, "'class' after 'extend'"))?;
                    self.parse_class(stream, class, Some(token))?;
                }
                TokenKind::Identifier if token.is_keyword("struct") => {
                    self.parse_struct(stream, token, SyntaxTree::ROOT)?;
                }
                TokenKind::Identifier if token.is_keyword("enum") => {
                    self.parse_enum(stream, token, SyntaxTree::ROOT)?;
                }
                TokenKind::Identifier if token.is_keyword("const") => {
                    self.parse_constant(stream, token, SyntaxTree::ROOT)?;
                }
                _ => return Err(Self::unexpected_token(token, "top-level declaration")),
            }
        }

        Ok(())
    }

    /// `#include "path"`, all on one line.
    fn parse_directive(&mut self, stream: &mut TokenStream, hash: &Token) -> Result<(), ParseError> {
        let directive = stream
            .peek()
            .filter(|t| t.kind == TokenKind::Identifier && t.line == hash.line)
            .ok_or_else(|| ParseError::new("expected preprocessor directive after '#'", hash.line))?;
        stream.read();

        if !directive.is_keyword("include") {
            return Err(ParseError::new(
                format!("unsupported preprocessor directive '{}'", directive.text),
                directive.line,
            ));
        }

        let path = stream
            .peek()
            .filter(|t| t.kind == TokenKind::String && t.line == hash.line)
            .ok_or_else(|| ParseError::new("expected file name after #include", directive.line))?;
        stream.read();

        self.emit(hash, SemanticKind::Preprocessor);
        self.emit(directive, SemanticKind::Preprocessor);
        self.emit(path, SemanticKind::String);

        let include = Include {
            location: path.content().to_string(),
            reference: None,
        };
        self.tree_mut()
            .add(SyntaxTree::ROOT, path.content(), hash.line, NodeKind::Include(include));
        Ok(())
    }

    /// `class Name [: Parent] [replaces Other] flags { body }`
    ///
    /// `keyword` is the `class` token, `extend` the optional `extend` before it.
    fn parse_class(
        &mut self,
        stream: &mut TokenStream,
        keyword: &Token,
        extend: Option<&Token>,
    ) -> Result<NodeId, ParseError> {
        if let Some(extend) = extend {
            self.emit(extend, SemanticKind::Keyword);
        }
        self.emit(keyword, SemanticKind::Keyword);

        let name = Self::expect_identifier(stream, "class name")?;
        let mut class = ClassDecl::default();
        if extend.is_some() {
            class.extend_name = Some(name.text.clone());
        }

        if let Some(colon) = stream.expect(TokenKind::Colon) {
            self.emit(colon, SemanticKind::SpecialToken);
            let parent = Self::expect_identifier(stream, "parent class name")?;
            self.emit_ref(parent, SemanticKind::TypeName, None, parent.text.clone());
            class.parent_name = Some(parent.text.clone());
        }

        if let Some(replaces) = stream.expect_keyword("replaces") {
            self.emit(replaces, SemanticKind::Keyword);
            let replaced = Self::expect_identifier(stream, "replaced class name")?;
            self.emit_ref(replaced, SemanticKind::TypeName, None, replaced.text.clone());
            class.replace_name = Some(replaced.text.clone());
        }

        let flags = self.parse_type_flags(stream)?;
        let body = self.expect_braced_body(stream, "class body")?;
        class.decl = TypeDecl {
            flags: flags.flags,
            version: flags.version,
            deprecated: flags.deprecated,
            body,
            self_var: None,
        };

        let is_extension = class.extend_name.is_some();
        let id = self
            .tree_mut()
            .add(SyntaxTree::ROOT, name.text.clone(), name.line, NodeKind::Class(class));
        if is_extension {
            // resolved to the extended class when type names are re-walked
            self.emit_ref(name, SemanticKind::TypeName, None, name.text.clone());
        } else {
            self.emit_ref(name, SemanticKind::TypeName, Some(Target::Decl(self.here(id))), name.text.clone());
        }
        Ok(id)
    }

    /// `struct Name flags { body }`, at top level or nested in `parent`.
    pub(crate) fn parse_struct(
        &mut self,
        stream: &mut TokenStream,
        keyword: &Token,
        parent: NodeId,
    ) -> Result<NodeId, ParseError> {
        self.emit(keyword, SemanticKind::Keyword);
        let name = Self::expect_identifier(stream, "struct name")?;
        let flags = self.parse_type_flags(stream)?;
        let body = self.expect_braced_body(stream, "struct body")?;

        let decl = TypeDecl {
            flags: flags.flags,
            version: flags.version,
            deprecated: flags.deprecated,
            body,
            self_var: None,
        };
        let id = self
            .tree_mut()
            .add(parent, name.text.clone(), name.line, NodeKind::Struct(decl));
        let qualified = self.full_name(self.here(id));
        self.emit_ref(name, SemanticKind::TypeName, Some(Target::Decl(self.here(id))), qualified);
        Ok(id)
    }

    /// `enum Name [: Base] { A, B = expr, }`
    pub(crate) fn parse_enum(
        &mut self,
        stream: &mut TokenStream,
        keyword: &Token,
        parent: NodeId,
    ) -> Result<NodeId, ParseError> {
        self.emit(keyword, SemanticKind::Keyword);
        let name = Self::expect_identifier(stream, "enum name")?;

        let base = match stream.expect(TokenKind::Colon) {
            Some(colon) => {
                self.emit(colon, SemanticKind::SpecialToken);
                Some(self.parse_compound_type(stream, None)?)
            }
            None => None,
        };

        let open = Self::expect(stream, TokenKind::OpenCurly, "'{' opening enum body")?;
        self.emit(open, SemanticKind::SpecialToken);

        let id = self
            .tree_mut()
            .alloc(Some(parent), name.text.clone(), name.line, NodeKind::Enum(EnumDecl { base }));
        let qualified = self.full_name(self.here(id));
        self.emit_ref(name, SemanticKind::TypeName, Some(Target::Decl(self.here(id))), qualified);

        loop {
            let token = Self::expect(
                stream,
                TokenKind::Identifier | TokenKind::CloseCurly,
                "enum member or '}'",
            )?;
            if token.kind == TokenKind::CloseCurly {
                self.emit(token, SemanticKind::SpecialToken);
                break;
            }

            let member = self.tree_mut().add(
                id,
                token.text.clone(),
                token.line,
                NodeKind::Constant(ConstantDecl::default()),
            );
            let member_name = self.full_name(self.here(member));
            self.emit_ref(token, SemanticKind::ConstantName, Some(Target::Decl(self.here(member))), member_name);

            let mut separator = Self::expect(
                stream,
                TokenKind::Comma | TokenKind::Assign | TokenKind::CloseCurly,
                "',', '=' or '}'",
            )?;
            if separator.kind == TokenKind::Assign {
                self.emit(separator, SemanticKind::Operator);
                let value = self.parse_expression(stream, TokenKind::Comma | TokenKind::CloseCurly)?;
                if let NodeKind::Constant(constant) = &mut self.tree_mut()[member].kind {
                    constant.value = Some(value);
                }
                separator = Self::expect(stream, TokenKind::Comma | TokenKind::CloseCurly, "',' or '}'")?;
            }

            self.emit(separator, SemanticKind::SpecialToken);
            if separator.kind == TokenKind::CloseCurly {
                break;
            }
        }

        self.tree_mut().attach(parent, id);
        Ok(id)
    }

    /// `const Name = expr;`
    pub(crate) fn parse_constant(
        &mut self,
        stream: &mut TokenStream,
        keyword: &Token,
        parent: NodeId,
    ) -> Result<NodeId, ParseError> {
        self.emit(keyword, SemanticKind::Keyword);
        let name = Self::expect_identifier(stream, "constant name")?;
        let assign = Self::expect(stream, TokenKind::Assign, "'=' after constant name")?;
        self.emit(assign, SemanticKind::Operator);
        let value = self.parse_expression(stream, TokenKind::Semicolon)?;
        let semicolon = Self::expect(stream, TokenKind::Semicolon, "';' after constant")?;
        self.emit(semicolon, SemanticKind::SpecialToken);

        let constant = ConstantDecl { value: Some(value) };
        let id = self
            .tree_mut()
            .add(parent, name.text.clone(), name.line, NodeKind::Constant(constant));
        let qualified = self.full_name(self.here(id));
        self.emit_ref(name, SemanticKind::ConstantName, Some(Target::Decl(self.here(id))), qualified);
        Ok(id)
    }

    /// Class and struct flags, up to the opening brace.
    fn parse_type_flags(&mut self, stream: &mut TokenStream) -> Result<DeclFlags, ParseError> {
        let mut flags = DeclFlags::default();
        while let Some(token) = stream.expect(TokenKind::Identifier) {
            if !TYPE_FLAGS.iter().any(|flag| token.is_keyword(flag)) {
                return Err(Self::unexpected_token(token, "type flag or '{'"));
            }
            self.emit(token, SemanticKind::Keyword);
            self.parse_flag(stream, token, &mut flags)?;
        }
        Ok(flags)
    }

    /// Record one already consumed flag keyword.
    pub(crate) fn parse_flag(
        &mut self,
        stream: &mut TokenStream,
        token: &Token,
        flags: &mut DeclFlags,
    ) -> Result<(), ParseError> {
        if token.is_keyword("version") {
            flags.version = Some(self.parse_flag_argument(stream, "version")?);
        } else if token.is_keyword("deprecated") {
            flags.deprecated = Some(self.parse_flag_argument(stream, "deprecated")?);
        } else {
            flags.flags.push(token.text.to_ascii_lowercase());
        }
        Ok(())
    }

    /// `("string")` after `version` or `deprecated`.
    fn parse_flag_argument(&mut self, stream: &mut TokenStream, flag: &str) -> Result<String, ParseError> {
        let expected = format!("{}(\"string\")", flag);
        let open = Self::expect(stream, TokenKind::OpenParen, &expected)?;
        let value = Self::expect(stream, TokenKind::String, &expected)?;
        let close = Self::expect(stream, TokenKind::CloseParen, &expected)?;
        self.emit(open, SemanticKind::SpecialToken);
        self.emit(value, SemanticKind::String);
        self.emit(close, SemanticKind::SpecialToken);
        Ok(value.content().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        ParsedFile::parse(FileId(0), source, &SystemTypes::new())
    }

    fn class(file: &ParsedFile, name: &str) -> ClassDecl {
        let id = file.find(name).unwrap();
        match &file.tree[id].kind {
            NodeKind::Class(class) => class.clone(),
            other => panic!("expected class, got {}", other.name()),
        }
    }

    #[test]
    fn test_parse_class_header() {
        let file = parse("class Imp : Actor replaces DoomImp native version(\"4.1\") { int x; }");
        assert!(!file.failed);
        let imp = class(&file, "imp");
        assert_eq!(imp.parent_name.as_deref(), Some("Actor"));
        assert_eq!(imp.replace_name.as_deref(), Some("DoomImp"));
        assert_eq!(imp.decl.flags, vec!["native".to_string()]);
        assert_eq!(imp.decl.version.as_deref(), Some("4.1"));
        assert_eq!(imp.decl.body.len(), 3);
    }

    #[test]
    fn test_parse_extend_class() {
        let file = parse("extend class Actor { void Foo() {} }");
        let ext = class(&file, "Actor");
        assert_eq!(ext.extend_name.as_deref(), Some("Actor"));
        assert!(ext.parent_name.is_none());
    }

    #[test]
    fn test_parse_version_and_include() {
        let file = parse("version \"4.10\"\n#include \"zscript/actors.zs\"\nstruct S {}");
        assert!(!file.failed);
        assert_eq!(file.tree.version(), Some("4.10"));
        let includes: Vec<&Include> = file
            .tree
            .children(SyntaxTree::ROOT)
            .iter()
            .filter_map(|id| match &file.tree[*id].kind {
                NodeKind::Include(include) => Some(include),
                _ => None,
            })
            .collect();
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].location, "zscript/actors.zs");
        assert_eq!(file.tree.declarations().count(), 1);
    }

    #[test]
    fn test_version_must_come_first() {
        let file = parse("struct S {}\nversion \"4.10\"");
        assert!(file.failed);
    }

    #[test]
    fn test_parse_enum() {
        let file = parse("enum EFlags : uint8 { F_A = 1, F_B = F_A << 1, F_C, }");
        assert!(!file.failed);
        let id = file.find("eflags").unwrap();
        let members: Vec<&str> = file.tree.children(id).iter().map(|m| file.tree[*m].identifier.as_str()).collect();
        assert_eq!(members, vec!["F_A", "F_B", "F_C"]);
        match &file.tree[id].kind {
            NodeKind::Enum(e) => assert_eq!(e.base.as_ref().map(|b| b.name.as_str()), Some("uint8")),
            _ => panic!("expected enum"),
        }
    }

    #[test]
    fn test_parse_constant() {
        let file = parse("const MAX_HEALTH = 100 * 2;");
        let id = file.find("max_health").unwrap();
        assert!(matches!(&file.tree[id].kind, NodeKind::Constant(c) if c.value.is_some()));
    }

    #[test]
    fn test_unknown_top_level_fails() {
        let file = parse("class A {}\nbanana;");
        assert!(file.failed);
        assert!(file.has_errors());
        // the skeleton before the error survives
        assert!(file.find("a").is_some());
    }

    #[test]
    fn test_unknown_type_flag_fails() {
        let file = parse("class A abstract play { }\nstruct S Natve { }");
        assert!(file.failed);
        assert_eq!(class(&file, "A").decl.flags, vec!["abstract".to_string(), "play".to_string()]);
        let error = file.errors().next().unwrap();
        assert_eq!(error.line, 2);
        assert!(error.message.contains("Natve"));
        assert!(file.find("S").is_none());
    }

    #[test]
    fn test_unsupported_directive() {
        let file = parse("#define X 1");
        assert!(file.failed);
        assert!(file.errors().any(|d| d.message.contains("define")));
    }

    #[test]
    fn test_unbalanced_body_fails() {
        let file = parse("class A { void f() { }");
        assert!(file.failed);
    }

    #[test]
    fn test_comments_and_anomalies() {
        let file = parse("// note\nclass A {} $ \"open");
        assert!(file.semantic.iter().any(|t| t.kind == SemanticKind::Comment && t.start == 0));
        assert!(file.semantic.iter().any(|t| t.kind == SemanticKind::Invalid));
    }
}
