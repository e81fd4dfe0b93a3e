//! Field and method signature parsing
//!
//! Phase 2 parses the deferred body of every class and struct:
//!
//! - Fields: `flags Type name [dims] [= expr] [, name2 ...];`
//! - Method signatures: `flags Type[, Type2] Name(args) [const] (; | { body })`
//! - Nested `enum`, `struct` and `const`
//! - `property Name: field, field;`
//! - `default { }`, `states { }`, `flagdef` and `mixin`, which are skipped
//!
//! Method bodies stay as raw tokens until phase 4.
//!
//! # Compound types
//!
//! ```text
//! type ::= builtin ["<" type ("," type)* ">"]
//!        | ident ("." ident)* ["<" type ("," type)* ">"]
//! ```
//!
//! A `>>` token closes two argument lists at once.

use crate::parser::ast::*;
use crate::parser::declarations::DeclFlags;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{ParseError, ParsedFile, Parser};
use crate::parser::semantic::SemanticKind;
use crate::parser::stream::{TokenSet, TokenStream};
use crate::resolver::Universe;

/// Keywords accepted in front of a member's type
const MEMBER_FLAGS: &[&str] = &[
    "abstract",
    "action",
    "clearscope",
    "const",
    "deprecated",
    "final",
    "internal",
    "latent",
    "meta",
    "native",
    "override",
    "play",
    "private",
    "protected",
    "readonly",
    "static",
    "transient",
    "ui",
    "vararg",
    "version",
    "virtual",
    "virtualscope",
];

impl ParsedFile {
    /// Phase 2: fields, method signatures and nested types of every class and struct.
    pub fn parse_fields(&mut self, universe: &Universe<'_>) {
        if self.failed {
            return;
        }
        let types: Vec<NodeId> = self
            .tree
            .declarations()
            .filter(|id| self.tree[*id].type_decl().is_some())
            .collect();

        let mut parser = Parser::new(self, universe);
        for id in types {
            if let Err(err) = parser.parse_object_fields(id) {
                parser.fail(err);
                return;
            }
        }
    }
}

impl<'a> Parser<'a> {
    /// Parse the stored body of class or struct `owner`.
    pub(crate) fn parse_object_fields(&mut self, owner: NodeId) -> Result<(), ParseError> {
        let body = match self.tree_mut()[owner].type_decl_mut() {
            Some(decl) => std::mem::take(&mut decl.body),
            None => return Ok(()),
        };
        self.create_self_var(owner);

        let mut stream = TokenStream::new(&body);
        while let Some(token) = stream.peek() {
            match token.kind {
                TokenKind::Semicolon => {
                    stream.read();
                    self.emit(token, SemanticKind::SpecialToken);
                }
                TokenKind::Identifier if token.is_keyword("enum") => {
                    stream.read();
                    self.parse_enum(&mut stream, token, owner)?;
                }
                TokenKind::Identifier if token.is_keyword("struct") => {
                    stream.read();
                    let nested = self.parse_struct(&mut stream, token, owner)?;
                    self.parse_object_fields(nested)?;
                }
                TokenKind::Identifier
                    if token.is_keyword("const")
                        && stream.peek_ahead(2).is_some_and(|t| t.kind == TokenKind::Assign) =>
                {
                    stream.read();
                    self.parse_constant(&mut stream, token, owner)?;
                }
                TokenKind::Identifier if token.is_keyword("property") => {
                    stream.read();
                    self.parse_property(&mut stream, token, owner)?;
                }
                TokenKind::Identifier if token.is_keyword("flagdef") || token.is_keyword("mixin") => {
                    stream.read();
                    self.emit(token, SemanticKind::Keyword);
                    stream.consume_balanced(TokenKind::Semicolon);
                    let semicolon = Self::expect(&mut stream, TokenKind::Semicolon, "';'")?;
                    self.emit(semicolon, SemanticKind::SpecialToken);
                }
                TokenKind::Identifier if token.is_keyword("default") || token.is_keyword("states") => {
                    stream.read();
                    self.emit(token, SemanticKind::Keyword);
                    if let Some(open) = stream.expect(TokenKind::OpenParen) {
                        self.emit(open, SemanticKind::SpecialToken);
                        stream.consume_balanced(TokenSet::EMPTY);
                        let close = Self::expect(&mut stream, TokenKind::CloseParen, "')'")?;
                        self.emit(close, SemanticKind::SpecialToken);
                    }
                    self.expect_braced_body(&mut stream, &token.text)?;
                }
                _ => self.parse_member(&mut stream, owner)?,
            }
        }
        Ok(())
    }

    /// Synthetic `self`, typed as the class or the class an extension extends.
    fn create_self_var(&mut self, owner: NodeId) {
        let node = &self.tree()[owner];
        let line = node.line;
        let name = node.identifier.clone();
        let target = match &node.kind {
            NodeKind::Class(class) => match &class.extend_name {
                Some(extended) => self.universe.index.find_type(extended).map(Target::Decl),
                None => Some(Target::Decl(self.here(owner))),
            },
            _ => Some(Target::Decl(self.here(owner))),
        };

        let var = LocalVariable {
            var_type: Some(CompoundType::named(name, target)),
            flags: Vec::new(),
        };
        let id = self
            .tree_mut()
            .alloc(Some(owner), "self", line, NodeKind::LocalVariable(var));
        if let Some(decl) = self.tree_mut()[owner].type_decl_mut() {
            decl.self_var = Some(id);
        }
    }

    /// `property Name: field1, field2;`
    fn parse_property(&mut self, stream: &mut TokenStream, keyword: &Token, owner: NodeId) -> Result<(), ParseError> {
        self.emit(keyword, SemanticKind::Keyword);
        let name = Self::expect_identifier(stream, "property name")?;
        let colon = Self::expect(stream, TokenKind::Colon, "':' after property name")?;
        self.emit(colon, SemanticKind::SpecialToken);

        let mut fields = Vec::new();
        loop {
            let field = Self::expect_identifier(stream, "property field")?;
            self.emit_ref(field, SemanticKind::Field, None, field.text.clone());
            fields.push(field.text.clone());
            let separator = Self::expect(stream, TokenKind::Comma | TokenKind::Semicolon, "',' or ';'")?;
            self.emit(separator, SemanticKind::SpecialToken);
            if separator.kind == TokenKind::Semicolon {
                break;
            }
        }

        let id = self.tree_mut().add(
            owner,
            name.text.clone(),
            name.line,
            NodeKind::Property(PropertyDecl { fields }),
        );
        let qualified = self.full_name(self.here(id));
        self.emit_ref(name, SemanticKind::Field, Some(Target::Decl(self.here(id))), qualified);
        Ok(())
    }

    /// Flags, types and name of a field or method, then the rest of it.
    fn parse_member<'t>(&mut self, stream: &mut TokenStream<'t>, owner: NodeId) -> Result<(), ParseError> {
        let mut flags = DeclFlags::default();
        while let Some(token) = stream.peek() {
            let is_flag = token.kind == TokenKind::Identifier
                && MEMBER_FLAGS.iter().any(|flag| token.is_keyword(flag))
                // `readonly<T>` is a type
                && !stream.peek_ahead(1).is_some_and(|t| t.kind == TokenKind::LessThan);
            if !is_flag {
                break;
            }
            stream.read();
            self.emit(token, SemanticKind::Keyword);
            self.parse_flag(stream, token, &mut flags)?;
        }

        let mut types = vec![self.parse_compound_type(stream, Some(owner))?];
        while let Some(comma) = stream.expect(TokenKind::Comma) {
            self.emit(comma, SemanticKind::SpecialToken);
            types.push(self.parse_compound_type(stream, Some(owner))?);
        }

        let name = Self::expect_identifier(stream, "member name")?;
        if stream.check(TokenKind::OpenParen) {
            self.parse_method(stream, owner, types, name, flags)
        } else {
            self.parse_field(stream, owner, types, name, flags)
        }
    }

    /// `[dims] [= expr]` then `;` or `, next_name`.
    fn parse_field<'t>(
        &mut self,
        stream: &mut TokenStream<'t>,
        owner: NodeId,
        mut types: Vec<CompoundType>,
        name: &'t Token,
        flags: DeclFlags,
    ) -> Result<(), ParseError> {
        if types.len() > 1 {
            return Err(ParseError::new(
                format!("field '{}' cannot have more than one type", name.text),
                name.line,
            ));
        }
        let base = types.remove(0);

        let mut name = name;
        loop {
            let mut field_type = base.clone();
            self.parse_dimensions(stream, &mut field_type)?;

            let initializer = match stream.expect(TokenKind::Assign) {
                Some(assign) => {
                    self.emit(assign, SemanticKind::Operator);
                    Some(self.parse_expression(stream, TokenKind::Semicolon | TokenKind::Comma)?)
                }
                None => None,
            };

            let field = FieldDecl {
                field_type,
                flags: flags.flags.clone(),
                version: flags.version.clone(),
                deprecated: flags.deprecated.clone(),
                initializer,
            };
            let id = self
                .tree_mut()
                .add(owner, name.text.clone(), name.line, NodeKind::Field(field));
            let qualified = self.full_name(self.here(id));
            self.emit_ref(name, SemanticKind::Field, Some(Target::Decl(self.here(id))), qualified);

            let separator = Self::expect(stream, TokenKind::Semicolon | TokenKind::Comma, "';' after field")?;
            self.emit(separator, SemanticKind::SpecialToken);
            if separator.kind == TokenKind::Semicolon {
                return Ok(());
            }
            name = Self::expect_identifier(stream, "field name")?;
        }
    }

    /// `[expr]` or `[]` suffixes, appended to `ty.dimensions`.
    pub(crate) fn parse_dimensions(&mut self, stream: &mut TokenStream, ty: &mut CompoundType) -> Result<(), ParseError> {
        while let Some(open) = stream.expect(TokenKind::OpenSquare) {
            self.emit(open, SemanticKind::SpecialToken);
            let size = stream.consume_balanced(TokenSet::EMPTY);
            let close = Self::expect(stream, TokenKind::CloseSquare, "']'")?;
            self.emit(close, SemanticKind::SpecialToken);
            let dimension = if size.is_empty() {
                None
            } else {
                Some(self.parse_sub_expression(&size, open.line)?)
            };
            ty.dimensions.push(dimension);
        }
        Ok(())
    }

    /// Argument list, trailing `const`, then `;` or a deferred `{ body }`.
    fn parse_method(
        &mut self,
        stream: &mut TokenStream,
        owner: NodeId,
        return_types: Vec<CompoundType>,
        name: &Token,
        flags: DeclFlags,
    ) -> Result<(), ParseError> {
        let open = Self::expect(stream, TokenKind::OpenParen, "'('")?;
        self.emit(open, SemanticKind::SpecialToken);

        let is_native = flags.flags.iter().any(|f| f == "native");
        let method = MethodDecl {
            return_types,
            flags: flags.flags,
            version: flags.version,
            deprecated: flags.deprecated,
            ..Default::default()
        };
        let id = self
            .tree_mut()
            .alloc(Some(owner), name.text.clone(), name.line, NodeKind::Method(method));
        let qualified = self.full_name(self.here(id));
        self.emit_ref(name, SemanticKind::Method, Some(Target::Decl(self.here(id))), qualified);

        let (arguments, has_ellipsis) = self.parse_arguments(stream, owner, id)?;

        let is_const = match stream.expect_keyword("const") {
            Some(token) => {
                self.emit(token, SemanticKind::Keyword);
                true
            }
            None => false,
        };

        let body = if let Some(semicolon) = stream.expect(TokenKind::Semicolon) {
            self.emit(semicolon, SemanticKind::SpecialToken);
            if !is_native {
                self.warn(format!("method '{}' has no body but is not native", name.text), name.line);
            }
            None
        } else if stream.check(TokenKind::OpenCurly) {
            Some(self.expect_braced_body(stream, "method body")?)
        } else {
            return Err(Self::unexpected(stream, "';' or method body"));
        };

        if let NodeKind::Method(method) = &mut self.tree_mut()[id].kind {
            method.arguments = arguments;
            method.has_ellipsis = has_ellipsis;
            method.is_const = is_const;
            method.body = body;
        }
        self.tree_mut().attach(owner, id);
        Ok(())
    }

    /// Arguments up to and including `)`. Each becomes a local parented to `method`.
    fn parse_arguments(
        &mut self,
        stream: &mut TokenStream,
        owner: NodeId,
        method: NodeId,
    ) -> Result<(Vec<NodeId>, bool), ParseError> {
        let mut arguments = Vec::new();

        if let Some(close) = stream.expect(TokenKind::CloseParen) {
            self.emit(close, SemanticKind::SpecialToken);
            return Ok((arguments, false));
        }

        loop {
            if let Some(ellipsis) = stream.expect(TokenKind::Ellipsis) {
                self.emit(ellipsis, SemanticKind::SpecialToken);
                let close = Self::expect(stream, TokenKind::CloseParen, "')' after '...'")?;
                self.emit(close, SemanticKind::SpecialToken);
                return Ok((arguments, true));
            }

            let mut flags = Vec::new();
            while let Some(modifier) = stream
                .peek()
                .filter(|t| t.is_keyword("out") || t.is_keyword("ref"))
            {
                stream.read();
                self.emit(modifier, SemanticKind::Keyword);
                flags.push(modifier.text.to_ascii_lowercase());
            }

            let arg_type = self.parse_compound_type(stream, Some(owner))?;
            // `(void)`
            if arguments.is_empty() && arg_type.name == "void" {
                if let Some(close) = stream.expect(TokenKind::CloseParen) {
                    self.emit(close, SemanticKind::SpecialToken);
                    return Ok((arguments, false));
                }
            }

            let name = Self::expect_identifier(stream, "argument name")?;
            let var = LocalVariable {
                var_type: Some(arg_type),
                flags,
            };
            let arg = self
                .tree_mut()
                .alloc(Some(method), name.text.clone(), name.line, NodeKind::LocalVariable(var));
            self.emit_ref(name, SemanticKind::Argument, Some(Target::Decl(self.here(arg))), name.text.clone());

            if let Some(assign) = stream.expect(TokenKind::Assign) {
                self.emit(assign, SemanticKind::Operator);
                let default = self.parse_expression(stream, TokenKind::Comma | TokenKind::CloseParen)?;
                self.tree_mut()
                    .add(arg, "", assign.line, NodeKind::Expression(default));
            }
            arguments.push(arg);

            let separator = Self::expect(stream, TokenKind::Comma | TokenKind::CloseParen, "',' or ')'")?;
            self.emit(separator, SemanticKind::SpecialToken);
            if separator.kind == TokenKind::CloseParen {
                return Ok((arguments, false));
            }
        }
    }

    /// Parse a type reference as seen from `context`, a class or struct in this file.
    pub(crate) fn parse_compound_type(
        &mut self,
        stream: &mut TokenStream,
        context: Option<NodeId>,
    ) -> Result<CompoundType, ParseError> {
        let start = stream.position();
        let result = self
            .parse_type_reference(stream, context)
            .and_then(|(ty, closes_outer)| match closes_outer {
                true => Err(ParseError::new("unbalanced '>>' in type", stream.last_line())),
                false => Ok(ty),
            });
        if result.is_err() {
            stream.set_position(start);
        }
        result
    }

    /// Returns the type and whether a `>>` closed the enclosing argument list too.
    fn parse_type_reference(
        &mut self,
        stream: &mut TokenStream,
        context: Option<NodeId>,
    ) -> Result<(CompoundType, bool), ParseError> {
        let name = Self::expect_identifier(stream, "type name")?;

        let mut ty = if let Some(index) = self.universe.system.find(&name.text) {
            let lower = name.text.to_ascii_lowercase();
            self.emit_ref(name, SemanticKind::TypeName, Some(Target::System(index)), lower.clone());
            CompoundType::named(lower, Some(Target::System(index)))
        } else {
            let scope = context.map(|c| self.here(c));
            let mut full = name.text.clone();
            let mut resolved = self.resolve_type(&full, scope);
            self.emit_type_name(name, resolved, context);

            while stream.check(TokenKind::Dot)
                && stream.peek_ahead(1).is_some_and(|t| t.kind == TokenKind::Identifier)
            {
                if let Some(dot) = stream.read() {
                    self.emit(dot, SemanticKind::SpecialToken);
                }
                let part = Self::expect_identifier(stream, "type name")?;
                full = format!("{}.{}", full, part.text);
                resolved = resolved
                    .and_then(|outer| self.find_nested_type(outer, &part.text))
                    .or_else(|| self.resolve_type(&full, scope));
                self.emit_type_name(part, resolved, context);
            }
            CompoundType::named(full, resolved.map(Target::Decl))
        };

        let mut closes_outer = false;
        if let Some(open) = stream.expect(TokenKind::LessThan) {
            self.emit(open, SemanticKind::SpecialToken);
            loop {
                let (argument, closed) = self.parse_type_reference(stream, context)?;
                ty.arguments.push(argument);
                if closed {
                    break;
                }
                let separator = Self::expect(
                    stream,
                    TokenKind::Comma | TokenKind::GreaterThan | TokenKind::RightShift,
                    "',' or '>'",
                )?;
                self.emit(separator, SemanticKind::SpecialToken);
                match separator.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RightShift => {
                        closes_outer = true;
                        break;
                    }
                    _ => break,
                }
            }
        }

        Ok((ty, closes_outer))
    }

    /// TypeName token for one path component. Unresolved names carry the
    /// context-qualified spelling so the later re-walk can retry them.
    fn emit_type_name(&mut self, token: &Token, resolved: Option<DeclRef>, context: Option<NodeId>) {
        match resolved {
            Some(decl) => {
                let qualified = self.full_name(decl);
                self.emit_ref(token, SemanticKind::TypeName, Some(Target::Decl(decl)), qualified);
            }
            None => {
                let qualified = match context {
                    Some(ctx) => format!("{}.{}", self.full_name(self.here(ctx)), token.text),
                    None => token.text.clone(),
                };
                self.emit_ref(token, SemanticKind::TypeName, None, qualified);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::system_types::SystemTypes;
    use crate::resolver::TypeIndex;

    fn parse(source: &str) -> ParsedFile {
        let system = SystemTypes::new();
        let mut file = ParsedFile::parse(FileId(0), source, &system);
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        file.parse_fields(&universe);
        file
    }

    fn member<'f>(file: &'f ParsedFile, owner: &str, name: &str) -> &'f Node {
        let owner = file.find(owner).unwrap();
        let id = file
            .tree
            .children(owner)
            .iter()
            .copied()
            .find(|id| file.tree[*id].is_named(name))
            .unwrap();
        &file.tree[id]
    }

    #[test]
    fn test_fields() {
        let file = parse("class A { int x, y; private double speed = 1.5; Actor targets[4][]; }");
        assert!(!file.failed);
        assert!(matches!(&member(&file, "A", "x").kind, NodeKind::Field(f) if f.field_type.name == "int"));
        assert!(matches!(&member(&file, "A", "y").kind, NodeKind::Field(_)));
        match &member(&file, "A", "speed").kind {
            NodeKind::Field(f) => {
                assert_eq!(f.flags, vec!["private".to_string()]);
                assert!(f.initializer.is_some());
            }
            _ => panic!("expected field"),
        }
        match &member(&file, "A", "targets").kind {
            NodeKind::Field(f) => {
                assert_eq!(f.field_type.dimensions.len(), 2);
                assert!(f.field_type.dimensions[1].is_none());
            }
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn test_method_signature() {
        let file = parse(
            "class A { virtual int, bool Check(out int v, Actor other = null, ...) const { return 1, true; } }",
        );
        assert!(!file.failed);
        let node = member(&file, "A", "Check");
        match &node.kind {
            NodeKind::Method(m) => {
                assert_eq!(m.return_types.len(), 2);
                assert_eq!(m.arguments.len(), 2);
                assert!(m.has_ellipsis);
                assert!(m.is_const);
                assert!(m.body.as_ref().is_some_and(|b| !b.is_empty()));
                assert_eq!(m.flags, vec!["virtual".to_string()]);
                let first = &file.tree[m.arguments[0]];
                assert!(matches!(&first.kind, NodeKind::LocalVariable(v) if v.flags == vec!["out".to_string()]));
                // the default value lives under the argument
                assert_eq!(file.tree.children(m.arguments[1]).len(), 1);
            }
            _ => panic!("expected method"),
        }
    }

    #[test]
    fn test_bodiless_method_warns_unless_native() {
        let file = parse("class A { native void Foo(); void Bar(); }");
        assert!(!file.failed);
        let warnings: Vec<_> = file.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Bar"));
    }

    #[test]
    fn test_multiple_types_on_field_fails() {
        let file = parse("class A { int, bool x; }");
        assert!(file.failed);
    }

    #[test]
    fn test_nested_declarations() {
        let file = parse(
            "class A { enum EMode { M_ONE, M_TWO } struct Inner { int v; } const LIMIT = 4; property Speed: speed; \
             default { Health 100; } states { Spawn: TNT1 A 1; Stop; } flagdef Boss: flags, 3; Inner i; }",
        );
        assert!(!file.failed, "{:?}", file.diagnostics);
        assert!(matches!(member(&file, "A", "EMode").kind, NodeKind::Enum(_)));
        assert!(matches!(member(&file, "A", "Inner").kind, NodeKind::Struct(_)));
        assert!(matches!(member(&file, "A", "LIMIT").kind, NodeKind::Constant(_)));
        assert!(matches!(member(&file, "A", "Speed").kind, NodeKind::Property(_)));
        match &member(&file, "A", "i").kind {
            NodeKind::Field(f) => assert!(f.field_type.reference.is_some()),
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn test_self_var() {
        let file = parse("class A { }");
        let id = file.find("A").unwrap();
        let self_var = file.tree[id].type_decl().and_then(|d| d.self_var).unwrap();
        assert!(file.tree[self_var].is_named("self"));
        // not a member
        assert!(file.tree.children(id).is_empty());
    }

    #[test]
    fn test_generic_types() {
        let file = parse("class A { Array<Class<Actor> > a; Array<Class<Actor>> b; map<int, string> c; readonly<A> d; }");
        assert!(!file.failed, "{:?}", file.diagnostics);
        for name in ["a", "b"] {
            match &member(&file, "A", name).kind {
                NodeKind::Field(f) => {
                    assert_eq!(f.field_type.name, "array");
                    assert_eq!(f.field_type.arguments[0].name, "class");
                    assert_eq!(f.field_type.arguments[0].arguments[0].name, "Actor");
                }
                _ => panic!("expected field"),
            }
        }
        match &member(&file, "A", "c").kind {
            NodeKind::Field(f) => assert_eq!(f.field_type.arguments.len(), 2),
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn test_forward_reference_within_file() {
        let file = parse("class A { B other; } class B { }");
        match &member(&file, "A", "other").kind {
            NodeKind::Field(f) => {
                assert_eq!(f.field_type.reference, Some(Target::Decl(DeclRef::new(FileId(0), file.find("B").unwrap()))))
            }
            _ => panic!("expected field"),
        }
    }
}
