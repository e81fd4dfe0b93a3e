//! Statement parsing implementation
//!
//! Phase 4 turns every deferred method body into statement nodes and tags
//! every expression on the spot:
//!
//! - Local declarations: `[const] Type a [dims] [= expr], b ...;` and `let a = expr;`
//! - Control flow: `if`/`else`, `for`, `while`, `do ... while`
//! - Jumps: `return [a, b];`, `break;`, `continue;`
//! - Nested `{ ... }` blocks and empty `;` statements
//! - Expression statements
//!
//! # Grammar
//!
//! ```text
//! statement ::= ";" | block | let | declaration | if | for | while | do
//!             | return | break | continue | expr ";"
//! body      ::= block | statement
//! for       ::= "for" "(" [init ("," init)*] ";" [expr] ";" [expr ("," expr)*] ")" body
//! ```
//!
//! Which forms are legal depends on [`StatementFlags`]. A `for` initializer
//! allows declarations and expressions only. Every body is a `CodeBlock`,
//! braces or not.
//!
//! A syntax error fails the method body alone: its nodes are dropped, an
//! error is recorded and parsing continues with the next method.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{ParseError, ParsedFile, Parser};
use crate::parser::semantic::SemanticKind;
use crate::parser::stream::{TokenSet, TokenStream};
use crate::resolver::{Scope, Universe};

bitflags::bitflags! {
    /// Statement forms allowed at a position
    pub(crate) struct StatementFlags: u32 {
        const INITIALIZER = 1 << 0;
        const EXPRESSION = 1 << 1;
        const CYCLE = 1 << 2;
        const CYCLE_CONTROL = 1 << 3;
        const RETURN = 1 << 4;
        const CONDITION = 1 << 5;
        const BLOCK = 1 << 6;
        const CYCLE_INITIALIZER = Self::INITIALIZER.bits | Self::EXPRESSION.bits;
        const FUNCTION = Self::INITIALIZER.bits
            | Self::EXPRESSION.bits
            | Self::CYCLE.bits
            | Self::CYCLE_CONTROL.bits
            | Self::RETURN.bits
            | Self::CONDITION.bits
            | Self::BLOCK.bits;
    }
}

impl ParsedFile {
    /// Phase 4: declaration initializers, then every method body.
    pub fn parse_bodies(&mut self, universe: &Universe<'_>) {
        if self.failed {
            return;
        }
        let start = self.semantic.len();
        let mut parser = Parser::new(self, universe);
        parser.highlight_declarations();

        let mut bodies = 0;
        for owner in parser.tree().type_decls() {
            let methods: Vec<NodeId> = parser
                .tree()
                .children(owner)
                .iter()
                .copied()
                .filter(|id| matches!(&parser.tree()[*id].kind, NodeKind::Method(m) if m.body.is_some()))
                .collect();
            for method in methods {
                parser.parse_method_body(owner, method);
                bodies += 1;
            }
        }
        parser.recheck_type_names(start);
        log::debug!("file {}: parsed {} method bodies", self.id.0, bodies);
    }
}

impl<'a> Parser<'a> {
    // ===== Declaration-level expressions =====

    fn highlight_stored(&mut self, expr: Option<Expression>, scope: Scope) -> Option<Expression> {
        expr.map(|mut expr| {
            self.highlight_expression(&mut expr, scope);
            expr
        })
    }

    /// Constants, enum values, field initializers and dimensions, argument defaults.
    fn highlight_declarations(&mut self) {
        let top: Vec<NodeId> = self.tree().declarations().collect();
        for id in top {
            match &self.tree()[id].kind {
                NodeKind::Constant(_) => self.highlight_constant(id, Scope::default()),
                NodeKind::Enum(_) => self.highlight_enum(id),
                _ => {}
            }
        }

        for owner in self.tree().type_decls() {
            let context = Some(self.here(owner));
            let scope = Scope {
                node: Some(owner),
                context,
            };
            for child in self.tree().children(owner).to_vec() {
                match &self.tree()[child].kind {
                    NodeKind::Field(_) => self.highlight_field(child, scope),
                    NodeKind::Constant(_) => self.highlight_constant(child, scope),
                    NodeKind::Enum(_) => self.highlight_enum(child),
                    NodeKind::Method(_) => self.highlight_defaults(child, scope),
                    _ => {}
                }
            }
        }
    }

    fn highlight_constant(&mut self, id: NodeId, scope: Scope) {
        let value = match &mut self.tree_mut()[id].kind {
            NodeKind::Constant(constant) => constant.value.take(),
            _ => return,
        };
        let value = self.highlight_stored(value, scope);
        if let NodeKind::Constant(constant) = &mut self.tree_mut()[id].kind {
            constant.value = value;
        }
    }

    /// Enum values see the other members of the same enum.
    fn highlight_enum(&mut self, id: NodeId) {
        let scope = Scope {
            node: None,
            context: Some(self.here(id)),
        };
        for member in self.tree().children(id).to_vec() {
            self.highlight_constant(member, scope);
        }
    }

    fn highlight_field(&mut self, id: NodeId, scope: Scope) {
        let (initializer, dimensions) = match &mut self.tree_mut()[id].kind {
            NodeKind::Field(field) => (
                field.initializer.take(),
                std::mem::take(&mut field.field_type.dimensions),
            ),
            _ => return,
        };
        let dimensions = self.highlight_dimensions(dimensions, scope);
        let initializer = self.highlight_stored(initializer, scope);
        if let NodeKind::Field(field) = &mut self.tree_mut()[id].kind {
            field.initializer = initializer;
            field.field_type.dimensions = dimensions;
        }
    }

    fn highlight_dimensions(&mut self, dimensions: Vec<Option<Expression>>, scope: Scope) -> Vec<Option<Expression>> {
        dimensions
            .into_iter()
            .map(|dimension| self.highlight_stored(dimension, scope))
            .collect()
    }

    /// Default values of a method's arguments.
    fn highlight_defaults(&mut self, method: NodeId, scope: Scope) {
        let arguments = match &self.tree()[method].kind {
            NodeKind::Method(m) => m.arguments.clone(),
            _ => return,
        };
        let scope = Scope {
            node: Some(method),
            ..scope
        };
        for argument in arguments {
            for child in self.tree().children(argument).to_vec() {
                let expr = match &mut self.tree_mut()[child].kind {
                    NodeKind::Expression(expr) => std::mem::replace(expr, Expression::new(Operator::Literal)),
                    _ => continue,
                };
                let expr = self.highlight_stored(Some(expr), scope);
                if let (NodeKind::Expression(slot), Some(expr)) = (&mut self.tree_mut()[child].kind, expr) {
                    *slot = expr;
                }
            }
        }
    }

    // ===== Method bodies =====

    /// Parse one stored body into a `CodeBlock` child of `method`.
    fn parse_method_body(&mut self, owner: NodeId, method: NodeId) {
        let body = match &mut self.tree_mut()[method].kind {
            NodeKind::Method(m) => m.body.take(),
            _ => None,
        };
        let Some(body) = body else {
            return;
        };

        let line = self.tree()[method].line;
        let mark = self.mark();
        let block = self.tree_mut().alloc(Some(method), "", line, NodeKind::CodeBlock);
        let mut stream = TokenStream::new(&body);

        match self.parse_statements(&mut stream, block, owner, None) {
            Ok(()) => self.tree_mut().attach(method, block),
            Err(err) => {
                self.report(err);
                self.discard_nodes(mark);
            }
        }
    }

    /// Statements until `closer` at depth zero, or the end of input when `None`.
    /// The closer is not consumed.
    fn parse_statements(
        &mut self,
        stream: &mut TokenStream,
        block: NodeId,
        owner: NodeId,
        closer: Option<TokenKind>,
    ) -> Result<(), ParseError> {
        loop {
            match stream.peek() {
                None if closer.is_none() => return Ok(()),
                None => return Err(Self::unexpected(stream, "'}'")),
                Some(token) if Some(token.kind) == closer => return Ok(()),
                Some(_) => {
                    self.parse_statement(stream, block, owner, StatementFlags::FUNCTION)?;
                }
            }
        }
    }

    fn scope(&self, node: NodeId, owner: NodeId) -> Scope {
        Scope {
            node: Some(node),
            context: Some(self.here(owner)),
        }
    }

    /// Statements inside a block are attached; `for` initializers are only parented.
    fn place(&mut self, parent: NodeId, identifier: impl Into<String>, line: usize, kind: NodeKind) -> NodeId {
        if matches!(self.tree()[parent].kind, NodeKind::CodeBlock) {
            self.tree_mut().add(parent, identifier, line, kind)
        } else {
            self.tree_mut().alloc(Some(parent), identifier, line, kind)
        }
    }

    fn require(flags: StatementFlags, needed: StatementFlags, token: &Token) -> Result<(), ParseError> {
        if flags.contains(needed) {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("'{}' is not allowed here", token.text),
                token.line,
            ))
        }
    }

    fn expect_semicolon(&mut self, stream: &mut TokenStream, after: &str) -> Result<(), ParseError> {
        let semicolon = Self::expect(stream, TokenKind::Semicolon, &format!("';' after {}", after))?;
        self.emit(semicolon, SemanticKind::SpecialToken);
        Ok(())
    }

    /// Parse one statement under `parent`. Returns the nodes it declared.
    ///
    /// Inside a block the statement consumes its own `;`. Under a `for` node
    /// (initializers) the terminator is left for the caller.
    pub(crate) fn parse_statement(
        &mut self,
        stream: &mut TokenStream,
        parent: NodeId,
        owner: NodeId,
        flags: StatementFlags,
    ) -> Result<Vec<NodeId>, ParseError> {
        let in_block = matches!(self.tree()[parent].kind, NodeKind::CodeBlock);
        let token = stream.peek().ok_or_else(|| Self::unexpected(stream, "statement"))?;

        match token.kind {
            TokenKind::Semicolon if in_block => {
                stream.read();
                self.emit(token, SemanticKind::SpecialToken);
                return Ok(Vec::new());
            }
            TokenKind::OpenCurly => {
                Self::require(flags, StatementFlags::BLOCK, token)?;
                let block = self.parse_block_or_line(stream, parent, owner)?;
                return Ok(vec![block]);
            }
            TokenKind::Identifier => {
                let keyword = token.text.to_ascii_lowercase();
                let needed = match keyword.as_str() {
                    "if" => Some(StatementFlags::CONDITION),
                    "for" | "while" | "do" => Some(StatementFlags::CYCLE),
                    "return" => Some(StatementFlags::RETURN),
                    "break" | "continue" => Some(StatementFlags::CYCLE_CONTROL),
                    "let" => Some(StatementFlags::INITIALIZER),
                    _ => None,
                };
                if let Some(needed) = needed {
                    Self::require(flags, needed, token)?;
                    stream.read();
                    self.emit(token, SemanticKind::Keyword);
                    return match keyword.as_str() {
                        "if" => self.parse_if(stream, token, parent, owner),
                        "for" => self.parse_for(stream, token, parent, owner),
                        "while" => self.parse_while(stream, token, parent, owner),
                        "do" => self.parse_do(stream, token, parent, owner),
                        "return" => self.parse_return(stream, token, parent, owner),
                        "break" | "continue" => self.parse_jump(stream, token, parent),
                        _ => self.parse_let(stream, parent, owner, in_block),
                    };
                }
                if token.is_keyword("else") {
                    return Err(Self::unexpected_token(token, "statement ('else' without 'if')"));
                }
                if flags.contains(StatementFlags::INITIALIZER) {
                    if let Some(declared) = self.try_declaration(stream, parent, owner, in_block)? {
                        return Ok(declared);
                    }
                }
            }
            _ => {}
        }

        Self::require(flags, StatementFlags::EXPRESSION, token)?;
        self.parse_expression_statement(stream, parent, owner, in_block)
    }

    fn parse_expression_statement(
        &mut self,
        stream: &mut TokenStream,
        parent: NodeId,
        owner: NodeId,
        in_block: bool,
    ) -> Result<Vec<NodeId>, ParseError> {
        let stop = if in_block {
            TokenSet::from(TokenKind::Semicolon)
        } else {
            TokenKind::Semicolon | TokenKind::Comma
        };
        let mut expr = self.parse_expression(stream, stop)?;
        let scope = self.scope(parent, owner);
        self.highlight_expression(&mut expr, scope);
        let id = self.place(parent, "", expr.line(), NodeKind::Expression(expr));
        if in_block {
            self.expect_semicolon(stream, "expression")?;
        }
        Ok(vec![id])
    }

    /// `{ statements }` or a single statement, always as a new `CodeBlock` under `parent`.
    fn parse_block_or_line(&mut self, stream: &mut TokenStream, parent: NodeId, owner: NodeId) -> Result<NodeId, ParseError> {
        let line = stream.peek().map_or_else(|| stream.last_line(), |t| t.line);
        let block = self.tree_mut().add(parent, "", line, NodeKind::CodeBlock);

        if let Some(open) = stream.expect(TokenKind::OpenCurly) {
            self.emit(open, SemanticKind::SpecialToken);
            self.parse_statements(stream, block, owner, Some(TokenKind::CloseCurly))?;
            let close = Self::expect(stream, TokenKind::CloseCurly, "'}'")?;
            self.emit(close, SemanticKind::SpecialToken);
        } else {
            self.parse_statement(stream, block, owner, StatementFlags::FUNCTION)?;
        }
        Ok(block)
    }

    /// `( expr )` as used by `if`, `while` and `do`.
    fn parse_condition(&mut self, stream: &mut TokenStream, scope: Scope) -> Result<Expression, ParseError> {
        let open = Self::expect(stream, TokenKind::OpenParen, "'('")?;
        self.emit(open, SemanticKind::SpecialToken);
        let mut condition = self.parse_expression(stream, TokenKind::CloseParen)?;
        self.highlight_expression(&mut condition, scope);
        let close = Self::expect(stream, TokenKind::CloseParen, "')'")?;
        self.emit(close, SemanticKind::SpecialToken);
        Ok(condition)
    }

    // ===== Declarations =====

    /// `[const] Type name ...` if the tokens look like one. Rolls back otherwise.
    fn try_declaration(
        &mut self,
        stream: &mut TokenStream,
        parent: NodeId,
        owner: NodeId,
        in_block: bool,
    ) -> Result<Option<Vec<NodeId>>, ParseError> {
        let start = stream.position();
        let mark = self.mark();

        let constant = stream.expect_keyword("const");
        let base = self.parse_compound_type(stream, Some(owner)).ok().filter(|_| {
            stream.check(TokenKind::Identifier)
                && stream.peek_ahead(1).is_some_and(|next| {
                    matches!(
                        next.kind,
                        TokenKind::Assign | TokenKind::Semicolon | TokenKind::Comma | TokenKind::OpenSquare
                    )
                })
        });
        let Some(base) = base else {
            stream.set_position(start);
            self.rollback(mark);
            return Ok(None);
        };
        if let Some(constant) = constant {
            self.emit(constant, SemanticKind::Keyword);
        }

        let scope = self.scope(parent, owner);
        let mut declared = Vec::new();
        loop {
            let name = Self::expect_identifier(stream, "variable name")?;
            let mut var_type = base.clone();
            self.parse_dimensions(stream, &mut var_type)?;
            var_type.dimensions = self.highlight_dimensions(std::mem::take(&mut var_type.dimensions), scope);

            let initializer = match stream.expect(TokenKind::Assign) {
                Some(assign) if !var_type.dimensions.is_empty() => {
                    return Err(ParseError::new(
                        format!("array '{}' cannot have an initializer", name.text),
                        assign.line,
                    ));
                }
                Some(assign) => {
                    self.emit(assign, SemanticKind::Operator);
                    let mut value = self.parse_expression(stream, TokenKind::Semicolon | TokenKind::Comma)?;
                    self.highlight_expression(&mut value, scope);
                    Some(value)
                }
                None => None,
            };

            let var = LocalVariable {
                var_type: Some(var_type),
                flags: constant.map(|_| vec!["const".to_string()]).unwrap_or_default(),
            };
            let id = self.place(parent, name.text.clone(), name.line, NodeKind::LocalVariable(var));
            if let Some(value) = initializer {
                self.tree_mut().add(id, "", name.line, NodeKind::Expression(value));
            }
            self.emit_ref(name, SemanticKind::Local, Some(Target::Decl(self.here(id))), name.text.clone());
            declared.push(id);

            match stream.expect(TokenKind::Comma) {
                Some(comma) => self.emit(comma, SemanticKind::SpecialToken),
                None => break,
            }
        }

        if in_block {
            self.expect_semicolon(stream, "declaration")?;
        }
        Ok(Some(declared))
    }

    /// `let a = expr [, b = expr]`. The type comes from the initializer.
    fn parse_let(
        &mut self,
        stream: &mut TokenStream,
        parent: NodeId,
        owner: NodeId,
        in_block: bool,
    ) -> Result<Vec<NodeId>, ParseError> {
        let scope = self.scope(parent, owner);
        let mut declared = Vec::new();
        loop {
            let name = Self::expect_identifier(stream, "variable name after 'let'")?;
            let assign = Self::expect(stream, TokenKind::Assign, "'=' after let variable")?;
            self.emit(assign, SemanticKind::Operator);
            let mut value = self.parse_expression(stream, TokenKind::Semicolon | TokenKind::Comma)?;
            self.highlight_expression(&mut value, scope);

            let id = self.place(
                parent,
                name.text.clone(),
                name.line,
                NodeKind::LocalVariable(LocalVariable::default()),
            );
            self.tree_mut().add(id, "", name.line, NodeKind::Expression(value));
            self.emit_ref(name, SemanticKind::Local, Some(Target::Decl(self.here(id))), name.text.clone());
            declared.push(id);

            match stream.expect(TokenKind::Comma) {
                Some(comma) => self.emit(comma, SemanticKind::SpecialToken),
                None => break,
            }
        }
        if in_block {
            self.expect_semicolon(stream, "let declaration")?;
        }
        Ok(declared)
    }

    // ===== Control flow =====

    fn parse_if(&mut self, stream: &mut TokenStream, keyword: &Token, parent: NodeId, owner: NodeId) -> Result<Vec<NodeId>, ParseError> {
        let condition = self.parse_condition(stream, self.scope(parent, owner))?;
        let id = self.place(
            parent,
            "if",
            keyword.line,
            NodeKind::Condition(Condition {
                condition,
                else_block: None,
            }),
        );
        self.parse_block_or_line(stream, id, owner)?;

        if let Some(else_keyword) = stream.expect_keyword("else") {
            self.emit(else_keyword, SemanticKind::Keyword);
            let else_block = self.parse_block_or_line(stream, id, owner)?;
            if let NodeKind::Condition(condition) = &mut self.tree_mut()[id].kind {
                condition.else_block = Some(else_block);
            }
        }
        Ok(vec![id])
    }

    fn parse_for(&mut self, stream: &mut TokenStream, keyword: &Token, parent: NodeId, owner: NodeId) -> Result<Vec<NodeId>, ParseError> {
        let open = Self::expect(stream, TokenKind::OpenParen, "'(' after 'for'")?;
        self.emit(open, SemanticKind::SpecialToken);
        let id = self.place(parent, "for", keyword.line, NodeKind::ForCycle(ForCycle::default()));
        let scope = self.scope(id, owner);

        if !stream.check(TokenKind::Semicolon) {
            loop {
                let declared = self.parse_statement(stream, id, owner, StatementFlags::CYCLE_INITIALIZER)?;
                // visible to the initializers after it
                if let NodeKind::ForCycle(cycle) = &mut self.tree_mut()[id].kind {
                    cycle.initializers.extend(declared);
                }
                match stream.expect(TokenKind::Comma) {
                    Some(comma) => self.emit(comma, SemanticKind::SpecialToken),
                    None => break,
                }
            }
        }
        self.expect_semicolon(stream, "for initializer")?;

        let condition = if stream.check(TokenKind::Semicolon) {
            None
        } else {
            let mut condition = self.parse_expression(stream, TokenKind::Semicolon)?;
            self.highlight_expression(&mut condition, scope);
            Some(condition)
        };
        self.expect_semicolon(stream, "for condition")?;

        let mut steps = Vec::new();
        if !stream.check(TokenKind::CloseParen) {
            loop {
                let mut step = self.parse_expression(stream, TokenKind::Comma | TokenKind::CloseParen)?;
                self.highlight_expression(&mut step, scope);
                steps.push(step);
                match stream.expect(TokenKind::Comma) {
                    Some(comma) => self.emit(comma, SemanticKind::SpecialToken),
                    None => break,
                }
            }
        }
        let close = Self::expect(stream, TokenKind::CloseParen, "')' closing 'for'")?;
        self.emit(close, SemanticKind::SpecialToken);

        if let NodeKind::ForCycle(cycle) = &mut self.tree_mut()[id].kind {
            cycle.condition = condition;
            cycle.steps = steps;
        }
        self.parse_block_or_line(stream, id, owner)?;
        Ok(vec![id])
    }

    fn parse_while(&mut self, stream: &mut TokenStream, keyword: &Token, parent: NodeId, owner: NodeId) -> Result<Vec<NodeId>, ParseError> {
        let condition = self.parse_condition(stream, self.scope(parent, owner))?;
        let cycle = WhileCycle {
            condition,
            post_condition: false,
        };
        let id = self.place(parent, "while", keyword.line, NodeKind::WhileCycle(cycle));
        self.parse_block_or_line(stream, id, owner)?;
        Ok(vec![id])
    }

    /// `do body while (cond);`
    fn parse_do(&mut self, stream: &mut TokenStream, keyword: &Token, parent: NodeId, owner: NodeId) -> Result<Vec<NodeId>, ParseError> {
        // the condition is filled in once the body is parsed
        let cycle = WhileCycle {
            condition: Expression::new(Operator::Literal),
            post_condition: true,
        };
        let id = self.place(parent, "do", keyword.line, NodeKind::WhileCycle(cycle));
        self.parse_block_or_line(stream, id, owner)?;

        let while_keyword = stream
            .expect_keyword("while")
            .ok_or_else(|| Self::unexpected(stream, "'while' after do body"))?;
        self.emit(while_keyword, SemanticKind::Keyword);
        let condition = self.parse_condition(stream, self.scope(parent, owner))?;
        self.expect_semicolon(stream, "do-while condition")?;

        if let NodeKind::WhileCycle(cycle) = &mut self.tree_mut()[id].kind {
            cycle.condition = condition;
        }
        Ok(vec![id])
    }

    fn parse_return(&mut self, stream: &mut TokenStream, keyword: &Token, parent: NodeId, owner: NodeId) -> Result<Vec<NodeId>, ParseError> {
        let id = self.place(parent, "return", keyword.line, NodeKind::ExecutionControl(ControlKind::Return));
        let scope = self.scope(parent, owner);

        if !stream.check(TokenKind::Semicolon) {
            loop {
                let mut value = self.parse_expression(stream, TokenKind::Semicolon | TokenKind::Comma)?;
                self.highlight_expression(&mut value, scope);
                let line = value.line();
                self.tree_mut().add(id, "", line, NodeKind::Expression(value));
                match stream.expect(TokenKind::Comma) {
                    Some(comma) => self.emit(comma, SemanticKind::SpecialToken),
                    None => break,
                }
            }
        }
        self.expect_semicolon(stream, "return")?;
        Ok(vec![id])
    }

    /// `break;` and `continue;`, only inside a cycle of the same method.
    fn parse_jump(&mut self, stream: &mut TokenStream, keyword: &Token, parent: NodeId) -> Result<Vec<NodeId>, ParseError> {
        let tree = self.tree();
        let in_cycle = tree
            .ancestors(parent)
            .take_while(|id| !matches!(tree[*id].kind, NodeKind::Method(_)))
            .any(|id| matches!(tree[id].kind, NodeKind::ForCycle(_) | NodeKind::WhileCycle(_)));
        if !in_cycle {
            return Err(ParseError::new(
                format!("'{}' outside of a loop", keyword.text),
                keyword.line,
            ));
        }

        let kind = if keyword.is_keyword("break") {
            ControlKind::Break
        } else {
            ControlKind::Continue
        };
        let id = self.place(parent, keyword.text.to_ascii_lowercase(), keyword.line, NodeKind::ExecutionControl(kind));
        self.expect_semicolon(stream, &keyword.text)?;
        Ok(vec![id])
    }
}
