//! Expression parsing
//!
//! Two phases:
//!
//! 1. **Leaf collection**: operands are read one at a time and postfix forms
//!    (`a.b`, `f(...)`, `x[...]`) bind into the running operand right away.
//!    Everything else lands on a flat list of operands and raw operator tokens.
//! 2. **Reduction**: a fixed list of passes, highest precedence first, folds
//!    each operator family on the flat list into [`Expression`] nodes.
//!
//! # Precedence (highest to lowest)
//!
//! ```text
//! dot cross            left
//! x++ x--              postfix
//! ++x --x              prefix
//! ~ ! -x               unary, right
//! * / %                left
//! + - ..               left
//! << >> >>>            left
//! &    ^    |          left, one level each
//! == != ~== < > <= >= <>=
//!                      left, one level
//! &&   ||              left, one level each
//! ?:                   right
//! = += -= ...          right
//! ```
//!
//! A failed parse restores the stream position.

use crate::parser::ast::{Expression, Leaf, Operator};
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{ParseError, Parser};
use crate::parser::stream::{TokenSet, TokenStream};

/// Flat list entry during reduction
#[derive(Debug)]
enum Pending {
    Leaf(Leaf),
    Op(Token),
}

impl Pending {
    fn is_operand(&self) -> bool {
        matches!(self, Pending::Leaf(_))
    }

    fn is_op(&self, kind: TokenKind) -> bool {
        matches!(self, Pending::Op(token) if token.kind == kind)
    }
}

#[derive(Debug, Clone, Copy)]
enum Pass {
    Binary(&'static [Operator]),
    Postfix,
    Prefix,
    Unary,
    Ternary,
    Assign,
}

const PASSES: &[Pass] = &[
    Pass::Binary(&[Operator::VectorDot, Operator::VectorCross]),
    Pass::Postfix,
    Pass::Prefix,
    Pass::Unary,
    Pass::Binary(&[Operator::Mul, Operator::Div, Operator::Modulo]),
    Pass::Binary(&[Operator::Add, Operator::Sub, Operator::Concat]),
    Pass::Binary(&[Operator::BitShl, Operator::BitShr, Operator::BitShrUnsigned]),
    Pass::Binary(&[Operator::BitAnd]),
    Pass::Binary(&[Operator::Xor]),
    Pass::Binary(&[Operator::BitOr]),
    Pass::Binary(&[
        Operator::CmpEq,
        Operator::CmpNotEq,
        Operator::CmpSomewhatEq,
        Operator::CmpLT,
        Operator::CmpGT,
        Operator::CmpLTEQ,
        Operator::CmpGTEQ,
        Operator::CmpSpaceship,
    ]),
    Pass::Binary(&[Operator::LogicalAnd]),
    Pass::Binary(&[Operator::LogicalOr]),
    Pass::Ternary,
    Pass::Assign,
];

/// Binary operator for an operator token.
fn binary_operator(token: &Token) -> Option<Operator> {
    let op = match token.kind {
        TokenKind::Add => Operator::Add,
        TokenKind::Subtract => Operator::Sub,
        TokenKind::Multiply => Operator::Mul,
        TokenKind::Divide => Operator::Div,
        TokenKind::Modulo => Operator::Modulo,
        TokenKind::Concat => Operator::Concat,
        TokenKind::LeftShift => Operator::BitShl,
        TokenKind::RightShift => Operator::BitShr,
        TokenKind::RightShiftUnsigned => Operator::BitShrUnsigned,
        TokenKind::BitAnd => Operator::BitAnd,
        TokenKind::Xor => Operator::Xor,
        TokenKind::BitOr => Operator::BitOr,
        TokenKind::LogicalAnd => Operator::LogicalAnd,
        TokenKind::LogicalOr => Operator::LogicalOr,
        TokenKind::LessThan => Operator::CmpLT,
        TokenKind::GreaterThan => Operator::CmpGT,
        TokenKind::LessOrEqual => Operator::CmpLTEQ,
        TokenKind::GreaterOrEqual => Operator::CmpGTEQ,
        TokenKind::Spaceship => Operator::CmpSpaceship,
        TokenKind::Equals => Operator::CmpEq,
        TokenKind::NotEquals => Operator::CmpNotEq,
        TokenKind::SomewhatEquals => Operator::CmpSomewhatEq,
        TokenKind::Assign => Operator::Assign,
        TokenKind::Identifier if token.is_keyword("dot") => Operator::VectorDot,
        TokenKind::Identifier if token.is_keyword("cross") => Operator::VectorCross,
        _ => return None,
    };
    Some(op)
}

/// Operators that take a trailing `=` to form a compound assignment.
fn is_compound_assignable(op: Operator) -> bool {
    matches!(
        op,
        Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::Modulo
            | Operator::BitShl
            | Operator::BitShr
            | Operator::BitShrUnsigned
            | Operator::BitAnd
            | Operator::Xor
            | Operator::BitOr
    )
}

fn into_leaf(pending: Pending) -> Leaf {
    match pending {
        Pending::Leaf(leaf) => leaf,
        // callers check is_operand first
        Pending::Op(token) => Leaf::Identifier(token),
    }
}

/// Promote a lone operand to an expression.
fn into_expression(leaf: Leaf) -> Expression {
    match leaf {
        Leaf::Expression(expr) => *expr,
        Leaf::Identifier(token) => {
            Expression::with_leaves(Operator::Identifier, vec![Leaf::Identifier(token)])
        }
        literal => Expression::with_leaves(Operator::Literal, vec![literal]),
    }
}

fn boxed(expr: Expression) -> Leaf {
    Leaf::Expression(Box::new(expr))
}

impl<'a> Parser<'a> {
    /// Parse one expression ending before any token in `stop`.
    pub(crate) fn parse_expression(
        &self,
        stream: &mut TokenStream,
        stop: impl Into<TokenSet>,
    ) -> Result<Expression, ParseError> {
        let start = stream.position();
        let result = self.collect(stream, stop.into()).and_then(|pending| {
            let line = stream.last_line();
            Self::reduce(pending, line)
        });
        if result.is_err() {
            stream.set_position(start);
        }
        result
    }

    /// Parse a token run that must form exactly one expression.
    pub(crate) fn parse_sub_expression(&self, tokens: &[Token], line: usize) -> Result<Expression, ParseError> {
        if tokens.is_empty() {
            return Err(ParseError::new("expected expression", line));
        }
        let mut sub = TokenStream::new(tokens);
        let expr = self.parse_expression(&mut sub, TokenSet::EMPTY)?;
        if !sub.is_at_end() {
            return Err(Self::unexpected(&sub, "end of expression"));
        }
        Ok(expr)
    }

    // ===== Leaf collection =====

    fn collect(&self, stream: &mut TokenStream, stop: TokenSet) -> Result<Vec<Pending>, ParseError> {
        let mut pending: Vec<Pending> = Vec::new();
        let mut expect_operand = true;

        while let Some(token) = stream.peek() {
            if stop.contains(token.kind) {
                break;
            }
            stream.read();

            if expect_operand {
                if matches!(
                    token.kind,
                    TokenKind::Subtract
                        | TokenKind::LogicalNot
                        | TokenKind::Negate
                        | TokenKind::Increment
                        | TokenKind::Decrement
                ) {
                    pending.push(Pending::Op(token.clone()));
                    continue;
                }
                let leaf = self.parse_primand(stream, token)?;
                pending.push(Pending::Leaf(leaf));
                expect_operand = false;
                continue;
            }

            match token.kind {
                TokenKind::Dot => {
                    let target = Self::pop_operand(&mut pending, token)?;
                    let member = Self::parse_member_access(stream, target, token)?;
                    pending.push(Pending::Leaf(member));
                }
                TokenKind::OpenParen => {
                    let callee = Self::pop_operand(&mut pending, token)?;
                    let call = self.parse_call(stream, callee, token)?;
                    pending.push(Pending::Leaf(call));
                }
                TokenKind::OpenSquare => {
                    let target = Self::pop_operand(&mut pending, token)?;
                    let subscript = self.parse_subscript(stream, target, token)?;
                    pending.push(Pending::Leaf(subscript));
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    pending.push(Pending::Op(token.clone()));
                }
                TokenKind::Questionmark | TokenKind::Colon => {
                    pending.push(Pending::Op(token.clone()));
                    expect_operand = true;
                }
                _ => {
                    let op = binary_operator(token)
                        .ok_or_else(|| Self::unexpected_token(token, "operator"))?;
                    pending.push(Pending::Op(token.clone()));
                    if is_compound_assignable(op) {
                        if let Some(assign) = stream.expect(TokenKind::Assign) {
                            pending.push(Pending::Op(assign.clone()));
                        }
                    }
                    expect_operand = true;
                }
            }
        }

        if pending.is_empty() {
            return Err(Self::unexpected(stream, "expression"));
        }
        Ok(pending)
    }

    fn pop_operand(pending: &mut Vec<Pending>, at: &Token) -> Result<Leaf, ParseError> {
        match pending.pop() {
            Some(Pending::Leaf(leaf)) => Ok(leaf),
            _ => Err(Self::unexpected_token(at, "operand")),
        }
    }

    fn parse_primand(&self, stream: &mut TokenStream, token: &Token) -> Result<Leaf, ParseError> {
        match token.kind {
            TokenKind::Integer => Ok(Leaf::Integer(token.clone())),
            TokenKind::Double => Ok(Leaf::Double(token.clone())),
            TokenKind::String | TokenKind::Name => Ok(Leaf::String(token.clone())),
            TokenKind::OpenCurly => {
                let inner = stream.consume_balanced(TokenSet::EMPTY);
                let close = Self::expect(stream, TokenKind::CloseCurly, "'}'")?;
                let mut init = Expression::new(Operator::ArrayInitialization);
                init.special.push(token.clone());
                let (parts, commas) = Self::split_arguments(&inner)?;
                let count = parts.len();
                for (index, part) in parts.iter().enumerate() {
                    // `{}` and a trailing comma
                    if part.is_empty() && index + 1 == count {
                        continue;
                    }
                    init.leaves.push(boxed(self.parse_sub_expression(part, token.line)?));
                }
                init.special.extend(commas);
                init.special.push(close.clone());
                Ok(boxed(init))
            }
            TokenKind::OpenParen => {
                let inner = stream.consume_balanced(TokenSet::EMPTY);
                let close = Self::expect(stream, TokenKind::CloseParen, "')'")?;
                let (parts, commas) = Self::split_arguments(&inner)?;
                let mut expr = if parts.len() > 1 {
                    let mut vector = Expression::new(Operator::VectorInitialization);
                    for part in &parts {
                        vector.leaves.push(boxed(self.parse_sub_expression(part, token.line)?));
                    }
                    vector.special.extend(commas);
                    vector
                } else {
                    self.parse_sub_expression(&inner, token.line)?
                };
                expr.special.push(token.clone());
                expr.special.push(close.clone());
                Ok(boxed(expr))
            }
            TokenKind::Identifier => {
                if token.is_keyword("true") || token.is_keyword("false") {
                    return Ok(Leaf::Boolean(token.clone()));
                }
                if self.universe.system.is_numeric(&token.text) && stream.check(TokenKind::OpenParen) {
                    let start = stream.position();
                    match self.parse_cast(stream, token) {
                        Ok(cast) => return Ok(cast),
                        Err(_) => stream.set_position(start),
                    }
                }
                Ok(Leaf::Identifier(token.clone()))
            }
            _ => Err(Self::unexpected_token(token, "expression")),
        }
    }

    /// `type(expr)` with exactly one inner expression.
    fn parse_cast(&self, stream: &mut TokenStream, type_token: &Token) -> Result<Leaf, ParseError> {
        let open = Self::expect(stream, TokenKind::OpenParen, "'('")?;
        let inner = stream.consume_balanced(TokenSet::EMPTY);
        let close = Self::expect(stream, TokenKind::CloseParen, "')'")?;
        let value = self.parse_sub_expression(&inner, open.line)?;

        let mut cast = Expression::new(Operator::Cast);
        cast.leaves.push(Leaf::Identifier(type_token.clone()));
        cast.leaves.push(boxed(value));
        cast.special.push(open.clone());
        cast.special.push(close.clone());
        Ok(boxed(cast))
    }

    /// Split a token run on depth-zero commas.
    fn split_arguments(tokens: &[Token]) -> Result<(Vec<Vec<Token>>, Vec<Token>), ParseError> {
        let mut stream = TokenStream::new(tokens);
        let mut parts = Vec::new();
        let mut commas = Vec::new();
        loop {
            parts.push(stream.consume_balanced(TokenKind::Comma));
            match stream.read() {
                Some(token) if token.kind == TokenKind::Comma => commas.push(token.clone()),
                Some(token) => return Err(Self::unexpected_token(token, "','")),
                None => break,
            }
        }
        Ok((parts, commas))
    }

    fn parse_member_access(stream: &mut TokenStream, target: Leaf, dot: &Token) -> Result<Leaf, ParseError> {
        let mut member = Expression::new(Operator::Member);
        member.leaves.push(target);
        member.special.push(dot.clone());
        loop {
            let name = Self::expect_identifier(stream, "member name")?;
            member.leaves.push(Leaf::Identifier(name.clone()));
            match stream.expect(TokenKind::Dot) {
                Some(next) => member.special.push(next.clone()),
                None => break,
            }
        }
        Ok(boxed(member))
    }

    fn parse_call(&self, stream: &mut TokenStream, callee: Leaf, open: &Token) -> Result<Leaf, ParseError> {
        let mut call = Expression::new(Operator::Call);
        call.leaves.push(callee);
        call.special.push(open.clone());

        loop {
            let argument = stream.consume_balanced(TokenKind::Comma | TokenKind::CloseParen);
            let separator = Self::expect(stream, TokenKind::Comma | TokenKind::CloseParen, "',' or ')'")?;

            if argument.is_empty() {
                if separator.kind == TokenKind::Comma || call.leaves.len() > 1 {
                    return Err(ParseError::new("empty call argument", separator.line));
                }
            } else {
                // named argument `name: value`
                let value = if argument.len() > 2
                    && argument[0].kind == TokenKind::Identifier
                    && argument[1].kind == TokenKind::Colon
                {
                    call.special.push(argument[0].clone());
                    call.special.push(argument[1].clone());
                    &argument[2..]
                } else {
                    &argument[..]
                };
                call.leaves.push(boxed(self.parse_sub_expression(value, separator.line)?));
            }

            call.special.push(separator.clone());
            if separator.kind == TokenKind::CloseParen {
                break;
            }
        }
        Ok(boxed(call))
    }

    fn parse_subscript(&self, stream: &mut TokenStream, target: Leaf, open: &Token) -> Result<Leaf, ParseError> {
        let mut subscript = Expression::new(Operator::ArraySubscript);
        subscript.leaves.push(target);
        subscript.special.push(open.clone());
        loop {
            let index = stream.consume_balanced(TokenKind::CloseSquare);
            let close = Self::expect(stream, TokenKind::CloseSquare, "']'")?;
            subscript.leaves.push(boxed(self.parse_sub_expression(&index, close.line)?));
            subscript.special.push(close.clone());
            match stream.expect(TokenKind::OpenSquare) {
                Some(next) => subscript.special.push(next.clone()),
                None => break,
            }
        }
        Ok(boxed(subscript))
    }

    // ===== Reduction =====

    fn reduce(mut pending: Vec<Pending>, line: usize) -> Result<Expression, ParseError> {
        for pass in PASSES {
            match pass {
                Pass::Binary(family) => Self::reduce_binary(&mut pending, family),
                Pass::Postfix => Self::reduce_postfix(&mut pending),
                Pass::Prefix => Self::reduce_prefix(&mut pending),
                Pass::Unary => Self::reduce_unary(&mut pending),
                Pass::Ternary => Self::reduce_ternary(&mut pending)?,
                Pass::Assign => Self::reduce_assign(&mut pending),
            }
        }

        if pending.len() != 1 || !pending[0].is_operand() {
            let line = pending
                .iter()
                .find_map(|p| match p {
                    Pending::Op(token) => Some(token.line),
                    Pending::Leaf(_) => None,
                })
                .unwrap_or(line);
            return Err(ParseError::new("malformed expression", line));
        }
        let leaf = into_leaf(pending.remove(0));
        Ok(into_expression(leaf))
    }

    fn op_at(pending: &[Pending], i: usize) -> Option<&Token> {
        match pending.get(i) {
            Some(Pending::Op(token)) => Some(token),
            _ => None,
        }
    }

    fn operand_at(pending: &[Pending], i: usize) -> bool {
        pending.get(i).is_some_and(Pending::is_operand)
    }

    /// Replace `pending[i - 1 ..= i + 1]` with `left op right`.
    fn merge_binary(pending: &mut Vec<Pending>, i: usize, op: Operator, assign: bool, extra: usize) {
        let removed: Vec<Pending> = pending.drain(i - 1..=i + 1 + extra).collect();
        let mut left = None;
        let mut right = None;
        let mut operators = Vec::new();
        for (k, entry) in removed.into_iter().enumerate() {
            match entry {
                Pending::Op(token) => operators.push(token),
                Pending::Leaf(leaf) if k == 0 => left = Some(leaf),
                Pending::Leaf(leaf) => right = Some(leaf),
            }
        }
        let (Some(left), Some(right)) = (left, right) else {
            return;
        };
        let mut expr = Expression::with_leaves(op, vec![left, right]);
        expr.operators = operators;
        expr.assign = assign;
        pending.insert(i - 1, Pending::Leaf(boxed(expr)));
    }

    fn reduce_binary(pending: &mut Vec<Pending>, family: &[Operator]) {
        let mut i = 1;
        while i + 1 < pending.len() {
            let Some(token) = Self::op_at(pending, i) else {
                i += 1;
                continue;
            };
            let Some(op) = binary_operator(token) else {
                i += 1;
                continue;
            };
            let compound = is_compound_assignable(op)
                && pending.get(i + 1).is_some_and(|p| p.is_op(TokenKind::Assign));
            if compound
                || !family.contains(&op)
                || !Self::operand_at(pending, i - 1)
                || !Self::operand_at(pending, i + 1)
            {
                i += 1;
                continue;
            }
            Self::merge_binary(pending, i, op, false, 0);
            // the merged node sits at i - 1, the next operator at i
        }
    }

    fn reduce_postfix(pending: &mut Vec<Pending>) {
        let mut i = 1;
        while i < pending.len() {
            let op = match Self::op_at(pending, i).map(|t| t.kind) {
                Some(TokenKind::Increment) => Operator::PostIncrement,
                Some(TokenKind::Decrement) => Operator::PostDecrement,
                _ => {
                    i += 1;
                    continue;
                }
            };
            if !Self::operand_at(pending, i - 1) {
                i += 1;
                continue;
            }
            let token = pending.remove(i);
            let target = into_leaf(pending.remove(i - 1));
            let mut expr = Expression::with_leaves(op, vec![target]);
            if let Pending::Op(token) = token {
                expr.operators.push(token);
            }
            pending.insert(i - 1, Pending::Leaf(boxed(expr)));
        }
    }

    /// Fold `op operand` right to left for operators selected by `pick`.
    fn reduce_prefix_with(pending: &mut Vec<Pending>, pick: impl Fn(&Token) -> Option<Operator>) {
        let mut i = pending.len();
        while i > 0 {
            i -= 1;
            let Some(op) = Self::op_at(pending, i).and_then(&pick) else {
                continue;
            };
            if !Self::operand_at(pending, i + 1) || (i > 0 && Self::operand_at(pending, i - 1)) {
                continue;
            }
            let target = into_leaf(pending.remove(i + 1));
            let token = pending.remove(i);
            let mut expr = Expression::with_leaves(op, vec![target]);
            if let Pending::Op(token) = token {
                expr.operators.push(token);
            }
            pending.insert(i, Pending::Leaf(boxed(expr)));
        }
    }

    fn reduce_prefix(pending: &mut Vec<Pending>) {
        Self::reduce_prefix_with(pending, |token| match token.kind {
            TokenKind::Increment => Some(Operator::PreIncrement),
            TokenKind::Decrement => Some(Operator::PreDecrement),
            _ => None,
        });
    }

    fn reduce_unary(pending: &mut Vec<Pending>) {
        Self::reduce_prefix_with(pending, |token| match token.kind {
            TokenKind::Negate => Some(Operator::UnaryNeg),
            TokenKind::LogicalNot => Some(Operator::UnaryNot),
            TokenKind::Subtract => Some(Operator::UnaryMinus),
            _ => None,
        });
    }

    fn reduce_ternary(pending: &mut Vec<Pending>) -> Result<(), ParseError> {
        let mut i = pending.len();
        while i > 0 {
            i -= 1;
            let Some(question) = Self::op_at(pending, i) else {
                continue;
            };
            if question.kind != TokenKind::Questionmark {
                continue;
            }
            let shaped = i > 0
                && Self::operand_at(pending, i - 1)
                && Self::operand_at(pending, i + 1)
                && pending.get(i + 2).is_some_and(|p| p.is_op(TokenKind::Colon))
                && Self::operand_at(pending, i + 3);
            if !shaped {
                return Err(ParseError::new("malformed ternary expression", question.line));
            }
            let mut parts: Vec<Pending> = pending.drain(i - 1..=i + 3).collect();
            let otherwise = into_leaf(parts.remove(4));
            let colon = parts.remove(3);
            let then = into_leaf(parts.remove(2));
            let question = parts.remove(1);
            let condition = into_leaf(parts.remove(0));

            let mut expr = Expression::with_leaves(Operator::Ternary, vec![condition, then, otherwise]);
            for token in [question, colon] {
                if let Pending::Op(token) = token {
                    expr.operators.push(token);
                }
            }
            pending.insert(i - 1, Pending::Leaf(boxed(expr)));
            i -= 1;
        }
        Ok(())
    }

    fn reduce_assign(pending: &mut Vec<Pending>) {
        let mut i = pending.len();
        while i > 1 {
            i -= 1;
            let Some(token) = Self::op_at(pending, i) else {
                continue;
            };
            let Some(op) = binary_operator(token) else {
                continue;
            };
            let compound = is_compound_assignable(op)
                && pending.get(i + 1).is_some_and(|p| p.is_op(TokenKind::Assign));
            let extra = usize::from(compound);
            if !(compound || op == Operator::Assign)
                || !Self::operand_at(pending, i - 1)
                || !Self::operand_at(pending, i + 1 + extra)
            {
                continue;
            }
            Self::merge_binary(pending, i, op, compound, extra);
            i -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::FileId;
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::ParsedFile;
    use crate::parser::system_types::SystemTypes;
    use crate::resolver::{TypeIndex, Universe};

    fn significant(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .collect()
    }

    fn parse_with_position(source: &str) -> (Result<Expression, ParseError>, usize) {
        let tokens = significant(source);
        let system = SystemTypes::new();
        let index = TypeIndex::default();
        let universe = Universe::detached(&index, &system);
        let mut file = ParsedFile::empty(FileId(0), Vec::new());
        let parser = Parser::new(&mut file, &universe);
        let mut stream = TokenStream::new(&tokens);
        let result = parser.parse_expression(&mut stream, TokenKind::Semicolon);
        (result, stream.position())
    }

    fn parse(source: &str) -> Expression {
        parse_with_position(source).0.unwrap()
    }

    fn sub(expr: &Expression, index: usize) -> &Expression {
        expr.leaves[index].expression().unwrap()
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = parse("1 + 2 * 3");
        assert_eq!(expr.op, Operator::Add);
        assert!(matches!(expr.leaves[0], Leaf::Integer(_)));
        assert_eq!(sub(&expr, 1).op, Operator::Mul);
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse("8 / 4 * 2");
        assert_eq!(expr.op, Operator::Mul);
        assert_eq!(sub(&expr, 0).op, Operator::Div);
    }

    #[test]
    fn test_stops_before_stop_token() {
        let (result, position) = parse_with_position("a + b; c");
        assert!(result.is_ok());
        assert_eq!(position, 3);
    }

    #[test]
    fn test_failure_restores_position() {
        let (result, position) = parse_with_position("a + ; b");
        assert!(result.is_err());
        assert_eq!(position, 0);

        let (result, position) = parse_with_position("a b");
        assert!(result.is_err());
        assert_eq!(position, 0);
    }

    #[test]
    fn test_bare_identifier_and_literal() {
        assert_eq!(parse("x").op, Operator::Identifier);
        assert_eq!(parse("4").op, Operator::Literal);
        assert_eq!(parse("\"s\"").op, Operator::Literal);
    }

    #[test]
    fn test_unary_minus() {
        let expr = parse("-x * 2");
        assert_eq!(expr.op, Operator::Mul);
        assert_eq!(sub(&expr, 0).op, Operator::UnaryMinus);

        let expr = parse("2 - -3");
        assert_eq!(expr.op, Operator::Sub);
        assert_eq!(sub(&expr, 1).op, Operator::UnaryMinus);

        let expr = parse("!-x");
        assert_eq!(expr.op, Operator::UnaryNot);
        assert_eq!(sub(&expr, 0).op, Operator::UnaryMinus);
    }

    #[test]
    fn test_increments() {
        assert_eq!(parse("i++").op, Operator::PostIncrement);
        assert_eq!(parse("--i").op, Operator::PreDecrement);
        let expr = parse("a++ + ++b");
        assert_eq!(expr.op, Operator::Add);
        assert_eq!(sub(&expr, 0).op, Operator::PostIncrement);
        assert_eq!(sub(&expr, 1).op, Operator::PreIncrement);
    }

    #[test]
    fn test_compound_assignment() {
        let expr = parse("a += b * 2");
        assert_eq!(expr.op, Operator::Add);
        assert!(expr.assign);
        assert_eq!(expr.operators.len(), 2);
        assert_eq!(sub(&expr, 1).op, Operator::Mul);

        let expr = parse("a <<= 1");
        assert_eq!(expr.op, Operator::BitShl);
        assert!(expr.assign);
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse("a = b = c");
        assert_eq!(expr.op, Operator::Assign);
        assert!(!expr.assign);
        assert!(matches!(expr.leaves[0], Leaf::Identifier(_)));
        assert_eq!(sub(&expr, 1).op, Operator::Assign);
    }

    #[test]
    fn test_ternary() {
        let expr = parse("a ? b : c ? d : e");
        assert_eq!(expr.op, Operator::Ternary);
        assert_eq!(expr.leaves.len(), 3);
        assert_eq!(sub(&expr, 2).op, Operator::Ternary);

        let expr = parse("x = a > b ? a : b");
        assert_eq!(expr.op, Operator::Assign);
        assert_eq!(sub(&expr, 1).op, Operator::Ternary);
    }

    #[test]
    fn test_logical_precedence() {
        let expr = parse("a || b && c");
        assert_eq!(expr.op, Operator::LogicalOr);
        assert_eq!(sub(&expr, 1).op, Operator::LogicalAnd);
    }

    #[test]
    fn test_comparisons_share_one_level() {
        let expr = parse("a == b < c");
        assert_eq!(expr.op, Operator::CmpLT);
        assert_eq!(sub(&expr, 0).op, Operator::CmpEq);

        let expr = parse("a < b != c");
        assert_eq!(expr.op, Operator::CmpNotEq);
        assert_eq!(sub(&expr, 0).op, Operator::CmpLT);
    }

    #[test]
    fn test_member_call_subscript() {
        let expr = parse("self.target.GetAge(1, 2)[0]");
        assert_eq!(expr.op, Operator::ArraySubscript);
        let call = sub(&expr, 0);
        assert_eq!(call.op, Operator::Call);
        assert_eq!(call.leaves.len(), 3);
        let member = sub(call, 0);
        assert_eq!(member.op, Operator::Member);
        assert_eq!(member.leaves.len(), 3);
    }

    #[test]
    fn test_call_without_arguments() {
        let expr = parse("Destroy()");
        assert_eq!(expr.op, Operator::Call);
        assert_eq!(expr.leaves.len(), 1);
        assert!(parse_with_position("f(a,,b)").0.is_err());
    }

    #[test]
    fn test_named_argument() {
        let expr = parse("A_SpawnItemEx(\"Smoke\", flags: 4)");
        assert_eq!(expr.op, Operator::Call);
        assert_eq!(expr.leaves.len(), 3);
        assert!(expr.special.iter().any(|t| t.text == "flags"));
    }

    #[test]
    fn test_vector_and_array_initializers() {
        let expr = parse("(1, 2, 3)");
        assert_eq!(expr.op, Operator::VectorInitialization);
        assert_eq!(expr.leaves.len(), 3);

        let expr = parse("{1, 2,}");
        assert_eq!(expr.op, Operator::ArrayInitialization);
        assert_eq!(expr.leaves.len(), 2);

        assert_eq!(parse("{}").leaves.len(), 0);
    }

    #[test]
    fn test_parenthesized() {
        let expr = parse("(1 + 2) * 3");
        assert_eq!(expr.op, Operator::Mul);
        assert_eq!(sub(&expr, 0).op, Operator::Add);
    }

    #[test]
    fn test_casts() {
        let expr = parse("int(3.7)");
        assert_eq!(expr.op, Operator::Cast);

        // not a single expression, so an ordinary call
        let expr = parse("color(255, 0, 0)");
        assert_eq!(expr.op, Operator::Call);
    }

    #[test]
    fn test_vector_products() {
        let expr = parse("a dot b + 1");
        assert_eq!(expr.op, Operator::Add);
        assert_eq!(sub(&expr, 0).op, Operator::VectorDot);
    }

    #[test]
    fn test_concat() {
        let expr = parse("\"a\" .. b");
        assert_eq!(expr.op, Operator::Concat);
    }

    proptest::proptest! {
        #[test]
        fn prop_failed_parse_consumes_nothing(words in proptest::collection::vec(
            proptest::sample::select(vec![
                "a", "1", "2.5", "\"s\"", "+", "-", "*", "=", "+=", "==", "!", "++",
                "(", ")", "[", "]", "{", "}", ".", ",", "?", ":", "dot", "int",
            ]),
            0..16,
        )) {
            let source = words.join(" ");
            let (result, position) = parse_with_position(&source);
            if result.is_err() {
                proptest::prop_assert_eq!(position, 0);
            }
        }
    }
}
