//! Semantic tagging of expressions
//!
//! Every leaf of an expression gets a semantic token, and every node gets a
//! static result type when one can be derived. Types flow bottom-up: a call
//! takes its callee's return type, a member chain narrows the lookup scope
//! one link at a time, a comparison is always `bool`.
//!
//! A member chain stops at the first link that cannot be found. That link is
//! marked `Invalid`; the links after it are left untagged.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::Parser;
use crate::parser::semantic::SemanticKind;
use crate::parser::system_types::SystemKind;

/// Where an expression sits: the innermost node (for locals) and the
/// enclosing type (for members).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Scope {
    pub node: Option<NodeId>,
    pub context: Option<DeclRef>,
}

fn is_comparison(op: Operator) -> bool {
    matches!(
        op,
        Operator::CmpLT
            | Operator::CmpGT
            | Operator::CmpLTEQ
            | Operator::CmpGTEQ
            | Operator::CmpEq
            | Operator::CmpNotEq
            | Operator::CmpSomewhatEq
            | Operator::LogicalAnd
            | Operator::LogicalOr
            | Operator::UnaryNot
    )
}

/// Semantic kind of a reference to `node`.
fn kind_of(node: &Node, parent: Option<&Node>) -> SemanticKind {
    match &node.kind {
        NodeKind::Field(_) | NodeKind::Property(_) => SemanticKind::Field,
        NodeKind::Method(_) => SemanticKind::Method,
        NodeKind::Constant(_) => SemanticKind::ConstantName,
        NodeKind::LocalVariable(_) => match parent.map(|p| &p.kind) {
            Some(NodeKind::Method(_)) => SemanticKind::Argument,
            _ => SemanticKind::Local,
        },
        NodeKind::Class(_) | NodeKind::Struct(_) | NodeKind::Enum(_) => SemanticKind::TypeName,
        _ => SemanticKind::Local,
    }
}

impl<'a> Parser<'a> {
    /// Tag `expr` and everything below it. Returns and stores its result type.
    pub(crate) fn highlight_expression(&mut self, expr: &mut Expression, scope: Scope) -> Option<CompoundType> {
        for token in &expr.operators {
            self.emit(token, SemanticKind::Operator);
        }
        for token in &expr.special {
            // named call arguments
            let kind = if token.kind == TokenKind::Identifier {
                SemanticKind::Argument
            } else {
                SemanticKind::SpecialToken
            };
            self.emit(token, kind);
        }

        let result = match expr.op {
            Operator::Identifier | Operator::Literal => self.highlight_leaves(&mut expr.leaves, scope).into_iter().next().flatten(),
            Operator::Member => self.highlight_member(&mut expr.leaves, scope),
            Operator::Call => self.highlight_call(&mut expr.leaves, scope),
            Operator::Cast => self.highlight_cast(&mut expr.leaves, scope),
            Operator::ArraySubscript => {
                let types = self.highlight_leaves(&mut expr.leaves, scope);
                let dimensions = expr.leaves.len().saturating_sub(1);
                types.into_iter().next().flatten().and_then(|ty| self.element_type(ty, dimensions))
            }
            Operator::Ternary => {
                let types = self.highlight_leaves(&mut expr.leaves, scope);
                types.into_iter().nth(1).flatten()
            }
            Operator::Concat => {
                self.highlight_leaves(&mut expr.leaves, scope);
                self.system_type("string")
            }
            Operator::VectorDot => {
                self.highlight_leaves(&mut expr.leaves, scope);
                self.system_type("double")
            }
            Operator::VectorCross => {
                self.highlight_leaves(&mut expr.leaves, scope);
                self.system_type("vector3")
            }
            Operator::VectorInitialization => {
                self.highlight_leaves(&mut expr.leaves, scope);
                match expr.leaves.len() {
                    2 => self.system_type("vector2"),
                    3 => self.system_type("vector3"),
                    _ => None,
                }
            }
            Operator::ArrayInitialization => {
                self.highlight_leaves(&mut expr.leaves, scope);
                None
            }
            op if is_comparison(op) => {
                self.highlight_leaves(&mut expr.leaves, scope);
                self.system_type("bool")
            }
            Operator::CmpSpaceship => {
                self.highlight_leaves(&mut expr.leaves, scope);
                self.system_type("int")
            }
            // arithmetic, bitwise, assignment and increments take the left operand's type
            _ => self.highlight_leaves(&mut expr.leaves, scope).into_iter().next().flatten(),
        };

        expr.result_type = result.clone();
        result
    }

    fn highlight_leaves(&mut self, leaves: &mut [Leaf], scope: Scope) -> Vec<Option<CompoundType>> {
        leaves
            .iter_mut()
            .map(|leaf| self.highlight_leaf(leaf, scope))
            .collect()
    }

    fn highlight_leaf(&mut self, leaf: &mut Leaf, scope: Scope) -> Option<CompoundType> {
        match leaf {
            Leaf::Integer(token) => {
                self.emit(token, SemanticKind::Number);
                self.system_type("int")
            }
            Leaf::Double(token) => {
                self.emit(token, SemanticKind::Number);
                self.system_type("double")
            }
            Leaf::Boolean(token) => {
                self.emit(token, SemanticKind::Keyword);
                self.system_type("bool")
            }
            Leaf::String(token) => {
                self.emit(token, SemanticKind::String);
                let name = if token.kind == TokenKind::Name { "name" } else { "string" };
                self.system_type(name)
            }
            Leaf::Identifier(token) => self.highlight_identifier(token, scope),
            Leaf::Expression(expr) => self.highlight_expression(expr, scope),
        }
    }

    /// Emit a reference to `decl` and return its type.
    fn emit_decl(&mut self, token: &Token, decl: DeclRef) -> Option<CompoundType> {
        let node = self.node(decl)?;
        let parent = node.parent.and_then(|p| self.node(DeclRef::new(decl.file, p)));
        let kind = kind_of(node, parent);
        let name = match node.kind {
            NodeKind::LocalVariable(_) => node.identifier.clone(),
            _ => self.full_name(decl),
        };
        self.emit_ref(token, kind, Some(Target::Decl(decl)), name);
        self.type_of(decl)
    }

    fn highlight_identifier(&mut self, token: &Token, scope: Scope) -> Option<CompoundType> {
        if token.is_keyword("null") {
            self.emit(token, SemanticKind::Keyword);
            return None;
        }
        if token.is_keyword("self") || token.is_keyword("super") {
            let var = self.resolve_symbol(&token.text, scope.node, scope.context);
            let name = token.text.to_ascii_lowercase();
            self.emit_ref(token, SemanticKind::Keyword, var.map(Target::Decl), name);
            return var.and_then(|var| self.type_of(var));
        }

        if let Some(decl) = self.resolve_symbol(&token.text, scope.node, scope.context) {
            return self.emit_decl(token, decl);
        }
        if let Some(decl) = self.resolve_type(&token.text, scope.context) {
            return self.emit_decl(token, decl);
        }
        if let Some(index) = self.universe.system.find(&token.text) {
            let name = token.text.to_ascii_lowercase();
            self.emit_ref(token, SemanticKind::TypeName, Some(Target::System(index)), name.clone());
            return Some(CompoundType::named(name, Some(Target::System(index))));
        }

        self.emit_ref(token, SemanticKind::Invalid, None, token.text.clone());
        self.warn(format!("unresolved identifier '{}'", token.text), token.line);
        None
    }

    /// `target.a.b`: each link is looked up in the type of the one before.
    fn highlight_member(&mut self, leaves: &mut [Leaf], scope: Scope) -> Option<CompoundType> {
        let (target, links) = leaves.split_first_mut()?;
        let mut current = self.highlight_leaf(target, scope);

        for link in links.iter() {
            let Leaf::Identifier(name) = link else {
                return None;
            };
            // an untyped value cannot be followed, but it is not an error either
            let owner = current.as_ref().and_then(|ty| self.type_scope(ty))?;

            let found = self
                .find_member_in_chain(owner, &name.text)
                .or_else(|| self.find_nested_type(owner, &name.text));
            match found {
                Some(decl) => current = self.emit_decl(name, decl),
                None => {
                    let owner_name = self.full_name(owner);
                    self.emit_ref(name, SemanticKind::Invalid, None, format!("{}.{}", owner_name, name.text));
                    self.warn(
                        format!("unresolved member '{}' in '{}'", name.text, owner_name),
                        name.line,
                    );
                    return None;
                }
            }
        }
        current
    }

    /// Calls take the callee's type. `new("T")` and `new('T')` yield `T`.
    fn highlight_call(&mut self, leaves: &mut [Leaf], scope: Scope) -> Option<CompoundType> {
        let (callee, arguments) = leaves.split_first_mut()?;

        if let Leaf::Identifier(keyword) = callee {
            if keyword.is_keyword("new") {
                self.emit(keyword, SemanticKind::Keyword);
                return self.highlight_new(arguments, scope);
            }
        }

        let result = self.highlight_leaf(callee, scope);
        self.highlight_leaves(arguments, scope);
        result
    }

    fn highlight_new(&mut self, arguments: &mut [Leaf], scope: Scope) -> Option<CompoundType> {
        let class_name = arguments.first().and_then(|leaf| match leaf {
            Leaf::Expression(expr) if expr.op == Operator::Literal => match expr.leaves.first() {
                Some(Leaf::String(token)) => Some(token.clone()),
                _ => None,
            },
            _ => None,
        });

        let Some(token) = class_name else {
            self.highlight_leaves(arguments, scope);
            return None;
        };
        let name = token.content().to_string();
        match self.resolve_type(&name, scope.context) {
            Some(decl) => {
                let qualified = self.full_name(decl);
                self.emit_ref(&token, SemanticKind::TypeName, Some(Target::Decl(decl)), qualified.clone());
                Some(CompoundType::named(qualified, Some(Target::Decl(decl))))
            }
            None => {
                self.emit_ref(&token, SemanticKind::Invalid, None, name.clone());
                self.warn(format!("unresolved class '{}' in new()", name), token.line);
                None
            }
        }
    }

    fn highlight_cast(&mut self, leaves: &mut [Leaf], scope: Scope) -> Option<CompoundType> {
        let (target, value) = leaves.split_first_mut()?;
        self.highlight_leaves(value, scope);
        let Leaf::Identifier(token) = target else {
            return None;
        };
        let name = token.text.to_ascii_lowercase();
        let ty = self.system_type(&name);
        self.emit_ref(token, SemanticKind::TypeName, ty.as_ref().and_then(|t| t.reference), name);
        ty
    }

    /// Type after `count` subscripts.
    fn element_type(&self, mut ty: CompoundType, count: usize) -> Option<CompoundType> {
        for _ in 0..count {
            if ty.dimensions.pop().is_some() {
                continue;
            }
            let is_container = match ty.reference {
                Some(Target::System(index)) => self
                    .universe
                    .system
                    .get(index)
                    .is_some_and(|system| system.kind == SystemKind::Array),
                _ => false,
            };
            if !is_container {
                return None;
            }
            // array<T> gives T, map<K, V> gives V
            ty = ty.arguments.pop()?;
        }
        Some(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::ParsedFile;
    use crate::parser::stream::{TokenSet, TokenStream};
    use crate::parser::system_types::SystemTypes;
    use crate::resolver::{TypeIndex, Universe};

    struct Highlighted {
        tokens: Vec<(String, SemanticKind)>,
        result: Option<CompoundType>,
        warnings: Vec<String>,
    }

    impl Highlighted {
        fn kind_of(&self, text: &str) -> Option<SemanticKind> {
            self.tokens.iter().rev().find(|(t, _)| t == text).map(|(_, kind)| *kind)
        }
    }

    /// Highlight `expr` inside class `class` of `source`.
    fn highlight(source: &str, class: Option<&str>, expr: &str) -> Highlighted {
        let system = SystemTypes::new();
        let mut file = ParsedFile::parse(FileId(0), source, &system);
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        file.parse_fields(&universe);
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        file.set_type_information(&universe);

        let context = class.and_then(|name| file.find(name)).map(|id| DeclRef::new(FileId(0), id));
        let semantic_start = file.semantic.len();
        let diagnostic_start = file.diagnostics.len();
        let tokens: Vec<Token> = Lexer::new(expr)
            .tokenize()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .collect();

        let mut parser = Parser::new(&mut file, &universe);
        let mut stream = TokenStream::new(&tokens);
        let mut parsed = parser.parse_expression(&mut stream, TokenSet::EMPTY).unwrap();
        let result = parser.highlight_expression(&mut parsed, Scope { node: None, context });

        Highlighted {
            tokens: file.semantic[semantic_start..]
                .iter()
                .map(|t| (expr[t.start..t.end].to_string(), t.kind))
                .collect(),
            result,
            warnings: file.diagnostics[diagnostic_start..]
                .iter()
                .map(|d| d.message.clone())
                .collect(),
        }
    }

    const SOURCE: &str = "
        struct StringStruct { native int Length(); }
        enum EColor { CR_RED, CR_BLUE }
        class B { int v; double Get() { } }
        class A { B b; string s; int x; array<B> list; }
    ";

    #[test]
    fn test_field_reference() {
        let h = highlight(SOURCE, Some("A"), "x");
        assert_eq!(h.kind_of("x"), Some(SemanticKind::Field));
        assert_eq!(h.result.map(|t| t.name), Some("int".to_string()));
        assert!(h.warnings.is_empty());
    }

    #[test]
    fn test_unknown_identifier_is_invalid() {
        let h = highlight(SOURCE, Some("A"), "nothing + 1");
        assert_eq!(h.kind_of("nothing"), Some(SemanticKind::Invalid));
        assert_eq!(h.kind_of("+"), Some(SemanticKind::Operator));
        assert_eq!(h.warnings, vec!["unresolved identifier 'nothing'".to_string()]);
    }

    #[test]
    fn test_member_chain() {
        let h = highlight(SOURCE, Some("A"), "b.v");
        assert_eq!(h.kind_of("b"), Some(SemanticKind::Field));
        assert_eq!(h.kind_of("v"), Some(SemanticKind::Field));
        assert_eq!(h.result.map(|t| t.name), Some("int".to_string()));
    }

    #[test]
    fn test_broken_chain_stops_tagging() {
        let h = highlight(SOURCE, Some("A"), "b.nope.v");
        assert_eq!(h.kind_of("nope"), Some(SemanticKind::Invalid));
        assert_eq!(h.kind_of("v"), None);
        assert!(h.result.is_none());
        assert_eq!(h.warnings.len(), 1);
    }

    #[test]
    fn test_call_result_type() {
        let h = highlight(SOURCE, Some("A"), "b.Get() < 2");
        assert_eq!(h.kind_of("Get"), Some(SemanticKind::Method));
        assert_eq!(h.result.map(|t| t.name), Some("bool".to_string()));
    }

    #[test]
    fn test_string_methods_come_from_wrapper() {
        let h = highlight(SOURCE, Some("A"), "s.Length()");
        assert_eq!(h.kind_of("Length"), Some(SemanticKind::Method));
        assert_eq!(h.result.map(|t| t.name), Some("int".to_string()));
    }

    #[test]
    fn test_new_with_class_name() {
        let h = highlight(SOURCE, Some("A"), "new(\"b\")");
        assert_eq!(h.kind_of("new"), Some(SemanticKind::Keyword));
        assert_eq!(h.kind_of("\"b\""), Some(SemanticKind::TypeName));
        assert_eq!(h.result.map(|t| t.name), Some("B".to_string()));

        let h = highlight(SOURCE, Some("A"), "new('Missing')");
        assert_eq!(h.kind_of("'Missing'"), Some(SemanticKind::Invalid));
    }

    #[test]
    fn test_enum_members_and_globals() {
        let h = highlight(SOURCE, None, "EColor.CR_BLUE == CR_RED");
        assert_eq!(h.kind_of("EColor"), Some(SemanticKind::TypeName));
        assert_eq!(h.kind_of("CR_BLUE"), Some(SemanticKind::ConstantName));
        assert_eq!(h.kind_of("CR_RED"), Some(SemanticKind::ConstantName));
    }

    #[test]
    fn test_cast_and_literals() {
        let h = highlight(SOURCE, None, "int(2.5) + 1");
        assert_eq!(h.kind_of("int"), Some(SemanticKind::TypeName));
        assert_eq!(h.kind_of("2.5"), Some(SemanticKind::Number));
        assert_eq!(h.result.map(|t| t.name), Some("int".to_string()));

        let h = highlight(SOURCE, None, "\"a\" .. 1");
        assert_eq!(h.result.map(|t| t.name), Some("string".to_string()));
    }

    #[test]
    fn test_subscript_element_type() {
        let h = highlight(SOURCE, Some("A"), "list[0].v");
        assert_eq!(h.kind_of("list"), Some(SemanticKind::Field));
        assert_eq!(h.kind_of("v"), Some(SemanticKind::Field));
    }

    #[test]
    fn test_self_is_keyword() {
        let h = highlight(SOURCE, Some("A"), "self.x");
        assert_eq!(h.kind_of("self"), Some(SemanticKind::Keyword));
        assert_eq!(h.kind_of("x"), Some(SemanticKind::Field));
    }
}
