//! Syntax tree definitions
//!
//! Nodes live in a per-file [`SyntaxTree`] arena and refer to each other by
//! [`NodeId`]. Every node carries the shared header (identifier, parent,
//! ordered children, validity, error) and a [`NodeKind`] payload.
//!
//! Links that leave the file (class parents, resolved symbols, semantic token
//! targets) are [`DeclRef`] handles, a `(FileId, NodeId)` pair looked up
//! through the project's type universe. Nothing holds a second owning
//! reference to a node.

use super::lexer::Token;
use std::ops::{Index, IndexMut};

/// Index of a node inside its file's arena
pub type NodeId = usize;

/// Index of a document inside the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(pub usize);

/// Handle to a declaration anywhere in the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub file: FileId,
    pub node: NodeId,
}

impl DeclRef {
    pub fn new(file: FileId, node: NodeId) -> Self {
        Self { file, node }
    }
}

/// What a type name or a semantic token points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Decl(DeclRef),
    /// Index into the builtin type catalog.
    System(usize),
}

impl Target {
    pub fn decl(self) -> Option<DeclRef> {
        match self {
            Target::Decl(decl) => Some(decl),
            Target::System(_) => None,
        }
    }
}

/// A possibly generic, possibly array type reference
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundType {
    /// Dotted name as written, lowercased for builtin types.
    pub name: String,
    pub reference: Option<Target>,
    pub arguments: Vec<CompoundType>,
    /// One entry per `[...]` suffix, `None` for `[]`.
    pub dimensions: Vec<Option<Expression>>,
}

impl CompoundType {
    pub fn named(name: impl Into<String>, reference: Option<Target>) -> Self {
        Self {
            name: name.into(),
            reference,
            ..Default::default()
        }
    }
}

/// Shared payload of classes and structs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDecl {
    pub flags: Vec<String>,
    pub version: Option<String>,
    pub deprecated: Option<String>,
    /// Deferred body tokens, emptied once fields are parsed.
    pub body: Vec<Token>,
    /// Synthetic `self` local, created with the fields.
    pub self_var: Option<NodeId>,
}

/// Resolved class relationships. Filled by the linking pass only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassLinks {
    pub parent: Option<DeclRef>,
    pub extend: Option<DeclRef>,
    pub replace: Option<DeclRef>,
    pub extensions: Vec<DeclRef>,
    pub children: Vec<DeclRef>,
    pub replaced_by: Vec<DeclRef>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDecl {
    pub decl: TypeDecl,
    pub parent_name: Option<String>,
    pub extend_name: Option<String>,
    pub replace_name: Option<String>,
    pub links: ClassLinks,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumDecl {
    pub base: Option<CompoundType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub field_type: CompoundType,
    pub flags: Vec<String>,
    pub version: Option<String>,
    pub deprecated: Option<String>,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodDecl {
    /// More than one entry means a multi-return method.
    pub return_types: Vec<CompoundType>,
    /// Argument locals, parented to the method but not among its children.
    pub arguments: Vec<NodeId>,
    pub flags: Vec<String>,
    pub version: Option<String>,
    pub deprecated: Option<String>,
    pub has_ellipsis: bool,
    pub is_const: bool,
    /// Deferred body tokens, `None` for bodiless declarations and once the body is parsed.
    pub body: Option<Vec<Token>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantDecl {
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyDecl {
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalVariable {
    /// `None` when inferred from the initializer child.
    pub var_type: Option<CompoundType>,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForCycle {
    pub initializers: Vec<NodeId>,
    pub condition: Option<Expression>,
    pub steps: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileCycle {
    pub condition: Expression,
    /// `do ... while (cond);`
    pub post_condition: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub condition: Expression,
    pub else_block: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Include {
    pub location: String,
    pub reference: Option<FileId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileRoot {
    pub version: Option<String>,
}

/// Node payloads
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    FileRoot(FileRoot),
    Include(Include),
    Enum(EnumDecl),
    Class(ClassDecl),
    Struct(TypeDecl),
    Field(FieldDecl),
    Method(MethodDecl),
    CodeBlock,
    Expression(Expression),
    ForCycle(ForCycle),
    WhileCycle(WhileCycle),
    Condition(Condition),
    Constant(ConstantDecl),
    Property(PropertyDecl),
    LocalVariable(LocalVariable),
    ExecutionControl(ControlKind),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::FileRoot(_) => "file",
            NodeKind::Include(_) => "include",
            NodeKind::Enum(_) => "enum",
            NodeKind::Class(_) => "class",
            NodeKind::Struct(_) => "struct",
            NodeKind::Field(_) => "field",
            NodeKind::Method(_) => "method",
            NodeKind::CodeBlock => "block",
            NodeKind::Expression(_) => "expression",
            NodeKind::ForCycle(_) => "for",
            NodeKind::WhileCycle(_) => "while",
            NodeKind::Condition(_) => "if",
            NodeKind::Constant(_) => "constant",
            NodeKind::Property(_) => "property",
            NodeKind::LocalVariable(_) => "local",
            NodeKind::ExecutionControl(_) => "control",
        }
    }
}

/// Arena node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub identifier: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub line: usize,
    pub is_valid: bool,
    pub error: Option<String>,
    pub kind: NodeKind,
}

impl Node {
    /// Class and struct share the same declaration payload.
    pub fn type_decl(&self) -> Option<&TypeDecl> {
        match &self.kind {
            NodeKind::Class(class) => Some(&class.decl),
            NodeKind::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn type_decl_mut(&mut self) -> Option<&mut TypeDecl> {
        match &mut self.kind {
            NodeKind::Class(class) => Some(&mut class.decl),
            NodeKind::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Class(_) | NodeKind::Struct(_) | NodeKind::Enum(_)
        )
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.identifier.eq_ignore_ascii_case(name)
    }
}

/// Per-file node arena. Node 0 is always the [`NodeKind::FileRoot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                identifier: String::new(),
                parent: None,
                children: Vec::new(),
                line: 1,
                is_valid: true,
                error: None,
                kind: NodeKind::FileRoot(FileRoot::default()),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Create a node without adding it to the parent's children.
    pub fn alloc(
        &mut self,
        parent: Option<NodeId>,
        identifier: impl Into<String>,
        line: usize,
        kind: NodeKind,
    ) -> NodeId {
        self.nodes.push(Node {
            identifier: identifier.into(),
            parent,
            children: Vec::new(),
            line,
            is_valid: true,
            error: None,
            kind,
        });
        self.nodes.len() - 1
    }

    /// Append `child` to `parent`'s children.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Allocate and attach in one step.
    pub fn add(
        &mut self,
        parent: NodeId,
        identifier: impl Into<String>,
        line: usize,
        kind: NodeKind,
    ) -> NodeId {
        let id = self.alloc(Some(parent), identifier, line, kind);
        self.nodes[parent].children.push(id);
        id
    }

    /// Drop every node allocated at or after `mark`.
    pub fn truncate(&mut self, mark: NodeId) {
        let mark = mark.max(1);
        if mark >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(mark);
        for node in &mut self.nodes {
            node.children.retain(|child| *child < mark);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[][..], |node| node.children.as_slice())
    }

    /// `id` followed by its parents up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Top-level declarations, in source order.
    pub fn declarations(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children(Self::ROOT)
            .iter()
            .copied()
            .filter(|id| !matches!(self.nodes[*id].kind, NodeKind::Include(_)))
    }

    /// Every class and struct, nested ones included, parents before children.
    pub fn type_decls(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = self.children(Self::ROOT).iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            if self.nodes[id].type_decl().is_some() {
                found.push(id);
                pending.extend(self.children(id).iter().rev().copied());
            }
        }
        found
    }

    pub fn version(&self) -> Option<&str> {
        match &self.nodes[Self::ROOT].kind {
            NodeKind::FileRoot(root) => root.version.as_deref(),
            _ => None,
        }
    }
}

impl Index<NodeId> for SyntaxTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for SyntaxTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(|node| node.parent);
        Some(current)
    }
}

// ===== Expressions =====

/// Expression operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Modulo,
    Concat,
    UnaryNot,
    UnaryMinus,
    UnaryNeg,
    Identifier,
    Member,
    Call,
    Literal,
    Cast,
    BitOr,
    BitAnd,
    BitShr,
    BitShrUnsigned,
    BitShl,
    Xor,
    LogicalAnd,
    LogicalOr,
    CmpLT,
    CmpGT,
    CmpLTEQ,
    CmpGTEQ,
    CmpSpaceship,
    CmpEq,
    CmpNotEq,
    CmpSomewhatEq,
    Assign,
    Ternary,
    ArraySubscript,
    ArrayInitialization,
    VectorInitialization,
    VectorDot,
    VectorCross,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

/// An expression operand
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Integer(Token),
    Double(Token),
    Boolean(Token),
    /// String or name literal.
    String(Token),
    Identifier(Token),
    Expression(Box<Expression>),
}

impl Leaf {
    pub fn token(&self) -> Option<&Token> {
        match self {
            Leaf::Integer(t)
            | Leaf::Double(t)
            | Leaf::Boolean(t)
            | Leaf::String(t)
            | Leaf::Identifier(t) => Some(t),
            Leaf::Expression(_) => None,
        }
    }

    pub fn expression(&self) -> Option<&Expression> {
        match self {
            Leaf::Expression(e) => Some(e),
            _ => None,
        }
    }

    /// First source line covered by this leaf.
    pub fn line(&self) -> usize {
        match self {
            Leaf::Expression(e) => e.line(),
            other => other.token().map_or(0, |t| t.line),
        }
    }
}

/// Operator plus an ordered leaf list
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub op: Operator,
    /// Compound assignment such as `+=`.
    pub assign: bool,
    pub leaves: Vec<Leaf>,
    /// The operator's own tokens (`+`, `=`, `?` and `:` ...).
    pub operators: Vec<Token>,
    /// Brackets, commas and other structural tokens.
    pub special: Vec<Token>,
    /// Static type when derivable, set by the highlighter.
    pub result_type: Option<CompoundType>,
}

impl Expression {
    pub fn new(op: Operator) -> Self {
        Self {
            op,
            assign: false,
            leaves: Vec::new(),
            operators: Vec::new(),
            special: Vec::new(),
            result_type: None,
        }
    }

    pub fn with_leaves(op: Operator, leaves: Vec<Leaf>) -> Self {
        Self {
            leaves,
            ..Self::new(op)
        }
    }

    pub fn line(&self) -> usize {
        let from_leaves = self.leaves.iter().map(Leaf::line).filter(|l| *l > 0).min();
        let from_tokens = self
            .operators
            .iter()
            .chain(self.special.iter())
            .map(|t| t.line)
            .min();
        match (from_leaves, from_tokens) {
            (Some(a), Some(b)) => a.min(b),
            (a, b) => a.or(b).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> NodeKind {
        NodeKind::CodeBlock
    }

    #[test]
    fn test_add_and_ancestors() {
        let mut tree = SyntaxTree::new();
        let a = tree.add(SyntaxTree::ROOT, "a", 1, block());
        let b = tree.add(a, "b", 2, block());
        let chain: Vec<NodeId> = tree.ancestors(b).collect();
        assert_eq!(chain, vec![b, a, SyntaxTree::ROOT]);
        assert_eq!(tree.children(a), &[b]);
    }

    #[test]
    fn test_alloc_does_not_attach() {
        let mut tree = SyntaxTree::new();
        let a = tree.alloc(Some(SyntaxTree::ROOT), "a", 1, block());
        assert!(tree.children(SyntaxTree::ROOT).is_empty());
        assert_eq!(tree[a].parent, Some(SyntaxTree::ROOT));
        tree.attach(SyntaxTree::ROOT, a);
        assert_eq!(tree.children(SyntaxTree::ROOT), &[a]);
    }

    #[test]
    fn test_truncate_drops_links() {
        let mut tree = SyntaxTree::new();
        let a = tree.add(SyntaxTree::ROOT, "a", 1, block());
        let mark = tree.len();
        tree.add(a, "b", 2, block());
        tree.add(SyntaxTree::ROOT, "c", 3, block());
        tree.truncate(mark);
        assert_eq!(tree.len(), mark);
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(SyntaxTree::ROOT), &[a]);
    }

    #[test]
    fn test_truncate_keeps_root() {
        let mut tree = SyntaxTree::new();
        tree.truncate(0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_type_decls_preorder() {
        let mut tree = SyntaxTree::new();
        let outer = tree.add(SyntaxTree::ROOT, "Outer", 1, NodeKind::Struct(TypeDecl::default()));
        let inner = tree.add(outer, "Inner", 2, NodeKind::Struct(TypeDecl::default()));
        let other = tree.add(SyntaxTree::ROOT, "Other", 3, NodeKind::Class(ClassDecl::default()));
        assert_eq!(tree.type_decls(), vec![outer, inner, other]);
    }
}
