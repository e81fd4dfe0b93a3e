//! Type and symbol lookup
//!
//! All comparisons are case-insensitive.
//!
//! # Type lookup
//!
//! The first component of a dotted name is searched in the lexical context
//! (nested types of the context, of its enclosing types, and of each of
//! their class ancestors), then in the project index. Further components are
//! nested types of the previous one.
//!
//! # Symbol lookup
//!
//! First match wins:
//!
//! 1. `self` and `super`
//! 2. Locals: `for` initializers, method arguments and block declarations,
//!    innermost first
//! 3. Members of the context class, its extensions and its ancestors
//! 4. Global constants and enum members

use crate::parser::ast::*;
use crate::parser::parse::Parser;
use crate::parser::system_types::SystemKind;

/// Guard against inheritance cycles
const MAX_CHAIN: usize = 64;

impl<'a> Parser<'a> {
    /// Resolve a possibly dotted type name as seen from `context`.
    pub(crate) fn resolve_type(&self, name: &str, context: Option<DeclRef>) -> Option<DeclRef> {
        let mut parts = name.split('.');
        let first = parts.next()?;
        let mut found = self.resolve_type_root(first, context)?;
        for part in parts {
            found = self.find_nested_type(found, part)?;
        }
        Some(found)
    }

    fn resolve_type_root(&self, name: &str, context: Option<DeclRef>) -> Option<DeclRef> {
        let mut current = context;
        while let Some(decl) = current {
            if let Some(found) = self.find_nested_type(decl, name) {
                return Some(found);
            }
            current = self
                .node(decl)
                .and_then(|node| node.parent)
                .filter(|parent| *parent != SyntaxTree::ROOT)
                .map(|parent| DeclRef::new(decl.file, parent));
        }
        self.universe.index.find_type(name)
    }

    /// Retry a stored qualified name: the full path first, then shorter suffixes.
    pub(crate) fn resolve_qualified(&self, name: &str) -> Option<DeclRef> {
        let parts: Vec<&str> = name.split('.').collect();
        (0..parts.len()).find_map(|skip| self.resolve_type(&parts[skip..].join("."), None))
    }

    /// A type declared inside `owner` or one of its class ancestors.
    pub(crate) fn find_nested_type(&self, owner: DeclRef, name: &str) -> Option<DeclRef> {
        self.class_chain(owner).into_iter().find_map(|decl| {
            self.member_nodes(decl)
                .find(|(_, node)| node.is_type() && node.is_named(name))
                .map(|(member, _)| member)
        })
    }

    /// Children of `decl` with their handles.
    fn member_nodes(&self, decl: DeclRef) -> impl Iterator<Item = (DeclRef, &Node)> + '_ {
        let children: &[NodeId] = self.node(decl).map_or(&[][..], |node| node.children.as_slice());
        children.iter().filter_map(move |child| {
            let member = DeclRef::new(decl.file, *child);
            self.node(member).map(|node| (member, node))
        })
    }

    /// The class an `extend class` adds to, or `decl` itself.
    fn extension_target(&self, decl: DeclRef) -> DeclRef {
        match self.node(decl).map(|node| &node.kind) {
            Some(NodeKind::Class(class)) => match &class.extend_name {
                Some(name) => class
                    .links
                    .extend
                    .or_else(|| self.universe.index.find_type(name))
                    .unwrap_or(decl),
                None => decl,
            },
            _ => decl,
        }
    }

    /// Parent class, linked or looked up by name.
    pub(crate) fn class_parent(&self, decl: DeclRef) -> Option<DeclRef> {
        let decl = self.extension_target(decl);
        match &self.node(decl)?.kind {
            NodeKind::Class(class) => class.links.parent.or_else(|| {
                class
                    .parent_name
                    .as_deref()
                    .and_then(|name| self.universe.index.find_type(name))
            }),
            _ => None,
        }
    }

    /// Extensions of a class, linked or looked up by name.
    fn class_extensions(&self, decl: DeclRef) -> Vec<DeclRef> {
        let Some(node) = self.node(decl) else {
            return Vec::new();
        };
        match &node.kind {
            NodeKind::Class(class) if !class.links.extensions.is_empty() => class.links.extensions.clone(),
            NodeKind::Class(_) => {
                let name = node.identifier.to_ascii_lowercase();
                self.universe
                    .index
                    .classes()
                    .iter()
                    .filter(|entry| entry.extend.as_deref() == Some(name.as_str()))
                    .map(|entry| entry.decl)
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// `decl`, its extensions, then each ancestor followed by its extensions.
    /// An extension starts from the class it extends.
    pub(crate) fn class_chain(&self, decl: DeclRef) -> Vec<DeclRef> {
        let mut chain = Vec::new();
        let mut current = Some(self.extension_target(decl));
        while let Some(class) = current {
            if chain.contains(&class) || chain.len() >= MAX_CHAIN {
                break;
            }
            chain.push(class);
            for extension in self.class_extensions(class) {
                if !chain.contains(&extension) {
                    chain.push(extension);
                }
            }
            current = self.class_parent(class);
        }
        chain
    }

    /// A field, method, constant, property or enum member named `name`
    /// directly inside `owner`.
    pub(crate) fn find_member(&self, owner: DeclRef, name: &str) -> Option<DeclRef> {
        for (member, node) in self.member_nodes(owner) {
            match &node.kind {
                NodeKind::Field(_) | NodeKind::Method(_) | NodeKind::Constant(_) | NodeKind::Property(_)
                    if node.is_named(name) =>
                {
                    return Some(member);
                }
                NodeKind::Enum(_) => {
                    let value = self
                        .member_nodes(member)
                        .find(|(_, value)| value.is_named(name))
                        .map(|(value, _)| value);
                    if value.is_some() {
                        return value;
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// [`find_member`](Self::find_member) over the whole class chain.
    pub(crate) fn find_member_in_chain(&self, owner: DeclRef, name: &str) -> Option<DeclRef> {
        self.class_chain(owner)
            .into_iter()
            .find_map(|class| self.find_member(class, name))
    }

    fn self_var(&self, decl: DeclRef) -> Option<DeclRef> {
        self.node(decl)?
            .type_decl()?
            .self_var
            .map(|var| DeclRef::new(decl.file, var))
    }

    /// Resolve an identifier used at `scope` (a node in this file) inside
    /// type `context`.
    pub(crate) fn resolve_symbol(&self, name: &str, scope: Option<NodeId>, context: Option<DeclRef>) -> Option<DeclRef> {
        if name.eq_ignore_ascii_case("self") {
            return context.and_then(|ctx| self.self_var(ctx));
        }
        if name.eq_ignore_ascii_case("super") {
            return context
                .and_then(|ctx| self.class_parent(ctx))
                .and_then(|parent| self.self_var(parent));
        }

        if let Some(found) = scope.and_then(|scope| self.find_local(name, scope)) {
            return Some(found);
        }

        if let Some(found) = context.and_then(|ctx| self.find_member_in_chain(ctx, name)) {
            return Some(found);
        }

        self.universe.index.find_symbol(name)
    }

    fn find_local(&self, name: &str, scope: NodeId) -> Option<DeclRef> {
        let tree = self.tree();
        for id in tree.ancestors(scope) {
            let node = &tree[id];
            let candidates: &[NodeId] = match &node.kind {
                NodeKind::ForCycle(cycle) => &cycle.initializers,
                NodeKind::Method(method) => &method.arguments,
                NodeKind::CodeBlock => &node.children,
                NodeKind::Class(_) | NodeKind::Struct(_) => break,
                _ => continue,
            };
            let found = candidates.iter().copied().find(|candidate| {
                let local = &tree[*candidate];
                matches!(local.kind, NodeKind::LocalVariable(_) | NodeKind::Constant(_)) && local.is_named(name)
            });
            if let Some(found) = found {
                return Some(self.here(found));
            }
        }
        None
    }

    /// Dotted path of enclosing types down to `decl`, for tooltips.
    pub(crate) fn full_name(&self, decl: DeclRef) -> String {
        let mut parts = Vec::new();
        let mut current = Some(decl.node);
        while let Some(id) = current {
            let Some(node) = self.node(DeclRef::new(decl.file, id)) else {
                break;
            };
            if matches!(node.kind, NodeKind::FileRoot(_)) {
                break;
            }
            if id == decl.node || node.is_type() {
                parts.push(node.identifier.clone());
            }
            current = node.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Static type of a declaration when it has one.
    pub(crate) fn type_of(&self, decl: DeclRef) -> Option<CompoundType> {
        let node = self.node(decl)?;
        match &node.kind {
            NodeKind::Field(field) => Some(field.field_type.clone()),
            NodeKind::Method(method) => method.return_types.first().cloned(),
            NodeKind::LocalVariable(var) => var.var_type.clone().or_else(|| {
                node.children.iter().find_map(|child| match &self.node(DeclRef::new(decl.file, *child))?.kind {
                    NodeKind::Expression(expr) => expr.result_type.clone(),
                    _ => None,
                })
            }),
            NodeKind::Constant(constant) => constant.value.as_ref().and_then(|v| v.result_type.clone()),
            NodeKind::Class(_) | NodeKind::Struct(_) | NodeKind::Enum(_) => {
                Some(CompoundType::named(self.full_name(decl), Some(Target::Decl(decl))))
            }
            _ => None,
        }
    }

    /// The declaration whose members follow a `.` on a value of type `ty`.
    pub(crate) fn type_scope(&self, ty: &CompoundType) -> Option<DeclRef> {
        match ty.reference? {
            Target::Decl(decl) => Some(decl),
            Target::System(index) => {
                let system = self.universe.system.get(index)?;
                match system.kind {
                    SystemKind::Class | SystemKind::Readonly => {
                        ty.arguments.first().and_then(|argument| self.type_scope(argument))
                    }
                    _ => system
                        .substitution
                        .and_then(|wrapper| self.universe.index.find_type(wrapper)),
                }
            }
        }
    }

    /// `CompoundType` for a builtin by name.
    pub(crate) fn system_type(&self, name: &str) -> Option<CompoundType> {
        let index = self.universe.system.find(name)?;
        Some(CompoundType::named(name, Some(Target::System(index))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::ParsedFile;
    use crate::parser::system_types::SystemTypes;
    use crate::resolver::{TypeIndex, Universe};

    fn parse(source: &str) -> (ParsedFile, SystemTypes) {
        let system = SystemTypes::new();
        let mut file = ParsedFile::parse(FileId(0), source, &system);
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        file.parse_fields(&universe);
        (file, system)
    }

    #[test]
    fn test_case_insensitive_type_lookup() {
        let (mut file, system) = parse("class Actor { } class Imp : actor { }");
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        let actor = file.find("Actor").unwrap();
        let imp = file.find("Imp").unwrap();
        let parser = Parser::new(&mut file, &universe);
        let expected = Some(DeclRef::new(FileId(0), actor));
        assert_eq!(parser.resolve_type("actor", None), expected);
        assert_eq!(parser.resolve_type("ACTOR", None), expected);
        assert_eq!(parser.class_parent(DeclRef::new(FileId(0), imp)), expected);
    }

    #[test]
    fn test_nested_type_lookup() {
        let (mut file, system) = parse("class Outer { struct Inner { int v; } } class Sub : Outer { }");
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        let sub = file.find("Sub").unwrap();
        let parser = Parser::new(&mut file, &universe);
        let inner = parser.resolve_type("Outer.Inner", None).unwrap();
        assert_eq!(parser.full_name(inner), "Outer.Inner");
        // inherited nested type
        assert_eq!(parser.resolve_type("Inner", Some(DeclRef::new(FileId(0), sub))), Some(inner));
        assert_eq!(parser.resolve_qualified("Sub.Outer.Inner"), Some(inner));
    }

    #[test]
    fn test_member_chain_with_extension() {
        let (mut file, system) = parse(
            "class Base { int x; } class Derived : Base { } extend class Derived { int y; }",
        );
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        let derived = DeclRef::new(FileId(0), file.find("Derived").unwrap());
        let parser = Parser::new(&mut file, &universe);
        let x = parser.find_member_in_chain(derived, "X").unwrap();
        assert_eq!(parser.full_name(x), "Base.x");
        let y = parser.find_member_in_chain(derived, "y").unwrap();
        assert!(matches!(parser.node(y).map(|n| &n.kind), Some(NodeKind::Field(_))));
        assert_eq!(parser.class_chain(derived).len(), 3);
    }

    #[test]
    fn test_self_and_globals() {
        let (mut file, system) = parse("enum EColor { CR_RED } class A { } class B : A { }");
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        let a = DeclRef::new(FileId(0), file.find("A").unwrap());
        let b = DeclRef::new(FileId(0), file.find("B").unwrap());
        let parser = Parser::new(&mut file, &universe);
        let self_var = parser.resolve_symbol("self", None, Some(b)).unwrap();
        assert!(parser.node(self_var).is_some_and(|n| n.is_named("self")));
        let super_var = parser.resolve_symbol("Super", None, Some(b)).unwrap();
        assert_eq!(parser.node(super_var).and_then(|n| n.parent), Some(a.node));
        assert!(parser.resolve_symbol("cr_red", None, Some(b)).is_some());
        assert!(parser.resolve_symbol("nothing", None, Some(b)).is_none());
    }
}
