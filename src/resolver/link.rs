//! Phase 3: class links and type name re-resolution
//!
//! Forward links (`parent`, `extend`, `replace`) of this file's classes are
//! looked up in the project index. Reverse lists (`children`, `extensions`,
//! `replaced_by`) are derived from the textual relationships of every class
//! in the index, so each file's links are a pure function of its own tree and
//! the snapshot. Nothing is patched incrementally.

use crate::parser::ast::*;
use crate::parser::parse::{ParsedFile, Parser};
use crate::parser::semantic::{SemanticKind, SemanticToken};
use crate::resolver::Universe;

impl ParsedFile {
    /// Phase 3: link classes, then retry every unresolved TypeName token.
    pub fn set_type_information(&mut self, universe: &Universe<'_>) {
        let classes: Vec<NodeId> = self
            .tree
            .declarations()
            .filter(|id| matches!(self.tree[*id].kind, NodeKind::Class(_)))
            .collect();

        let mut parser = Parser::new(self, universe);
        for id in classes {
            parser.link_class(id);
        }
        parser.recheck_type_names(0);
    }
}

impl<'a> Parser<'a> {
    fn link_class(&mut self, id: NodeId) {
        let me = self.here(id);
        let index = self.universe.index;
        let node = &self.tree()[id];
        let NodeKind::Class(class) = &node.kind else {
            return;
        };
        let name = node.identifier.clone();
        let line = node.line;
        let wanted = [
            ("parent", class.parent_name.clone()),
            ("extended", class.extend_name.clone()),
            ("replaced", class.replace_name.clone()),
        ];

        let mut found = [None; 3];
        for (slot, (what, target)) in wanted.iter().enumerate() {
            let Some(target) = target else { continue };
            found[slot] = index.find_type(target).filter(|decl| *decl != me);
            if found[slot].is_none() {
                self.warn(format!("class '{}': {} class '{}' not found", name, what, target), line);
            }
        }

        let mut links = ClassLinks {
            parent: found[0],
            extend: found[1],
            replace: found[2],
            ..Default::default()
        };
        // an extension has no identity of its own to link back to
        if links.extend.is_none() && wanted[1].1.is_none() {
            for entry in index.classes() {
                let points_here = |target: &Option<String>| {
                    target.as_deref().and_then(|t| index.find_type(t)) == Some(me)
                };
                if entry.decl == me {
                    continue;
                }
                if points_here(&entry.parent) {
                    links.children.push(entry.decl);
                }
                if points_here(&entry.extend) {
                    links.extensions.push(entry.decl);
                }
                if points_here(&entry.replace) {
                    links.replaced_by.push(entry.decl);
                }
            }
        }

        log::debug!(
            "linked class {}: {} children, {} extensions",
            name,
            links.children.len(),
            links.extensions.len()
        );
        if let NodeKind::Class(class) = &mut self.tree_mut()[id].kind {
            class.links = links;
        }
    }

    /// Retry TypeName tokens emitted from `from` on that still have no
    /// reference. Failures get an `Invalid` overlay and a warning.
    pub(crate) fn recheck_type_names(&mut self, from: usize) {
        let pending: Vec<(usize, String)> = self.file.semantic[from.min(self.file.semantic.len())..]
            .iter()
            .enumerate()
            .filter(|(_, token)| token.kind == SemanticKind::TypeName && token.reference.is_none())
            .filter_map(|(i, token)| token.qualified_name.clone().map(|name| (from + i, name)))
            .collect();

        for (position, name) in pending {
            match self.resolve_qualified(&name) {
                Some(decl) => {
                    let qualified = self.full_name(decl);
                    let token = &mut self.file.semantic[position];
                    token.reference = Some(Target::Decl(decl));
                    token.qualified_name = Some(qualified);
                }
                None => {
                    let token = &self.file.semantic[position];
                    let overlay = SemanticToken {
                        kind: SemanticKind::Invalid,
                        ..token.clone()
                    };
                    let line = self.line_at(token.start);
                    self.file.semantic.push(overlay);
                    self.warn(format!("unresolved type '{}'", name), line);
                }
            }
        }
    }

    /// Source line of a byte offset.
    pub(crate) fn line_at(&self, offset: usize) -> usize {
        let tokens = &self.file.tokens;
        let index = tokens.partition_point(|token| token.end <= offset);
        tokens
            .get(index)
            .or_else(|| tokens.last())
            .map_or(1, |token| token.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::system_types::SystemTypes;
    use crate::resolver::TypeIndex;

    fn linked(source: &str) -> ParsedFile {
        let system = SystemTypes::new();
        let mut file = ParsedFile::parse(FileId(0), source, &system);
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        file.parse_fields(&universe);
        let index = TypeIndex::build([&file]);
        let universe = Universe::new(&index, Vec::new(), &system);
        file.set_type_information(&universe);
        file
    }

    fn links(file: &ParsedFile, id: NodeId) -> &ClassLinks {
        match &file.tree[id].kind {
            NodeKind::Class(class) => &class.links,
            other => panic!("expected class, got {}", other.name()),
        }
    }

    #[test]
    fn test_parent_and_children_are_symmetric() {
        let file = linked("class A { } class B : A { } class C : a { }");
        let a = file.find("A").unwrap();
        let b = file.find("B").unwrap();
        let c = file.find("C").unwrap();
        assert_eq!(links(&file, b).parent, Some(DeclRef::new(FileId(0), a)));
        assert_eq!(
            links(&file, a).children,
            vec![DeclRef::new(FileId(0), b), DeclRef::new(FileId(0), c)]
        );
    }

    #[test]
    fn test_extension_and_replacement() {
        let file = linked("class A { } extend class A { } class R : A replaces A { }");
        let a = file.find("A").unwrap();
        let ext = file.tree.declarations().nth(1).unwrap();
        let r = file.find("R").unwrap();
        assert_eq!(links(&file, ext).extend, Some(DeclRef::new(FileId(0), a)));
        assert_eq!(links(&file, a).extensions, vec![DeclRef::new(FileId(0), ext)]);
        assert_eq!(links(&file, a).replaced_by, vec![DeclRef::new(FileId(0), r)]);
        assert!(links(&file, ext).children.is_empty());
    }

    #[test]
    fn test_missing_parent_is_a_warning() {
        let file = linked("class Foo : NoSuchParent { }");
        let foo = file.find("Foo").unwrap();
        assert!(!file.failed);
        assert!(!file.has_errors());
        assert_eq!(links(&file, foo).parent, None);
        assert!(file
            .warnings()
            .any(|w| w.message.contains("parent class 'NoSuchParent' not found")));
        assert!(file.semantic.iter().any(|t| t.kind == SemanticKind::Invalid));
    }

    #[test]
    fn test_recheck_marks_unknown_field_type() {
        let file = linked("class A {\n  Missing m;\n}");
        let warning = file.warnings().find(|w| w.message.contains("unresolved type")).unwrap();
        assert_eq!(warning.line, 2);
        assert_eq!(warning.message, "unresolved type 'A.Missing'");
    }
}
