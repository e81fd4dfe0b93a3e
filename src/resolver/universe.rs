//! Project-wide type universe
//!
//! [`TypeIndex`] is an owned, case-folded index of every top-level
//! declaration in the project. It is rebuilt from scratch before each phase.
//! [`Universe`] pairs the index with read-only access to the other files'
//! trees and the builtin catalog, and is what phases 2 to 4 receive.

use crate::parser::ast::{DeclRef, FileId, Node, NodeKind, SyntaxTree};
use crate::parser::parse::ParsedFile;
use crate::parser::system_types::SystemTypes;
use rustc_hash::FxHashMap;

/// Textual relationships of one class, lowercased
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    pub decl: DeclRef,
    pub name: String,
    pub parent: Option<String>,
    pub extend: Option<String>,
    pub replace: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    declarations: Vec<DeclRef>,
    types: FxHashMap<String, DeclRef>,
    symbols: FxHashMap<String, DeclRef>,
    classes: Vec<ClassEntry>,
}

impl TypeIndex {
    pub fn build<'f>(files: impl IntoIterator<Item = &'f ParsedFile>) -> Self {
        let mut index = TypeIndex::default();
        for file in files {
            index.add_file(file);
        }
        index
    }

    pub fn add_file(&mut self, file: &ParsedFile) {
        let tree = &file.tree;
        for id in tree.declarations() {
            let decl = DeclRef::new(file.id, id);
            let node = &tree[id];
            let key = node.identifier.to_ascii_lowercase();
            self.declarations.push(decl);

            match &node.kind {
                NodeKind::Class(class) => {
                    self.classes.push(ClassEntry {
                        decl,
                        name: key.clone(),
                        parent: class.parent_name.as_ref().map(|n| n.to_ascii_lowercase()),
                        extend: class.extend_name.as_ref().map(|n| n.to_ascii_lowercase()),
                        replace: class.replace_name.as_ref().map(|n| n.to_ascii_lowercase()),
                    });
                    if class.extend_name.is_none() {
                        self.types.entry(key).or_insert(decl);
                    }
                }
                NodeKind::Struct(_) => {
                    self.types.entry(key).or_insert(decl);
                }
                NodeKind::Enum(_) => {
                    self.types.entry(key).or_insert(decl);
                    for member in tree.children(id) {
                        if matches!(tree[*member].kind, NodeKind::Constant(_)) {
                            self.symbols
                                .entry(tree[*member].identifier.to_ascii_lowercase())
                                .or_insert(DeclRef::new(file.id, *member));
                        }
                    }
                }
                NodeKind::Constant(_) => {
                    self.symbols.entry(key).or_insert(decl);
                }
                _ => {}
            }
        }
    }

    /// Top-level type by name, ignoring `extend class` entries.
    pub fn find_type(&self, name: &str) -> Option<DeclRef> {
        self.types.get(&name.to_ascii_lowercase()).copied()
    }

    /// Global constant or enum member by name.
    pub fn find_symbol(&self, name: &str) -> Option<DeclRef> {
        self.symbols.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    pub fn declarations(&self) -> &[DeclRef] {
        &self.declarations
    }
}

/// Read-only view of the project handed to a parsing phase
pub struct Universe<'a> {
    pub index: &'a TypeIndex,
    pub system: &'a SystemTypes,
    trees: Vec<Option<&'a SyntaxTree>>,
}

impl<'a> Universe<'a> {
    /// `trees` is indexed by [`FileId`]; the file being parsed is `None`.
    pub fn new(
        index: &'a TypeIndex,
        trees: Vec<Option<&'a SyntaxTree>>,
        system: &'a SystemTypes,
    ) -> Self {
        Self {
            index,
            system,
            trees,
        }
    }

    /// A universe with no other files, for phase 1 and single-file use.
    pub fn detached(index: &'a TypeIndex, system: &'a SystemTypes) -> Self {
        Self::new(index, Vec::new(), system)
    }

    pub fn tree(&self, file: FileId) -> Option<&'a SyntaxTree> {
        self.trees.get(file.0).copied().flatten()
    }

    pub fn node(&self, decl: DeclRef) -> Option<&'a Node> {
        self.tree(decl.file).and_then(|tree| tree.get(decl.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{ClassDecl, ConstantDecl, EnumDecl};

    fn file_with(id: usize, build: impl FnOnce(&mut SyntaxTree)) -> ParsedFile {
        let mut file = ParsedFile::empty(FileId(id), Vec::new());
        build(&mut file.tree);
        file
    }

    #[test]
    fn test_index_skips_extensions_for_types() {
        let file = file_with(0, |tree| {
            let ext = ClassDecl {
                extend_name: Some("Actor".into()),
                ..Default::default()
            };
            tree.add(SyntaxTree::ROOT, "Actor", 1, NodeKind::Class(ext));
            tree.add(SyntaxTree::ROOT, "Actor", 2, NodeKind::Class(ClassDecl::default()));
        });
        let index = TypeIndex::build([&file]);
        assert_eq!(index.find_type("actor"), Some(DeclRef::new(FileId(0), 2)));
        assert_eq!(index.classes().len(), 2);
        assert_eq!(index.classes()[0].extend.as_deref(), Some("actor"));
    }

    #[test]
    fn test_index_symbols() {
        let file = file_with(3, |tree| {
            let e = tree.add(SyntaxTree::ROOT, "EColor", 1, NodeKind::Enum(EnumDecl::default()));
            tree.add(e, "CR_RED", 1, NodeKind::Constant(ConstantDecl::default()));
            tree.add(SyntaxTree::ROOT, "MAXVAL", 2, NodeKind::Constant(ConstantDecl::default()));
        });
        let index = TypeIndex::build([&file]);
        assert_eq!(index.find_symbol("cr_red"), Some(DeclRef::new(FileId(3), 2)));
        assert_eq!(index.find_symbol("MaxVal"), Some(DeclRef::new(FileId(3), 3)));
        assert_eq!(index.find_type("ecolor"), Some(DeclRef::new(FileId(3), 1)));
    }

    #[test]
    fn test_universe_node_lookup() {
        let file = file_with(1, |tree| {
            tree.add(SyntaxTree::ROOT, "Base", 1, NodeKind::Class(ClassDecl::default()));
        });
        let index = TypeIndex::build([&file]);
        let system = SystemTypes::new();
        let universe = Universe::new(&index, vec![None, Some(&file.tree)], &system);
        let node = universe.node(DeclRef::new(FileId(1), 1));
        assert!(node.is_some_and(|n| n.is_named("base")));
        assert!(universe.node(DeclRef::new(FileId(0), 1)).is_none());
    }
}
