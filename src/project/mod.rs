//! Project driver
//!
//! Owns every document of a project and runs the parsing pipeline over all
//! of them. Each rebuild starts from scratch:
//!
//! 1. Every ZScript document is tokenized and its skeleton parsed.
//! 2. `#include` directives are matched to documents.
//! 3. Fields and signatures, class links, then method bodies, each phase run
//!    over every document against a freshly built [`TypeIndex`].
//!
//! During a phase the document being parsed is taken out of the list, so the
//! [`Universe`] can lend out the other trees while that one is mutated.

use crate::parser::ast::{FileId, NodeId, NodeKind, SyntaxTree};
use crate::parser::parse::{Diagnostic, ParsedFile, Severity};
use crate::parser::semantic::{self, SemanticToken};
use crate::parser::system_types::SystemTypes;
use crate::resolver::{TypeIndex, Universe};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Project error type
#[derive(Debug)]
pub enum ProjectError {
    Io(io::Error),
    /// In-memory projects have nowhere to save to.
    NoRoot,
    UnknownDocument(FileId),
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Io(err) => write!(f, "I/O error: {}", err),
            ProjectError::NoRoot => write!(f, "project has no root directory"),
            ProjectError::UnknownDocument(id) => write!(f, "no document with id {}", id.0),
        }
    }
}

impl std::error::Error for ProjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ProjectError {
    fn from(err: io::Error) -> Self {
        ProjectError::Io(err)
    }
}

/// `\` to `/`, runs of `/` collapsed.
pub fn fix_path(path: &str) -> String {
    let mut fixed = String::with_capacity(path.len());
    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && fixed.ends_with('/') {
            continue;
        }
        fixed.push(c);
    }
    fixed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    ZScript,
    Text,
}

impl FileKind {
    /// `zscript*` files and `.zs`, `.zsc`, `.zc` extensions are ZScript.
    pub fn detect(path: &str) -> FileKind {
        let fixed = fix_path(path).to_ascii_lowercase();
        let name = fixed.rsplit('/').next().unwrap_or(&fixed);
        let extension = name.rsplit_once('.').map(|(_, ext)| ext);
        if name.starts_with("zscript") || matches!(extension, Some("zs" | "zsc" | "zc")) {
            FileKind::ZScript
        } else {
            FileKind::Text
        }
    }
}

/// One file of the project
#[derive(Debug, Clone)]
pub struct Document {
    pub id: FileId,
    /// Project-relative path with `/` separators.
    pub path: String,
    pub kind: FileKind,
    pub text: String,
    /// Pipeline output, `None` for text files.
    pub unit: Option<ParsedFile>,
    pub modified: bool,
}

impl Document {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.unit.as_ref().map_or(&[][..], |unit| unit.diagnostics.as_slice())
    }

    pub fn semantic(&self) -> &[SemanticToken] {
        self.unit.as_ref().map_or(&[][..], |unit| unit.semantic.as_slice())
    }
}

pub struct Project {
    root: Option<PathBuf>,
    documents: Vec<Document>,
    system: SystemTypes,
}

impl Project {
    /// Load a directory tree, or a single file, and build it.
    pub fn open(path: impl AsRef<Path>) -> Result<Project, ProjectError> {
        let path = path.as_ref();
        let mut project = Project {
            root: None,
            documents: Vec::new(),
            system: SystemTypes::new(),
        };

        if path.is_dir() {
            project.scan(path, "")?;
            project.root = Some(path.to_path_buf());
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            project.push(name, read_text(path)?, None);
            project.root = path.parent().map(Path::to_path_buf);
        }

        log::info!(
            "opened {}: {} documents",
            path.display(),
            project.documents.len()
        );
        project.rebuild();
        Ok(project)
    }

    /// An in-memory project. Every source is parsed as ZScript.
    pub fn from_sources<P, T>(sources: impl IntoIterator<Item = (P, T)>) -> Project
    where
        P: Into<String>,
        T: Into<String>,
    {
        let mut project = Project {
            root: None,
            documents: Vec::new(),
            system: SystemTypes::new(),
        };
        for (path, text) in sources {
            project.push(path.into(), text.into(), Some(FileKind::ZScript));
        }
        project.rebuild();
        project
    }

    /// Directories first, each list sorted by name.
    fn scan(&mut self, dir: &Path, prefix: &str) -> Result<(), ProjectError> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
        dirs.sort();
        files.sort();

        for name in dirs {
            self.scan(&dir.join(&name), &format!("{}{}/", prefix, name))?;
        }
        for name in files {
            let text = read_text(&dir.join(&name))?;
            self.push(format!("{}{}", prefix, name), text, None);
        }
        Ok(())
    }

    fn push(&mut self, path: String, text: String, kind: Option<FileKind>) -> FileId {
        let path = fix_path(&path);
        let id = FileId(self.documents.len());
        self.documents.push(Document {
            id,
            kind: kind.unwrap_or_else(|| FileKind::detect(&path)),
            path,
            text,
            unit: None,
            modified: false,
        });
        id
    }

    /// Add a ZScript document and rebuild.
    pub fn add_document(&mut self, path: impl Into<String>, text: impl Into<String>) -> FileId {
        let id = self.push(path.into(), text.into(), Some(FileKind::ZScript));
        self.rebuild();
        id
    }

    /// Replace a document's text and rebuild the whole project.
    pub fn set_contents(&mut self, id: FileId, text: impl Into<String>) -> Result<(), ProjectError> {
        let document = self
            .documents
            .get_mut(id.0)
            .ok_or(ProjectError::UnknownDocument(id))?;
        document.text = text.into();
        document.modified = true;
        self.rebuild();
        Ok(())
    }

    pub fn save(&mut self, id: FileId) -> Result<(), ProjectError> {
        let root = self.root.clone().ok_or(ProjectError::NoRoot)?;
        let document = self
            .documents
            .get_mut(id.0)
            .ok_or(ProjectError::UnknownDocument(id))?;
        fs::write(root.join(&document.path), &document.text)?;
        document.modified = false;
        log::info!("saved {}", document.path);
        Ok(())
    }

    // ===== Pipeline =====

    /// Reparse every document and relink the whole project.
    pub fn rebuild(&mut self) {
        for document in &mut self.documents {
            document.unit = match document.kind {
                FileKind::ZScript => Some(ParsedFile::parse(document.id, &document.text, &self.system)),
                FileKind::Text => None,
            };
        }
        self.resolve_includes();
        self.run_phase(ParsedFile::parse_fields);
        self.run_phase(ParsedFile::set_type_information);
        self.run_phase(ParsedFile::parse_bodies);

        let (errors, warnings) = self
            .documents
            .iter()
            .flat_map(|d| d.diagnostics())
            .fold((0, 0), |(e, w), d| match d.severity {
                Severity::Error => (e + 1, w),
                Severity::Warning => (e, w + 1),
            });
        log::info!(
            "rebuilt {} documents: {} errors, {} warnings",
            self.documents.len(),
            errors,
            warnings
        );
    }

    /// Run one phase over every parsed document against the current index.
    fn run_phase<F>(&mut self, phase: F)
    where
        F: Fn(&mut ParsedFile, &Universe<'_>),
    {
        let index = TypeIndex::build(self.documents.iter().filter_map(|d| d.unit.as_ref()));
        for position in 0..self.documents.len() {
            let Some(mut unit) = self.documents[position].unit.take() else {
                continue;
            };
            {
                let trees: Vec<Option<&SyntaxTree>> = self
                    .documents
                    .iter()
                    .map(|d| d.unit.as_ref().map(|u| &u.tree))
                    .collect();
                let universe = Universe::new(&index, trees, &self.system);
                phase(&mut unit, &universe);
            }
            self.documents[position].unit = Some(unit);
        }
    }

    /// Point every `#include` at its document, case-insensitively.
    fn resolve_includes(&mut self) {
        let paths: Vec<String> = self
            .documents
            .iter()
            .map(|d| d.path.to_ascii_lowercase())
            .collect();

        for document in &mut self.documents {
            let Some(unit) = &mut document.unit else {
                continue;
            };
            let includes: Vec<NodeId> = unit.tree.children(SyntaxTree::ROOT).to_vec();
            for id in includes {
                let line = unit.tree[id].line;
                let NodeKind::Include(include) = &mut unit.tree[id].kind else {
                    continue;
                };
                let wanted = fix_path(&include.location)
                    .trim_start_matches('/')
                    .to_ascii_lowercase();
                include.reference = paths.iter().position(|p| *p == wanted).map(FileId);
                if include.reference.is_none() {
                    let message = format!("included file '{}' not found", include.location);
                    log::warn!("{}: {}", document.path, message);
                    unit.diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        message,
                        line,
                    });
                }
            }
        }
    }

    // ===== Queries =====

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: FileId) -> Option<&Document> {
        self.documents.get(id.0)
    }

    pub fn find_document(&self, path: &str) -> Option<&Document> {
        let wanted = fix_path(path).to_ascii_lowercase();
        self.documents
            .iter()
            .find(|d| d.path.to_ascii_lowercase() == wanted)
    }

    pub fn system(&self) -> &SystemTypes {
        &self.system
    }

    /// The semantic token under a byte offset, for tooltips.
    pub fn token_at(&self, id: FileId, offset: usize) -> Option<&SemanticToken> {
        semantic::token_at(self.document(id)?.semantic(), offset)
    }

    pub fn has_errors(&self) -> bool {
        self.documents
            .iter()
            .filter_map(|d| d.unit.as_ref())
            .any(|unit| unit.has_errors())
    }
}

fn read_text(path: &Path) -> Result<String, ProjectError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::semantic::SemanticKind;

    #[test]
    fn test_fix_path() {
        assert_eq!(fix_path("zscript\\actors//imp.zs"), "zscript/actors/imp.zs");
        assert_eq!(fix_path("a///b"), "a/b");
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::detect("ZSCRIPT.txt"), FileKind::ZScript);
        assert_eq!(FileKind::detect("zscript"), FileKind::ZScript);
        assert_eq!(FileKind::detect("actors/Imp.ZSC"), FileKind::ZScript);
        assert_eq!(FileKind::detect("a/b.zc"), FileKind::ZScript);
        assert_eq!(FileKind::detect("decorate.txt"), FileKind::Text);
        assert_eq!(FileKind::detect("zs/readme.md"), FileKind::Text);
    }

    #[test]
    fn test_cross_file_parent() {
        let project = Project::from_sources([
            ("base.zs", "class Base { int x; }"),
            ("derived.zs", "class Derived : Base { }"),
        ]);
        assert!(!project.has_errors());
        let derived = project.document(FileId(1)).unwrap();
        assert!(derived.diagnostics().is_empty(), "{:?}", derived.diagnostics());
    }

    #[test]
    fn test_includes_resolve_case_insensitively() {
        let project = Project::from_sources([
            ("zscript.txt", "version \"4.10\"\n#include \"Actors/Imp.zs\"\n#include \"missing.zs\""),
            ("actors/imp.zs", "class Imp { }"),
        ]);
        let unit = project.document(FileId(0)).and_then(|d| d.unit.as_ref()).unwrap();
        let references: Vec<Option<FileId>> = unit
            .tree
            .children(SyntaxTree::ROOT)
            .iter()
            .filter_map(|id| match &unit.tree[*id].kind {
                NodeKind::Include(include) => Some(include.reference),
                _ => None,
            })
            .collect();
        assert_eq!(references, vec![Some(FileId(1)), None]);
        assert!(unit.warnings().any(|w| w.message.contains("missing.zs") && w.line == 3));
    }

    #[test]
    fn test_set_contents_rebuilds() {
        let mut project = Project::from_sources([("a.zs", "class A { }")]);
        project
            .set_contents(FileId(0), "class A : Missing { }")
            .expect("set_contents failed");
        let document = project.document(FileId(0)).unwrap();
        assert!(document.modified);
        assert!(document.diagnostics().iter().any(|d| d.severity == Severity::Warning));
        assert!(matches!(
            project.set_contents(FileId(9), ""),
            Err(ProjectError::UnknownDocument(FileId(9)))
        ));
    }

    #[test]
    fn test_token_at() {
        let project = Project::from_sources([("a.zs", "class A { }")]);
        let token = project.token_at(FileId(0), 6).unwrap();
        assert_eq!(token.kind, SemanticKind::TypeName);
        assert_eq!(token.tooltip(), "type A");
        assert!(project.token_at(FileId(0), 5).is_none());
    }

    #[test]
    fn test_save_without_root_fails() {
        let mut project = Project::from_sources([("a.zs", "")]);
        assert!(matches!(project.save(FileId(0)), Err(ProjectError::NoRoot)));
    }

    #[test]
    fn test_open_directory() {
        let root = std::env::temp_dir().join(format!("zsedit-open-{}", std::process::id()));
        fs::create_dir_all(root.join("actors")).unwrap();
        fs::write(root.join("zscript.txt"), "#include \"actors/imp.zs\"").unwrap();
        fs::write(root.join("actors/imp.zs"), "class Imp { }").unwrap();
        fs::write(root.join("readme.md"), "notes").unwrap();

        let mut project = Project::open(&root).unwrap();
        let paths: Vec<&str> = project.documents().iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["actors/imp.zs", "readme.md", "zscript.txt"]);
        assert!(project.find_document("README.MD").is_some_and(|d| d.kind == FileKind::Text));
        assert!(!project.has_errors());

        project.set_contents(FileId(0), "class Imp { int hp; }").unwrap();
        project.save(FileId(0)).unwrap();
        assert_eq!(
            fs::read_to_string(root.join("actors/imp.zs")).unwrap(),
            "class Imp { int hp; }"
        );
        fs::remove_dir_all(&root).unwrap();
    }
}
