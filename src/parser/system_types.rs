//! Builtin primitive type catalog
//!
//! Built once by the caller and passed by reference to whatever needs
//! primitive lookups (compound type parsing, casts, the highlighter).

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    String,
    Integer,
    Float,
    Vector,
    Array,
    Class,
    Readonly,
    Void,
    Object,
}

/// One builtin type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemType {
    pub name: &'static str,
    pub kind: SystemKind,
    pub bit_width: u32,
    /// Script struct holding the methods of a builtin (`string` → `StringStruct`).
    pub substitution: Option<&'static str>,
}

const fn entry(name: &'static str, kind: SystemKind, bit_width: u32) -> SystemType {
    SystemType {
        name,
        kind,
        bit_width,
        substitution: None,
    }
}

const BUILTINS: &[SystemType] = &[
    entry("int", SystemKind::Integer, 32),
    entry("uint", SystemKind::Integer, 32),
    entry("int8", SystemKind::Integer, 8),
    entry("uint8", SystemKind::Integer, 8),
    entry("int16", SystemKind::Integer, 16),
    entry("uint16", SystemKind::Integer, 16),
    entry("sbyte", SystemKind::Integer, 8),
    entry("byte", SystemKind::Integer, 8),
    entry("short", SystemKind::Integer, 16),
    entry("ushort", SystemKind::Integer, 16),
    entry("bool", SystemKind::Integer, 1),
    entry("float", SystemKind::Float, 64),
    entry("double", SystemKind::Float, 64),
    entry("float64", SystemKind::Float, 64),
    SystemType {
        name: "string",
        kind: SystemKind::String,
        bit_width: 0,
        substitution: Some("StringStruct"),
    },
    entry("name", SystemKind::String, 0),
    entry("sound", SystemKind::String, 0),
    entry("color", SystemKind::Integer, 32),
    entry("spriteid", SystemKind::Integer, 32),
    entry("textureid", SystemKind::Integer, 32),
    entry("state", SystemKind::Object, 64),
    entry("voidptr", SystemKind::Object, 64),
    entry("vector2", SystemKind::Vector, 128),
    entry("vector3", SystemKind::Vector, 192),
    entry("void", SystemKind::Void, 0),
    entry("array", SystemKind::Array, 0),
    entry("map", SystemKind::Array, 0),
    entry("class", SystemKind::Class, 64),
    entry("readonly", SystemKind::Readonly, 0),
];

/// Immutable catalog with case-insensitive lookup
#[derive(Debug, Clone)]
pub struct SystemTypes {
    entries: Vec<SystemType>,
    by_name: FxHashMap<String, usize>,
}

impl Default for SystemTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTypes {
    pub fn new() -> Self {
        let entries = BUILTINS.to_vec();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(index, ty)| (ty.name.to_string(), index))
            .collect();
        Self { entries, by_name }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn get(&self, index: usize) -> Option<&SystemType> {
        self.entries.get(index)
    }

    pub fn lookup(&self, name: &str) -> Option<&SystemType> {
        self.find(name).and_then(|index| self.get(index))
    }

    /// Integer or float builtins usable as `type(expr)` casts.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|ty| matches!(ty.kind, SystemKind::Integer | SystemKind::Float))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SystemType> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let types = SystemTypes::new();
        assert_eq!(types.find("INT"), types.find("int"));
        assert_eq!(types.lookup("Double").map(|t| t.kind), Some(SystemKind::Float));
        assert!(types.lookup("Actor").is_none());
    }

    #[test]
    fn test_string_substitution() {
        let types = SystemTypes::new();
        assert_eq!(types.lookup("string").and_then(|t| t.substitution), Some("StringStruct"));
    }

    #[test]
    fn test_numeric() {
        let types = SystemTypes::new();
        assert!(types.is_numeric("bool"));
        assert!(types.is_numeric("float"));
        assert!(!types.is_numeric("string"));
        assert!(!types.is_numeric("vector3"));
    }
}
