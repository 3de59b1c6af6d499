//! CRUD classification of entry-point method names
//!
//! Used to infer an HTTP verb for an entry point when the generator needs
//! one; matching is case-insensitive prefix matching.

use serde::{Deserialize, Serialize};

/// Coarse CRUD category of a method name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodCategory {
    Create,
    Read,
    Update,
    Delete,
    Other,
}

impl MethodCategory {
    /// HTTP verb conventionally mapped to this category
    pub fn http_method(self) -> &'static str {
        match self {
            Self::Create => "POST",
            Self::Read => "GET",
            Self::Update => "PUT",
            Self::Delete => "DELETE",
            Self::Other => "POST",
        }
    }
}

/// Customizable name prefixes per CRUD category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudPatterns {
    pub create: Vec<String>,
    pub read: Vec<String>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
}

impl Default for CrudPatterns {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            create: list(&["create", "add", "insert", "save", "new"]),
            read: list(&["get", "query", "list", "find", "select", "count", "load"]),
            update: list(&["update", "set", "modify", "patch", "enable", "disable"]),
            delete: list(&["delete", "remove", "del", "clear"]),
        }
    }
}

/// Classify a bare method name (no signature) against the given patterns
pub fn classify_method_name(name: &str, patterns: &CrudPatterns) -> MethodCategory {
    let n = name.to_lowercase();
    let starts = |prefixes: &[String]| prefixes.iter().any(|p| n.starts_with(p.as_str()));

    if starts(&patterns.create) {
        MethodCategory::Create
    } else if starts(&patterns.read) {
        MethodCategory::Read
    } else if starts(&patterns.update) {
        MethodCategory::Update
    } else if starts(&patterns.delete) {
        MethodCategory::Delete
    } else {
        MethodCategory::Other
    }
}
