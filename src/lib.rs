//! # swagcov: API test-coverage for OpenAPI-generated C# clients
//!
//! Given an NSwag configuration and a workspace of C# sources, counts how
//! many times application code invokes each generated client method outside
//! the client itself, per contract endpoint. Tree-sitter based source
//! analysis, no MSBuild or Roslyn required.
//!
//! ## Library usage
//!
//! This crate is primarily a CLI tool, but the shared data model and the
//! case-insensitive value-equality helpers are exposed as a library for
//! integration testing.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

pub mod error;

pub use error::CoverageError;

/// Sentinel file path for call targets resolved without a source location
/// (framework or metadata-only declarations).
pub const EXTERNAL_OR_NO_SOURCE: &str = "External or No Source";

/// Sentinel name used when a declaring or enclosing type cannot be determined.
pub const UNKNOWN_CLASS: &str = "Unknown";

// ─── Caseless value equality ─────────────────────────────────────────

/// Case-insensitive string equality (Unicode lowercase folding).
///
/// The single comparison strategy shared by every model type below.
/// [`caseless_hash`] is its companion and must stay consistent with it:
/// strings equal under this function hash identically.
#[must_use]
pub fn caseless_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Hash companion to [`caseless_eq`].
pub fn caseless_hash<H: Hasher>(s: &str, state: &mut H) {
    s.to_lowercase().hash(state);
}

/// Case-insensitive suffix test. Used to decide whether a definition or an
/// invocation lives in the generated client file.
#[must_use]
pub fn caseless_ends_with(s: &str, suffix: &str) -> bool {
    s.to_lowercase().ends_with(&suffix.to_lowercase())
}

// ─── Path / file helpers ─────────────────────────────────────────────

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
#[must_use]
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}

/// Read a file as a String, using lossy UTF-8 conversion for non-UTF8 files.
/// Returns `(content, was_lossy)` where `was_lossy` is true if replacement
/// characters were inserted. Generated clients and legacy test code often
/// carry Windows-1252 smart quotes in comments.
pub fn read_file_lossy(path: &std::path::Path) -> std::io::Result<(String, bool)> {
    let raw = std::fs::read(path)?;
    match String::from_utf8(raw) {
        Ok(s) => Ok((s, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}

// ─── Endpoint ────────────────────────────────────────────────────────

/// An HTTP endpoint drawn from the API contract: method + path.
///
/// Immutable once created. Equality and hashing are case-insensitive on both
/// fields, so `GET /pet` and `get /Pet` are the same endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    pub method: String,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        caseless_eq(&self.method, &other.method) && caseless_eq(&self.path, &other.path)
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        caseless_hash(&self.method, state);
        caseless_hash(&self.path, state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

// ─── Definition ──────────────────────────────────────────────────────

/// Where a resolved call target is declared.
///
/// `file_path` holds [`EXTERNAL_OR_NO_SOURCE`] when the symbol has no
/// resolvable source location; `containing_class` holds [`UNKNOWN_CLASS`]
/// when the declaring type cannot be determined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Definition {
    pub file_path: String,
    pub containing_class: String,
}

impl PartialEq for Definition {
    fn eq(&self, other: &Self) -> bool {
        caseless_eq(&self.file_path, &other.file_path)
            && caseless_eq(&self.containing_class, &other.containing_class)
    }
}

impl Eq for Definition {}

impl Hash for Definition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        caseless_hash(&self.file_path, state);
        caseless_hash(&self.containing_class, state);
    }
}

// ─── Invocation site ─────────────────────────────────────────────────

/// The syntactic location of a call expression. Line and column are 1-based.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationSite {
    pub file_path: String,
    pub containing_class: String,
    pub line: u32,
    pub column: u32,
}

impl PartialEq for InvocationSite {
    fn eq(&self, other: &Self) -> bool {
        caseless_eq(&self.file_path, &other.file_path)
            && caseless_eq(&self.containing_class, &other.containing_class)
            && self.line == other.line
            && self.column == other.column
    }
}

impl Eq for InvocationSite {}

impl Hash for InvocationSite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        caseless_hash(&self.file_path, state);
        caseless_hash(&self.containing_class, state);
        self.line.hash(state);
        self.column.hash(state);
    }
}

// ─── Invocation record ───────────────────────────────────────────────

/// One matched call expression: where the call happens and where its target
/// is declared. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationRecord {
    pub invocation: InvocationSite,
    pub definition: Definition,
}

/// Per-method invocation lists, keyed by client method name.
///
/// Value lists reflect discovery order; that order is not stable across
/// differently-ordered workspace enumerations and nothing downstream may
/// depend on it.
pub type CoverageIndex = std::collections::HashMap<String, Vec<InvocationRecord>>;

/// Final artifact of the pipeline: rendered endpoint string → call count.
pub type CoverageReport = std::collections::HashMap<String, usize>;

// ─── Method binding ──────────────────────────────────────────────────

/// Injective endpoint → client-method-name mapping. Built once by the
/// resolver, read-only afterwards.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    entries: Vec<(Endpoint, String)>,
}

impl MethodBinding {
    /// Build a binding, enforcing injectivity: two endpoints may never
    /// resolve to the same method name.
    pub fn new(entries: Vec<(Endpoint, String)>) -> Result<Self, CoverageError> {
        let mut seen: std::collections::HashMap<&str, &Endpoint> =
            std::collections::HashMap::new();
        for (endpoint, name) in &entries {
            if let Some(first) = seen.insert(name.as_str(), endpoint) {
                return Err(CoverageError::NonUniqueBinding {
                    method_name: name.clone(),
                    first: first.to_string(),
                    second: endpoint.to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Endpoint, &str)> {
        self.entries.iter().map(|(e, n)| (e, n.as_str()))
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, n)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
