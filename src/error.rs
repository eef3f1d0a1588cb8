//! Unified error type for the coverage pipeline.

use thiserror::Error;

/// All errors that can occur while computing API coverage.
///
/// Every error is raised at its origin and propagated unmodified to the
/// caller; nothing is retried or downgraded to a warning. Silently mismatched
/// filtering would corrupt the coverage numbers a human will act on, so the
/// pipeline fails fast instead.
#[derive(Error, Debug)]
pub enum CoverageError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// nswag.json or OpenAPI document structure problem
    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },

    /// Failed to download the OpenAPI document
    #[error("Failed to fetch OpenAPI document from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Endpoint path is already quote-delimited, i.e. normalized twice
    #[error("Path {path} already contains quotes")]
    MalformedPath { path: String },

    /// No client method matched the endpoint heuristics
    #[error("No method found matching the specified criteria: {method} {path}")]
    NotFound { method: String, path: String },

    /// More than one client method matched the endpoint heuristics
    #[error("Multiple methods found matching the specified criteria: {} {}. Method names: {}", .method, .path, .candidates.join(", "))]
    AmbiguousMatch {
        method: String,
        path: String,
        candidates: Vec<String>,
    },

    /// Two endpoints resolved to the same client method name
    #[error("Method name '{method_name}' is bound by both '{first}' and '{second}'; each method must map to exactly one endpoint")]
    NonUniqueBinding {
        method_name: String,
        first: String,
        second: String,
    },

    /// Fatal provider failure while opening or reading the workspace
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// The class-name filter and the file-path filter disagree about which
    /// definitions belong to the generated client
    #[error("Definition filters disagree for method '{method_name}': {class_matches} record(s) match the class name, {path_matches} match the file suffix")]
    InconsistentDefinition {
        method_name: String,
        class_matches: usize,
        path_matches: usize,
    },

    /// A client-internal invocation survived the self-reference filter
    #[error("Filter invariant violated for method '{method_name}': invocation at {file_path}:{line} still matches the client definition")]
    FilterInvariant {
        method_name: String,
        file_path: String,
        line: u32,
    },

    /// A bound method name is missing from the filtered index
    #[error("No invocation list for bound method '{method_name}' ({endpoint}); every target name must be initialized before the scan")]
    MissingMapping {
        method_name: String,
        endpoint: String,
    },
}
