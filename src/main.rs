//! API test-coverage analyzer for OpenAPI-generated C# clients.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

// Use mimalloc as the global allocator. It returns freed pages to the OS
// promptly, which matters when parsing thousands of C# files in one run.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Re-export core types from library crate
pub use swagcov::{
    caseless_ends_with, caseless_eq, caseless_hash, clean_path, read_file_lossy, CoverageError,
    CoverageIndex, CoverageReport, Definition, Endpoint, InvocationRecord, InvocationSite,
    MethodBinding, EXTERNAL_OR_NO_SOURCE, UNKNOWN_CLASS,
};

mod cli;
mod contract;
mod filter;
mod report;
mod resolver;
mod workspace;

fn main() {
    cli::run();
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
