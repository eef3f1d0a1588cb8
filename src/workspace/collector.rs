//! Invocation collector: fans the per-document scan out over scoped
//! threads and merges everything into one invocation index.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::provider::{effective_threads, CallSite, ResolvedSymbol, SourceAnalysisProvider};
use crate::{
    CoverageError, CoverageIndex, Definition, InvocationRecord, InvocationSite,
    EXTERNAL_OR_NO_SOURCE, UNKNOWN_CLASS,
};

/// Scan every workspace document for calls to the target method names and
/// group the resulting records by method name.
///
/// Every target gets an entry even when no document calls it, so zero
/// coverage shows up as an empty list rather than a missing key. The first
/// document that fails to scan aborts the remaining work and its error is
/// returned.
pub fn collect_invocations(
    provider: &dyn SourceAnalysisProvider,
    targets: &HashSet<String>,
    threads: usize,
) -> Result<CoverageIndex, CoverageError> {
    let mut index: CoverageIndex = targets
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    let documents = provider.documents();
    if documents.is_empty() || targets.is_empty() {
        return Ok(index);
    }

    let num_threads = effective_threads(threads);
    let chunk_size = documents.len().div_ceil(num_threads).max(1);
    let abort = AtomicBool::new(false);

    let thread_results: Vec<Result<Vec<(String, InvocationRecord)>, CoverageError>> =
        std::thread::scope(|s| {
            let handles: Vec<_> = documents
                .chunks(chunk_size)
                .map(|chunk| {
                    let abort = &abort;
                    s.spawn(move || {
                        let mut records = Vec::new();
                        for document in chunk {
                            if abort.load(Ordering::Relaxed) {
                                break;
                            }
                            match scan_document(provider, document, targets) {
                                Ok(found) => records.extend(found),
                                Err(e) => {
                                    abort.store(true, Ordering::Relaxed);
                                    return Err(e);
                                }
                            }
                        }
                        Ok(records)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(CoverageError::Workspace(
                            "worker thread panicked during invocation scan".to_string(),
                        ))
                    })
                })
                .collect()
        });

    let mut total = 0usize;
    for result in thread_results {
        for (name, record) in result? {
            // Targets were pre-initialized; scan_document only emits
            // target names.
            if let Some(records) = index.get_mut(&name) {
                records.push(record);
                total += 1;
            }
        }
    }
    debug!(invocations = total, targets = targets.len(), "invocation scan merged");
    Ok(index)
}

/// Scan one document: keep call sites whose simple name is a target and
/// that resolve to some declaration. A call that fails to resolve is an
/// expected gap (dynamic dispatch, unknown receiver) and is skipped;
/// a resolved symbol without a source location or declaring type falls back
/// to the "External or No Source" / "Unknown" markers.
fn scan_document(
    provider: &dyn SourceAnalysisProvider,
    document: &str,
    targets: &HashSet<String>,
) -> Result<Vec<(String, InvocationRecord)>, CoverageError> {
    let mut records = Vec::new();
    for call in provider.call_sites(document)? {
        if !targets.contains(&call.simple_name) {
            continue;
        }
        let Some(symbol) = provider.resolve(&call) else {
            continue;
        };
        let record = materialize(&call, symbol);
        records.push((call.simple_name, record));
    }
    Ok(records)
}

fn materialize(call: &CallSite, symbol: ResolvedSymbol) -> InvocationRecord {
    let definition_path = symbol
        .declaration_file_path
        .unwrap_or_else(|| EXTERNAL_OR_NO_SOURCE.to_string());
    let definition_class = symbol
        .declaring_type_name
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string());

    InvocationRecord {
        invocation: InvocationSite {
            file_path: call.file_path.clone(),
            containing_class: call
                .enclosing_type
                .clone()
                .unwrap_or_else(|| UNKNOWN_CLASS.to_string()),
            line: call.line,
            column: call.column,
        },
        definition: Definition {
            file_path: definition_path,
            containing_class: definition_class,
        },
    }
}
