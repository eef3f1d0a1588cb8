//! Definition filters: narrow the raw invocation index down to calls that
//! target the generated client from outside it.
//!
//! Stage A keeps records whose definition belongs to the client, checked two
//! independent ways (class name and file-path suffix) that must agree.
//! Stage B then drops the client's internal calls and asserts what survives
//! really crosses the client boundary.

use tracing::debug;

use crate::{caseless_eq, caseless_ends_with, CoverageError, CoverageIndex};

/// Keep only records defined in the generated client.
///
/// For each method the class-name filter and the file-suffix filter are
/// computed independently; any disagreement means the definition metadata is
/// inconsistent and the run cannot be trusted, so it fails rather than
/// guessing which filter is right.
///
/// Class names compare ordinally, file paths case-insensitively by suffix.
pub fn filter_by_definition(
    index: &CoverageIndex,
    class_name: &str,
    file_path_suffix: &str,
) -> Result<CoverageIndex, CoverageError> {
    let mut filtered = CoverageIndex::with_capacity(index.len());

    for (method_name, records) in index {
        let by_class: Vec<_> = records
            .iter()
            .filter(|r| r.definition.containing_class == class_name)
            .cloned()
            .collect();
        let by_path: Vec<_> = records
            .iter()
            .filter(|r| caseless_ends_with(&r.definition.file_path, file_path_suffix))
            .cloned()
            .collect();

        // Both selections preserve the input order, so list equality is
        // exactly selection equality.
        if by_class != by_path {
            return Err(CoverageError::InconsistentDefinition {
                method_name: method_name.clone(),
                class_matches: by_class.len(),
                path_matches: by_path.len(),
            });
        }

        filtered.insert(method_name.clone(), by_class);
    }

    debug!(
        methods = filtered.len(),
        records = filtered.values().map(Vec::len).sum::<usize>(),
        "definition filter applied"
    );
    Ok(filtered)
}

/// Drop invocations made from inside the client itself, then check the
/// postcondition: every surviving record's call site must differ from its
/// definition in both containing class and file path.
///
/// A record is client-internal when its call site sits in the client class
/// AND in the client file. The postcondition catches records that slipped
/// through on one axis only, which would mean the internal/external
/// classification is broken.
pub fn filter_out_client_invocations(
    index: &CoverageIndex,
    class_name: &str,
    file_path_suffix: &str,
) -> Result<CoverageIndex, CoverageError> {
    let mut filtered = CoverageIndex::with_capacity(index.len());

    for (method_name, records) in index {
        let survivors: Vec<_> = records
            .iter()
            .filter(|r| {
                !(r.invocation.containing_class == class_name
                    && caseless_ends_with(&r.invocation.file_path, file_path_suffix))
            })
            .cloned()
            .collect();

        for record in &survivors {
            let same_class = record.invocation.containing_class == record.definition.containing_class;
            let same_file = caseless_eq(&record.invocation.file_path, &record.definition.file_path);
            if same_class || same_file {
                return Err(CoverageError::FilterInvariant {
                    method_name: method_name.clone(),
                    file_path: record.invocation.file_path.clone(),
                    line: record.invocation.line,
                });
            }
        }

        filtered.insert(method_name.clone(), survivors);
    }

    debug!(
        methods = filtered.len(),
        records = filtered.values().map(Vec::len).sum::<usize>(),
        "client-internal invocations removed"
    );
    Ok(filtered)
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
