//! Coverage aggregation and CSV export.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::{CoverageError, CoverageIndex, CoverageReport, MethodBinding};

/// Join the endpoint binding with the filtered invocation index into the
/// final per-endpoint counts, keyed by the endpoint's display form.
///
/// Every bound method name must be present in the index; a missing key
/// means the pipeline lost a mapping and the report would silently
/// under-count, so it fails instead.
pub fn aggregate(
    binding: &MethodBinding,
    index: &CoverageIndex,
) -> Result<CoverageReport, CoverageError> {
    let mut report = CoverageReport::with_capacity(binding.len());
    for (endpoint, method_name) in binding.iter() {
        let records = index.get(method_name).ok_or_else(|| CoverageError::MissingMapping {
            method_name: method_name.to_string(),
            endpoint: endpoint.to_string(),
        })?;
        report.insert(endpoint.to_string(), records.len());
    }
    debug!(endpoints = report.len(), "coverage aggregated");
    Ok(report)
}

/// Report row ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortBy {
    /// Ascending invocation count, ties broken by endpoint.
    Count,
    /// Endpoint name, ascending.
    Request,
}

/// Flatten the report into `(endpoint, count)` rows in the requested order.
pub fn to_sorted_rows(report: &CoverageReport, sort_by: SortBy) -> Vec<(String, usize)> {
    let mut rows: Vec<(String, usize)> =
        report.iter().map(|(k, v)| (k.clone(), *v)).collect();
    match sort_by {
        SortBy::Count => rows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0))),
        SortBy::Request => rows.sort_by(|a, b| a.0.cmp(&b.0)),
    }
    rows
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_csv(rows: &[(String, usize)]) -> String {
    let mut out = String::from("Request,Count\n");
    for (request, count) in rows {
        out.push_str(&csv_field(request));
        out.push(',');
        out.push_str(&count.to_string());
        out.push('\n');
    }
    out
}

pub fn write_csv(path: &Path, rows: &[(String, usize)]) -> Result<(), CoverageError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(render_csv(rows).as_bytes())?;
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
