//! Contract layer: nswag.json parsing and OpenAPI endpoint extraction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{clean_path, read_file_lossy, CoverageError, Endpoint};

/// HTTP methods considered part of the contract. Vendor extensions and the
/// `parameters` key that can appear next to them in a path item are ignored.
const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"];

/// Identity of the generated client: where it lives and what it is called.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub file_path: PathBuf,
    pub class_name: String,
}

fn config_err(path: &Path, message: impl Into<String>) -> CoverageError {
    CoverageError::Config {
        path: path.display().to_string(),
        message: message.into(),
    }
}

fn load_json(path: &Path) -> Result<Value, CoverageError> {
    if !path.is_file() {
        return Err(config_err(path, "file not found"));
    }
    let (content, _) = read_file_lossy(path)?;
    serde_json::from_str(&content).map_err(|e| config_err(path, format!("invalid JSON: {e}")))
}

/// Extract a string property from a dotted section path in the nswag.json
/// document, e.g. section `codeGenerators.openApiToCSharpClient`,
/// property `className`.
fn extract_property<'a>(
    doc: &'a Value,
    config_path: &Path,
    section_path: &str,
    property: &str,
) -> Result<&'a str, CoverageError> {
    let mut current = doc;
    for section in section_path.split('.') {
        current = current.get(section).ok_or_else(|| {
            config_err(config_path, format!("missing section '{section}' (in '{section_path}')"))
        })?;
    }
    let value = current
        .get(property)
        .ok_or_else(|| {
            config_err(config_path, format!("missing property '{property}' in section '{section_path}'"))
        })?
        .as_str()
        .ok_or_else(|| {
            config_err(config_path, format!("property '{property}' in section '{section_path}' is not a string"))
        })?;
    if value.trim().is_empty() {
        return Err(config_err(
            config_path,
            format!("property '{property}' in section '{section_path}' is empty"),
        ));
    }
    Ok(value)
}

/// Read the generated client's file path and class name from nswag.json.
/// The `output` path is resolved relative to the config file's directory and
/// must exist on disk.
pub fn extract_client_info(config_path: &Path) -> Result<ClientInfo, CoverageError> {
    let doc = load_json(config_path)?;
    let section = "codeGenerators.openApiToCSharpClient";
    let output = extract_property(&doc, config_path, section, "output")?;
    let class_name = extract_property(&doc, config_path, section, "className")?.to_string();

    let config_dir = config_path
        .parent()
        .ok_or_else(|| config_err(config_path, "cannot determine the config file's directory"))?;
    let joined = config_dir.join(output);
    let file_path = std::fs::canonicalize(&joined).unwrap_or(joined);
    let file_path = PathBuf::from(clean_path(&file_path.to_string_lossy()));

    if !file_path.is_file() {
        return Err(config_err(
            config_path,
            format!("generated client file not found at {}", file_path.display()),
        ));
    }

    Ok(ClientInfo { file_path, class_name })
}

/// Locate and load the OpenAPI document named by
/// `documentGenerator.fromDocument.url`. An `http(s)://` URL is fetched;
/// anything else is read as a file path relative to the config directory.
fn load_openapi_document(doc: &Value, config_path: &Path) -> Result<Value, CoverageError> {
    let url = extract_property(doc, config_path, "documentGenerator.fromDocument", "url")?;

    let content = if url.starts_with("http://") || url.starts_with("https://") {
        let fetch_err = |message: String| CoverageError::Fetch {
            url: url.to_string(),
            message,
        };
        let response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;
        response.text().map_err(|e| fetch_err(e.to_string()))?
    } else {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| config_err(config_path, "cannot determine the config file's directory"))?;
        let doc_path = config_dir.join(url);
        if !doc_path.is_file() {
            return Err(config_err(
                config_path,
                format!("OpenAPI document not found at {}", doc_path.display()),
            ));
        }
        read_file_lossy(&doc_path)?.0
    };

    serde_json::from_str(&content)
        .map_err(|e| config_err(config_path, format!("invalid OpenAPI JSON from '{url}': {e}")))
}

/// Extract every unique (method, path) pair from the contract's `paths`
/// object. Uniqueness is case-insensitive via `Endpoint` equality.
pub fn extract_endpoints(config_path: &Path) -> Result<HashSet<Endpoint>, CoverageError> {
    let config = load_json(config_path)?;
    let openapi = load_openapi_document(&config, config_path)?;

    let paths = openapi
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| config_err(config_path, "OpenAPI document has no 'paths' object"))?;

    let mut endpoints = HashSet::new();
    for (path, item) in paths {
        let Some(operations) = item.as_object() else {
            continue;
        };
        for method in operations.keys() {
            let method = method.to_uppercase();
            if HTTP_METHODS.contains(&method.as_str()) {
                endpoints.insert(Endpoint::new(method, path.clone()));
            }
        }
    }
    Ok(endpoints)
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "contract_tests.rs"]
mod tests;
