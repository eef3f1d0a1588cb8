//! Contract extraction tests using on-disk nswag.json + OpenAPI fixtures.

use super::*;
use crate::CoverageError;

fn write_fixture(dir: &Path, swagger_url: &str) -> PathBuf {
    std::fs::create_dir_all(dir.join("Generated")).unwrap();
    std::fs::write(dir.join("Generated/PetClient.cs"), "public partial class PetClient { }").unwrap();
    let nswag = format!(
        r#"{{
  "documentGenerator": {{
    "fromDocument": {{ "url": "{swagger_url}" }}
  }},
  "codeGenerators": {{
    "openApiToCSharpClient": {{
      "className": "PetClient",
      "output": "Generated/PetClient.cs"
    }}
  }}
}}"#
    );
    let path = dir.join("nswag.json");
    std::fs::write(&path, nswag).unwrap();
    path
}

fn write_swagger(dir: &Path) {
    std::fs::write(
        dir.join("swagger.json"),
        r#"{
  "paths": {
    "/pet/{petId}": {
      "get": { "operationId": "getPet" },
      "delete": { "operationId": "deletePet" },
      "parameters": [ { "name": "petId" } ]
    },
    "/pet": {
      "post": { "operationId": "addPet" },
      "x-amazon-apigateway-any-method": { }
    }
  }
}"#,
    )
    .unwrap();
}

#[test]
fn test_extract_client_info() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "swagger.json");

    let info = extract_client_info(&config).unwrap();
    assert_eq!(info.class_name, "PetClient");
    assert!(info.file_path.is_file());
    assert!(info.file_path.to_string_lossy().ends_with("PetClient.cs"));
}

#[test]
fn test_extract_client_info_missing_client_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "swagger.json");
    std::fs::remove_file(dir.path().join("Generated/PetClient.cs")).unwrap();

    let err = extract_client_info(&config).unwrap_err();
    assert!(matches!(err, CoverageError::Config { .. }));
    assert!(err.to_string().contains("generated client file not found"));
}

#[test]
fn test_extract_property_missing_section() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nswag.json");
    std::fs::write(&config, r#"{ "documentGenerator": {} }"#).unwrap();

    let err = extract_client_info(&config).unwrap_err();
    assert!(err.to_string().contains("missing section 'codeGenerators'"));
}

#[test]
fn test_extract_property_empty_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nswag.json");
    std::fs::write(
        &config,
        r#"{ "codeGenerators": { "openApiToCSharpClient": { "output": "  ", "className": "X" } } }"#,
    )
    .unwrap();

    let err = extract_client_info(&config).unwrap_err();
    assert!(err.to_string().contains("'output'"));
    assert!(err.to_string().contains("empty"));
}

#[test]
fn test_extract_endpoints_from_local_document() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "swagger.json");
    write_swagger(dir.path());

    let endpoints = extract_endpoints(&config).unwrap();
    assert_eq!(endpoints.len(), 3);
    assert!(endpoints.contains(&Endpoint::new("GET", "/pet/{petId}")));
    assert!(endpoints.contains(&Endpoint::new("DELETE", "/pet/{petId}")));
    assert!(endpoints.contains(&Endpoint::new("POST", "/pet")));
    // "parameters" and vendor extensions are not HTTP methods
    assert!(!endpoints.iter().any(|e| e.method.eq_ignore_ascii_case("parameters")));
}

#[test]
fn test_extract_endpoints_missing_paths_object() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "swagger.json");
    std::fs::write(dir.path().join("swagger.json"), r#"{ "info": {} }"#).unwrap();

    let err = extract_endpoints(&config).unwrap_err();
    assert!(err.to_string().contains("no 'paths' object"));
}

#[test]
fn test_extract_endpoints_missing_document() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "missing.json");

    let err = extract_endpoints(&config).unwrap_err();
    assert!(err.to_string().contains("OpenAPI document not found"));
}

#[test]
fn test_invalid_config_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nswag.json");
    std::fs::write(&config, "{ not json").unwrap();

    let err = extract_client_info(&config).unwrap_err();
    assert!(err.to_string().contains("invalid JSON"));
}
