//! End-to-end pipeline test over a realistic pet-store fixture:
//! contract extraction, method resolution, workspace scan, filtering,
//! and aggregation chained exactly as the coverage command runs them.

use std::collections::HashSet;

use crate::workspace::{collect_invocations, CsWorkspace, SourceAnalysisProvider};
use crate::{clean_path, contract, filter, read_file_lossy, report, resolver};

const NSWAG: &str = r#"{
  "documentGenerator": {
    "fromDocument": { "url": "swagger.json" }
  },
  "codeGenerators": {
    "openApiToCSharpClient": {
      "className": "PetClient",
      "output": "Generated/PetClient.cs"
    }
  }
}"#;

const SWAGGER: &str = r#"{
  "paths": {
    "/pet/{petId}": {
      "get": { "operationId": "getPet" }
    },
    "/pet": {
      "post": { "operationId": "addPet" }
    }
  }
}"#;

const CLIENT: &str = r#"
namespace PetStore.Generated
{
    public partial class PetClient
    {
        /// <summary>Find pet by ID.</summary>
        /// Operation: "pet/{petId}"
        public virtual async Task<Pet> GetPetAsync(long petId)
        {
            var request_ = new HttpRequestMessage();
            request_.Method = new HttpMethod("GET");
            return null;
        }

        /// <summary>Add a new pet.</summary>
        /// Operation: "pet"
        public virtual async Task AddPetAsync(Pet body)
        {
            var request_ = new HttpRequestMessage();
            request_.Method = new HttpMethod("POST");
        }

        public Task<Pet> GetPetOrDefaultAsync(long petId)
        {
            return GetPetAsync(petId);
        }
    }
}
"#;

const SERVICE: &str = r#"
namespace PetStore.Tests
{
    public class PetServiceTests
    {
        private readonly PetClient _client;

        public async Task Fetches_existing_pet()
        {
            var pet = await _client.GetPetAsync(1);
        }

        public async Task Fetches_missing_pet()
        {
            var pet = await _client.GetPetAsync(404);
        }
    }
}
"#;

fn write_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Generated")).unwrap();
    std::fs::create_dir_all(dir.path().join("Tests")).unwrap();
    std::fs::write(dir.path().join("nswag.json"), NSWAG).unwrap();
    std::fs::write(dir.path().join("swagger.json"), SWAGGER).unwrap();
    std::fs::write(dir.path().join("Generated/PetClient.cs"), CLIENT).unwrap();
    std::fs::write(dir.path().join("Tests/PetServiceTests.cs"), SERVICE).unwrap();
    dir
}

#[test]
fn test_coverage_pipeline_end_to_end() {
    let dir = write_workspace();
    let config = dir.path().join("nswag.json");

    // contract + resolution
    let client = contract::extract_client_info(&config).unwrap();
    assert_eq!(client.class_name, "PetClient");
    let endpoints = contract::extract_endpoints(&config).unwrap();
    assert_eq!(endpoints.len(), 2);

    let (client_source, _) = read_file_lossy(&client.file_path).unwrap();
    let binding = resolver::build_binding(&client_source, &endpoints).unwrap();
    assert_eq!(binding.len(), 2);

    // workspace scan
    let workspace = CsWorkspace::open(dir.path(), 2).unwrap();
    assert_eq!(workspace.documents().len(), 2);

    let targets: HashSet<String> = binding.method_names().map(str::to_string).collect();
    let index = collect_invocations(&workspace, &targets, 2).unwrap();
    // two calls from the tests plus one internal client call
    assert_eq!(index["GetPetAsync"].len(), 3);
    assert!(index["AddPetAsync"].is_empty());

    // filters
    let suffix = clean_path(&client.file_path.to_string_lossy());
    let defined = filter::filter_by_definition(&index, &client.class_name, &suffix).unwrap();
    assert_eq!(defined["GetPetAsync"].len(), 3);

    let external =
        filter::filter_out_client_invocations(&defined, &client.class_name, &suffix).unwrap();
    assert_eq!(external["GetPetAsync"].len(), 2);
    assert!(external["GetPetAsync"]
        .iter()
        .all(|r| r.invocation.containing_class == "PetServiceTests"));

    // aggregation + export
    let coverage = report::aggregate(&binding, &external).unwrap();
    assert_eq!(coverage["GET /pet/{petId}"], 2);
    assert_eq!(coverage["POST /pet"], 0);

    let rows = report::to_sorted_rows(&coverage, report::SortBy::Count);
    assert_eq!(rows[0], ("POST /pet".to_string(), 0));
    assert_eq!(rows[1], ("GET /pet/{petId}".to_string(), 2));

    let csv_path = dir.path().join("invocationsCount.csv");
    report::write_csv(&csv_path, &rows).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv, "Request,Count\nPOST /pet,0\nGET /pet/{petId},2\n");
}
