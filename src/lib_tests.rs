//! Data model tests: caseless equality/hash consistency and binding rules.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use super::*;

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_caseless_eq_basic() {
    assert!(caseless_eq("GetPetAsync", "getpetasync"));
    assert!(caseless_eq("C:\\Projects\\Client.cs", "c:\\projects\\client.cs"));
    assert!(!caseless_eq("GetPetAsync", "AddPetAsync"));
}

#[test]
fn test_caseless_ends_with() {
    assert!(caseless_ends_with("C:\\Projects\\Api\\PetClient.cs", "petclient.CS"));
    assert!(!caseless_ends_with("C:\\Projects\\Api\\PetClient.cs", "OtherClient.cs"));
    // An absent-source sentinel must never suffix-match a real client path.
    assert!(!caseless_ends_with(EXTERNAL_OR_NO_SOURCE, "PetClient.cs"));
}

#[test]
fn test_clean_path_strips_extended_prefix() {
    assert_eq!(clean_path(r"\\?\C:\Projects\a.cs"), r"C:\Projects\a.cs");
    assert_eq!(clean_path("/home/user/a.cs"), "/home/user/a.cs");
}

#[test]
fn test_endpoint_equality_is_case_insensitive() {
    let a = Endpoint::new("GET", "/pet/{petId}");
    let b = Endpoint::new("get", "/PET/{petid}");
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_endpoint_display_renders_method_and_path() {
    let e = Endpoint::new("POST", "/pet");
    assert_eq!(e.to_string(), "POST /pet");
}

#[test]
fn test_definition_equality_is_case_insensitive_on_both_fields() {
    let a = Definition {
        file_path: "C:\\Api\\PetClient.cs".to_string(),
        containing_class: "PetClient".to_string(),
    };
    let b = Definition {
        file_path: "c:\\api\\petclient.CS".to_string(),
        containing_class: "PETCLIENT".to_string(),
    };
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn test_invocation_site_line_column_are_exact() {
    let a = InvocationSite {
        file_path: "tests/PetTests.cs".to_string(),
        containing_class: "PetTests".to_string(),
        line: 10,
        column: 5,
    };
    let mut b = a.clone();
    b.file_path = "TESTS/pettests.cs".to_string();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    b.line = 11;
    assert_ne!(a, b);
}

#[test]
fn test_method_binding_rejects_duplicate_method_names() {
    let entries = vec![
        (Endpoint::new("GET", "/pet/{id}"), "GetPetAsync".to_string()),
        (Endpoint::new("GET", "/pet"), "GetPetAsync".to_string()),
    ];
    let err = MethodBinding::new(entries).unwrap_err();
    match err {
        CoverageError::NonUniqueBinding { method_name, first, second } => {
            assert_eq!(method_name, "GetPetAsync");
            assert_ne!(first, second);
        }
        other => panic!("expected NonUniqueBinding, got {other:?}"),
    }
}

#[test]
fn test_method_binding_accepts_injective_mapping() {
    let entries = vec![
        (Endpoint::new("GET", "/pet/{id}"), "GetPetAsync".to_string()),
        (Endpoint::new("POST", "/pet"), "AddPetAsync".to_string()),
    ];
    let binding = MethodBinding::new(entries).unwrap();
    assert_eq!(binding.len(), 2);
    let names: Vec<&str> = binding.method_names().collect();
    assert_eq!(names, vec!["GetPetAsync", "AddPetAsync"]);
}

#[test]
fn test_read_file_lossy_handles_non_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.cs");
    // 0x92 is a Windows-1252 smart quote, invalid as UTF-8
    std::fs::write(&path, b"// client\x92s method\nclass A {}").unwrap();
    let (content, was_lossy) = read_file_lossy(&path).unwrap();
    assert!(was_lossy);
    assert!(content.contains("class A"));
}

mod caseless_props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Companion-hash contract: strings equal under caseless_eq must
        /// hash identically.
        #[test]
        fn caseless_eq_implies_equal_hash(s in "[a-zA-Z0-9/{}_.\\\\-]{0,40}") {
            let upper = s.to_uppercase();
            let lower = s.to_lowercase();
            prop_assert!(caseless_eq(&upper, &lower));

            let mut h1 = DefaultHasher::new();
            caseless_hash(&upper, &mut h1);
            let mut h2 = DefaultHasher::new();
            caseless_hash(&lower, &mut h2);
            prop_assert_eq!(h1.finish(), h2.finish());
        }

        #[test]
        fn endpoint_eq_consistent_with_hash(m in "(GET|post|Put|DELETE)", p in "/[a-z{}/]{0,20}") {
            let a = Endpoint::new(m.to_uppercase(), p.to_uppercase());
            let b = Endpoint::new(m.to_lowercase(), p.to_lowercase());
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }
    }
}
