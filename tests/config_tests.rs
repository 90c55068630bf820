mod common;

use std::sync::Arc;

use brrtdispatch::call::RequestSeed;
use brrtdispatch::config::{load_dispatcher, load_resource};
use brrtdispatch::dispatcher::{Dispatcher, ResourceBuilder};
use brrtdispatch::error::ConfigError;
use brrtdispatch::registry::CandidateBuilder;
use brrtdispatch::runtime_config::RuntimeConfig;
use brrtdispatch::stats::DispatchStats;
use common::calls::outcome;
use common::temp_files::create_temp_config;

const PETSTORE_YAML: &str = r#"
path: /
roles_declared: [ROLE_ADMIN, ROLE_AUDITOR, ROLE_USER]
operations:
  - name: health
    method: GET
    path: /health
children:
  - path: /pets
    operations:
      - name: list_pets
        method: GET
        path: /
        produces: [application/json, text/csv]
      - name: add_pet
        method: POST
        path: /
        consumes: [application/json]
        role_guard: ROLE_ADMIN | ROLE_USER
      - name: get_pet
        method: GET
        path: /{id}
        produces: [application/json]
        client_version: "[1.0,)"
      - name: delete_pet
        method: DELETE
        path: /{id}
        role_guard: ROLE_A*
"#;

const PETSTORE_JSON: &str = r#"{
  "path": "/",
  "children": [
    {
      "path": "/pets",
      "operations": [
        { "name": "list_pets", "method": "GET", "path": "/", "produces": ["application/json"] },
        { "name": "export_pets", "method": "GET", "path": "/", "produces": ["text/csv"], "default_accept": "text/csv" }
      ]
    }
  ]
}"#;

#[test]
fn test_yaml_tree_dispatches() {
    let file = create_temp_config(PETSTORE_YAML, "yaml");
    let d = load_dispatcher(file.path(), &RuntimeConfig::default(), None).unwrap();
    assert_eq!(d.resource_count(), 2);
    assert_eq!(d.candidate_count(), 5);

    let csv = RequestSeed::new("GET", "/pets").header("Accept", "text/csv");
    assert_eq!(outcome(&d, csv), Ok("list_pets".to_string()));

    let add = RequestSeed::new("POST", "/pets")
        .header("Content-Type", "application/json")
        .role("ROLE_USER")
        .with_body();
    assert_eq!(outcome(&d, add), Ok("add_pet".to_string()));

    let get = RequestSeed::new("GET", "/pets/3").header("X-Client-Version", "1.2");
    assert_eq!(outcome(&d, get), Ok("get_pet".to_string()));

    let delete = RequestSeed::new("DELETE", "/pets/3").role("ROLE_AUDITOR");
    assert_eq!(outcome(&d, delete), Ok("delete_pet".to_string()));
    let delete = RequestSeed::new("DELETE", "/pets/3").role("ROLE_USER");
    assert_eq!(outcome(&d, delete), Err(403));
}

#[test]
fn test_json_default_accept() {
    let file = create_temp_config(PETSTORE_JSON, "json");
    let d = load_dispatcher(file.path(), &RuntimeConfig::default(), None).unwrap();
    // export_pets falls back to its own default; list_pets to */*
    assert_eq!(outcome(&d, RequestSeed::new("GET", "/pets")), Ok("list_pets".to_string()));
    let csv = RequestSeed::new("GET", "/pets").header("Accept", "text/csv");
    assert_eq!(outcome(&d, csv), Ok("export_pets".to_string()));
}

#[test]
fn test_toml_tree_with_stats() {
    let toml = r#"
path = "/"

[[operations]]
name = "health"
method = "GET"
path = "/health"
"#;
    let file = create_temp_config(toml, "toml");
    let stats = Arc::new(DispatchStats::new());
    let d = load_dispatcher(file.path(), &RuntimeConfig::default(), Some(Arc::clone(&stats))).unwrap();
    assert_eq!(outcome(&d, RequestSeed::new("GET", "/health")), Ok("health".to_string()));
    assert_eq!(stats.total_dispatches(), 1);
}

#[test]
fn test_unknown_field_is_rejected() {
    let file = create_temp_config("path: /\noperatons: []\n", "yaml");
    let err = load_resource(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse resource config"));
}

#[test]
fn test_invalid_guard_names_owner() {
    let yaml = r#"
path: /
children:
  - path: /admin
    role_guard: "ROLE_ADMIN &&"
"#;
    let file = create_temp_config(yaml, "yaml");
    let err = load_dispatcher(file.path(), &RuntimeConfig::default(), None).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Invalid resource config"), "{message}");
    assert!(message.contains("/admin"), "{message}");
}

#[test]
fn test_duplicate_variable_rejected() {
    let yaml = r#"
path: /
operations:
  - name: pair
    method: GET
    path: /{id}/{id}
"#;
    let file = create_temp_config(yaml, "yaml");
    let err = load_dispatcher(file.path(), &RuntimeConfig::default(), None).unwrap_err();
    assert!(format!("{err:#}").contains("more than once"));
}

#[test]
fn test_invalid_version_header_rejected() {
    let yaml = r#"
path: /
children:
  - path: /v
    version_header: "bad header"
    operations:
      - name: versioned
        method: GET
        path: /
        client_version: "1.0"
"#;
    let file = create_temp_config(yaml, "yaml");
    let err = load_dispatcher(file.path(), &RuntimeConfig::default(), None).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("invalid client version header"), "{message}");
    assert!(message.contains("/v"), "{message}");

    let root = ResourceBuilder::new("/v")
        .version_header("bad header\n")
        .operation(CandidateBuilder::new("versioned", "GET", "/").client_version("1.0"));
    match Dispatcher::build(root, &RuntimeConfig::default()) {
        Err(ConfigError::InvalidVersionHeader { owner, header }) => {
            assert_eq!(owner, "/v");
            assert_eq!(header, "bad header\n");
        }
        other => panic!("Expected InvalidVersionHeader, got {:?}", other.map(|_| ())),
    }

    let root = ResourceBuilder::new("/v")
        .version_header("X-Api-Version")
        .operation(CandidateBuilder::new("versioned", "GET", "/").client_version("1.0"));
    assert!(Dispatcher::build(root, &RuntimeConfig::default()).is_ok());
}

#[test]
fn test_unsupported_extension() {
    let file = create_temp_config("path: /", "ini");
    assert!(load_resource(file.path()).is_err());
}
