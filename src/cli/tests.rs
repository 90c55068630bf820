//! Unit tests for CLI commands

use crate::cli::{run, Cli, Commands};
use crate::runtime_config::RuntimeConfig;
use clap::Parser;
use std::io::Write;

const CONFIG: &str = r#"
path: /
operations:
  - name: health
    method: GET
    path: /health
    produces: [application/json]
children:
  - path: /pets/{pet_id}
    operations:
      - name: get_pet
        method: GET
        path: /
        produces: [application/json, text/html]
      - name: delete_pet
        method: DELETE
        path: /
        role_guard: ROLE_ADMIN
"#;

fn config_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    file
}

fn run_args(args: &[&str]) -> serde_json::Value {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    run(cli, &RuntimeConfig::default(), &mut out).unwrap();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn test_resolve_command_parses() {
    let cli = Cli::try_parse_from([
        "brrtdispatch",
        "resolve",
        "--config",
        "r.yaml",
        "--path",
        "/pets/1",
        "-H",
        "Accept: text/html",
        "-H",
        "X-Client-Version: 2",
        "--role",
        "ROLE_USER",
        "--body",
    ])
    .unwrap();
    match cli.command {
        Commands::Resolve {
            method,
            headers,
            roles,
            body,
            ..
        } => {
            assert_eq!(method, "GET");
            assert_eq!(headers.len(), 2);
            assert_eq!(roles, vec!["ROLE_USER".to_string()]);
            assert!(body);
        }
        Commands::Inspect { .. } => panic!("Expected Resolve command"),
    }
}

#[test]
fn test_inspect_prints_tree() {
    let file = config_file();
    let path = file.path().to_str().unwrap();
    let value = run_args(&["brrtdispatch", "inspect", "--config", path]);
    assert_eq!(value["resources"], 2);
    assert_eq!(value["candidates"], 3);
    assert_eq!(value["tree"]["operations"][0]["name"], "health");
    assert_eq!(value["tree"]["children"][0]["full_path"], "/pets/{pet_id}");
    assert_eq!(
        value["tree"]["children"][0]["operations"][1]["role_guard"],
        "ROLE_ADMIN"
    );
}

#[test]
fn test_resolve_prints_selection() {
    let file = config_file();
    let path = file.path().to_str().unwrap();
    let value = run_args(&[
        "brrtdispatch",
        "resolve",
        "--config",
        path,
        "--path",
        "/pets/42",
        "-H",
        "Accept: text/html",
    ]);
    assert_eq!(value["status"], 200);
    assert_eq!(value["operation"], "get_pet");
    assert_eq!(value["path_vars"]["pet_id"], "42");
    assert_eq!(value["response_media_type"], "text/html");
}

#[test]
fn test_resolve_prints_rejection() {
    let file = config_file();
    let path = file.path().to_str().unwrap();
    let value = run_args(&[
        "brrtdispatch",
        "resolve",
        "--config",
        path,
        "--method",
        "DELETE",
        "--path",
        "/pets/42",
    ]);
    assert_eq!(value["status"], 403);
    assert_eq!(value["reason"], "guard_denied");
}

#[test]
fn test_bad_header_argument() {
    let file = config_file();
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from([
        "brrtdispatch",
        "resolve",
        "--config",
        path,
        "--path",
        "/",
        "-H",
        "no-colon",
    ])
    .unwrap();
    let mut out = Vec::new();
    assert!(run(cli, &RuntimeConfig::default(), &mut out).is_err());
}

#[test]
fn test_missing_config_fails() {
    let cli = Cli::try_parse_from(["brrtdispatch", "inspect", "--config", "/nonexistent.yaml"]).unwrap();
    let mut out = Vec::new();
    assert!(run(cli, &RuntimeConfig::default(), &mut out).is_err());
}
