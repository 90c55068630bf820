use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::call::{CallState, RequestSeed};
use crate::config::load_dispatcher;
use crate::dispatcher::Dispatcher;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::registry::Candidate;
use crate::runtime_config::RuntimeConfig;

/// Command-line interface for brrtdispatch
///
/// Loads a resource tree from a configuration file and either prints it or
/// dispatches one synthetic call against it.
#[derive(Parser)]
#[command(name = "brrtdispatch")]
#[command(about = "Inspect resource trees and resolve synthetic calls", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the resource tree with every operation
    Inspect {
        /// Resource tree file (YAML, TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Dispatch one call and print the outcome
    Resolve {
        /// Resource tree file (YAML, TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request target, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Request header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Role granted to the caller (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Treat the request as carrying a body
        #[arg(long, default_value_t = false)]
        body: bool,
    },
}

/// Parse arguments, initialise logging and run the selected command
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(&LogConfig::from_env())?;
    run(cli, &RuntimeConfig::from_env(), &mut io::stdout().lock())
}

/// Run a parsed command, writing JSON to `out`
pub fn run(cli: Cli, runtime: &RuntimeConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let value = match cli.command {
        Commands::Inspect { config } => {
            let dispatcher = load_dispatcher(&config, runtime, None)?;
            json!({
                "resources": dispatcher.resource_count(),
                "candidates": dispatcher.candidate_count(),
                "tree": describe_resource(&dispatcher),
            })
        }
        Commands::Resolve {
            config,
            method,
            path,
            headers,
            roles,
            body,
        } => {
            let dispatcher = load_dispatcher(&config, runtime, None)?;
            let mut seed = RequestSeed::new(method, &path);
            for header in &headers {
                let Some((name, value)) = header.split_once(':') else {
                    bail!("Header must be 'Name: value', got '{header}'");
                };
                seed = seed.header(name.trim(), value.trim());
            }
            for role in roles {
                seed = seed.role(role);
            }
            if body {
                seed = seed.with_body();
            }
            describe_call(&dispatcher.dispatch_seed(seed))
        }
    };
    serde_json::to_writer_pretty(&mut *out, &value).context("Failed to write output")?;
    writeln!(out)?;
    Ok(())
}

fn describe_candidate(c: &Candidate) -> Value {
    json!({
        "name": c.name(),
        "method": c.method().to_string(),
        "path": c.template().as_str(),
        "produces": c.produces(),
        "consumes": c.consumes(),
        "client_version": c.client_version().map(|r| r.as_str()),
        "role_guard": c.role_guard().map(|g| g.expression().as_str()),
        "guards": c.guards().iter().map(|g| g.name()).collect::<Vec<_>>(),
    })
}

fn describe_resource(d: &Dispatcher) -> Value {
    json!({
        "path": d.template().as_str(),
        "full_path": d.full_path(),
        "version_header": &*d.registry().settings().version_header,
        "operations": d.registry().candidates().iter().map(|c| describe_candidate(c)).collect::<Vec<_>>(),
        "children": d.children().iter().map(describe_resource).collect::<Vec<_>>(),
    })
}

fn describe_call(call: &CallState) -> Value {
    match (call.selected(), call.rejection()) {
        (Some(candidate), _) => json!({
            "status": 200,
            "operation": candidate.name(),
            "method": call.method().map(|m| m.as_str()),
            "path_vars": call.path_vars_map(),
            "remainder": call.remainder(),
            "request_media_type": call.request_media_type(),
            "response_media_type": call.response_media_type(),
        }),
        (None, Some(rejection)) => json!({
            "status": rejection.status().as_u16(),
            "reason": rejection.reason(),
            "allow": rejection.allow_header(),
            "message": rejection.to_string(),
        }),
        (None, None) => json!({ "status": null }),
    }
}
