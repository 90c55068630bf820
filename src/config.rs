//! Declarative resource trees loaded from YAML, TOML or JSON files.
//!
//! The file format is picked from the extension (`.yaml`/`.yml`, `.toml`,
//! `.json`). All three describe the same [`ResourceConfig`] shape:
//!
//! ```yaml
//! path: /
//! roles_declared: [ROLE_ADMIN, ROLE_AUDITOR, ROLE_USER]
//! operations:
//!   - name: health
//!     method: GET
//!     path: /health
//!     produces: [application/json]
//! children:
//!   - path: /pets/{pet_id}
//!     role_guard: "ROLE_USER || ROLE_A*"
//!     operations:
//!       - name: get_pet
//!         method: GET
//!         path: /
//!         produces: [application/json, text/html]
//!         client_version: "[1.0,2.0)"
//! ```
//!
//! Unknown fields are rejected so typos fail at start-up instead of silently
//! widening access.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::dispatcher::{Dispatcher, ResourceBuilder};
use crate::registry::CandidateBuilder;
use crate::runtime_config::RuntimeConfig;
use crate::stats::DispatchStats;

/// One resource and its subtree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Template relative to the parent resource
    pub path: String,
    /// Client version header override for this subtree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_header: Option<String>,
    /// Roles universe for glob tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles_declared: Option<Vec<String>>,
    /// Role expression applied to every operation of the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_guard: Option<String>,
    /// Operations registered directly on this resource
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
    /// Nested resources, tried in order
    #[serde(default)]
    pub children: Vec<ResourceConfig>,
}

/// One operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OperationConfig {
    /// Handler identifier, unique within the resource
    pub name: String,
    /// HTTP method or `*`
    pub method: String,
    /// Template relative to the owning resource
    pub path: String,
    /// Response media types
    #[serde(default)]
    pub produces: Vec<String>,
    /// Request body media types
    #[serde(default)]
    pub consumes: Vec<String>,
    /// Client version range expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
    /// Role expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_guard: Option<String>,
    /// Roles universe overriding the resource's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles_declared: Option<Vec<String>>,
    /// `Accept` assumed when the request has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_accept: Option<String>,
    /// `Content-Type` assumed when a request body has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_content_type: Option<String>,
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

impl OperationConfig {
    /// Convert into a builder
    pub fn into_builder(self) -> CandidateBuilder {
        let mut b = CandidateBuilder::new(self.name, self.method, self.path);
        for p in self.produces {
            b = b.produces(p);
        }
        for c in self.consumes {
            b = b.consumes(c);
        }
        if let Some(v) = self.client_version {
            b = b.client_version(v);
        }
        if let Some(g) = self.role_guard {
            b = b.role_guard(g);
        }
        if let Some(r) = self.roles_declared {
            b = b.roles_declared(r);
        }
        if let Some(a) = self.default_accept {
            b = b.default_accept(a);
        }
        if let Some(ct) = self.default_content_type {
            b = b.default_content_type(ct);
        }
        b
    }
}

impl ResourceConfig {
    /// Convert the subtree into builders
    pub fn into_builder(self) -> ResourceBuilder {
        let mut b = ResourceBuilder::new(self.path);
        if let Some(h) = self.version_header {
            b = b.version_header(h);
        }
        if let Some(r) = self.roles_declared {
            b = b.roles_declared(r);
        }
        if let Some(g) = self.role_guard {
            b = b.role_guard(g);
        }
        for op in self.operations {
            b = b.operation(op.into_builder());
        }
        for child in self.children {
            b = b.child(child.into_builder());
        }
        b
    }
}

/// Parse configuration text in the given format
pub fn parse_resource(contents: &str, format: ConfigFormat) -> anyhow::Result<ResourceConfig> {
    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
        ConfigFormat::Toml => toml::from_str(contents)?,
        ConfigFormat::Json => serde_json::from_str(contents)?,
    };
    Ok(config)
}

/// Load a resource tree from a file
pub fn load_resource(config_path: &Path) -> anyhow::Result<ResourceConfig> {
    let Some(format) = ConfigFormat::from_path(config_path) else {
        bail!(
            "Unsupported config file extension (expected .yaml, .yml, .toml or .json): {}",
            config_path.display()
        );
    };
    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read resource config: {}", config_path.display()))?;
    parse_resource(&contents, format)
        .with_context(|| format!("Failed to parse resource config: {}", config_path.display()))
}

/// Load a resource tree from a file and build a dispatcher from it
pub fn load_dispatcher(
    config_path: &Path,
    runtime: &RuntimeConfig,
    stats: Option<Arc<DispatchStats>>,
) -> anyhow::Result<Dispatcher> {
    let root = load_resource(config_path)?.into_builder();
    let dispatcher = match stats {
        Some(stats) => Dispatcher::build_with_stats(root, runtime, stats),
        None => Dispatcher::build(root, runtime),
    }
    .with_context(|| format!("Invalid resource config: {}", config_path.display()))?;
    Ok(dispatcher)
}
