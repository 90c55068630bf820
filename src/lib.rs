//! # brrtdispatch
//!
//! **brrtdispatch** is the request dispatch and content-negotiation core of a
//! REST framework: given an incoming call (method, path, headers, caller
//! roles) it picks exactly one of possibly many overlapping operations, or
//! reports the most specific reason why none qualifies.
//!
//! ## Overview
//!
//! Operations are declared per resource, either programmatically with
//! [`ResourceBuilder`](dispatcher::ResourceBuilder) /
//! [`CandidateBuilder`](registry::CandidateBuilder) or in a YAML/TOML/JSON file
//! (see [`config`]). Each declaration carries a path template, an HTTP method,
//! `produces`/`consumes` media types, an optional client-version range and an
//! optional role guard. Everything is compiled once when the tree is built;
//! dispatch is synchronous, allocation-light and does no I/O.
//!
//! ## Architecture
//!
//! - **[`path`]** - path templates with `{variables}` and a trailing `*`
//! - **[`media`]** - `Accept`/`Content-Type` parsing, quality ordering,
//!   fuzzy subtype matching and a bounded parse cache
//! - **[`version`]** - client version range expressions (`[1.1,2.0)`)
//! - **[`guard`]** - role-guard expressions and the [`Guard`](guard::Guard) trait
//! - **[`registry`]** - the six-stage selection cascade of one resource
//! - **[`dispatcher`]** - the resource tree: child resources first, then the
//!   local registry
//! - **[`call`]** - per-request state
//! - **[`error`]** - configuration errors and request rejections
//! - **[`config`]**, **[`runtime_config`]** - declarative trees and
//!   environment settings
//! - **[`stats`]** - dispatch counters
//! - **[`logging`]** - `tracing` subscriber bootstrap
//! - **[`cli`]** - the `brrtdispatch` binary
//!
//! ## Request flow
//!
//! ```text
//! RequestSeed ──► Dispatcher::dispatch
//!                   │ match resource template, bind variables
//!                   ├─► first matching child (recursively)
//!                   │     └─ resolved? done : discard child variables
//!                   └─► MethodRegistry::select
//!                         path → method → version → content-type → accept → guards
//!                         └─ most specific survivor, or Rejection
//! ```
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::call::{CallState, RequestSeed};
//! use brrtdispatch::dispatcher::{Dispatcher, ResourceBuilder};
//! use brrtdispatch::registry::CandidateBuilder;
//! use brrtdispatch::runtime_config::RuntimeConfig;
//!
//! let root = ResourceBuilder::new("/").child(
//!     ResourceBuilder::new("/pets")
//!         .operation(CandidateBuilder::new("get_pet_json", "GET", "/{id}").produces("application/json"))
//!         .operation(CandidateBuilder::new("get_pet_html", "GET", "/{id}").produces("text/html"))
//!         .operation(
//!             CandidateBuilder::new("delete_pet", "DELETE", "/{id}").role_guard("ROLE_ADMIN"),
//!         ),
//! );
//! let dispatcher = Dispatcher::build(root, &RuntimeConfig::default()).unwrap();
//!
//! let mut call = CallState::new(RequestSeed::new("GET", "/pets/7").header("Accept", "text/html"));
//! let op = dispatcher.dispatch(&mut call).unwrap();
//! assert_eq!(op.name(), "get_pet_html");
//! assert_eq!(call.path_var("id"), Some("7"));
//!
//! let mut call = CallState::new(RequestSeed::new("DELETE", "/pets/7"));
//! let rejection = dispatcher.dispatch(&mut call).unwrap_err();
//! assert_eq!(rejection.status(), http::StatusCode::FORBIDDEN);
//! ```

pub mod call;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod logging;
pub mod media;
pub mod path;
pub mod registry;
pub mod runtime_config;
pub mod stats;
pub mod version;

pub use call::{CallState, RequestSeed};
pub use dispatcher::{Dispatcher, ResourceBuilder, SharedDispatcher};
pub use error::{ConfigError, RejectReason, Rejection};
pub use registry::{Candidate, CandidateBuilder};
