//! # CLI Module
//!
//! Command-line access to a resource tree described in a configuration file.
//!
//! ## Commands
//!
//! ### `inspect`
//!
//! Print the resource tree with every operation as JSON:
//!
//! ```bash
//! brrtdispatch inspect --config resources.yaml
//! ```
//!
//! ### `resolve`
//!
//! Dispatch one synthetic call and print the selected operation, path
//! variables and negotiated media types, or the rejection:
//!
//! ```bash
//! brrtdispatch resolve --config resources.yaml \
//!     --method GET --path /pets/42 \
//!     -H 'Accept: text/html' -H 'X-Client-Version: 1.4' \
//!     --role ROLE_USER
//! ```
//!
//! Both commands initialise logging from `BRRTD_LOG_*` (to stderr) and exit
//! non-zero when the configuration cannot be loaded or built.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands};
