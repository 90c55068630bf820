//! # Path Module
//!
//! Compiles path templates and matches request paths against them.
//!
//! ## Template Syntax
//!
//! A template is a `/`-separated list of segments:
//!
//! - **Literal** (`users`) matches the request segment exactly, case-sensitive.
//! - **Variable** (`{id}`) matches exactly one non-empty segment; the value is
//!   URL-decoded into the match.
//! - **Wildcard** (`*`), only as the final segment, matches zero or more
//!   remaining segments and joins them (decoded) into the match remainder.
//!
//! Templates are compiled once at registration into an immutable
//! [`PathTemplate`]. Duplicate variable names and misplaced wildcards are
//! rejected with a [`ConfigError`](crate::error::ConfigError).
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::path::PathTemplate;
//!
//! let template = PathTemplate::compile("/{a}/{b}/*").unwrap();
//! let m = template.matches("/123/qux/true/quux").unwrap();
//! assert_eq!(m.get("a"), Some("123"));
//! assert_eq!(m.get("b"), Some("qux"));
//! assert_eq!(m.remainder(), Some("true/quux"));
//! ```
//!
//! ## Specificity
//!
//! When several templates match the same path, [`Specificity`] orders them:
//! more literal segments before the first variable wins, then more literal
//! segments overall, then templates without a wildcard, then longer
//! templates. Callers break remaining ties by declaration order.

mod core;
#[cfg(test)]
mod tests;

pub use core::{split_path, ParamVec, PathMatch, PathTemplate, Specificity, MAX_INLINE_PARAMS};
