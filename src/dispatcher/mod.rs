//! # Dispatcher Module
//!
//! The dispatcher is the entry point of the crate: it owns a tree of
//! resources and resolves each call to exactly one operation.
//!
//! ## Overview
//!
//! Each resource has a path template (relative to its parent), its own
//! [`MethodRegistry`](crate::registry::MethodRegistry) and an ordered list of
//! child resources. Resolving a call at a resource:
//!
//! 1. The resource template is matched against the leading segments of the
//!    path and its variables are bound into the call
//! 2. The first child whose template matches the remaining path is tried,
//!    recursively
//! 3. If that child resolves the call its result is returned; otherwise the
//!    variables it bound are discarded
//! 4. The resource's own registry is tried against the remaining path
//!
//! When both a child and the local registry reject, the rejection from the
//! stage that got further wins; on a tie the local one does, and the allowed
//! methods of two `405`s are merged. A malformed `Accept`, `Content-Type` or
//! client-version header aborts dispatch with `400` immediately.
//!
//! ## Building
//!
//! Trees are built from [`ResourceBuilder`]s, or loaded from a configuration
//! file with [`crate::config`]. Every template and expression is compiled at
//! build time; a malformed declaration is a
//! [`ConfigError`](crate::error::ConfigError).
//!
//! ## Hot replacement
//!
//! [`SharedDispatcher`] holds the current tree behind an `ArcSwap` so a
//! rebuilt tree can replace the running one without blocking readers.

mod core;

pub use core::{Dispatcher, ResourceBuilder, SharedDispatcher};
