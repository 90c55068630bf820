//! # Guard Module
//!
//! Authorization predicates evaluated in the last stage of the selection
//! cascade, after a candidate has matched on path, method, client version and
//! media types.
//!
//! ## Overview
//!
//! A [`Guard`] is a predicate over the caller's [`RoleSet`] and the
//! [`CallState`](crate::call::CallState). Guards are attached at two scopes:
//!
//! - **Resource scope** - declared once on a resource and applied to every
//!   operation it owns
//! - **Operation scope** - declared on a single operation
//!
//! A [`GuardChain`] joins both scopes; every guard in the chain must pass.
//!
//! ## Role-guard expressions
//!
//! The built-in guard is [`RoleGuard`], which evaluates a compiled
//! [`RoleExpression`]:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `A, B` / `A | B` / `A || B` | either role |
//! | `A & B` / `A && B` | both roles |
//! | `( ... )` | grouping |
//! | `ROLE_*`, `ROLE_?` | glob over the declared roles universe |
//!
//! `&` binds tighter than `|`. An empty expression never passes.
//!
//! ```rust
//! use brrtdispatch::guard::{RoleExpression, RoleSet};
//!
//! let expr = RoleExpression::parse("ROLE_ADMIN || (ROLE_READ_WRITE && ROLE_SPECIAL)").unwrap();
//! let caller: RoleSet = ["ROLE_READ_WRITE", "ROLE_SPECIAL"].iter().map(|s| s.to_string()).collect();
//! assert!(expr.evaluate(&caller));
//! assert!(!RoleExpression::parse("").unwrap().evaluate(&caller));
//! ```
//!
//! ## Custom guards
//!
//! Hosts can implement [`Guard`] for checks that are not role based:
//!
//! ```rust
//! use brrtdispatch::call::CallState;
//! use brrtdispatch::guard::{Guard, RoleSet};
//!
//! #[derive(Debug)]
//! struct TenantHeader;
//!
//! impl Guard for TenantHeader {
//!     fn allows(&self, _roles: &RoleSet, call: &CallState) -> bool {
//!         call.header("x-tenant").is_some()
//!     }
//!
//!     fn name(&self) -> &str {
//!         "tenant_header"
//!     }
//! }
//! ```

mod core;
mod expr;

pub use core::{Guard, GuardChain, RoleGuard};
pub use expr::{GuardParseError, RoleExpression, RoleSet};
