//! Guard core - the `Guard` trait, role guards and the resource/operation chain.

use std::fmt::Debug;
use std::sync::Arc;

use super::expr::{GuardParseError, RoleExpression, RoleSet};
use crate::call::CallState;

/// Authorization predicate checked before an operation is selected
///
/// Implementations must be cheap and side-effect free; the registry may
/// evaluate the same guard for several candidates of one call.
pub trait Guard: Send + Sync + Debug {
    /// Whether the caller may reach the guarded operation
    fn allows(&self, roles: &RoleSet, call: &CallState) -> bool;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}

/// Guard backed by a compiled role expression
#[derive(Debug, Clone)]
pub struct RoleGuard {
    expr: RoleExpression,
}

impl RoleGuard {
    /// Wrap an already compiled expression
    #[must_use]
    pub fn new(expr: RoleExpression) -> Self {
        Self { expr }
    }

    /// Compile `expr`, resolving globs against `declared` when given
    ///
    /// # Errors
    ///
    /// Returns the parse error for a malformed expression.
    pub fn compile(expr: &str, declared: Option<&[String]>) -> Result<Self, GuardParseError> {
        RoleExpression::compile(expr, declared).map(Self::new)
    }

    /// The underlying expression
    #[must_use]
    pub fn expression(&self) -> &RoleExpression {
        &self.expr
    }
}

impl Guard for RoleGuard {
    fn allows(&self, roles: &RoleSet, _call: &CallState) -> bool {
        self.expr.evaluate(roles)
    }

    fn name(&self) -> &str {
        self.expr.as_str()
    }
}

/// Ordered list of guards that must all pass
///
/// An empty chain passes.
#[derive(Debug, Clone, Default)]
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guard
    pub fn push(&mut self, guard: Arc<dyn Guard>) {
        self.guards.push(guard);
    }

    /// Chain made of `outer` followed by `inner`
    ///
    /// Used to put resource-scope guards in front of operation-scope ones.
    #[must_use]
    pub fn joined(outer: &GuardChain, inner: &GuardChain) -> Self {
        let mut guards = Vec::with_capacity(outer.len() + inner.len());
        guards.extend(outer.guards.iter().cloned());
        guards.extend(inner.guards.iter().cloned());
        Self { guards }
    }

    /// Number of guards
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// `true` when there are no guards
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Guards in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Guard>> {
        self.guards.iter()
    }

    /// Evaluate every guard, stopping at the first denial
    ///
    /// Returns the name of the denying guard.
    pub fn check(&self, call: &CallState) -> Result<(), &str> {
        let roles = call.roles();
        for guard in &self.guards {
            if !guard.allows(roles, call) {
                return Err(guard.name());
            }
        }
        Ok(())
    }

    /// `true` when every guard passes
    #[must_use]
    pub fn allows(&self, call: &CallState) -> bool {
        self.check(call).is_ok()
    }
}
