//! # Dispatch Statistics
//!
//! Counters recorded by a [`Dispatcher`](crate::dispatcher::Dispatcher) built
//! with [`Dispatcher::build_with_stats`](crate::dispatcher::Dispatcher::build_with_stats).
//!
//! Counters are kept per resource path: how many calls were resolved or
//! rejected there, which operations were selected and which status codes
//! were returned. Updates are lock-free on the hot path once a resource's
//! entry exists; the first call for a resource takes a shard write lock.
//!
//! ```rust
//! use brrtdispatch::stats::DispatchStats;
//!
//! let stats = DispatchStats::new();
//! stats.record_selected("/pets", "list_pets");
//! stats.record_rejected("/pets", 405);
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.total_dispatches, 2);
//! assert_eq!(snapshot.resources["/pets"].selections["list_pets"], 1);
//! ```

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct ResourceCounters {
    dispatches: AtomicU64,
    selections: DashMap<String, AtomicU64>,
    rejections: DashMap<u16, AtomicU64>,
}

/// Concurrent dispatch counters
///
/// Share one instance between dispatchers with `Arc`.
#[derive(Debug, Default)]
pub struct DispatchStats {
    total: AtomicU64,
    resources: DashMap<String, ResourceCounters>,
}

/// Point-in-time copy of one resource's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    /// Calls that ended at this resource
    pub dispatches: u64,
    /// Selections per operation name
    pub selections: BTreeMap<String, u64>,
    /// Rejections per HTTP status code
    pub rejections: BTreeMap<u16, u64>,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Calls dispatched across all resources
    pub total_dispatches: u64,
    /// Per resource path
    pub resources: BTreeMap<String, ResourceSnapshot>,
}

impl DispatchStats {
    /// Create empty counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, resource: &str) -> Ref<'_, String, ResourceCounters> {
        if let Some(c) = self.resources.get(resource) {
            return c;
        }
        self.resources
            .entry(resource.to_string())
            .or_default()
            .downgrade()
    }

    /// Record that `operation` of `resource` was selected
    pub fn record_selected(&self, resource: &str, operation: &str) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counters = self.counters(resource);
        counters.dispatches.fetch_add(1, Ordering::Relaxed);
        if let Some(n) = counters.selections.get(operation) {
            n.fetch_add(1, Ordering::Relaxed);
            return;
        }
        counters
            .selections
            .entry(operation.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a call to `resource` was rejected with `status`
    pub fn record_rejected(&self, resource: &str, status: u16) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counters = self.counters(resource);
        counters.dispatches.fetch_add(1, Ordering::Relaxed);
        counters
            .rejections
            .entry(status)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Total calls recorded
    pub fn total_dispatches(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Copy the current counters
    ///
    /// Concurrent updates may or may not be reflected.
    pub fn snapshot(&self) -> StatsSnapshot {
        let resources = self
            .resources
            .iter()
            .map(|entry| {
                let c = entry.value();
                let snapshot = ResourceSnapshot {
                    dispatches: c.dispatches.load(Ordering::Relaxed),
                    selections: c
                        .selections
                        .iter()
                        .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
                        .collect(),
                    rejections: c
                        .rejections
                        .iter()
                        .map(|e| (*e.key(), e.value().load(Ordering::Relaxed)))
                        .collect(),
                };
                (entry.key().clone(), snapshot)
            })
            .collect();
        StatsSnapshot {
            total_dispatches: self.total.load(Ordering::Relaxed),
            resources,
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.resources.clear();
        self.total.store(0, Ordering::Relaxed);
    }
}
