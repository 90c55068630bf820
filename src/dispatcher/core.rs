//! Dispatcher core - the resource tree and child-first resolution.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::call::{CallState, RequestSeed};
use crate::error::{ConfigError, RejectReason, Rejection};
use crate::guard::{Guard, GuardChain, RoleGuard};
use crate::media::MediaRangeCache;
use crate::path::PathTemplate;
use crate::registry::{Candidate, CandidateBuilder, MethodRegistry, ResourceScope, Selection};
use crate::runtime_config::{DispatchSettings, RuntimeConfig};
use crate::stats::DispatchStats;

/// Declarative description of a resource and its children
///
/// ```rust
/// use brrtdispatch::dispatcher::{Dispatcher, ResourceBuilder};
/// use brrtdispatch::registry::CandidateBuilder;
/// use brrtdispatch::runtime_config::RuntimeConfig;
///
/// let root = ResourceBuilder::new("/")
///     .operation(CandidateBuilder::new("health", "GET", "/health"))
///     .child(
///         ResourceBuilder::new("/pets/{pet_id}")
///             .operation(CandidateBuilder::new("get_pet", "GET", "/"))
///             .operation(CandidateBuilder::new("list_toys", "GET", "/toys")),
///     );
/// let dispatcher = Dispatcher::build(root, &RuntimeConfig::default()).unwrap();
/// assert_eq!(dispatcher.candidate_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    path: String,
    version_header: Option<String>,
    roles_declared: Option<Vec<String>>,
    role_guard: Option<String>,
    guards: Vec<Arc<dyn Guard>>,
    operations: Vec<CandidateBuilder>,
    children: Vec<ResourceBuilder>,
}

impl ResourceBuilder {
    /// Start describing the resource mounted at `path`
    ///
    /// `path` is relative to the parent resource and may bind variables but
    /// may not end in a wildcard.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version_header: None,
            roles_declared: None,
            role_guard: None,
            guards: Vec::new(),
            operations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Read the client version from a different header in this subtree
    #[must_use]
    pub fn version_header(mut self, header: impl Into<String>) -> Self {
        self.version_header = Some(header.into());
        self
    }

    /// Roles universe for glob tokens, inherited by operations and children
    #[must_use]
    pub fn roles_declared<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles_declared = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Role expression every operation of this resource must also satisfy
    #[must_use]
    pub fn role_guard(mut self, expr: impl Into<String>) -> Self {
        self.role_guard = Some(expr.into());
        self
    }

    /// Programmatic guard applied to every operation of this resource
    #[must_use]
    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    /// Register an operation
    #[must_use]
    pub fn operation(mut self, op: CandidateBuilder) -> Self {
        self.operations.push(op);
        self
    }

    /// Nest a child resource; children are tried in the order added
    #[must_use]
    pub fn child(mut self, child: ResourceBuilder) -> Self {
        self.children.push(child);
        self
    }

    fn build(
        self,
        parent_path: &str,
        parent_settings: &DispatchSettings,
        parent_roles: Option<&[String]>,
        cache: &Arc<MediaRangeCache>,
        stats: Option<&Arc<DispatchStats>>,
    ) -> Result<Dispatcher, ConfigError> {
        let template = PathTemplate::compile(&self.path)?;
        if template.has_wildcard() {
            return Err(ConfigError::WildcardInResourcePath {
                template: self.path,
            });
        }
        let full_path = join_paths(parent_path, template.as_str());

        let settings = match &self.version_header {
            Some(h) if http::HeaderName::from_bytes(h.as_bytes()).is_err() => {
                return Err(ConfigError::InvalidVersionHeader {
                    owner: full_path,
                    header: h.clone(),
                });
            }
            Some(h) => parent_settings.with_version_header(h),
            None => parent_settings.clone(),
        };
        let roles_declared = self
            .roles_declared
            .or_else(|| parent_roles.map(<[String]>::to_vec));

        let mut scope = ResourceScope {
            guards: GuardChain::new(),
            roles_declared,
        };
        if let Some(expr) = &self.role_guard {
            let guard = RoleGuard::compile(expr, scope.roles_declared.as_deref()).map_err(
                |source| ConfigError::InvalidRoleGuard {
                    owner: full_path.clone(),
                    source,
                },
            )?;
            scope.guards.push(Arc::new(guard));
        }
        for guard in self.guards {
            scope.guards.push(guard);
        }

        let registry = MethodRegistry::build_scoped(self.operations, settings.clone(), &scope)?;
        let children = self
            .children
            .into_iter()
            .map(|child| {
                child.build(
                    &full_path,
                    &settings,
                    scope.roles_declared.as_deref(),
                    cache,
                    stats,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dispatcher {
            template,
            full_path,
            registry,
            children,
            cache: Arc::clone(cache),
            stats: stats.cloned(),
        })
    }
}

fn join_paths(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if child.is_empty() {
        if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        }
    } else {
        format!("{parent}/{child}")
    }
}

/// A resource: its own method registry plus nested child resources
///
/// The root of a tree is the entry point for dispatch; every node is itself
/// a complete dispatcher for the subtree below it. A built tree is immutable
/// and can be shared across threads.
#[derive(Debug)]
pub struct Dispatcher {
    template: PathTemplate,
    full_path: String,
    registry: MethodRegistry,
    children: Vec<Dispatcher>,
    cache: Arc<MediaRangeCache>,
    stats: Option<Arc<DispatchStats>>,
}

struct Resolved<'d> {
    selection: Selection,
    resource: &'d Dispatcher,
}

impl Dispatcher {
    /// Build a routing tree
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found anywhere in the tree.
    pub fn build(root: ResourceBuilder, config: &RuntimeConfig) -> Result<Self, ConfigError> {
        Self::build_inner(root, config, None)
    }

    /// Build a routing tree that records into `stats`
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found anywhere in the tree.
    pub fn build_with_stats(
        root: ResourceBuilder,
        config: &RuntimeConfig,
        stats: Arc<DispatchStats>,
    ) -> Result<Self, ConfigError> {
        Self::build_inner(root, config, Some(&stats))
    }

    fn build_inner(
        root: ResourceBuilder,
        config: &RuntimeConfig,
        stats: Option<&Arc<DispatchStats>>,
    ) -> Result<Self, ConfigError> {
        let cache = Arc::new(MediaRangeCache::new(config.media_cache_size));
        let settings = config.dispatch_settings();
        let tree = root.build("", &settings, None, &cache, stats)?;
        info!(
            root = %tree.full_path,
            resources = tree.resource_count(),
            candidates = tree.candidate_count(),
            media_cache_size = config.media_cache_size,
            "Routing tree built"
        );
        Ok(tree)
    }

    /// Template of this resource, relative to its parent
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Templates from the root down to this resource, joined
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// This resource's own operations
    #[must_use]
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Child resources in the order they are tried
    #[must_use]
    pub fn children(&self) -> &[Dispatcher] {
        &self.children
    }

    /// Parse cache shared by the whole tree
    #[must_use]
    pub fn media_cache(&self) -> &MediaRangeCache {
        &self.cache
    }

    /// Statistics sink, when built with one
    #[must_use]
    pub fn stats(&self) -> Option<&Arc<DispatchStats>> {
        self.stats.as_ref()
    }

    /// Resources in this subtree, including this one
    #[must_use]
    pub fn resource_count(&self) -> usize {
        1 + self.children.iter().map(Dispatcher::resource_count).sum::<usize>()
    }

    /// Operations in this subtree
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.registry.len()
            + self
                .children
                .iter()
                .map(Dispatcher::candidate_count)
                .sum::<usize>()
    }

    /// Resolve a call to exactly one operation
    ///
    /// On success the call holds the selected candidate, all path variables
    /// bound from the root down and the negotiated media types. On failure it
    /// holds the rejection, which is also returned.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] describing why no operation qualified.
    pub fn dispatch(&self, call: &mut CallState) -> Result<Arc<Candidate>, Rejection> {
        let path = call.path().to_string();
        call.path_vars_mut().clear();

        let outcome = match self.template.match_prefix(&path) {
            Some((own, rest)) => {
                call.path_vars_mut().extend(own.vars);
                self.resolve(call, &rest)
            }
            None => Err(Rejection::NotFound {
                reason: RejectReason::PathNotFound,
            }),
        };

        match outcome {
            Ok(Resolved {
                selection,
                resource,
            }) => {
                let candidate = Arc::clone(&selection.candidate);
                let path_match = selection.path_match;
                call.path_vars_mut().extend(path_match.vars);
                call.resolve(
                    Arc::clone(&candidate),
                    path_match.remainder,
                    selection.request_media,
                    selection.response_media,
                );
                if let Some(stats) = &self.stats {
                    stats.record_selected(&resource.full_path, candidate.name());
                }
                debug!(
                    path = %path,
                    resource = %resource.full_path,
                    operation = %candidate.name(),
                    "Call dispatched"
                );
                Ok(candidate)
            }
            Err(rejection) => {
                call.path_vars_mut().clear();
                call.reject(rejection.clone());
                if let Some(stats) = &self.stats {
                    stats.record_rejected(&self.full_path, rejection.status().as_u16());
                }
                debug!(
                    path = %path,
                    status = rejection.status().as_u16(),
                    reason = ?rejection.reason(),
                    "Call rejected"
                );
                Err(rejection)
            }
        }
    }

    /// Build a call from `seed`, dispatch it and return it
    #[must_use]
    pub fn dispatch_seed(&self, seed: RequestSeed) -> CallState {
        let mut call = CallState::new(seed);
        // The outcome is recorded in the call state
        if let Err(rejection) = self.dispatch(&mut call) {
            debug_assert_eq!(call.rejection(), Some(&rejection));
        }
        call
    }

    /// Resolve `rest`, the path left after this resource's own template
    fn resolve<'d>(&'d self, call: &mut CallState, rest: &str) -> Result<Resolved<'d>, Rejection> {
        let mut child_rejection = None;

        let matched_child = self.children.iter().find_map(|child| {
            child
                .template
                .match_prefix(rest)
                .map(|(m, child_rest)| (child, m, child_rest))
        });
        if let Some((child, m, child_rest)) = matched_child {
            let mark = call.path_vars().len();
            call.path_vars_mut().extend(m.vars);
            match child.resolve(call, &child_rest) {
                Ok(found) => return Ok(found),
                Err(rejection @ Rejection::BadHeader { .. }) => return Err(rejection),
                Err(rejection) => {
                    call.path_vars_mut().truncate(mark);
                    debug!(
                        resource = %child.full_path,
                        reason = ?rejection.reason(),
                        "Child resource did not resolve, falling back"
                    );
                    child_rejection = Some(rejection);
                }
            }
        }

        match self.registry.select(call, rest, &self.cache) {
            Ok(selection) => Ok(Resolved {
                selection,
                resource: self,
            }),
            Err(local) => Err(match child_rejection {
                Some(child) => most_specific(local, child),
                None => local,
            }),
        }
    }
}

/// Pick the rejection from the stage that got furthest; the local registry
/// wins ties and `405` method sets are unioned
fn most_specific(local: Rejection, child: Rejection) -> Rejection {
    match (local.reason(), child.reason()) {
        (None, _) => local,
        (_, None) => child,
        (Some(l), Some(c)) if c > l => child,
        (Some(l), Some(c)) if l > c => local,
        _ => match (local, child) {
            (
                Rejection::MethodNotAllowed { mut allowed },
                Rejection::MethodNotAllowed { allowed: extra },
            ) => {
                for m in extra {
                    if !allowed.contains(&m) {
                        allowed.push(m);
                    }
                }
                Rejection::MethodNotAllowed { allowed }
            }
            (local, _) => local,
        },
    }
}

/// Routing tree behind an atomically swappable pointer
///
/// Readers never block; [`SharedDispatcher::replace`] installs a new tree
/// while in-flight calls finish on the one they loaded.
#[derive(Debug)]
pub struct SharedDispatcher {
    current: ArcSwap<Dispatcher>,
}

impl SharedDispatcher {
    /// Wrap a built tree
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            current: ArcSwap::from_pointee(dispatcher),
        }
    }

    /// The tree new calls will use
    #[must_use]
    pub fn load(&self) -> Arc<Dispatcher> {
        self.current.load_full()
    }

    /// Install a new tree, returning the previous one
    pub fn replace(&self, dispatcher: Dispatcher) -> Arc<Dispatcher> {
        let next = Arc::new(dispatcher);
        info!(
            resources = next.resource_count(),
            candidates = next.candidate_count(),
            "Routing tree replaced"
        );
        self.current.swap(next)
    }

    /// Dispatch against the current tree
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] describing why no operation qualified.
    pub fn dispatch(&self, call: &mut CallState) -> Result<Arc<Candidate>, Rejection> {
        self.current.load().dispatch(call)
    }
}
