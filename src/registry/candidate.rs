use http::Method;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::guard::{Guard, GuardChain, RoleGuard};
use crate::media::{MediaParseError, MediaRangeSet, MediaType};
use crate::path::PathTemplate;
use crate::version::VersionRange;

/// HTTP method an operation answers to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodMatcher {
    /// Declared as `*`: every method
    Any,
    /// One method
    Exact(Method),
}

impl MethodMatcher {
    /// Parse a declared method, case-insensitively
    ///
    /// Returns `None` for a string that is not a valid method token.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        let method = method.trim();
        if method == "*" {
            return Some(MethodMatcher::Any);
        }
        parse_method(method).map(MethodMatcher::Exact)
    }

    /// Whether a request method satisfies this matcher
    #[inline]
    #[must_use]
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(m) => m == method,
        }
    }

    /// The exact method, if not a wildcard
    #[must_use]
    pub fn method(&self) -> Option<&Method> {
        match self {
            MethodMatcher::Any => None,
            MethodMatcher::Exact(m) => Some(m),
        }
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatcher::Any => f.write_str("*"),
            MethodMatcher::Exact(m) => f.write_str(m.as_str()),
        }
    }
}

/// Parse a method token, upper-casing it first
pub(crate) fn parse_method(method: &str) -> Option<Method> {
    if method.is_empty() {
        return None;
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()
}

/// One registered operation
///
/// Built once by a [`CandidateBuilder`] when the owning resource is built, then
/// shared read-only by every request.
pub struct Candidate {
    name: String,
    method: MethodMatcher,
    template: PathTemplate,
    produces: Vec<MediaType>,
    consumes: Vec<MediaType>,
    client_version: Option<VersionRange>,
    role_guard: Option<RoleGuard>,
    roles_declared: Option<Vec<String>>,
    default_accept: Option<Arc<MediaRangeSet>>,
    default_content_type: Option<Arc<MediaRangeSet>>,
    guards: GuardChain,
    index: usize,
}

impl Candidate {
    /// Operation name handed to handler invocation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared method
    #[must_use]
    pub fn method(&self) -> &MethodMatcher {
        &self.method
    }

    /// Compiled path template, relative to the owning resource
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Response media types, in declaration order
    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    /// Request body media types, in declaration order
    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    /// Client version range, if restricted
    #[must_use]
    pub fn client_version(&self) -> Option<&VersionRange> {
        self.client_version.as_ref()
    }

    /// Operation-scope role guard, if declared
    #[must_use]
    pub fn role_guard(&self) -> Option<&RoleGuard> {
        self.role_guard.as_ref()
    }

    /// Roles universe used to resolve glob tokens in the role guard
    #[must_use]
    pub fn roles_declared(&self) -> Option<&[String]> {
        self.roles_declared.as_deref()
    }

    /// Ranges used in place of an absent `Accept` header
    #[must_use]
    pub fn default_accept(&self) -> Option<&Arc<MediaRangeSet>> {
        self.default_accept.as_ref()
    }

    /// Ranges used in place of an absent `Content-Type` header
    #[must_use]
    pub fn default_content_type(&self) -> Option<&Arc<MediaRangeSet>> {
        self.default_content_type.as_ref()
    }

    /// Every guard evaluated for this candidate: resource scope first
    #[must_use]
    pub fn guards(&self) -> &GuardChain {
        &self.guards
    }

    /// Declaration index within the owning resource
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// `true` when `self` makes `later` unreachable
    ///
    /// Both share the same template, method, version range and media
    /// declarations, and `self` has no guards that could send a call on to
    /// `later`.
    pub(crate) fn shadows(&self, later: &Candidate) -> bool {
        self.guards.is_empty()
            && self.template.as_str() == later.template.as_str()
            && (self.method == MethodMatcher::Any || self.method == later.method)
            && self.client_version == later.client_version
            && self.produces == later.produces
            && self.consumes == later.consumes
            && self.default_accept == later.default_accept
            && self.default_content_type == later.default_content_type
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .field("client_version", &self.client_version.as_ref().map(VersionRange::as_str))
            .field("guards", &self.guards.len())
            .field("index", &self.index)
            .finish()
    }
}

/// Resource-level declarations every candidate of a resource inherits
#[derive(Debug, Clone, Default)]
pub(crate) struct ResourceScope {
    pub(crate) guards: GuardChain,
    pub(crate) roles_declared: Option<Vec<String>>,
}

/// Declarative description of one operation
///
/// Nothing is validated until the owning resource is built, at which point
/// every string is compiled and any error becomes a [`ConfigError`].
///
/// ```rust
/// use brrtdispatch::registry::CandidateBuilder;
///
/// let op = CandidateBuilder::new("get_pet", "GET", "/pets/{id}")
///     .produces("application/json")
///     .client_version("[1.1,2.0)")
///     .role_guard("ROLE_ADMIN || ROLE_READER");
/// ```
#[derive(Debug, Clone)]
pub struct CandidateBuilder {
    name: String,
    method: String,
    path: String,
    produces: Vec<String>,
    consumes: Vec<String>,
    client_version: Option<String>,
    role_guard: Option<String>,
    roles_declared: Option<Vec<String>>,
    default_accept: Option<String>,
    default_content_type: Option<String>,
    guards: Vec<Arc<dyn Guard>>,
}

impl CandidateBuilder {
    /// Start describing an operation
    pub fn new(name: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            path: path.into(),
            produces: Vec::new(),
            consumes: Vec::new(),
            client_version: None,
            role_guard: None,
            roles_declared: None,
            default_accept: None,
            default_content_type: None,
            guards: Vec::new(),
        }
    }

    /// Operation name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add response media types (comma-separated values are split)
    #[must_use]
    pub fn produces(mut self, media: impl Into<String>) -> Self {
        self.produces.push(media.into());
        self
    }

    /// Add request body media types (comma-separated values are split)
    #[must_use]
    pub fn consumes(mut self, media: impl Into<String>) -> Self {
        self.consumes.push(media.into());
        self
    }

    /// Restrict the operation to a client version range
    #[must_use]
    pub fn client_version(mut self, range: impl Into<String>) -> Self {
        self.client_version = Some(range.into());
        self
    }

    /// Guard the operation with a role expression
    #[must_use]
    pub fn role_guard(mut self, expr: impl Into<String>) -> Self {
        self.role_guard = Some(expr.into());
        self
    }

    /// Declare the roles universe for glob tokens in the role guard
    #[must_use]
    pub fn roles_declared<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles_declared = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// `Accept` value assumed when the request has none
    #[must_use]
    pub fn default_accept(mut self, value: impl Into<String>) -> Self {
        self.default_accept = Some(value.into());
        self
    }

    /// `Content-Type` value assumed when a request body has none
    #[must_use]
    pub fn default_content_type(mut self, value: impl Into<String>) -> Self {
        self.default_content_type = Some(value.into());
        self
    }

    /// Add a programmatic guard, evaluated after the role guard
    #[must_use]
    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub(crate) fn build(self, index: usize, scope: &ResourceScope) -> Result<Candidate, ConfigError> {
        let method = MethodMatcher::parse(&self.method).ok_or_else(|| ConfigError::InvalidMethod {
            operation: self.name.clone(),
            method: self.method.clone(),
        })?;
        let template = PathTemplate::compile(&self.path)?;

        let media_err = |source: MediaParseError| ConfigError::InvalidMediaType {
            operation: self.name.clone(),
            source,
        };
        let produces = parse_media_list(&self.produces).map_err(media_err)?;
        let consumes = parse_media_list(&self.consumes).map_err(media_err)?;
        let default_accept = parse_ranges(self.default_accept.as_deref()).map_err(media_err)?;
        let default_content_type =
            parse_ranges(self.default_content_type.as_deref()).map_err(media_err)?;

        let client_version = self
            .client_version
            .as_deref()
            .map(str::parse::<VersionRange>)
            .transpose()
            .map_err(|source| ConfigError::InvalidVersionRange {
                operation: self.name.clone(),
                source,
            })?;

        let roles_declared = self
            .roles_declared
            .clone()
            .or_else(|| scope.roles_declared.clone());
        let role_guard = self
            .role_guard
            .as_deref()
            .map(|expr| RoleGuard::compile(expr, roles_declared.as_deref()))
            .transpose()
            .map_err(|source| ConfigError::InvalidRoleGuard {
                owner: self.name.clone(),
                source,
            })?;

        let mut own = GuardChain::new();
        if let Some(rg) = &role_guard {
            own.push(Arc::new(rg.clone()));
        }
        for guard in self.guards {
            own.push(guard);
        }

        Ok(Candidate {
            guards: GuardChain::joined(&scope.guards, &own),
            name: self.name,
            method,
            template,
            produces,
            consumes,
            client_version,
            role_guard,
            roles_declared,
            default_accept,
            default_content_type,
            index,
        })
    }
}

fn parse_media_list(entries: &[String]) -> Result<Vec<MediaType>, MediaParseError> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        for token in entry.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            out.push(MediaType::parse(token)?);
        }
    }
    Ok(out)
}

fn parse_ranges(value: Option<&str>) -> Result<Option<Arc<MediaRangeSet>>, MediaParseError> {
    value
        .map(|v| MediaRangeSet::parse(v).map(Arc::new))
        .transpose()
}
