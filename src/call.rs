//! # Call State
//!
//! Per-request dispatch state. A [`RequestSeed`] is what the transport layer
//! hands over (method, raw path, headers, query parameters, caller roles and
//! whether a body is present); a [`CallState`] wraps the seed and accumulates
//! everything the dispatcher learns while resolving it: path variables, the
//! selected operation, the negotiated media types or the rejection.
//!
//! A `CallState` belongs to exactly one request. It is deliberately not
//! `Clone`; create a fresh one per request and drop it when the request ends.

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Rejection;
use crate::guard::RoleSet;
use crate::media::{MediaRangeSet, MediaType};
use crate::path::ParamVec;
use crate::registry::Candidate;

/// Maximum inline headers before heap allocation
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
///
/// Header names use `Arc<str>` because they repeat across requests
/// (`Accept`, `Content-Type`, ...); values are per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// What the transport layer knows about a request before dispatch
#[derive(Debug, Clone, Default)]
pub struct RequestSeed {
    /// HTTP method as received
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// Request headers
    pub headers: HeaderVec,
    /// Decoded query parameters
    pub query: ParamVec,
    /// Roles granted to the caller by the authentication layer
    pub roles: RoleSet,
    /// Whether the request carries a body
    pub has_body: bool,
}

impl RequestSeed {
    /// Create a seed from a method and a raw request target
    ///
    /// A query string in `target` is split off and decoded into
    /// [`RequestSeed::query`].
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, parse_query(q)),
            None => (target, ParamVec::new()),
        };
        Self {
            method: method.into(),
            path: path.to_string(),
            query,
            ..Self::default()
        }
    }

    /// Add a header
    ///
    /// Repeating a name appends to the existing value as a comma-separated
    /// list (RFC 9110 field line combination).
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push_header(name, value.into());
        self
    }

    fn push_header(&mut self, name: &str, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.headers.push((Arc::from(name), value)),
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((Arc::from(name), value.into()));
        self
    }

    /// Grant the caller a role
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Mark the request as carrying a body
    #[must_use]
    pub fn with_body(mut self) -> Self {
        self.has_body = true;
        self
    }

    /// Build a seed from an `http::Request`
    ///
    /// A body is assumed present when `Content-Length` is non-zero or
    /// `Transfer-Encoding` is set. Repeated field lines are folded into one
    /// comma-separated value. Header values that are not visible ASCII are
    /// skipped.
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        let uri = req.uri();
        let target = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
        let mut seed = Self::new(req.method().as_str(), &target);
        for (name, value) in req.headers() {
            if let Ok(v) = value.to_str() {
                seed.push_header(name.as_str(), v.to_string());
            }
        }
        let content_length = req
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        seed.has_body =
            content_length > 0 || req.headers().contains_key(http::header::TRANSFER_ENCODING);
        seed
    }
}

fn parse_query(query: &str) -> ParamVec {
    let mut params = ParamVec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        let decode = |s: &str| {
            let s = s.replace('+', " ");
            urlencoding::decode(&s).map_or(s.clone(), |d| d.into_owned())
        };
        params.push((Arc::from(decode(k).as_str()), decode(v)));
    }
    params
}

/// Per-request dispatch state
#[derive(Debug)]
pub struct CallState {
    seed: RequestSeed,
    method: Option<Method>,
    path_vars: ParamVec,
    remainder: Option<String>,
    selected: Option<Arc<Candidate>>,
    request_media: Option<MediaType>,
    response_media: Option<MediaType>,
    rejection: Option<Rejection>,
    accept: Option<Arc<MediaRangeSet>>,
    content_type: Option<Arc<MediaRangeSet>>,
}

impl CallState {
    /// Start a call from its seed
    #[must_use]
    pub fn new(seed: RequestSeed) -> Self {
        Self {
            seed,
            method: None,
            path_vars: ParamVec::new(),
            remainder: None,
            selected: None,
            request_media: None,
            response_media: None,
            rejection: None,
            accept: None,
            content_type: None,
        }
    }

    /// The seed this call was created from
    #[must_use]
    pub fn seed(&self) -> &RequestSeed {
        &self.seed
    }

    /// Method as received
    #[must_use]
    pub fn raw_method(&self) -> &str {
        &self.seed.method
    }

    /// Method used for matching, after any override; `None` before dispatch
    #[must_use]
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Request path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.seed.path
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.seed
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.seed
            .query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Caller roles
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.seed.roles
    }

    /// Whether the request carries a body
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.seed.has_body
    }

    /// Get a path variable by name
    ///
    /// Uses "last write wins" semantics: if a child resource re-binds a name
    /// its parent already bound, the child's value is returned.
    #[inline]
    #[must_use]
    pub fn path_var(&self, name: &str) -> Option<&str> {
        self.path_vars
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// All path variables bound so far, outermost resource first
    #[must_use]
    pub fn path_vars(&self) -> &ParamVec {
        &self.path_vars
    }

    /// Convert path variables to a map (allocates)
    #[must_use]
    pub fn path_vars_map(&self) -> HashMap<String, String> {
        self.path_vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Wildcard remainder of the selected operation's template
    #[must_use]
    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }

    /// The selected operation, once dispatch succeeded
    #[must_use]
    pub fn selected(&self) -> Option<&Arc<Candidate>> {
        self.selected.as_ref()
    }

    /// The `consumes` entry the request body matched
    #[must_use]
    pub fn request_media_type(&self) -> Option<&MediaType> {
        self.request_media.as_ref()
    }

    /// The `produces` entry chosen for the response
    #[must_use]
    pub fn response_media_type(&self) -> Option<&MediaType> {
        self.response_media.as_ref()
    }

    /// Why dispatch failed, if it did
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    pub(crate) fn path_vars_mut(&mut self) -> &mut ParamVec {
        &mut self.path_vars
    }

    pub(crate) fn cached_accept(&self) -> Option<&Arc<MediaRangeSet>> {
        self.accept.as_ref()
    }

    pub(crate) fn cache_accept(&mut self, set: Arc<MediaRangeSet>) {
        self.accept = Some(set);
    }

    pub(crate) fn cached_content_type(&self) -> Option<&Arc<MediaRangeSet>> {
        self.content_type.as_ref()
    }

    pub(crate) fn cache_content_type(&mut self, set: Arc<MediaRangeSet>) {
        self.content_type = Some(set);
    }

    pub(crate) fn resolve(
        &mut self,
        candidate: Arc<Candidate>,
        remainder: Option<String>,
        request_media: Option<MediaType>,
        response_media: Option<MediaType>,
    ) {
        self.selected = Some(candidate);
        self.remainder = remainder;
        self.request_media = request_media;
        self.response_media = response_media;
        self.rejection = None;
    }

    pub(crate) fn reject(&mut self, rejection: Rejection) {
        self.selected = None;
        self.remainder = None;
        self.request_media = None;
        self.response_media = None;
        self.rejection = Some(rejection);
    }
}
