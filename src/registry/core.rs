//! Method registry core - the six-stage selection cascade.

use http::Method;
use once_cell::sync::Lazy;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::candidate::{parse_method, Candidate, CandidateBuilder, ResourceScope};
use crate::call::CallState;
use crate::error::{ConfigError, HeaderKind, RejectReason, Rejection};
use crate::media::{find_best_match, MediaRangeCache, MediaRangeSet, MediaType};
use crate::path::{split_path, PathMatch};
use crate::runtime_config::DispatchSettings;
use crate::version::Version;

/// Assumed `Content-Type` for a body sent without one
static OCTET_STREAM: Lazy<Arc<MediaRangeSet>> = Lazy::new(|| {
    Arc::new(MediaRangeSet::single(MediaType::new(
        "application",
        "octet-stream",
    )))
});

/// Query parameter consulted for a method override
pub const METHOD_OVERRIDE_PARAM: &str = "method";
/// Header consulted for a method override
pub const METHOD_OVERRIDE_HEADER: &str = "X-Method";

/// Outcome of a successful selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// The winning operation
    pub candidate: Arc<Candidate>,
    /// Variables and remainder bound by its template
    pub path_match: PathMatch,
    /// The `consumes` entry the request body matched
    pub request_media: Option<MediaType>,
    /// The `produces` entry chosen for the response
    pub response_media: Option<MediaType>,
}

#[derive(Debug)]
struct Survivor<'r> {
    candidate: &'r Arc<Candidate>,
    path_match: PathMatch,
    consumes_idx: Option<usize>,
    produces_idx: Option<usize>,
}

type Survivors<'r> = SmallVec<[Survivor<'r>; 8]>;

/// The candidates registered directly on one resource
///
/// Candidates are indexed by their first literal segment. Templates that
/// start with a variable or wildcard, and the root template, sit in an
/// unindexed bucket consulted for every path; both buckets are merged in
/// declaration order so indexing never changes the outcome.
#[derive(Debug)]
pub struct MethodRegistry {
    candidates: Vec<Arc<Candidate>>,
    by_first_literal: HashMap<Box<str>, Vec<usize>>,
    unindexed: Vec<usize>,
    settings: DispatchSettings,
}

impl MethodRegistry {
    /// Build a standalone registry
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in the declarations, or
    /// [`ConfigError::DuplicateOperation`] when two operations share a name.
    pub fn build(
        operations: Vec<CandidateBuilder>,
        settings: DispatchSettings,
    ) -> Result<Self, ConfigError> {
        Self::build_scoped(operations, settings, &ResourceScope::default())
    }

    pub(crate) fn build_scoped(
        operations: Vec<CandidateBuilder>,
        settings: DispatchSettings,
        scope: &ResourceScope,
    ) -> Result<Self, ConfigError> {
        let mut candidates: Vec<Arc<Candidate>> = Vec::with_capacity(operations.len());
        for (index, op) in operations.into_iter().enumerate() {
            if candidates.iter().any(|c| c.name() == op.name()) {
                return Err(ConfigError::DuplicateOperation {
                    name: op.name().to_string(),
                });
            }
            let candidate = op.build(index, scope)?;
            if let Some(earlier) = candidates.iter().find(|c| c.shadows(&candidate)) {
                warn!(
                    operation = %candidate.name(),
                    shadowed_by = %earlier.name(),
                    template = %candidate.template(),
                    "Operation can never be selected"
                );
            }
            candidates.push(Arc::new(candidate));
        }

        let mut by_first_literal: HashMap<Box<str>, Vec<usize>> = HashMap::new();
        let mut unindexed = Vec::new();
        for (idx, c) in candidates.iter().enumerate() {
            match c.template().first_literal() {
                Some(lit) => by_first_literal.entry(Box::from(lit)).or_default().push(idx),
                None => unindexed.push(idx),
            }
        }

        Ok(Self {
            candidates,
            by_first_literal,
            unindexed,
            settings,
        })
    }

    /// Registered candidates in declaration order
    #[must_use]
    pub fn candidates(&self) -> &[Arc<Candidate>] {
        &self.candidates
    }

    /// Settings applied by this registry
    #[must_use]
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// `true` when no candidate is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Method used for matching, after any override
    ///
    /// Returns `None` when the method is not a valid token.
    #[must_use]
    pub fn effective_method(&self, call: &CallState) -> Option<Method> {
        if self.settings.method_override {
            let overridden = call
                .query_param(METHOD_OVERRIDE_PARAM)
                .or_else(|| call.header(METHOD_OVERRIDE_HEADER))
                .filter(|m| !m.trim().is_empty());
            if let Some(m) = overridden {
                return parse_method(m.trim());
            }
        }
        parse_method(call.raw_method())
    }

    /// Pick exactly one candidate for `path`, or report why none qualifies
    ///
    /// `path` is the part of the request path left for this resource. The
    /// call is only touched to cache parsed negotiation headers and record
    /// the effective method.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the stage that emptied the survivor set,
    /// or [`Rejection::BadHeader`] when a negotiation header cannot be parsed.
    pub fn select(
        &self,
        call: &mut CallState,
        path: &str,
        cache: &MediaRangeCache,
    ) -> Result<Selection, Rejection> {
        // Stage 1: path
        let segments = split_path(path);
        let mut survivors: Survivors<'_> = SmallVec::new();
        for idx in self.lookup(segments.first().copied()) {
            let candidate = &self.candidates[idx];
            if let Some(path_match) = candidate.template().match_segments(&segments) {
                survivors.push(Survivor {
                    candidate,
                    path_match,
                    consumes_idx: None,
                    produces_idx: None,
                });
            }
        }
        debug!(stage = "path", path = %path, survivors = survivors.len(), "Cascade stage");
        if survivors.is_empty() {
            return Err(self.rejected(Rejection::NotFound {
                reason: RejectReason::PathNotFound,
            }));
        }

        // Stage 2: method
        let method = self.effective_method(call);
        let allowed = allowed_methods(&survivors);
        match &method {
            Some(m) => {
                call.set_method(m.clone());
                survivors.retain(|s| s.candidate.method().matches(m));
            }
            None => survivors.clear(),
        }
        debug!(stage = "method", method = %call.raw_method(), survivors = survivors.len(), "Cascade stage");
        if survivors.is_empty() {
            return Err(self.rejected(Rejection::MethodNotAllowed { allowed }));
        }

        // Stage 3: client version
        if survivors.iter().any(|s| s.candidate.client_version().is_some()) {
            let version = match call.header(&self.settings.version_header) {
                Some(raw) => Some(
                    raw.parse::<Version>()
                        .map_err(|e| Rejection::bad_header(HeaderKind::ClientVersion, &e))?,
                ),
                None => None,
            };
            survivors.retain(|s| match s.candidate.client_version() {
                None => true,
                Some(range) => version.as_ref().is_some_and(|v| range.contains(v)),
            });
            debug!(stage = "version", survivors = survivors.len(), "Cascade stage");
            if survivors.is_empty() {
                return Err(self.rejected(Rejection::PreconditionFailed));
            }
        }

        // Stage 4: request Content-Type against consumes
        if call.has_body() && survivors.iter().any(|s| !s.candidate.consumes().is_empty()) {
            let header = content_type_ranges(call, cache)?;
            survivors.retain(|s| {
                let c = s.candidate;
                if c.consumes().is_empty() {
                    return true;
                }
                let ranges = header
                    .as_ref()
                    .or(c.default_content_type())
                    .unwrap_or(&*OCTET_STREAM);
                s.consumes_idx = find_best_match(ranges, c.consumes());
                s.consumes_idx.is_some()
            });
            debug!(stage = "content_type", survivors = survivors.len(), "Cascade stage");
            if survivors.is_empty() {
                return Err(self.rejected(Rejection::NotFound {
                    reason: RejectReason::UnsupportedMediaType,
                }));
            }
        }

        // Stage 5: Accept against produces
        if survivors.iter().any(|s| !s.candidate.produces().is_empty()) {
            let header = accept_ranges(call, cache)?;
            let any = MediaRangeSet::any();
            survivors.retain(|s| {
                let c = s.candidate;
                if c.produces().is_empty() {
                    return true;
                }
                let ranges = header.as_ref().or(c.default_accept()).unwrap_or(&any);
                s.produces_idx = find_best_match(ranges, c.produces());
                s.produces_idx.is_some()
            });
            debug!(stage = "accept", survivors = survivors.len(), "Cascade stage");
            if survivors.is_empty() {
                return Err(self.rejected(if self.settings.strict_accept {
                    Rejection::NotAcceptable
                } else {
                    Rejection::NotFound {
                        reason: RejectReason::NotAcceptable,
                    }
                }));
            }
        }

        // Stage 6: guards
        let call_ref: &CallState = call;
        survivors.retain(|s| match s.candidate.guards().check(call_ref) {
            Ok(()) => true,
            Err(denied_by) => {
                debug!(operation = %s.candidate.name(), guard = %denied_by, "Guard denied");
                false
            }
        });
        debug!(stage = "guard", survivors = survivors.len(), "Cascade stage");

        // Most specific template wins, then declaration order
        let winner = survivors.into_iter().reduce(|best, s| {
            let best_rank = best.candidate.template().specificity();
            let rank = s.candidate.template().specificity();
            if rank > best_rank || (rank == best_rank && s.candidate.index() < best.candidate.index()) {
                s
            } else {
                best
            }
        });
        let Some(winner) = winner else {
            return Err(self.rejected(Rejection::Forbidden));
        };

        let c = winner.candidate;
        debug!(
            operation = %c.name(),
            template = %c.template(),
            "Operation selected"
        );
        Ok(Selection {
            request_media: winner.consumes_idx.map(|i| c.consumes()[i].clone()),
            response_media: winner.produces_idx.map(|i| c.produces()[i].clone()),
            candidate: Arc::clone(c),
            path_match: winner.path_match,
        })
    }

    /// Candidate indices that may match a path starting with `first`, in
    /// declaration order
    fn lookup(&self, first: Option<&str>) -> impl Iterator<Item = usize> + '_ {
        let indexed: &[usize] = first
            .and_then(|seg| self.by_first_literal.get(seg))
            .map_or(&[][..], Vec::as_slice);
        MergeAscending {
            a: indexed,
            b: &self.unindexed,
        }
    }

    fn rejected(&self, rejection: Rejection) -> Rejection {
        debug!(status = rejection.status().as_u16(), reason = ?rejection.reason(), "No operation selected");
        rejection
    }
}

/// Merge of two ascending index slices
struct MergeAscending<'a> {
    a: &'a [usize],
    b: &'a [usize],
}

impl<'a> Iterator for MergeAscending<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let take_a = match (self.a.first(), self.b.first()) {
            (Some(x), Some(y)) => x < y,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        let slot = if take_a { &mut self.a } else { &mut self.b };
        let current: &'a [usize] = slot;
        let (head, tail) = current.split_first()?;
        *slot = tail;
        Some(*head)
    }
}

/// Exact methods declared by the path survivors, first declaration first
fn allowed_methods(survivors: &Survivors<'_>) -> Vec<Method> {
    let mut allowed: Vec<Method> = Vec::new();
    for s in survivors {
        if let Some(m) = s.candidate.method().method() {
            if !allowed.contains(m) {
                allowed.push(m.clone());
            }
        }
    }
    allowed
}

fn content_type_ranges(
    call: &mut CallState,
    cache: &MediaRangeCache,
) -> Result<Option<Arc<MediaRangeSet>>, Rejection> {
    if let Some(set) = call.cached_content_type() {
        return Ok(Some(Arc::clone(set)));
    }
    let Some(raw) = call.header("content-type").filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let set = cache
        .get_or_parse(raw)
        .map_err(|e| Rejection::bad_header(HeaderKind::ContentType, &e))?;
    call.cache_content_type(Arc::clone(&set));
    Ok(Some(set))
}

fn accept_ranges(
    call: &mut CallState,
    cache: &MediaRangeCache,
) -> Result<Option<Arc<MediaRangeSet>>, Rejection> {
    if let Some(set) = call.cached_accept() {
        return Ok(Some(Arc::clone(set)));
    }
    let Some(raw) = call.header("accept").filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let set = cache
        .get_or_parse(raw)
        .map_err(|e| Rejection::bad_header(HeaderKind::Accept, &e))?;
    call.cache_accept(Arc::clone(&set));
    Ok(Some(set))
}
