//! Path template core - compiled once, matched on every request.

use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

/// Maximum number of path variables before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated variable storage for the hot path.
///
/// Names are `Arc<str>` because they come from the immutable template and are
/// shared by every match; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Request segments rarely exceed this; longer paths spill to the heap.
type SegmentVec<'a> = SmallVec<[&'a str; 16]>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Box<str>),
    Variable(Arc<str>),
}

/// Ranking key used to order overlapping templates
///
/// Compared field by field; a greater value is more specific. Declaration
/// order is not part of the key and must be applied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity {
    /// Literal segments before the first variable or wildcard
    pub leading_literals: u16,
    /// Literal segments anywhere in the template
    pub literals: u16,
    /// `true` when the template has no trailing wildcard
    pub exact: bool,
    /// Total number of non-wildcard segments
    pub segments: u16,
}

/// A compiled path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
    wildcard: bool,
    specificity: Specificity,
}

/// Result of matching a request path against a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Decoded variable values, in template order
    pub vars: ParamVec,
    /// Decoded wildcard remainder; `None` when the template has no wildcard
    pub remainder: Option<String>,
    /// Literal segments matched before the first variable
    pub literal_count: usize,
}

impl PathMatch {
    /// Get a variable by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// The wildcard remainder, if the template had one
    #[inline]
    #[must_use]
    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }
}

/// Split a request path into segments
///
/// Strips any query string, the leading `/` and a single trailing `/`. The
/// root path yields no segments. Interior empty segments (`a//b`) are kept so
/// that they fail variable matches instead of silently collapsing.
#[must_use]
pub fn split_path(path: &str) -> SmallVec<[&str; 16]> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        return SegmentVec::new();
    }
    path.split('/').collect()
}

fn decode(segment: &str) -> Option<Cow<'_, str>> {
    urlencoding::decode(segment).ok()
}

impl PathTemplate {
    /// Compile a template string
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateVariable`] if a variable name repeats
    /// - [`ConfigError::MisplacedWildcard`] if `*` is not the final segment
    /// - [`ConfigError::MalformedSegment`] for empty segments or stray braces
    pub fn compile(template: &str) -> Result<Self, ConfigError> {
        let trimmed = template.strip_prefix('/').unwrap_or(template);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let raw_segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut wildcard = false;
        let mut rank = Specificity::default();
        let mut seen_variable = false;

        for (i, seg) in raw_segments.iter().enumerate() {
            let malformed = || ConfigError::MalformedSegment {
                template: template.to_string(),
                segment: (*seg).to_string(),
            };

            if *seg == "*" {
                if i + 1 != raw_segments.len() {
                    return Err(ConfigError::MisplacedWildcard {
                        template: template.to_string(),
                    });
                }
                wildcard = true;
                continue;
            }
            if seg.contains('*') && !seg.contains('{') {
                // `foo*` or `**` in the middle of a template
                return Err(ConfigError::MisplacedWildcard {
                    template: template.to_string(),
                });
            }
            if seg.is_empty() {
                return Err(malformed());
            }

            if let Some(inner) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if inner.is_empty() || inner.contains(['{', '}', '*']) {
                    return Err(malformed());
                }
                let duplicate = segments
                    .iter()
                    .any(|s| matches!(s, Segment::Variable(n) if n.as_ref() == inner));
                if duplicate {
                    return Err(ConfigError::DuplicateVariable {
                        template: template.to_string(),
                        name: inner.to_string(),
                    });
                }
                seen_variable = true;
                segments.push(Segment::Variable(Arc::from(inner)));
            } else {
                if seg.contains(['{', '}']) {
                    return Err(malformed());
                }
                if !seen_variable {
                    rank.leading_literals += 1;
                }
                rank.literals += 1;
                segments.push(Segment::Literal(Box::from(*seg)));
            }
        }

        rank.exact = !wildcard;
        rank.segments = u16::try_from(segments.len()).unwrap_or(u16::MAX);

        Ok(Self {
            raw: template.to_string(),
            segments,
            wildcard,
            specificity: rank,
        })
    }

    /// The template string as declared
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the template ends in a `*` wildcard
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Ranking key for tie-breaking overlapping matches
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Names of the variables in template order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// The first segment if it is a literal; used to index candidates
    #[must_use]
    pub fn first_literal(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Literal(lit)) => Some(lit.as_ref()),
            _ => None,
        }
    }

    /// Match a full request path
    ///
    /// Without a wildcard the segment counts must be equal; with one, the
    /// wildcard absorbs every remaining segment.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        self.match_segments(&split_path(path))
    }

    /// Match the template against the leading segments of a request path
    ///
    /// Returns the match and the unconsumed suffix (with a leading `/`).
    #[must_use]
    pub fn match_prefix(&self, path: &str) -> Option<(PathMatch, String)> {
        let segments = split_path(path);
        let (m, consumed) = self.match_prefix_segments(&segments)?;
        let mut rest = String::with_capacity(path.len());
        for seg in &segments[consumed..] {
            rest.push('/');
            rest.push_str(seg);
        }
        if rest.is_empty() {
            rest.push('/');
        }
        Some((m, rest))
    }

    /// Match pre-split segments exactly (or with wildcard remainder)
    #[must_use]
    pub fn match_segments(&self, segments: &[&str]) -> Option<PathMatch> {
        let n = self.segments.len();
        if self.wildcard {
            if segments.len() < n {
                return None;
            }
        } else if segments.len() != n {
            return None;
        }

        let mut m = self.bind(&segments[..n])?;
        if self.wildcard {
            let mut remainder = String::new();
            for (i, seg) in segments[n..].iter().enumerate() {
                if i > 0 {
                    remainder.push('/');
                }
                remainder.push_str(&decode(seg)?);
            }
            m.remainder = Some(remainder);
        }
        Some(m)
    }

    /// Match pre-split segments as a prefix, returning how many were consumed
    ///
    /// Wildcard templates consume everything.
    #[must_use]
    pub fn match_prefix_segments(&self, segments: &[&str]) -> Option<(PathMatch, usize)> {
        if self.wildcard {
            return self.match_segments(segments).map(|m| (m, segments.len()));
        }
        let n = self.segments.len();
        if segments.len() < n {
            return None;
        }
        self.bind(&segments[..n]).map(|m| (m, n))
    }

    fn bind(&self, segments: &[&str]) -> Option<PathMatch> {
        let mut vars = ParamVec::new();
        for (tpl, req) in self.segments.iter().zip(segments) {
            match tpl {
                Segment::Literal(lit) => {
                    if lit.as_ref() != *req {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    if req.is_empty() {
                        return None;
                    }
                    vars.push((Arc::clone(name), decode(req)?.into_owned()));
                }
            }
        }
        Some(PathMatch {
            vars,
            remainder: None,
            literal_count: usize::from(self.specificity.leading_literals),
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
