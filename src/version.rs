//! # Client Version Ranges
//!
//! Operations may restrict themselves to a range of client API versions. The
//! request supplies its version in a header (default `X-Client-Version`) and
//! the cascade drops candidates whose range does not contain it.
//!
//! ## Grammar
//!
//! ```text
//! range   = minimum / exact / interval
//! minimum = version                       ; version >= V
//! exact   = "[" version "]"               ; version == V
//! interval = ( "[" / "(" ) [ version ] "," [ version ] ( "]" / ")" )
//! version = 1*DIGIT *( "." 1*DIGIT )
//! ```
//!
//! `[` and `]` are inclusive, `(` and `)` exclusive, and an omitted bound is
//! unbounded. Missing trailing version parts compare as zero, so `1.1` equals
//! `1.1.0`.
//!
//! Upper bounds are compared at the precision they are written with: the
//! request version is cut (or zero-padded) to as many parts as the bound has.
//! `[0,1.0]` therefore admits `1.0.7` but not `1.1`, and `[1.1,2.0)` rejects
//! `2.0.3`.
//!
//! ```rust
//! use brrtdispatch::version::{Version, VersionRange};
//!
//! let range: VersionRange = "[1.1,2.0)".parse().unwrap();
//! assert!(range.contains(&"1.1".parse::<Version>().unwrap()));
//! assert!(range.contains(&"1.9.9".parse::<Version>().unwrap()));
//! assert!(!range.contains(&"2.0".parse::<Version>().unwrap()));
//!
//! let range: VersionRange = "[0,1.0]".parse().unwrap();
//! assert!(range.contains(&"1.0.1".parse::<Version>().unwrap()));
//! assert!(!range.contains(&"1.1".parse::<Version>().unwrap()));
//! ```

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Error produced by the version and version-range parsers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The input is not a dotted list of non-negative integers
    InvalidVersion {
        /// The offending input
        input: String,
    },
    /// The range syntax is wrong or describes an empty range
    InvalidRange {
        /// The offending input
        input: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionParseError::InvalidVersion { input } => {
                write!(f, "'{input}' is not a dotted numeric version")
            }
            VersionParseError::InvalidRange { input, reason } => {
                write!(f, "'{input}' is not a valid version range: {reason}")
            }
        }
    }
}

impl std::error::Error for VersionParseError {}

/// A dotted numeric version
///
/// Equality and ordering are zero-padded (`1.1 == 1.1.0`); the declared
/// precision is kept for upper-bound checks.
#[derive(Debug, Clone)]
pub struct Version(SmallVec<[u32; 4]>);

impl Version {
    /// Numeric parts, trailing zeros trimmed
    #[must_use]
    pub fn parts(&self) -> &[u32] {
        let len = self.0.iter().rposition(|&p| p != 0).map_or(0, |i| i + 1);
        &self.0[..len]
    }

    /// Number of parts as written
    #[must_use]
    pub fn precision(&self) -> usize {
        self.0.len()
    }

    /// Compare against `bound` using only as many parts as `bound` declares
    #[must_use]
    pub fn cmp_at_precision(&self, bound: &Version) -> Ordering {
        (0..bound.0.len())
            .map(|i| self.0.get(i).copied().unwrap_or(0))
            .cmp(bound.0.iter().copied())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.parts() == other.parts()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts().cmp(other.parts())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError::InvalidVersion {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }
        let mut parts = SmallVec::new();
        for part in trimmed.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            parts.push(part.parse::<u32>().map_err(|_| invalid())?);
        }
        Ok(Version(parts))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts().is_empty() {
            return f.write_str("0");
        }
        let parts: Vec<String> = self.parts().iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// One side of a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    /// No limit on this side
    Unbounded,
    /// Limit included in the range
    Inclusive(Version),
    /// Limit excluded from the range
    Exclusive(Version),
}

/// A compiled client-version range expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    lower: Bound,
    upper: Bound,
}

impl VersionRange {
    /// The expression as declared
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lower bound
    #[must_use]
    pub fn lower(&self) -> &Bound {
        &self.lower
    }

    /// Upper bound
    #[must_use]
    pub fn upper(&self) -> &Bound {
        &self.upper
    }

    /// Whether `version` lies inside the range
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        let above = match &self.lower {
            Bound::Unbounded => true,
            Bound::Inclusive(v) => version >= v,
            Bound::Exclusive(v) => version > v,
        };
        let below = match &self.upper {
            Bound::Unbounded => true,
            Bound::Inclusive(v) => version.cmp_at_precision(v) != Ordering::Greater,
            Bound::Exclusive(v) => version.cmp_at_precision(v) == Ordering::Less,
        };
        above && below
    }

    fn parse_bound(
        text: &str,
        inclusive: bool,
        input: &str,
    ) -> Result<Bound, VersionParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Bound::Unbounded);
        }
        let v = text.parse::<Version>().map_err(|_| VersionParseError::InvalidRange {
            input: input.to_string(),
            reason: "bound is not a dotted numeric version",
        })?;
        Ok(if inclusive {
            Bound::Inclusive(v)
        } else {
            Bound::Exclusive(v)
        })
    }
}

impl FromStr for VersionRange {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |reason| VersionParseError::InvalidRange {
            input: s.to_string(),
            reason,
        };
        if input.is_empty() {
            return Err(invalid("expression is empty"));
        }

        let open = input.as_bytes()[0];
        if open != b'[' && open != b'(' {
            let v = input.parse::<Version>()?;
            return Ok(Self {
                raw: input.to_string(),
                lower: Bound::Inclusive(v),
                upper: Bound::Unbounded,
            });
        }

        let close = input.as_bytes()[input.len() - 1];
        if input.len() < 2 || (close != b']' && close != b')') {
            return Err(invalid("missing closing ']' or ')'"));
        }
        let inner = &input[1..input.len() - 1];

        let (lower, upper) = match inner.split_once(',') {
            Some((lo, hi)) => {
                if hi.contains(',') {
                    return Err(invalid("more than two bounds"));
                }
                (
                    Self::parse_bound(lo, open == b'[', s)?,
                    Self::parse_bound(hi, close == b']', s)?,
                )
            }
            None => {
                if open != b'[' || close != b']' {
                    return Err(invalid("an exact version must use '[V]'"));
                }
                let v = Self::parse_bound(inner, true, s)?;
                if v == Bound::Unbounded {
                    return Err(invalid("exact version is empty"));
                }
                (v.clone(), v)
            }
        };

        let empty = match (&lower, &upper) {
            (Bound::Inclusive(a) | Bound::Exclusive(a), Bound::Inclusive(b)) => {
                a.cmp_at_precision(b) == Ordering::Greater
            }
            (Bound::Inclusive(a) | Bound::Exclusive(a), Bound::Exclusive(b)) => {
                a.cmp_at_precision(b) != Ordering::Less
            }
            _ => false,
        };
        if empty {
            return Err(invalid("range contains no versions"));
        }

        Ok(Self {
            raw: input.to_string(),
            lower,
            upper,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
