//! Best-match selection between a parsed header and declared media types.

use super::range::{MediaRangeSet, MediaType, Quality};

/// How well a header range matches a declared type; greater is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchScore {
    /// `*/*` on either side
    WildcardType,
    /// Same type, `type/*` on either side
    WildcardSubtype,
    /// Same type, one subtype's `+` fragments contain the other's
    Fuzzy,
    /// Same type and subtype
    Exact,
}

fn fragments_contain(outer: &str, inner: &str) -> bool {
    inner.split('+').all(|f| outer.split('+').any(|o| o == f))
}

/// Score a header range against one declared type
///
/// Wildcards are honoured on either side so the same scorer serves `Accept`
/// against `produces` and `Content-Type` against `consumes`. Parameters do not
/// affect the score.
#[must_use]
pub fn score(range: &MediaType, candidate: &MediaType) -> Option<MatchScore> {
    if range.is_any() || candidate.is_any() {
        return Some(MatchScore::WildcardType);
    }
    if range.type_() != candidate.type_() {
        return None;
    }
    if range.subtype() == candidate.subtype() {
        return Some(MatchScore::Exact);
    }
    if range.is_subtype_wildcard() || candidate.is_subtype_wildcard() {
        return Some(MatchScore::WildcardSubtype);
    }
    let (a, b) = (range.subtype(), candidate.subtype());
    if fragments_contain(a, b) || fragments_contain(b, a) {
        return Some(MatchScore::Fuzzy);
    }
    None
}

/// Index of the declared type that best satisfies the ranges
///
/// Ranges are visited best-first and ranges with `q=0` are skipped. Once a
/// range's `q` falls below that of the current best match the scan stops,
/// since the set is pre-sorted and nothing later can beat it. Among equally
/// scored candidates the earliest-declared one is kept.
#[must_use]
pub fn find_best_match(ranges: &MediaRangeSet, candidates: &[MediaType]) -> Option<usize> {
    let mut best: Option<(MatchScore, Quality, usize)> = None;

    for range in ranges {
        if range.q.is_zero() {
            continue;
        }
        if let Some((_, best_q, _)) = best {
            if range.q < best_q {
                break;
            }
        }
        for (idx, candidate) in candidates.iter().enumerate() {
            let Some(s) = score(&range.media, candidate) else {
                continue;
            };
            match best {
                Some((best_score, _, _)) if best_score >= s => {}
                _ => best = Some((s, range.q, idx)),
            }
        }
    }

    best.map(|(_, _, idx)| idx)
}
