//! # Media Module
//!
//! Quality-weighted media-type negotiation for `Accept` and `Content-Type`.
//!
//! ## Overview
//!
//! - [`MediaRangeSet::parse`] tokenizes a header value into media ranges and
//!   orders them best-first: descending `q`, then exact type/subtype before
//!   `type/*` before `*/*`, then more parameters first.
//! - [`find_best_match`] walks the ranges best-first and scores each declared
//!   candidate type. Exact matches beat fuzzy `+`-suffix matches, which beat
//!   subtype wildcards, which beat type wildcards. Equal scores keep the
//!   earliest-declared candidate.
//! - [`MediaRangeCache`] memoizes parsed sets by the exact header string in a
//!   bounded LRU, because identical header values recur across requests from
//!   the same client population.
//!
//! ## Fuzzy Subtypes
//!
//! Subtypes are compared as sets of `+`-delimited fragments. A serializer
//! declared for `text/json` satisfies `Accept: text/json+activity` because
//! `{json, activity}` contains `{json}`:
//!
//! ```rust
//! use brrtdispatch::media::{find_best_match, MediaRangeSet, MediaType};
//!
//! let accept = MediaRangeSet::parse("text/json+activity").unwrap();
//! let produces = [MediaType::parse("text/json").unwrap()];
//! assert_eq!(find_best_match(&accept, &produces), Some(0));
//! ```

mod cache;
mod negotiate;
mod range;

pub use cache::{CacheStats, MediaRangeCache, DEFAULT_CACHE_CAPACITY};
pub use negotiate::{find_best_match, score, MatchScore};
pub use range::{MediaParseError, MediaRange, MediaRangeSet, MediaType, Quality};
