//! # Method Registry
//!
//! Selects exactly one operation of a resource for a call, or reports the
//! most specific reason why none qualifies.
//!
//! ## Selection cascade
//!
//! Candidates are filtered stage by stage; the first stage that leaves no
//! survivor decides the rejection:
//!
//! | Stage | Filter | Empty result |
//! |-------|--------|--------------|
//! | 1 | path template matches the path | `404` |
//! | 2 | declared method (or `*`) matches | `405` with `Allow` |
//! | 3 | client version lies in the declared range | `412` |
//! | 4 | `Content-Type` matches `consumes` (body only) | `404` |
//! | 5 | `Accept` matches `produces` | `404` (or `406` when strict) |
//! | 6 | every guard passes | `403` |
//!
//! Among several survivors the most specific template wins (see
//! [`Specificity`](crate::path::Specificity)); equal templates fall back to
//! declaration order.
//!
//! ```rust
//! use brrtdispatch::call::{CallState, RequestSeed};
//! use brrtdispatch::media::MediaRangeCache;
//! use brrtdispatch::registry::{CandidateBuilder, MethodRegistry};
//! use brrtdispatch::runtime_config::DispatchSettings;
//!
//! let registry = MethodRegistry::build(
//!     vec![
//!         CandidateBuilder::new("foo_json", "GET", "/foo").produces("application/json"),
//!         CandidateBuilder::new("foo_html", "GET", "/foo").produces("text/html"),
//!     ],
//!     DispatchSettings::default(),
//! )
//! .unwrap();
//!
//! let cache = MediaRangeCache::default();
//! let mut call = CallState::new(RequestSeed::new("GET", "/foo").header("Accept", "text/html"));
//! let selection = registry.select(&mut call, "/foo", &cache).unwrap();
//! assert_eq!(selection.candidate.name(), "foo_html");
//! ```

mod candidate;
mod core;

pub use candidate::{Candidate, CandidateBuilder, MethodMatcher};
pub use core::{MethodRegistry, Selection, METHOD_OVERRIDE_HEADER, METHOD_OVERRIDE_PARAM};

pub(crate) use candidate::ResourceScope;
