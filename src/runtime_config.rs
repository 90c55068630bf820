//! # Runtime Configuration Module
//!
//! Environment variable based settings for dispatch behavior.
//!
//! ## Environment Variables
//!
//! ### `BRRTD_MEDIA_CACHE_SIZE`
//!
//! Number of distinct `Accept`/`Content-Type` header values whose parsed form
//! is kept. Accepts decimal (`512`) or hexadecimal (`0x200`).
//!
//! Default: `256`
//!
//! ### `BRRTD_VERSION_HEADER`
//!
//! Name of the request header carrying the client API version.
//!
//! Default: `X-Client-Version`
//!
//! ### `BRRTD_STRICT_ACCEPT`
//!
//! When `true`, a call whose `Accept` header matches no operation is rejected
//! with `406 Not Acceptable` instead of `404 Not Found`.
//!
//! Default: `false`
//!
//! ### `BRRTD_METHOD_OVERRIDE`
//!
//! When `true`, the `method` query parameter or the `X-Method` header (in that
//! order) replaces the request method for matching. Useful for clients that
//! can only send `GET` and `POST`.
//!
//! Default: `false`
//!
//! Invalid values fall back to the defaults.
//!
//! ## Usage
//!
//! ```rust
//! use brrtdispatch::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Media cache: {} entries", config.media_cache_size);
//! let settings = config.dispatch_settings();
//! assert!(!settings.version_header.is_empty());
//! ```

use std::env;
use std::sync::Arc;

use crate::media::DEFAULT_CACHE_CAPACITY;

/// Default request header carrying the client API version
pub const DEFAULT_VERSION_HEADER: &str = "X-Client-Version";

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of the media range parse cache (default: 256)
    pub media_cache_size: usize,
    /// Client version header name (default: `X-Client-Version`)
    pub version_header: String,
    /// Reject unmatched `Accept` with 406 (default: false)
    pub strict_accept: bool,
    /// Honour `method` / `X-Method` overrides (default: false)
    pub method_override: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            media_cache_size: DEFAULT_CACHE_CAPACITY,
            version_header: DEFAULT_VERSION_HEADER.to_string(),
            strict_accept: false,
            method_override: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let media_cache_size = match lookup("BRRTD_MEDIA_CACHE_SIZE") {
            Some(val) => {
                let val = val.trim();
                let parsed = if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).ok()
                } else {
                    val.parse().ok()
                };
                parsed.filter(|n| *n > 0).unwrap_or(defaults.media_cache_size)
            }
            None => defaults.media_cache_size,
        };
        let version_header = lookup("BRRTD_VERSION_HEADER")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && http::HeaderName::from_bytes(v.as_bytes()).is_ok())
            .unwrap_or(defaults.version_header);
        RuntimeConfig {
            media_cache_size,
            version_header,
            strict_accept: parse_flag(lookup("BRRTD_STRICT_ACCEPT"), defaults.strict_accept),
            method_override: parse_flag(
                lookup("BRRTD_METHOD_OVERRIDE"),
                defaults.method_override,
            ),
        }
    }

    /// Per-resource settings derived from this configuration
    #[must_use]
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            version_header: Arc::from(self.version_header.as_str()),
            strict_accept: self.strict_accept,
            method_override: self.method_override,
        }
    }
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes") => {
            true
        }
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" || v.eq_ignore_ascii_case("no") => {
            false
        }
        _ => default,
    }
}

/// Settings attached to one resource's method registry
///
/// Child resources inherit their parent's settings; a child declaration may
/// override the version header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Request header carrying the client version
    pub version_header: Arc<str>,
    /// Report an unmatched `Accept` as 406 instead of 404
    pub strict_accept: bool,
    /// Honour the `method` query parameter and `X-Method` header
    pub method_override: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        RuntimeConfig::default().dispatch_settings()
    }
}

impl DispatchSettings {
    /// Copy of these settings with a different version header
    #[must_use]
    pub fn with_version_header(&self, header: &str) -> Self {
        Self {
            version_header: Arc::from(header),
            ..self.clone()
        }
    }
}
