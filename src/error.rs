//! Error types for registration-time configuration and request-time rejection.
//!
//! Two families live here:
//!
//! - [`ConfigError`] is raised while a routing tree is being built. It is fatal
//!   to start-up and never produced while dispatching a request.
//! - [`Rejection`] is the typed outcome of a dispatch that found no operation.
//!   It maps onto an HTTP status code but keeps the internal [`RejectReason`]
//!   so diagnostics can tell a path miss from a media-type miss even when both
//!   surface as `404`.

use http::{Method, StatusCode};
use std::fmt;

use crate::guard::GuardParseError;
use crate::media::MediaParseError;
use crate::version::VersionParseError;

/// Registration-time configuration error
///
/// Returned by the template compiler, the resource builders and the
/// configuration loader when a declaration can never be dispatched correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable name appears more than once in the same template
    DuplicateVariable {
        /// The offending template
        template: String,
        /// The repeated variable name
        name: String,
    },
    /// A `*` wildcard segment appears before the last segment
    MisplacedWildcard {
        /// The offending template
        template: String,
    },
    /// A segment contains braces that do not form a `{name}` variable
    MalformedSegment {
        /// The offending template
        template: String,
        /// The malformed segment
        segment: String,
    },
    /// A resource (as opposed to an operation) template ends in a wildcard
    WildcardInResourcePath {
        /// The offending template
        template: String,
    },
    /// An operation declares an HTTP method token that is not valid
    InvalidMethod {
        /// The operation name
        operation: String,
        /// The rejected method string
        method: String,
    },
    /// A `produces`/`consumes`/default header value did not parse
    InvalidMediaType {
        /// The operation name
        operation: String,
        /// Underlying parse failure
        source: MediaParseError,
    },
    /// A client-version range expression did not parse
    InvalidVersionRange {
        /// The operation name
        operation: String,
        /// Underlying parse failure
        source: VersionParseError,
    },
    /// A role-guard expression did not parse or used globs without a declared universe
    InvalidRoleGuard {
        /// The operation or resource the guard was declared on
        owner: String,
        /// Underlying parse failure
        source: GuardParseError,
    },
    /// A resource overrides the client version header with an invalid header name
    InvalidVersionHeader {
        /// The resource declaring the override
        owner: String,
        /// The rejected header name
        header: String,
    },
    /// Two operations in the same resource share an operation name
    DuplicateOperation {
        /// The repeated operation name
        name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateVariable { template, name } => write!(
                f,
                "path template '{template}' declares variable '{name}' more than once"
            ),
            ConfigError::MisplacedWildcard { template } => write!(
                f,
                "path template '{template}' uses '*' before the final segment"
            ),
            ConfigError::MalformedSegment { template, segment } => write!(
                f,
                "path template '{template}' has malformed segment '{segment}' (expected literal or {{name}})"
            ),
            ConfigError::WildcardInResourcePath { template } => write!(
                f,
                "resource path '{template}' may not end in a wildcard; declare the wildcard on an operation"
            ),
            ConfigError::InvalidMethod { operation, method } => {
                write!(f, "operation '{operation}' declares invalid HTTP method '{method}'")
            }
            ConfigError::InvalidMediaType { operation, source } => {
                write!(f, "operation '{operation}' declares an invalid media type: {source}")
            }
            ConfigError::InvalidVersionRange { operation, source } => write!(
                f,
                "operation '{operation}' declares an invalid client version range: {source}"
            ),
            ConfigError::InvalidRoleGuard { owner, source } => {
                write!(f, "'{owner}' declares an invalid role guard: {source}")
            }
            ConfigError::InvalidVersionHeader { owner, header } => write!(
                f,
                "'{owner}' declares invalid client version header name '{}'",
                header.escape_debug()
            ),
            ConfigError::DuplicateOperation { name } => {
                write!(f, "operation name '{name}' is registered more than once in the same resource")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidMediaType { source, .. } => Some(source),
            ConfigError::InvalidVersionRange { source, .. } => Some(source),
            ConfigError::InvalidRoleGuard { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Which stage of the selection cascade emptied the survivor set
///
/// Ordered from the earliest stage to the latest. The derived `Ord` is used to
/// pick the most specific rejection when a child resource and its parent both
/// fail to resolve a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No template matched the path
    PathNotFound,
    /// The path matched but no candidate accepts the HTTP method
    MethodNotAllowed,
    /// No candidate's client-version range contains the request version
    VersionMismatch,
    /// No candidate consumes the request `Content-Type`
    UnsupportedMediaType,
    /// No candidate produces anything the `Accept` header allows
    NotAcceptable,
    /// Every remaining candidate failed its guards
    GuardDenied,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::PathNotFound => "path not found",
            RejectReason::MethodNotAllowed => "method not allowed",
            RejectReason::VersionMismatch => "client version not supported",
            RejectReason::UnsupportedMediaType => "content type not supported",
            RejectReason::NotAcceptable => "no acceptable response media type",
            RejectReason::GuardDenied => "guard denied",
        };
        f.write_str(s)
    }
}

/// Which request header failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    /// `Accept`
    Accept,
    /// `Content-Type`
    ContentType,
    /// The configured client-version header
    ClientVersion,
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderKind::Accept => f.write_str("Accept"),
            HeaderKind::ContentType => f.write_str("Content-Type"),
            HeaderKind::ClientVersion => f.write_str("client version"),
        }
    }
}

/// Why a call could not be dispatched to any operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// `404`: nothing matched, or (by convention) media negotiation failed
    NotFound {
        /// The stage that emptied the survivor set
        reason: RejectReason,
    },
    /// `405`: the path matched, the method did not
    MethodNotAllowed {
        /// Methods accepted at this path, for the `Allow` header
        allowed: Vec<Method>,
    },
    /// `406`: only produced when strict `Accept` handling is configured
    NotAcceptable,
    /// `412`: no candidate accepts the request client version
    PreconditionFailed,
    /// `403`: a candidate negotiated but its guards denied the caller
    Forbidden,
    /// `400`: a request header could not be tokenized at all
    BadHeader {
        /// Which header was malformed
        header: HeaderKind,
        /// Human-readable parse failure
        message: String,
    },
}

impl Rejection {
    /// HTTP status code to send for this rejection
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::NotFound { .. } => StatusCode::NOT_FOUND,
            Rejection::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Rejection::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Rejection::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Rejection::Forbidden => StatusCode::FORBIDDEN,
            Rejection::BadHeader { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Internal reason, retained even where the status code is shared
    ///
    /// Returns `None` for header parse failures, which happen outside the
    /// cascade.
    #[must_use]
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Rejection::NotFound { reason } => Some(*reason),
            Rejection::MethodNotAllowed { .. } => Some(RejectReason::MethodNotAllowed),
            Rejection::NotAcceptable => Some(RejectReason::NotAcceptable),
            Rejection::PreconditionFailed => Some(RejectReason::VersionMismatch),
            Rejection::Forbidden => Some(RejectReason::GuardDenied),
            Rejection::BadHeader { .. } => None,
        }
    }

    /// Value for the `Allow` response header, if this is a `405`
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            Rejection::MethodNotAllowed { allowed } => Some(
                allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }

    pub(crate) fn bad_header(header: HeaderKind, err: &dyn fmt::Display) -> Self {
        Rejection::BadHeader {
            header,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotFound { reason } => write!(f, "404 Not Found ({reason})"),
            Rejection::MethodNotAllowed { allowed } => {
                let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                write!(f, "405 Method Not Allowed (allow: {})", allowed.join(", "))
            }
            Rejection::NotAcceptable => f.write_str("406 Not Acceptable"),
            Rejection::PreconditionFailed => f.write_str("412 Precondition Failed"),
            Rejection::Forbidden => f.write_str("403 Forbidden"),
            Rejection::BadHeader { header, message } => {
                write!(f, "400 Bad Request (malformed {header} header: {message})")
            }
        }
    }
}

impl std::error::Error for Rejection {}
