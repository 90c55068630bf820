//! Media type and media range parsing.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Error produced when a header value cannot be tokenized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaParseError {
    /// A `"` was opened and never closed
    UnterminatedQuote {
        /// The full header value
        input: String,
    },
    /// A token is missing the `/` between type and subtype, or one side is empty
    InvalidMediaType {
        /// The offending token
        token: String,
    },
    /// A parameter has no `=` or an empty name
    InvalidParameter {
        /// The offending parameter
        param: String,
    },
    /// The `q` parameter is not a number in `[0,1]` with at most three decimals
    InvalidQuality {
        /// The offending value
        value: String,
    },
}

impl fmt::Display for MediaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaParseError::UnterminatedQuote { input } => {
                write!(f, "unterminated quoted string in '{input}'")
            }
            MediaParseError::InvalidMediaType { token } => {
                write!(f, "'{token}' is not a type/subtype media range")
            }
            MediaParseError::InvalidParameter { param } => {
                write!(f, "'{param}' is not a name=value parameter")
            }
            MediaParseError::InvalidQuality { value } => {
                write!(f, "quality value '{value}' must be a number between 0 and 1")
            }
        }
    }
}

impl std::error::Error for MediaParseError {}

/// Quality value stored in thousandths so that ordering is total
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u16);

impl Quality {
    /// `q=1`
    pub const MAX: Quality = Quality(1000);
    /// `q=0`
    pub const ZERO: Quality = Quality(0);

    /// Build from thousandths, clamped to 1000
    #[must_use]
    pub fn from_millis(millis: u16) -> Self {
        Quality(millis.min(1000))
    }

    /// The value in thousandths
    #[must_use]
    pub fn millis(self) -> u16 {
        self.0
    }

    /// The value as a float in `[0,1]`
    #[must_use]
    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 1000.0
    }

    /// `true` for `q=0`, which marks a range as not acceptable
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse an RFC 9110 `qvalue`
    ///
    /// ```text
    /// qvalue = ( "0" [ "." 0*3DIGIT ] ) / ( "1" [ "." 0*3("0") ] )
    /// ```
    pub fn parse(value: &str) -> Result<Self, MediaParseError> {
        let invalid = || MediaParseError::InvalidQuality {
            value: value.to_string(),
        };
        let (int, frac) = value.split_once('.').unwrap_or((value, ""));
        if frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mut millis: u16 = 0;
        for (i, b) in frac.bytes().enumerate() {
            millis += u16::from(b - b'0') * [100, 10, 1][i];
        }
        match int {
            "0" => Ok(Quality(millis)),
            "1" if millis == 0 => Ok(Quality::MAX),
            _ => Err(invalid()),
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::MAX
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f32())
    }
}

impl Serialize for Quality {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.as_f32())
    }
}

/// A `type/subtype` with parameters, as declared or as seen in a header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Create a media type from lowercase-insensitive parts
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Add a parameter (name is lowercased)
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// `*/*`
    #[must_use]
    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse a single declared media type (`application/json;charset=utf-8`)
    ///
    /// A `q` parameter, if present, is validated and dropped.
    pub fn parse(s: &str) -> Result<Self, MediaParseError> {
        let tokens = split_unquoted(s, ',', s)?;
        match tokens.as_slice() {
            [single] => parse_token(single).map(|range| range.media),
            _ => Err(MediaParseError::InvalidMediaType {
                token: s.trim().to_string(),
            }),
        }
    }

    /// Top-level type, lowercase
    #[must_use]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// Subtype, lowercase
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Extension parameters (never includes `q`)
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Look up a parameter by (case-insensitive) name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` for `*/*`
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.type_ == "*"
    }

    /// `true` for `type/*` (and `*/*`)
    #[must_use]
    pub fn is_subtype_wildcard(&self) -> bool {
        self.subtype == "*"
    }

    /// `type/subtype` without parameters
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// 2 = exact, 1 = `type/*`, 0 = `*/*`
    pub(crate) fn wildcard_rank(&self) -> u8 {
        if self.is_any() {
            0
        } else if self.is_subtype_wildcard() {
            1
        } else {
            2
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (k, v) in &self.params {
            write!(f, ";{k}={v}")?;
        }
        Ok(())
    }
}

impl Serialize for MediaType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One parsed entry of a negotiation header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRange {
    /// The type pattern (may contain wildcards)
    pub media: MediaType,
    /// Client preference
    pub q: Quality,
}

/// Best-first ordered media ranges for one header value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MediaRangeSet {
    ranges: Vec<MediaRange>,
}

static ANY: Lazy<Arc<MediaRangeSet>> = Lazy::new(|| {
    Arc::new(MediaRangeSet {
        ranges: vec![MediaRange {
            media: MediaType::any(),
            q: Quality::MAX,
        }],
    })
});

impl MediaRangeSet {
    /// Parse and order a header value
    ///
    /// A blank value yields the singleton `*/*` set.
    pub fn parse(header: &str) -> Result<Self, MediaParseError> {
        if header.trim().is_empty() {
            return Ok(MediaRangeSet::clone(&ANY));
        }
        let mut ranges = Vec::new();
        for token in split_unquoted(header, ',', header)? {
            if token.trim().is_empty() {
                continue;
            }
            ranges.push(parse_token(token)?);
        }
        if ranges.is_empty() {
            return Ok(MediaRangeSet::clone(&ANY));
        }
        // Stable: equal keys keep header order
        ranges.sort_by(|a, b| {
            b.q.cmp(&a.q)
                .then_with(|| b.media.wildcard_rank().cmp(&a.media.wildcard_rank()))
                .then_with(|| b.media.params.len().cmp(&a.media.params.len()))
        });
        Ok(Self { ranges })
    }

    /// The shared `*/*` set used when a header is absent
    #[must_use]
    pub fn any() -> Arc<MediaRangeSet> {
        Arc::clone(&ANY)
    }

    /// A set holding one range at full quality
    #[must_use]
    pub fn single(media: MediaType) -> Self {
        Self {
            ranges: vec![MediaRange {
                media,
                q: Quality::MAX,
            }],
        }
    }

    /// Ranges best-first
    #[must_use]
    pub fn ranges(&self) -> &[MediaRange] {
        &self.ranges
    }

    /// Number of ranges
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// `true` if there are no ranges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The most preferred range
    #[must_use]
    pub fn first(&self) -> Option<&MediaRange> {
        self.ranges.first()
    }
}

impl<'a> IntoIterator for &'a MediaRangeSet {
    type Item = &'a MediaRange;
    type IntoIter = std::slice::Iter<'a, MediaRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Split on `sep` outside double-quoted strings (with `\` escapes)
fn split_unquoted<'a>(
    s: &'a str,
    sep: char,
    whole: &str,
) -> Result<Vec<&'a str>, MediaParseError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            c if c == sep && !in_quote => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if in_quote {
        return Err(MediaParseError::UnterminatedQuote {
            input: whole.to_string(),
        });
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut escaped = false;
            for c in inner.chars() {
                if !escaped && c == '\\' {
                    escaped = true;
                    continue;
                }
                escaped = false;
                out.push(c);
            }
            out
        }
        None => value.to_string(),
    }
}

fn parse_token(token: &str) -> Result<MediaRange, MediaParseError> {
    let mut parts = split_unquoted(token, ';', token)?.into_iter();
    let essence = parts.next().unwrap_or_default().trim();

    let (type_, subtype) = match essence.split_once('/') {
        Some((t, s)) => (t.trim(), s.trim()),
        None if essence == "*" => ("*", "*"),
        None => {
            return Err(MediaParseError::InvalidMediaType {
                token: token.trim().to_string(),
            })
        }
    };
    let bad_char = |s: &str| s.contains(|c: char| c.is_whitespace() || c == '/' || c == '"');
    if type_.is_empty() || subtype.is_empty() || bad_char(type_) || bad_char(subtype) {
        return Err(MediaParseError::InvalidMediaType {
            token: token.trim().to_string(),
        });
    }
    if type_ == "*" && subtype != "*" {
        return Err(MediaParseError::InvalidMediaType {
            token: token.trim().to_string(),
        });
    }

    let mut media = MediaType::new(type_, subtype);
    let mut q = Quality::MAX;
    for param in parts {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let Some((key, value)) = param.split_once('=') else {
            return Err(MediaParseError::InvalidParameter {
                param: param.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(MediaParseError::InvalidParameter {
                param: param.to_string(),
            });
        }
        if key.eq_ignore_ascii_case("q") {
            q = Quality::parse(value.trim())?;
        } else {
            media = media.with_param(key, unquote(value.trim()));
        }
    }

    Ok(MediaRange { media, q })
}
