//! Sensitive content detection.
//!
//! Pure classifiers and maskers over arbitrary strings:
//! - national ID numbers (CPF/CNPJ, punctuated or not)
//! - secrets and blobs (PEM, JWT, base64, hex, provider API tokens)
//! - URL query scrubbing
//!
//! Every function here is total: no input makes them panic or error.

use crate::normalize::{normalize_field_name, MarkerSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Character used to mask national ID digits.
pub const MASK_CHAR: char = '*';

/// Minimum length for a JWT-shaped string to count as a token.
pub const JWT_MIN_LEN: usize = 80;

/// Minimum length for a base64 string without a known magic prefix.
pub const BASE64_MIN_LEN: usize = 2000;

/// Minimum length for a base64 string with a known magic prefix.
pub const BASE64_MAGIC_MIN_LEN: usize = 64;

/// Minimum fraction of base64-alphabet characters.
pub const BASE64_MIN_RATIO: f64 = 0.95;

/// Minimum length for a hex blob.
pub const HEX_MIN_LEN: usize = 64;

/// Base64 encodings of common binary file signatures.
const BINARY_MAGIC_PREFIXES: &[&str] = &[
    "JVBERi0",     // PDF
    "iVBORw0KGgo", // PNG
    "/9j/",        // JPEG
    "R0lGOD",      // GIF
    "UEsDB",       // ZIP, DOCX, XLSX
    "UklGR",       // RIFF, WEBP
    "0M8R4KGxGuE", // OLE2 (DOC, XLS, MSG)
    "SUkqAA",      // TIFF
    "AAAAGGZ0eXA", // MP4
    "AAAAIGZ0eXA", // MP4
];

/// Type of detected secret or blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    /// PEM block or private key material
    Pem,
    /// JSON Web Token
    Jwt,
    /// Base64-encoded binary content
    Base64Blob,
    /// Long hexadecimal string
    HexBlob,
    /// Provider API token (AWS, GitHub, GitLab, Slack, AI providers, bearer)
    ApiToken,
}

impl SecretType {
    /// Opaque replacement marker for this secret type.
    pub fn marker(&self) -> &'static str {
        match self {
            SecretType::Pem => "[PEM_REDACTED]",
            SecretType::Jwt => "[JWT_REDACTED]",
            SecretType::Base64Blob => "[BASE64_REDACTED]",
            SecretType::HexBlob => "[HEX_REDACTED]",
            SecretType::ApiToken => "[TOKEN_REDACTED]",
        }
    }

    /// Whether this detection is binary content rather than a credential.
    pub fn is_binary(&self) -> bool {
        matches!(self, SecretType::Base64Blob | SecretType::HexBlob)
    }
}

impl std::fmt::Display for SecretType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SecretType::Pem => "pem",
            SecretType::Jwt => "jwt",
            SecretType::Base64Blob => "base64_blob",
            SecretType::HexBlob => "hex_blob",
            SecretType::ApiToken => "api_token",
        };
        write!(f, "{}", s)
    }
}

// Punctuated forms first so they win over the bare digit alternatives
static RE_NATIONAL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}|\d{3}\.\d{3}\.\d{3}-\d{2}|\d{14}|\d{11}").unwrap()
});

static RE_JWT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+=*$").unwrap()
});

static RE_API_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"AKIA[0-9A-Z]{16}",
        r"|gh[pousr]_[A-Za-z0-9_]{36,}",
        r"|glpat-[A-Za-z0-9\-_]{20,}",
        r"|xox[baprs]-[A-Za-z0-9\-]{10,}",
        r"|sk-(?:ant-)?[A-Za-z0-9_-]{20,}",
        r"|(?i:bearer)\s+[A-Za-z0-9\-._~+/]{20,}=*",
    ))
    .unwrap()
});

static RE_INTERIOR_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S) {2,}(\S)").unwrap());

// ============================================================================
// National IDs
// ============================================================================

/// Byte ranges of national ID runs in `text`.
///
/// A run only counts when it is not part of a longer digit sequence.
pub fn find_national_ids(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    RE_NATIONAL_ID
        .find_iter(text)
        .filter(|m| {
            let before_ok = m.start() == 0 || !bytes[m.start() - 1].is_ascii_digit();
            let after_ok = m.end() == bytes.len() || !bytes[m.end()].is_ascii_digit();
            before_ok && after_ok
        })
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Whether `text` contains a national ID run.
pub fn contains_national_id(text: &str) -> bool {
    !find_national_ids(text).is_empty()
}

/// Replace every national ID run with mask characters of equal length.
///
/// Surrounding text is untouched and the output has the same length as the
/// input, in bytes and in characters.
pub fn mask_national_ids(text: &str) -> String {
    let ranges = find_national_ids(text);
    if ranges.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in ranges {
        out.push_str(&text[last..start]);
        // Matched runs are ASCII, so byte length equals character count
        out.extend(std::iter::repeat(MASK_CHAR).take(end - start));
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// Collapse interior runs of two or more spaces to a single space.
///
/// Leading and trailing spaces, single spaces and every non-space character
/// are preserved verbatim.
pub fn collapse_interior_spaces(text: &str) -> String {
    if !text.contains("  ") {
        return text.to_string();
    }
    // Overlapping runs ("a  b  c") need a second pass because the shared
    // character is consumed by the first match.
    let mut current = text.to_string();
    loop {
        let next = RE_INTERIOR_SPACES.replace_all(&current, "$1 $2").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

// ============================================================================
// Secrets and blobs
// ============================================================================

/// Secret and blob detector.
#[derive(Debug, Clone)]
pub struct SecretDetector {
    /// Whether provider API token patterns are checked.
    detect_api_tokens: bool,
}

impl SecretDetector {
    /// Create a detector with all checks enabled.
    pub fn new() -> Self {
        Self {
            detect_api_tokens: true,
        }
    }

    /// Enable or disable provider token detection.
    pub fn with_api_tokens(mut self, enabled: bool) -> Self {
        self.detect_api_tokens = enabled;
        self
    }

    /// Detect a secret, testing PEM, JWT, base64, hex, then API tokens.
    pub fn detect(&self, value: &str) -> Option<SecretType> {
        if is_pem(value) {
            return Some(SecretType::Pem);
        }
        if is_jwt(value) {
            return Some(SecretType::Jwt);
        }
        if looks_like_base64_blob(value) {
            return Some(SecretType::Base64Blob);
        }
        if is_hex_blob(value) {
            return Some(SecretType::HexBlob);
        }
        if self.detect_api_tokens && RE_API_TOKEN.is_match(value) {
            return Some(SecretType::ApiToken);
        }
        None
    }
}

impl Default for SecretDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// PEM block or private key marker.
pub fn is_pem(value: &str) -> bool {
    value.contains("-----BEGIN ") || value.contains("PRIVATE KEY")
}

/// Three dot-separated URL-safe base64 segments, at least `JWT_MIN_LEN` long.
pub fn is_jwt(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() >= JWT_MIN_LEN && RE_JWT.is_match(trimmed)
}

/// Large base64 content: a known binary signature, or sheer size.
///
/// `data:<mime>;base64,` URIs are judged by their payload.
pub fn looks_like_base64_blob(value: &str) -> bool {
    let mut candidate = value.trim();
    if candidate.starts_with("data:") {
        if let Some(idx) = candidate.find(";base64,") {
            candidate = &candidate[idx + ";base64,".len()..];
        }
    }

    let len = candidate.chars().count();
    if len < BASE64_MAGIC_MIN_LEN {
        return false;
    }
    if base64_ratio(candidate) < BASE64_MIN_RATIO {
        return false;
    }
    len >= BASE64_MIN_LEN || BINARY_MAGIC_PREFIXES.iter().any(|m| candidate.starts_with(m))
}

/// At least `HEX_MIN_LEN` characters, all hex digits.
pub fn is_hex_blob(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() >= HEX_MIN_LEN && trimmed.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Fraction of characters drawn from the standard or URL-safe base64 alphabet.
pub fn base64_ratio(value: &str) -> f64 {
    let mut total = 0usize;
    let mut in_alphabet = 0usize;
    for c in value.chars() {
        total += 1;
        if c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_') {
            in_alphabet += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    in_alphabet as f64 / total as f64
}

// ============================================================================
// URLs
// ============================================================================

/// Outcome of scrubbing a URL-bearing string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlScrub {
    /// Parsed as an absolute URL; sensitive query parameters removed and
    /// national IDs elsewhere in the URL masked.
    Scrubbed {
        value: String,
        removed_params: usize,
        masked_ids: bool,
    },
    /// Not an absolute URL; kept with national IDs masked.
    Preserved { value: String },
    /// Not an absolute URL and unparseable values are not preserved.
    Dropped,
}

/// Remove sensitive query parameters from an absolute URL.
///
/// A parameter is removed when its normalized name matches a sensitive marker
/// or its value contains a national ID. A query left without parameters is
/// removed entirely. National IDs left anywhere else (path, fragment, host,
/// parameter names) are masked in the rendered text. URLs without removals
/// keep their original spelling.
pub fn scrub_url(text: &str, sensitive: &MarkerSet, preserve_unparseable: bool) -> UrlScrub {
    let mut url = match Url::parse(text.trim()) {
        Ok(url) if !url.cannot_be_a_base() => url,
        _ => {
            return if preserve_unparseable {
                UrlScrub::Preserved {
                    value: mask_national_ids(text),
                }
            } else {
                UrlScrub::Dropped
            };
        }
    };

    let removed_params = remove_sensitive_params(&mut url, sensitive);
    let rendered = if removed_params == 0 {
        text.to_string()
    } else {
        url.to_string()
    };

    let value = mask_national_ids(&rendered);
    let masked_ids = value != rendered;
    UrlScrub::Scrubbed {
        value,
        removed_params,
        masked_ids,
    }
}

/// Drop flagged query pairs in place; returns how many were removed.
fn remove_sensitive_params(url: &mut Url, sensitive: &MarkerSet) -> usize {
    if url.query().is_none() {
        return 0;
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let total = pairs.len();
    let kept: Vec<(String, String)> = pairs
        .into_iter()
        .filter(|(name, value)| {
            !sensitive.matches_normalized(&normalize_field_name(name))
                && !contains_national_id(value)
        })
        .collect();
    let removed = total - kept.len();
    if removed == 0 {
        return 0;
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }
    removed
}
