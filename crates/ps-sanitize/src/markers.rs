//! Field-name markers and field classification.
//!
//! A field is classified from its normalized name by substring containment
//! against three marker lists. The defaults target Portuguese and English
//! business records.

use crate::normalize::MarkerSet;
use serde::{Deserialize, Serialize};

/// Names that identify credentials or personal identifiers.
///
/// Short markers such as "rg" or "pin" are left out: by containment they
/// would match "cargo", "origem", "spinner" and many ordinary fields.
pub const DEFAULT_SENSITIVE_MARKERS: &[&str] = &[
    "senha",
    "password",
    "passwd",
    "secret",
    "segredo",
    "token",
    "apikey",
    "authorization",
    "cpf",
    "cnpj",
    "cartao",
    "cardnumber",
    "cvv",
    "privatekey",
    "credential",
];

/// Names that usually carry file or document content.
pub const DEFAULT_BINARY_MARKERS: &[&str] = &[
    "arquivo",
    "anexo",
    "base64",
    "blob",
    "binario",
    "binary",
    "conteudo",
    "documento",
    "pdf",
    "imagem",
    "image",
    "retorno",
    "payload",
    "file",
];

/// Names that usually carry URLs.
pub const DEFAULT_URL_MARKERS: &[&str] = &[
    "url", "uri", "link", "href", "endpoint", "callback", "redirect",
];

/// Raw marker lists as configured in a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerLists {
    #[serde(default = "default_sensitive")]
    pub sensitive: Vec<String>,

    #[serde(default = "default_binary")]
    pub binary: Vec<String>,

    #[serde(default = "default_url")]
    pub url: Vec<String>,
}

fn default_sensitive() -> Vec<String> {
    DEFAULT_SENSITIVE_MARKERS.iter().map(|s| s.to_string()).collect()
}

fn default_binary() -> Vec<String> {
    DEFAULT_BINARY_MARKERS.iter().map(|s| s.to_string()).collect()
}

fn default_url() -> Vec<String> {
    DEFAULT_URL_MARKERS.iter().map(|s| s.to_string()).collect()
}

impl Default for MarkerLists {
    fn default() -> Self {
        Self {
            sensitive: default_sensitive(),
            binary: default_binary(),
            url: default_url(),
        }
    }
}

/// Classification of a field by its normalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Credential or personal identifier; dropped without inspection
    Sensitive,
    /// Likely file content; dropped when the value is a large blob
    Binary,
    /// URL-bearing; query parameters are scrubbed
    Url,
    /// No marker matched
    Plain,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldKind::Sensitive => "sensitive",
            FieldKind::Binary => "binary",
            FieldKind::Url => "url",
            FieldKind::Plain => "plain",
        };
        write!(f, "{}", s)
    }
}

/// Compiled marker sets.
#[derive(Debug, Clone, Default)]
pub struct FieldMarkers {
    pub sensitive: MarkerSet,
    pub binary: MarkerSet,
    pub url: MarkerSet,
}

impl FieldMarkers {
    pub fn new(lists: &MarkerLists) -> Self {
        Self {
            sensitive: MarkerSet::new(&lists.sensitive),
            binary: MarkerSet::new(&lists.binary),
            url: MarkerSet::new(&lists.url),
        }
    }

    /// Classify an already-normalized field name.
    ///
    /// Sensitive wins over binary, binary over URL.
    pub fn classify(&self, normalized: &str) -> FieldKind {
        if self.sensitive.matches_normalized(normalized) {
            FieldKind::Sensitive
        } else if self.binary.matches_normalized(normalized) {
            FieldKind::Binary
        } else if self.url.matches_normalized(normalized) {
            FieldKind::Url
        } else {
            FieldKind::Plain
        }
    }

    pub fn is_url_field(&self, normalized: &str) -> bool {
        self.url.matches_normalized(normalized)
    }
}
