//! Sanitize policy configuration.
//!
//! A policy is pure data: limits, behavior flags, path lists, marker lists and
//! crypto settings. It is loaded from JSON, validated, and compiled into a
//! [`crate::Sanitizer`] once at startup.

use crate::action::{AllowListPrecedence, ArrayTruncation, DenyAction};
use crate::markers::MarkerLists;
use crate::preset::Preset;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Schema version for the policy file.
pub const POLICY_SCHEMA_VERSION: &str = "1.0.0";

/// Default output template for encrypted fields.
pub const DEFAULT_ENCRYPTION_TEMPLATE: &str = "{field}:ENC[v1|{window}|{nonce}|{ciphertext}]";

/// Default environment variable holding the encryption passphrase.
pub const DEFAULT_PASSPHRASE_ENV: &str = "PS_FIELD_KEY";

/// Sanitize policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizePolicy {
    /// Schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Numeric limits.
    #[serde(default)]
    pub limits: Limits,

    /// Remove base64/hex blobs instead of replacing them with a marker.
    #[serde(default)]
    pub remove_binary: bool,

    /// Keep URL-field values that do not parse as absolute URLs (ID-masked).
    #[serde(default = "default_true")]
    pub preserve_unparseable_urls: bool,

    /// Action for leaves that are not allow-listed.
    #[serde(default)]
    pub deny_action: DenyAction,

    /// Whether allow-listing overrides name and content heuristics.
    #[serde(default)]
    pub allow_list_precedence: AllowListPrecedence,

    /// Mask national IDs inside allow-listed values too.
    #[serde(default = "default_true")]
    pub mask_allow_listed: bool,

    /// How over-long sequences are shortened.
    #[serde(default)]
    pub array_truncation: ArrayTruncation,

    /// Check provider API token patterns (AWS, GitHub, Slack, ...).
    #[serde(default = "default_true")]
    pub detect_api_tokens: bool,

    /// Normalized-path patterns whose leaves are allow-listed.
    #[serde(default)]
    pub allow_paths: Vec<String>,

    /// Raw-path patterns; when non-empty only matching subtrees survive.
    #[serde(default)]
    pub keep_paths: Vec<String>,

    /// Raw-path patterns excised regardless of content.
    #[serde(default)]
    pub drop_paths: Vec<String>,

    /// Field-name marker lists.
    #[serde(default)]
    pub markers: MarkerLists,

    /// Field-level encryption settings.
    #[serde(default)]
    pub crypto: CryptoSettings,
}

fn default_schema_version() -> String {
    POLICY_SCHEMA_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

/// Numeric limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum tree depth; the root is depth 0.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum items kept per sequence.
    #[serde(default = "default_max_array_items")]
    pub max_array_items: usize,

    /// Maximum string length in characters before truncation.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,

    /// Byte ceiling for the serialized output.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

fn default_max_depth() -> usize {
    8
}

fn default_max_array_items() -> usize {
    50
}

fn default_max_string_length() -> usize {
    2000
}

fn default_max_payload_bytes() -> usize {
    64 * 1024
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_array_items: default_max_array_items(),
            max_string_length: default_max_string_length(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

/// Encryption window granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowGranularity {
    /// `YYYYMMDDHH` in UTC
    #[default]
    Hourly,
    /// `YYYYMMDD` in UTC
    Daily,
}

impl WindowGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowGranularity::Hourly => "hourly",
            WindowGranularity::Daily => "daily",
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Field-level encryption settings.
///
/// The passphrase itself is never part of the policy file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoSettings {
    /// Encrypt denied leaves; when false they become `<field>:REDACTED`.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub window: WindowGranularity,

    /// Output template with `{field}`, `{window}`, `{nonce}`, `{ciphertext}`.
    #[serde(default = "default_template")]
    pub template: String,

    /// Key derivation context, mixed into the salt.
    #[serde(default = "default_context")]
    pub context: String,

    /// Environment variable read when no passphrase is passed explicitly.
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,

    #[serde(default)]
    pub kdf: KdfParams,
}

fn default_template() -> String {
    DEFAULT_ENCRYPTION_TEMPLATE.to_string()
}

fn default_context() -> String {
    "default".to_string()
}

fn default_passphrase_env() -> String {
    DEFAULT_PASSPHRASE_ENV.to_string()
}

impl Default for CryptoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            window: WindowGranularity::default(),
            template: default_template(),
            context: default_context(),
            passphrase_env: default_passphrase_env(),
            kdf: KdfParams::default(),
        }
    }
}

impl CryptoSettings {
    /// Read the passphrase from the configured environment variable.
    ///
    /// Empty values count as missing.
    pub fn passphrase_from_env(&self) -> Option<String> {
        std::env::var(&self.passphrase_env)
            .ok()
            .filter(|p| !p.is_empty())
    }
}

impl SanitizePolicy {
    /// Create a new policy with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for a named preset.
    pub fn preset(preset: Preset) -> Self {
        preset.policy()
    }

    /// Load policy from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a policy from JSON text.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let policy: SanitizePolicy = serde_json::from_str(text)?;
        Ok(policy)
    }

    /// Save policy to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// SHA-256 hex digest of the compact JSON form, for audit metadata.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        hex::encode(Sha256::digest(json.as_bytes()))
    }
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Preset::default().policy()
    }
}
