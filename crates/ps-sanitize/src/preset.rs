//! Named policy presets.
//!
//! The pipeline grew three call-site variants with subtly different rules.
//! Each is kept as a preset so callers pick one explicitly:
//! - AllowEncrypt: allow-list is absolute, denied leaves are encrypted
//! - DeleteOnDeny: heuristics override the allow-list, denied leaves removed
//! - NoiseStrip: heuristics first, denied leaves kept as masked text

use crate::action::{AllowListPrecedence, ArrayTruncation, DenyAction};
use crate::policy::SanitizePolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available policy presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Allow-list wins; everything else is encrypted under a windowed key
    AllowEncrypt,
    /// Marker names and detectors win; everything not allowed is removed
    #[default]
    DeleteOnDeny,
    /// Marker names and detectors win; remaining text kept, IDs masked
    NoiseStrip,
}

impl Preset {
    /// All available presets.
    pub const ALL: &'static [Preset] = &[
        Preset::AllowEncrypt,
        Preset::DeleteOnDeny,
        Preset::NoiseStrip,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::AllowEncrypt => "allow-encrypt",
            Preset::DeleteOnDeny => "delete-on-deny",
            Preset::NoiseStrip => "noise-strip",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<Preset> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "allow-encrypt" | "encrypt" => Some(Preset::AllowEncrypt),
            "delete-on-deny" | "delete" | "strict" => Some(Preset::DeleteOnDeny),
            "noise-strip" | "noise" | "mask" => Some(Preset::NoiseStrip),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            Preset::AllowEncrypt => {
                "Allow-list is absolute, denied leaves encrypted, truncation carries metadata"
            }
            Preset::DeleteOnDeny => {
                "Heuristics override the allow-list, denied leaves removed (default)"
            }
            Preset::NoiseStrip => {
                "Heuristics first, denied text kept with IDs masked, blobs removed, silent slicing"
            }
        }
    }

    /// Build the policy for this preset.
    pub fn policy(&self) -> SanitizePolicy {
        match self {
            Preset::AllowEncrypt => allow_encrypt_preset(),
            Preset::DeleteOnDeny => delete_on_deny_preset(),
            Preset::NoiseStrip => noise_strip_preset(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Preset {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    Preset::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Base policy shared by all presets: every field at its serde default.
fn base_policy() -> SanitizePolicy {
    SanitizePolicy {
        schema_version: crate::policy::POLICY_SCHEMA_VERSION.to_string(),
        limits: Default::default(),
        remove_binary: false,
        preserve_unparseable_urls: true,
        deny_action: DenyAction::Delete,
        allow_list_precedence: AllowListPrecedence::HeuristicsFirst,
        mask_allow_listed: true,
        array_truncation: ArrayTruncation::WithMetadata,
        detect_api_tokens: true,
        allow_paths: Vec::new(),
        keep_paths: Vec::new(),
        drop_paths: Vec::new(),
        markers: Default::default(),
        crypto: Default::default(),
    }
}

/// AllowEncrypt preset.
///
/// Characteristics:
/// - Allow-listed leaves bypass name and content heuristics
/// - Allow-listed values are not ID-masked
/// - Denied leaves become windowed ciphertext
fn allow_encrypt_preset() -> SanitizePolicy {
    let mut policy = base_policy();
    policy.deny_action = DenyAction::Encrypt;
    policy.allow_list_precedence = AllowListPrecedence::Absolute;
    policy.mask_allow_listed = false;
    policy.crypto.enabled = true;
    policy
}

/// DeleteOnDeny preset: the serde defaults.
fn delete_on_deny_preset() -> SanitizePolicy {
    base_policy()
}

/// NoiseStrip preset.
///
/// Characteristics:
/// - Text survives with IDs masked and whitespace collapsed
/// - Binary blobs are removed rather than marked
/// - Sequences are sliced without metadata
fn noise_strip_preset() -> SanitizePolicy {
    let mut policy = base_policy();
    policy.deny_action = DenyAction::Mask;
    policy.remove_binary = true;
    policy.array_truncation = ArrayTruncation::Slice;
    policy
}
