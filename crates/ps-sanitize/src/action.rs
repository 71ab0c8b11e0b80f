//! Deny actions and allow-list precedence.

use serde::{Deserialize, Serialize};

/// Action applied to a leaf that is not allow-listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyAction {
    /// Remove the leaf from the output
    Delete,
    /// Replace with a windowed ciphertext (or `<field>:REDACTED`)
    Encrypt,
    /// Keep the ID-masked, whitespace-collapsed text
    Mask,
}

impl DenyAction {
    /// Parse an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "delete" | "drop" => Some(DenyAction::Delete),
            "encrypt" => Some(DenyAction::Encrypt),
            "mask" => Some(DenyAction::Mask),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DenyAction::Delete => "delete",
            DenyAction::Encrypt => "encrypt",
            DenyAction::Mask => "mask",
        }
    }

    /// Whether the original value can leave the process in any form.
    pub fn retains_content(&self) -> bool {
        matches!(self, DenyAction::Mask)
    }
}

impl std::fmt::Display for DenyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for DenyAction {
    fn default() -> Self {
        DenyAction::Delete // Fail-closed default
    }
}

/// How allow-listing interacts with name and content heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllowListPrecedence {
    /// Allow-listed leaves bypass marker-name drops and content detectors.
    Absolute,
    /// Marker names, binary blobs and secrets override allow-listing.
    #[default]
    HeuristicsFirst,
}

impl AllowListPrecedence {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowListPrecedence::Absolute => "absolute",
            AllowListPrecedence::HeuristicsFirst => "heuristics_first",
        }
    }
}

impl std::fmt::Display for AllowListPrecedence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an over-long sequence is shortened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArrayTruncation {
    /// Wrap kept items with `{"meta": {...}, "items": [...]}`.
    #[default]
    WithMetadata,
    /// Keep the first items with no marker.
    Slice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deny_action() {
        assert_eq!(DenyAction::parse("delete"), Some(DenyAction::Delete));
        assert_eq!(DenyAction::parse("DROP"), Some(DenyAction::Delete));
        assert_eq!(DenyAction::parse("encrypt"), Some(DenyAction::Encrypt));
        assert_eq!(DenyAction::parse("mask"), Some(DenyAction::Mask));
        assert_eq!(DenyAction::parse("hash"), None);
    }

    #[test]
    fn test_default_is_fail_closed() {
        assert_eq!(DenyAction::default(), DenyAction::Delete);
        assert!(!DenyAction::default().retains_content());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&AllowListPrecedence::HeuristicsFirst).unwrap(),
            "\"heuristics_first\""
        );
        assert_eq!(
            serde_json::to_string(&ArrayTruncation::WithMetadata).unwrap(),
            "\"with_metadata\""
        );
        let action: DenyAction = serde_json::from_str("\"encrypt\"").unwrap();
        assert_eq!(action, DenyAction::Encrypt);
    }
}
