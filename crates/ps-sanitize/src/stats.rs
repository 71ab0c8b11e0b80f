//! Per-call accounting of what the sanitizer altered.

use serde::{Deserialize, Serialize};

/// Counters for one sanitize call.
///
/// Leaf categories are incremented at most once per leaf, so each of them is
/// bounded by `total_leaves`. `arrays_truncated`, `dropped_paths` and
/// `pruned_by_keep` count container nodes and are not bounded that way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeStats {
    /// Leaves seen (scalars, depth placeholders, marker-dropped fields).
    pub total_leaves: u64,
    /// Leaves emitted because they were allow-listed.
    pub allowed: u64,
    /// Fields dropped because the name matched a sensitive marker.
    pub sensitive_name: u64,
    /// Binary blobs dropped or replaced.
    pub binary: u64,
    /// PEM, JWT and API tokens replaced.
    pub secret: u64,
    /// Leaves whose national IDs were masked.
    pub national_id: u64,
    /// URLs that lost at least one query parameter.
    pub url_scrubbed: u64,
    /// URL fields dropped because they did not parse.
    pub url_dropped: u64,
    /// Leaves removed by the delete deny action.
    pub deleted: u64,
    /// Leaves replaced by ciphertext or the redacted placeholder.
    pub encrypted: u64,
    /// Leaves whose encryption failed and fell back to the placeholder.
    pub encryption_failed: u64,
    /// Strings cut to the maximum length.
    pub strings_truncated: u64,
    /// Nodes replaced by the depth placeholder.
    pub depth_limited: u64,
    /// Sequences shortened to the maximum item count.
    pub arrays_truncated: u64,
    /// Nodes excised by drop patterns.
    pub dropped_paths: u64,
    /// Nodes excised because no keep pattern reached them.
    pub pruned_by_keep: u64,
}

impl SanitizeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaves whose content was removed or replaced.
    pub fn redacted_total(&self) -> u64 {
        self.sensitive_name
            + self.binary
            + self.secret
            + self.url_dropped
            + self.deleted
            + self.encrypted
    }

    /// Add another call's counters to this one.
    pub fn merge(&mut self, other: &SanitizeStats) {
        self.total_leaves += other.total_leaves;
        self.allowed += other.allowed;
        self.sensitive_name += other.sensitive_name;
        self.binary += other.binary;
        self.secret += other.secret;
        self.national_id += other.national_id;
        self.url_scrubbed += other.url_scrubbed;
        self.url_dropped += other.url_dropped;
        self.deleted += other.deleted;
        self.encrypted += other.encrypted;
        self.encryption_failed += other.encryption_failed;
        self.strings_truncated += other.strings_truncated;
        self.depth_limited += other.depth_limited;
        self.arrays_truncated += other.arrays_truncated;
        self.dropped_paths += other.dropped_paths;
        self.pruned_by_keep += other.pruned_by_keep;
    }

    /// Whether every leaf category is bounded by `total_leaves`.
    pub fn is_consistent(&self) -> bool {
        [
            self.allowed,
            self.sensitive_name,
            self.binary,
            self.secret,
            self.national_id,
            self.url_scrubbed,
            self.url_dropped,
            self.deleted,
            self.encrypted,
            self.encryption_failed,
            self.strings_truncated,
            self.depth_limited,
        ]
        .iter()
        .all(|&count| count <= self.total_leaves)
            && self.encryption_failed <= self.encrypted
    }

    /// Whether the call changed nothing.
    pub fn is_clean(&self) -> bool {
        self.redacted_total() == 0
            && self.national_id == 0
            && self.url_scrubbed == 0
            && self.strings_truncated == 0
            && self.depth_limited == 0
            && self.arrays_truncated == 0
            && self.dropped_paths == 0
            && self.pruned_by_keep == 0
    }
}
