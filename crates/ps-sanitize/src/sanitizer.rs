//! Recursive sanitizer.
//!
//! The [`Sanitizer`] is compiled once from a [`SanitizePolicy`] and shared by
//! reference. Each call walks the tree node by node, producing a new tree and
//! a [`SanitizeStats`] record; the input is never mutated.
//!
//! Removed values are `None`. A mapping or sequence whose children were all
//! removed is removed too, up to the root.

use crate::action::{AllowListPrecedence, ArrayTruncation, DenyAction};
use crate::budget::{enforce_budget, truncate_chars, BudgetReport};
use crate::detect::{
    collapse_interior_spaces, looks_like_base64_blob, mask_national_ids, scrub_url,
    SecretDetector, UrlScrub, MASK_CHAR,
};
use crate::encrypt::{redacted_placeholder, FieldEncryptor, WindowKey};
use crate::error::Result;
use crate::filter::PathFilter;
use crate::markers::FieldMarkers;
use crate::node::{child_index_path, child_key_path, Mapping, Node};
use crate::normalize::normalize_field_name;
use crate::path::PathPatternSet;
use crate::policy::SanitizePolicy;
use crate::stats::SanitizeStats;
use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use serde_json::Number;
use tracing::{debug, warn};

/// Placeholder for nodes deeper than the configured maximum.
pub const DEPTH_LIMIT_MARKER: &str = "[DEPTH_LIMIT]";

/// Nested JSON-in-string re-parse attempts allowed along one path.
pub const MAX_JSON_REPARSE: u8 = 2;

/// Field label used for the root when no name is given.
const ROOT_FIELD: &str = "value";

/// Result of one sanitize call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizeOutput {
    /// Sanitized tree; `None` when everything was removed.
    pub value: Option<Node>,
    pub stats: SanitizeStats,
    #[serde(skip)]
    empty: Node,
}

impl SanitizeOutput {
    /// Whether the whole input was removed.
    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }

    /// The sanitized tree, with an absent root rendered as an empty container
    /// of the input's kind (`{}` or `[]`), or `null` for scalars.
    pub fn into_value(self) -> Node {
        self.value.unwrap_or(self.empty)
    }
}

/// Sanitized and budgeted payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedPayload {
    pub value: Node,
    pub stats: SanitizeStats,
    pub budget: BudgetReport,
}

/// Compiled sanitizer.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    policy: SanitizePolicy,
    allow: PathPatternSet,
    filter: PathFilter,
    markers: FieldMarkers,
    detector: SecretDetector,
    encryptor: FieldEncryptor,
    fingerprint: String,
}

impl Sanitizer {
    /// Build a sanitizer, reading the passphrase from the policy's env var
    /// when encryption is enabled.
    pub fn new(policy: SanitizePolicy) -> Result<Self> {
        let passphrase = policy.crypto.passphrase_from_env();
        Self::with_passphrase(policy, passphrase)
    }

    /// Build a sanitizer with an explicit passphrase.
    pub fn with_passphrase(policy: SanitizePolicy, passphrase: Option<String>) -> Result<Self> {
        policy.validate()?;

        let allow = PathPatternSet::compile_normalized(&policy.allow_paths)?;
        let filter = PathFilter::new(
            PathPatternSet::compile(&policy.keep_paths)?,
            PathPatternSet::compile(&policy.drop_paths)?,
        );
        let markers = FieldMarkers::new(&policy.markers);
        let detector = SecretDetector::new().with_api_tokens(policy.detect_api_tokens);
        let encryptor = FieldEncryptor::new(&policy.crypto, passphrase)?;
        let fingerprint = policy.fingerprint();

        debug!(
            allow = allow.len(),
            keep = policy.keep_paths.len(),
            drop = policy.drop_paths.len(),
            deny = %policy.deny_action,
            precedence = %policy.allow_list_precedence,
            encryption = encryptor.is_enabled(),
            fingerprint = %fingerprint,
            "sanitizer compiled"
        );

        Ok(Self {
            policy,
            allow,
            filter,
            markers,
            detector,
            encryptor,
            fingerprint,
        })
    }

    pub fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    /// SHA-256 fingerprint of the policy this sanitizer was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn encryptor(&self) -> &FieldEncryptor {
        &self.encryptor
    }

    /// Sanitize a tree using the current time for the encryption window.
    pub fn sanitize(&self, node: &Node) -> SanitizeOutput {
        self.sanitize_at(node, Utc::now())
    }

    /// Sanitize a tree with an explicit encryption-window instant.
    pub fn sanitize_at(&self, node: &Node, at: DateTime<Utc>) -> SanitizeOutput {
        self.sanitize_field_at(node, "", at)
    }

    /// Sanitize a value that belongs to a named field.
    ///
    /// The name drives marker and URL classification of a scalar root.
    pub fn sanitize_field(&self, node: &Node, field_name: &str) -> SanitizeOutput {
        self.sanitize_field_at(node, field_name, Utc::now())
    }

    fn sanitize_field_at(&self, node: &Node, field_name: &str, at: DateTime<Utc>) -> SanitizeOutput {
        let mut walk = Walk {
            sanitizer: self,
            stats: SanitizeStats::default(),
            at,
            window_key: OnceCell::new(),
        };

        let value = match self.filter.apply(node, &mut walk.stats) {
            Some(filtered) => {
                let field = Field::new(field_name);
                walk.node(&filtered, &field, "", 0, MAX_JSON_REPARSE)
            }
            None => None,
        };

        let stats = walk.stats;
        debug!(
            leaves = stats.total_leaves,
            allowed = stats.allowed,
            redacted = stats.redacted_total(),
            national_id = stats.national_id,
            truncated_strings = stats.strings_truncated,
            truncated_arrays = stats.arrays_truncated,
            depth_limited = stats.depth_limited,
            absent = value.is_none(),
            "sanitize complete"
        );

        SanitizeOutput {
            value,
            stats,
            empty: node.empty_like(),
        }
    }

    /// Sanitize, then fit the result into the policy's byte budget.
    pub fn shape(&self, node: &Node) -> ShapedPayload {
        self.shape_at(node, Utc::now())
    }

    pub fn shape_at(&self, node: &Node, at: DateTime<Utc>) -> ShapedPayload {
        let output = self.sanitize_at(node, at);
        let stats = output.stats.clone();
        let budgeted = enforce_budget(&output.into_value(), self.policy.limits.max_payload_bytes);
        ShapedPayload {
            value: budgeted.value,
            stats,
            budget: budgeted.report,
        }
    }

    fn is_allow_listed(&self, path: &str) -> bool {
        !path.is_empty() && self.allow.matches_prefix_of(path)
    }
}

/// Raw and normalized name of the field a value belongs to.
struct Field<'a> {
    raw: &'a str,
    normalized: String,
}

impl<'a> Field<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            normalized: normalize_field_name(raw),
        }
    }

    fn label(&self) -> &str {
        if self.raw.is_empty() {
            ROOT_FIELD
        } else {
            self.raw
        }
    }
}

/// Allow-list verdict for one leaf.
#[derive(Clone, Copy)]
struct Verdict {
    allow_listed: bool,
    /// Allow-listed under absolute precedence: heuristics are skipped.
    absolute: bool,
    /// ID masking is skipped for this leaf.
    skip_masking: bool,
}

/// State for one sanitize call.
struct Walk<'s> {
    sanitizer: &'s Sanitizer,
    stats: SanitizeStats,
    at: DateTime<Utc>,
    window_key: OnceCell<Option<WindowKey>>,
}

impl<'s> Walk<'s> {
    fn policy(&self) -> &'s SanitizePolicy {
        &self.sanitizer.policy
    }

    fn verdict(&self, path: &str) -> Verdict {
        let policy = self.policy();
        let allow_listed = self.sanitizer.is_allow_listed(path);
        Verdict {
            allow_listed,
            absolute: allow_listed
                && policy.allow_list_precedence == AllowListPrecedence::Absolute,
            skip_masking: allow_listed && !policy.mask_allow_listed,
        }
    }

    /// `path` is the normalized path used for allow-list matching.
    fn node(
        &mut self,
        node: &Node,
        field: &Field<'_>,
        path: &str,
        depth: usize,
        reparse_left: u8,
    ) -> Option<Node> {
        if depth > self.policy().limits.max_depth {
            self.stats.total_leaves += 1;
            self.stats.depth_limited += 1;
            return Some(Node::string(DEPTH_LIMIT_MARKER));
        }

        match node {
            Node::Null => Some(Node::Null),
            Node::Mapping(map) => self.mapping(map, path, depth, reparse_left),
            Node::Sequence(items) => self.sequence(items, field, path, depth, reparse_left),
            Node::String(text) => self.string(text, field, path, depth, reparse_left),
            Node::Bool(_) | Node::Number(_) => self.scalar(node, field, path),
        }
    }

    fn mapping(&mut self, map: &Mapping, path: &str, depth: usize, reparse_left: u8) -> Option<Node> {
        let sanitizer = self.sanitizer;
        let markers = &sanitizer.markers;
        let mut out = Mapping::with_capacity(map.len());

        for (key, value) in map {
            let field = Field::new(key);
            let child_path = child_key_path(path, &field.normalized);
            let absolute = self.verdict(&child_path).absolute;

            if !absolute && markers.sensitive.matches_normalized(&field.normalized) {
                self.stats.total_leaves += 1;
                self.stats.sensitive_name += 1;
                continue;
            }
            if !absolute
                && markers.binary.matches_normalized(&field.normalized)
                && value.as_str().is_some_and(looks_like_base64_blob)
            {
                self.stats.total_leaves += 1;
                self.stats.binary += 1;
                continue;
            }

            if let Some(child) = self.node(value, &field, &child_path, depth + 1, reparse_left) {
                out.insert(key.clone(), child);
            }
        }

        if out.is_empty() {
            None
        } else {
            Some(Node::Mapping(out))
        }
    }

    fn sequence(
        &mut self,
        items: &[Node],
        field: &Field<'_>,
        path: &str,
        depth: usize,
        reparse_left: u8,
    ) -> Option<Node> {
        let max_items = self.policy().limits.max_array_items;
        let mut kept = Vec::with_capacity(items.len().min(max_items));
        let mut truncated = false;

        for (idx, item) in items.iter().enumerate() {
            if kept.len() >= max_items {
                truncated = true;
                break;
            }
            let child_path = child_index_path(path, idx);
            if let Some(child) = self.node(item, field, &child_path, depth + 1, reparse_left) {
                kept.push(child);
            }
        }

        if truncated {
            self.stats.arrays_truncated += 1;
            if self.policy().array_truncation == ArrayTruncation::WithMetadata {
                return Some(truncation_wrapper(items.len(), kept));
            }
        }

        if kept.is_empty() {
            None
        } else {
            Some(Node::Sequence(kept))
        }
    }

    fn string(
        &mut self,
        text: &str,
        field: &Field<'_>,
        path: &str,
        depth: usize,
        reparse_left: u8,
    ) -> Option<Node> {
        let verdict = self.verdict(path);
        let policy = self.policy();

        if reparse_left > 0 && !verdict.absolute {
            if let Some(parsed) = parse_embedded_json(text) {
                return match parsed {
                    Node::String(inner) => self.string(&inner, field, path, depth, reparse_left - 1),
                    container => self
                        .node(&container, field, path, depth, reparse_left - 1)
                        .map(|sanitized| Node::String(sanitized.to_json_string())),
                };
            }
        }

        self.stats.total_leaves += 1;

        if !verdict.absolute {
            if let Some(kind) = self.sanitizer.detector.detect(text) {
                if kind.is_binary() {
                    self.stats.binary += 1;
                    if policy.remove_binary {
                        return None;
                    }
                } else {
                    self.stats.secret += 1;
                }
                if !verdict.allow_listed && policy.deny_action == DenyAction::Delete {
                    return None;
                }
                return Some(Node::string(kind.marker()));
            }
        }

        let mut masked_ids = false;
        let mut scrubbed_url = false;
        let processed = if verdict.skip_masking {
            text.to_string()
        } else if !verdict.absolute && self.sanitizer.markers.is_url_field(&field.normalized) {
            match scrub_url(
                text,
                &self.sanitizer.markers.sensitive,
                policy.preserve_unparseable_urls,
            ) {
                UrlScrub::Scrubbed {
                    value,
                    removed_params,
                    masked_ids: masked,
                } => {
                    scrubbed_url = removed_params > 0;
                    masked_ids = masked;
                    value
                }
                UrlScrub::Preserved { value } => {
                    masked_ids = value != text;
                    value
                }
                UrlScrub::Dropped => {
                    self.stats.url_dropped += 1;
                    return None;
                }
            }
        } else {
            let masked = mask_national_ids(text);
            masked_ids = masked != text;
            collapse_interior_spaces(&masked)
        };

        if !verdict.allow_listed {
            match policy.deny_action {
                DenyAction::Delete => {
                    self.stats.deleted += 1;
                    return None;
                }
                DenyAction::Encrypt => {
                    let sealed = self.encrypt_leaf(field, text);
                    return Some(Node::String(sealed));
                }
                DenyAction::Mask => {}
            }
        } else {
            self.stats.allowed += 1;
        }

        if masked_ids {
            self.stats.national_id += 1;
        }
        if scrubbed_url {
            self.stats.url_scrubbed += 1;
        }

        match truncate_chars(&processed, policy.limits.max_string_length) {
            Some(cut) => {
                self.stats.strings_truncated += 1;
                Some(Node::String(cut))
            }
            None => Some(Node::String(processed)),
        }
    }

    fn scalar(&mut self, node: &Node, field: &Field<'_>, path: &str) -> Option<Node> {
        self.stats.total_leaves += 1;
        let verdict = self.verdict(path);

        let masked = match node {
            Node::Number(n) if !verdict.skip_masking => mask_id_number(n),
            _ => None,
        };

        if !verdict.allow_listed {
            match self.policy().deny_action {
                DenyAction::Delete => {
                    self.stats.deleted += 1;
                    return None;
                }
                DenyAction::Encrypt => {
                    let sealed = self.encrypt_leaf(field, &node.to_json_string());
                    return Some(Node::String(sealed));
                }
                DenyAction::Mask => {}
            }
        } else {
            self.stats.allowed += 1;
        }

        match masked {
            Some(masked) => {
                self.stats.national_id += 1;
                Some(Node::String(masked))
            }
            None => Some(node.clone()),
        }
    }

    /// Encrypt the original value of a denied leaf; fails closed.
    fn encrypt_leaf(&mut self, field: &Field<'_>, plaintext: &str) -> String {
        self.stats.encrypted += 1;
        let label = field.label();
        let sanitizer = self.sanitizer;
        let encryptor = &sanitizer.encryptor;
        if !encryptor.is_enabled() {
            return redacted_placeholder(label);
        }

        let at = self.at;
        let key = self.window_key.get_or_init(|| match encryptor.window_key(at) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "window key derivation failed; denied leaves will be redacted");
                None
            }
        });

        let sealed = match key {
            Some(key) => key.seal(label, plaintext),
            None => {
                self.stats.encryption_failed += 1;
                return redacted_placeholder(label);
            }
        };
        match sealed {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, field = label, "leaf encryption failed");
                self.stats.encryption_failed += 1;
                redacted_placeholder(label)
            }
        }
    }
}

/// Parse JSON-looking text: an object, an array, or a stringified string.
fn parse_embedded_json(text: &str) -> Option<Node> {
    let trimmed = text.trim();
    let looks_like_json = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"'));
    if !looks_like_json {
        return None;
    }
    Node::from_json_str(trimmed).ok()
}

/// Mask a non-negative integer whose digits form an 11- or 14-digit ID.
fn mask_id_number(n: &Number) -> Option<String> {
    let digits = n.as_u64()?.to_string();
    if digits.len() == 11 || digits.len() == 14 {
        Some(std::iter::repeat(MASK_CHAR).take(digits.len()).collect())
    } else {
        None
    }
}

fn truncation_wrapper(original_length: usize, kept: Vec<Node>) -> Node {
    let mut meta = Mapping::new();
    meta.insert("arrayTruncated".to_string(), Node::Bool(true));
    meta.insert("originalLength".to_string(), Node::from(original_length as u64));
    meta.insert("kept".to_string(), Node::from(kept.len() as u64));

    let mut wrapper = Mapping::new();
    wrapper.insert("meta".to_string(), Node::Mapping(meta));
    wrapper.insert("items".to_string(), Node::Sequence(kept));
    Node::Mapping(wrapper)
}
