//! Sanitization and payload shaping for semi-structured business records.
//!
//! This crate turns arbitrarily shaped, partially untrusted records into a
//! privacy-safe, size-bounded tree before they are handed to an external
//! text-generation service or displayed.
//!
//! # Pipeline
//!
//! raw tree → keep/drop path filter → recursive sanitizer → byte budget
//!
//! - **Field-name normalization**: keys compare by a canonical form, so
//!   `CPF_Cliente` and `cpfCliente` both match the marker `cpf`.
//! - **Path patterns**: dot-and-bracket patterns with `[]` wildcards select
//!   subtrees to keep, drop or allow-list.
//! - **Detectors**: national IDs (CPF/CNPJ) are masked in place; PEM blocks,
//!   JWTs, base64/hex blobs and API tokens are replaced by markers; URL query
//!   parameters carrying secrets are removed.
//! - **Limits**: depth, sequence length and string length, with explicit
//!   accounting of what was cut.
//! - **Field encryption**: denied values can be sealed under an hourly or
//!   daily key instead of being deleted.
//! - **Fail-closed**: no error path emits an original value.
//!
//! # Example
//!
//! ```no_run
//! use ps_sanitize::{Node, Preset, Sanitizer};
//!
//! let mut policy = Preset::DeleteOnDeny.policy();
//! policy.allow_paths = vec!["mensagem".to_string()];
//! let sanitizer = Sanitizer::new(policy).unwrap();
//!
//! let input = Node::from_json_str(r#"{"mensagem":"CPF:14028002664"}"#).unwrap();
//! let output = sanitizer.sanitize(&input);
//! assert_eq!(output.into_value().to_json_string(), r#"{"mensagem":"CPF:***********"}"#);
//! ```

pub mod action;
pub mod budget;
pub mod detect;
pub mod encrypt;
pub mod error;
pub mod filter;
pub mod markers;
pub mod node;
pub mod normalize;
pub mod path;
pub mod policy;
pub mod preset;
pub mod sanitizer;
pub mod stats;
pub mod validate;

pub use action::{AllowListPrecedence, ArrayTruncation, DenyAction};
pub use budget::{enforce_budget, BudgetOutcome, BudgetReport, TRUNCATION_SUFFIX};
pub use detect::{contains_national_id, mask_national_ids, scrub_url, SecretDetector, SecretType, UrlScrub};
pub use encrypt::{window_label, FieldEncryptor, WindowKey};
pub use error::{Result, SanitizeError};
pub use filter::PathFilter;
pub use markers::{FieldKind, FieldMarkers, MarkerLists};
pub use node::{Mapping, Node, PathStep};
pub use normalize::{normalize_field_name, MarkerSet, NORMALIZATION_VERSION};
pub use path::{PathPattern, PathPatternSet};
pub use policy::{CryptoSettings, KdfParams, Limits, SanitizePolicy, WindowGranularity};
pub use preset::{Preset, PresetError};
pub use sanitizer::{SanitizeOutput, Sanitizer, ShapedPayload, DEPTH_LIMIT_MARKER};
pub use stats::SanitizeStats;
pub use validate::validate_policy;
