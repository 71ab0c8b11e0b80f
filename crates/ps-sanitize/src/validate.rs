//! Semantic validation of sanitize policies.
//!
//! Serde checks shape; this checks meaning. Every failure names the offending
//! field so a policy file can be fixed without reading code.

use crate::error::{Result, SanitizeError};
use crate::path::PathPatternSet;
use crate::policy::{SanitizePolicy, POLICY_SCHEMA_VERSION};

/// Smallest payload budget that can hold an empty container.
const MIN_PAYLOAD_BYTES: usize = 2;

/// Validate a policy semantically.
pub fn validate_policy(policy: &SanitizePolicy) -> Result<()> {
    if policy.schema_version != POLICY_SCHEMA_VERSION {
        return Err(SanitizeError::Policy(format!(
            "schema version mismatch: expected {}, got {}",
            POLICY_SCHEMA_VERSION, policy.schema_version
        )));
    }

    validate_limits(policy)?;

    PathPatternSet::compile_normalized(&policy.allow_paths)?;
    PathPatternSet::compile(&policy.keep_paths)?;
    PathPatternSet::compile(&policy.drop_paths)?;

    validate_crypto(policy)?;

    Ok(())
}

fn validate_limits(policy: &SanitizePolicy) -> Result<()> {
    let limits = &policy.limits;
    if limits.max_depth == 0 {
        return Err(SanitizeError::invalid("limits.max_depth", "must be at least 1"));
    }
    if limits.max_array_items == 0 {
        return Err(SanitizeError::invalid(
            "limits.max_array_items",
            "must be at least 1",
        ));
    }
    if limits.max_string_length == 0 {
        return Err(SanitizeError::invalid(
            "limits.max_string_length",
            "must be at least 1",
        ));
    }
    if limits.max_payload_bytes < MIN_PAYLOAD_BYTES {
        return Err(SanitizeError::invalid(
            "limits.max_payload_bytes",
            format!(
                "must be at least {}, got {}",
                MIN_PAYLOAD_BYTES, limits.max_payload_bytes
            ),
        ));
    }
    Ok(())
}

fn validate_crypto(policy: &SanitizePolicy) -> Result<()> {
    let crypto = &policy.crypto;

    if crypto.template.trim().is_empty() {
        return Err(SanitizeError::invalid("crypto.template", "must not be empty"));
    }
    if crypto.enabled && !crypto.template.contains("{ciphertext}") {
        return Err(SanitizeError::invalid(
            "crypto.template",
            "must contain {ciphertext} when encryption is enabled",
        ));
    }
    if crypto.context.is_empty() {
        return Err(SanitizeError::invalid("crypto.context", "must not be empty"));
    }
    if crypto.passphrase_env.is_empty() {
        return Err(SanitizeError::invalid(
            "crypto.passphrase_env",
            "must not be empty",
        ));
    }

    let kdf = &crypto.kdf;
    if kdf.iterations == 0 {
        return Err(SanitizeError::invalid("crypto.kdf.iterations", "must be at least 1"));
    }
    if kdf.parallelism == 0 {
        return Err(SanitizeError::invalid(
            "crypto.kdf.parallelism",
            "must be at least 1",
        ));
    }
    // Argon2 requires at least 8 KiB per lane
    let min_memory = kdf.parallelism.saturating_mul(8);
    if kdf.memory_kib < min_memory {
        return Err(SanitizeError::invalid(
            "crypto.kdf.memory_kib",
            format!("must be at least {} for parallelism {}", min_memory, kdf.parallelism),
        ));
    }
    // Upper bounds are argon2's own
    argon2::Params::new(kdf.memory_kib, kdf.iterations, kdf.parallelism, Some(32))
        .map_err(|e| SanitizeError::invalid("crypto.kdf", e.to_string()))?;

    Ok(())
}

impl SanitizePolicy {
    /// Validate this policy; see [`validate_policy`].
    pub fn validate(&self) -> Result<()> {
        validate_policy(self)
    }
}
