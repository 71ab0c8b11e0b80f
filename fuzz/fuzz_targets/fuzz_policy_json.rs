//! Fuzz target for sanitize policy parsing.
//!
//! Tests that JSON policy parsing and validation handle arbitrary input
//! without panicking, and that a validated policy always builds a sanitizer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ps_sanitize::{SanitizePolicy, Sanitizer};

fuzz_target!(|data: &[u8]| {
    let Ok(mut policy) = serde_json::from_slice::<SanitizePolicy>(data) else {
        return;
    };
    // Keep key derivation cheap and passphrase-free
    policy.crypto.enabled = false;
    if policy.validate().is_ok() {
        assert!(Sanitizer::with_passphrase(policy, None).is_ok());
    }
});
