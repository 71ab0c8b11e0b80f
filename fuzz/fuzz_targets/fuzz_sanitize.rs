//! Fuzz target for the recursive sanitizer and byte budget.
//!
//! Any JSON document must sanitize and shape under every preset without
//! panicking, with consistent counters and a truthful budget report.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ps_sanitize::{Node, Preset, Sanitizer};

fuzz_target!(|data: &str| {
    let Ok(node) = Node::from_json_str(data) else {
        return;
    };

    for preset in Preset::ALL {
        let mut policy = preset.policy();
        policy.crypto.enabled = false;
        policy.limits.max_payload_bytes = 256;
        let Ok(sanitizer) = Sanitizer::with_passphrase(policy, None) else {
            continue;
        };

        let shaped = sanitizer.shape(&node);
        assert!(shaped.stats.is_consistent());
        assert_eq!(shaped.budget.final_bytes, shaped.value.serialized_len());
        assert!(shaped.budget.exceeded || shaped.budget.final_bytes <= 256);
    }
});
