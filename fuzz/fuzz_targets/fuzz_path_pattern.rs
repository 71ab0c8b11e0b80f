//! Fuzz target for path pattern compilation and matching.
//!
//! Arbitrary patterns either fail to compile with an error or produce a
//! matcher that answers for arbitrary paths without panicking.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ps_sanitize::PathPattern;

#[derive(Arbitrary, Debug)]
struct Input {
    pattern: String,
    path: String,
    normalized: bool,
}

fuzz_target!(|input: Input| {
    let compiled = if input.normalized {
        PathPattern::compile_normalized(&input.pattern)
    } else {
        PathPattern::compile(&input.pattern)
    };
    let Ok(pattern) = compiled else {
        return;
    };

    let whole = pattern.matches(&input.path);
    let prefix = pattern.matches_prefix_of(&input.path);
    // A whole-path match is also a prefix match
    assert!(!whole || prefix);
});
