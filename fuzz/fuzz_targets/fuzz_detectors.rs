//! Fuzz target for the content detectors.
//!
//! Detectors are total: no input may panic, and masking must keep length.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ps_sanitize::{
    mask_national_ids, normalize_field_name, scrub_url, MarkerSet, SecretDetector,
};

fuzz_target!(|data: &str| {
    let masked = mask_national_ids(data);
    assert_eq!(masked.chars().count(), data.chars().count());

    let normalized = normalize_field_name(data);
    assert_eq!(normalize_field_name(&normalized), normalized);

    let _ = SecretDetector::new().detect(data);

    let markers = MarkerSet::new(["token", "cpf", "senha"]);
    let _ = scrub_url(data, &markers, true);
    let _ = scrub_url(data, &markers, false);
});
