//! Fuzz target for template compilation and substitution.
//!
//! Run with: cargo +nightly fuzz run compile_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pagewright_core::DataBag;
use pagewright_template::compile;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Malformed markup must come back as an error, never a panic.
    let Ok(template) = compile(input) else {
        return;
    };

    // With no data every placeholder resolves to nothing, so the output can
    // only shrink.
    let rendered = template.apply(&DataBag::default());
    assert!(rendered.len() <= input.len());

    // Compilation is deterministic.
    if let Ok(again) = compile(input) {
        assert_eq!(again.apply(&DataBag::default()), rendered);
    }
});
