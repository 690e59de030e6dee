//! Fuzz target for behavior-script injection.
//!
//! Run with: cargo +nightly fuzz run inject_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pagewright_template::{inject_behavior_script, BEHAVIOR_MARKER};

fuzz_target!(|data: &[u8]| {
    let Ok(document) = std::str::from_utf8(data) else {
        return;
    };

    let once = inject_behavior_script(document);
    assert!(once.contains(BEHAVIOR_MARKER));

    // Injection is idempotent.
    assert_eq!(inject_behavior_script(&once), once);
});
