//! Fuzz target for the template scanner.
//!
//! Run with: cargo +nightly fuzz run scanner_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pagewright_template::{Scanner, Token};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let tokens = Scanner::new(input).tokenize();

    // Tokens tile the source exactly, in order, with no gaps.
    let mut cursor = 0;
    let mut previous_was_text = false;
    for token in &tokens {
        let (span, is_text) = match token {
            Token::Text(span) => (*span, true),
            Token::Tag(tag) => (tag.span, false),
        };
        assert_eq!(span.start, cursor, "gap or overlap at byte {}", cursor);
        assert!(span.start < span.end, "empty token at byte {}", cursor);
        assert!(!(is_text && previous_was_text), "adjacent text tokens not merged");
        cursor = span.end;
        previous_was_text = is_text;
    }
    assert_eq!(cursor, input.len());
});
