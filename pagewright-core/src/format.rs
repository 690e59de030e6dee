//! Display formatting applied while assembling data bags.
//!
//! Monetary amounts arrive as integer cents and phone numbers arrive in
//! whatever shape the business typed; neither reaches a template raw.

/// Format cents as a dollar string: `150000` → `"$1,500"`, `149999` →
/// `"$1,499.99"`. Whole amounts drop the decimals, everything else keeps two.
pub fn format_cents(cents: i64) -> String {
    let amount = format_cents_amount(cents.unsigned_abs());
    if cents < 0 {
        format!("-${}", amount)
    } else {
        format!("${}", amount)
    }
}

/// Format an unsigned cent amount without the currency symbol:
/// `150000` → `"1,500"`, `12345` → `"123.45"`.
pub fn format_cents_amount(cents: u64) -> String {
    let dollars = cents / 100;
    let remainder = cents % 100;
    let grouped = group_thousands(dollars);
    if remainder == 0 {
        grouped
    } else {
        format!("{}.{:02}", grouped, remainder)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Normalize a North American phone number to `(NNN) NNN-NNNN`.
///
/// Only digits are considered. An 11-digit number with a leading `1` drops
/// the country code. Anything that does not reduce to ten digits is returned
/// trimmed but otherwise untouched.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return raw.trim().to_string(),
    };
    format!(
        "({}) {}-{}",
        &national[0..3],
        &national[3..6],
        &national[6..10]
    )
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Formatting never leaves a raw integer: stripping separators and
        /// the symbol gives back the original major/minor units.
        #[test]
        fn prop_format_cents_round_trips(cents in 0u64..10_000_000_000u64) {
            let formatted = format_cents_amount(cents);
            let plain: String = formatted.chars().filter(|c| *c != ',').collect();
            let (dollars, minor) = match plain.split_once('.') {
                Some((d, m)) => (d.parse::<u64>().unwrap(), m.parse::<u64>().unwrap()),
                None => (plain.parse::<u64>().unwrap(), 0),
            };
            prop_assert_eq!(dollars * 100 + minor, cents);
            if let Some((_, m)) = plain.split_once('.') {
                prop_assert_eq!(m.len(), 2);
            }
        }

        /// Any ten digits normalize to the canonical 14-character shape.
        #[test]
        fn prop_ten_digit_phones_normalize(digits in "[0-9]{10}") {
            let normalized = normalize_phone(&digits);
            prop_assert_eq!(normalized.len(), 14);
            prop_assert!(normalized.starts_with('('));
            prop_assert_eq!(normalize_phone(&normalized), normalized);
        }
    }
}
