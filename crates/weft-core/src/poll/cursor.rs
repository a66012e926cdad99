//! Ordering-key comparison.
//!
//! Sources report records under opaque string keys. Most real sources use
//! decimal sequence ids (snowflakes, auto-increments) whose lexicographic
//! order breaks across magnitudes ("99" > "100" as strings), so all-digit
//! keys compare numerically. Mixed or non-numeric keys fall back to plain
//! lexicographic order.

use std::cmp::Ordering;

/// Total order over ordering keys.
///
/// Both keys all decimal digits: numeric comparison, safe for keys longer
/// than any integer type (leading zeros stripped, then magnitude by length,
/// then digit order). Otherwise: byte-wise lexicographic.
pub fn compare_ordering_keys(a: &str, b: &str) -> Ordering {
    if is_decimal(a) && is_decimal(b) {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// Whether `key` sorts strictly after the stored cursor. An empty cursor
/// (bootstrap) never admits anything here; bootstrap eligibility is decided
/// by timestamp instead.
pub fn is_after_cursor(key: &str, cursor: &str) -> bool {
    !cursor.is_empty() && compare_ordering_keys(key, cursor) == Ordering::Greater
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_crosses_magnitude() {
        // The case plain string order gets backwards.
        assert_eq!(compare_ordering_keys("99", "100"), Ordering::Less);
        assert_eq!(compare_ordering_keys("100", "99"), Ordering::Greater);
    }

    #[test]
    fn test_numeric_same_length() {
        assert_eq!(compare_ordering_keys("123", "124"), Ordering::Less);
        assert_eq!(compare_ordering_keys("124", "124"), Ordering::Equal);
    }

    #[test]
    fn test_leading_zeros_are_insignificant() {
        assert_eq!(compare_ordering_keys("007", "7"), Ordering::Equal);
        assert_eq!(compare_ordering_keys("0099", "100"), Ordering::Less);
        assert_eq!(compare_ordering_keys("000", "0"), Ordering::Equal);
    }

    #[test]
    fn test_longer_than_u64() {
        let small = "18446744073709551615"; // u64::MAX
        let big = "18446744073709551616";
        assert_eq!(compare_ordering_keys(small, big), Ordering::Less);
    }

    #[test]
    fn test_non_numeric_falls_back_to_lexicographic() {
        assert_eq!(compare_ordering_keys("abc", "abd"), Ordering::Less);
        // One numeric, one not: lexicographic for both.
        assert_eq!(compare_ordering_keys("100", "2x"), Ordering::Less);
    }

    #[test]
    fn test_is_after_cursor() {
        assert!(is_after_cursor("100", "99"));
        assert!(!is_after_cursor("99", "100"));
        assert!(!is_after_cursor("99", "99"));
        // Empty cursor means bootstrap; timestamp filtering applies instead.
        assert!(!is_after_cursor("1", ""));
    }
}
