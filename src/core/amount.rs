//! Amount and installment extraction.
//!
//! Everything here expects text in the numeric profile
//! ([`crate::core::normalize::numeric_profile`]).
//!
//! Separator rule: when both `,` and `.` appear, whichever occurs last is the decimal
//! separator and the other is stripped. When only one kind appears it is a thousands
//! separator if it occurs more than once (`1.234.567`) and a decimal separator if it
//! occurs exactly once (`1.234` is one point two three four, `50,5` is fifty and a half).

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// A numeric token located in a message.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountToken {
    /// The token exactly as written
    pub raw: String,
    /// Parsed value (0 when the token is not a valid number)
    pub value: f64,
}

#[allow(clippy::expect_used)]
fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d(?:[\d.,]*\d)?").expect("invalid number regex"))
}

#[allow(clippy::expect_used)]
fn installment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:in\s+)?(\d{1,2})\s*(?:x\b|times\b|installments?\b)")
            .expect("invalid installment regex")
    })
}

/// Parses a numeric literal with mixed separators. Returns 0 for anything unparsable.
///
/// A non-positive result means "amount missing" to every caller.
#[must_use]
pub fn parse_amount(token: &str) -> f64 {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let canonical = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let (decimal, thousands) = if comma > dot { (',', '.') } else { ('.', ',') };
            cleaned.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => single_separator(&cleaned, ','),
        (None, Some(_)) => single_separator(&cleaned, '.'),
        (None, None) => cleaned,
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn single_separator(text: &str, sep: char) -> String {
    if text.matches(sep).count() > 1 {
        text.replace(sep, "")
    } else {
        text.replace(sep, ".")
    }
}

/// Finds the first number in the message that is not an installment count.
#[must_use]
pub fn find_amount(numeric_text: &str) -> Option<AmountToken> {
    let installment_spans: Vec<Range<usize>> = installment_re()
        .captures_iter(numeric_text)
        .filter_map(|caps| caps.get(1).map(|m| m.range()))
        .collect();

    number_re()
        .find_iter(numeric_text)
        .find(|m| {
            !installment_spans
                .iter()
                .any(|span| span.start < m.end() && m.start() < span.end)
        })
        .map(|m| AmountToken {
            raw: m.as_str().to_string(),
            value: parse_amount(m.as_str()),
        })
}

/// Number of installments requested ("in 3x", "3x", "3 times", "10 installments").
#[must_use]
pub fn find_installments(text: &str) -> Option<u32> {
    installment_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n >= 1)
}

/// Removes every installment phrase from keyword-profile text.
#[must_use]
pub fn strip_installments(text: &str) -> String {
    installment_re().replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_amount_is_separator_convention_invariant() {
        assert_eq!(parse_amount("1.234,56"), 1234.56);
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("50"), 50.0);
    }

    #[test]
    fn test_parse_amount_single_separator_rule() {
        assert_eq!(parse_amount("50,5"), 50.5);
        assert_eq!(parse_amount("1.234"), 1.234);
        assert_eq!(parse_amount("1.234.567"), 1_234_567.0);
        assert_eq!(parse_amount("1,234,567"), 1_234_567.0);
    }

    #[test]
    fn test_parse_amount_invalid_yields_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("1-2"), 0.0);
        assert_eq!(parse_amount(".,"), 0.0);
    }

    #[test]
    fn test_parse_amount_ignores_currency_symbols() {
        assert_eq!(parse_amount("r$1.500,00"), 1500.0);
    }

    #[test]
    fn test_find_amount_skips_installment_count() {
        let token = find_amount("bought a tv in 10x 2.500,00 on visa").unwrap();
        assert_eq!(token.raw, "2.500,00");
        assert_eq!(token.value, 2500.0);

        let token = find_amount("phone 1200 3 times").unwrap();
        assert_eq!(token.value, 1200.0);
    }

    #[test]
    fn test_find_amount_none_without_digits() {
        assert!(find_amount("lunch with friends").is_none());
    }

    #[test]
    fn test_find_installments_spellings() {
        assert_eq!(find_installments("tv 2500 in 10x"), Some(10));
        assert_eq!(find_installments("tv 2500 3x"), Some(3));
        assert_eq!(find_installments("sofa 900 in 4 times"), Some(4));
        assert_eq!(find_installments("sofa 900 in 6 installments"), Some(6));
        assert_eq!(find_installments("coffee 5"), None);
    }
}
