//! Price extraction from free-form model output.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Tried in order: a bare number, the first decimal, the first integer.
static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^(\d+\.?\d*)$", r"(\d+\.\d+)", r"(\d+)"]
        .into_iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Pull a price out of `text`, ignoring currency symbols and surrounding words.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£'))
        .collect();
    let cleaned = cleaned.trim();

    PRICE_PATTERNS.iter().find_map(|re| {
        re.captures(cleaned)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|p| p.is_finite())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number() {
        assert_eq!(parse_price("1.85"), Some(1.85));
        assert_eq!(parse_price("  2\n"), Some(2.0));
    }

    #[test]
    fn currency_symbols_are_stripped() {
        assert_eq!(parse_price("$1.72"), Some(1.72));
        assert_eq!(parse_price("1.90€"), Some(1.90));
        assert_eq!(parse_price("£ 1.55"), Some(1.55));
    }

    #[test]
    fn first_decimal_in_sentence() {
        assert_eq!(
            parse_price("Given 3 periods of undercutting, I will set 1.79 this round."),
            Some(1.79)
        );
    }

    #[test]
    fn integer_when_no_decimal() {
        assert_eq!(parse_price("I choose 2 dollars"), Some(2.0));
    }

    #[test]
    fn no_number_is_none() {
        assert_eq!(parse_price("I would rather not say."), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn out_of_range_values_are_still_returned() {
        // Bounds are enforced by the orchestrator, not the parser.
        assert_eq!(parse_price("5.00"), Some(5.0));
    }
}
