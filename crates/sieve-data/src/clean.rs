//! Cell-level cleaning of price and date labels.
//!
//! Price cells arrive formatted for humans (`"$1,234.50"`), and date labels are
//! whatever the spreadsheet export produced. Neither failure is an error: an
//! unparseable price is missing, and an unparseable label is not a price column.

use chrono::{NaiveDate, NaiveDateTime};

/// Accepted date label formats, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y"];

/// Accepted datetime label formats; the time component is discarded.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Tokens that denote an explicitly missing value.
const MISSING_TOKENS: [&str; 7] = ["na", "n/a", "nan", "null", "none", "-", "#n/a"];

/// Returns true for characters that are pure formatting inside a number.
const fn is_formatting(c: char) -> bool {
    matches!(c, '$' | ',' | '€' | '£' | '¥' | '_' | '\'')
}

/// Parse a formatted numeric cell into a finite float.
///
/// Currency symbols, thousands separators and whitespace are stripped first.
/// Returns `None` for empty cells, missing tokens and anything unparseable.
///
/// # Examples
///
/// ```
/// use sieve_data::clean::parse_number;
///
/// assert_eq!(parse_number("$1,234.50"), Some(1234.5));
/// assert_eq!(parse_number("N/A"), None);
/// ```
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !is_formatting(*c) && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    let lowered = cleaned.to_ascii_lowercase();
    if MISSING_TOKENS.contains(&lowered.as_str()) {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a price cell. Prices must be strictly positive; anything else is missing.
pub fn parse_price(cell: &str) -> Option<f64> {
    parse_number(cell).filter(|v| *v > 0.0)
}

/// Parse a column label as a calendar date.
pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(label, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(label, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("101.25", Some(101.25))]
    #[case("$101.25", Some(101.25))]
    #[case("$1,234,567.00", Some(1_234_567.0))]
    #[case(" 42 ", Some(42.0))]
    #[case("€ 3,500", Some(3500.0))]
    #[case("", None)]
    #[case("NaN", None)]
    #[case("#N/A", None)]
    #[case("-", None)]
    #[case("abc", None)]
    #[case("inf", None)]
    fn test_parse_number(#[case] cell: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(cell), expected);
    }

    #[test]
    fn test_parse_price_rejects_non_positive() {
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("-5.0"), None);
        assert_eq!(parse_price("$5"), Some(5.0));
    }

    #[rstest]
    #[case("2024-01-31", Some((2024, 1, 31)))]
    #[case("01/31/2024", Some((2024, 1, 31)))]
    #[case("2024/01/31", Some((2024, 1, 31)))]
    #[case("31-Jan-2024", Some((2024, 1, 31)))]
    #[case("2024-01-31 00:00:00", Some((2024, 1, 31)))]
    #[case("Marketcap", None)]
    #[case("2024-13-01", None)]
    #[case("", None)]
    fn test_parse_date_label(#[case] label: &str, #[case] expected: Option<(i32, u32, u32)>) {
        let expected = expected.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        assert_eq!(parse_date_label(label), expected);
    }
}
