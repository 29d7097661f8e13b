//! Normalization of raw model values into prediction values
//!
//! Models sometimes answer with the literal word `null` instead of a JSON
//! null, with currency symbols in amounts, or with numbers where strings were
//! asked for. These helpers turn all of that into either a canonical string or
//! nothing.

use chrono::NaiveDate;
use serde_json::Value;

/// Treat JSON null and the words `null` / `none` / empty as "no value"
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tallyman_domain::null_to_none;
///
/// assert!(null_to_none(Some(&json!("NONE"))).is_none());
/// assert_eq!(null_to_none(Some(&json!("23.45"))), Some(&json!("23.45")));
/// ```
pub fn null_to_none(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Null => None,
        Value::String(s) => {
            let lowered = s.trim().to_ascii_lowercase();
            if lowered.is_empty() || lowered == "null" || lowered == "none" {
                None
            } else {
                value
            }
        }
        _ => value,
    }
}

/// Render a scalar model value as text
///
/// Strings are trimmed and numbers printed as-is; anything structured has no
/// textual form.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonicalize a monetary amount to a decimal string with two fraction digits
///
/// Currency symbols, letters and whitespace are dropped. When both `.` and
/// `,` appear, the one written last is the decimal separator (`1,234.50`,
/// `1.234,50`). A lone comma followed by one or two digits is a decimal
/// separator (`12,5`), otherwise commas group thousands. Extra fraction
/// digits are rounded half-up. The arithmetic is done on the digits, so
/// large amounts stay exact.
///
/// # Examples
///
/// ```
/// use tallyman_domain::normalize_amount;
///
/// assert_eq!(normalize_amount("$1,234.5").as_deref(), Some("1234.50"));
/// assert_eq!(normalize_amount("EUR 12,30").as_deref(), Some("12.30"));
/// assert_eq!(normalize_amount("2.675").as_deref(), Some("2.68"));
/// assert_eq!(normalize_amount("n/a"), None);
/// ```
pub fn normalize_amount(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if unsigned.contains('-') || !unsigned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let (whole, frac) = split_decimal(unsigned)?;
    let mut digits: Vec<u8> = whole
        .bytes()
        .chain(frac.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|b| b - b'0')
        .collect();

    if frac.as_bytes().get(2).is_some_and(|d| *d >= b'5') && !increment(&mut digits) {
        digits.insert(0, 1);
    }

    let split = digits.len() - 2;
    let int_part: String = digits[..split]
        .iter()
        .map(|d| char::from(b'0' + d))
        .collect::<String>()
        .trim_start_matches('0')
        .to_string();
    let frac_part: String = digits[split..].iter().map(|d| char::from(b'0' + d)).collect();
    let int_part = if int_part.is_empty() { "0".to_string() } else { int_part };

    let is_zero = digits.iter().all(|d| *d == 0);
    let sign = if negative && !is_zero { "-" } else { "" };
    Some(format!("{}{}.{}", sign, int_part, frac_part))
}

/// Whole and fraction digit strings of an unsigned amount, separators removed
fn split_decimal(unsigned: &str) -> Option<(String, &str)> {
    let last_dot = unsigned.rfind('.');
    let last_comma = unsigned.rfind(',');

    let decimal = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => Some('.'),
        (None, Some(_)) => {
            let lone_short_comma = unsigned.matches(',').count() == 1
                && unsigned
                    .rsplit(',')
                    .next()
                    .is_some_and(|frac| (1..=2).contains(&frac.len()));
            lone_short_comma.then_some(',')
        }
        (None, None) => None,
    };

    let (whole, frac) = match decimal {
        Some(sep) => {
            if unsigned.matches(sep).count() > 1 {
                return None;
            }
            unsigned.split_once(sep)?
        }
        None => (unsigned, ""),
    };

    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: String = whole.chars().filter(|c| c.is_ascii_digit()).collect();
    Some((whole, frac))
}

/// Add one unit in the last place; false when the carry runs off the front
fn increment(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return true;
        }
    }
    false
}

/// Canonicalize a purchase date to `YYYY-MM-DD`
///
/// Only calendar-valid ISO dates are accepted; a trailing time component
/// (`2024-01-31T10:00:00`) is ignored.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let date_part = match trimmed.char_indices().nth(10) {
        Some((idx, 'T')) | Some((idx, ' ')) => &trimmed[..idx],
        _ => trimmed,
    };

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
