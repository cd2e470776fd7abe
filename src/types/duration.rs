//! Duration coercion and formatting helpers.
//!
//! Durations come from user-edited JSON and from quick-timer digit entry, so
//! everything here is total: bad input degrades to zero instead of failing.

use serde::{Deserialize, Deserializer};

/// Longest accepted duration (`u32::MAX` seconds, about 136 years).
pub const MAX_DURATION_SEC: u64 = u32::MAX as u64;

/// Coerces an arbitrary number of seconds into a non-negative whole count.
///
/// Non-finite and negative values become 0, fractional values are floored
/// and anything longer than [`MAX_DURATION_SEC`] is clamped to it.
#[must_use]
pub fn coerce_seconds(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value.floor() as u64).min(MAX_DURATION_SEC)
}

/// Zero-pads a number to at least two digits.
#[must_use]
pub fn pad2(n: u64) -> String {
    format!("{:02}", n)
}

/// Formats seconds as `HH:MM:SS`, or `MM:SS` when under one hour.
///
/// # Example
///
/// ```
/// use intervals::types::format_hms;
///
/// assert_eq!(format_hms(65), "01:05");
/// assert_eq!(format_hms(3725), "01:02:05");
/// ```
#[must_use]
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let rest = seconds % 60;
    if hours > 0 {
        format!("{}:{}:{}", pad2(hours), pad2(minutes), pad2(rest))
    } else {
        format!("{}:{}", pad2(minutes), pad2(rest))
    }
}

/// Maximum number of digits accepted by quick-timer entry.
pub const MAX_QUICK_DIGITS: usize = 6;

/// Parses quick-timer digits (`MMSS` style) into seconds.
///
/// The last two digits are seconds and everything before them is minutes, so
/// `"130"` is 1:30 and `"90"` is 90 seconds. Non-digit characters are
/// ignored. Returns `None` when more than [`MAX_QUICK_DIGITS`] digits remain.
#[must_use]
pub fn parse_quick_digits(input: &str) -> Option<u64> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > MAX_QUICK_DIGITS {
        return None;
    }
    if digits.is_empty() {
        return Some(0);
    }
    let split = digits.len().saturating_sub(2);
    let (minutes, seconds) = digits.split_at(split);
    let minutes: u64 = if minutes.is_empty() {
        0
    } else {
        minutes.parse().ok()?
    };
    let seconds: u64 = seconds.parse().ok()?;
    Some(minutes * 60 + seconds)
}

/// Renders quick-timer digits the way they are shown while typing (`M:SS`).
#[must_use]
pub fn format_quick_digits(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return "00:00".to_string();
    }
    let split = digits.len().saturating_sub(2);
    let (minutes, seconds) = digits.split_at(split);
    let minutes = if minutes.is_empty() { "0" } else { minutes };
    format!("{}:{:0>2}", minutes, seconds)
}

/// Serde helper: accepts any JSON value and coerces it to whole seconds.
pub(crate) fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(whole) => whole.min(MAX_DURATION_SEC),
            None => coerce_seconds(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => s.trim().parse::<f64>().map(coerce_seconds).unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod coerce_tests {
        use super::*;

        #[test]
        fn test_coerce_regular_values() {
            assert_eq!(coerce_seconds(0.0), 0);
            assert_eq!(coerce_seconds(90.0), 90);
            assert_eq!(coerce_seconds(12.9), 12);
        }

        #[test]
        fn test_coerce_invalid_values() {
            assert_eq!(coerce_seconds(-5.0), 0);
            assert_eq!(coerce_seconds(f64::NAN), 0);
            assert_eq!(coerce_seconds(f64::INFINITY), 0);
            assert_eq!(coerce_seconds(f64::NEG_INFINITY), 0);
        }

        #[test]
        fn test_coerce_clamps_huge_values() {
            assert_eq!(coerce_seconds(1e30), MAX_DURATION_SEC);
            assert_eq!(coerce_seconds(MAX_DURATION_SEC as f64), MAX_DURATION_SEC);
        }

        #[test]
        fn test_lenient_seconds_clamps_integers() {
            #[derive(Deserialize)]
            struct Holder {
                #[serde(deserialize_with = "lenient_seconds")]
                secs: u64,
            }
            let max: Holder = serde_json::from_str(r#"{"secs":18446744073709551615}"#).unwrap();
            assert_eq!(max.secs, MAX_DURATION_SEC);
            let text: Holder = serde_json::from_str(r#"{"secs":"1e30"}"#).unwrap();
            assert_eq!(text.secs, MAX_DURATION_SEC);
            let plain: Holder = serde_json::from_str(r#"{"secs":90}"#).unwrap();
            assert_eq!(plain.secs, 90);
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_pad2() {
            assert_eq!(pad2(5), "05");
            assert_eq!(pad2(42), "42");
            assert_eq!(pad2(123), "123");
        }

        #[test]
        fn test_format_under_an_hour() {
            assert_eq!(format_hms(0), "00:00");
            assert_eq!(format_hms(59), "00:59");
            assert_eq!(format_hms(25 * 60), "25:00");
        }

        #[test]
        fn test_format_with_hours() {
            assert_eq!(format_hms(3600), "01:00:00");
            assert_eq!(format_hms(36_000 + 61), "10:01:01");
        }
    }

    mod quick_digit_tests {
        use super::*;

        #[test]
        fn test_parse_seconds_only() {
            assert_eq!(parse_quick_digits("5"), Some(5));
            assert_eq!(parse_quick_digits("90"), Some(90));
        }

        #[test]
        fn test_parse_minutes_and_seconds() {
            assert_eq!(parse_quick_digits("130"), Some(90));
            assert_eq!(parse_quick_digits("2500"), Some(1500));
            assert_eq!(parse_quick_digits("999999"), Some(9999 * 60 + 99));
        }

        #[test]
        fn test_parse_ignores_non_digits() {
            assert_eq!(parse_quick_digits("1:30"), Some(90));
            assert_eq!(parse_quick_digits(""), Some(0));
        }

        #[test]
        fn test_parse_rejects_too_many_digits() {
            assert_eq!(parse_quick_digits("1234567"), None);
        }

        #[test]
        fn test_format_quick_digits() {
            assert_eq!(format_quick_digits(""), "00:00");
            assert_eq!(format_quick_digits("5"), "0:05");
            assert_eq!(format_quick_digits("130"), "1:30");
        }
    }
}
