//! Cell value conversions.
//!
//! The traversal engine emits raw text; these adapters turn it into typed
//! values. Conversions never fail: unparsable text yields zero, and dates
//! follow the Excel serial-day convention (1900 epoch, leap-year quirk
//! included).

use chrono::DateTime;
use chrono::NaiveDateTime;

/// Days between the Excel serial epoch and 1970-01-01
const UNIX_EPOCH_SERIAL_DAYS: f64 = 25_569.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts cell text to an integer. The whole string must be a decimal
/// number; anything else converts to 0.
pub fn to_i64(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

/// Converts cell text to a float, locale-independent. Unparsable text
/// converts to 0.
pub fn to_f64(value: &str) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Converts cell text holding an Excel serial date to seconds since the
/// Unix epoch. A zero serial means "unset" and converts to 0.
pub fn to_unix_timestamp(value: &str) -> i64 {
    let serial = to_f64(value);
    if serial == 0.0 {
        0
    } else {
        ((serial - UNIX_EPOCH_SERIAL_DAYS) * SECONDS_PER_DAY) as i64
    }
}

/// Converts cell text holding an Excel serial date to a `NaiveDateTime`.
/// Serials outside the representable range clamp to the Unix epoch.
pub fn to_datetime(value: &str) -> NaiveDateTime {
    DateTime::from_timestamp(to_unix_timestamp(value), 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_requires_the_whole_string() {
        assert_eq!(to_i64("42"), 42);
        assert_eq!(to_i64("-7"), -7);
        assert_eq!(to_i64("  42abc"), 0);
        assert_eq!(to_i64("3.5"), 0);
        assert_eq!(to_i64(""), 0);
    }

    #[test]
    fn float_parses_decimal_point_only() {
        assert_eq!(to_f64("2.5"), 2.5);
        assert_eq!(to_f64("-0.125"), -0.125);
        assert_eq!(to_f64("1e3"), 1000.0);
        assert_eq!(to_f64("2,5"), 0.0);
        assert_eq!(to_f64("text"), 0.0);
    }

    #[test]
    fn serial_dates_shift_to_unix_epoch() {
        // 25569 is 1970-01-01
        assert_eq!(to_unix_timestamp("25569"), 0);
        assert_eq!(to_unix_timestamp("25570"), 86_400);
        assert_eq!(to_unix_timestamp("25569.5"), 43_200);
        // zero means unset
        assert_eq!(to_unix_timestamp("0"), 0);
        assert_eq!(to_unix_timestamp("junk"), 0);
    }

    #[test]
    fn datetime_wraps_the_timestamp() {
        let datetime = to_datetime("25570.25");
        assert_eq!(datetime.and_utc().timestamp(), 86_400 + 21_600);
        assert_eq!(to_datetime("0").and_utc().timestamp(), 0);
    }
}
