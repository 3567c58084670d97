//! Epoch-millisecond helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Format an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM:SS` in the
/// given time zone.
pub fn format_ms<Tz>(ms: u64, tz: &Tz) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match chrono::DateTime::from_timestamp_millis(ms as i64) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => ms.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_in_utc() {
        assert_eq!(format_ms(0, &chrono::Utc), "1970-01-01 00:00:00");
        assert_eq!(format_ms(1_700_000_000_000, &chrono::Utc), "2023-11-14 22:13:20");
    }

    #[test]
    fn formats_with_fixed_offset() {
        let jst = chrono::FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(format_ms(0, &jst), "1970-01-01 09:00:00");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
