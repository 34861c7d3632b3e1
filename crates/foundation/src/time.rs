use chrono::{Datelike, TimeZone, Utc};

/// One UTC day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Midnight UTC of the calendar day containing `time_ms`.
///
/// UTC days are exactly `DAY_MS` long in Unix time, so this is plain
/// euclidean arithmetic and works for dates before 1970 as well.
pub fn start_of_utc_day(time_ms: i64) -> i64 {
    time_ms.div_euclid(DAY_MS) * DAY_MS
}

/// UTC calendar year of an epoch-millisecond timestamp.
///
/// Timestamps outside chrono's representable range collapse to 0, which is
/// the same neutral value stats use for empty inputs.
pub fn utc_year(time_ms: i64) -> i32 {
    match Utc.timestamp_millis_opt(time_ms).single() {
        Some(dt) => dt.year(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{DAY_MS, start_of_utc_day, utc_year};

    #[test]
    fn day_start_floors_within_day() {
        // 2024-03-05T17:45:12.345Z
        let ms = 1_709_660_712_345;
        let start = start_of_utc_day(ms);
        assert_eq!(start % DAY_MS, 0);
        assert!(start <= ms && ms - start < DAY_MS);
    }

    #[test]
    fn day_start_is_identity_at_midnight() {
        let midnight = 86_400_000 * 19_000;
        assert_eq!(start_of_utc_day(midnight), midnight);
    }

    #[test]
    fn day_start_handles_pre_epoch() {
        // 1969-12-31T23:59:59.999Z floors to 1969-12-31T00:00:00Z.
        assert_eq!(start_of_utc_day(-1), -DAY_MS);
    }

    #[test]
    fn year_of_known_timestamps() {
        assert_eq!(utc_year(0), 1970);
        assert_eq!(utc_year(-2_208_988_800_000), 1900);
        assert_eq!(utc_year(1_798_675_200_000), 2026);
    }
}
