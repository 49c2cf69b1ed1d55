//! Calendar features.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Hour of day (0-23) of a UTC timestamp.
pub fn hour_of_day(time: DateTime<Utc>) -> u32 {
    time.hour()
}

/// Day of week of a UTC timestamp, Monday = 0 through Sunday = 6.
pub fn day_of_week(time: DateTime<Utc>) -> u32 {
    time.weekday().num_days_from_monday()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    // 2024-05-06 is a Monday
    #[case(2024, 5, 6, 0, 0, 0)]
    #[case(2024, 5, 8, 13, 13, 2)]
    #[case(2024, 5, 12, 23, 23, 6)]
    fn test_calendar_features(
        #[case] y: i32,
        #[case] m: u32,
        #[case] d: u32,
        #[case] h: u32,
        #[case] expected_hour: u32,
        #[case] expected_dow: u32,
    ) {
        let t = Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap();
        assert_eq!(hour_of_day(t), expected_hour);
        assert_eq!(day_of_week(t), expected_dow);
    }
}
