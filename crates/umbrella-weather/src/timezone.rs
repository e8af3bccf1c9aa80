//! UTC offset to civil timezone lookup.
//!
//! OpenWeatherMap reports a location's current offset from UTC in seconds but
//! no zone name. The offset is floored to whole hours and looked up in a fixed
//! table of representative zones. Half-hour and 45-minute offsets land on the
//! zone of the hour below (India's +5:30 resolves to +5, Asia/Kolkata by luck;
//! Newfoundland's -3:30 resolves to -4, America/Halifax).

use chrono_tz::Tz;

const SECONDS_PER_HOUR: i32 = 3600;

/// Representative zone for each whole-hour offset, -12 through +12.
const ZONES_BY_OFFSET: [(i32, Tz); 25] = [
    (-12, chrono_tz::Pacific::Kwajalein),
    (-11, chrono_tz::Pacific::Midway),
    (-10, chrono_tz::Pacific::Honolulu),
    (-9, chrono_tz::America::Anchorage),
    (-8, chrono_tz::America::Los_Angeles),
    (-7, chrono_tz::America::Denver),
    (-6, chrono_tz::America::Chicago),
    (-5, chrono_tz::America::New_York),
    (-4, chrono_tz::America::Halifax),
    (-3, chrono_tz::America::Sao_Paulo),
    (-2, chrono_tz::Atlantic::South_Georgia),
    (-1, chrono_tz::Atlantic::Azores),
    (0, chrono_tz::UTC),
    (1, chrono_tz::Europe::London),
    (2, chrono_tz::Europe::Paris),
    (3, chrono_tz::Europe::Moscow),
    (4, chrono_tz::Asia::Dubai),
    (5, chrono_tz::Asia::Kolkata),
    (6, chrono_tz::Asia::Dhaka),
    (7, chrono_tz::Asia::Bangkok),
    (8, chrono_tz::Asia::Shanghai),
    (9, chrono_tz::Asia::Tokyo),
    (10, chrono_tz::Australia::Sydney),
    (11, chrono_tz::Pacific::Guadalcanal),
    (12, chrono_tz::Pacific::Auckland),
];

/// Whole-hour offset, rounded toward negative infinity.
pub fn offset_hours(utc_offset_seconds: i32) -> i32 {
    utc_offset_seconds.div_euclid(SECONDS_PER_HOUR)
}

/// Map a UTC offset in seconds to a timezone. Unmapped offsets are UTC.
pub fn resolve_timezone(utc_offset_seconds: i32) -> Tz {
    let hours = offset_hours(utc_offset_seconds);
    ZONES_BY_OFFSET
        .iter()
        .find(|(h, _)| *h == hours)
        .map(|(_, tz)| *tz)
        .unwrap_or(chrono_tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_eastern() {
        assert_eq!(resolve_timezone(-18000), chrono_tz::America::New_York);
        assert_eq!(resolve_timezone(-18000).name(), "America/New_York");
    }

    #[test]
    fn test_every_whole_hour_is_mapped() {
        for hours in -12..=12 {
            let tz = resolve_timezone(hours * 3600);
            let expected = ZONES_BY_OFFSET
                .iter()
                .find(|(h, _)| *h == hours)
                .map(|(_, tz)| *tz);
            assert_eq!(Some(tz), expected, "offset {} hours", hours);
        }
    }

    #[test]
    fn test_table_names() {
        assert_eq!(resolve_timezone(-12 * 3600).name(), "Pacific/Kwajalein");
        assert_eq!(resolve_timezone(0).name(), "UTC");
        assert_eq!(resolve_timezone(3600).name(), "Europe/London");
        assert_eq!(resolve_timezone(9 * 3600).name(), "Asia/Tokyo");
        assert_eq!(resolve_timezone(12 * 3600).name(), "Pacific/Auckland");
    }

    #[test]
    fn test_out_of_range_is_utc() {
        assert_eq!(resolve_timezone(13 * 3600), chrono_tz::UTC);
        assert_eq!(resolve_timezone(14 * 3600), chrono_tz::UTC);
        assert_eq!(resolve_timezone(-13 * 3600), chrono_tz::UTC);
        assert_eq!(resolve_timezone(i32::MAX), chrono_tz::UTC);
        assert_eq!(resolve_timezone(i32::MIN), chrono_tz::UTC);
    }

    #[test]
    fn test_fractional_offsets_floor() {
        // India, +5:30
        assert_eq!(offset_hours(19800), 5);
        assert_eq!(resolve_timezone(19800), chrono_tz::Asia::Kolkata);
        // Newfoundland, -3:30
        assert_eq!(offset_hours(-12600), -4);
        assert_eq!(resolve_timezone(-12600), chrono_tz::America::Halifax);
        // Nepal, +5:45
        assert_eq!(offset_hours(20700), 5);
    }

    #[test]
    fn test_daylight_offsets_map_to_neighbouring_zone() {
        // New York in summer reports -4h.
        assert_eq!(resolve_timezone(-14400), chrono_tz::America::Halifax);
        // Paris in summer reports +2h.
        assert_eq!(resolve_timezone(7200), chrono_tz::Europe::Paris);
    }
}
