use chrono::{Local, NaiveDateTime};

/// Format used for event timestamps in the device log ("YYYY-MM-DD HH:mm:ss").
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used for day buckets in the device log ("YYYY-MM-DD").
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of local wall-clock time.
///
/// The scanner, uptime queries and the debouncer all read "now" through this
/// trait so that tests can pin the calendar date and hour.
pub trait Clock: Send + Sync {
    /// Current local date-time, without timezone information.
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Format a number of seconds as `HH:MM:SS`.
///
/// # Examples
///
/// ```
/// use device_sentry::utils::format_hms;
///
/// assert_eq!(format_hms(3_725), "01:02:05");
/// ```
#[must_use]
pub fn format_hms(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Interpret common truthy strings (`1`, `true`, `yes`, `on`) as `true`.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms_zero() {
        assert_eq!(format_hms(0), "00:00:00");
    }

    #[test]
    fn test_format_hms_end_of_day() {
        assert_eq!(format_hms(86_399), "23:59:59");
    }

    #[test]
    fn test_format_hms_negative_is_zero() {
        assert_eq!(format_hms(-5), "00:00:00");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("On"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("enabled"));
    }

    #[test]
    fn test_local_clock_formats_as_timestamp() {
        let formatted = LocalClock.now().format(TIMESTAMP_FORMAT).to_string();
        assert_eq!(formatted.len(), 19);
        assert!(NaiveDateTime::parse_from_str(&formatted, TIMESTAMP_FORMAT).is_ok());
    }
}
