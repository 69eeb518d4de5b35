use crate::status_log::{day_key, DeviceLog, Status, StatusEvent};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the weekly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUptime {
    pub date: String,
    /// Online hours, rounded to two decimals
    pub uptime: f64,
}

/// Replay a day's events into the number of seconds the device was online.
///
/// An `online` event opens an interval (a second `online` just moves the
/// start), an `offline` event closes it. An interval still open at the end
/// runs until `now` when `day` is today, or until 23:59:59 of `day` otherwise.
/// Negative intervals caused by out-of-order timestamps count as zero.
#[must_use]
pub fn compute_uptime(events: &[StatusEvent], day: NaiveDate, now: NaiveDateTime) -> i64 {
    let mut total = 0;
    let mut open: Option<NaiveDateTime> = None;

    for event in events {
        match event.status {
            Status::Online => open = Some(event.timestamp),
            Status::Offline => {
                if let Some(start) = open.take() {
                    total += interval_secs(start, event.timestamp);
                }
            }
        }
    }

    if let Some(start) = open {
        let end = if day == now.date() {
            now
        } else {
            day.and_time(end_of_day())
        };
        total += interval_secs(start, end);
    }

    total
}

/// Uptime for each of the seven calendar days ending on `now`'s date, oldest
/// first. Days without a log bucket report zero.
#[must_use]
pub fn weekly_uptime(log: &DeviceLog, address: &str, now: NaiveDateTime) -> Vec<DailyUptime> {
    let today = now.date();
    (0..7u64)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|day| {
            let date = day_key(day);
            let seconds = log
                .events(address, &date)
                .map_or(0, |events| compute_uptime(events, day, now));
            DailyUptime {
                date,
                uptime: seconds_to_hours(seconds),
            }
        })
        .collect()
}

/// Convert seconds to hours, rounded to two decimals.
#[must_use]
pub fn seconds_to_hours(seconds: i64) -> f64 {
    // Precision loss is irrelevant at the scale of a single day
    #[allow(clippy::cast_precision_loss)]
    let hours = seconds as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn interval_secs(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let secs = (end - start).num_seconds();
    if secs < 0 {
        warn!("Ignoring negative uptime interval from {start} to {end}");
        return 0;
    }
    secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TIMESTAMP_FORMAT;

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).unwrap()
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn online(raw: &str) -> StatusEvent {
        StatusEvent::new(Status::Online, ts(raw))
    }

    fn offline(raw: &str) -> StatusEvent {
        StatusEvent::new(Status::Offline, ts(raw))
    }

    #[test]
    fn test_empty_log_is_zero() {
        assert_eq!(
            compute_uptime(&[], day("2024-05-01"), ts("2024-05-03 12:00:00")),
            0
        );
    }

    #[test]
    fn test_alternating_pairs_sum() {
        let events = vec![
            online("2024-05-01 08:00:00"),
            offline("2024-05-01 09:00:00"),
            online("2024-05-01 10:00:00"),
            offline("2024-05-01 10:00:30"),
        ];
        assert_eq!(
            compute_uptime(&events, day("2024-05-01"), ts("2024-05-03 12:00:00")),
            3600 + 30
        );
    }

    #[test]
    fn test_leading_offline_contributes_nothing() {
        let events = vec![
            offline("2024-05-01 07:00:00"),
            online("2024-05-01 08:00:00"),
            offline("2024-05-01 08:10:00"),
        ];
        assert_eq!(
            compute_uptime(&events, day("2024-05-01"), ts("2024-05-03 12:00:00")),
            600
        );
    }

    #[test]
    fn test_double_online_is_not_additive() {
        let events = vec![
            online("2024-05-01 08:00:00"),
            online("2024-05-01 08:30:00"),
            offline("2024-05-01 09:00:00"),
        ];
        assert_eq!(
            compute_uptime(&events, day("2024-05-01"), ts("2024-05-03 12:00:00")),
            1800
        );
    }

    #[test]
    fn test_open_interval_today_runs_until_now() {
        let events = vec![online("2024-05-01 08:00:00")];
        assert_eq!(
            compute_uptime(&events, day("2024-05-01"), ts("2024-05-01 08:15:00")),
            900
        );
    }

    #[test]
    fn test_open_interval_past_day_clamps_to_end_of_day() {
        let events = vec![online("2024-05-01 23:00:00")];
        assert_eq!(
            compute_uptime(&events, day("2024-05-01"), ts("2024-05-02 10:00:00")),
            3599
        );
    }

    #[test]
    fn test_negative_interval_counts_as_zero() {
        let events = vec![
            online("2024-05-01 10:00:00"),
            offline("2024-05-01 09:00:00"),
        ];
        assert_eq!(
            compute_uptime(&events, day("2024-05-01"), ts("2024-05-02 10:00:00")),
            0
        );
    }

    #[test]
    fn test_weekly_without_data_is_seven_zero_days() {
        let log = DeviceLog::new();
        let report = weekly_uptime(&log, "10.0.0.1", ts("2024-05-07 12:00:00"));
        assert_eq!(report.len(), 7);
        assert_eq!(report[0].date, "2024-05-01");
        assert_eq!(report[6].date, "2024-05-07");
        assert!(report.iter().all(|d| d.uptime == 0.0));
    }

    #[test]
    fn test_weekly_rounds_hours_and_orders_oldest_first() {
        let mut log = DeviceLog::new();
        log.append("10.0.0.1", online("2024-05-06 08:00:00"));
        log.append("10.0.0.1", offline("2024-05-06 09:20:00"));
        log.append("10.0.0.1", online("2024-05-07 11:00:00"));

        let report = weekly_uptime(&log, "10.0.0.1", ts("2024-05-07 12:30:00"));
        assert_eq!(report[5].date, "2024-05-06");
        assert!((report[5].uptime - 1.33).abs() < f64::EPSILON);
        assert_eq!(report[6].date, "2024-05-07");
        assert!((report[6].uptime - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weekly_crosses_month_boundary() {
        let report = weekly_uptime(&DeviceLog::new(), "10.0.0.1", ts("2024-03-02 00:00:01"));
        let dates: Vec<&str> = report.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-02-25",
                "2024-02-26",
                "2024-02-27",
                "2024-02-28",
                "2024-02-29",
                "2024-03-01",
                "2024-03-02"
            ]
        );
    }

    #[test]
    fn test_seconds_to_hours() {
        assert!((seconds_to_hours(5400) - 1.5).abs() < f64::EPSILON);
        assert!((seconds_to_hours(0) - 0.0).abs() < f64::EPSILON);
        assert!((seconds_to_hours(86_399) - 24.0).abs() < f64::EPSILON);
    }
}
