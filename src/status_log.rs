//! Append-only record of device status transitions.
//!
//! The log is keyed by device address, then by local calendar day
//! (`YYYY-MM-DD`), and each day holds the events in the order they were
//! appended. The on-disk JSON document has exactly that shape:
//!
//! ```json
//! { "192.168.1.10": { "2024-05-01": [ { "status": "online", "timestamp": "2024-05-01 08:00:00" } ] } }
//! ```
//!
//! Reading that document is lenient: an entry that does not decode as a
//! [`StatusEvent`] is dropped with a warning instead of failing the whole
//! log, so one bad record never costs the rest of the history.

use crate::utils::{DATE_FORMAT, TIMESTAMP_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
}

impl Status {
    #[must_use]
    pub fn from_alive(is_alive: bool) -> Self {
        if is_alive {
            Status::Online
        } else {
            Status::Offline
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Online => f.write_str("online"),
            Status::Offline => f.write_str("offline"),
        }
    }
}

/// A single logged transition. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: Status,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl StatusEvent {
    #[must_use]
    pub fn new(status: Status, timestamp: NaiveDateTime) -> Self {
        Self { status, timestamp }
    }
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Events for one device, keyed by day string.
pub type DayLog = BTreeMap<String, Vec<StatusEvent>>;

/// Mapping from device address to its per-day event lists.
///
/// Grows monotonically and is never pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceLog {
    devices: BTreeMap<String, DayLog>,
}

impl<'de> Deserialize<'de> for DeviceLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut log = DeviceLog::new();

        for (address, days) in raw {
            let Value::Object(days) = days else {
                warn!(%address, "Dropping device log entry that is not a day map");
                continue;
            };
            let device = log.devices.entry(address.clone()).or_default();

            for (day, events) in days {
                let Value::Array(events) = events else {
                    warn!(%address, %day, "Dropping day bucket that is not a list");
                    continue;
                };
                let bucket = device.entry(day.clone()).or_default();
                for event in events {
                    match serde_json::from_value::<StatusEvent>(event) {
                        Ok(event) => bucket.push(event),
                        Err(e) => warn!(%address, %day, "Dropping unreadable log entry: {e}"),
                    }
                }
            }
        }

        Ok(log)
    }
}

/// Day bucket key for a date.
#[must_use]
pub fn day_key(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

impl DeviceLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a (possibly empty) bucket exists for `address` on `day`.
    pub fn ensure_bucket(&mut self, address: &str, day: NaiveDate) -> &mut Vec<StatusEvent> {
        self.devices
            .entry(address.to_string())
            .or_default()
            .entry(day_key(day))
            .or_default()
    }

    /// Append an event to the bucket of the event's own day.
    pub fn append(&mut self, address: &str, event: StatusEvent) {
        self.ensure_bucket(address, event.timestamp.date()).push(event);
    }

    /// Events for a device on a day, or `None` if no bucket exists.
    #[must_use]
    pub fn events(&self, address: &str, day: &str) -> Option<&[StatusEvent]> {
        self.devices
            .get(address)
            .and_then(|days| days.get(day))
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
