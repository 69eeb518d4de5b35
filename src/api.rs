use crate::device::Device;
use crate::error::{Result, SentryError};
use crate::scanner::DeviceStatus;
use crate::server::AppState;
use crate::status_log::StatusEvent;
use crate::uptime::{compute_uptime, weekly_uptime, DailyUptime};
use crate::utils::{format_hms, DATE_FORMAT};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Uptime of one device on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeReport {
    pub device: String,
    pub date: String,
    pub uptime_seconds: i64,
    pub uptime_human_readable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UptimeResponse {
    Report(UptimeReport),
    NoData { error: String },
}

/// `GET /devices`
pub async fn list_devices(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, Device>> {
    Json(
        state
            .scanner
            .devices()
            .iter()
            .map(|device| (device.address.clone(), device.clone()))
            .collect(),
    )
}

/// `GET /status`
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, DeviceStatus>> {
    Json(state.scanner.statuses())
}

/// `GET /uptime/:ip/:date`
///
/// # Errors
///
/// Returns `SentryError::Validation` when a bucket exists but `date` is not a
/// `YYYY-MM-DD` date
pub async fn get_uptime(
    State(state): State<Arc<AppState>>,
    Path((ip, date)): Path<(String, String)>,
) -> Result<Json<UptimeResponse>> {
    let scanner = &state.scanner;
    let now = scanner.clock().now();

    let events = scanner.read_log(|log| log.events(&ip, &date).map(<[StatusEvent]>::to_vec));
    let Some(events) = events else {
        return Ok(Json(UptimeResponse::NoData {
            error: "No data available for this device and date.".to_string(),
        }));
    };

    let day = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|_| SentryError::Validation(format!("Invalid date: {date}")))?;
    let uptime_seconds = compute_uptime(&events, day, now);

    let device = scanner
        .device(&ip)
        .map_or_else(|| ip.clone(), |d| d.display_name().to_string());

    Ok(Json(UptimeResponse::Report(UptimeReport {
        device,
        date,
        uptime_seconds,
        uptime_human_readable: format_hms(uptime_seconds),
    })))
}

/// `GET /weekly/:ip`
pub async fn get_weekly(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Json<Vec<DailyUptime>> {
    let scanner = &state.scanner;
    let now = scanner.clock().now();
    Json(scanner.read_log(|log| weekly_uptime(log, &ip, now)))
}
