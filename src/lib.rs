//! # Device Sentry Library
//!
//! Device Sentry watches a small, fixed set of network devices, records when
//! they come online or go offline, derives daily and weekly uptime from that
//! record, and pushes debounced notifications about transitions.
//!
//! ## Overview
//!
//! - `scanner`: probes every device on a timer and records transitions
//! - `uptime`: replays the status log into online seconds per day
//! - `notifier`: rate-limits and time-windows outbound notifications
//! - `status_log` / `storage`: the append-only device log and its JSON persistence
//! - `api` / `settings` / `server`: the HTTP surface
//!
//! ## Getting Started
//!
//! ```no_run
//! use device_sentry::server;
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), device_sentry::error::SentryError> {
//!     let cancel_token = CancellationToken::new();
//!     server::run(None, Some(PathBuf::from("config.json5")), cancel_token).await
//! }
//! ```

/// Custom error types module
///
/// Defines the `SentryError` enum shared by every component and its mapping
/// to HTTP responses.
pub mod error;

/// Configuration management module
///
/// Loads the JSON5 configuration file, applies environment overrides and
/// validates the result.
pub mod config;

/// Monitored device definitions and notification message templates.
pub mod device;

/// The append-only device status log.
pub mod status_log;

/// JSON persistence for the device log and notification settings.
pub mod storage;

/// Uptime reconstruction from the status log.
pub mod uptime;

/// Reachability probing.
pub mod probe;

/// Notification delivery channels.
pub mod transport;

/// Debounced notification dispatch.
pub mod notifier;

/// Periodic device scanning.
///
/// Owns the live status of every device and the device log, and turns
/// transitions into log entries and notifications.
pub mod scanner;

/// Notification settings and their API endpoints.
pub mod settings;

/// Read-only API endpoints for devices, status and uptime.
pub mod api;

/// Server operations module
///
/// Wires the components together, runs the scan loop and serves the API
/// with graceful shutdown.
pub mod server;

/// Time helpers shared by the scanner, uptime queries and debouncer.
pub mod utils;
