use crate::device::Device;
use crate::notifier::Debouncer;
use crate::probe::Prober;
use crate::status_log::{DeviceLog, Status, StatusEvent};
use crate::storage::LogStore;
use crate::utils::Clock;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receiver of transition messages produced by a scan.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: String);
}

#[async_trait]
impl Notifier for Debouncer {
    async fn notify(&self, message: String) {
        self.send(message).await;
    }
}

/// Entry of the `/status` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub name: String,
    pub is_online: bool,
}

/// Result of a single [`Scanner::scan`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Debug mode, or another scan was still running
    Skipped,
    /// Every device was probed
    Completed { transitions: usize },
}

/// Scanner tuning that does not belong to any single device.
#[derive(Debug, Clone, Copy)]
pub struct ScannerOptions {
    pub probe_timeout: Duration,
    /// Disables probing and log mutation
    pub debug: bool,
    /// Let devices flagged `notify_on_same_status` re-notify on identical readings
    pub repeat_same_status: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(crate::config::DEFAULT_PROBE_TIMEOUT_SECS),
            debug: false,
            repeat_same_status: false,
        }
    }
}

/// Tracks device liveness and records transitions.
///
/// Owns the device log and the last observed reading of every device.
/// Readers get snapshots through [`Scanner::statuses`] and
/// [`Scanner::read_log`]; locks are never held across a probe.
pub struct Scanner {
    devices: Vec<Device>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn LogStore>,
    clock: Arc<dyn Clock>,
    options: ScannerOptions,
    live: RwLock<HashMap<String, bool>>,
    log: RwLock<DeviceLog>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a scan ends, even on early return.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scanner {
    pub fn new(
        devices: Vec<Device>,
        initial_log: DeviceLog,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn LogStore>,
        clock: Arc<dyn Clock>,
        options: ScannerOptions,
    ) -> Self {
        Self {
            devices,
            prober,
            notifier,
            store,
            clock,
            options,
            live: RwLock::new(HashMap::new()),
            log: RwLock::new(initial_log),
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn device(&self, address: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.address == address)
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Probe every device once and record transitions.
    ///
    /// A call made while another scan is running returns
    /// [`ScanOutcome::Skipped`] immediately.
    pub async fn scan(&self) -> ScanOutcome {
        if self.options.debug {
            debug!("Debug mode enabled, skipping scan");
            return ScanOutcome::Skipped;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous scan still running, skipping tick");
            return ScanOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        info!("Scanning network...");
        let mut transitions = 0;

        for device in &self.devices {
            let is_alive = self.probe(device).await;
            let now = self.clock.now();
            let name = device.display_name();

            let previous = self.record_reading(device, is_alive, now);

            match previous {
                None => {
                    debug!(device = name, alive = is_alive, "Baseline reading");
                }
                Some(previous) if previous != is_alive => {
                    let status = Status::from_alive(is_alive);
                    info!(device = name, %status, "Device is {}", status.to_string().to_uppercase());
                    transitions += 1;
                    self.notifier.notify(device.build_message(is_alive)).await;
                }
                Some(_) => {
                    if self.options.repeat_same_status && device.notify_on_same_status {
                        debug!(device = name, "Re-notifying unchanged status");
                        self.notifier.notify(device.build_message(is_alive)).await;
                    }
                }
            }
        }

        if transitions > 0 {
            self.persist();
        }

        ScanOutcome::Completed { transitions }
    }

    /// Run [`Scanner::scan`] every `interval` until `cancel_token` fires.
    ///
    /// Each tick spawns its own scan; ticks that land on a running scan are
    /// dropped by the in-flight guard rather than queued.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel_token: CancellationToken) {
        info!("Starting scan loop every {}s", interval.as_secs());
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Scan loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let scanner = Arc::clone(&self);
                    tokio::spawn(async move {
                        scanner.scan().await;
                    });
                }
            }
        }
    }

    /// Last reading of every configured device, keyed by address.
    ///
    /// Devices that have not been probed yet are reported offline.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<String, DeviceStatus> {
        let live = match self.live.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                error!("Failed to acquire status read lock: {e}");
                HashMap::new()
            }
        };

        self.devices
            .iter()
            .map(|device| {
                (
                    device.address.clone(),
                    DeviceStatus {
                        name: device.display_name().to_string(),
                        is_online: live.get(&device.address).copied().unwrap_or(false),
                    },
                )
            })
            .collect()
    }

    /// Run `f` against the current device log.
    pub fn read_log<T>(&self, f: impl FnOnce(&DeviceLog) -> T) -> T {
        match self.log.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    async fn probe(&self, device: &Device) -> bool {
        match self
            .prober
            .probe(&device.address, self.options.probe_timeout)
            .await
        {
            Ok(alive) => alive,
            Err(e) => {
                warn!(address = %device.address, "Probe error, treating as offline: {e}");
                false
            }
        }
    }

    /// Store the reading and return the previous one. Appends a log event
    /// when a known previous reading differs.
    fn record_reading(
        &self,
        device: &Device,
        is_alive: bool,
        now: chrono::NaiveDateTime,
    ) -> Option<bool> {
        let previous = match self.live.write() {
            Ok(mut live) => live.insert(device.address.clone(), is_alive),
            Err(e) => {
                error!("Failed to acquire status write lock: {e}");
                return None;
            }
        };

        match self.log.write() {
            Ok(mut log) => {
                log.ensure_bucket(&device.address, now.date());
                if previous.is_some_and(|p| p != is_alive) {
                    log.append(
                        &device.address,
                        StatusEvent::new(Status::from_alive(is_alive), now),
                    );
                }
            }
            Err(e) => error!("Failed to acquire log write lock: {e}"),
        }

        previous
    }

    fn persist(&self) {
        let snapshot = self.read_log(DeviceLog::clone);
        match self.store.save(&snapshot) {
            Ok(()) => debug!("Device log saved"),
            Err(e) => error!("Failed to save device log: {e}"),
        }
    }
}
