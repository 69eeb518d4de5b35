//! Rate-limited, quiet-hours-aware delivery of notification text.
//!
//! # State Machine
//!
//! ```text
//!             send() within interval
//!   Idle ─────────────────────────────► Armed(deadline, pending)
//!    ▲                                     │  │
//!    │        timer fires (any outcome)    │  │ send() within interval:
//!    └─────────────────────────────────────┘  │ pending = newest message
//!                                             ▼
//!                                           Armed
//! ```
//!
//! A `send()` after the interval has elapsed dispatches immediately. While
//! armed, later messages overwrite the pending one and never reschedule the
//! timer. Both the enable flag and the hour window are checked on `send()`
//! and again when the timer fires.

use crate::error::Result;
use crate::transport::Transport;
use crate::utils::Clock;
use chrono::Timelike;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Predicate consulted before every dispatch.
pub type EnabledFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Local-time hour range `[start_hour, end_hour)` in which sending is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl NotificationWindow {
    #[must_use]
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    #[must_use]
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// What a call to [`Debouncer::send`] did with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Disabled or outside the window; nothing queued
    Suppressed,
    /// Delivered immediately
    Dispatched,
    /// Immediate delivery failed; `last_sent` unchanged
    Failed,
    /// Stored as pending and a timer was armed
    Deferred,
    /// Replaced the pending message of an already armed timer
    Coalesced,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Armed { deadline: Instant, pending: String },
}

#[derive(Debug)]
struct DebounceState {
    last_sent: Option<Instant>,
    phase: Phase,
}

struct Inner {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    enabled: EnabledFn,
    interval: Duration,
    window: NotificationWindow,
    state: Mutex<DebounceState>,
}

/// Coalesces bursts of notifications into at most one message per interval.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        enabled: EnabledFn,
        interval: Duration,
        window: NotificationWindow,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                clock,
                enabled,
                interval,
                window,
                state: Mutex::new(DebounceState {
                    last_sent: None,
                    phase: Phase::Idle,
                }),
            }),
        }
    }

    /// Submit a message for delivery.
    pub async fn send(&self, message: impl Into<String>) -> SendOutcome {
        let message = message.into();
        if !self.inner.permitted() {
            debug!("Notification suppressed (disabled or outside window): {message}");
            return SendOutcome::Suppressed;
        }

        let mut state = self.inner.state.lock().await;
        let now = Instant::now();
        let elapsed = state
            .last_sent
            .map(|last| now.saturating_duration_since(last));

        match elapsed {
            Some(elapsed) if elapsed < self.inner.interval => {
                if let Phase::Armed { pending, .. } = &mut state.phase {
                    debug!("Replacing pending notification");
                    *pending = message;
                    return SendOutcome::Coalesced;
                }

                let remaining = self.inner.interval - elapsed;
                let deadline = now + remaining;
                debug!("Deferring notification for {}s", remaining.as_secs());
                state.phase = Phase::Armed {
                    deadline,
                    pending: message,
                };
                self.arm(deadline);
                SendOutcome::Deferred
            }
            _ => {
                // A fresh dispatch supersedes anything still waiting on a late timer
                state.phase = Phase::Idle;
                match self.inner.dispatch(&message).await {
                    Ok(()) => {
                        state.last_sent = Some(now);
                        SendOutcome::Dispatched
                    }
                    Err(_) => SendOutcome::Failed,
                }
            }
        }
    }

    /// Message waiting for the armed timer, if any.
    pub async fn pending_message(&self) -> Option<String> {
        match &self.inner.state.lock().await.phase {
            Phase::Armed { pending, .. } => Some(pending.clone()),
            Phase::Idle => None,
        }
    }

    pub async fn is_armed(&self) -> bool {
        matches!(self.inner.state.lock().await.phase, Phase::Armed { .. })
    }

    fn arm(&self, deadline: Instant) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.fire(deadline).await;
        });
    }
}

impl Inner {
    fn permitted(&self) -> bool {
        (self.enabled)() && self.window.contains(self.clock.now().hour())
    }

    async fn dispatch(&self, message: &str) -> Result<()> {
        match self.transport.send_text(message).await {
            Ok(()) => {
                info!("Notification sent: {message}");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send notification: {e}");
                Err(e)
            }
        }
    }

    async fn fire(&self, armed_at: Instant) {
        let mut state = self.state.lock().await;
        // A stale timer must not consume a phase armed by a later send()
        if !matches!(state.phase, Phase::Armed { deadline, .. } if deadline == armed_at) {
            return;
        }
        let pending = match std::mem::replace(&mut state.phase, Phase::Idle) {
            Phase::Armed { pending, deadline } => {
                let late = Instant::now().saturating_duration_since(deadline);
                debug!("Debounce timer fired ({}ms after deadline)", late.as_millis());
                pending
            }
            Phase::Idle => return,
        };

        if !self.permitted() {
            debug!("Dropping pending notification (disabled or outside window)");
            return;
        }

        if self.dispatch(&pending).await.is_ok() {
            state.last_sent = Some(Instant::now());
        }
    }
}
