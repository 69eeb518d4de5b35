use crate::error::{Result, SentryError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Reachability check against a single device address.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns `Ok(true)` when the device answered within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the probe itself could not be carried out; the
    /// scanner treats that exactly like an unreachable device.
    async fn probe(&self, address: &str, timeout: Duration) -> Result<bool>;
}

/// Probes with a single ICMP echo through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProber {
    program: String,
}

impl Default for PingProber {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }
}

impl PingProber {
    /// Use a different executable, e.g. an absolute path to `ping`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, address: &str, timeout: Duration) -> Command {
        let wait_secs = timeout.as_secs().max(1).to_string();
        let mut cmd = Command::new(&self.program);
        if cfg!(target_os = "windows") {
            let wait_ms = timeout.as_millis().max(1).to_string();
            cmd.args(["-n", "1", "-w", wait_ms.as_str(), address]);
        } else if cfg!(target_os = "macos") {
            cmd.args(["-c", "1", "-t", wait_secs.as_str(), address]);
        } else {
            cmd.args(["-c", "1", "-W", wait_secs.as_str(), address]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: &str, timeout: Duration) -> Result<bool> {
        let mut cmd = self.command(address, timeout);
        // Allow the process a little slack beyond its own deadline before killing it
        let deadline = timeout + Duration::from_millis(500);

        match tokio::time::timeout(deadline, cmd.status()).await {
            Ok(Ok(status)) => {
                debug!(address, alive = status.success(), "Probe finished");
                Ok(status.success())
            }
            Ok(Err(e)) => Err(SentryError::Generic(format!(
                "Failed to run {} for {address}: {e}",
                self.program
            ))),
            Err(_) => {
                debug!(address, "Probe timed out");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let prober = PingProber::with_program("definitely-not-a-real-ping-binary-12345");
        let result = prober.probe("127.0.0.1", Duration::from_secs(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_successful_program_is_alive() {
        // `true` ignores its arguments and exits 0
        let prober = PingProber::with_program("true");
        let alive = prober
            .probe("127.0.0.1", Duration::from_secs(1))
            .await
            .expect("probe should run");
        assert!(alive);
    }

    #[tokio::test]
    async fn test_failing_program_is_unreachable() {
        let prober = PingProber::with_program("false");
        let alive = prober
            .probe("127.0.0.1", Duration::from_secs(1))
            .await
            .expect("probe should run");
        assert!(!alive);
    }
}
