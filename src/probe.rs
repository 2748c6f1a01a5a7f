use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::host::Host;

/// Bounded poll against a liveness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            attempts: 15,
            interval: Duration::from_secs(2),
        }
    }
}

impl Probe {
    /// Poll `check` until it passes or the attempts run out.
    pub fn wait(
        &self,
        host: &dyn Host,
        label: &str,
        mut check: impl FnMut(&dyn Host) -> bool,
    ) -> ProvisionResult<()> {
        for attempt in 1..=self.attempts {
            if check(host) {
                debug!(target_name = label, attempt, "probe passed");
                return Ok(());
            }
            debug!(target_name = label, attempt, max = self.attempts, "not ready yet");
            if attempt < self.attempts {
                host.sleep(self.interval);
            }
        }
        warn!(target_name = label, attempts = self.attempts, "probe gave up");
        Err(ProvisionError::Liveness(label.to_string(), self.attempts))
    }

    /// Wait until systemd reports `service` active.
    pub fn service_active(&self, host: &dyn Host, service: &str) -> ProvisionResult<()> {
        self.wait(host, service, |h| {
            h.run("systemctl", &["is-active", "--quiet", service]).is_ok()
        })
    }

    /// Wait until `url` answers with a 2xx status.
    pub fn http_ok(&self, host: &dyn Host, url: &str) -> ProvisionResult<()> {
        self.wait(host, url, |h| {
            h.run("curl", &["-fsS", "--max-time", "5", "-o", "/dev/null", url]).is_ok()
        })
    }
}
