use tracing::debug;

use crate::error::{ProvisionError, ProvisionResult};
use crate::host::Host;

/// Refuse to continue unless the process may mutate system state.
///
/// Runs before anything else touches the host, so a failure here
/// leaves no partial state behind.
pub fn check(host: &dyn Host) -> ProvisionResult<()> {
    if host.is_privileged() {
        debug!("running with root privileges");
        Ok(())
    } else {
        Err(ProvisionError::Preflight(
            "provisioning installs packages and writes system files, which needs root".into(),
        ))
    }
}
