use crate::error::{ProvisionError, ProvisionResult};
use crate::host::FileSpec;
use crate::step::{Context, Outcome, Step};
use crate::ui;

/// Install the systemd unit, start it, and wait until it is
/// active.
pub struct Service;

impl Step for Service {
    fn name(&self) -> &'static str {
        "service supervision"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let descriptor = &ctx.artifacts.service;
        if !ctx.host.exists(&descriptor.env_file) {
            return Err(ProvisionError::Other(format!(
                "{} must exist before the service starts",
                descriptor.env_file.display()
            )));
        }

        let unit = ctx.config.unit_path();
        ctx.host
            .write_file(&unit, &descriptor.render(), &FileSpec::root(0o644))?;
        ui::detail(&format!("wrote {}", unit.display()));

        let name = descriptor.service.as_str();
        ctx.host.run("systemctl", &["daemon-reload"])?;
        ctx.host.run("systemctl", &["enable", name])?;
        // restart, not start: a re-run must pick up the new unit and
        // the rotated secret.
        ctx.host.run("systemctl", &["restart", name])?;

        ui::detail(&format!("waiting for {name} to become active"));
        ctx.probe.service_active(ctx.host, name)?;

        Ok(Outcome::Done(format!(
            "{name} running on {}",
            descriptor.bind
        )))
    }

    fn hint(&self) -> &'static str {
        "inspect `journalctl -u <service> -n 100 --no-pager` for the start-up error"
    }
}
