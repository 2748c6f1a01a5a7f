use crate::error::ProvisionResult;
use crate::host::FileSpec;
use crate::schedule::RETENTION_DAYS;
use crate::step::{Context, Outcome, Step};

/// Install the daily snapshot and weekly prune jobs.
pub struct Backups;

impl Step for Backups {
    fn name(&self) -> &'static str {
        "backup schedule"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let path = ctx.config.backup_cron_path();
        ctx.host.write_file(
            &path,
            &ctx.artifacts.backups.render(),
            &FileSpec::root(0o644),
        )?;

        Ok(Outcome::Done(format!(
            "daily 03:00 snapshot into {}, {RETENTION_DAYS}-day prune on Sundays",
            ctx.config.backup_dir().display()
        )))
    }

    fn hint(&self) -> &'static str {
        "check that /etc/cron.d exists (is cron installed?)"
    }
}
