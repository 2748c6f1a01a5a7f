use crate::error::ProvisionResult;
use crate::host::FileSpec;
use crate::step::{Context, Outcome, Step};

pub struct LogRotation;

impl Step for LogRotation {
    fn name(&self) -> &'static str {
        "log rotation"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let path = ctx.config.logrotate_path();
        ctx.host.write_file(
            &path,
            &ctx.artifacts.rotation.render(),
            &FileSpec::root(0o644),
        )?;

        Ok(Outcome::Done(format!(
            "{} rotated daily, {} kept",
            ctx.artifacts.rotation.pattern.display(),
            ctx.artifacts.rotation.keep
        )))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        // Debug mode parses the policy without rotating anything.
        ctx.host
            .run("logrotate", &["-d", &ctx.config.logrotate_path().display().to_string()])
            .map(|_| ())
    }

    fn hint(&self) -> &'static str {
        "run `logrotate -d` on the generated policy to see the parse error"
    }
}
