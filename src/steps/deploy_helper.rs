use crate::error::ProvisionResult;
use crate::host::FileSpec;
use crate::step::{Context, Outcome, Step};

/// Install the redeploy command for use after provisioning.
pub struct DeployHelper;

impl Step for DeployHelper {
    fn name(&self) -> &'static str {
        "deploy helper"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let path = ctx.config.deploy_helper_path();
        ctx.host.write_file(
            &path,
            &ctx.artifacts.redeploy.render_script(),
            &FileSpec::root(0o755),
        )?;

        Ok(Outcome::Done(format!("redeploy with `sudo {}`", path.display())))
    }

    fn hint(&self) -> &'static str {
        "check that /usr/local/bin is writable"
    }
}
