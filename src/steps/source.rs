use crate::error::{ProvisionError, ProvisionResult};
use crate::step::{Context, Outcome, Step};

/// Clone the application on first run, fast-forward it afterwards.
/// Always runs as the service principal.
pub struct Source;

impl Step for Source {
    fn name(&self) -> &'static str {
        "source checkout"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let settings = ctx.config.settings();
        let user = ctx.config.app_user();
        let app_dir = ctx.config.app_dir().display().to_string();

        if ctx.host.exists(&ctx.config.app_dir().join(".git")) {
            let mut args = vec!["-C", app_dir.as_str(), "pull", "--ff-only"];
            if let Some(branch) = &settings.branch {
                args.extend(["origin", branch.as_str()]);
            }
            ctx.host.run_as(user, "git", &args)?;
            return Ok(Outcome::Done(format!("pulled latest into {app_dir}")));
        }

        let mut args = vec!["clone"];
        if let Some(branch) = &settings.branch {
            args.extend(["--branch", branch.as_str()]);
        }
        args.extend([settings.repo_url.as_str(), app_dir.as_str()]);
        ctx.host.run_as(user, "git", &args)?;

        Ok(Outcome::Done(format!("cloned {} into {app_dir}", settings.repo_url)))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        let git_dir = ctx.config.app_dir().join(".git");
        if ctx.host.exists(&git_dir) {
            Ok(())
        } else {
            Err(ProvisionError::Other(format!("{} is not a checkout", ctx.config.app_dir().display())))
        }
    }

    fn hint(&self) -> &'static str {
        "check the repository URL and that the host can reach it; a non-empty app_dir blocks the first clone"
    }
}
