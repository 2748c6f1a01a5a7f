use crate::error::{ProvisionError, ProvisionResult};
use crate::step::{Context, Outcome, Step};
use crate::ui;

/// Isolated interpreter environment with the application's
/// dependencies.
pub struct Runtime;

impl Step for Runtime {
    fn name(&self) -> &'static str {
        "runtime environment"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let user = ctx.config.app_user();
        let venv = ctx.config.venv_dir();
        let redeploy = &ctx.artifacts.redeploy;
        let pip = redeploy.pip().display().to_string();
        let requirements = redeploy.requirements();

        if ctx.host.exists(&venv.join("bin").join("python")) {
            ui::detail(&format!("reusing {}", venv.display()));
        } else {
            ctx.host
                .run_as(user, "python3", &["-m", "venv", &venv.display().to_string()])?;
            ui::detail(&format!("created {}", venv.display()));
        }

        if !ctx.host.exists(&requirements) {
            return Err(ProvisionError::Other(format!(
                "{} not found in the checkout",
                requirements.display()
            )));
        }

        ctx.host
            .run_as(user, &pip, &["install", "--quiet", "--upgrade", "pip"])?;
        ctx.host.run_as(
            user,
            &pip,
            &["install", "--quiet", "-r", &requirements.display().to_string()],
        )?;

        Ok(Outcome::Done("dependencies installed".into()))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        let server = &ctx.artifacts.service.server;
        if ctx.host.exists(server) {
            Ok(())
        } else {
            Err(ProvisionError::Other(format!(
                "{} missing; is uvicorn listed in requirements.txt?",
                server.display()
            )))
        }
    }

    fn hint(&self) -> &'static str {
        "re-run the pip install as the service user to see the full resolver output"
    }
}
