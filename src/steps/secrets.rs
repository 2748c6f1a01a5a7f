use tracing::info;

use crate::env_file::EnvironmentFile;
use crate::error::{ProvisionError, ProvisionResult};
use crate::host::FileSpec;
use crate::secret::SecretMaterial;
use crate::step::{Context, Outcome, Step};

/// Fresh signing secret plus the environment file the service
/// reads.
///
/// Every run rotates the secret, which signs out every existing
/// session.
pub struct Secrets;

impl Step for Secrets {
    fn name(&self) -> &'static str {
        "secrets & environment"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let user = ctx.config.app_user();
        if !ctx.host.user_exists(user) {
            return Err(ProvisionError::Other(format!(
                "service principal {user} must exist before the environment file is written"
            )));
        }

        let secret = SecretMaterial::generate();
        let env = EnvironmentFile::for_config(ctx.config, &secret);
        let path = ctx.config.env_file_path();

        ctx.host
            .write_file(&path, &env.render(), &FileSpec::owned_by(user, 0o600))?;
        ctx.secret = Some(secret);

        info!(path = %path.display(), origins = ?ctx.config.allowed_origins(), "environment file written");
        Ok(Outcome::Done(format!(
            "wrote {} (secret rotated, existing sessions are signed out)",
            path.display()
        )))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        let path = ctx.config.env_file_path();
        if ctx.host.exists(&path) {
            Ok(())
        } else {
            Err(ProvisionError::Other(format!("{} was not written", path.display())))
        }
    }

    fn hint(&self) -> &'static str {
        "check that app_dir exists and is owned by the service user"
    }
}
