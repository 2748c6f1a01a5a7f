use std::path::PathBuf;

use crate::error::{ProvisionError, ProvisionResult};
use crate::host::FileSpec;
use crate::step::{Context, Idempotency, Outcome, Step};
use crate::ui;

/// Service account plus the directory tree it exclusively owns.
pub struct Principal;

impl Principal {
    fn directories(ctx: &Context<'_>) -> Vec<PathBuf> {
        vec![
            ctx.config.app_dir().to_path_buf(),
            ctx.config.data_dir().to_path_buf(),
            ctx.config.log_dir(),
            ctx.config.backup_dir().to_path_buf(),
        ]
    }
}

impl Step for Principal {
    fn name(&self) -> &'static str {
        "principal & filesystem"
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::DetectAndSkip
    }

    fn is_satisfied(&self, ctx: &Context<'_>) -> bool {
        ctx.host.user_exists(ctx.config.app_user())
            && Self::directories(ctx).iter().all(|d| ctx.host.exists(d))
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let user = ctx.config.app_user();
        let home = ctx.config.app_dir().display().to_string();

        if ctx.host.user_exists(user) {
            ui::warning(&format!("user {user} already exists"));
        } else {
            ctx.host.run(
                "useradd",
                &[
                    "--system",
                    "--user-group",
                    "--home-dir",
                    &home,
                    "--no-create-home",
                    "--shell",
                    "/usr/sbin/nologin",
                    user,
                ],
            )?;
            ui::detail(&format!("created system user {user}"));
        }

        let spec = FileSpec::owned_by(user, 0o750);
        for dir in Self::directories(ctx) {
            if ctx.host.exists(&dir) {
                ui::warning(&format!("{} already exists", dir.display()));
            } else {
                ctx.host.create_dir(&dir, &spec)?;
                ui::detail(&format!("created {}", dir.display()));
            }
        }

        Ok(Outcome::Done(format!("{user} owns its directories")))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        if ctx.host.user_exists(ctx.config.app_user()) {
            Ok(())
        } else {
            Err(ProvisionError::Other(format!(
                "user {} missing after creation",
                ctx.config.app_user()
            )))
        }
    }

    fn hint(&self) -> &'static str {
        "check `getent passwd` and the directory ownership, then re-run"
    }
}
