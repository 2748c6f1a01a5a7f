use crate::error::{ProvisionError, ProvisionResult};
use crate::step::{Context, Outcome, Step};
use crate::ui;

/// Packages the rest of the run depends on.
pub const PACKAGES: &[&str] = &[
    "python3",
    "python3-venv",
    "python3-pip",
    "git",
    "nginx",
    "ufw",
    "fail2ban",
    "certbot",
    "python3-certbot-nginx",
    "curl",
    "sqlite3",
    "cron",
    "logrotate",
];

/// Binaries later steps invoke directly.
const REQUIRED_BINARIES: &[&str] = &["git", "python3", "nginx", "ufw", "fail2ban-client", "certbot", "curl"];

/// OS update and dependency install.
pub struct Baseline;

impl Step for Baseline {
    fn name(&self) -> &'static str {
        "baseline packages"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let apt = |args: &[&str]| {
            let mut full = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get"];
            full.extend_from_slice(args);
            ctx.host.run_interactive("env", &full)
        };

        ui::detail("updating package index");
        apt(&["update", "-qq"])?;

        ui::detail("upgrading installed packages");
        apt(&["upgrade", "-y", "-qq"])?;

        ui::detail(&format!("installing {}", PACKAGES.join(" ")));
        let mut install = vec!["install", "-y", "-qq"];
        install.extend_from_slice(PACKAGES);
        apt(&install)?;

        Ok(Outcome::Done(format!("{} packages installed", PACKAGES.len())))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        let missing: Vec<_> = REQUIRED_BINARIES
            .iter()
            .filter(|b| !ctx.host.command_exists(b))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::Other(format!(
                "missing after install: {}",
                missing.join(", ")
            )))
        }
    }

    fn hint(&self) -> &'static str {
        "check network access and the apt output above, then re-run with --resume"
    }
}
