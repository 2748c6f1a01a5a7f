use crate::config::IP_PLACEHOLDER;
use crate::env_file::{BASE_URL, EnvironmentFile};
use crate::error::ProvisionResult;
use crate::step::{Context, Outcome, Step};
use crate::ui;

/// Report where the deployment lives and how to operate it.
pub struct Summary;

impl Summary {
    /// The URL the deployment actually serves, read back from the
    /// environment file so a resumed run reports https correctly.
    #[must_use]
    pub fn access_url(ctx: &Context<'_>) -> String {
        ctx.host
            .read_file(&ctx.config.env_file_path())
            .ok()
            .and_then(|content| {
                EnvironmentFile::parse(&content)
                    .get(BASE_URL)
                    .filter(|v| !v.is_empty())
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| ctx.config.access_url(ctx.tls_active))
    }
}

impl Step for Summary {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let config = ctx.config;
        let service = config.service_name();
        let url = Self::access_url(ctx);

        ui::section("Deployment ready");
        ui::info(&format!("URL:          {url}"));
        ui::info(&format!("Environment:  {}", config.env_file_path().display()));
        ui::info(&format!("Database:     {}", config.db_path().display()));
        ui::info(&format!("Backups:      {}", config.backup_dir().display()));
        eprintln!();
        ui::info("Operator commands:");
        ui::detail(&format!("systemctl status {service}"));
        ui::detail(&format!("journalctl -u {service} -f"));
        ui::detail(&format!("sudo {}", config.deploy_helper_path().display()));
        ui::detail("sudo nginx -t && sudo systemctl reload nginx");
        ui::detail("sudo ufw status verbose");
        ui::detail("sudo fail2ban-client status");

        if config.server_name() == IP_PLACEHOLDER {
            ui::warning("public IP could not be discovered; replace YOUR_SERVER_IP in the allowed origins");
        }
        if config.domain().is_set() && !url.starts_with("https://") {
            ui::info(&format!(
                "enable TLS later with: sudo certbot --nginx -d {}",
                config.domain()
            ));
        }

        Ok(Outcome::Done(format!("serving {url}")))
    }

    fn hint(&self) -> &'static str {
        "the deployment itself is complete; only the report failed"
    }

    fn checkpointed(&self) -> bool {
        false
    }
}
