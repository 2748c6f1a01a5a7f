use tracing::info;

use crate::env_file::EnvironmentFile;
use crate::error::{ProvisionError, ProvisionResult};
use crate::host::FileSpec;
use crate::step::{Context, Outcome, Step};
use crate::ui;

/// Certificate issuance against the active site, then the https
/// switch in the environment file.
///
/// Renewal is left to the timer certbot installs itself.
pub struct Tls;

impl Step for Tls {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn skip_reason(&self, ctx: &Context<'_>) -> Option<String> {
        if !ctx.config.domain().is_set() {
            Some("no domain configured".into())
        } else if !ctx.config.ssl_enabled() {
            Some("TLS not requested".into())
        } else {
            None
        }
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let domain = ctx
            .config
            .domain()
            .name()
            .ok_or_else(|| ProvisionError::Other("TLS requires a domain".into()))?;

        let mut args = vec![
            "--nginx",
            "--non-interactive",
            "--agree-tos",
            "--redirect",
            "-d",
            domain,
        ];
        match ctx.config.ssl_email() {
            Some(email) => args.extend(["-m", email]),
            None => args.push("--register-unsafely-without-email"),
        }
        ctx.host.run("certbot", &args)?;
        ui::detail(&format!("certificate issued for {domain}"));

        let path = ctx.config.env_file_path();
        let mut env = EnvironmentFile::parse(&ctx.host.read_file(&path)?);
        if env.upgrade_origins(domain) {
            ctx.host.write_file(
                &path,
                &env.render(),
                &FileSpec::owned_by(ctx.config.app_user(), 0o600),
            )?;
            info!(origins = ?env.origins(), "origins switched to https");
        }

        let service = ctx.config.service_name();
        ctx.host.run("systemctl", &["restart", service])?;
        ctx.probe.service_active(ctx.host, service)?;
        ctx.tls_active = true;

        Ok(Outcome::Done(format!("https://{domain} live, http redirects")))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        let Some(domain) = ctx.config.domain().name() else {
            return Ok(());
        };
        let env = EnvironmentFile::parse(&ctx.host.read_file(&ctx.config.env_file_path())?);
        let insecure = format!("http://{domain}");
        if env.origins().contains(&insecure) {
            return Err(ProvisionError::Other(format!(
                "{insecure} still listed as an allowed origin"
            )));
        }
        Ok(())
    }

    fn hint(&self) -> &'static str {
        "make sure the domain's A record points at this host, then re-run with --resume"
    }
}
