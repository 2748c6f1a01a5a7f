use std::path::Path;

use crate::error::{ProvisionError, ProvisionResult};
use crate::host::FileSpec;
use crate::step::{Context, Outcome, Step};
use crate::ui;

const DEFAULT_SITE: &str = "/etc/nginx/sites-enabled/default";

/// Rate-limit zone plus site, activated only after `nginx -t`
/// accepts the whole configuration.
pub struct ReverseProxy;

impl Step for ReverseProxy {
    fn name(&self) -> &'static str {
        "reverse proxy"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let host = ctx.host;
        let site = &ctx.artifacts.site;
        let zone_path = ctx.config.rate_limit_zone_path();
        let available = ctx.config.site_available_path();
        let enabled = ctx.config.site_enabled_path();

        host.write_file(&zone_path, &site.zone.render(), &FileSpec::root(0o644))?;
        host.write_file(&available, &site.render(), &FileSpec::root(0o644))?;
        ui::detail(&format!("wrote {} and {}", zone_path.display(), available.display()));

        host.remove_file(Path::new(DEFAULT_SITE))?;
        host.symlink(&available, &enabled)?;

        // Nothing may reload nginx until the full config validates.
        if let Err(e) = host.run("nginx", &["-t"]) {
            let detail = match e {
                ProvisionError::CommandFailed { stderr, .. } if !stderr.is_empty() => stderr,
                other => other.to_string(),
            };
            return Err(ProvisionError::Validation(detail));
        }
        ui::detail("nginx -t passed");

        host.run("systemctl", &["enable", "nginx"])?;
        host.run("systemctl", &["reload-or-restart", "nginx"])?;

        Ok(Outcome::Done(format!(
            "{} -> {}",
            site.server_name,
            site.upstream()
        )))
    }

    fn hint(&self) -> &'static str {
        "run `nginx -t` for the exact error; the previously loaded config keeps serving until a reload"
    }
}
