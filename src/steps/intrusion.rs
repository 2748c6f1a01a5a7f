use std::path::PathBuf;

use crate::error::ProvisionResult;
use crate::host::FileSpec;
use crate::step::{Context, Outcome, Step};

/// Static fail2ban thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailConfig {
    pub ban_secs: u32,
    pub find_secs: u32,
    pub max_retry: u32,
}

impl Default for JailConfig {
    fn default() -> Self {
        Self {
            ban_secs: 3600,
            find_secs: 600,
            max_retry: 5,
        }
    }
}

impl JailConfig {
    /// Render `jail.local`: SSH brute force plus clients tripping
    /// the proxy rate limit.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "# Managed by trebuchet. Changes are overwritten on re-run.\n\
             [DEFAULT]\n\
             bantime = {ban}\n\
             findtime = {find}\n\
             maxretry = {retry}\n\
             backend = systemd\n\
             \n\
             [sshd]\n\
             enabled = true\n\
             port = ssh\n\
             \n\
             [nginx-limit-req]\n\
             enabled = true\n\
             port = http,https\n\
             backend = auto\n\
             logpath = /var/log/nginx/error.log\n",
            ban = self.ban_secs,
            find = self.find_secs,
            retry = self.max_retry,
        )
    }
}

pub struct IntrusionPrevention {
    pub jail: JailConfig,
    pub path: PathBuf,
}

impl Default for IntrusionPrevention {
    fn default() -> Self {
        Self {
            jail: JailConfig::default(),
            path: PathBuf::from("/etc/fail2ban/jail.local"),
        }
    }
}

impl Step for IntrusionPrevention {
    fn name(&self) -> &'static str {
        "intrusion prevention"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        ctx.host
            .write_file(&self.path, &self.jail.render(), &FileSpec::root(0o644))?;
        ctx.host.run("systemctl", &["enable", "fail2ban"])?;
        ctx.host.run("systemctl", &["restart", "fail2ban"])?;

        Ok(Outcome::Done(format!(
            "fail2ban: {} retries in {}s bans for {}s",
            self.jail.max_retry, self.jail.find_secs, self.jail.ban_secs
        )))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        ctx.probe.service_active(ctx.host, "fail2ban")
    }

    fn hint(&self) -> &'static str {
        "run `fail2ban-client -d` to locate the jail error, then re-run with --resume"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_rendered() {
        let rendered = JailConfig::default().render();

        assert!(rendered.contains("bantime = 3600\n"));
        assert!(rendered.contains("findtime = 600\n"));
        assert!(rendered.contains("maxretry = 5\n"));
        assert!(rendered.contains("[sshd]\nenabled = true\n"));
    }
}
