use std::path::PathBuf;

use crate::config::ProvisioningConfig;
use crate::systemd::Bind;

/// Path of the application health endpoint.
pub const HEALTH_PATH: &str = "/api/health";

/// Everything the redeploy sequence needs, shared by the installed
/// script and the `redeploy` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeploy {
    pub service: String,
    pub user: String,
    pub app_dir: PathBuf,
    pub venv_dir: PathBuf,
    pub branch: Option<String>,
    pub health_url: String,
    pub attempts: u32,
    pub interval_secs: u32,
}

impl Redeploy {
    #[must_use]
    pub fn for_config(config: &ProvisioningConfig, bind: Bind) -> Self {
        Self {
            service: config.service_name().to_string(),
            user: config.app_user().to_string(),
            app_dir: config.app_dir().to_path_buf(),
            venv_dir: config.venv_dir(),
            branch: config.settings().branch.clone(),
            health_url: format!("{}{HEALTH_PATH}", bind.url()),
            attempts: 15,
            interval_secs: 2,
        }
    }

    #[must_use]
    pub fn requirements(&self) -> PathBuf {
        self.app_dir.join("requirements.txt")
    }

    #[must_use]
    pub fn pip(&self) -> PathBuf {
        self.venv_dir.join("bin").join("pip")
    }

    /// Render the standalone bash helper.
    #[must_use]
    pub fn render_script(&self) -> String {
        let pull = self.branch.as_ref().map_or_else(
            || "git -C \"$APP_DIR\" pull --ff-only".to_string(),
            |b| format!("git -C \"$APP_DIR\" pull --ff-only origin {b}"),
        );
        format!(
            r#"#!/usr/bin/env bash
# Managed by trebuchet. Changes are overwritten on re-run.
# Pull the latest source, resync dependencies, restart, and wait
# for the health endpoint.
set -euo pipefail

APP_DIR="{app_dir}"
APP_USER="{user}"
SERVICE="{service}"
HEALTH_URL="{health_url}"

if [ "$(id -u)" -ne 0 ]; then
    echo "run as root: sudo $0" >&2
    exit 1
fi

echo "==> Pulling latest source"
runuser -u "$APP_USER" -- {pull}

echo "==> Syncing dependencies"
runuser -u "$APP_USER" -- "{pip}" install --quiet -r "{requirements}"

echo "==> Restarting $SERVICE"
systemctl restart "$SERVICE"

echo "==> Waiting for $HEALTH_URL"
for _ in $(seq 1 {attempts}); do
    if curl -fsS --max-time 5 "$HEALTH_URL" >/dev/null 2>&1; then
        echo "Deploy OK"
        exit 0
    fi
    sleep {interval}
done

echo "Health check failed. Inspect logs: journalctl -u $SERVICE -n 100 --no-pager" >&2
exit 1
"#,
            app_dir = self.app_dir.display(),
            user = self.user,
            service = self.service,
            health_url = self.health_url,
            pip = self.pip().display(),
            requirements = self.requirements().display(),
            attempts = self.attempts,
            interval = self.interval_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Domain, Settings};

    fn redeploy(settings: Settings) -> Redeploy {
        let config = ProvisioningConfig::new(settings, Domain::Unset, false, None, Some("203.0.113.7"));
        Redeploy::for_config(&config, Bind::DEFAULT)
    }

    #[test]
    fn probes_service_health_endpoint() {
        let script = redeploy(Settings::default().repo_url("r")).render_script();

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("HEALTH_URL=\"http://127.0.0.1:8000/api/health\""));
        assert!(script.contains("journalctl -u $SERVICE"));
    }

    #[test]
    fn pulls_configured_branch() {
        let script = redeploy(Settings::default().repo_url("r").branch("main")).render_script();

        assert!(script.contains("pull --ff-only origin main"));
    }

    #[test]
    fn step_order() {
        let script = redeploy(Settings::default().repo_url("r")).render_script();
        let pull = script.find("git -C").unwrap();
        let sync = script.find("install --quiet").unwrap();
        let restart = script.find("systemctl restart").unwrap();
        let probe = script.find("curl -fsS").unwrap();

        assert!(pull < sync && sync < restart && restart < probe);
    }
}
