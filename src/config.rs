use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// Server name used by the proxy when no domain is configured.
pub const NO_DOMAIN: &str = "_";

/// Stand-in for the public address when it cannot be discovered.
pub const IP_PLACEHOLDER: &str = "YOUR_SERVER_IP";

/// Deploy-time settings that are not asked interactively.
///
/// Loaded from an optional YAML file; every field has a default
/// except `repo_url`.
///
/// ```
/// use trebuchet::config::Settings;
///
/// let settings: Settings =
///     serde_yaml::from_str("repo_url: https://git.example.org/hoops.git\n").unwrap();
///
/// assert_eq!(settings.app_user, "hoops");
/// assert_eq!(settings.app_dir.to_str(), Some("/opt/hoops"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub repo_url: String,
    pub branch: Option<String>,
    pub app_user: String,
    pub app_dir: PathBuf,
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub demo_mode: bool,
    pub state_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            branch: None,
            app_user: "hoops".to_string(),
            app_dir: PathBuf::from("/opt/hoops"),
            data_dir: PathBuf::from("/var/lib/hoops"),
            backup_dir: PathBuf::from("/var/backups/hoops"),
            demo_mode: false,
            state_dir: PathBuf::from("/var/lib/trebuchet"),
        }
    }
}

impl Settings {
    /// Read settings from `path`, or return the defaults when no
    /// file is given.
    pub fn load(path: Option<&Path>) -> ProvisionResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings: Self = serde_yaml::from_str(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    #[must_use]
    pub fn repo_url(mut self, url: &str) -> Self {
        self.repo_url = url.to_string();
        self
    }

    #[must_use]
    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    #[must_use]
    pub fn app_user(mut self, user: &str) -> Self {
        self.app_user = user.to_string();
        self
    }

    #[must_use]
    pub fn app_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.app_dir = dir.into();
        self
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    #[must_use]
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    #[must_use]
    pub const fn demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    /// Reject settings that would generate broken artifacts.
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.repo_url.trim().is_empty() {
            return Err(ProvisionError::Config(
                "repo_url is required (--repo-url, TREBUCHET_REPO_URL or config file)".into(),
            ));
        }
        let valid_user = !self.app_user.is_empty()
            && self
                .app_user
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            && !self.app_user.starts_with('-');
        if !valid_user {
            return Err(ProvisionError::Config(format!(
                "app_user '{}' is not a valid account name",
                self.app_user
            )));
        }
        for (field, dir) in [
            ("app_dir", &self.app_dir),
            ("data_dir", &self.data_dir),
            ("backup_dir", &self.backup_dir),
            ("state_dir", &self.state_dir),
        ] {
            if !dir.is_absolute() {
                return Err(ProvisionError::Config(format!(
                    "{field} must be an absolute path, got {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// The public name the deployment answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Unset,
    Named(String),
}

impl Domain {
    /// Normalize operator input. Blank input and the `_`
    /// sentinel both mean "no domain"; anything else must be a bare
    /// hostname.
    pub fn parse(input: &str) -> ProvisionResult<Self> {
        let trimmed = input.trim().trim_end_matches('.');
        if trimmed.is_empty() || trimmed == NO_DOMAIN {
            return Ok(Self::Unset);
        }
        if trimmed.contains("://") {
            return Err(ProvisionError::Config(format!(
                "domain '{trimmed}' must be a bare hostname without a scheme, e.g. example.org"
            )));
        }
        let name = trimmed.to_ascii_lowercase();
        let valid = name.len() <= 253
            && name.split('.').all(|label| {
                (1..=63).contains(&label.len())
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label
                        .bytes()
                        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
            });
        if !valid {
            return Err(ProvisionError::Config(format!(
                "domain '{trimmed}' is not a valid hostname"
            )));
        }
        Ok(Self::Named(name))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Named(name) => Some(name),
        }
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or(NO_DOMAIN))
    }
}

/// Everything a provisioning run needs, captured once and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    settings: Settings,
    domain: Domain,
    ssl_enabled: bool,
    ssl_email: Option<String>,
    public_ip: Option<String>,
    server_name: String,
    allowed_origins: Vec<String>,
}

impl ProvisioningConfig {
    /// Build the configuration and compute the derived fields.
    ///
    /// TLS is only meaningful with a domain, so an opt-in without
    /// one is dropped. `public_ip` is only consulted when no domain
    /// is set; a failed lookup falls back to [`IP_PLACEHOLDER`].
    #[must_use]
    pub fn new(
        settings: Settings,
        domain: Domain,
        ssl_enabled: bool,
        ssl_email: Option<String>,
        public_ip: Option<&str>,
    ) -> Self {
        let ssl_enabled = if ssl_enabled && !domain.is_set() {
            warn!("TLS requested without a domain; continuing over plain HTTP");
            false
        } else {
            ssl_enabled
        };
        let ssl_email = if ssl_enabled {
            ssl_email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
        } else {
            None
        };

        let (server_name, allowed_origins) = domain.name().map_or_else(
            || {
                let ip = public_ip.unwrap_or(IP_PLACEHOLDER);
                (ip.to_string(), vec![format!("http://{ip}")])
            },
            |name| {
                (
                    name.to_string(),
                    vec![format!("http://{name}"), format!("https://{name}")],
                )
            },
        );

        Self {
            settings,
            domain,
            ssl_enabled,
            ssl_email,
            public_ip: public_ip.map(ToString::to_string),
            server_name,
            allowed_origins,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    #[must_use]
    pub const fn ssl_enabled(&self) -> bool {
        self.ssl_enabled
    }

    #[must_use]
    pub fn ssl_email(&self) -> Option<&str> {
        self.ssl_email.as_deref()
    }

    #[must_use]
    pub fn public_ip(&self) -> Option<&str> {
        self.public_ip.as_deref()
    }

    /// Domain when set, otherwise the public address.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Origins permitted to make cross-origin requests.
    #[must_use]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Proxy `server_name` value: the domain, or `_` to match any
    /// host header.
    #[must_use]
    pub fn proxy_server_name(&self) -> String {
        self.domain.to_string()
    }

    /// External URL operators and e-mailed links should use.
    #[must_use]
    pub fn access_url(&self, tls_active: bool) -> String {
        let scheme = if tls_active { "https" } else { "http" };
        format!("{scheme}://{}", self.server_name)
    }

    #[must_use]
    pub fn app_user(&self) -> &str {
        &self.settings.app_user
    }

    /// The service principal also names the supervised unit.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.settings.app_user
    }

    #[must_use]
    pub fn app_dir(&self) -> &Path {
        &self.settings.app_dir
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.settings.data_dir
    }

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.settings.backup_dir
    }

    #[must_use]
    pub fn env_file_path(&self) -> PathBuf {
        self.settings.app_dir.join(".env")
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.settings.data_dir.join("hoops.db")
    }

    #[must_use]
    pub fn venv_dir(&self) -> PathBuf {
        self.settings.app_dir.join("venv")
    }

    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.settings.data_dir.join("logs")
    }

    #[must_use]
    pub fn unit_path(&self) -> PathBuf {
        PathBuf::from(format!("/etc/systemd/system/{}.service", self.service_name()))
    }

    #[must_use]
    pub fn rate_limit_zone_path(&self) -> PathBuf {
        PathBuf::from(format!("/etc/nginx/conf.d/{}-ratelimit.conf", self.app_user()))
    }

    #[must_use]
    pub fn site_available_path(&self) -> PathBuf {
        PathBuf::from("/etc/nginx/sites-available").join(self.app_user())
    }

    #[must_use]
    pub fn site_enabled_path(&self) -> PathBuf {
        PathBuf::from("/etc/nginx/sites-enabled").join(self.app_user())
    }

    #[must_use]
    pub fn backup_cron_path(&self) -> PathBuf {
        PathBuf::from(format!("/etc/cron.d/{}-backup", self.app_user()))
    }

    #[must_use]
    pub fn deploy_helper_path(&self) -> PathBuf {
        PathBuf::from(format!("/usr/local/bin/{}-deploy", self.app_user()))
    }

    #[must_use]
    pub fn logrotate_path(&self) -> PathBuf {
        PathBuf::from("/etc/logrotate.d").join(self.app_user())
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.settings
            .state_dir
            .join(format!("{}.checkpoint.json", self.app_user()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default().repo_url("https://git.example.org/hoops.git")
    }

    #[test]
    fn blank_domain_is_unset() {
        assert_eq!(Domain::parse("   ").unwrap(), Domain::Unset);
        assert_eq!(Domain::parse("_").unwrap(), Domain::Unset);
        assert_eq!(
            Domain::parse("Example.ORG.").unwrap(),
            Domain::Named("example.org".into())
        );
    }

    #[test]
    fn domain_must_be_bare_hostname() {
        let long_label = format!("{}.org", "a".repeat(64));
        for bad in [
            "https://example.org",
            "example.org/app",
            "example.org:8443",
            "exa mple.org",
            "-example.org",
            "example..org",
            long_label.as_str(),
        ] {
            assert!(
                matches!(Domain::parse(bad), Err(ProvisionError::Config(_))),
                "{bad} accepted"
            );
        }
        assert!(Domain::parse("api-1.example.org").is_ok());
    }

    #[test]
    fn unset_domain_displays_sentinel() {
        assert_eq!(Domain::Unset.to_string(), "_");
    }

    #[test]
    fn ssl_without_domain_is_dropped() {
        let config = ProvisioningConfig::new(
            settings(),
            Domain::Unset,
            true,
            Some("ops@example.org".into()),
            Some("203.0.113.7"),
        );

        assert!(!config.ssl_enabled());
        assert!(config.ssl_email().is_none());
    }

    #[test]
    fn blank_email_is_none() {
        let config = ProvisioningConfig::new(
            settings(),
            Domain::parse("example.org").unwrap(),
            true,
            Some("  ".into()),
            None,
        );

        assert!(config.ssl_enabled());
        assert!(config.ssl_email().is_none());
    }

    #[test]
    fn validate_requires_repo_url() {
        let err = Settings::default().validate().unwrap_err();
        assert!(err.to_string().contains("repo_url"));
    }

    #[test]
    fn validate_rejects_relative_dirs() {
        let err = settings().data_dir("data").validate().unwrap_err();
        assert!(err.to_string().contains("data_dir"));
    }

    #[test]
    fn validate_rejects_bad_user() {
        assert!(settings().app_user("Hoops App").validate().is_err());
        assert!(settings().app_user("-x").validate().is_err());
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn derived_paths() {
        let config =
            ProvisioningConfig::new(settings(), Domain::Unset, false, None, Some("203.0.113.7"));

        assert_eq!(config.env_file_path(), PathBuf::from("/opt/hoops/.env"));
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/hoops/hoops.db"));
        assert_eq!(
            config.unit_path(),
            PathBuf::from("/etc/systemd/system/hoops.service")
        );
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("/var/lib/trebuchet/hoops.checkpoint.json")
        );
    }
}
