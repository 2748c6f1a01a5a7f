use std::fmt::{self, Write as _};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::config::ProvisioningConfig;

/// Address the supervised process listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bind {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl Bind {
    /// Loopback on the application port. Only the proxy is
    /// reachable from outside.
    pub const DEFAULT: Self = Self {
        addr: Ipv4Addr::LOCALHOST,
        port: 8000,
    };

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{self}")
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Restart on failure, with a bounded burst inside a sliding
/// interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub delay_secs: u32,
    pub burst: u32,
    pub interval_secs: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay_secs: 5,
            burst: 5,
            interval_secs: 60,
        }
    }
}

/// How systemd starts, restarts, and confines the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorDescriptor {
    pub service: String,
    pub description: String,
    pub user: String,
    pub working_dir: PathBuf,
    pub env_file: PathBuf,
    pub server: PathBuf,
    pub entrypoint: String,
    pub bind: Bind,
    pub workers: u32,
    pub restart: RestartPolicy,
    pub writable_paths: Vec<PathBuf>,
}

impl SupervisorDescriptor {
    #[must_use]
    pub fn for_config(config: &ProvisioningConfig) -> Self {
        Self {
            service: config.service_name().to_string(),
            description: format!("{} web application", config.service_name()),
            user: config.app_user().to_string(),
            working_dir: config.app_dir().to_path_buf(),
            env_file: config.env_file_path(),
            server: config.venv_dir().join("bin").join("uvicorn"),
            entrypoint: "app.main:app".to_string(),
            bind: Bind::DEFAULT,
            workers: 1,
            restart: RestartPolicy::default(),
            writable_paths: vec![config.data_dir().to_path_buf(), config.app_dir().to_path_buf()],
        }
    }

    #[must_use]
    pub fn exec_start(&self) -> String {
        format!(
            "{} {} --host {} --port {} --workers {}",
            self.server.display(),
            self.entrypoint,
            self.bind.addr,
            self.bind.port,
            self.workers
        )
    }

    /// Render the unit file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sections: IndexMap<&str, Vec<(&str, String)>> = IndexMap::new();

        sections.insert(
            "Unit",
            vec![
                ("Description", self.description.clone()),
                ("After", "network.target".to_string()),
                ("StartLimitIntervalSec", self.restart.interval_secs.to_string()),
                ("StartLimitBurst", self.restart.burst.to_string()),
            ],
        );

        let writable = self
            .writable_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");

        sections.insert(
            "Service",
            vec![
                ("Type", "simple".to_string()),
                ("User", self.user.clone()),
                ("Group", self.user.clone()),
                ("WorkingDirectory", self.working_dir.display().to_string()),
                ("EnvironmentFile", self.env_file.display().to_string()),
                ("ExecStart", self.exec_start()),
                ("Restart", "on-failure".to_string()),
                ("RestartSec", self.restart.delay_secs.to_string()),
                ("NoNewPrivileges", "true".to_string()),
                ("PrivateTmp", "true".to_string()),
                ("ProtectSystem", "strict".to_string()),
                ("ReadWritePaths", writable),
                ("StandardOutput", "journal".to_string()),
                ("StandardError", "journal".to_string()),
                ("SyslogIdentifier", self.service.clone()),
            ],
        );

        sections.insert("Install", vec![("WantedBy", "multi-user.target".to_string())]);

        let mut out = String::from("# Managed by trebuchet. Changes are overwritten on re-run.\n");
        for (i, (name, entries)) in sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{name}]");
            for (key, value) in entries {
                let _ = writeln!(out, "{key}={value}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Domain, Settings};

    fn descriptor() -> SupervisorDescriptor {
        let config = ProvisioningConfig::new(
            Settings::default().repo_url("https://git.example.org/hoops.git"),
            Domain::Unset,
            false,
            None,
            Some("203.0.113.7"),
        );
        SupervisorDescriptor::for_config(&config)
    }

    #[test]
    fn bind_is_loopback_8000() {
        assert_eq!(Bind::DEFAULT.to_string(), "127.0.0.1:8000");
        assert_eq!(Bind::DEFAULT.url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn exec_start_single_worker() {
        assert_eq!(
            descriptor().exec_start(),
            "/opt/hoops/venv/bin/uvicorn app.main:app --host 127.0.0.1 --port 8000 --workers 1"
        );
    }

    #[test]
    fn restart_policy_lines() {
        let unit = descriptor().render();

        assert!(unit.contains("Restart=on-failure\n"));
        assert!(unit.contains("RestartSec=5\n"));
        assert!(unit.contains("StartLimitBurst=5\n"));
        assert!(unit.contains("StartLimitIntervalSec=60\n"));
    }

    #[test]
    fn isolation_lines() {
        let unit = descriptor().render();

        assert!(unit.contains("NoNewPrivileges=true\n"));
        assert!(unit.contains("PrivateTmp=true\n"));
        assert!(unit.contains("ProtectSystem=strict\n"));
        assert!(unit.contains("ReadWritePaths=/var/lib/hoops /opt/hoops\n"));
        assert!(unit.contains("EnvironmentFile=/opt/hoops/.env\n"));
        assert!(unit.contains("User=hoops\n"));
    }

    #[test]
    fn sections_in_order() {
        let unit = descriptor().render();
        let unit_at = unit.find("[Unit]").unwrap();
        let service_at = unit.find("[Service]").unwrap();
        let install_at = unit.find("[Install]").unwrap();

        assert!(unit_at < service_at && service_at < install_at);
    }
}
