//! Resumable run state.
//!
//! A checkpoint is created when a run starts, saved after every
//! step, and removed once the run completes cleanly. A leftover
//! file therefore means the previous run was interrupted or failed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProvisioningConfig;
use crate::error::ProvisionResult;
use crate::host::{FileSpec, Host};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(skip)]
    path: PathBuf,
    pub config: ProvisioningConfig,
    pub completed: Vec<String>,
    pub failed_step: Option<String>,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(path: &Path, config: ProvisioningConfig) -> Self {
        let now = Utc::now();
        Self {
            path: path.to_path_buf(),
            config,
            completed: Vec::new(),
            failed_step: None,
            last_error: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Load the checkpoint at `path`, if one was left behind.
    pub fn load(host: &dyn Host, path: &Path) -> ProvisionResult<Option<Self>> {
        if !host.exists(path) {
            return Ok(None);
        }
        let content = host.read_file(path)?;
        let mut checkpoint: Self = serde_json::from_str(&content)?;
        checkpoint.path = path.to_path_buf();
        Ok(Some(checkpoint))
    }

    pub fn save(&mut self, host: &dyn Host) -> ProvisionResult<()> {
        self.updated_at = Utc::now();
        let content = serde_json::to_string_pretty(self)?;
        host.write_file(&self.path, &content, &FileSpec::root(0o600))?;
        debug!(path = %self.path.display(), completed = self.completed.len(), "checkpoint saved");
        Ok(())
    }

    pub fn discard(&self, host: &dyn Host) -> ProvisionResult<()> {
        host.remove_file(&self.path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_completed(&self, step: &str) -> bool {
        self.completed.iter().any(|s| s == step)
    }

    pub fn complete(&mut self, step: &str) {
        if !self.is_completed(step) {
            self.completed.push(step.to_string());
        }
        self.failed_step = None;
        self.last_error = None;
    }

    pub fn fail(&mut self, step: &str, error: &str) {
        self.failed_step = Some(step.to_string());
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Domain, Settings};
    use crate::host::SystemHost;

    fn config() -> ProvisioningConfig {
        ProvisioningConfig::new(
            Settings::default().repo_url("https://git.example.org/hoops.git"),
            Domain::parse("example.org").unwrap(),
            true,
            Some("ops@example.org".into()),
            Some("203.0.113.7"),
        )
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoops.checkpoint.json");
        let host = SystemHost::new();

        let mut checkpoint = Checkpoint::new(&path, config());
        checkpoint.complete("baseline");
        checkpoint.complete("firewall");
        checkpoint.fail("intrusion prevention", "command failed: systemctl restart fail2ban");
        checkpoint.save(&host).unwrap();

        let loaded = Checkpoint::load(&host, &path).unwrap().unwrap();
        assert_eq!(loaded.config, config());
        assert_eq!(loaded.completed, vec!["baseline", "firewall"]);
        assert_eq!(loaded.failed_step.as_deref(), Some("intrusion prevention"));
        assert_eq!(loaded.path(), path);
    }

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let host = SystemHost::new();

        assert!(Checkpoint::load(&host, &dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn complete_is_idempotent_and_clears_failure() {
        let mut checkpoint = Checkpoint::new(Path::new("/tmp/x.json"), config());
        checkpoint.fail("baseline", "boom");
        checkpoint.complete("baseline");
        checkpoint.complete("baseline");

        assert_eq!(checkpoint.completed, vec!["baseline"]);
        assert!(checkpoint.failed_step.is_none());
        assert!(checkpoint.last_error.is_none());
    }
}
