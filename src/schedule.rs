use std::fmt;

use crate::config::ProvisioningConfig;

/// Snapshots younger than this are never pruned.
pub const RETENTION_DAYS: u32 = 30;

/// One `/etc/cron.d` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronJob {
    pub comment: String,
    pub minute: u8,
    pub hour: u8,
    /// `None` runs every day; `Some(0)` is Sunday.
    pub weekday: Option<u8>,
    pub user: String,
    pub command: String,
}

impl fmt::Display for CronJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weekday = self
            .weekday
            .map_or_else(|| "*".to_string(), |d| d.to_string());
        writeln!(f, "# {}", self.comment)?;
        write!(
            f,
            "{} {} * * {weekday} {} {}",
            self.minute,
            self.hour,
            self.user,
            escape_percent(&self.command)
        )
    }
}

/// Daily database snapshot plus weekly age-based prune.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSchedule {
    pub snapshot: CronJob,
    pub prune: CronJob,
}

impl BackupSchedule {
    #[must_use]
    pub fn for_config(config: &ProvisioningConfig) -> Self {
        let backups = config.backup_dir().display().to_string();
        let user = config.app_user().to_string();

        // Minute resolution: two snapshots in the same minute share
        // a name and the later copy wins. Copy failures are
        // swallowed so cron does not mail on a missing database.
        let snapshot = CronJob {
            comment: "Daily snapshot of the live database".to_string(),
            minute: 0,
            hour: 3,
            weekday: None,
            user: user.clone(),
            command: format!(
                "cp {} {backups}/hoops-$(date +%Y%m%d-%H%M).db 2>/dev/null || true",
                config.db_path().display()
            ),
        };

        let prune = CronJob {
            comment: format!("Weekly prune of snapshots older than {RETENTION_DAYS} days"),
            minute: 0,
            hour: 4,
            weekday: Some(0),
            user,
            command: format!(
                "find {backups} -maxdepth 1 -type f -name 'hoops-*.db' -mtime +{RETENTION_DAYS} -delete"
            ),
        };

        Self { snapshot, prune }
    }

    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "# Managed by trebuchet. Changes are overwritten on re-run.\n\
             SHELL=/bin/sh\n\
             PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin\n\
             \n\
             {}\n\
             {}\n",
            self.snapshot, self.prune
        )
    }
}

/// cron treats a bare `%` as a newline.
fn escape_percent(command: &str) -> String {
    command.replace('%', "\\%")
}
