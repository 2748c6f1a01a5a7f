use std::path::PathBuf;

use crate::config::ProvisioningConfig;

/// Rotation policy for the application's own log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub pattern: PathBuf,
    pub user: String,
    pub keep: u32,
}

impl RotationPolicy {
    #[must_use]
    pub fn for_config(config: &ProvisioningConfig) -> Self {
        Self {
            pattern: config.log_dir().join("*.log"),
            user: config.app_user().to_string(),
            keep: 14,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "# Managed by trebuchet. Changes are overwritten on re-run.\n\
             {pattern} {{\n    \
                 daily\n    \
                 rotate {keep}\n    \
                 compress\n    \
                 delaycompress\n    \
                 missingok\n    \
                 notifempty\n    \
                 copytruncate\n    \
                 su {user} {user}\n    \
                 create 0640 {user} {user}\n\
             }}\n",
            pattern = self.pattern.display(),
            keep = self.keep,
            user = self.user,
        )
    }
}
