use std::path::PathBuf;

use crate::config::ProvisioningConfig;
use crate::env_file::EnvironmentFile;
use crate::helper::Redeploy;
use crate::logrotate::RotationPolicy;
use crate::proxy::ProxySite;
use crate::schedule::BackupSchedule;
use crate::secret::SecretMaterial;
use crate::steps::intrusion::IntrusionPrevention;
use crate::systemd::SupervisorDescriptor;

/// Every generated artifact except the environment file, derived
/// together from one configuration.
///
/// Building them in one place is what keeps the cross references
/// straight: the proxy and the redeploy probe both take their
/// upstream from the service descriptor's bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub service: SupervisorDescriptor,
    pub site: ProxySite,
    pub backups: BackupSchedule,
    pub redeploy: Redeploy,
    pub rotation: RotationPolicy,
}

impl Artifacts {
    #[must_use]
    pub fn for_config(config: &ProvisioningConfig) -> Self {
        let service = SupervisorDescriptor::for_config(config);
        let site = ProxySite::for_service(config, &service);
        let redeploy = Redeploy::for_config(config, service.bind);
        Self {
            site,
            redeploy,
            backups: BackupSchedule::for_config(config),
            rotation: RotationPolicy::for_config(config),
            service,
        }
    }

    /// Every file a run writes, in the order the steps write them,
    /// paired with its destination.
    #[must_use]
    pub fn files(&self, config: &ProvisioningConfig, secret: &SecretMaterial) -> Vec<(PathBuf, String)> {
        let jail = IntrusionPrevention::default();
        vec![
            (jail.path, jail.jail.render()),
            (
                config.env_file_path(),
                EnvironmentFile::for_config(config, secret).render(),
            ),
            (config.unit_path(), self.service.render()),
            (config.rate_limit_zone_path(), self.site.zone.render()),
            (config.site_available_path(), self.site.render()),
            (config.backup_cron_path(), self.backups.render()),
            (config.deploy_helper_path(), self.redeploy.render_script()),
            (config.logrotate_path(), self.rotation.render()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Domain, Settings};

    #[test]
    fn proxy_and_probe_target_service_port() {
        let config = ProvisioningConfig::new(
            Settings::default().repo_url("r"),
            Domain::parse("example.org").unwrap(),
            false,
            None,
            Some("203.0.113.7"),
        );
        let artifacts = Artifacts::for_config(&config);

        assert_eq!(artifacts.site.upstream(), artifacts.service.bind);
        assert_eq!(artifacts.service.bind.port, 8000);
        assert!(artifacts.redeploy.health_url.starts_with(&artifacts.service.bind.url()));
    }

    #[test]
    fn files_cover_every_destination_once() {
        let config = ProvisioningConfig::new(
            Settings::default().repo_url("r"),
            Domain::Unset,
            false,
            None,
            None,
        );
        let files = Artifacts::for_config(&config).files(&config, &SecretMaterial::from_hex("00"));
        let mut paths: Vec<_> = files.iter().map(|(p, _)| p.clone()).collect();
        paths.sort();
        paths.dedup();

        assert_eq!(paths.len(), files.len());
        assert!(paths.contains(&PathBuf::from("/etc/fail2ban/jail.local")));
        assert!(paths.contains(&PathBuf::from("/opt/hoops/.env")));
    }
}
