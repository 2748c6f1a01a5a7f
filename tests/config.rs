mod common;

use std::io::Write;

use trebuchet::config::{Domain, IP_PLACEHOLDER, ProvisioningConfig, Settings};
use trebuchet::error::ProvisionError;

use common::{IP, REPO, config, settings};

#[test]
fn no_domain_serves_ip_over_http_only() {
    let config = config("", false);

    assert_eq!(config.domain(), &Domain::Unset);
    assert_eq!(config.server_name(), IP);
    assert_eq!(config.allowed_origins(), [format!("http://{IP}")]);
    assert_eq!(config.proxy_server_name(), "_");
}

#[test]
fn domain_allows_both_schemes() {
    let config = config("example.org", false);

    assert_eq!(
        config.allowed_origins(),
        ["http://example.org", "https://example.org"]
    );
    assert_eq!(config.access_url(false), "http://example.org");
}

#[test]
fn failed_ip_lookup_uses_placeholder() {
    let config = ProvisioningConfig::new(settings(), Domain::Unset, false, None, None);

    assert_eq!(config.server_name(), IP_PLACEHOLDER);
    assert_eq!(config.allowed_origins(), ["http://YOUR_SERVER_IP"]);
}

#[test]
fn ip_ignored_when_domain_set() {
    let config = config("example.org", false);

    assert_eq!(config.server_name(), "example.org");
    assert!(config.allowed_origins().iter().all(|o| !o.contains(IP)));
}

#[test]
fn tls_without_domain_is_disabled() {
    let config = ProvisioningConfig::new(
        settings(),
        Domain::Unset,
        true,
        Some("ops@example.org".into()),
        Some(IP),
    );

    assert!(!config.ssl_enabled());
    assert_eq!(config.ssl_email(), None);
}

#[test]
fn fixed_paths_follow_settings() {
    let config = config("", false);

    assert_eq!(config.env_file_path().to_str(), Some("/opt/hoops/.env"));
    assert_eq!(config.db_path().to_str(), Some("/var/lib/hoops/hoops.db"));
    assert_eq!(
        config.unit_path().to_str(),
        Some("/etc/systemd/system/hoops.service")
    );
    assert_eq!(
        config.site_enabled_path().to_str(),
        Some("/etc/nginx/sites-enabled/hoops")
    );
    assert_eq!(
        config.deploy_helper_path().to_str(),
        Some("/usr/local/bin/hoops-deploy")
    );
    assert_eq!(
        config.checkpoint_path().to_str(),
        Some("/var/lib/trebuchet/hoops.checkpoint.json")
    );
}

#[test]
fn load_yaml_settings() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "repo_url: {REPO}").unwrap();
    writeln!(file, "branch: main").unwrap();
    writeln!(file, "app_user: courts").unwrap();
    writeln!(file, "app_dir: /srv/courts").unwrap();
    writeln!(file, "demo_mode: true").unwrap();

    let settings = Settings::load(Some(file.path())).unwrap();

    assert_eq!(settings.repo_url, REPO);
    assert_eq!(settings.branch.as_deref(), Some("main"));
    assert_eq!(settings.app_user, "courts");
    assert_eq!(settings.app_dir.to_str(), Some("/srv/courts"));
    assert!(settings.demo_mode);
    assert_eq!(settings.data_dir.to_str(), Some("/var/lib/hoops"));
}

#[test]
fn unknown_setting_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "repo_url: {REPO}").unwrap();
    writeln!(file, "app_port: 9000").unwrap();

    let err = Settings::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ProvisionError::Yaml(_)));
}

#[test]
fn missing_settings_file_is_config_error() {
    let err = Settings::load(Some(std::path::Path::new("/nonexistent/trebuchet.yaml"))).unwrap_err();
    assert!(matches!(err, ProvisionError::Config(_)));
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
fn validate_rejects_bad_account_name() {
    assert!(settings().app_user("Hoops App").validate().is_err());
    assert!(settings().app_user("-hoops").validate().is_err());
    assert!(settings().app_user("hoops_app-2").validate().is_ok());
}
