use trebuchet::error::ProvisionError;

#[test]
fn display_command_not_found() {
    let err = ProvisionError::CommandNotFound("nginx".into());
    assert_eq!(err.to_string(), "command not found: nginx");
}

#[test]
fn display_command_failed() {
    let err = ProvisionError::CommandFailed {
        command: "systemctl restart hoops".into(),
        status: None,
        stderr: "Job failed".into(),
    };
    assert_eq!(err.to_string(), "command failed: systemctl restart hoops");
}

#[test]
fn display_validation() {
    let err = ProvisionError::Validation("unknown directive \"lmit_req\"".into());
    assert_eq!(
        err.to_string(),
        "configuration rejected by validator: unknown directive \"lmit_req\""
    );
}

#[test]
fn display_liveness() {
    let err = ProvisionError::Liveness("hoops".into(), 15);
    assert_eq!(err.to_string(), "'hoops' did not become healthy after 15 attempts");
}

#[test]
fn display_config() {
    let err = ProvisionError::Config("repo_url is required".into());
    assert_eq!(err.to_string(), "invalid configuration: repo_url is required");
}

#[test]
fn display_other() {
    let err = ProvisionError::Other("custom error".into());
    assert_eq!(err.to_string(), "custom error");
}

#[test]
fn preflight_carries_sudo_hint() {
    let err = ProvisionError::Preflight("needs root".into());

    assert_eq!(err.to_string(), "insufficient privilege: needs root");
    assert!(err.hint().unwrap().contains("sudo"));
}

#[test]
fn step_failure_wraps_cause_and_hint() {
    let err = ProvisionError::Validation("bad".into()).in_step("reverse proxy", "run nginx -t");

    assert_eq!(
        err.to_string(),
        "step 'reverse proxy' failed: configuration rejected by validator: bad"
    );
    assert_eq!(err.hint(), Some("run nginx -t"));
    assert!(matches!(err.root_cause(), ProvisionError::Validation(_)));
}

#[test]
fn plain_errors_have_no_hint() {
    assert!(ProvisionError::Other("x".into()).hint().is_none());
}

#[test]
fn source_chain_reaches_cause() {
    use std::error::Error;

    let err = ProvisionError::Other("inner".into()).in_step("tls", "fix DNS");
    assert_eq!(err.source().unwrap().to_string(), "inner");
}

#[test]
fn from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: ProvisionError = io_err.into();
    assert!(matches!(err, ProvisionError::Io(_)));
}

#[test]
fn from_json_error() {
    let json_err = serde_json::from_str::<Vec<u64>>("invalid").unwrap_err();
    let err: ProvisionError = json_err.into();
    assert!(matches!(err, ProvisionError::Json(_)));
}

#[test]
fn from_yaml_error() {
    let yaml_err = serde_yaml::from_str::<Vec<u64>>("{not: a list}").unwrap_err();
    let err: ProvisionError = yaml_err.into();
    assert!(matches!(err, ProvisionError::Yaml(_)));
}
