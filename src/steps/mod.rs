pub mod backup;
pub mod baseline;
pub mod deploy_helper;
pub mod firewall;
pub mod intrusion;
pub mod log_rotation;
pub mod principal;
pub mod reverse_proxy;
pub mod runtime;
pub mod secrets;
pub mod service;
pub mod source;
pub mod summary;
pub mod tls;

use crate::step::Step;

/// The full provisioning sequence, in execution order.
#[must_use]
pub fn plan() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(baseline::Baseline),
        Box::new(firewall::Firewall::default()),
        Box::new(intrusion::IntrusionPrevention::default()),
        Box::new(principal::Principal),
        Box::new(source::Source),
        Box::new(runtime::Runtime),
        Box::new(secrets::Secrets),
        Box::new(service::Service),
        Box::new(reverse_proxy::ReverseProxy),
        Box::new(tls::Tls),
        Box::new(backup::Backups),
        Box::new(deploy_helper::DeployHelper),
        Box::new(log_rotation::LogRotation),
        Box::new(summary::Summary),
    ]
}
