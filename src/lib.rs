//! Provision a bare Linux host into a running web deployment.
//!
//! Trebuchet takes a freshly installed Debian or Ubuntu machine and
//! turns it into a firewalled, supervised, reverse-proxied
//! deployment of the `hoops` web application, in one command run
//! on the host itself.
//!
//! # Overview
//!
//! A run is a fixed, ordered list of [`Step`]s driven by the
//! [`Executor`]:
//!
//! 1. **Baseline** - refresh packages and install the toolchain
//! 2. **Firewall / intrusion prevention** - ufw and fail2ban
//! 3. **Principal** - a system account and its directories
//! 4. **Source / runtime** - clone the repository and build a
//!    virtualenv
//! 5. **Secrets** - a fresh signing key and the `.env` file
//! 6. **Service** - a hardened systemd unit, polled until active
//! 7. **Reverse proxy / TLS** - nginx with rate limiting, then
//!    certbot when a domain is set
//! 8. **Backups, deploy helper, log rotation, summary**
//!
//! Every host interaction goes through the [`Host`] trait, so the
//! whole sequence can be exercised in tests against a recording
//! stub. Generated files are typed values ([`SupervisorDescriptor`],
//! [`ProxySite`], [`EnvironmentFile`], [`BackupSchedule`]) rendered
//! by a serializer per kind; the proxy upstream is taken from the
//! service descriptor, so the two can never disagree on the port.
//!
//! # Usage
//!
//! ```sh
//! # Interactive
//! sudo trebuchet provision --repo-url https://git.example.org/hoops.git
//!
//! # Unattended, with TLS
//! sudo trebuchet provision --repo-url https://git.example.org/hoops.git \
//!     --domain hoops.example.org --ssl --email ops@example.org --yes
//!
//! # Continue after a failure was fixed
//! sudo trebuchet provision --resume
//!
//! # Preview the generated files
//! trebuchet render --domain hoops.example.org --ssl
//!
//! # Ship new code
//! sudo trebuchet redeploy
//! ```
//!
//! # Library use
//!
//! ```rust,no_run
//! use trebuchet::{Pipeline, SystemHost};
//!
//! fn main() -> anyhow::Result<()> {
//!     let host = SystemHost::new();
//!     Pipeline::new(&host).run()?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// provisioning tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod artifacts;
pub mod capture;
pub mod checkpoint;
pub mod cmd;
pub mod config;
pub mod env_file;
pub mod error;
pub mod helper;
pub mod host;
pub mod logrotate;
pub mod nginx;
pub mod pipeline;
pub mod preflight;
pub mod probe;
pub mod proxy;
pub mod schedule;
pub mod secret;
pub mod step;
pub mod steps;
pub mod systemd;
pub mod ui;

pub use artifacts::Artifacts;
pub use capture::{Answers, Capture, Prompter, TerminalPrompter};
pub use config::{Domain, ProvisioningConfig, Settings};
pub use env_file::EnvironmentFile;
pub use error::{ProvisionError, ProvisionResult};
pub use host::{FileSpec, Host, SystemHost};
pub use pipeline::{Pipeline, RunOutcome};
pub use proxy::ProxySite;
pub use schedule::BackupSchedule;
pub use step::{Context, Executor, Step};
pub use systemd::SupervisorDescriptor;
