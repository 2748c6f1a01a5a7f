//! Interactive configuration capture and the confirmation gate.
//!
//! Every prompt can be pre-answered from the command line, so a
//! fully flagged invocation (`--domain ... --ssl --email ... --yes`)
//! never blocks on the terminal.

use std::net::Ipv4Addr;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use tracing::{info, warn};

use crate::config::{Domain, ProvisioningConfig, Settings};
use crate::error::{ProvisionError, ProvisionResult};
use crate::host::Host;
use crate::ui;

const IP_LOOKUP_URL: &str = "https://api.ipify.org";

/// Source of operator answers.
pub trait Prompter {
    /// Free-form line of text; may be empty.
    fn text(&mut self, prompt: &str) -> ProvisionResult<String>;

    fn confirm(&mut self, prompt: &str, default: bool) -> ProvisionResult<bool>;
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn text(&mut self, prompt: &str) -> ProvisionResult<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| ProvisionError::Other(format!("prompt failed: {e}")))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> ProvisionResult<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| ProvisionError::Other(format!("prompt failed: {e}")))
    }
}

/// Answers supplied up front on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    pub domain: Option<String>,
    pub ssl: Option<bool>,
    pub email: Option<String>,
    /// Skip the confirmation gate.
    pub yes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Confirmed(Box<ProvisioningConfig>),
    /// The operator declined at the confirmation gate.
    Cancelled,
}

/// Collect the run configuration and ask the operator to confirm
/// it.
pub fn capture(
    settings: Settings,
    answers: &Answers,
    prompter: &mut dyn Prompter,
    host: &dyn Host,
) -> ProvisionResult<Capture> {
    let domain = match &answers.domain {
        Some(domain) => Domain::parse(domain)?,
        None => ask_domain(prompter)?,
    };

    let ssl = match (domain.is_set(), answers.ssl) {
        (_, Some(ssl)) => ssl,
        (true, None) => prompter.confirm("Request a Let's Encrypt certificate?", true)?,
        (false, None) => false,
    };

    let email = match (&answers.email, ssl && domain.is_set()) {
        (_, false) => None,
        (Some(email), true) => Some(email.clone()),
        (None, true) => Some(prompter.text("E-mail for certificate expiry notices (blank to skip)")?),
    };

    let public_ip = if domain.is_set() {
        None
    } else {
        discover_public_ip(host)
    };

    let config = ProvisioningConfig::new(settings, domain, ssl, email, public_ip.as_deref());
    echo(&config);

    if answers.yes {
        info!("confirmation skipped (--yes)");
        return Ok(Capture::Confirmed(Box::new(config)));
    }
    if prompter.confirm("Proceed with provisioning?", false)? {
        Ok(Capture::Confirmed(Box::new(config)))
    } else {
        ui::warning("Provisioning cancelled, nothing was changed.");
        Ok(Capture::Cancelled)
    }
}

/// Ask an external service for this host's public IPv4 address.
///
/// Any failure is tolerated: the caller falls back to a placeholder
/// the operator replaces by hand.
pub fn discover_public_ip(host: &dyn Host) -> Option<String> {
    let body = match host.run("curl", &["-fsS", "--max-time", "10", IP_LOOKUP_URL]) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "public IP lookup failed");
            ui::warning("could not determine the public IP address, using a placeholder");
            return None;
        }
    };
    let Ok(ip) = body.trim().parse::<Ipv4Addr>() else {
        warn!(response = %body.trim(), "public IP lookup returned something that is not an IPv4 address");
        ui::warning("could not determine the public IP address, using a placeholder");
        return None;
    };
    Some(ip.to_string())
}

/// Ask until the answer is blank or a bare hostname.
fn ask_domain(prompter: &mut dyn Prompter) -> ProvisionResult<Domain> {
    loop {
        let answer = prompter.text("Domain name (leave blank to serve by IP address)")?;
        match Domain::parse(&answer) {
            Ok(domain) => return Ok(domain),
            Err(e) => ui::warning(&e.to_string()),
        }
    }
}

fn echo(config: &ProvisioningConfig) {
    let settings = config.settings();
    ui::section("Configuration");
    ui::info(&format!("Repository:   {}", settings.repo_url));
    if let Some(branch) = &settings.branch {
        ui::info(&format!("Branch:       {branch}"));
    }
    ui::info(&format!("Domain:       {}", config.domain()));
    ui::info(&format!("Server name:  {}", config.server_name()));
    ui::info(&format!(
        "TLS:          {}",
        if config.ssl_enabled() { "yes" } else { "no" }
    ));
    if let Some(email) = config.ssl_email() {
        ui::info(&format!("TLS e-mail:   {email}"));
    }
    ui::info(&format!("Origins:      {}", config.allowed_origins().join(", ")));
    ui::info(&format!("Service user: {}", config.app_user()));
    ui::info(&format!("App dir:      {}", config.app_dir().display()));
    ui::info(&format!("Data dir:     {}", config.data_dir().display()));
    ui::info(&format!("Backups:      {}", config.backup_dir().display()));
    eprintln!();
}
