use crate::error::{ProvisionError, ProvisionResult};
use crate::step::{Context, Outcome, Step};
use crate::ui;

/// An inbound allow rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowRule {
    pub port: String,
    pub comment: String,
}

impl AllowRule {
    #[must_use]
    pub fn new(port: &str, comment: &str) -> Self {
        Self {
            port: port.to_string(),
            comment: comment.to_string(),
        }
    }
}

/// Default-deny inbound, explicit allows for SSH and HTTP(S).
pub struct Firewall {
    pub rules: Vec<AllowRule>,
}

impl Default for Firewall {
    fn default() -> Self {
        Self {
            rules: vec![
                AllowRule::new("22/tcp", "ssh"),
                AllowRule::new("80/tcp", "http"),
                AllowRule::new("443/tcp", "https"),
            ],
        }
    }
}

impl Step for Firewall {
    fn name(&self) -> &'static str {
        "firewall"
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome> {
        let host = ctx.host;

        host.run("ufw", &["default", "deny", "incoming"])?;
        host.run("ufw", &["default", "allow", "outgoing"])?;

        // Allows go in before enabling so the SSH session running
        // this is never cut off.
        for rule in &self.rules {
            ui::detail(&format!("allow {} ({})", rule.port, rule.comment));
            host.run("ufw", &["allow", &rule.port, "comment", &rule.comment])?;
        }

        host.run("ufw", &["--force", "enable"])?;

        Ok(Outcome::Done(format!(
            "inbound denied except {}",
            self.rules
                .iter()
                .map(|r| r.port.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    fn verify(&self, ctx: &Context<'_>) -> ProvisionResult<()> {
        let status = ctx.host.run("ufw", &["status"])?;
        if status.contains("Status: active") {
            Ok(())
        } else {
            Err(ProvisionError::Other("ufw reports the firewall inactive".into()))
        }
    }

    fn hint(&self) -> &'static str {
        "inspect `ufw status verbose`; SSH stays allowed, so the host remains reachable"
    }
}
