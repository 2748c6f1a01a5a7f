use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::artifacts::Artifacts;
use crate::capture::{self, Answers, Capture, Prompter, TerminalPrompter};
use crate::checkpoint::Checkpoint;
use crate::config::{Domain, ProvisioningConfig, Settings};
use crate::error::{ProvisionError, ProvisionResult};
use crate::host::Host;
use crate::preflight;
use crate::probe::Probe;
use crate::secret::SecretMaterial;
use crate::step::{Context, Executor};
use crate::steps;
use crate::ui;

/// How a command ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The operator declined at the confirmation gate.
    Cancelled,
}

/// Command dispatcher bound to one host.
pub struct Pipeline<'h> {
    host: &'h dyn Host,
    probe: Probe,
}

impl<'h> Pipeline<'h> {
    #[must_use]
    pub fn new(host: &'h dyn Host) -> Self {
        Self {
            host,
            probe: Probe::default(),
        }
    }

    /// Override the liveness poll used by the provisioning steps.
    #[must_use]
    pub const fn probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    /// Parse CLI arguments and dispatch the appropriate
    /// command.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatched command fails.
    pub fn run(&self) -> ProvisionResult<RunOutcome> {
        let cli = Cli::parse();
        self.dispatch(&cli, &mut TerminalPrompter::new())
    }

    pub fn dispatch(&self, cli: &Cli, prompter: &mut dyn Prompter) -> ProvisionResult<RunOutcome> {
        match &cli.command {
            Command::Provision(args) => self.cmd_provision(args, prompter),
            Command::Render(args) => {
                cmd_render(args)?;
                Ok(RunOutcome::Completed)
            }
            Command::Redeploy(args) => self.cmd_redeploy(args),
            Command::Status(args) => self.cmd_status(args),
        }
    }

    fn cmd_provision(&self, args: &ProvisionArgs, prompter: &mut dyn Prompter) -> ProvisionResult<RunOutcome> {
        // Before anything reads, prompts, or writes.
        preflight::check(self.host)?;

        let settings = args.settings.load()?;
        settings.validate()?;

        let config = match capture::capture(settings, &args.answers(), prompter, self.host)? {
            Capture::Confirmed(config) => *config,
            Capture::Cancelled => return Ok(RunOutcome::Cancelled),
        };

        let plan = steps::plan();
        let mut ctx = Context::new(self.host, &config).probe(self.probe);
        let report = Executor::new().resume(args.resume).run(&plan, &mut ctx)?;

        info!(steps = report.steps.len(), server_name = config.server_name(), "provisioning complete");
        Ok(RunOutcome::Completed)
    }

    /// Pull, resync, restart, then poll the health endpoint, the
    /// same sequence the installed helper script runs.
    fn cmd_redeploy(&self, args: &SettingsArgs) -> ProvisionResult<RunOutcome> {
        preflight::check(self.host)?;
        let config = args.config()?;
        let redeploy = Artifacts::for_config(&config).redeploy;
        let host = self.host;

        ui::section(&format!("Redeploying {}", redeploy.service));

        ui::step(1, 4, "pull latest source");
        let app_dir = redeploy.app_dir.display().to_string();
        let mut pull = vec!["-C", app_dir.as_str(), "pull", "--ff-only"];
        if let Some(branch) = &redeploy.branch {
            pull.extend(["origin", branch.as_str()]);
        }
        host.run_as(&redeploy.user, "git", &pull)?;
        ui::success("source updated");

        ui::step(2, 4, "sync dependencies");
        let pip = redeploy.pip().display().to_string();
        let requirements = redeploy.requirements().display().to_string();
        host.run_as(&redeploy.user, &pip, &["install", "--quiet", "-r", &requirements])?;
        ui::success("dependencies in sync");

        ui::step(3, 4, "restart service");
        host.run("systemctl", &["restart", &redeploy.service])?;
        ui::success(&format!("{} restarted", redeploy.service));

        ui::step(4, 4, "health check");
        let probe = Probe {
            attempts: redeploy.attempts,
            interval: Duration::from_secs(u64::from(redeploy.interval_secs)),
        };
        let journal = format!("journalctl -u {} -n 100 --no-pager", redeploy.service);
        if let Err(e) = probe.http_ok(host, &redeploy.health_url) {
            ui::failure(&e.to_string());
            ui::detail(&format!("inspect logs: {journal}"));
            return Err(e.in_step("health check", &format!("inspect logs with `{journal}`")));
        }
        ui::success(&format!("{} answers", redeploy.health_url));

        Ok(RunOutcome::Completed)
    }

    fn cmd_status(&self, args: &SettingsArgs) -> ProvisionResult<RunOutcome> {
        // The checkpoint is root-only.
        preflight::check(self.host)?;
        let config = args.config()?;

        ui::section(&format!("Status of {}", config.service_name()));
        match Checkpoint::load(self.host, &config.checkpoint_path())? {
            Some(checkpoint) => {
                ui::warning(&format!(
                    "unfinished run started {}, last update {}",
                    checkpoint.started_at.format("%Y-%m-%d %H:%M UTC"),
                    checkpoint.updated_at.format("%Y-%m-%d %H:%M UTC")
                ));
                for step in &checkpoint.completed {
                    ui::detail(&format!("done: {step}"));
                }
                if let Some(step) = &checkpoint.failed_step {
                    ui::failure(&format!(
                        "failed at '{step}': {}",
                        checkpoint.last_error.as_deref().unwrap_or("unknown error")
                    ));
                }
                ui::info("continue it with `trebuchet provision --resume`");
            }
            None => ui::success("no unfinished provisioning run recorded"),
        }
        eprintln!();

        // `systemctl status` exits non-zero for inactive units; the
        // output already says so.
        if let Err(e) = self
            .host
            .run_interactive("systemctl", &["status", config.service_name(), "--no-pager"])
        {
            match e {
                ProvisionError::CommandFailed { .. } => {
                    ui::warning(&format!("{} is not running", config.service_name()));
                }
                other => return Err(other),
            }
        }

        Ok(RunOutcome::Completed)
    }
}

/// Print every artifact a run would write without touching the
/// host.
fn cmd_render(args: &RenderArgs) -> ProvisionResult<()> {
    let settings = args.settings.load()?;
    let domain = Domain::parse(args.domain.as_deref().unwrap_or_default())?;
    let config = ProvisioningConfig::new(settings, domain, args.ssl, args.email.clone(), None);
    let redacted = SecretMaterial::from_hex("<generated at provision time>");

    eprintln!("=== Dry run: no changes will be made ===");
    eprintln!();

    for (path, content) in Artifacts::for_config(&config).files(&config, &redacted) {
        eprintln!("--- {} ---", path.display());
        println!("{content}");
    }

    eprintln!("--- Steps that would run ---");
    for (index, step) in steps::plan().iter().enumerate() {
        eprintln!("{}. {}", index + 1, step.name());
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "trebuchet")]
#[command(about = "Provision this host into a supervised, reverse-proxied deployment")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision this host (run as root)
    Provision(ProvisionArgs),

    /// Print the generated files without changing anything
    Render(RenderArgs),

    /// Pull, reinstall dependencies, restart and health-check
    Redeploy(SettingsArgs),

    /// Show unfinished-run state and service status
    Status(SettingsArgs),
}

/// Settings shared by every subcommand.
#[derive(Args)]
pub struct SettingsArgs {
    /// YAML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Git repository to deploy
    #[arg(long, env = "TREBUCHET_REPO_URL")]
    pub repo_url: Option<String>,

    /// Branch to check out instead of the remote default
    #[arg(long)]
    pub branch: Option<String>,
}

impl SettingsArgs {
    /// File settings, with flags and environment layered on top.
    pub fn load(&self) -> ProvisionResult<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(url) = &self.repo_url {
            settings = settings.repo_url(url);
        }
        if let Some(branch) = &self.branch {
            settings = settings.branch(branch);
        }
        Ok(settings)
    }

    /// A configuration carrying only the paths and names of an
    /// existing deployment.
    fn config(&self) -> ProvisionResult<ProvisioningConfig> {
        Ok(ProvisioningConfig::new(self.load()?, Domain::Unset, false, None, None))
    }
}

#[derive(Args)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Public domain name; pass an empty value to serve by IP
    #[arg(long)]
    pub domain: Option<String>,

    #[command(flatten)]
    pub tls: TlsChoice,

    /// Certificate expiry notice address
    #[arg(long)]
    pub email: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,

    /// Skip steps an interrupted run already completed
    #[arg(long)]
    pub resume: bool,
}

impl ProvisionArgs {
    #[must_use]
    pub fn answers(&self) -> Answers {
        Answers {
            domain: self.domain.clone(),
            ssl: self.tls.answer(),
            email: self.email.clone(),
            yes: self.yes,
        }
    }
}

/// `--ssl` / `--no-ssl`; neither leaves the question to the prompt.
#[derive(Args)]
pub struct TlsChoice {
    /// Request a Let's Encrypt certificate
    #[arg(long, conflicts_with = "no_ssl")]
    pub ssl: bool,

    /// Serve plain HTTP only
    #[arg(long)]
    pub no_ssl: bool,
}

impl TlsChoice {
    #[must_use]
    pub const fn answer(&self) -> Option<bool> {
        if self.ssl {
            Some(true)
        } else if self.no_ssl {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub ssl: bool,

    #[arg(long)]
    pub email: Option<String>,
}
