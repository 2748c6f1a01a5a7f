//! Ordered, named provisioning steps and the executor that drives
//! them.

use std::fmt;

use tracing::{error, info, warn};

use crate::artifacts::Artifacts;
use crate::checkpoint::Checkpoint;
use crate::config::ProvisioningConfig;
use crate::error::ProvisionResult;
use crate::host::Host;
use crate::probe::Probe;
use crate::secret::SecretMaterial;
use crate::ui;

/// How a step behaves when the run is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Check whether the host already satisfies the step and leave
    /// it alone if so.
    DetectAndSkip,
    /// Regenerate unconditionally so the host reflects the current
    /// configuration.
    AlwaysOverwrite,
}

/// What a successful `apply` reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    /// Completed, but something non-essential was skipped or fell
    /// back.
    Tolerated(String),
}

/// Shared state threaded through the steps of one run.
pub struct Context<'a> {
    pub host: &'a dyn Host,
    pub config: &'a ProvisioningConfig,
    pub artifacts: Artifacts,
    pub probe: Probe,
    /// Set by the secret step; absent on a resumed run that skipped
    /// it.
    pub secret: Option<SecretMaterial>,
    /// Set once certificate issuance succeeded in this run.
    pub tls_active: bool,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, config: &'a ProvisioningConfig) -> Self {
        Self {
            host,
            config,
            artifacts: Artifacts::for_config(config),
            probe: Probe::default(),
            secret: None,
            tls_active: false,
        }
    }

    #[must_use]
    pub const fn probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }
}

/// A named unit of host mutation.
pub trait Step {
    fn name(&self) -> &'static str;

    fn idempotency(&self) -> Idempotency {
        Idempotency::AlwaysOverwrite
    }

    /// Reason to skip this step entirely for the current
    /// configuration.
    fn skip_reason(&self, _ctx: &Context<'_>) -> Option<String> {
        None
    }

    /// Whether the host already satisfies this step. Only consulted
    /// for [`Idempotency::DetectAndSkip`] steps.
    fn is_satisfied(&self, _ctx: &Context<'_>) -> bool {
        false
    }

    fn apply(&self, ctx: &mut Context<'_>) -> ProvisionResult<Outcome>;

    /// Post-condition check run right after `apply`.
    fn verify(&self, _ctx: &Context<'_>) -> ProvisionResult<()> {
        Ok(())
    }

    /// What the operator should do when this step fails.
    fn hint(&self) -> &'static str;

    /// Whether completion is recorded for `--resume`. Reporting
    /// steps opt out so they always run.
    fn checkpointed(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Applied,
    Tolerated,
    AlreadySatisfied,
    Skipped(String),
    Resumed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Tolerated => f.write_str("applied with warnings"),
            Self::AlreadySatisfied => f.write_str("already satisfied"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Resumed => f.write_str("completed in a previous run"),
        }
    }
}

/// Per-step result of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: Vec<(String, StepStatus)>,
}

impl RunReport {
    #[must_use]
    pub fn status(&self, step: &str) -> Option<&StepStatus> {
        self.steps.iter().find(|(n, _)| n == step).map(|(_, s)| s)
    }
}

/// Runs steps strictly in order, stopping at the first failure.
///
/// No compensation is attempted for steps that already ran; the
/// checkpoint records how far the run got instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    resume: bool,
}

impl Executor {
    #[must_use]
    pub const fn new() -> Self {
        Self { resume: false }
    }

    /// Skip steps a matching leftover checkpoint marks completed.
    #[must_use]
    pub const fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn run(&self, steps: &[Box<dyn Step>], ctx: &mut Context<'_>) -> ProvisionResult<RunReport> {
        let mut checkpoint = self.open_checkpoint(ctx)?;
        let mut report = RunReport::default();
        let total = steps.len();

        for (index, step) in steps.iter().enumerate() {
            let name = step.name();
            ui::step(index + 1, total, name);

            let status = if step.checkpointed() && checkpoint.is_completed(name) {
                ui::info("completed in a previous run, skipping");
                StepStatus::Resumed
            } else if let Some(reason) = step.skip_reason(ctx) {
                ui::info(&format!("skipping: {reason}"));
                StepStatus::Skipped(reason)
            } else if step.idempotency() == Idempotency::DetectAndSkip && step.is_satisfied(ctx) {
                ui::warning("already present, leaving as is");
                StepStatus::AlreadySatisfied
            } else {
                match step.apply(ctx).and_then(|o| step.verify(ctx).map(|()| o)) {
                    Ok(Outcome::Done(message)) => {
                        ui::success(&message);
                        StepStatus::Applied
                    }
                    Ok(Outcome::Tolerated(message)) => {
                        ui::warning(&message);
                        StepStatus::Tolerated
                    }
                    Err(e) => {
                        ui::failure(&e.to_string());
                        ui::detail(step.hint());
                        error!(step = name, error = %e, "step failed, aborting run");
                        checkpoint.fail(name, &e.to_string());
                        if let Err(save_err) = checkpoint.save(ctx.host) {
                            warn!(error = %save_err, "could not record failure in checkpoint");
                        }
                        return Err(e.in_step(name, step.hint()));
                    }
                }
            };

            info!(step = name, status = %status, "step finished");
            if step.checkpointed() {
                checkpoint.complete(name);
                checkpoint.save(ctx.host)?;
            }
            report.steps.push((name.to_string(), status));
        }

        checkpoint.discard(ctx.host)?;
        Ok(report)
    }

    fn open_checkpoint(self, ctx: &Context<'_>) -> ProvisionResult<Checkpoint> {
        let path = ctx.config.checkpoint_path();
        let fresh = || Checkpoint::new(&path, ctx.config.clone());

        let mut checkpoint = match Checkpoint::load(ctx.host, &path)? {
            Some(previous) if self.resume && previous.config == *ctx.config => {
                ui::info(&format!(
                    "resuming: {} step(s) completed in the run started {}",
                    previous.completed.len(),
                    previous.started_at.format("%Y-%m-%d %H:%M UTC")
                ));
                previous
            }
            Some(_) if self.resume => {
                ui::warning("previous checkpoint was for a different configuration, starting over");
                fresh()
            }
            Some(_) => {
                ui::warning("discarding checkpoint from an unfinished run (use --resume to continue it)");
                fresh()
            }
            None => fresh(),
        };
        checkpoint.save(ctx.host)?;
        Ok(checkpoint)
    }
}
