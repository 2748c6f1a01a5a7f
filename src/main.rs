use std::process::ExitCode;

use colored::Colorize;
use tracing_subscriber::EnvFilter;
use trebuchet::{Pipeline, ProvisionError, RunOutcome, SystemHost};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let host = SystemHost::new();
    match Pipeline::new(&host).run().map_err(anyhow::Error::from) {
        Ok(RunOutcome::Completed | RunOutcome::Cancelled) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(error: &anyhow::Error) {
    eprintln!();
    eprintln!("{} {error}", "error:".red().bold());
    if let Some(e) = error.downcast_ref::<ProvisionError>() {
        let cause = e.root_cause();
        if let ProvisionError::CommandFailed { stderr, .. } = cause {
            if !stderr.is_empty() {
                eprintln!("{} {stderr}", "output:".bright_black());
            }
        }
        if let Some(hint) = e.hint() {
            eprintln!("{} {hint}", "hint:".cyan().bold());
        }
    }
}
