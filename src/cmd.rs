use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{ProvisionError, ProvisionResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> ProvisionResult<String> {
    debug!(command = %format_command(program, args), "running");
    let output = spawn(program, args)?;
    into_stdout(program, args, &output)
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> ProvisionResult<()> {
    debug!(command = %format_command(program, args), "running interactively");
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| not_found_or_io(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(ProvisionError::CommandFailed {
            command: format_command(program, args),
            status: Some(status),
            stderr: String::new(),
        })
    }
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

fn spawn(program: &str, args: &[&str]) -> ProvisionResult<Output> {
    Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))
}

fn into_stdout(program: &str, args: &[&str], output: &Output) -> ProvisionResult<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ProvisionError::CommandFailed {
            command: format_command(program, args),
            status: Some(output.status),
            stderr,
        })
    }
}

fn not_found_or_io(program: &str, e: std::io::Error) -> ProvisionError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ProvisionError::CommandNotFound(program.to_string())
    } else {
        ProvisionError::Io(e)
    }
}
