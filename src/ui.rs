//! Operator-facing console annotations.
//!
//! Progress goes to stderr so that `render` output on stdout stays
//! pipeable.

use colored::Colorize;

/// Print a section header.
pub fn section(title: &str) {
    eprintln!();
    eprintln!("{}", "═".repeat(60).bright_black());
    eprintln!("{}", title.cyan().bold());
    eprintln!("{}", "═".repeat(60).bright_black());
}

/// Announce a step with its position in the run.
pub fn step(current: usize, total: usize, name: &str) {
    eprintln!();
    eprintln!(
        "{} {} {}",
        format!("[{current}/{total}]").bright_black(),
        "▶".cyan(),
        name.bold()
    );
}

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message.green());
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

pub fn failure(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print an indented detail line under the current step.
pub fn detail(message: &str) {
    eprintln!("  {} {}", "→".cyan(), message);
}
