#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use trebuchet::config::{Domain, ProvisioningConfig, Settings};
use trebuchet::error::{ProvisionError, ProvisionResult};
use trebuchet::host::{FileSpec, Host};
use trebuchet::capture::Prompter;

pub const REPO: &str = "https://git.example.org/hoops.git";
pub const IP: &str = "203.0.113.7";

/// In-memory host that records every mutation in call order.
///
/// Commands succeed with empty output unless a response or a
/// failure was registered for a matching prefix.
#[derive(Default)]
pub struct StubHost {
    pub privileged: bool,
    calls: RefCell<Vec<String>>,
    files: RefCell<BTreeMap<PathBuf, String>>,
    modes: RefCell<BTreeMap<PathBuf, FileSpec>>,
    paths: RefCell<BTreeSet<PathBuf>>,
    users: RefCell<BTreeSet<String>>,
    failures: Vec<String>,
    responses: Vec<(String, String)>,
    missing_commands: BTreeSet<String>,
}

impl StubHost {
    /// A privileged host with the checkout, requirements file and
    /// server binary already in place.
    pub fn new() -> Self {
        let host = Self {
            privileged: true,
            ..Self::default()
        };
        host.respond("ufw status", "Status: active")
            .respond("curl -fsS --max-time 10 https://api.ipify.org", IP)
            .with_path("/opt/hoops/.git")
            .with_path("/opt/hoops/requirements.txt")
            .with_path("/opt/hoops/venv/bin/uvicorn")
    }

    pub fn unprivileged() -> Self {
        Self {
            privileged: false,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn fail_on(mut self, prefix: &str) -> Self {
        self.failures.push(prefix.to_string());
        self
    }

    #[must_use]
    pub fn respond(mut self, prefix: &str, output: &str) -> Self {
        self.responses.insert(0, (prefix.to_string(), output.to_string()));
        self
    }

    #[must_use]
    pub fn with_path(self, path: &str) -> Self {
        self.paths.borrow_mut().insert(PathBuf::from(path));
        self
    }

    #[must_use]
    pub fn with_user(self, user: &str) -> Self {
        self.users.borrow_mut().insert(user.to_string());
        self
    }

    #[must_use]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    #[must_use]
    pub fn without_command(mut self, program: &str) -> Self {
        self.missing_commands.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Index of the first recorded call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c.starts_with(prefix))
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(Path::new(path)).cloned()
    }

    pub fn mode(&self, path: &str) -> Option<FileSpec> {
        self.modes.borrow().get(Path::new(path)).cloned()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Host for StubHost {
    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn run(&self, program: &str, args: &[&str]) -> ProvisionResult<String> {
        let command = trebuchet::cmd::format_command(program, args);
        self.record(command.clone());

        if self.failures.iter().any(|f| command.starts_with(f.as_str())) {
            return Err(ProvisionError::CommandFailed {
                command,
                status: None,
                stderr: "stub failure".into(),
            });
        }
        if program == "useradd" {
            if let Some(user) = args.last() {
                self.users.borrow_mut().insert((*user).to_string());
            }
        }
        Ok(self
            .responses
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    fn command_exists(&self, program: &str) -> bool {
        !self.missing_commands.contains(program)
    }

    fn user_exists(&self, user: &str) -> bool {
        self.users.borrow().contains(user)
    }

    fn exists(&self, path: &Path) -> bool {
        self.paths.borrow().contains(path) || self.files.borrow().contains_key(path)
    }

    fn read_file(&self, path: &Path) -> ProvisionResult<String> {
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            ProvisionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }

    fn write_file(&self, path: &Path, content: &str, spec: &FileSpec) -> ProvisionResult<()> {
        self.record(format!("write {}", path.display()));
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), content.to_string());
        self.modes.borrow_mut().insert(path.to_path_buf(), spec.clone());
        Ok(())
    }

    fn create_dir(&self, path: &Path, spec: &FileSpec) -> ProvisionResult<()> {
        self.record(format!("mkdir {}", path.display()));
        self.paths.borrow_mut().insert(path.to_path_buf());
        self.modes.borrow_mut().insert(path.to_path_buf(), spec.clone());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> ProvisionResult<()> {
        self.record(format!("rm {}", path.display()));
        self.files.borrow_mut().remove(path);
        self.paths.borrow_mut().remove(path);
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> ProvisionResult<()> {
        self.record(format!("ln {} {}", target.display(), link.display()));
        self.paths.borrow_mut().insert(link.to_path_buf());
        Ok(())
    }

    fn sleep(&self, _duration: Duration) {}
}

/// Replays canned answers and records the prompts it saw.
#[derive(Default)]
pub struct ScriptedPrompter {
    texts: VecDeque<String>,
    confirms: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, answer: &str) -> Self {
        self.texts.push_back(answer.to_string());
        self
    }

    #[must_use]
    pub fn confirm(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, prompt: &str) -> ProvisionResult<String> {
        self.asked.push(prompt.to_string());
        self.texts
            .pop_front()
            .ok_or_else(|| ProvisionError::Other(format!("unexpected prompt: {prompt}")))
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> ProvisionResult<bool> {
        self.asked.push(prompt.to_string());
        self.confirms
            .pop_front()
            .ok_or_else(|| ProvisionError::Other(format!("unexpected prompt: {prompt}")))
    }
}

pub fn settings() -> Settings {
    Settings::default().repo_url(REPO)
}

pub fn config(domain: &str, ssl: bool) -> ProvisioningConfig {
    ProvisioningConfig::new(
        settings(),
        Domain::parse(domain).unwrap(),
        ssl,
        ssl.then(|| "ops@example.org".to_string()),
        Some(IP),
    )
}
