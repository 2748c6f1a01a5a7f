use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use nix::unistd::{Uid, User, chown};
use tracing::debug;

use crate::cmd;
use crate::error::{ProvisionError, ProvisionResult};

/// Permission bits and owning account for a generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub mode: u32,
    pub owner: Option<String>,
}

impl FileSpec {
    /// A root-owned file with the given mode.
    #[must_use]
    pub const fn root(mode: u32) -> Self {
        Self { mode, owner: None }
    }

    /// A file (or directory) owned by `user`, group included.
    #[must_use]
    pub fn owned_by(user: &str, mode: u32) -> Self {
        Self {
            mode,
            owner: Some(user.to_string()),
        }
    }
}

/// Capabilities the provisioning steps need from the target
/// machine.
///
/// Everything a step does to the host goes through this trait, so
/// tests can record the exact call order and simulate hosts that
/// are already partly provisioned.
pub trait Host {
    /// Whether the current process may mutate system state.
    fn is_privileged(&self) -> bool;

    /// Run a command and capture its stdout.
    fn run(&self, program: &str, args: &[&str]) -> ProvisionResult<String>;

    /// Run a long command with its output streamed to the
    /// operator.
    fn run_interactive(&self, program: &str, args: &[&str]) -> ProvisionResult<()> {
        self.run(program, args).map(|_| ())
    }

    /// Run a command as another (unprivileged) account.
    fn run_as(&self, user: &str, program: &str, args: &[&str]) -> ProvisionResult<String> {
        let mut full = vec!["-u", user, "--", program];
        full.extend_from_slice(args);
        self.run("runuser", &full)
    }

    fn command_exists(&self, program: &str) -> bool;

    fn user_exists(&self, user: &str) -> bool {
        self.run("id", &["-u", user]).is_ok()
    }

    fn exists(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> ProvisionResult<String>;

    /// Replace `path` with `content`, applying `spec` before the
    /// new content becomes visible.
    fn write_file(&self, path: &Path, content: &str, spec: &FileSpec) -> ProvisionResult<()>;

    fn create_dir(&self, path: &Path, spec: &FileSpec) -> ProvisionResult<()>;

    fn remove_file(&self, path: &Path) -> ProvisionResult<()>;

    /// Point `link` at `target`, replacing any existing link.
    fn symlink(&self, target: &Path, link: &Path) -> ProvisionResult<()>;

    fn sleep(&self, duration: Duration);
}

/// The machine this process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl SystemHost {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply_owner(path: &Path, owner: Option<&str>) -> ProvisionResult<()> {
        let Some(name) = owner else {
            return Ok(());
        };
        let user = User::from_name(name)
            .map_err(|e| ProvisionError::Other(format!("user lookup for {name}: {e}")))?
            .ok_or_else(|| ProvisionError::Other(format!("user {name} does not exist")))?;
        chown(path, Some(user.uid), Some(user.gid))
            .map_err(|e| ProvisionError::Other(format!("chown {}: {e}", path.display())))
    }
}

impl Host for SystemHost {
    fn is_privileged(&self) -> bool {
        Uid::effective().is_root()
    }

    fn run(&self, program: &str, args: &[&str]) -> ProvisionResult<String> {
        cmd::run(program, args)
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> ProvisionResult<()> {
        cmd::run_interactive(program, args)
    }

    fn command_exists(&self, program: &str) -> bool {
        cmd::command_exists(program)
    }

    fn user_exists(&self, user: &str) -> bool {
        matches!(User::from_name(user), Ok(Some(_)))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> ProvisionResult<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write_file(&self, path: &Path, content: &str, spec: &FileSpec) -> ProvisionResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Staged next to the target so the rename stays on one
        // filesystem and readers never see a half-written file.
        let staged = staging_path(path);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(spec.mode)
            .open(&staged)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(spec.mode))?;
        Self::apply_owner(&staged, spec.owner.as_deref())?;
        std::fs::rename(&staged, path)?;

        debug!(path = %path.display(), mode = format!("{:o}", spec.mode), "wrote file");
        Ok(())
    }

    fn create_dir(&self, path: &Path, spec: &FileSpec) -> ProvisionResult<()> {
        std::fs::create_dir_all(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(spec.mode))?;
        Self::apply_owner(path, spec.owner.as_deref())
    }

    fn remove_file(&self, path: &Path) -> ProvisionResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> ProvisionResult<()> {
        self.remove_file(link)?;
        std::os::unix::fs::symlink(target, link)?;
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".trebuchet-tmp");
    path.with_file_name(name)
}
