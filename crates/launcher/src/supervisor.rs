use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::LauncherError;

struct Managed {
    name: String,
    child: Child,
}

/// Starts sibling binaries and tears them down again.
pub struct Supervisor {
    bin_dir: PathBuf,
    shutdown_timeout: Duration,
    children: Vec<Managed>,
}

impl Supervisor {
    pub fn new(bin_dir: impl Into<PathBuf>, shutdown_timeout: Duration) -> Self {
        Self { bin_dir: bin_dir.into(), shutdown_timeout, children: Vec::new() }
    }

    /// Binaries are looked up next to the running executable.
    pub fn beside_current_exe(shutdown_timeout: Duration) -> Result<Self, LauncherError> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(dir, shutdown_timeout))
    }

    pub fn binary_path(&self, name: &str) -> PathBuf {
        self.bin_dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX))
    }

    fn command(&self, name: &str, args: &[&str]) -> Result<Command, LauncherError> {
        let path = self.binary_path(name);
        if !path.is_file() {
            return Err(LauncherError::MissingBinary(path));
        }
        let mut cmd = Command::new(path);
        cmd.args(args).kill_on_drop(true);
        Ok(cmd)
    }

    /// Start a background service. Its stdout is discarded; stderr is shared.
    pub fn spawn(&mut self, name: &str, args: &[&str]) -> Result<u32, LauncherError> {
        let child = self
            .command(name, args)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LauncherError::Spawn { name: name.to_string(), source })?;
        let pid = child.id().unwrap_or_default();
        info!(service = %name, pid, "service started");
        self.children.push(Managed { name: name.to_string(), child });
        Ok(pid)
    }

    /// Run a binary in the foreground with the terminal attached.
    pub async fn run(&self, name: &str, args: &[&str]) -> Result<ExitStatus, LauncherError> {
        let mut child = self
            .command(name, args)?
            .spawn()
            .map_err(|source| LauncherError::Spawn { name: name.to_string(), source })?;
        Ok(child.wait().await?)
    }

    /// Names of services that have not exited yet.
    pub fn running(&mut self) -> Vec<String> {
        self.children
            .iter_mut()
            .filter_map(|m| matches!(m.child.try_wait(), Ok(None)).then(|| m.name.clone()))
            .collect()
    }

    /// Ask every live service to stop, then kill whatever is left once the
    /// shutdown timeout has passed.
    pub async fn shutdown(&mut self) {
        let mut children = std::mem::take(&mut self.children);
        for m in children.iter_mut() {
            if matches!(m.child.try_wait(), Ok(None)) {
                terminate(m);
            }
        }

        let deadline = Instant::now() + self.shutdown_timeout;
        for m in children.iter_mut() {
            match tokio::time::timeout_at(deadline, m.child.wait()).await {
                Ok(Ok(status)) => info!(service = %m.name, %status, "service stopped"),
                Ok(Err(e)) => warn!(service = %m.name, error = %e, "failed to wait for service"),
                Err(_) => {
                    warn!(service = %m.name, "service did not stop in time; killing");
                    if let Err(e) = m.child.kill().await {
                        warn!(service = %m.name, error = %e, "kill failed");
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
fn terminate(m: &mut Managed) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = m.child.id() {
        info!(service = %m.name, pid, "sending SIGTERM");
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(service = %m.name, error = %e, "SIGTERM failed");
        }
    }
}

#[cfg(not(unix))]
fn terminate(m: &mut Managed) {
    if let Err(e) = m.child.start_kill() {
        warn!(service = %m.name, error = %e, "failed to stop service");
    }
}
