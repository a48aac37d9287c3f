//! HAProxy process control.
//!
//! The applier talks to the running proxy only through
//! [`ProcessController`], so the apply pipeline can be exercised with
//! a mock instead of a live process. [`HaproxyController`] is the
//! production implementation: `haproxy -c -f` for validation, PID file
//! plus `SIGUSR2` for reloads.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Control surface over the proxy process being reloaded.
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Run the syntax validator against `config_path`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the validator rejects the file,
    /// [`Error::Io`] when it cannot be spawned at all.
    async fn run_validator(&self, config_path: &Path) -> Result<()>;

    /// Read the reload target's PID.
    ///
    /// # Errors
    ///
    /// [`Error::PidFileMissing`] / [`Error::PidFileInvalid`] when the
    /// PID file is absent or holds no PID.
    fn read_pid(&self) -> Result<i32>;

    /// Deliver the reload signal to `pid`.
    ///
    /// # Errors
    ///
    /// [`Error::Signal`] when delivery fails (stale PID, permissions).
    fn send_reload_signal(&self, pid: i32) -> Result<()>;
}

/// Controller for a real HAProxy master process.
pub struct HaproxyController {
    haproxy_bin: String,
    pid_file: PathBuf,
}

impl HaproxyController {
    pub fn new(haproxy_bin: impl Into<String>, pid_file: impl Into<PathBuf>) -> Self {
        Self {
            haproxy_bin: haproxy_bin.into(),
            pid_file: pid_file.into(),
        }
    }
}

#[async_trait]
impl ProcessController for HaproxyController {
    async fn run_validator(&self, config_path: &Path) -> Result<()> {
        let output = tokio::process::Command::new(&self.haproxy_bin)
            .arg("-c")
            .arg("-f")
            .arg(config_path)
            .output()
            .await
            .map_err(|source| Error::io(format!("spawning {} -c", self.haproxy_bin), source))?;

        if output.status.success() {
            debug!(config = ?config_path, "validator accepted staged config");
            return Ok(());
        }

        // haproxy writes diagnostics to stderr; fall back to stdout.
        let mut diagnostic = String::from_utf8_lossy(&output.stderr).into_owned();
        if diagnostic.trim().is_empty() {
            diagnostic = String::from_utf8_lossy(&output.stdout).into_owned();
        }
        Err(Error::validation(diagnostic.trim().to_string()))
    }

    fn read_pid(&self) -> Result<i32> {
        let contents = match fs::read_to_string(&self.pid_file) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PidFileMissing {
                    path: self.pid_file.clone(),
                });
            }
            Err(source) => {
                return Err(Error::io(
                    format!("reading pid file {:?}", self.pid_file),
                    source,
                ));
            }
        };

        // Master-worker mode writes the master PID on the first line
        // and may append worker PIDs below it.
        contents
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .and_then(|line| line.parse().ok())
            .ok_or_else(|| Error::PidFileInvalid {
                path: self.pid_file.clone(),
                contents: contents.trim().to_string(),
            })
    }

    fn send_reload_signal(&self, pid: i32) -> Result<()> {
        send_sigusr2(pid)
    }
}

#[cfg(unix)]
fn send_sigusr2(pid: i32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid), Signal::SIGUSR2)
        .map_err(|errno| Error::signal(pid, std::io::Error::from_raw_os_error(errno as i32)))
}

#[cfg(not(unix))]
fn send_sigusr2(pid: i32) -> Result<()> {
    Err(Error::signal(
        pid,
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "reload signals require a unix platform",
        ),
    ))
}
