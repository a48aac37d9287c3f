//! Fail-closed config application.
//!
//! The live file is replaced only after the validator accepts a staged
//! copy, and the replacement is an atomic rename inside the config's
//! own directory. Stage order is fixed: stage, validate, write,
//! signal. An error before the write leaves the live file untouched;
//! an error after it means disk and process diverge, which the error
//! taxonomy calls out so the orchestrator can log it loudly.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::process::ProcessController;
use crate::error::{Error, Result};

/// Applies candidate configs to the live file and reloads the proxy.
pub struct Applier {
    config_path: PathBuf,
    controller: Arc<dyn ProcessController>,
    // Concurrent applies serialize; the pipeline is not reentrant.
    apply_lock: Mutex<()>,
}

impl Applier {
    pub fn new(config_path: impl Into<PathBuf>, controller: Arc<dyn ProcessController>) -> Self {
        Self {
            config_path: config_path.into(),
            controller,
            apply_lock: Mutex::new(()),
        }
    }

    /// Path of the live config this applier manages.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Validate, write and signal, in that order.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] (and any earlier staging error) leaves
    /// the live file byte-identical to before the call. Reload errors
    /// ([`Error::PidFileMissing`], [`Error::PidFileInvalid`],
    /// [`Error::Signal`]) occur after the write: the file on disk is
    /// current but the running process still serves the old config.
    pub async fn apply(&self, candidate: &str) -> Result<()> {
        let _guard = self.apply_lock.lock().await;

        let staged = self.stage(candidate)?;
        self.controller.run_validator(staged.path()).await?;
        self.commit(staged)?;
        info!(config = ?self.config_path, "config replaced, requesting reload");

        let pid = self.controller.read_pid()?;
        self.controller.send_reload_signal(pid)?;
        info!(pid, "reload signal sent");
        Ok(())
    }

    /// Write the candidate to a temp file next to the live config, so
    /// the later rename stays on one filesystem.
    fn stage(&self, candidate: &str) -> Result<NamedTempFile> {
        let dir = match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::Builder::new()
            .prefix(".haproxy.cfg.")
            .tempfile_in(dir)
            .map_err(|source| Error::io("staging candidate config", source))?;
        staged
            .write_all(candidate.as_bytes())
            .map_err(|source| Error::io("writing staged config", source))?;
        staged
            .flush()
            .map_err(|source| Error::io("writing staged config", source))?;
        debug!(staged = ?staged.path(), "candidate staged");
        Ok(staged)
    }

    fn commit(&self, staged: NamedTempFile) -> Result<()> {
        // Temp files are created 0600; carry the live file's mode over
        // so haproxy's own access to its config never changes.
        if let Ok(metadata) = fs::metadata(&self.config_path) {
            fs::set_permissions(staged.path(), metadata.permissions())
                .map_err(|source| Error::io("carrying over config permissions", source))?;
        }
        staged
            .persist(&self.config_path)
            .map_err(|source| Error::io("replacing live config", source.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as StateMutex;

    struct MockController {
        live_path: PathBuf,
        validator_accepts: bool,
        pid: Option<i32>,
        fail_signal: bool,
        /// Staged content seen by the validator.
        validated: StateMutex<Vec<String>>,
        /// Live file content at the moment the validator ran.
        live_at_validation: StateMutex<Vec<String>>,
        signals: StateMutex<Vec<i32>>,
    }

    impl MockController {
        fn new(live_path: &Path) -> Self {
            Self {
                live_path: live_path.to_path_buf(),
                validator_accepts: true,
                pid: Some(4242),
                fail_signal: false,
                validated: StateMutex::new(Vec::new()),
                live_at_validation: StateMutex::new(Vec::new()),
                signals: StateMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessController for MockController {
        async fn run_validator(&self, config_path: &Path) -> Result<()> {
            self.validated
                .lock()
                .push(fs::read_to_string(config_path).unwrap());
            self.live_at_validation
                .lock()
                .push(fs::read_to_string(&self.live_path).unwrap());
            if self.validator_accepts {
                Ok(())
            } else {
                Err(Error::validation("mock rejection"))
            }
        }

        fn read_pid(&self) -> Result<i32> {
            self.pid.ok_or_else(|| Error::PidFileMissing {
                path: PathBuf::from("/mock/haproxy.pid"),
            })
        }

        fn send_reload_signal(&self, pid: i32) -> Result<()> {
            if self.fail_signal {
                return Err(Error::signal(pid, std::io::Error::other("mock failure")));
            }
            self.signals.lock().push(pid);
            Ok(())
        }
    }

    fn live_config(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("haproxy.cfg");
        fs::write(&path, "old config\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_apply_validates_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let live = live_config(&dir);
        let mock = Arc::new(MockController::new(&live));
        let applier = Applier::new(&live, mock.clone());

        applier.apply("new config\n").await.unwrap();

        assert_eq!(fs::read_to_string(&live).unwrap(), "new config\n");
        assert_eq!(mock.validated.lock().as_slice(), ["new config\n"]);
        // The live file still held the old content while validating.
        assert_eq!(mock.live_at_validation.lock().as_slice(), ["old config\n"]);
        assert_eq!(mock.signals.lock().as_slice(), [4242]);
    }

    #[tokio::test]
    async fn test_apply_fails_closed_on_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let live = live_config(&dir);
        let mut mock = MockController::new(&live);
        mock.validator_accepts = false;
        let mock = Arc::new(mock);
        let applier = Applier::new(&live, mock.clone());

        let err = applier.apply("broken config\n").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        assert_eq!(fs::read_to_string(&live).unwrap(), "old config\n");
        assert!(mock.signals.lock().is_empty());
        // The staged temp file is cleaned up on failure.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_reload_failure_is_after_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let live = live_config(&dir);
        let mut mock = MockController::new(&live);
        mock.pid = None;
        let mock = Arc::new(mock);
        let applier = Applier::new(&live, mock.clone());

        let err = applier.apply("new config\n").await.unwrap_err();
        assert!(err.is_reload_failure());
        // Disk is current, process was never told.
        assert_eq!(fs::read_to_string(&live).unwrap(), "new config\n");
        assert!(mock.signals.lock().is_empty());
    }

    #[tokio::test]
    async fn test_signal_failure_is_a_reload_failure() {
        let dir = tempfile::tempdir().unwrap();
        let live = live_config(&dir);
        let mut mock = MockController::new(&live);
        mock.fail_signal = true;
        let mock = Arc::new(mock);
        let applier = Applier::new(&live, mock.clone());

        let err = applier.apply("new config\n").await.unwrap_err();
        assert!(matches!(err, Error::Signal { .. }));
        assert_eq!(fs::read_to_string(&live).unwrap(), "new config\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apply_preserves_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let live = live_config(&dir);
        fs::set_permissions(&live, fs::Permissions::from_mode(0o640)).unwrap();

        let mock = Arc::new(MockController::new(&live));
        let applier = Applier::new(&live, mock);
        applier.apply("new config\n").await.unwrap();

        let mode = fs::metadata(&live).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
