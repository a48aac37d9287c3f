//! Runtime configuration sourced from the environment.
//!
//! The monitor is configured entirely through environment variables so
//! it drops into container deployments without a config file:
//!
//! - [`Config`] - Resolved settings for one monitor instance
//! - [`AssembleMode`] - How the managed block is placed in the config
//! - [`ValidationResult`] - Non-fatal findings worth logging at startup
//!
//! `NETWORK_NAME`, `HAPROXY_CONFIG_FILE`, `DOMAIN_NAME` and
//! `HAPROXY_PID_FILE` are mandatory; everything else has a default.

use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// How rendered fragments are placed into the base config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssembleMode {
    /// Replace the block between the begin/end marker lines.
    #[default]
    Markers,
    /// Keep everything through the anchor line, regenerate the rest.
    Anchor,
}

impl AssembleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markers => "markers",
            Self::Anchor => "anchor",
        }
    }
}

impl std::fmt::Display for AssembleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssembleMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "markers" | "marker" => Ok(Self::Markers),
            "anchor" => Ok(Self::Anchor),
            other => bail!("unknown assemble mode {other:?} (expected \"markers\" or \"anchor\")"),
        }
    }
}

/// Resolved monitor settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Docker Engine API endpoint (`unix://` socket or `tcp://`/`http://`).
    pub docker_url: String,
    /// Docker network whose membership drives the backend block.
    pub network: String,
    /// Live HAProxy configuration file the monitor rewrites.
    pub config_path: PathBuf,
    /// Domain suffix handed to templates as the `domain` variable.
    pub domain: String,
    /// PID file of the HAProxy master process (written with `-W`).
    pub pid_file: PathBuf,
    /// Directory of `*.j2` fragment templates; `None` means the
    /// compiled-in default only.
    pub templates_dir: Option<PathBuf>,
    /// Quiet window between the last event and the pass it triggers.
    pub debounce: Duration,
    /// Block placement strategy.
    pub mode: AssembleMode,
    /// HAProxy binary used for syntax validation.
    pub haproxy_bin: String,
}

impl Config {
    /// Read the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending variable when a mandatory
    /// variable is unset or a numeric/enum variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let docker_url = env::var(constants::ENV_DOCKER_URL)
            .unwrap_or_else(|_| constants::DEFAULT_DOCKER_URL.to_string());
        let network = required(constants::ENV_NETWORK)?;
        let config_path = PathBuf::from(required(constants::ENV_CONFIG_FILE)?);
        let domain = required(constants::ENV_DOMAIN)?;
        let pid_file = PathBuf::from(required(constants::ENV_PID_FILE)?);
        let templates_dir = env::var(constants::ENV_TEMPLATES_DIR)
            .ok()
            .map(PathBuf::from);

        let debounce = match env::var(constants::ENV_DEBOUNCE_SECS) {
            Ok(raw) => {
                let secs: u64 = raw.parse().with_context(|| {
                    format!(
                        "{} must be an integer number of seconds, got {raw:?}",
                        constants::ENV_DEBOUNCE_SECS
                    )
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(constants::DEFAULT_DEBOUNCE_SECS),
        };

        let mode = match env::var(constants::ENV_ASSEMBLE_MODE) {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid {}", constants::ENV_ASSEMBLE_MODE))?,
            Err(_) => AssembleMode::default(),
        };

        let haproxy_bin = env::var(constants::ENV_HAPROXY_BIN)
            .unwrap_or_else(|_| constants::DEFAULT_HAPROXY_BIN.to_string());

        Ok(Self {
            docker_url,
            network,
            config_path,
            domain,
            pid_file,
            templates_dir,
            debounce,
            mode,
            haproxy_bin,
        })
    }

    /// Check the configuration against the filesystem.
    ///
    /// Everything reported here is recoverable (the daemon converges
    /// once the missing piece appears), so findings are warnings
    /// rather than errors.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !self.config_path.is_file() {
            result.warnings.push(format!(
                "config file {:?} does not exist yet; passes will fail until it does",
                self.config_path
            ));
        }
        if !self.pid_file.is_file() {
            result.warnings.push(format!(
                "pid file {:?} does not exist yet; reloads will fail until haproxy starts",
                self.pid_file
            ));
        }
        if let Some(dir) = &self.templates_dir
            && !dir.is_dir()
        {
            result.warnings.push(format!(
                "template directory {dir:?} does not exist; only the built-in default template is available"
            ));
        }
        if self.debounce.is_zero() {
            result
                .warnings
                .push("debounce window is zero; every event triggers an immediate pass".into());
        }

        result
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Env mutation is process-global, hence #[serial] plus the unsafe
    // set/remove wrappers required by edition 2024.
    fn set(name: &str, value: &str) {
        unsafe { env::set_var(name, value) }
    }

    fn unset(name: &str) {
        unsafe { env::remove_var(name) }
    }

    fn clear_all() {
        for name in [
            constants::ENV_DOCKER_URL,
            constants::ENV_NETWORK,
            constants::ENV_CONFIG_FILE,
            constants::ENV_DOMAIN,
            constants::ENV_PID_FILE,
            constants::ENV_TEMPLATES_DIR,
            constants::ENV_DEBOUNCE_SECS,
            constants::ENV_ASSEMBLE_MODE,
            constants::ENV_HAPROXY_BIN,
        ] {
            unset(name);
        }
    }

    fn set_mandatory() {
        set(constants::ENV_NETWORK, "edge");
        set(constants::ENV_CONFIG_FILE, "/etc/haproxy/haproxy.cfg");
        set(constants::ENV_DOMAIN, "example.com");
        set(constants::ENV_PID_FILE, "/run/haproxy.pid");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_all();
        set_mandatory();

        let config = Config::from_env().unwrap();
        assert_eq!(config.docker_url, constants::DEFAULT_DOCKER_URL);
        assert_eq!(config.network, "edge");
        assert_eq!(config.domain, "example.com");
        assert_eq!(
            config.debounce,
            Duration::from_secs(constants::DEFAULT_DEBOUNCE_SECS)
        );
        assert_eq!(config.mode, AssembleMode::Markers);
        assert_eq!(config.haproxy_bin, constants::DEFAULT_HAPROXY_BIN);
        assert!(config.templates_dir.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_missing_mandatory_names_variable() {
        clear_all();
        set(constants::ENV_NETWORK, "edge");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains(constants::ENV_CONFIG_FILE));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_all();
        set_mandatory();
        set(constants::ENV_DOCKER_URL, "tcp://10.0.0.1:2375");
        set(constants::ENV_TEMPLATES_DIR, "/etc/haproxy/templates");
        set(constants::ENV_DEBOUNCE_SECS, "3");
        set(constants::ENV_ASSEMBLE_MODE, "anchor");
        set(constants::ENV_HAPROXY_BIN, "/usr/local/sbin/haproxy");

        let config = Config::from_env().unwrap();
        assert_eq!(config.docker_url, "tcp://10.0.0.1:2375");
        assert_eq!(
            config.templates_dir.as_deref(),
            Some(std::path::Path::new("/etc/haproxy/templates"))
        );
        assert_eq!(config.debounce, Duration::from_secs(3));
        assert_eq!(config.mode, AssembleMode::Anchor);
        assert_eq!(config.haproxy_bin, "/usr/local/sbin/haproxy");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_debounce() {
        clear_all();
        set_mandatory();
        set(constants::ENV_DEBOUNCE_SECS, "soon");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains(constants::ENV_DEBOUNCE_SECS));
    }

    #[test]
    fn test_assemble_mode_parsing() {
        assert_eq!(
            "markers".parse::<AssembleMode>().unwrap(),
            AssembleMode::Markers
        );
        assert_eq!(
            "Anchor".parse::<AssembleMode>().unwrap(),
            AssembleMode::Anchor
        );
        assert!("inline".parse::<AssembleMode>().is_err());
    }

    #[test]
    #[serial]
    fn test_validate_warns_on_missing_paths() {
        clear_all();
        set_mandatory();
        set(constants::ENV_CONFIG_FILE, "/nonexistent/haproxy.cfg");
        set(constants::ENV_PID_FILE, "/nonexistent/haproxy.pid");
        set(constants::ENV_TEMPLATES_DIR, "/nonexistent/templates");

        let config = Config::from_env().unwrap();
        let result = config.validate();
        assert!(result.has_warnings());
        assert_eq!(result.warnings.len(), 3);
    }
}
