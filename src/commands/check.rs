//! Environment diagnostics.
//!
//! Read-only checks of everything `run` needs: the variable contract,
//! the base config's sentinels, the template set, the PID file, the
//! haproxy binary and the Docker endpoint. Nothing is written and no
//! signal is sent.

use std::fs;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::config::Config;
use crate::docker::DockerClient;
use crate::haproxy::{TemplateSet, verify_base};

/// Inspect the deployment and report findings.
///
/// # Errors
///
/// Returns an error when the configuration itself cannot be loaded,
/// or after reporting when any fatal finding was hit.
pub async fn execute() -> Result<()> {
    let config = Config::from_env().context("configuration")?;
    println!(
        "watching '{}' -> {:?} ({} mode)",
        config.network, config.config_path, config.mode
    );

    let mut problems = 0;

    match fs::read_to_string(&config.config_path) {
        Ok(base) => match verify_base(config.mode, &base) {
            Ok(()) => println!("ok: config file accepts {} mode", config.mode),
            Err(error) => {
                problems += 1;
                println!("error: {error}");
            }
        },
        Err(error) => {
            problems += 1;
            println!("error: cannot read {:?}: {error}", config.config_path);
        }
    }

    match TemplateSet::load(config.templates_dir.as_deref(), &config.domain) {
        Ok(set) => println!(
            "ok: {} template(s) loaded: {}",
            set.names().len(),
            set.names().join(", ")
        ),
        Err(error) => {
            problems += 1;
            println!("error: {error}");
        }
    }

    // Recoverable at runtime, so a warning rather than a problem.
    if config.pid_file.is_file() {
        println!("ok: pid file {:?} present", config.pid_file);
    } else {
        println!(
            "warning: pid file {:?} not found; reloads will fail until haproxy starts with -W",
            config.pid_file
        );
    }

    match Command::new(&config.haproxy_bin).arg("-v").output() {
        Ok(output) if output.status.success() => {
            let banner = String::from_utf8_lossy(&output.stdout);
            println!(
                "ok: {} ({})",
                config.haproxy_bin,
                banner.lines().next().unwrap_or("").trim()
            );
        }
        _ => {
            problems += 1;
            println!("error: cannot run '{} -v'", config.haproxy_bin);
        }
    }

    match DockerClient::connect(&config.docker_url, &config.network) {
        Ok(docker) => match docker.snapshot().await {
            Ok(members) => println!(
                "ok: network '{}' has {} eligible member(s)",
                config.network,
                members.len()
            ),
            Err(error) => {
                problems += 1;
                println!("error: {error}");
            }
        },
        Err(error) => {
            problems += 1;
            println!("error: {error}");
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) found");
    }
    println!("all checks passed");
    Ok(())
}
