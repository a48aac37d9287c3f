//! Reconciliation orchestrator.
//!
//! Ties the pipeline together: a snapshot of the monitored network is
//! rendered to fragments, spliced into the base config and applied
//! fail-closed, and network events (debounced) decide when that
//! happens. Passes never run concurrently; while one is in flight at
//! most one more is queued, so any event burst collapses into "finish
//! the current pass, then run exactly one fresh one".

use std::fs;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::docker::DockerClient;
use crate::error::{Error, Result};
use crate::haproxy::{Applier, HaproxyController, TemplateSet, assemble};

/// One monitor instance: config, runtime client, applier.
pub struct Monitor {
    config: Config,
    docker: DockerClient,
    applier: Applier,
}

impl Monitor {
    /// Connect to the container runtime and wire up the production
    /// process controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when the Docker endpoint cannot be
    /// set up.
    pub fn new(config: Config) -> Result<Self> {
        let docker = DockerClient::connect(&config.docker_url, &config.network)?;
        let controller = Arc::new(HaproxyController::new(
            config.haproxy_bin.clone(),
            config.pid_file.clone(),
        ));
        let applier = Applier::new(config.config_path.clone(), controller);
        Ok(Self {
            config,
            docker,
            applier,
        })
    }

    /// Build the candidate config without touching the live file.
    ///
    /// This is the read-only front half of a pass; `sync --dry-run`
    /// prints its output directly.
    ///
    /// # Errors
    ///
    /// Any snapshot, template or assembly error for this pass.
    pub async fn assemble_candidate(&self) -> Result<String> {
        let members = self.docker.snapshot().await?;

        // Templates reload per pass so fragment edits take effect on
        // the next event without a restart.
        let templates =
            TemplateSet::load(self.config.templates_dir.as_deref(), &self.config.domain)?;
        let mut fragments = Vec::with_capacity(members.len());
        for member in &members {
            fragments.push(templates.resolve(member)?);
        }

        let base = fs::read_to_string(&self.config.config_path).map_err(|source| {
            Error::io(format!("reading {:?}", self.config.config_path), source)
        })?;
        let candidate = assemble(self.config.mode, &base, &fragments)?;
        debug!(
            members = members.len(),
            bytes = candidate.len(),
            "candidate assembled"
        );
        Ok(candidate)
    }

    /// One full reconciliation pass: snapshot, render, assemble,
    /// apply.
    ///
    /// # Errors
    ///
    /// Any pipeline error; see [`Error::stage`] for classification.
    pub async fn reconcile_once(&self) -> Result<()> {
        let candidate = self.assemble_candidate().await?;
        self.applier.apply(&candidate).await
    }

    /// Run the daemon: one startup pass, then event-driven passes
    /// until the event stream dies.
    ///
    /// # Errors
    ///
    /// Only stream termination escapes ([`Error::EventStream`],
    /// [`Error::EventStreamEnded`]); per-pass failures are logged and
    /// the subscription stays up.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        // Converge immediately; membership may have changed while no
        // monitor was watching.
        info!("running startup pass");
        match self.reconcile_once().await {
            Ok(()) => info!("startup pass complete"),
            Err(error) => log_pass_error(&error),
        }

        // Single-slot trigger queue: one pass in flight, at most one
        // pending behind it.
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let worker = tokio::spawn({
            let monitor = Arc::clone(&self);
            async move {
                while trigger_rx.recv().await.is_some() {
                    info!("reconciling after network change");
                    match monitor.reconcile_once().await {
                        Ok(()) => info!("pass complete"),
                        Err(error) => log_pass_error(&error),
                    }
                }
            }
        });

        let debouncer = Debouncer::new(self.config.debounce, move || {
            // A full slot means a pass is already queued; that pass
            // will observe this burst's final state anyway.
            let _ = trigger_tx.try_send(());
        });

        let result = self
            .docker
            .watch(|event| {
                debug!(
                    action = %event.action,
                    container = ?event.container,
                    "network event"
                );
                debouncer.trigger();
            })
            .await;

        debouncer.cancel();
        worker.abort();
        result
    }
}

fn log_pass_error(error: &Error) {
    if error.is_reload_failure() {
        error!(
            stage = error.stage(),
            %error,
            "live config updated but reload failed; haproxy may still serve the old config"
        );
    } else {
        error!(stage = error.stage(), %error, "reconciliation pass failed");
    }
}
