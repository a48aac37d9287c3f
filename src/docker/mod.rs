//! Docker Engine API access.
//!
//! Everything the monitor knows about the world comes through here:
//!
//! - [`DockerClient`] - thin bollard wrapper bound to one network
//! - [`Member`] - an admitted container on that network
//! - [`NetworkEvent`] - a connect/disconnect notification
//!
//! The client is deliberately read-only; the monitor never mutates
//! container state, it only observes membership.

mod events;
mod inventory;
mod member;

pub use events::NetworkEvent;
pub use member::Member;

use bollard::{API_DEFAULT_VERSION, Docker};

use crate::constants;
use crate::error::{Error, Result};

/// API client bound to the network being monitored.
#[derive(Clone)]
pub struct DockerClient {
    api: Docker,
    network: String,
}

impl DockerClient {
    /// Connect to the Docker Engine API.
    ///
    /// `unix://` URLs use the local socket; `tcp://` and `http://`
    /// URLs go over plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when the endpoint cannot be set up.
    pub fn connect(docker_url: &str, network: impl Into<String>) -> Result<Self> {
        let api = if let Some(path) = docker_url.strip_prefix("unix://") {
            Docker::connect_with_socket(path, constants::DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_http(
                docker_url,
                constants::DOCKER_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            )
        }
        .map_err(Error::query)?;

        Ok(Self {
            api,
            network: network.into(),
        })
    }

    /// Name of the network this client watches.
    pub fn network(&self) -> &str {
        &self.network
    }
}
