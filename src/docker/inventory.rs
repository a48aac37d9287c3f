//! Point-in-time membership snapshots.
//!
//! A snapshot is the single source of truth for one reconciliation
//! pass: inspect the network, then each attached container, and keep
//! only the containers that opted in with both `haproxy.` labels.
//! Rendering never consults the runtime again after this.

use std::collections::HashMap;

use bollard::network::InspectNetworkOptions;
use tracing::{debug, warn};

use super::{DockerClient, Member};
use crate::constants;
use crate::error::{Error, Result};

impl DockerClient {
    /// Build the eligible member set for one pass.
    ///
    /// Containers missing a name, an IPv4 address or either required
    /// label are skipped with a warning. The returned order is the
    /// runtime's own enumeration order; no sorting is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when the network inspect or any
    /// container inspect fails; a partial snapshot is never returned.
    pub async fn snapshot(&self) -> Result<Vec<Member>> {
        let network = self
            .api
            .inspect_network(&self.network, None::<InspectNetworkOptions<String>>)
            .await
            .map_err(Error::query)?;
        let endpoints = network.containers.unwrap_or_default();

        let mut members = Vec::with_capacity(endpoints.len());
        // Endpoint keys are container ids; inspect by id and keep the
        // endpoint name for rendering.
        for (id, endpoint) in &endpoints {
            let details = self
                .api
                .inspect_container(id, None)
                .await
                .map_err(Error::query)?;
            let labels = details
                .config
                .and_then(|config| config.labels)
                .unwrap_or_default();
            if let Some(member) = admit_member(
                endpoint.name.as_deref(),
                endpoint.ipv4_address.as_deref(),
                labels,
            ) {
                members.push(member);
            }
        }

        debug!(
            network = %self.network,
            members = members.len(),
            "snapshot complete"
        );
        Ok(members)
    }
}

/// Apply the admission rules to one network endpoint.
///
/// `ipv4_address` arrives in CIDR form (`172.18.0.2/16`); only the
/// address part is kept.
fn admit_member(
    name: Option<&str>,
    ipv4_address: Option<&str>,
    labels: HashMap<String, String>,
) -> Option<Member> {
    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => {
            warn!("skipping network member without a name");
            return None;
        }
    };

    let address = ipv4_address
        .and_then(|cidr| cidr.split('/').next())
        .filter(|address| !address.is_empty());
    let Some(address) = address else {
        warn!(container = name, "skipping member without an IPv4 address");
        return None;
    };

    if !labels.contains_key(constants::LABEL_SOURCE_PORT)
        || !labels.contains_key(constants::LABEL_TARGET_PORT)
    {
        warn!(
            container = name,
            "skipping container due to missing haproxy label(s)"
        );
        return None;
    }

    Some(Member::new(name, address, labels.into_iter().collect()))
}
