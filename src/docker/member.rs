//! Value type for one admitted network member.

use std::collections::BTreeMap;

use crate::constants;

/// A container attached to the monitored network that passed
/// admission (non-empty name and address, both required labels).
///
/// Members are immutable snapshots; a fresh set is built on every
/// reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    name: String,
    address: String,
    labels: BTreeMap<String, String>,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            labels,
        }
    }

    /// Container name as reported by the network endpoint.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// IPv4 address on the monitored network, without the CIDR suffix.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Full label map of the container.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Value of the source-port label, which doubles as the template
    /// selection key.
    pub fn template_key(&self) -> Option<&str> {
        self.labels
            .get(constants::LABEL_SOURCE_PORT)
            .map(String::as_str)
    }
}
