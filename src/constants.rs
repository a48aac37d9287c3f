//! Shared constants for the monitor.
//!
//! Sentinel strings here are load-bearing: the block markers and the
//! anchor line must match what operators put in their `haproxy.cfg`,
//! and the label names form the contract containers opt in with.

/// Start sentinel of the managed backend block (marker mode).
pub const BLOCK_MARKER_BEGIN: &str = "# docker-backend-begin";

/// End sentinel of the managed backend block (marker mode).
pub const BLOCK_MARKER_END: &str = "# docker-backend-end";

/// Anchor line after which the config is regenerated (anchor mode).
pub const CONFIG_ANCHOR: &str = "# DOCKER_NETWORK_MONITOR_ANCHOR";

/// Label namespace stripped from label keys before they become
/// template variables.
pub const LABEL_NAMESPACE: &str = "haproxy.";

/// Label carrying the public-facing port; doubles as the template
/// selection key.
pub const LABEL_SOURCE_PORT: &str = "haproxy.source_port";

/// Label carrying the container-side port.
pub const LABEL_TARGET_PORT: &str = "haproxy.target_port";

/// Template used when no per-port template matches.
pub const DEFAULT_TEMPLATE_NAME: &str = "default";

/// File extension of backend fragment templates.
pub const TEMPLATE_EXTENSION: &str = "j2";

/// Docker Engine API endpoint used when `DOCKER_API_BASE_URL` is unset.
pub const DEFAULT_DOCKER_URL: &str = "unix:///var/run/docker.sock";

/// Quiet window between the last network event and the reconciliation
/// pass it triggers.
pub const DEFAULT_DEBOUNCE_SECS: u64 = 10;

/// Binary invoked both for validation (`-c -f`) and named in reload
/// diagnostics.
pub const DEFAULT_HAPROXY_BIN: &str = "haproxy";

/// Client timeout for Docker Engine API requests, in seconds.
/// Streaming endpoints (the event subscription) are not subject to it.
pub const DOCKER_TIMEOUT_SECS: u64 = 120;

// Environment variable names (the whole configuration surface).

pub const ENV_DOCKER_URL: &str = "DOCKER_API_BASE_URL";
pub const ENV_NETWORK: &str = "NETWORK_NAME";
pub const ENV_CONFIG_FILE: &str = "HAPROXY_CONFIG_FILE";
pub const ENV_DOMAIN: &str = "DOMAIN_NAME";
pub const ENV_PID_FILE: &str = "HAPROXY_PID_FILE";
pub const ENV_TEMPLATES_DIR: &str = "HAPROXY_TEMPLATES_DIR";
pub const ENV_DEBOUNCE_SECS: &str = "DEBOUNCE_SECS";
pub const ENV_ASSEMBLE_MODE: &str = "ASSEMBLE_MODE";
pub const ENV_HAPROXY_BIN: &str = "HAPROXY_BIN";
