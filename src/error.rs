//! Typed errors for the reconciliation pipeline.
//!
//! Every failure a pass can hit has a variant here, so the orchestrator
//! can log which stage broke and decide whether the daemon keeps
//! running. Stream errors are the only fatal class; everything else is
//! scoped to the pass that raised it.

use std::path::PathBuf;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Docker Engine API query failed (network or container inspect).
    #[error("docker query failed: {source}")]
    Query {
        #[source]
        source: bollard::errors::Error,
    },

    /// The event stream yielded a transport error.
    #[error("docker event stream failed: {source}")]
    EventStream {
        #[source]
        source: bollard::errors::Error,
    },

    /// The event stream ended without an error item.
    #[error("docker event stream ended")]
    EventStreamEnded,

    /// No template matched the member's key and no default exists.
    #[error("no template named '{key}' and no default template loaded")]
    MissingTemplate { key: String },

    /// A template file failed to parse at load time.
    #[error("template {path:?} failed to parse: {source}")]
    TemplateSyntax {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    /// Rendering a fragment for a member failed.
    #[error("rendering template '{template}' for member '{member}' failed: {source}")]
    Render {
        template: String,
        member: String,
        #[source]
        source: minijinja::Error,
    },

    /// A block marker did not occur exactly once in the base config.
    #[error("expected exactly one '{marker}' line, found {count}")]
    MarkerCount { marker: String, count: usize },

    /// The end marker precedes the begin marker.
    #[error("end marker appears before begin marker")]
    MarkerOrder,

    /// Anchor mode found no anchor line in the base config.
    #[error("anchor line '{anchor}' not found in base config")]
    AnchorMissing { anchor: String },

    /// The syntax validator rejected the staged candidate.
    #[error("haproxy rejected the staged config:\n{output}")]
    Validation { output: String },

    /// The PID file does not exist.
    #[error("pid file {path:?} not found; ensure haproxy runs with the -W flag so it writes one")]
    PidFileMissing { path: PathBuf },

    /// The PID file exists but holds no parseable PID.
    #[error("pid file {path:?} does not contain a pid: {contents:?}")]
    PidFileInvalid { path: PathBuf, contents: String },

    /// Sending the reload signal failed (stale PID, permissions).
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: std::io::Error,
    },

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a docker query error.
    pub fn query(source: bollard::errors::Error) -> Self {
        Self::Query { source }
    }

    /// Create an event stream transport error.
    pub fn event_stream(source: bollard::errors::Error) -> Self {
        Self::EventStream { source }
    }

    /// Create a missing template error.
    pub fn missing_template(key: impl Into<String>) -> Self {
        Self::MissingTemplate { key: key.into() }
    }

    /// Create a template parse error.
    pub fn template_syntax(path: impl Into<PathBuf>, source: minijinja::Error) -> Self {
        Self::TemplateSyntax {
            path: path.into(),
            source,
        }
    }

    /// Create a render error.
    pub fn render(
        template: impl Into<String>,
        member: impl Into<String>,
        source: minijinja::Error,
    ) -> Self {
        Self::Render {
            template: template.into(),
            member: member.into(),
            source,
        }
    }

    /// Create a marker count error.
    pub fn marker_count(marker: impl Into<String>, count: usize) -> Self {
        Self::MarkerCount {
            marker: marker.into(),
            count,
        }
    }

    /// Create a missing anchor error.
    pub fn anchor_missing(anchor: impl Into<String>) -> Self {
        Self::AnchorMissing {
            anchor: anchor.into(),
        }
    }

    /// Create a validation rejection error.
    pub fn validation(output: impl Into<String>) -> Self {
        Self::Validation {
            output: output.into(),
        }
    }

    /// Create a signal delivery error.
    pub fn signal(pid: i32, source: std::io::Error) -> Self {
        Self::Signal { pid, source }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl Error {
    /// Name of the pipeline stage this error belongs to, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Query { .. } => "snapshot",
            Self::MissingTemplate { .. } | Self::TemplateSyntax { .. } | Self::Render { .. } => {
                "render"
            }
            Self::MarkerCount { .. } | Self::MarkerOrder | Self::AnchorMissing { .. } => "assemble",
            Self::Validation { .. } => "validate",
            Self::PidFileMissing { .. } | Self::PidFileInvalid { .. } | Self::Signal { .. } => {
                "reload"
            }
            Self::EventStream { .. } | Self::EventStreamEnded => "watch",
            Self::Io { .. } => "io",
        }
    }

    /// True for errors that end the daemon rather than one pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EventStream { .. } | Self::EventStreamEnded)
    }

    /// True when the live config was already replaced but the running
    /// process could not be told about it.
    pub fn is_reload_failure(&self) -> bool {
        matches!(
            self,
            Self::PidFileMissing { .. } | Self::PidFileInvalid { .. } | Self::Signal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_classification() {
        assert_eq!(Error::EventStreamEnded.stage(), "watch");
        assert_eq!(Error::MarkerOrder.stage(), "assemble");
        assert_eq!(Error::missing_template("8080").stage(), "render");
        assert_eq!(Error::validation("parse error").stage(), "validate");
        assert_eq!(
            Error::signal(42, std::io::Error::other("no such process")).stage(),
            "reload"
        );
    }

    #[test]
    fn test_reload_failures_flagged() {
        let err = Error::PidFileMissing {
            path: PathBuf::from("/run/haproxy.pid"),
        };
        assert!(err.is_reload_failure());
        assert!(!err.is_fatal());

        let err = Error::validation("unknown keyword");
        assert!(!err.is_reload_failure());
    }

    #[test]
    fn test_only_stream_errors_are_fatal() {
        assert!(Error::EventStreamEnded.is_fatal());
        assert!(!Error::marker_count("# docker-backend-begin", 2).is_fatal());
    }

    #[test]
    fn test_pid_hint_mentions_master_worker_flag() {
        let err = Error::PidFileMissing {
            path: PathBuf::from("/run/haproxy.pid"),
        };
        assert!(err.to_string().contains("-W"));
    }
}
