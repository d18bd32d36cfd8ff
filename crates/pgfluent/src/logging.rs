//! Warning/error sink used by builders.
//!
//! Builders never propagate their failures to the caller; they hand them to a
//! [`LogSink`] and return an empty result. The default sink forwards to
//! `tracing` under the `pgfluent` target, and [`init_file_logging`] installs a
//! subscriber that appends those events to a log file.

use crate::error::{OrmError, OrmResult, Severity};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::util::SubscriberInitExt;

/// Destination for non-fatal builder diagnostics.
pub trait LogSink: Send + Sync {
    fn log_warning(&self, message: &str);
    fn log_error(&self, message: &str);
}

/// Sink that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log_warning(&self, message: &str) {
        tracing::warn!(target: "pgfluent", "{message}");
    }

    fn log_error(&self, message: &str) {
        tracing::error!(target: "pgfluent", "{message}");
    }
}

/// Shared default sink.
pub fn default_sink() -> Arc<dyn LogSink> {
    Arc::new(TracingSink)
}

/// Report `err` through `sink` at its own severity.
pub fn report(sink: &dyn LogSink, err: &OrmError) {
    let message = err.to_string();
    match err.severity() {
        Severity::Warning => sink.log_warning(&message),
        Severity::Error => sink.log_error(&message),
    }
}

/// Install a global subscriber appending warnings and errors to `path`.
///
/// The file is created if missing. `RUST_LOG` overrides the default `warn` filter.
pub fn init_file_logging(path: impl AsRef<Path>) -> OrmResult<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            OrmError::Config(format!("cannot create log directory {}: {e}", dir.display()))
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| OrmError::Config(format!("cannot open log file {}: {e}", path.display())))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .finish()
        .try_init()
        .map_err(|e| OrmError::Config(format!("logging already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(Severity, String)>>);

    impl LogSink for Capture {
        fn log_warning(&self, message: &str) {
            self.0.lock().unwrap().push((Severity::Warning, message.to_string()));
        }

        fn log_error(&self, message: &str) {
            self.0.lock().unwrap().push((Severity::Error, message.to_string()));
        }
    }

    #[test]
    fn file_logging_appends_errors() {
        let dir = std::env::temp_dir().join(format!("pgfluent-log-{}", std::process::id()));
        let path = dir.join("pgfluent.log");
        init_file_logging(&path).unwrap();

        TracingSink.log_error("relation \"ghosts\" does not exist");
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("ghosts"));
        assert!(init_file_logging(&path).is_err());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn report_routes_by_severity() {
        let sink = Capture::default();
        report(&sink, &OrmError::InvalidOrderDirection("up".into()));
        report(&sink, &OrmError::MissingPrimaryKeyForDelete("users".into()));

        let logged = sink.0.lock().unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0].0, Severity::Warning);
        assert!(logged[0].1.contains("\"up\""));
        assert_eq!(logged[1].0, Severity::Error);
        assert!(logged[1].1.contains("users"));
    }
}
