//! Logging setup and error reporting
//!
//! Error reporting is process-wide state set once at startup. The reporter
//! itself is optional: callers decide at startup whether one is present, and
//! [`capture_error`] drops errors when none was installed.

use crate::error::{Error, Result};
use sentry::types::Dsn;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ENVIRONMENT: &str = "production";

/// Destination for captured errors
pub trait ErrorReporter: Send + Sync {
    /// Record one error
    fn capture(&self, error: &Error);

    /// Wait up to `timeout` for captured errors to be delivered
    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Error reporting settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Sentry DSN; reporting is off without one
    #[serde(default)]
    pub dsn: Option<String>,
    /// Deployment environment tag
    #[serde(default)]
    pub environment: Option<String>,
}

impl ReportingConfig {
    /// The configured DSN, parsed. Blank counts as unset.
    pub fn parsed_dsn(&self) -> Result<Option<Dsn>> {
        let Some(dsn) = self.dsn.as_deref().map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        dsn.parse::<Dsn>()
            .map(Some)
            .map_err(|e| Error::invalid_value("error_reporting.dsn", format!("{dsn}: {e}")))
    }
}

/// Reporter sending captured errors to Sentry.
///
/// Owns its own client and hub, so nothing is bound to the global Sentry hub.
pub struct SentryReporter {
    hub: sentry::Hub,
    client: Arc<sentry::Client>,
}

impl SentryReporter {
    /// Build a reporter for the configured DSN; `Ok(None)` when there is none
    pub fn new(config: &ReportingConfig) -> Result<Option<Self>> {
        let Some(dsn) = config.parsed_dsn()? else {
            return Ok(None);
        };

        let environment = config
            .environment
            .clone()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        let options = sentry::ClientOptions {
            dsn: Some(dsn),
            environment: Some(environment.into()),
            release: sentry::release_name!(),
            ..Default::default()
        };

        let client = Arc::new(sentry::Client::with_options(sentry::apply_defaults(options)));
        let hub = sentry::Hub::new(Some(client.clone()), Arc::new(sentry::Scope::default()));
        Ok(Some(Self { hub, client }))
    }
}

impl ErrorReporter for SentryReporter {
    fn capture(&self, err: &Error) {
        let event_id = self.hub.capture_error(err);
        debug!(%event_id, status = ?err.status(), "Reported error: {err}");
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.client.flush(Some(timeout))
    }
}

impl std::fmt::Debug for SentryReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryReporter")
            .field("enabled", &self.client.is_enabled())
            .finish_non_exhaustive()
    }
}

/// Error reporting state: set once, read thereafter
pub enum ReportingState {
    Disabled,
    Enabled(Arc<dyn ErrorReporter>),
}

static REPORTING: OnceLock<ReportingState> = OnceLock::new();

/// Install the process-wide reporter.
///
/// Returns `false` if reporting was already initialized; the first call wins.
pub fn init_error_reporting(reporter: Option<Arc<dyn ErrorReporter>>) -> bool {
    let state = match reporter {
        Some(r) => ReportingState::Enabled(r),
        None => ReportingState::Disabled,
    };
    let installed = REPORTING.set(state).is_ok();
    if !installed {
        debug!("Error reporting already initialized");
    }
    installed
}

/// Whether a reporter is installed
pub fn error_reporting_enabled() -> bool {
    matches!(REPORTING.get(), Some(ReportingState::Enabled(_)))
}

/// Send an error to the installed reporter, if any
pub fn capture_error(err: &Error) {
    if let Some(ReportingState::Enabled(reporter)) = REPORTING.get() {
        reporter.capture(err);
    }
}

/// Deliver pending reports before the process exits
pub fn flush_error_reporting(timeout: Duration) -> bool {
    match REPORTING.get() {
        Some(ReportingState::Enabled(reporter)) => {
            let delivered = reporter.flush(timeout);
            if !delivered {
                warn!("Error reports not delivered within {timeout:?}");
            }
            delivered
        }
        _ => true,
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    // A subscriber may already be set (e.g. in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
