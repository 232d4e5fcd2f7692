//! Tracing setup for Ladder binaries.
//!
//! [`init_tracing`] installs the global subscriber once; later calls are
//! ignored because a process can only have one global subscriber.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var holding an `EnvFilter` directive (e.g. `ladder_core=debug`).
pub const LOG_FILTER_ENV: &str = "LADDER_LOG";
/// Env var selecting the output format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LADDER_LOG_FORMAT";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    /// Newline-delimited JSON, for log aggregation.
    Json,
}

impl LogFormat {
    /// `Json` if `force_json` is set or `LADDER_LOG_FORMAT=json`.
    pub fn resolve(force_json: bool) -> Self {
        let from_env = std::env::var(LOG_FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if force_json || from_env {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Initialise the global tracing subscriber.
///
/// The filter comes from `LADDER_LOG`, then `RUST_LOG`, then `level`.
pub fn init_tracing(format: LogFormat, level: Level) {
    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(false).json())
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init(),
    };
}
