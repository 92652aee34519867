use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::constants::{LOG_FORMAT, LOG_LEVEL};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub use_json: bool,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_level: String,
}

impl LoggingConfig {
    pub fn new() -> LoggingConfig {
        Self::from_values(LOG_FORMAT.as_deref(), LOG_LEVEL.as_str())
    }

    fn from_values(format: Option<&str>, default_level: &str) -> LoggingConfig {
        let use_json = format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"));

        Self {
            use_json,
            default_level: default_level.to_owned(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets up console logging for the process.
///
/// Meant to be called once by the embedding application; later calls leave the first
/// subscriber in place.
pub fn init_logging(cfg: LoggingConfig) {
    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false);
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.default_level))
        .unwrap_or_default();

    let result = if cfg.use_json {
        tracing_subscriber::registry()
            .with(fmt_layer_base.json().with_filter(fmt_filter))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer_base.with_filter(fmt_filter))
            .try_init()
    };

    match result {
        Ok(()) => info!(json = cfg.use_json, "Upload client logging configured."),
        Err(e) => warn!("Logging already configured; keeping existing subscriber ({e})."),
    }
}
