//! Structured logging setup for processes built on Keel.
//!
//! Every Keel crate emits `tracing` events under `keel::*` targets: heap
//! registration and resolution failures, index node churn, startup entry
//! progress. Nothing is printed until a subscriber is installed; [`init`]
//! installs a console subscriber once per process.
//!
//! `RUST_LOG` takes precedence when set. Otherwise the filter is
//! `keel=<level>` with the level from [`LogConfig`].

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Environment variable selecting the default level.
pub const LEVEL_VAR: &str = "KEEL_LOG_LEVEL";

/// Environment variable enabling span enter/close events.
pub const SPANS_VAR: &str = "KEEL_LOG_SPANS";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level applied to `keel` targets when `RUST_LOG` is unset.
    pub level: Level,
    /// Emit span enter/close events.
    pub show_spans: bool,
    /// Include thread ids and source lines in each event.
    pub show_location: bool,
}

impl LogConfig {
    /// Default level.
    pub const DEFAULT_LEVEL: Level = Level::INFO;

    /// Read [`LEVEL_VAR`] and [`SPANS_VAR`]. Unknown level names fall back
    /// to [`Self::DEFAULT_LEVEL`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var(LEVEL_VAR) {
            config.level = parse_level(&level).unwrap_or(Self::DEFAULT_LEVEL);
        }
        config.show_spans = std::env::var_os(SPANS_VAR).is_some();
        config
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            show_spans: false,
            show_location: false,
        }
    }

    /// Everything, including node-level index churn.
    pub fn verbose() -> Self {
        Self {
            level: Level::TRACE,
            show_spans: true,
            show_location: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("keel={}", self.level.as_str().to_lowercase()))
        })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::DEFAULT_LEVEL,
            show_spans: false,
            show_location: cfg!(debug_assertions),
        }
    }
}

fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the console subscriber configured from the environment.
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Install the console subscriber with `config`.
///
/// Only the first call in a process has any effect. If another global
/// subscriber is already installed, it is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let installed = tracing_subscriber::registry()
            .with(config.filter())
            .with(
                fmt::layer()
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_thread_ids(config.show_location)
                    .with_line_number(config.show_location),
            )
            .try_init();
        if let Err(e) = installed {
            tracing::debug!(target: "keel::logging", error = %e, "subscriber already installed");
        }
    });
}

/// Whether [`init`] or [`init_with_config`] has run.
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(LogConfig::default().level, Level::INFO);
        assert!(!LogConfig::default().show_spans);
        assert_eq!(LogConfig::quiet().level, Level::ERROR);
        let verbose = LogConfig::verbose();
        assert_eq!(verbose.level, Level::TRACE);
        assert!(verbose.show_spans && verbose.show_location);
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("TRACE"), Some(Level::TRACE));
        assert_eq!(parse_level(" warn "), Some(Level::WARN));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn init_is_idempotent() {
        init_with_config(LogConfig::quiet());
        init();
        assert!(is_initialized());
    }
}
