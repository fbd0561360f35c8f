//! Subscriber setup for TenQ logs
//!
//! Every TenQ component logs through `tracing`: registrations, evictions
//! and dispatches at `debug`, operand resolution at `trace`, chain-tier
//! failures at `error` under the `tenq::chain` target. This module only
//! installs a formatter for those events.
//!
//! ```ignore
//! use tenq_dispatch::tracing_support::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::from_env())?;
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directive (default `tenq=info,warn`)
//! - `TENQ_LOG_FORMAT`: `pretty` or `compact` (default `pretty`)

use anyhow::Result;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const ENV_LOG_FORMAT: &str = "TENQ_LOG_FORMAT";
pub const DEFAULT_FILTER: &str = "tenq=info,warn";

/// Event layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line, one field per line
    #[default]
    Pretty,
    /// One line per event
    Compact,
}

impl TracingFormat {
    /// Unknown names fall back to [`TracingFormat::Pretty`].
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("compact") {
            TracingFormat::Compact
        } else {
            TracingFormat::Pretty
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub format: TracingFormat,
    /// `EnvFilter` directive, e.g. `tenq_dispatch=debug,info`
    pub filter: String,
    pub ansi: bool,
    /// Print the module path of each event
    pub show_target: bool,
    /// Print file and line of each event
    pub show_source: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
            ansi: true,
            show_target: true,
            show_source: false,
        }
    }
}

impl TracingConfig {
    /// Defaults overridden by `RUST_LOG` and `TENQ_LOG_FORMAT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(format) = std::env::var(ENV_LOG_FORMAT) {
            config.format = TracingFormat::parse(&format);
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            config.filter = filter;
        }
        config
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// Install the global subscriber. Fails on a malformed filter or when a
/// subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;
    let base = fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.show_target)
        .with_file(config.show_source)
        .with_line_number(config.show_source);
    let layer = match config.format {
        TracingFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        TracingFormat::Compact => base.compact().with_filter(filter).boxed(),
    };
    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}

/// No-op without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub fn init_tracing(_config: TracingConfig) -> Result<()> {
    Ok(())
}
