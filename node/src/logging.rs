//! # Structured Logging
//!
//! Sets up the `tracing` subscriber for `vaultline-node`. Three renderings are
//! available; `RUST_LOG` narrows or widens the default directives.
//!
//! Everything is written to stderr. The `inspect`, `evaluate` and `build`
//! subcommands print JSON on stdout and must not be interleaved with logs.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str =
    "vaultline_node=info,vaultline_contracts=info,vaultline_protocol=info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line colored output with source locations.
    Pretty,
    /// One line per event, no source locations.
    Compact,
    /// JSON lines for log aggregation.
    Json,
}

/// Resolve the effective filter: `RUST_LOG` when it parses, else `default`.
fn build_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Call once, before any other work in `main()`.
///
/// ```text
/// RUST_LOG=vaultline_contracts=debug,vaultline_node=info vaultline-node serve
/// ```
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(build_filter(default_filter));
    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);

    match format {
        LogFormat::Pretty => registry
            .with(base.with_file(true).with_line_number(true))
            .init(),
        LogFormat::Compact => registry.with(base.compact()).init(),
        LogFormat::Json => registry.with(base.json().with_current_span(true)).init(),
    }

    tracing::debug!(?format, "logging initialized");
}
