//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with support for both human-readable and
//! JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `default_level` seeds the filter when the RUST_LOG environment variable
/// is unset. Log output goes to stderr; stdout is reserved for report data.
pub fn init(default_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the configuration file, with CLI overrides.
///
/// `--verbose` forces debug level regardless of the configured level;
/// `--json-logs` forces JSON output regardless of the configured format.
pub fn init_from_config(
    config: &darkroom_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = if verbose_override {
        "debug"
    } else {
        &config.logging.level
    };
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}
