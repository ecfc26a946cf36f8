//! Logging setup using the `tracing` ecosystem.
//!
//! Logs go to stderr so `--json` output on stdout stays parseable.
//!
//! The level is chosen in this order:
//! 1. `--verbose`: debug for unblock crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. warn for unblock crates

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const UNBLOCK_CRATES: [&str; 5] = [
    "unblock",
    "unblock_cli",
    "unblock_config",
    "unblock_deps",
    "unblock_registry",
];

/// Directive string applying `level` to every unblock crate
pub fn directives(level: &str) -> String {
    UNBLOCK_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Filter for the given flags
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("warn")))
    }
}

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .init();
}
