//! unblock CLI library components.
//!
//! The `unblock` binary is in `main.rs`; everything it uses lives here so
//! it can be tested without spawning the binary.

pub mod cli;
pub mod commands;
pub mod context;
pub mod formatters;
pub mod hints;
pub mod logger;
pub mod progress;

pub use cli::Cli;
pub use context::ProjectContext;
