//! JSON output

use anyhow::{Context, Result};
use serde::Serialize;

/// Pretty-printed JSON for any result type
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Error serializing results")
}

/// Print `value` as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}
