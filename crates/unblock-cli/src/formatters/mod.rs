//! Output formatters for analysis, plans and update results.

pub mod human;
pub mod json;

pub use json::print_json;
