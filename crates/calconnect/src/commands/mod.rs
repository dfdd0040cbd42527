//! Subcommand implementations.

pub mod calendar;
pub mod config;

use serde::Serialize;

use crate::error::AppResult;

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
