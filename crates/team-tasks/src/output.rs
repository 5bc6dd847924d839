//! stdout rendering. stdout carries exactly one document per command (JSON
//! or text); diagnostics go to stderr through tracing.

use anyhow::Result;
use coordination::{CoordError, TextReport};
use serde::Serialize;

/// Print a report as pretty JSON or through its text rendering.
pub fn report<T: Serialize + TextReport>(json: bool, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", value.to_text());
    }
    Ok(())
}

/// Print `value` as JSON, or a one-off text message.
pub fn message<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

/// Print an engine error. JSON mode keeps it on stdout so callers parse a
/// single stream; the exit code tells success from failure.
pub fn coord_error(json: bool, err: &CoordError) {
    if json {
        let structured = err.to_structured();
        match serde_json::to_string_pretty(&structured) {
            Ok(body) => println!("{}", body),
            Err(_) => println!("{}", structured),
        }
    } else {
        eprintln!("error: {}", err);
        eprintln!("  hint: {}", err.recovery_suggestion());
    }
}

/// Split comma lists that clap left with stray whitespace or empty items.
pub fn clean_ids(ids: Vec<String>) -> Vec<String> {
    ids.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
