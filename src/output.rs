//! Output formatting for command results.
//!
//! Results go to stdout; logs go to stderr and the log file.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Debug;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

/// Renders a value as pretty-printed JSON.
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Renders a value using Rust's debug pretty-print format.
pub fn render_pretty<T: Debug>(value: &T) -> String {
    format!("{:#?}", value)
}

/// Writes `value` to `out` in the requested format, followed by a newline.
pub fn write_result<T, W>(out: &mut W, format: OutputFormat, value: &T) -> Result<()>
where
    T: Serialize + Debug,
    W: Write,
{
    let text = match format {
        OutputFormat::Json => render_json(value)?,
        OutputFormat::Pretty => render_pretty(value),
    };
    writeln!(out, "{text}")?;
    Ok(())
}
