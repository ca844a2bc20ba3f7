//! Harness generation
//!
//! Turns user code into a runnable program whose result can be read back:
//! - Function mode: the generated program feeds the input to the user's
//!   entry point and prints the JSON of its result after a sentinel line.
//! - Full-program mode: only stdout is wrapped. Everything the program
//!   prints is buffered and re-emitted after the sentinel on exit.
//!
//! Anything printed before the sentinel (debug output, runtime banners) is
//! discarded by `extract_captured`. A run without the sentinel is an
//! `OutputFormat` error.
//!
//! Harnesses for compiled languages read their input from stdin, so the
//! generated source does not depend on the test case.
//!
//! This module does NOT:
//! - Write files or spawn processes
//! - Compare results

pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;

use serde_json::Value;

use crate::core::ExecutionError;

/// Message printed by harnesses that find no entry point
pub const MISSING_ENTRY_POINT: &str =
    "No `output` variable assigned and no `solution` function defined";

/// Source with its output wrapped, plus the marker that delimits the capture
#[derive(Debug, Clone)]
pub struct CapturedProgram {
    pub source: String,
    pub sentinel: String,
}

/// Sentinel line for one program identity
pub fn sentinel_for(program_id: &str) -> String {
    format!("__CODEJUDGE_RESULT_{}__", program_id)
}

/// Text the program emitted after the last sentinel line
pub fn extract_captured<'a>(stdout: &'a str, sentinel: &str) -> Result<&'a str, ExecutionError> {
    let start = stdout.rfind(sentinel).ok_or_else(|| {
        ExecutionError::OutputFormat("program output is missing the result marker".to_string())
    })?;
    let rest = &stdout[start + sentinel.len()..];
    Ok(rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest))
}

/// Parse the JSON line a function-mode harness printed
pub fn parse_function_result(captured: &str) -> Result<Value, ExecutionError> {
    let trimmed = captured.trim();
    serde_json::from_str(trimmed).map_err(|e| {
        ExecutionError::OutputFormat(format!("result is not valid JSON ({}): {}", e, trimmed))
    })
}

/// Render a test input for a full program's stdin.
///
/// Arrays become one element per line, objects are JSON, strings are passed
/// raw and other scalars as their JSON text.
pub fn format_stdin(input: &Value) -> String {
    let text = match input {
        Value::Array(items) => items
            .iter()
            .map(scalar_line)
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar_line(other),
    };
    if text.ends_with('\n') {
        text
    } else {
        text + "\n"
    }
}

fn scalar_line(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Python/JavaScript-compatible double-quoted string literal
pub(crate) fn string_literal(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
