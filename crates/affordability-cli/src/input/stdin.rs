use serde_json::Value;
use std::io::{self, Read};

/// Piped JSON on stdin, or `None` when stdin is a terminal or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().lock().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| format!("stdin is not valid JSON: {e}"))?;
    tracing::debug!(bytes = trimmed.len(), "read input from stdin");
    Ok(Some(value))
}
