//! CLI command implementations

pub mod check;
pub mod import;
pub mod init;
pub mod validate;

use anyhow::Context;
use serde_json::Value;
use std::io::Read;

/// Reads a JSON document from a file, or from stdin when `path` is `-`
pub(crate) fn read_json(path: &str) -> anyhow::Result<Value> {
    let text = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("{path} is not valid JSON"))
}
