//! Output formatting for porter.
//!
//! Provides JSON and concise text renderings of command results.

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format - machine-readable output
    Json,
    /// Plain text format - one line per item
    #[default]
    Text,
}

/// Formatter that can output data in text or JSON format
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a list, wrapped in a named envelope for JSON.
    ///
    /// `extra` fields are merged into the JSON envelope; text output lists
    /// the items (or `empty_message`) followed by the extra fields.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format_list<T: Serialize>(
        &self,
        data: &[T],
        empty_message: &str,
        collection_name: &str,
        extra: &[(&str, serde_json::Value)],
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut envelope = serde_json::Map::new();
                envelope.insert(collection_name.to_string(), serde_json::to_value(data)?);
                envelope.insert("count".to_string(), serde_json::json!(data.len()));
                for (key, value) in extra {
                    envelope.insert((*key).to_string(), value.clone());
                }
                Ok(serde_json::to_string_pretty(&serde_json::Value::Object(
                    envelope,
                ))?)
            }
            OutputFormat::Text => {
                let mut lines = Vec::new();
                if data.is_empty() {
                    lines.push(empty_message.to_string());
                } else {
                    lines.push(render_text(&serde_json::to_value(data)?));
                }
                for (key, value) in extra {
                    lines.push(format!("{key}:{}", render_field_value(value)));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format and print a list with a custom empty message
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_list<T: Serialize>(
        &self,
        data: &[T],
        empty_message: &str,
        collection_name: &str,
        extra: &[(&str, serde_json::Value)],
    ) -> Result<()> {
        let output = self.format_list(data, empty_message, collection_name, extra)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{output}")?;
        Ok(())
    }
}

/// Render a JSON value as concise text
fn render_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            // Identity and location first, in this order.
            let lead_keys = ["id", "path", "line"];
            let mut parts = Vec::new();

            for key in &lead_keys {
                if let Some(val) = map.get(*key) {
                    parts.push(render_field_value(val));
                }
            }

            for (key, val) in map {
                if lead_keys.contains(&key.as_str()) {
                    continue;
                }
                match val {
                    serde_json::Value::Array(arr) if arr.is_empty() => {}
                    serde_json::Value::Null => {}
                    _ => parts.push(format!("{key}:{}", render_field_value(val))),
                }
            }
            parts.join("  ")
        }
        serde_json::Value::Array(arr) => {
            arr.iter().map(render_text).collect::<Vec<_>>().join("\n")
        }
        _ => render_field_value(value),
    }
}

/// Render a single field value as concise text
fn render_field_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => {
            if s.contains(' ') || s.contains('\n') {
                format!("\"{}\"", s.replace('\n', "\\n"))
            } else {
                s.clone()
            }
        }
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(render_field_value).collect();
            format!("[{}]", items.join(","))
        }
        serde_json::Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{k}:{}", render_field_value(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}
