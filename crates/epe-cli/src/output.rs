// crates/epe-cli/src/output.rs
//
// Output formatting utilities for the epe CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format rows whose columns are only known at runtime (one per witness).
pub fn format_grid(header: Vec<String>, rows: Vec<Vec<String>>) -> String {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }
    builder.build().to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Shorten `s` to `max_chars` characters, appending "..." if cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: &'static str,
        #[tabled(rename = "Tokens")]
        tokens: usize,
    }

    #[test]
    fn table_has_renamed_headers() {
        let out = format_table(&[Row { id: "w1", tokens: 3 }]);
        assert!(out.contains("ID"));
        assert!(out.contains("Tokens"));
        assert!(out.contains("w1"));
    }

    #[test]
    fn grid_renders_dynamic_columns() {
        let out = format_grid(
            vec!["#".into(), "a".into(), "b".into()],
            vec![vec!["0".into(), "x".into(), "*y*".into()]],
        );
        assert!(out.contains("*y*"));
        assert_eq!(out.lines().filter(|l| l.contains('x')).count(), 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("αβγδεζη", 5), "αβγδε...");
        assert_eq!(truncate("short", 10), "short");
    }
}
