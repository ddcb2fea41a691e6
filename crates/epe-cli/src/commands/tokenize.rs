// crates/epe-cli/src/commands/tokenize.rs
//
// `epe tokenize FILES... [--pattern P]`: import witness files and show how
// the pattern splits them.

use std::path::PathBuf;

use clap::Args;
use tabled::Tabled;

use epe_core::session::Session;

use super::{load_session, Context};
use crate::output::{format_json, format_table, truncate, OutputFormat};

/// Tokenize witness files.
#[derive(Debug, Args)]
pub struct TokenizeCmd {
    /// Plain-text witness files; the file name without extension becomes the id.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Token pattern, bare (`\w+`) or delimited with flags (`/\w+/i`).
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tokens")]
    tokens: usize,
    #[tabled(rename = "Preview")]
    preview: String,
}

fn render(session: &Session, format: OutputFormat) -> String {
    let summaries: Vec<_> = session.witnesses().iter().map(|w| w.summary()).collect();
    match format {
        OutputFormat::Json => format_json(&summaries),
        OutputFormat::Table => {
            let rows: Vec<SummaryRow> = summaries
                .into_iter()
                .map(|s| SummaryRow {
                    id: s.id,
                    name: s.name,
                    tokens: s.token_count,
                    preview: truncate(&s.preview, 60),
                })
                .collect();
            format!(
                "Pattern: {}\n{}",
                session.pattern().source(),
                format_table(&rows)
            )
        }
    }
}

/// Run the tokenize command.
pub async fn run(cmd: &TokenizeCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(ctx, &cmd.files, cmd.pattern.as_deref())?;
    println!("{}", render(&session, ctx.format));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, write_witnesses};

    #[test]
    fn table_lists_each_witness() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_witnesses(dir.path(), &[("a.txt", "a  b\tc"), ("b.txt", "d")]);
        let session = load_session(&context(), &files, None).unwrap();

        let out = render(&session, OutputFormat::Table);
        assert!(out.starts_with(r"Pattern: \S+"));
        assert!(out.contains("a.txt"));
        assert!(out.contains("a b c"));
    }

    #[test]
    fn json_lists_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_witnesses(dir.path(), &[("a.txt", "one two")]);
        let session = load_session(&context(), &files, None).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&render(&session, OutputFormat::Json)).unwrap();
        assert_eq!(value[0]["id"], "a");
        assert_eq!(value[0]["token_count"], 2);
    }
}
