// crates/epe-cli/src/commands/align.rs
//
// `epe align FILES... [--pattern P] [--base ID]`: positional alignment
// table with variant readings marked.

use std::path::PathBuf;

use clap::Args;

use epe_core::session::Session;

use super::{aligned_session, Context};
use crate::output::{format_grid, format_json, OutputFormat};

/// Align witness files and show the comparison table.
#[derive(Debug, Args)]
pub struct AlignCmd {
    /// Plain-text witness files, in column order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Token pattern, bare or delimited with flags.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Witness id to compare against (default: the first file).
    #[arg(long)]
    pub base: Option<String>,
}

fn render(session: &Session, format: OutputFormat) -> Result<String, Box<dyn std::error::Error>> {
    let doc = session.data_document()?;
    if format == OutputFormat::Json {
        return Ok(format_json(&doc.alignment));
    }

    let (Some(matrix), Some(base_column)) = (session.alignment(), session.base_column()) else {
        return Ok(String::new());
    };

    let mut header = vec!["#".to_string()];
    header.extend(matrix.witness_ids().iter().map(|id| {
        if matrix.column_of(id) == Some(base_column) {
            format!("{} (base)", id)
        } else {
            id.clone()
        }
    }));

    let mut with_variants = 0;
    let rows = matrix
        .rows()
        .iter()
        .zip(&doc.alignment)
        .map(|(row, entry)| {
            if !entry.variants.is_empty() {
                with_variants += 1;
            }
            let mut cells = vec![entry.index.to_string()];
            cells.extend(row.iter().enumerate().map(|(col, token)| {
                if col != base_column && *token != row[base_column] {
                    format!("*{}*", token)
                } else {
                    token.clone()
                }
            }));
            cells
        })
        .collect();

    let table = format_grid(header, rows);
    Ok(format!(
        "{}\n{} rows, {} with variants",
        table,
        matrix.row_count(),
        with_variants
    ))
}

/// Run the align command.
pub async fn run(cmd: &AlignCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let session = aligned_session(ctx, &cmd.files, cmd.pattern.as_deref(), cmd.base.as_deref())?;
    println!("{}", render(&session, ctx.format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, write_witnesses};

    #[test]
    fn variants_are_marked_against_base() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_witnesses(dir.path(), &[("a.txt", "x y z"), ("b.txt", "x q")]);
        let session = aligned_session(&context(), &files, None, None).unwrap();

        let out = render(&session, OutputFormat::Table).unwrap();
        assert!(out.contains("a (base)"));
        assert!(out.contains("*q*"));
        assert!(out.contains("**"));
        assert!(out.ends_with("3 rows, 2 with variants"));
    }

    #[test]
    fn json_is_the_alignment_list() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_witnesses(dir.path(), &[("a.txt", "x"), ("b.txt", "y")]);
        let session = aligned_session(&context(), &files, None, Some("b")).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&render(&session, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(value[0]["base"]["witnessId"], "b");
        assert_eq!(value[0]["variants"][0]["token"], "x");
    }
}
