// crates/epe-cli/src/commands/read.rs
//
// `epe read EDITION.json [--base ID] [--witness ID...]`: reading view of an
// exported data document.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use epe_core::export::DataDocument;
use epe_core::reading::{project, ReadingSelection, ReadingTable};
use epe_core::EditionError;

use super::Context;
use crate::output::{format_grid, format_json, OutputFormat};

/// Show a data document as a reading table.
#[derive(Debug, Args)]
pub struct ReadCmd {
    /// An `edition.json` written by `epe export`.
    pub document: PathBuf,

    /// Witness to compare against (default: the document's base witness).
    #[arg(long)]
    pub base: Option<String>,

    /// Witnesses to show, in order; repeatable (default: all others).
    #[arg(long = "witness")]
    pub witnesses: Vec<String>,
}

/// Resolve the selection from flags, starting from the document defaults.
fn selection(doc: &DataDocument, base: Option<&str>, witnesses: &[String]) -> Option<ReadingSelection> {
    let mut selection = ReadingSelection::default_for(doc)?;
    if let Some(base) = base {
        selection.base_id = base.to_string();
        selection.selected_ids = doc
            .witnesses
            .iter()
            .filter(|w| w.id != base)
            .map(|w| w.id.clone())
            .collect();
    }
    if !witnesses.is_empty() {
        selection.selected_ids = witnesses.to_vec();
    }
    Some(selection)
}

fn render(table: &ReadingTable) -> String {
    let mut header = vec!["#".to_string()];
    header.extend(table.columns.iter().enumerate().map(|(i, c)| {
        if i == 0 {
            format!("{} (base)", c.name)
        } else {
            c.name.clone()
        }
    }));

    let mut notes = Vec::new();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.index.to_string()];
            for cell in &row.cells {
                let mut text = if cell.is_variant {
                    format!("*{}*", cell.token)
                } else {
                    cell.token.clone()
                };
                if let Some(tooltip) = cell.tooltip() {
                    text.push_str(" †");
                    for line in tooltip.lines() {
                        notes.push(format!("{}[{}] {}", cell.witness_id, row.index, line));
                    }
                }
                cells.push(text);
            }
            cells
        })
        .collect();

    let mut out = format_grid(header, rows);
    if !notes.is_empty() {
        out.push_str("\n\nNotes:\n");
        out.push_str(&notes.join("\n"));
    }
    out
}

/// Run the read command.
pub async fn run(cmd: &ReadCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let doc = DataDocument::from_json(&fs::read_to_string(&cmd.document)?)?;
    let selection = selection(&doc, cmd.base.as_deref(), &cmd.witnesses)
        .ok_or_else(|| EditionError::MalformedImport("document has no witnesses".into()))?;

    let known = |id: &String| doc.witness(id).is_some();
    if !known(&selection.base_id) {
        tracing::warn!(base = %selection.base_id, "Base witness not in document");
    }
    for id in selection.selected_ids.iter().filter(|id| !known(*id)) {
        tracing::warn!(witness = %id, "Skipping unknown witness");
    }

    let table = project(&doc, &selection);
    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&table)),
        OutputFormat::Table => println!("{}", render(&table)),
    }
    Ok(())
}
