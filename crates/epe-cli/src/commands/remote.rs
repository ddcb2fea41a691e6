// crates/epe-cli/src/commands/remote.rs
//
// `epe remote ...`: networked variant against a witness/annotation REST store.
//
// Each invocation runs exactly one request sequence and exits.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tabled::Tabled;

use epe_core::remote::{AlignmentQuery, AnnotationId};
use epe_core::traits::EditionStore;
use epe_core::workspace::RemoteWorkspace;
use epe_store::HttpEditionStore;

use super::Context;
use crate::output::{format_json, format_table, truncate, OutputFormat};

/// Remote store subcommands.
#[derive(Debug, Subcommand)]
pub enum RemoteCmd {
    /// List the witnesses held by the store.
    Witnesses,
    /// Show a witness's sections.
    Show { id: String },
    /// Upload a witness JSON file.
    Import { file: PathBuf },
    /// Give a witness a new label.
    Rename { id: String, label: String },
    /// Delete a witness and its annotations.
    Delete { id: String },
    /// Download a witness export.
    Export {
        id: String,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare two witnesses position by position.
    Compare(CompareCmd),
    /// Find tokens containing a substring across all witnesses.
    Search { query: String },
    /// Token annotations of a witness.
    #[command(subcommand)]
    Annotations(AnnotationsCmd),
    /// Show the store's request log.
    Logs {
        /// Print the raw log file.
        #[arg(long)]
        raw: bool,
        /// Write the raw log file here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct CompareCmd {
    pub base: String,
    pub witness: String,
    #[arg(long)]
    pub base_section: Option<String>,
    #[arg(long)]
    pub witness_section: Option<String>,
    /// Also highlight tokens containing this text.
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum AnnotationsCmd {
    List {
        witness: String,
    },
    Add {
        witness: String,
        token: String,
        text: String,
    },
    Edit {
        witness: String,
        id: String,
        text: String,
    },
    Delete {
        witness: String,
        id: String,
    },
}

#[derive(Tabled)]
struct WitnessRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
}

#[derive(Tabled)]
struct SectionRow {
    #[tabled(rename = "Section")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Order")]
    order_no: u32,
    #[tabled(rename = "Tokens")]
    tokens: usize,
    #[tabled(rename = "Text")]
    text: String,
}

#[derive(Tabled)]
struct ComparisonTableRow {
    #[tabled(rename = "Pos")]
    position: usize,
    #[tabled(rename = "Base")]
    base: String,
    #[tabled(rename = "Witness")]
    witness: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

#[derive(Tabled)]
struct AnnotationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Annotation")]
    annotation: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
}

/// Refresh the witness list and select `id`.
async fn select<S: EditionStore>(
    ws: &mut RemoteWorkspace<S>,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    ws.refresh_witnesses().await?;
    ws.select_witness(id)?;
    Ok(())
}

fn annotation_table<S: EditionStore>(ws: &RemoteWorkspace<S>, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format_json(&ws.annotations());
    }
    if ws.annotations().is_empty() {
        return "No annotations.".to_string();
    }
    let rows: Vec<AnnotationRow> = ws
        .annotations()
        .iter()
        .map(|a| AnnotationRow {
            id: a.id.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into()),
            token: a.token_id.clone(),
            annotation: a.annotation.clone(),
            timestamp: a.timestamp.map(|t| t.to_string()).unwrap_or_default(),
        })
        .collect();
    format_table(&rows)
}

/// Run `cmd` against `ws` and return what should be printed.
pub async fn execute<S: EditionStore>(
    ws: &mut RemoteWorkspace<S>,
    cmd: &RemoteCmd,
    format: OutputFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let out = match cmd {
        RemoteCmd::Witnesses => {
            let witnesses = ws.refresh_witnesses().await?;
            match format {
                OutputFormat::Json => format_json(&witnesses),
                OutputFormat::Table => {
                    let rows: Vec<WitnessRow> = witnesses
                        .iter()
                        .map(|w| WitnessRow {
                            id: w.id.clone(),
                            label: w.label.clone(),
                        })
                        .collect();
                    format_table(&rows)
                }
            }
        }
        RemoteCmd::Show { id } => {
            let witness = ws.witness(id).await?;
            match format {
                OutputFormat::Json => format_json(&witness),
                OutputFormat::Table => {
                    let rows: Vec<SectionRow> = witness
                        .sections
                        .iter()
                        .map(|s| SectionRow {
                            id: s.id.clone(),
                            kind: s.kind.clone(),
                            order_no: s.order_no,
                            tokens: s.tokens.len(),
                            text: truncate(
                                &s.tokens
                                    .iter()
                                    .map(|t| t.text.as_str())
                                    .collect::<Vec<_>>()
                                    .join(" "),
                                60,
                            ),
                        })
                        .collect();
                    let siglum = witness
                        .siglum
                        .as_deref()
                        .map(|s| format!(" [{}]", s))
                        .unwrap_or_default();
                    format!("{}: {}{}\n{}", witness.id, witness.label, siglum, format_table(&rows))
                }
            }
        }
        RemoteCmd::Import { file } => {
            let text = fs::read_to_string(file)?;
            ws.import_witness(&text).await?;
            format!("Imported {}", file.display())
        }
        RemoteCmd::Rename { id, label } => {
            select(ws, id).await?;
            if ws.rename_selected(label).await? {
                format!("Renamed {} to {}", id, label.trim())
            } else {
                "Label unchanged.".to_string()
            }
        }
        RemoteCmd::Delete { id } => {
            select(ws, id).await?;
            let deleted = ws.delete_selected().await?;
            format!("Deleted {}", deleted)
        }
        RemoteCmd::Export { id, out } => {
            select(ws, id).await?;
            let body = ws.export_selected().await?;
            match out {
                Some(path) => {
                    fs::write(path, &body)?;
                    format!("Wrote {}", path.display())
                }
                None => body,
            }
        }
        RemoteCmd::Compare(compare) => {
            select(ws, &compare.witness).await?;
            ws.load_annotations().await?;
            if let Some(query) = &compare.search {
                ws.search(query).await?;
            }
            let query = AlignmentQuery::new(&compare.base, &compare.witness).with_sections(
                compare.base_section.clone(),
                compare.witness_section.clone(),
            );
            ws.compare(query).await?;

            let rows = ws.comparison_rows();
            match format {
                OutputFormat::Json => format_json(&rows),
                OutputFormat::Table => {
                    let table: Vec<ComparisonTableRow> = rows
                        .into_iter()
                        .map(|r| {
                            let flags: Vec<&str> = [
                                (r.differs, "diff"),
                                (r.annotated, "note"),
                                (r.search_hit, "hit"),
                            ]
                            .into_iter()
                            .filter_map(|(on, name)| on.then_some(name))
                            .collect();
                            ComparisonTableRow {
                                position: r.position,
                                base: r.base,
                                witness: r.witness,
                                flags: flags.join(","),
                            }
                        })
                        .collect();
                    format_table(&table)
                }
            }
        }
        RemoteCmd::Search { query } => {
            let hits = ws.search(query).await?;
            match format {
                OutputFormat::Json => format_json(&hits),
                OutputFormat::Table if hits.is_empty() => "No matches.".to_string(),
                OutputFormat::Table => hits
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            }
        }
        RemoteCmd::Annotations(sub) => match sub {
            AnnotationsCmd::List { witness } => {
                select(ws, witness).await?;
                ws.load_annotations().await?;
                annotation_table(ws, format)
            }
            AnnotationsCmd::Add {
                witness,
                token,
                text,
            } => {
                select(ws, witness).await?;
                ws.annotate(witness, token, text).await?;
                annotation_table(ws, format)
            }
            AnnotationsCmd::Edit { witness, id, text } => {
                select(ws, witness).await?;
                let id = AnnotationId::new(id.as_str());
                ws.edit_annotation(&id, text).await?;
                annotation_table(ws, format)
            }
            AnnotationsCmd::Delete { witness, id } => {
                select(ws, witness).await?;
                let id = AnnotationId::new(id.as_str());
                ws.delete_annotation(&id).await?;
                annotation_table(ws, format)
            }
        },
        RemoteCmd::Logs { raw, out } => {
            if *raw || out.is_some() {
                let body = ws.export_logs().await?;
                match out {
                    Some(path) => {
                        fs::write(path, &body)?;
                        format!("Wrote {}", path.display())
                    }
                    None => body,
                }
            } else {
                let logs = ws.logs().await?;
                match format {
                    OutputFormat::Json => format_json(&logs),
                    OutputFormat::Table => logs.join("\n"),
                }
            }
        }
    };
    Ok(out)
}

/// Run the remote subcommand against the configured store.
pub async fn run(cmd: &RemoteCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = HttpEditionStore::with_timeout(
        &ctx.remote_url,
        Duration::from_secs(ctx.config.request_timeout_secs),
    )?;
    tracing::debug!(remote = %store.base_url, "Using remote store");

    let mut ws = RemoteWorkspace::new(store);
    println!("{}", execute(&mut ws, cmd, ctx.format).await?);
    Ok(())
}
