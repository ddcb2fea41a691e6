// crates/epe-cli/src/commands/annotate.rs
//
// `epe annotate {add, remove, list} --file FILE`: edit an annotation sidecar.
// The sidecar has the shape of a data document's `annotations` member.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use tabled::Tabled;

use epe_core::annotation::AnnotationMap;
use epe_core::error::EditionError;
use epe_core::traits::AnnotationStore;

use super::export::read_sidecar;
use super::Context;
use crate::output::{format_json, format_table, OutputFormat};

/// Annotation sidecar subcommands.
#[derive(Debug, Subcommand)]
pub enum AnnotateCmd {
    /// Attach a key/value note to a witness position.
    Add {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        witness: String,
        /// 0-based token position.
        #[arg(long)]
        position: usize,
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: String,
    },
    /// Remove the note at INDEX of a witness position.
    Remove {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        witness: String,
        #[arg(long)]
        position: usize,
        #[arg(long)]
        index: usize,
    },
    /// List notes, optionally for one witness.
    List {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        witness: Option<String>,
    },
}

#[derive(Tabled)]
struct NoteRow {
    #[tabled(rename = "Witness")]
    witness: String,
    #[tabled(rename = "Position")]
    position: usize,
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// A missing sidecar is an empty one.
fn open(path: &Path) -> Result<AnnotationMap, EditionError> {
    if path.exists() {
        read_sidecar(path)
    } else {
        Ok(AnnotationMap::new())
    }
}

fn save(path: &Path, map: &AnnotationMap) -> Result<(), EditionError> {
    fs::write(path, serde_json::to_string_pretty(map)?)?;
    Ok(())
}

fn render(map: &AnnotationMap, witness: Option<&str>, format: OutputFormat) -> String {
    let rows: Vec<NoteRow> = map
        .iter()
        .filter(|(w, _, _)| witness.map_or(true, |id| id == *w))
        .flat_map(|(w, position, notes)| {
            notes.iter().enumerate().map(move |(index, note)| NoteRow {
                witness: w.to_string(),
                position,
                index,
                key: note.key.clone(),
                value: note.value.clone(),
            })
        })
        .collect();

    match format {
        OutputFormat::Json => match witness {
            Some(id) => format_json(&map.for_witness(id)),
            None => format_json(map),
        },
        OutputFormat::Table if rows.is_empty() => "No annotations.".to_string(),
        OutputFormat::Table => format_table(&rows),
    }
}

/// Run the annotate subcommand.
pub async fn run(cmd: &AnnotateCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        AnnotateCmd::Add {
            file,
            witness,
            position,
            key,
            value,
        } => {
            let mut map = open(file)?;
            map.add(witness, *position, key, value)?;
            save(file, &map)?;
            println!("Added note to {}[{}]", witness, position);
        }
        AnnotateCmd::Remove {
            file,
            witness,
            position,
            index,
        } => {
            let mut map = open(file)?;
            let removed = map.remove(witness, *position, *index)?;
            save(file, &map)?;
            println!("Removed {}", removed.display_line());
        }
        AnnotateCmd::List { file, witness } => {
            let map = open(file)?;
            println!("{}", render(&map, witness.as_deref(), ctx.format));
        }
    }

    Ok(())
}
