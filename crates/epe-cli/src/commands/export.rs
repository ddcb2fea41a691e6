// crates/epe-cli/src/commands/export.rs
//
// `epe export FILES... [--format xml|json|both] [--out DIR]`: align the
// witnesses and write edition.xml and/or edition.json.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use epe_core::annotation::AnnotationMap;
use epe_core::error::EditionError;
use epe_core::export::ExportFormat;
use epe_core::session::{Command, Outcome, Session};

use super::{aligned_session, Context};
use crate::output::{format_json, OutputFormat};

/// Which documents to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Xml,
    Json,
    Both,
}

impl FormatArg {
    fn formats(self) -> &'static [ExportFormat] {
        match self {
            FormatArg::Xml => &[ExportFormat::Markup],
            FormatArg::Json => &[ExportFormat::Data],
            FormatArg::Both => &[ExportFormat::Markup, ExportFormat::Data],
        }
    }
}

/// Export an aligned edition.
#[derive(Debug, Args)]
pub struct ExportCmd {
    /// Plain-text witness files, in column order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Token pattern, bare or delimited with flags.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Witness id to compare against (default: the first file).
    #[arg(long)]
    pub base: Option<String>,

    /// Annotation sidecar (as written by `epe annotate`) to include.
    #[arg(long)]
    pub annotations: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "both")]
    pub format: FormatArg,

    /// Output directory (default: `output_dir` from the config).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Read an annotation sidecar file.
pub fn read_sidecar(path: &Path) -> Result<AnnotationMap, EditionError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| EditionError::MalformedImport(format!("{}: {}", path.display(), e)))
}

/// Render every requested document and write it into `out_dir`.
fn write_exports(
    mut session: Session,
    formats: &[ExportFormat],
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut rendered = Vec::new();
    for format in formats {
        if let Outcome::Exported(file) = session.execute(Command::Export(*format))? {
            rendered.push(file);
        }
    }

    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    for file in rendered {
        let path = out_dir.join(file.file_name);
        fs::write(&path, &file.contents)?;
        tracing::info!(path = %path.display(), mime = file.mime_type, "Wrote export");
        written.push(path);
    }
    Ok(written)
}

/// Run the export command.
pub async fn run(cmd: &ExportCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut session =
        aligned_session(ctx, &cmd.files, cmd.pattern.as_deref(), cmd.base.as_deref())?;
    if let Some(path) = &cmd.annotations {
        session.execute(Command::MergeAnnotations(read_sidecar(path)?))?;
    }

    let out_dir = cmd.out.clone().unwrap_or_else(|| ctx.config.output_dir());
    let written = write_exports(session, cmd.format.formats(), &out_dir)?;

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&written)),
        OutputFormat::Table => {
            for path in &written {
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}
