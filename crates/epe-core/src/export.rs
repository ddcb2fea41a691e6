// crates/epe-core/src/export.rs
//
// Edition export: the canonical JSON data document and the TEI-like markup
// rendering.
//
// The data document carries every row of the alignment. The markup form is a
// critical-apparatus view and only lists rows that have at least one variant.

use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentMatrix;
use crate::annotation::AnnotationMap;
use crate::error::EditionError;
use crate::variants::detect_variants;
use crate::witness::Witness;

/// File name of the markup export.
pub const MARKUP_FILE_NAME: &str = "edition.xml";
/// File name of the data export.
pub const DATA_FILE_NAME: &str = "edition.json";

/// Export format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// TEI-like XML (`edition.xml`).
    Markup,
    /// Pretty-printed JSON data document (`edition.json`).
    Data,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Markup => MARKUP_FILE_NAME,
            ExportFormat::Data => DATA_FILE_NAME,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Markup => "application/xml",
            ExportFormat::Data => "application/json",
        }
    }
}

/// Options for the markup header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Title placed in the TEI header.
    pub title: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: "Untitled Edition".to_string(),
        }
    }
}

/// A rendered export, ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub contents: String,
}

impl ExportedFile {
    fn new(format: ExportFormat, contents: String) -> Self {
        Self {
            format,
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            contents,
        }
    }
}

// ---------------------------------------------------------------------------
// Data document
// ---------------------------------------------------------------------------

/// Witness entry of the data document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWitness {
    pub id: String,
    pub name: String,
    pub tokens: Vec<String>,
}

/// A token attributed to a witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub witness_id: String,
    pub token: String,
}

/// One alignment row of the data document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentEntry {
    pub index: usize,
    pub base: Reading,
    pub variants: Vec<Reading>,
}

/// The canonical interchange format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDocument {
    pub witnesses: Vec<DocumentWitness>,
    #[serde(default)]
    pub alignment: Vec<AlignmentEntry>,
    #[serde(default)]
    pub annotations: AnnotationMap,
}

impl DataDocument {
    /// Parse a data document, e.g. an `edition.json` loaded into the reading view.
    pub fn from_json(text: &str) -> Result<Self, EditionError> {
        serde_json::from_str(text).map_err(|e| EditionError::MalformedImport(e.to_string()))
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, EditionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn witness(&self, id: &str) -> Option<&DocumentWitness> {
        self.witnesses.iter().find(|w| w.id == id)
    }

    /// The witness the alignment was exported against, falling back to the
    /// first listed witness when the alignment is empty or names no known witness.
    pub fn base_witness_id(&self) -> Option<&str> {
        self.alignment
            .first()
            .map(|entry| entry.base.witness_id.as_str())
            .filter(|id| self.witness(id).is_some())
            .or_else(|| self.witnesses.first().map(|w| w.id.as_str()))
    }
}

fn base_witness_id(matrix: &AlignmentMatrix, base_column: usize) -> Result<&str, EditionError> {
    matrix
        .witness_ids()
        .get(base_column)
        .map(String::as_str)
        .ok_or_else(|| EditionError::UnknownWitness(format!("column {}", base_column)))
}

/// Build the data document for an aligned edition.
///
/// `witnesses` supplies names and full token sequences; the variant list of
/// every row is computed against `base_column` of `matrix`.
pub fn to_data_document(
    witnesses: &[Witness],
    matrix: &AlignmentMatrix,
    base_column: usize,
    annotations: &AnnotationMap,
) -> Result<DataDocument, EditionError> {
    let base_id = base_witness_id(matrix, base_column)?;
    let ids = matrix.witness_ids();

    let alignment = matrix
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| AlignmentEntry {
            index,
            base: Reading {
                witness_id: base_id.to_string(),
                token: row[base_column].clone(),
            },
            variants: detect_variants(row, base_column)
                .into_iter()
                .map(|v| Reading {
                    witness_id: ids[v.witness_index].clone(),
                    token: v.token,
                })
                .collect(),
        })
        .collect();

    Ok(DataDocument {
        witnesses: witnesses
            .iter()
            .map(|w| DocumentWitness {
                id: w.id.clone(),
                name: w.name.clone(),
                tokens: w.tokens.clone(),
            })
            .collect(),
        alignment,
        annotations: annotations.clone(),
    })
}

/// Render the data document as a pretty-printed `edition.json`.
pub fn export_data(
    witnesses: &[Witness],
    matrix: &AlignmentMatrix,
    base_column: usize,
    annotations: &AnnotationMap,
) -> Result<ExportedFile, EditionError> {
    let doc = to_data_document(witnesses, matrix, base_column, annotations)?;
    Ok(ExportedFile::new(ExportFormat::Data, doc.to_json_pretty()?))
}

// ---------------------------------------------------------------------------
// Markup document
// ---------------------------------------------------------------------------

/// Escape `&`, `<` and `>`.
///
/// Quotes are left alone, so the output is not safe inside attribute values.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render the TEI-like markup document.
///
/// One `<div type="witness">` per witness with its tokens joined by single
/// spaces, then a `<div type="apparatus">` with one `<app>` per row that has
/// at least one variant: the base token as `<lem>`, every variant as `<rdg>`
/// in column order.
pub fn to_markup_document(
    witnesses: &[Witness],
    matrix: &AlignmentMatrix,
    base_column: usize,
    options: &ExportOptions,
) -> Result<String, EditionError> {
    let base_id = base_witness_id(matrix, base_column)?;
    let ids = matrix.witness_ids();

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<TEI>\n  <teiHeader>\n    <fileDesc>\n");
    out.push_str(&format!(
        "      <titleStmt><title>{}</title></titleStmt>\n",
        escape_xml(&options.title)
    ));
    out.push_str(
        "      <publicationStmt><p>Generated by the edition production environment</p></publicationStmt>\n",
    );
    out.push_str("      <sourceDesc><p>Multiple witnesses</p></sourceDesc>\n");
    out.push_str("    </fileDesc>\n  </teiHeader>\n  <text>\n    <body>\n");

    for w in witnesses {
        let text = w
            .tokens
            .iter()
            .map(|t| escape_xml(t))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "      <div type=\"witness\" xml:id=\"{}\">\n        <p>{}</p>\n      </div>\n",
            w.id, text
        ));
    }

    out.push_str("      <div type=\"apparatus\">\n");
    let mut entries = 0usize;
    for (idx, row) in matrix.rows().iter().enumerate() {
        let variants = detect_variants(row, base_column);
        if variants.is_empty() {
            continue;
        }
        entries += 1;
        out.push_str(&format!(
            "        <app n=\"{}\">\n          <lem wit=\"#{}\">{}</lem>\n",
            idx,
            base_id,
            escape_xml(&row[base_column])
        ));
        for v in variants {
            out.push_str(&format!(
                "          <rdg wit=\"#{}\">{}</rdg>\n",
                ids[v.witness_index],
                escape_xml(&v.token)
            ));
        }
        out.push_str("        </app>\n");
    }
    out.push_str("      </div>\n");
    out.push_str("    </body>\n  </text>\n</TEI>\n");

    tracing::debug!(
        witnesses = witnesses.len(),
        apparatus_entries = entries,
        "Rendered markup document"
    );
    Ok(out)
}

/// Render `edition.xml`.
pub fn export_markup(
    witnesses: &[Witness],
    matrix: &AlignmentMatrix,
    base_column: usize,
    options: &ExportOptions,
) -> Result<ExportedFile, EditionError> {
    let xml = to_markup_document(witnesses, matrix, base_column, options)?;
    Ok(ExportedFile::new(ExportFormat::Markup, xml))
}
