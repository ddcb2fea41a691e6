// crates/epe-core/src/reading.rs
//
// Reading view: rebuilds a filtered comparison table from an exported data
// document for a chosen base and subset of witnesses.

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::export::{DataDocument, DocumentWitness};

/// Which witnesses to show and which one to compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSelection {
    pub base_id: String,
    /// Shown witnesses, in display order. The base is always shown first.
    pub selected_ids: Vec<String>,
}

impl ReadingSelection {
    pub fn new(base_id: impl Into<String>, selected_ids: Vec<String>) -> Self {
        Self {
            base_id: base_id.into(),
            selected_ids,
        }
    }

    /// Initial selection for a freshly loaded document: the document's base
    /// witness is the base and every other witness is selected.
    pub fn default_for(doc: &DataDocument) -> Option<Self> {
        let base = doc.base_witness_id()?;
        Some(Self {
            base_id: base.to_string(),
            selected_ids: doc
                .witnesses
                .iter()
                .filter(|w| w.id != base)
                .map(|w| w.id.clone())
                .collect(),
        })
    }

    /// Selected ids with the base in front; the rest keep their order.
    pub fn effective_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .selected_ids
            .iter()
            .filter(|id| **id != self.base_id)
            .cloned()
            .collect();
        ids.insert(0, self.base_id.clone());
        ids
    }
}

/// Column header of the reading table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingColumn {
    pub witness_id: String,
    pub name: String,
}

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingCell {
    pub witness_id: String,
    /// Token at this position, or the empty string past the witness's end.
    pub token: String,
    /// Differs from the first column of this render.
    pub is_variant: bool,
    /// Notes attached to (witness, position) in the document.
    pub annotations: Vec<Annotation>,
}

impl ReadingCell {
    /// Tooltip text: one `key: value` line per note, or `None` when unannotated.
    pub fn tooltip(&self) -> Option<String> {
        if self.annotations.is_empty() {
            return None;
        }
        Some(
            self.annotations
                .iter()
                .map(Annotation::display_line)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub index: usize,
    pub cells: Vec<ReadingCell>,
}

/// The projected table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingTable {
    pub columns: Vec<ReadingColumn>,
    pub rows: Vec<ReadingRow>,
}

impl ReadingTable {
    /// The comparison base of this render (first column), if any.
    pub fn base(&self) -> Option<&ReadingColumn> {
        self.columns.first()
    }
}

/// Project `doc` for `selection`.
///
/// Selected ids unknown to the document are skipped. The first remaining
/// witness is the comparison base: that is `selection.base_id` when it is
/// known, and may differ from the document's own base witness. Annotations are
/// attached to cells for display only and never affect variant marking.
pub fn project(doc: &DataDocument, selection: &ReadingSelection) -> ReadingTable {
    let shown: Vec<&DocumentWitness> = selection
        .effective_ids()
        .iter()
        .filter_map(|id| doc.witness(id))
        .collect();

    let row_count = shown.iter().map(|w| w.tokens.len()).max().unwrap_or(0);

    let rows = (0..row_count)
        .map(|idx| {
            let base_token = shown
                .first()
                .and_then(|w| w.tokens.get(idx))
                .map(String::as_str)
                .unwrap_or("");

            let cells = shown
                .iter()
                .enumerate()
                .map(|(col, w)| {
                    let token = w.tokens.get(idx).cloned().unwrap_or_default();
                    let annotations = doc
                        .annotations
                        .for_witness(&w.id)
                        .and_then(|positions| positions.get(&idx))
                        .cloned()
                        .unwrap_or_default();
                    ReadingCell {
                        witness_id: w.id.clone(),
                        is_variant: col > 0 && token != base_token,
                        token,
                        annotations,
                    }
                })
                .collect();

            ReadingRow { index: idx, cells }
        })
        .collect();

    ReadingTable {
        columns: shown
            .iter()
            .map(|w| ReadingColumn {
                witness_id: w.id.clone(),
                name: w.name.clone(),
            })
            .collect(),
        rows,
    }
}
