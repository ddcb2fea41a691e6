// crates/epe-core/src/session.rs
//
// Editing session: explicit state for one edition workflow plus the command
// interface that drives it.
//
// A session is constructed once per editing context and owns its witnesses,
// pattern, alignment and annotations, so independent sessions never share
// state. Every command is a transition from (session, command) to
// (new session, outcome); a failing command leaves the prior session intact.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alignment::{align, AlignmentMatrix};
use crate::annotation::{Annotation, AnnotationMap};
use crate::error::EditionError;
use crate::export::{
    export_data, export_markup, to_data_document, DataDocument, ExportFormat, ExportOptions,
    ExportedFile,
};
use crate::tokenizer::Pattern;
use crate::traits::AnnotationStore;
use crate::witness::{Witness, WitnessSummary};

/// Commands accepted by [`Session::apply`].
#[derive(Debug, Clone)]
pub enum Command {
    /// Add witnesses in the given order. Duplicate ids are rejected.
    Import(Vec<Witness>),
    /// Compile a pattern and re-tokenize every loaded witness with it.
    /// `None` re-tokenizes with the active pattern.
    Tokenize(Option<String>),
    /// Build the positional alignment of all loaded witnesses.
    Align,
    /// Make another loaded witness the comparison base.
    SetBase(String),
    AddAnnotation {
        witness_id: String,
        position: usize,
        key: String,
        value: String,
    },
    RemoveAnnotation {
        witness_id: String,
        position: usize,
        index: usize,
    },
    /// Append notes edited elsewhere (a sidecar file, another export).
    MergeAnnotations(AnnotationMap),
    Export(ExportFormat),
}

impl Command {
    /// Short name used in logs and in-flight bookkeeping.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Import(_) => "import",
            Command::Tokenize(_) => "tokenize",
            Command::Align => "align",
            Command::SetBase(_) => "set_base",
            Command::AddAnnotation { .. } => "add_annotation",
            Command::RemoveAnnotation { .. } => "remove_annotation",
            Command::MergeAnnotations(_) => "merge_annotations",
            Command::Export(_) => "export",
        }
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Imported(Vec<WitnessSummary>),
    Tokenized { pattern: String, total_tokens: usize },
    Aligned { rows: usize, rows_with_variants: usize },
    BaseChanged(String),
    AnnotationAdded,
    AnnotationRemoved(Annotation),
    AnnotationsMerged(usize),
    Exported(ExportedFile),
}

/// State of one editing session.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    witnesses: Vec<Witness>,
    pattern: Pattern,
    alignment: Option<AlignmentMatrix>,
    annotations: AnnotationMap,
    /// Reference witness for variant detection. Defaults to the first import.
    base_witness_id: Option<String>,
    export_options: ExportOptions,
}

/// Serializable snapshot of a session's identity and counters, for logs/status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub witnesses: usize,
    pub pattern: String,
    pub aligned_rows: Option<usize>,
    pub base_witness_id: Option<String>,
    pub annotations: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}

impl Session {
    pub fn new(export_options: ExportOptions) -> Self {
        let session = Self {
            id: Uuid::now_v7(),
            witnesses: Vec::new(),
            pattern: Pattern::default(),
            alignment: None,
            annotations: AnnotationMap::new(),
            base_witness_id: None,
            export_options,
        };
        tracing::debug!(session_id = %session.id, "Session created");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    pub fn witness(&self, id: &str) -> Option<&Witness> {
        self.witnesses.iter().find(|w| w.id == id)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The current alignment. Cleared whenever witnesses or tokens change.
    pub fn alignment(&self) -> Option<&AlignmentMatrix> {
        self.alignment.as_ref()
    }

    pub fn annotations(&self) -> &AnnotationMap {
        &self.annotations
    }

    pub fn base_witness_id(&self) -> Option<&str> {
        self.base_witness_id.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id,
            witnesses: self.witnesses.len(),
            pattern: self.pattern.source().to_string(),
            aligned_rows: self.alignment.as_ref().map(AlignmentMatrix::row_count),
            base_witness_id: self.base_witness_id.clone(),
            annotations: self.annotations.len(),
        }
    }

    /// Column of the base witness in the current alignment.
    pub fn base_column(&self) -> Option<usize> {
        let matrix = self.alignment.as_ref()?;
        matrix.column_of(self.base_witness_id.as_deref()?)
    }

    /// The data document of the current alignment.
    pub fn data_document(&self) -> Result<DataDocument, EditionError> {
        let (matrix, base_column) = self.aligned()?;
        to_data_document(&self.witnesses, matrix, base_column, &self.annotations)
    }

    /// Pure transition: the session after `command`, and what it produced.
    pub fn apply(&self, command: Command) -> Result<(Session, Outcome), EditionError> {
        self.clone().transition(command)
    }

    /// Run `command` in place. On error `self` is unchanged.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, EditionError> {
        let name = command.name();
        match self.apply(command) {
            Ok((next, outcome)) => {
                *self = next;
                tracing::debug!(session_id = %self.id, command = name, "Command applied");
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, command = name, error = %e, "Command rejected");
                Err(e)
            }
        }
    }

    fn transition(mut self, command: Command) -> Result<(Session, Outcome), EditionError> {
        let outcome = match command {
            Command::Import(witnesses) => self.import(witnesses)?,
            Command::Tokenize(pattern) => self.tokenize(pattern.as_deref())?,
            Command::Align => self.align()?,
            Command::SetBase(id) => {
                if self.witness(&id).is_none() {
                    return Err(EditionError::UnknownWitness(id));
                }
                self.base_witness_id = Some(id.clone());
                Outcome::BaseChanged(id)
            }
            Command::AddAnnotation {
                witness_id,
                position,
                key,
                value,
            } => {
                if self.witness(&witness_id).is_none() {
                    return Err(EditionError::UnknownWitness(witness_id));
                }
                self.annotations.add(&witness_id, position, &key, &value)?;
                Outcome::AnnotationAdded
            }
            Command::RemoveAnnotation {
                witness_id,
                position,
                index,
            } => Outcome::AnnotationRemoved(self.annotations.remove(&witness_id, position, index)?),
            Command::MergeAnnotations(other) => {
                let added = other.len();
                self.annotations.merge(&other);
                Outcome::AnnotationsMerged(added)
            }
            Command::Export(format) => Outcome::Exported(self.export(format)?),
        };
        Ok((self, outcome))
    }

    fn import(&mut self, witnesses: Vec<Witness>) -> Result<Outcome, EditionError> {
        for (i, w) in witnesses.iter().enumerate() {
            let repeated = witnesses[..i].iter().any(|prev| prev.id == w.id);
            if repeated || self.witness(&w.id).is_some() {
                return Err(EditionError::DuplicateWitness(w.id.clone()));
            }
        }

        let summaries = witnesses.iter().map(Witness::summary).collect();
        if self.base_witness_id.is_none() {
            self.base_witness_id = witnesses.first().map(|w| w.id.clone());
        }
        tracing::info!(session_id = %self.id, count = witnesses.len(), "Witnesses imported");
        self.witnesses.extend(witnesses);
        self.alignment = None;
        Ok(Outcome::Imported(summaries))
    }

    fn tokenize(&mut self, pattern: Option<&str>) -> Result<Outcome, EditionError> {
        if let Some(source) = pattern {
            self.pattern = Pattern::parse(source)?;
        }

        let mut total_tokens = 0;
        for w in &mut self.witnesses {
            w.tokens = w.tokenized(&self.pattern);
            total_tokens += w.tokens.len();
        }
        self.alignment = None;

        tracing::info!(
            session_id = %self.id,
            pattern = self.pattern.source(),
            witnesses = self.witnesses.len(),
            total_tokens,
            "Witnesses tokenized"
        );
        Ok(Outcome::Tokenized {
            pattern: self.pattern.source().to_string(),
            total_tokens,
        })
    }

    fn align(&mut self) -> Result<Outcome, EditionError> {
        let matrix = align(&self.witnesses)?;
        let base_column = self
            .base_witness_id
            .as_deref()
            .and_then(|id| matrix.column_of(id))
            .unwrap_or(0);
        let rows_with_variants = matrix
            .variants(base_column)
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .count();
        let rows = matrix.row_count();

        tracing::info!(session_id = %self.id, rows, rows_with_variants, "Witnesses aligned");
        self.alignment = Some(matrix);
        Ok(Outcome::Aligned {
            rows,
            rows_with_variants,
        })
    }

    fn aligned(&self) -> Result<(&AlignmentMatrix, usize), EditionError> {
        let matrix = match self.alignment.as_ref() {
            Some(m) if !m.is_empty() => m,
            _ => return Err(EditionError::NotAligned),
        };
        Ok((matrix, self.base_column().unwrap_or(0)))
    }

    fn export(&self, format: ExportFormat) -> Result<ExportedFile, EditionError> {
        let (matrix, base_column) = self.aligned()?;
        let file = match format {
            ExportFormat::Markup => {
                export_markup(&self.witnesses, matrix, base_column, &self.export_options)?
            }
            ExportFormat::Data => {
                export_data(&self.witnesses, matrix, base_column, &self.annotations)?
            }
        };
        tracing::info!(session_id = %self.id, file = file.file_name, bytes = file.contents.len(), "Edition exported");
        Ok(file)
    }
}
