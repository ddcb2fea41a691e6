// crates/epe-core/src/error.rs

use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace.
///
/// Each variant is terminal for the command that raised it only; previously
/// computed witnesses, alignments and annotations are never touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditionError {
    /// The tokenization pattern could not be compiled.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Alignment needs at least two witnesses.
    #[error("Insufficient witnesses: alignment needs at least 2, found {found}")]
    InsufficientWitnesses { found: usize },

    /// An imported JSON document (edition export or witness payload) could not be parsed.
    #[error("Malformed import: {0}")]
    MalformedImport(String),

    /// The remote store answered with a non-success status, or could not be reached.
    /// The message is the response body verbatim where one was returned.
    #[error("Remote request failed: {0}")]
    RemoteRequest(String),

    /// User input rejected before any state change (empty annotation key, etc.).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A command referenced a witness id that is not loaded.
    #[error("Unknown witness: {0}")]
    UnknownWitness(String),

    /// A witness with the same id is already loaded.
    #[error("Duplicate witness: {0}")]
    DuplicateWitness(String),

    /// Removal addressed an annotation slot that does not exist.
    #[error("No annotation #{index} at {witness_id}[{position}]")]
    AnnotationNotFound {
        witness_id: String,
        position: usize,
        index: usize,
    },

    /// Export was requested before any (non-empty) alignment was built.
    #[error("Nothing to export: align witnesses before exporting")]
    NotAligned,

    /// A newer invocation of the same action replaced this one while it was in flight.
    #[error("Superseded by a newer {0} request")]
    Superseded(String),

    /// Filesystem error while importing or exporting.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EditionError {
    fn from(e: serde_json::Error) -> Self {
        EditionError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for EditionError {
    fn from(e: std::io::Error) -> Self {
        EditionError::Io(e.to_string())
    }
}
