// crates/epe-core/src/lib.rs
//
// epe-core: Data model and editing logic for the Edition Production Environment.
//
// Witnesses are tokenized with a configurable pattern, laid out position by
// position in an alignment matrix, compared against a base witness, annotated,
// and exported as a markup document or a data document. The reading view
// projects a data document back into a table. The networked variant talks to
// an external witness store through the `EditionStore` trait.

pub mod alignment;
pub mod annotation;
pub mod error;
pub mod export;
pub mod reading;
pub mod remote;
pub mod session;
pub mod tokenizer;
pub mod traits;
pub mod variants;
pub mod witness;
pub mod workspace;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use epe_core::Session;`

// File-based editing
pub use alignment::{align, AlignmentMatrix};
pub use annotation::{Annotation, AnnotationMap};
pub use session::{Command, Outcome, Session, SessionStatus};
pub use tokenizer::{tokenize, Pattern, DEFAULT_PATTERN};
pub use variants::{detect_variants, Variant};
pub use witness::{load_witnesses, Witness, WitnessSummary};

// Export and reading view
pub use export::{
    escape_xml, to_data_document, to_markup_document, DataDocument, ExportFormat, ExportOptions,
    ExportedFile,
};
pub use reading::{project, ReadingSelection, ReadingTable};

// Networked variant
pub use remote::{
    AlignmentQuery, AnnotationId, NewAnnotation, PairAlignment, SearchHit, StoredAnnotation,
    StoredWitness, StoredWitnessSummary,
};
pub use workspace::{ComparisonRow, RemoteWorkspace};

// Error type
pub use error::EditionError;

// Traits
pub use traits::{AnnotationStore, EditionStore};
