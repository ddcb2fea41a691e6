// crates/epe-core/src/traits.rs

use async_trait::async_trait;

use crate::annotation::Annotation;
use crate::error::EditionError;
use crate::remote::{
    AlignmentQuery, AnnotationId, NewAnnotation, PairAlignment, StoredAnnotation, StoredWitness,
    StoredWitnessSummary,
};

/// Position-addressed annotation storage used by the in-memory editor.
///
/// Notes are addressed by `(witness id, position, index)` where `index` is the
/// note's place in its slot's insertion order. Implemented by
/// [`AnnotationMap`](crate::annotation::AnnotationMap).
pub trait AnnotationStore {
    /// Append a note. Empty key or value is a validation error and changes nothing.
    fn add(
        &mut self,
        witness_id: &str,
        position: usize,
        key: &str,
        value: &str,
    ) -> Result<(), EditionError>;

    /// Notes at a slot in insertion order (empty if none).
    fn list(&self, witness_id: &str, position: usize) -> &[Annotation];

    /// Remove the note at `index` within the slot and return it.
    fn remove(
        &mut self,
        witness_id: &str,
        position: usize,
        index: usize,
    ) -> Result<Annotation, EditionError>;
}

/// The external witness/annotation store used by the networked variant.
///
/// Annotations here are addressed by a store-assigned [`AnnotationId`], not by
/// slot index. The store serializes concurrent writes (last write wins); the
/// client holds no lock. Every non-success response surfaces as
/// [`EditionError::RemoteRequest`] carrying the response body, with no retry.
///
/// Implemented by epe-store (`HttpEditionStore`, `InMemoryEditionStore`).
#[async_trait]
pub trait EditionStore: Send + Sync {
    /// `GET /api/witnesses`
    async fn list_witnesses(&self) -> Result<Vec<StoredWitnessSummary>, EditionError>;

    /// `GET /api/witnesses/{id}`
    async fn get_witness(&self, id: &str) -> Result<StoredWitness, EditionError>;

    /// `POST /api/witnesses` with an arbitrary JSON payload.
    async fn import_witness(&self, payload: &serde_json::Value) -> Result<(), EditionError>;

    /// `PATCH /api/witnesses/{id}` with `{label}`.
    async fn rename_witness(&self, id: &str, label: &str) -> Result<(), EditionError>;

    /// `DELETE /api/witnesses/{id}`; removes the witness's annotations too.
    async fn delete_witness(&self, id: &str) -> Result<(), EditionError>;

    /// `GET /api/export/{id}`; the raw export body.
    async fn export_witness(&self, id: &str) -> Result<String, EditionError>;

    /// `GET /api/alignments?...`
    async fn alignments(&self, query: &AlignmentQuery) -> Result<PairAlignment, EditionError>;

    /// `GET /api/annotations?witness_id=`
    async fn list_annotations(&self, witness_id: &str)
        -> Result<Vec<StoredAnnotation>, EditionError>;

    /// `POST /api/annotations`
    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<(), EditionError>;

    /// `PUT /api/annotations/{id}` with `{annotation}`.
    async fn update_annotation(&self, id: &AnnotationId, text: &str) -> Result<(), EditionError>;

    /// `DELETE /api/annotations/{id}`
    async fn delete_annotation(&self, id: &AnnotationId) -> Result<(), EditionError>;

    /// `GET /api/logs`
    async fn logs(&self) -> Result<Vec<String>, EditionError>;

    /// `GET /api/logs/export`; the raw log file.
    async fn export_logs(&self) -> Result<String, EditionError>;
}
