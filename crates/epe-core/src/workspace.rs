// crates/epe-core/src/workspace.rs
//
// Client-side state of the networked variant.
//
// The store owns witnesses and annotations; this type keeps what the user is
// looking at (witness list, current comparison, the annotation list of the
// selected witness, highlighted token ids, search hits) and drives the store
// through the `EditionStore` trait. Every remote call either succeeds and is
// then reflected here, or fails and leaves this state exactly as it was.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::EditionError;
use crate::remote::{
    AlignmentQuery, AnnotationId, NewAnnotation, PairAlignmentRow, SearchHit, StoredAnnotation,
    StoredWitness, StoredWitnessSummary,
};
use crate::traits::EditionStore;

/// A comparison table as last loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub query: AlignmentQuery,
    pub rows: Vec<PairAlignmentRow>,
}

/// One displayed comparison row with its highlight flags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub position: usize,
    pub base: String,
    pub witness: String,
    /// Token id of the witness side, if it has one (annotation target).
    pub token_id: Option<String>,
    pub differs: bool,
    pub annotated: bool,
    pub search_hit: bool,
}

pub struct RemoteWorkspace<S> {
    store: S,
    witnesses: Vec<StoredWitnessSummary>,
    selected: Option<String>,
    annotations: Vec<StoredAnnotation>,
    annotated: BTreeSet<String>,
    search_hits: Vec<SearchHit>,
    comparison: Option<Comparison>,
}

impl<S: EditionStore> RemoteWorkspace<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            witnesses: Vec::new(),
            selected: None,
            annotations: Vec::new(),
            annotated: BTreeSet::new(),
            search_hits: Vec::new(),
            comparison: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn witnesses(&self) -> &[StoredWitnessSummary] {
        &self.witnesses
    }

    pub fn selected_witness(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Annotations of the selected witness as last listed by the store.
    pub fn annotations(&self) -> &[StoredAnnotation] {
        &self.annotations
    }

    /// Token ids currently rendered as annotated.
    pub fn highlighted(&self) -> &BTreeSet<String> {
        &self.annotated
    }

    pub fn search_hits(&self) -> &[SearchHit] {
        &self.search_hits
    }

    pub fn comparison(&self) -> Option<&Comparison> {
        self.comparison.as_ref()
    }

    /// Reload the witness list. The selection falls back to the first witness
    /// when the selected one is gone.
    pub async fn refresh_witnesses(&mut self) -> Result<&[StoredWitnessSummary], EditionError> {
        let witnesses = self.store.list_witnesses().await?;

        let still_there = self
            .selected
            .as_deref()
            .map(|id| witnesses.iter().any(|w| w.id == id))
            .unwrap_or(false);
        if !still_there {
            self.selected = witnesses.first().map(|w| w.id.clone());
        }
        self.witnesses = witnesses;
        Ok(&self.witnesses)
    }

    /// Make `witness_id` the target of annotation and witness operations.
    pub fn select_witness(&mut self, witness_id: &str) -> Result<(), EditionError> {
        if !self.witnesses.iter().any(|w| w.id == witness_id) {
            return Err(EditionError::UnknownWitness(witness_id.to_string()));
        }
        if self.selected.as_deref() != Some(witness_id) {
            self.selected = Some(witness_id.to_string());
            self.annotations.clear();
            self.annotated.clear();
        }
        Ok(())
    }

    fn require_selected(&self) -> Result<String, EditionError> {
        self.selected
            .clone()
            .ok_or_else(|| EditionError::Validation("no witness selected".into()))
    }

    pub async fn witness(&self, id: &str) -> Result<StoredWitness, EditionError> {
        self.store.get_witness(id).await
    }

    /// Section ids of a witness, in document order.
    pub async fn sections(&self, id: &str) -> Result<Vec<String>, EditionError> {
        let witness = self.store.get_witness(id).await?;
        Ok(witness.sections.into_iter().map(|s| s.id).collect())
    }

    /// List the selected witness's annotations and rebuild the highlight set from them.
    pub async fn load_annotations(&mut self) -> Result<&[StoredAnnotation], EditionError> {
        let witness_id = self.require_selected()?;
        let annotations = self.store.list_annotations(&witness_id).await?;

        self.annotated = annotations.iter().map(|a| a.token_id.clone()).collect();
        self.annotations = annotations;
        tracing::debug!(witness_id = %witness_id, count = self.annotations.len(), "Annotations loaded");
        Ok(&self.annotations)
    }

    /// Reload after a successful write. A failed reload keeps the previous list.
    async fn reload_annotations(&mut self) {
        if let Err(e) = self.load_annotations().await {
            tracing::warn!(error = %e, "Annotation list reload failed");
        }
    }

    /// Load the pairwise comparison of `query`.
    pub async fn compare(&mut self, query: AlignmentQuery) -> Result<&Comparison, EditionError> {
        if query.base.is_empty() || query.witness.is_empty() {
            return Err(EditionError::Validation(
                "select a base text and a witness to compare".into(),
            ));
        }
        let alignment = self.store.alignments(&query).await?;
        tracing::info!(
            base = %query.base,
            witness = %query.witness,
            rows = alignment.alignments.len(),
            "Comparison loaded"
        );
        Ok(self.comparison.insert(Comparison {
            query,
            rows: alignment.alignments,
        }))
    }

    /// Comparison rows with annotation and search-hit highlighting applied.
    pub fn comparison_rows(&self) -> Vec<ComparisonRow> {
        let Some(comparison) = self.comparison.as_ref() else {
            return Vec::new();
        };
        comparison
            .rows
            .iter()
            .map(|row| {
                let token_id = row.witness.id.clone();
                let (annotated, search_hit) = match token_id.as_deref() {
                    Some(id) => (
                        self.annotated.contains(id),
                        self.search_hits.iter().any(|h| h.token_id == id),
                    ),
                    None => (false, false),
                };
                ComparisonRow {
                    position: row.position,
                    base: row.base.text.clone(),
                    witness: row.witness.text.clone(),
                    token_id,
                    differs: row.differs(),
                    annotated,
                    search_hit,
                }
            })
            .collect()
    }

    /// Attach a note to a token of `witness_id`.
    ///
    /// On success the token is highlighted and the annotation list reloaded.
    /// On failure neither the list nor the highlight set changes.
    pub async fn annotate(
        &mut self,
        witness_id: &str,
        token_id: &str,
        note: &str,
    ) -> Result<(), EditionError> {
        if note.trim().is_empty() {
            return Err(EditionError::Validation("annotation text is empty".into()));
        }
        let request = NewAnnotation {
            witness_id: witness_id.to_string(),
            token_id: token_id.to_string(),
            annotation: note.to_string(),
        };
        self.store.create_annotation(&request).await?;

        tracing::info!(witness_id, token_id, "Annotation stored");
        self.annotated.insert(token_id.to_string());
        if self.selected.as_deref() == Some(witness_id) {
            self.reload_annotations().await;
        }
        Ok(())
    }

    pub async fn edit_annotation(&mut self, id: &AnnotationId, text: &str) -> Result<(), EditionError> {
        if text.trim().is_empty() {
            return Err(EditionError::Validation("annotation text is empty".into()));
        }
        self.store.update_annotation(id, text).await?;
        tracing::info!(annotation_id = %id, "Annotation updated");
        self.reload_annotations().await;
        Ok(())
    }

    pub async fn delete_annotation(&mut self, id: &AnnotationId) -> Result<(), EditionError> {
        self.store.delete_annotation(id).await?;
        tracing::info!(annotation_id = %id, "Annotation deleted");
        self.reload_annotations().await;
        Ok(())
    }

    /// Rename the selected witness. Returns `false` when the label is blank or
    /// unchanged and nothing was sent.
    pub async fn rename_selected(&mut self, label: &str) -> Result<bool, EditionError> {
        let witness_id = self.require_selected()?;
        let label = label.trim();
        let current = self
            .witnesses
            .iter()
            .find(|w| w.id == witness_id)
            .map(|w| w.label.as_str());
        if label.is_empty() || current == Some(label) {
            return Ok(false);
        }

        self.store.rename_witness(&witness_id, label).await?;
        tracing::info!(witness_id = %witness_id, label, "Witness renamed");
        if let Err(e) = self.refresh_witnesses().await {
            tracing::warn!(error = %e, "Witness list reload failed");
        }
        Ok(true)
    }

    /// Delete the selected witness and its annotations, then reset the
    /// comparison and annotation panel.
    pub async fn delete_selected(&mut self) -> Result<String, EditionError> {
        let witness_id = self.require_selected()?;
        self.store.delete_witness(&witness_id).await?;

        tracing::info!(witness_id = %witness_id, "Witness deleted");
        self.selected = None;
        self.comparison = None;
        self.annotations.clear();
        self.annotated.clear();
        if let Err(e) = self.refresh_witnesses().await {
            tracing::warn!(error = %e, "Witness list reload failed");
        }
        Ok(witness_id)
    }

    /// Upload a witness given as JSON text. Unparseable text is rejected
    /// before anything is sent.
    pub async fn import_witness(&mut self, json: &str) -> Result<(), EditionError> {
        let payload: serde_json::Value =
            serde_json::from_str(json).map_err(|e| EditionError::MalformedImport(e.to_string()))?;
        self.store.import_witness(&payload).await?;

        tracing::info!("Witness imported");
        if let Err(e) = self.refresh_witnesses().await {
            tracing::warn!(error = %e, "Witness list reload failed");
        }
        Ok(())
    }

    pub async fn export_selected(&self) -> Result<String, EditionError> {
        let witness_id = self.require_selected()?;
        self.store.export_witness(&witness_id).await
    }

    /// Substring search over the tokens of every witness.
    ///
    /// Witnesses are fetched one after another in list order. Hits replace
    /// the previous ones only once every fetch has succeeded; a blank query
    /// clears them.
    pub async fn search(&mut self, query: &str) -> Result<&[SearchHit], EditionError> {
        let query = query.trim();
        if query.is_empty() {
            self.clear_search();
            return Ok(&self.search_hits);
        }

        let mut hits = Vec::new();
        for summary in self.store.list_witnesses().await? {
            let witness = self.store.get_witness(&summary.id).await?;
            hits.extend(witness.tokens().filter(|t| t.text.contains(query)).map(|t| {
                SearchHit {
                    witness_id: summary.id.clone(),
                    witness_label: summary.label.clone(),
                    token_id: t.id.clone(),
                    position: t.position,
                    text: t.text.clone(),
                }
            }));
        }

        tracing::debug!(query, hits = hits.len(), "Search finished");
        self.search_hits = hits;
        Ok(&self.search_hits)
    }

    pub fn clear_search(&mut self) {
        self.search_hits.clear();
    }

    pub async fn logs(&self) -> Result<Vec<String>, EditionError> {
        self.store.logs().await
    }

    pub async fn export_logs(&self) -> Result<String, EditionError> {
        self.store.export_logs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{AlignedToken, PairAlignment, Section, StoredToken};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Store double: one witness, an annotation list, and a switch that makes
    /// every write fail with a server message.
    #[derive(Default)]
    struct ScriptedStore {
        annotations: Mutex<Vec<StoredAnnotation>>,
        reject_writes: AtomicBool,
    }

    impl ScriptedStore {
        fn check_write(&self) -> Result<(), EditionError> {
            if self.reject_writes.load(Ordering::SeqCst) {
                Err(EditionError::RemoteRequest("store is read-only".into()))
            } else {
                Ok(())
            }
        }
    }

    fn token(id: &str, text: &str, position: usize) -> StoredToken {
        StoredToken {
            id: id.into(),
            text: text.into(),
            position,
            bbox: None,
            baseline: None,
        }
    }

    #[async_trait]
    impl EditionStore for ScriptedStore {
        async fn list_witnesses(&self) -> Result<Vec<StoredWitnessSummary>, EditionError> {
            Ok(vec![StoredWitnessSummary {
                id: "w1".into(),
                label: "Witness One".into(),
            }])
        }

        async fn get_witness(&self, id: &str) -> Result<StoredWitness, EditionError> {
            if id != "w1" {
                return Err(EditionError::RemoteRequest("Witness not found".into()));
            }
            Ok(StoredWitness {
                id: "w1".into(),
                label: "Witness One".into(),
                siglum: None,
                sections: vec![Section {
                    id: "s1".into(),
                    order_no: 1,
                    kind: "page".into(),
                    tokens: vec![token("t1", "lorem", 1), token("t2", "ipsum", 2)],
                }],
                metadata: Default::default(),
                extra: Default::default(),
            })
        }

        async fn import_witness(&self, _payload: &serde_json::Value) -> Result<(), EditionError> {
            self.check_write()
        }

        async fn rename_witness(&self, _id: &str, _label: &str) -> Result<(), EditionError> {
            self.check_write()
        }

        async fn delete_witness(&self, _id: &str) -> Result<(), EditionError> {
            self.check_write()
        }

        async fn export_witness(&self, _id: &str) -> Result<String, EditionError> {
            Ok("{}".into())
        }

        async fn alignments(&self, _query: &AlignmentQuery) -> Result<PairAlignment, EditionError> {
            Ok(PairAlignment {
                alignments: vec![
                    PairAlignmentRow {
                        position: 1,
                        base: AlignedToken {
                            id: Some("t1".into()),
                            text: "lorem".into(),
                        },
                        witness: AlignedToken {
                            id: Some("t1".into()),
                            text: "lorem".into(),
                        },
                    },
                    PairAlignmentRow {
                        position: 2,
                        base: AlignedToken {
                            id: Some("t2".into()),
                            text: "ipsum".into(),
                        },
                        witness: AlignedToken::missing(),
                    },
                ],
            })
        }

        async fn list_annotations(
            &self,
            _witness_id: &str,
        ) -> Result<Vec<StoredAnnotation>, EditionError> {
            Ok(self.annotations.lock().unwrap().clone())
        }

        async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<(), EditionError> {
            self.check_write()?;
            let mut list = self.annotations.lock().unwrap();
            let id = AnnotationId::from(list.len() as u64 + 1);
            list.push(StoredAnnotation {
                id: Some(id),
                witness_id: Some(annotation.witness_id.clone()),
                token_id: annotation.token_id.clone(),
                annotation: annotation.annotation.clone(),
                timestamp: None,
            });
            Ok(())
        }

        async fn update_annotation(&self, _id: &AnnotationId, _text: &str) -> Result<(), EditionError> {
            self.check_write()
        }

        async fn delete_annotation(&self, _id: &AnnotationId) -> Result<(), EditionError> {
            self.check_write()
        }

        async fn logs(&self) -> Result<Vec<String>, EditionError> {
            Ok(Vec::new())
        }

        async fn export_logs(&self) -> Result<String, EditionError> {
            Ok(String::new())
        }
    }

    async fn workspace() -> RemoteWorkspace<ScriptedStore> {
        let mut ws = RemoteWorkspace::new(ScriptedStore::default());
        ws.refresh_witnesses().await.unwrap();
        ws
    }

    #[tokio::test]
    async fn refresh_selects_first_witness() {
        let ws = workspace().await;
        assert_eq!(ws.selected_witness(), Some("w1"));
        assert_eq!(ws.witnesses().len(), 1);
    }

    #[tokio::test]
    async fn annotate_highlights_and_reloads() {
        let mut ws = workspace().await;
        ws.annotate("w1", "t1", "check reading").await.unwrap();

        assert!(ws.highlighted().contains("t1"));
        assert_eq!(ws.annotations().len(), 1);
        assert_eq!(ws.annotations()[0].annotation, "check reading");
    }

    #[tokio::test]
    async fn failed_annotate_leaves_panel_untouched() {
        let mut ws = workspace().await;
        ws.annotate("w1", "t1", "first").await.unwrap();
        let before_list = ws.annotations().to_vec();
        let before_set = ws.highlighted().clone();

        ws.store().reject_writes.store(true, Ordering::SeqCst);
        let err = ws.annotate("w1", "t2", "second").await.unwrap_err();

        assert_eq!(err, EditionError::RemoteRequest("store is read-only".into()));
        assert_eq!(ws.annotations(), before_list.as_slice());
        assert_eq!(ws.highlighted(), &before_set);
    }

    #[tokio::test]
    async fn blank_note_is_not_sent() {
        let mut ws = workspace().await;
        let err = ws.annotate("w1", "t1", "   ").await.unwrap_err();
        assert!(matches!(err, EditionError::Validation(_)));
        assert!(ws.store().annotations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn comparison_rows_carry_highlights() {
        let mut ws = workspace().await;
        ws.compare(AlignmentQuery::new("w1", "w1")).await.unwrap();
        ws.annotate("w1", "t1", "note").await.unwrap();
        ws.search("lor").await.unwrap();

        let rows = ws.comparison_rows();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].differs);
        assert!(rows[0].annotated);
        assert!(rows[0].search_hit);
        assert!(rows[1].differs);
        assert_eq!(rows[1].witness, "[—]");
        assert_eq!(rows[1].token_id, None);
    }

    #[tokio::test]
    async fn search_formats_hits_and_clears_on_blank_query() {
        let mut ws = workspace().await;
        let hits = ws.search("ips").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].to_string(), "Witness One – Position 2: ipsum");

        assert!(ws.search("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_import_is_rejected_locally() {
        let mut ws = workspace().await;
        let err = ws.import_witness("{not json").await.unwrap_err();
        assert!(matches!(err, EditionError::MalformedImport(_)));
    }

    #[tokio::test]
    async fn unchanged_label_is_not_sent() {
        let mut ws = workspace().await;
        ws.store().reject_writes.store(true, Ordering::SeqCst);
        assert!(!ws.rename_selected("Witness One").await.unwrap());
        assert!(ws.rename_selected("Renamed").await.is_err());
    }

    #[tokio::test]
    async fn compare_requires_both_sides() {
        let mut ws = workspace().await;
        let err = ws.compare(AlignmentQuery::new("w1", "")).await.unwrap_err();
        assert!(matches!(err, EditionError::Validation(_)));
        assert!(ws.comparison().is_none());
    }
}
