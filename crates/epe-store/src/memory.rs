// crates/epe-store/src/memory.rs
//
// In-memory witness/annotation store implementing the `EditionStore` trait.
//
// Mirrors the REST store's observable behaviour (status rules, error
// messages, cascade on delete, positional pairwise alignment, request log)
// without a network. Used for offline work and as the collaborator in tests.
// A single lock serializes all requests, so concurrent writes resolve as
// last write wins.

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, SubsecRound};

use epe_core::error::EditionError;
use epe_core::remote::{
    AlignedToken, AlignmentQuery, AnnotationId, NewAnnotation, PairAlignment, PairAlignmentRow,
    StoredAnnotation, StoredToken, StoredWitness, StoredWitnessSummary,
};
use epe_core::traits::EditionStore;

#[derive(Debug, Default)]
struct StoreState {
    witnesses: Vec<StoredWitness>,
    annotations: Vec<StoredAnnotation>,
    next_annotation_id: u64,
    logs: Vec<String>,
}

impl StoreState {
    /// Append one request log line: `TIMESTAMP METHOD PATH STATUS MESSAGE`.
    fn log(&mut self, method: &str, path: &str, status: u16, message: &str) {
        let timestamp = now().format("%Y-%m-%dT%H:%M:%S");
        self.logs
            .push(format!("{} {} {} {} {}", timestamp, method, path, status, message));
    }

    /// Log a rejected request and return the error a client would see.
    fn reject(&mut self, method: &str, path: &str, status: u16, message: &str) -> EditionError {
        self.log(method, path, status, message);
        tracing::debug!(method, path, status, message, "In-memory store rejected request");
        EditionError::RemoteRequest(message.to_string())
    }

    fn witness(&self, id: &str) -> Option<&StoredWitness> {
        self.witnesses.iter().find(|w| w.id == id)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryEditionStore {
    state: RwLock<StoreState>,
}

impl InMemoryEditionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `witnesses`.
    pub fn with_witnesses(witnesses: Vec<StoredWitness>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                witnesses,
                ..StoreState::default()
            }),
        }
    }

    /// Seed from a JSON file holding an array of witness objects.
    pub fn from_json_file(path: &Path) -> Result<Self, EditionError> {
        let text = std::fs::read_to_string(path)?;
        let witnesses: Vec<StoredWitness> = serde_json::from_str(&text)
            .map_err(|e| EditionError::MalformedImport(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), count = witnesses.len(), "Seeded in-memory store");
        Ok(Self::with_witnesses(witnesses))
    }

    /// Number of witnesses currently held.
    pub fn witness_count(&self) -> usize {
        self.state.read().expect("RwLock poisoned").witnesses.len()
    }

    /// Number of annotations across all witnesses.
    pub fn annotation_count(&self) -> usize {
        self.state.read().expect("RwLock poisoned").annotations.len()
    }
}

/// Tokens of the requested section, or of the first section when none is named.
fn section_tokens<'a>(
    witness: &'a StoredWitness,
    section: Option<&str>,
) -> Option<&'a [StoredToken]> {
    match section {
        Some(id) => witness.section(Some(id)).map(|s| s.tokens.as_slice()),
        None => Some(
            witness
                .section(None)
                .map(|s| s.tokens.as_slice())
                .unwrap_or(&[]),
        ),
    }
}

fn aligned(token: Option<&StoredToken>) -> AlignedToken {
    match token {
        Some(t) => AlignedToken {
            id: Some(t.id.clone()),
            text: t.text.clone(),
        },
        None => AlignedToken::missing(),
    }
}

/// Positional pairing of two witnesses' section tokens, 1-based.
fn pair_rows(
    state: &StoreState,
    query: &AlignmentQuery,
) -> Result<Vec<PairAlignmentRow>, (u16, &'static str)> {
    let (Some(base), Some(other)) = (state.witness(&query.base), state.witness(&query.witness))
    else {
        return Err((404, "Witness not found"));
    };
    let base_tokens = section_tokens(base, query.base_section.as_deref());
    let other_tokens = section_tokens(other, query.witness_section.as_deref());
    let (Some(base_tokens), Some(other_tokens)) = (base_tokens, other_tokens) else {
        return Err((404, "Section not found"));
    };

    let len = base_tokens.len().max(other_tokens.len());
    Ok((0..len)
        .map(|idx| PairAlignmentRow {
            position: idx + 1,
            base: aligned(base_tokens.get(idx)),
            witness: aligned(other_tokens.get(idx)),
        })
        .collect())
}

#[async_trait]
impl EditionStore for InMemoryEditionStore {
    async fn list_witnesses(&self) -> Result<Vec<StoredWitnessSummary>, EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let list = state.witnesses.iter().map(StoredWitness::summary).collect();
        state.log("GET", "/api/witnesses", 200, "");
        Ok(list)
    }

    async fn get_witness(&self, id: &str) -> Result<StoredWitness, EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = format!("/api/witnesses/{}", id);
        match state.witness(id).cloned() {
            Some(w) => {
                state.log("GET", &path, 200, "");
                Ok(w)
            }
            None => Err(state.reject("GET", &path, 404, "Witness not found")),
        }
    }

    async fn import_witness(&self, payload: &serde_json::Value) -> Result<(), EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = "/api/witnesses";

        let has_required = payload
            .as_object()
            .map(|o| o.contains_key("id") && o.contains_key("label"))
            .unwrap_or(false);
        if !has_required {
            return Err(state.reject("POST", path, 400, "Missing required fields"));
        }
        let witness: StoredWitness = match serde_json::from_value(payload.clone()) {
            Ok(w) => w,
            Err(_) => return Err(state.reject("POST", path, 400, "Invalid witness")),
        };
        if state.witness(&witness.id).is_some() {
            return Err(state.reject("POST", path, 400, "Witness ID already exists"));
        }

        let message = format!("Imported witness {}", witness.id);
        state.witnesses.push(witness);
        state.log("POST", path, 201, &message);
        tracing::info!("{}", message);
        Ok(())
    }

    async fn rename_witness(&self, id: &str, label: &str) -> Result<(), EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = format!("/api/witnesses/{}", id);
        if label.trim().is_empty() {
            return Err(state.reject("PATCH", &path, 400, "Missing label"));
        }
        match state.witnesses.iter_mut().find(|w| w.id == id) {
            Some(w) => w.label = label.to_string(),
            None => return Err(state.reject("PATCH", &path, 404, "Witness not found")),
        }
        state.log("PATCH", &path, 200, &format!("Renamed witness {}", id));
        Ok(())
    }

    async fn delete_witness(&self, id: &str) -> Result<(), EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = format!("/api/witnesses/{}", id);
        let Some(index) = state.witnesses.iter().position(|w| w.id == id) else {
            return Err(state.reject("DELETE", &path, 404, "Witness not found"));
        };

        state.witnesses.remove(index);
        let before = state.annotations.len();
        state
            .annotations
            .retain(|a| a.witness_id.as_deref() != Some(id));
        let removed = before - state.annotations.len();

        state.log("DELETE", &path, 204, &format!("Deleted witness {}", id));
        tracing::info!(witness_id = id, annotations_removed = removed, "Witness deleted");
        Ok(())
    }

    async fn export_witness(&self, id: &str) -> Result<String, EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = format!("/api/export/{}", id);
        let Some(witness) = state.witness(id).cloned() else {
            return Err(state.reject("GET", &path, 404, "Witness not found"));
        };
        let body = serde_json::to_string_pretty(&witness)?;
        state.log("GET", &path, 200, "");
        Ok(body)
    }

    async fn alignments(&self, query: &AlignmentQuery) -> Result<PairAlignment, EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = "/api/alignments";
        if query.base.is_empty() || query.witness.is_empty() {
            return Err(state.reject("GET", path, 400, "Missing base or witness id"));
        }

        let rows = match pair_rows(&state, query) {
            Ok(rows) => rows,
            Err((status, message)) => return Err(state.reject("GET", path, status, message)),
        };

        state.log("GET", path, 200, "");
        Ok(PairAlignment { alignments: rows })
    }

    async fn list_annotations(
        &self,
        witness_id: &str,
    ) -> Result<Vec<StoredAnnotation>, EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let list = state
            .annotations
            .iter()
            .filter(|a| a.witness_id.as_deref() == Some(witness_id))
            .cloned()
            .collect();
        state.log("GET", "/api/annotations", 200, "");
        Ok(list)
    }

    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<(), EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = "/api/annotations";
        if annotation.witness_id.is_empty() || annotation.token_id.is_empty() {
            return Err(state.reject("POST", path, 400, "Missing fields"));
        }

        state.next_annotation_id += 1;
        let id = AnnotationId::from(state.next_annotation_id);
        state.annotations.push(StoredAnnotation {
            id: Some(id),
            witness_id: Some(annotation.witness_id.clone()),
            token_id: annotation.token_id.clone(),
            annotation: annotation.annotation.clone(),
            timestamp: Some(now()),
        });
        let message = format!("Annotation added to {}", annotation.token_id);
        state.log("POST", path, 201, &message);
        Ok(())
    }

    async fn update_annotation(&self, id: &AnnotationId, text: &str) -> Result<(), EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = format!("/api/annotations/{}", id);
        match state
            .annotations
            .iter_mut()
            .find(|a| a.id.as_ref() == Some(id))
        {
            Some(a) => {
                a.annotation = text.to_string();
                a.timestamp = Some(now());
            }
            None => return Err(state.reject("PUT", &path, 404, "Annotation not found")),
        }
        state.log("PUT", &path, 200, &format!("Annotation {} updated", id));
        Ok(())
    }

    async fn delete_annotation(&self, id: &AnnotationId) -> Result<(), EditionError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let path = format!("/api/annotations/{}", id);
        let Some(index) = state.annotations.iter().position(|a| a.id.as_ref() == Some(id)) else {
            return Err(state.reject("DELETE", &path, 404, "Annotation not found"));
        };
        state.annotations.remove(index);
        state.log("DELETE", &path, 204, &format!("Annotation {} deleted", id));
        Ok(())
    }

    async fn logs(&self) -> Result<Vec<String>, EditionError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.logs.clone())
    }

    async fn export_logs(&self) -> Result<String, EditionError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.logs.iter().map(|l| format!("{}\n", l)).collect())
    }
}
