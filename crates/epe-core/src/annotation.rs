// crates/epe-core/src/annotation.rs
//
// In-memory, position-addressed annotation store.
//
// Annotations are keyed by (witness id, token position) and kept in insertion
// order within a position. They are addressed by slot, not by token content:
// re-tokenizing a witness leaves them where they are.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EditionError;
use crate::traits::AnnotationStore;

/// A single key/value note on a token slot.
///
/// Deserialized notes go through [`Annotation::new`], so a document or
/// sidecar with a blank key or value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NoteFields")]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize)]
struct NoteFields {
    key: String,
    value: String,
}

impl TryFrom<NoteFields> for Annotation {
    type Error = EditionError;

    fn try_from(fields: NoteFields) -> Result<Self, Self::Error> {
        Annotation::new(&fields.key, &fields.value)
    }
}

impl Annotation {
    /// Build a note from user input. Both sides are trimmed and must be non-empty.
    pub fn new(key: &str, value: &str) -> Result<Self, EditionError> {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(EditionError::Validation(
                "annotation key must not be empty".to_string(),
            ));
        }
        if value.is_empty() {
            return Err(EditionError::Validation(
                "annotation value must not be empty".to_string(),
            ));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// `key: value`, as shown in annotation lists and tooltips.
    pub fn display_line(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

/// Nested map `witness id -> position -> notes`.
///
/// Serializes as `{ "w1": { "2": [ {"key": .., "value": ..} ] } }`, the shape
/// used by the edition data document. Positions whose list becomes empty are
/// pruned, as are witnesses with no positions left.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnnotationMap {
    entries: BTreeMap<String, BTreeMap<usize, Vec<Annotation>>>,
}

impl<'de> Deserialize<'de> for AnnotationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut entries = BTreeMap::<String, BTreeMap<usize, Vec<Annotation>>>::deserialize(
            deserializer,
        )?;
        entries.retain(|_, positions| {
            positions.retain(|_, notes| !notes.is_empty());
            !positions.is_empty()
        });
        Ok(Self { entries })
    }
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of notes across all slots.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|positions| positions.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All annotated positions of one witness.
    pub fn for_witness(&self, witness_id: &str) -> Option<&BTreeMap<usize, Vec<Annotation>>> {
        self.entries.get(witness_id)
    }

    /// Every `(witness id, position, notes)` triple in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &[Annotation])> {
        self.entries.iter().flat_map(|(wid, positions)| {
            positions
                .iter()
                .map(move |(pos, notes)| (wid.as_str(), *pos, notes.as_slice()))
        })
    }

    /// Append every note of `other` after the notes already present at the same slot.
    ///
    /// Used to combine annotations edited in separate views (a sidecar file and
    /// a session, two exports) without losing either side's ordering.
    pub fn merge(&mut self, other: &AnnotationMap) {
        for (wid, position, notes) in other.iter() {
            if notes.is_empty() {
                continue;
            }
            self.entries
                .entry(wid.to_string())
                .or_default()
                .entry(position)
                .or_default()
                .extend(notes.iter().cloned());
        }
    }
}

impl AnnotationStore for AnnotationMap {
    fn add(
        &mut self,
        witness_id: &str,
        position: usize,
        key: &str,
        value: &str,
    ) -> Result<(), EditionError> {
        let note = Annotation::new(key, value)?;
        self.entries
            .entry(witness_id.to_string())
            .or_default()
            .entry(position)
            .or_default()
            .push(note);
        tracing::debug!(witness_id, position, "Annotation added");
        Ok(())
    }

    fn list(&self, witness_id: &str, position: usize) -> &[Annotation] {
        self.entries
            .get(witness_id)
            .and_then(|positions| positions.get(&position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn remove(
        &mut self,
        witness_id: &str,
        position: usize,
        index: usize,
    ) -> Result<Annotation, EditionError> {
        let not_found = || EditionError::AnnotationNotFound {
            witness_id: witness_id.to_string(),
            position,
            index,
        };

        let positions = self.entries.get_mut(witness_id).ok_or_else(not_found)?;
        let notes = positions.get_mut(&position).ok_or_else(not_found)?;
        if index >= notes.len() {
            return Err(not_found());
        }
        let removed = notes.remove(index);

        if notes.is_empty() {
            positions.remove(&position);
        }
        if positions.is_empty() {
            self.entries.remove(witness_id);
        }
        tracing::debug!(witness_id, position, index, "Annotation removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_insertion_order() {
        let mut map = AnnotationMap::new();
        map.add("w1", 2, "lemma", "qwl").unwrap();
        map.add("w1", 2, "note", "erasure").unwrap();

        let notes = map.list("w1", 2);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].key, "lemma");
        assert_eq!(notes[1].key, "note");
    }

    #[test]
    fn add_rejects_empty_key_or_value() {
        let mut map = AnnotationMap::new();
        assert!(matches!(
            map.add("w1", 0, "  ", "v"),
            Err(EditionError::Validation(_))
        ));
        assert!(matches!(
            map.add("w1", 0, "k", ""),
            Err(EditionError::Validation(_))
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn add_trims_input() {
        let mut map = AnnotationMap::new();
        map.add("w1", 0, " k ", " v ").unwrap();
        assert_eq!(map.list("w1", 0)[0], Annotation::new("k", "v").unwrap());
    }

    #[test]
    fn list_of_unknown_slot_is_empty() {
        let map = AnnotationMap::new();
        assert!(map.list("nope", 9).is_empty());
    }

    #[test]
    fn remove_by_local_index_and_prune() {
        let mut map = AnnotationMap::new();
        map.add("w1", 1, "a", "1").unwrap();
        map.add("w1", 1, "b", "2").unwrap();

        let removed = map.remove("w1", 1, 0).unwrap();
        assert_eq!(removed.key, "a");
        assert_eq!(map.list("w1", 1)[0].key, "b");

        map.remove("w1", 1, 0).unwrap();
        assert!(map.for_witness("w1").is_none());
    }

    #[test]
    fn remove_out_of_range_is_an_error() {
        let mut map = AnnotationMap::new();
        map.add("w1", 1, "a", "1").unwrap();
        let err = map.remove("w1", 1, 5).unwrap_err();
        assert!(matches!(err, EditionError::AnnotationNotFound { index: 5, .. }));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn merge_appends_after_existing_notes() {
        let mut left = AnnotationMap::new();
        left.add("w1", 0, "a", "1").unwrap();
        let mut right = AnnotationMap::new();
        right.add("w1", 0, "b", "2").unwrap();
        right.add("w2", 3, "c", "3").unwrap();

        left.merge(&right);
        let keys: Vec<&str> = left.list("w1", 0).iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(left.list("w2", 3).len(), 1);
        assert_eq!(left.len(), 3);
    }

    #[test]
    fn empty_slots_are_pruned_on_load() {
        let map: AnnotationMap =
            serde_json::from_str(r#"{"w1": {"1": []}, "w2": {"0": [{"key": "k", "value": "v"}], "4": []}}"#)
                .unwrap();
        assert!(map.for_witness("w1").is_none());
        assert_eq!(map.for_witness("w2").unwrap().len(), 1);
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            serde_json::json!({"w2": {"0": [{"key": "k", "value": "v"}]}})
        );

        let mut merged = AnnotationMap::new();
        merged.merge(&map);
        assert_eq!(merged, map);
    }

    #[test]
    fn blank_notes_are_rejected_on_load() {
        let blank_key = r#"{"w1": {"0": [{"key": " ", "value": "v"}]}}"#;
        let blank_value = r#"{"w1": {"0": [{"key": "k", "value": ""}]}}"#;
        assert!(serde_json::from_str::<AnnotationMap>(blank_key).is_err());
        assert!(serde_json::from_str::<AnnotationMap>(blank_value).is_err());
    }

    #[test]
    fn serializes_positions_as_string_keys() {
        let mut map = AnnotationMap::new();
        map.add("w1", 2, "k", "v").unwrap();
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"w1": {"2": [{"key": "k", "value": "v"}]}}));

        let back: AnnotationMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}
