// crates/epe-core/src/remote.rs
//
// Wire types of the witness/annotation REST store used by the networked
// variant. Unknown fields on witness payloads are preserved so that an
// import → fetch cycle does not lose data.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Rendered in place of a token missing on one side of a pairwise alignment.
pub const MISSING_TOKEN: &str = "[—]";

/// Entry of the witness listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWitnessSummary {
    pub id: String,
    pub label: String,
}

/// Token bounding box on the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A token held by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub id: String,
    pub text: String,
    /// 1-based position within its section.
    #[serde(default)]
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Vec<i64>>,
}

/// A section (page, chapter) of a stored witness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub order_no: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tokens: Vec<StoredToken>,
}

/// Full witness detail as returned by `GET /api/witnesses/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWitness {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub siglum: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Any other fields of the imported payload.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredWitness {
    pub fn summary(&self) -> StoredWitnessSummary {
        StoredWitnessSummary {
            id: self.id.clone(),
            label: self.label.clone(),
        }
    }

    /// Section by id, or the first section when `id` is `None`.
    pub fn section(&self, id: Option<&str>) -> Option<&Section> {
        match id {
            Some(id) => self.sections.iter().find(|s| s.id == id),
            None => self.sections.first(),
        }
    }

    /// Every token in section order.
    pub fn tokens(&self) -> impl Iterator<Item = &StoredToken> {
        self.sections.iter().flat_map(|s| s.tokens.iter())
    }
}

/// One side of a pairwise alignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedToken {
    /// Token id; `None` on the padded side.
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
}

impl AlignedToken {
    /// Placeholder for a position one witness does not reach.
    pub fn missing() -> Self {
        Self {
            id: None,
            text: MISSING_TOKEN.to_string(),
        }
    }
}

/// A row of `GET /api/alignments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAlignmentRow {
    /// 1-based position.
    pub position: usize,
    pub base: AlignedToken,
    pub witness: AlignedToken,
}

impl PairAlignmentRow {
    /// The two sides read differently.
    pub fn differs(&self) -> bool {
        self.base.text != self.witness.text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAlignment {
    pub alignments: Vec<PairAlignmentRow>,
}

/// Parameters of a pairwise alignment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentQuery {
    pub base: String,
    pub witness: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness_section: Option<String>,
}

impl AlignmentQuery {
    pub fn new(base: impl Into<String>, witness: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            witness: witness.into(),
            base_section: None,
            witness_section: None,
        }
    }

    pub fn with_sections(mut self, base: Option<String>, witness: Option<String>) -> Self {
        self.base_section = base;
        self.witness_section = witness;
        self
    }
}

/// Store-assigned annotation identifier.
///
/// Stores hand these out as integers or strings; both are accepted and kept
/// in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for AnnotationId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for AnnotationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => AnnotationId(n.to_string()),
            Raw::Text(s) => AnnotationId(s),
        })
    }
}

/// A stored annotation as listed by `GET /api/annotations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAnnotation {
    /// Absent on legacy entries; such entries can be listed but not edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnnotationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_id: Option<String>,
    pub token_id: String,
    pub annotation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

/// Body of `POST /api/annotations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub witness_id: String,
    pub token_id: String,
    pub annotation: String,
}

/// Body of `PUT /api/annotations/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationUpdate {
    pub annotation: String,
}

/// Body of `PATCH /api/witnesses/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessRename {
    pub label: String,
}

/// Body of `GET /api/logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogListing {
    pub logs: Vec<String>,
}

/// A token matching a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub witness_id: String,
    pub witness_label: String,
    pub token_id: String,
    pub position: usize,
    pub text: String,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} – Position {}: {}",
            self.witness_label, self.position, self.text
        )
    }
}
