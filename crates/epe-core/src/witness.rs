// crates/epe-core/src/witness.rs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EditionError;
use crate::tokenizer::{tokenize, Pattern};

/// Number of tokens shown in a witness preview.
pub const PREVIEW_TOKENS: usize = 20;

/// One copy of the text being edited.
///
/// Tokens are derived from `text` and replaced wholesale on every
/// re-tokenization; they are never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// Stable identifier (file name without its last extension on import).
    pub id: String,
    /// Display name (the full file name on import).
    pub name: String,
    /// Raw source text.
    pub text: String,
    /// Token sequence from the last tokenization. Empty until tokenized.
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl Witness {
    /// Create an untokenized witness.
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: text.into(),
            tokens: Vec::new(),
        }
    }

    /// Create a witness from a file name and its contents.
    ///
    /// The id is the file name with its last extension removed
    /// (`ms_a.v2.txt` → `ms_a.v2`); the display name is the file name itself.
    pub fn from_named_text(file_name: &str, text: impl Into<String>) -> Self {
        Self::new(witness_id_from_file_name(file_name), file_name, text)
    }

    /// Load a plain-text witness from disk.
    pub fn load(path: &Path) -> Result<Self, EditionError> {
        let text = fs::read_to_string(path)
            .map_err(|e| EditionError::Io(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EditionError::Io(format!("{}: not a file", path.display())))?;
        Ok(Self::from_named_text(&file_name, text))
    }

    /// The token sequence `pattern` would produce for this witness.
    pub fn tokenized(&self, pattern: &Pattern) -> Vec<String> {
        tokenize(&self.text, pattern)
    }

    /// Token at `position`, or the empty string past the end.
    pub fn token_at(&self, position: usize) -> &str {
        self.tokens.get(position).map(String::as_str).unwrap_or("")
    }

    /// Short overview for listings.
    pub fn summary(&self) -> WitnessSummary {
        WitnessSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            token_count: self.tokens.len(),
            preview: self
                .tokens
                .iter()
                .take(PREVIEW_TOKENS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Listing entry for a loaded witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessSummary {
    pub id: String,
    pub name: String,
    pub token_count: usize,
    /// The first [`PREVIEW_TOKENS`] tokens joined by single spaces.
    pub preview: String,
}

/// Strip the last extension from a file name.
pub fn witness_id_from_file_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot + 1 < file_name.len() => file_name[..dot].to_string(),
        _ => file_name.to_string(),
    }
}

/// Load several witness files in order, one after the other.
///
/// Fails on the first unreadable file; nothing is returned in that case.
pub fn load_witnesses<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Witness>, EditionError> {
    let mut witnesses = Vec::with_capacity(paths.len());
    for path in paths {
        let witness = Witness::load(path.as_ref())?;
        tracing::debug!(id = %witness.id, bytes = witness.text.len(), "Loaded witness file");
        witnesses.push(witness);
    }
    Ok(witnesses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_drops_only_the_last_extension() {
        assert_eq!(witness_id_from_file_name("witness1.txt"), "witness1");
        assert_eq!(witness_id_from_file_name("ms.a.txt"), "ms.a");
        assert_eq!(witness_id_from_file_name("README"), "README");
        assert_eq!(witness_id_from_file_name("trailing."), "trailing.");
    }

    #[test]
    fn summary_previews_first_twenty_tokens() {
        let mut w = Witness::from_named_text("w.txt", "");
        w.tokens = (0..25).map(|i| i.to_string()).collect();
        let summary = w.summary();
        assert_eq!(summary.token_count, 25);
        assert!(summary.preview.starts_with("0 1 2"));
        assert!(summary.preview.ends_with("18 19"));
    }

    #[test]
    fn token_at_pads_with_empty_string() {
        let mut w = Witness::new("w", "w", "a b");
        w.tokens = w.tokenized(&Pattern::default());
        assert_eq!(w.token_at(1), "b");
        assert_eq!(w.token_at(2), "");
    }

    #[test]
    fn load_reads_file_and_derives_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leiden.txt");
        fs::write(&path, "bismi llahi").unwrap();

        let w = Witness::load(&path).unwrap();
        assert_eq!(w.id, "leiden");
        assert_eq!(w.name, "leiden.txt");
        assert_eq!(w.text, "bismi llahi");
        assert!(w.tokens.is_empty());
    }

    #[test]
    fn load_witnesses_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("a.txt");
        fs::write(&ok, "x").unwrap();
        let missing = dir.path().join("b.txt");

        let err = load_witnesses(&[ok, missing]).unwrap_err();
        assert!(matches!(err, EditionError::Io(_)));
    }
}
