// crates/epe-core/src/variants.rs

use serde::{Deserialize, Serialize};

/// A cell that differs from the base column in its row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Column (witness) index within the row.
    pub witness_index: usize,
    /// The differing token; may be the empty padding string.
    pub token: String,
}

/// Every non-base cell of `row` that is not exactly equal to the base cell.
///
/// Comparison is exact: case-sensitive, whitespace-sensitive, no
/// normalization. Padding counts as a reading, so a witness that is shorter at
/// this position is reported as a variant. A `base_column` outside the row
/// compares against the empty string.
pub fn detect_variants(row: &[String], base_column: usize) -> Vec<Variant> {
    let base = row.get(base_column).map(String::as_str).unwrap_or("");
    row.iter()
        .enumerate()
        .filter(|(idx, token)| *idx != base_column && token.as_str() != base)
        .map(|(idx, token)| Variant {
            witness_index: idx,
            token: token.clone(),
        })
        .collect()
}
