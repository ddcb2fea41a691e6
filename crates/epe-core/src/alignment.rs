// crates/epe-core/src/alignment.rs
//
// Positional alignment of witness token sequences.
//
// Row i pairs the tokens found at index i in every witness, regardless of
// whether they actually correspond textually. Shorter witnesses are padded
// with empty-string cells. There is no gap insertion and no collation.

use serde::{Deserialize, Serialize};

use crate::error::EditionError;
use crate::variants::{detect_variants, Variant};
use crate::witness::Witness;

/// Rectangular, index-aligned token matrix.
///
/// Immutable once built; a new alignment replaces it entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentMatrix {
    /// Witness ids in column order (the witnesses' import order).
    witness_ids: Vec<String>,
    /// One row per token position; every row has `witness_ids.len()` cells.
    rows: Vec<Vec<String>>,
}

impl AlignmentMatrix {
    /// Witness ids in column order.
    pub fn witness_ids(&self) -> &[String] {
        &self.witness_ids
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn witness_count(&self) -> usize {
        self.witness_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index of a witness id.
    pub fn column_of(&self, witness_id: &str) -> Option<usize> {
        self.witness_ids.iter().position(|id| id == witness_id)
    }

    /// Variants of every row against `base_column`, as `(row index, variants)`.
    pub fn variants(&self, base_column: usize) -> Vec<(usize, Vec<Variant>)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (idx, detect_variants(row, base_column)))
            .collect()
    }
}

/// Build the alignment matrix for `witnesses`, in the given order.
///
/// Fails with [`EditionError::InsufficientWitnesses`] for fewer than two
/// witnesses. If every witness is empty the matrix has zero rows.
pub fn align(witnesses: &[Witness]) -> Result<AlignmentMatrix, EditionError> {
    if witnesses.len() < 2 {
        return Err(EditionError::InsufficientWitnesses {
            found: witnesses.len(),
        });
    }

    let row_count = witnesses.iter().map(|w| w.tokens.len()).max().unwrap_or(0);

    let rows = (0..row_count)
        .map(|idx| {
            witnesses
                .iter()
                .map(|w| w.token_at(idx).to_string())
                .collect()
        })
        .collect();

    tracing::debug!(
        witnesses = witnesses.len(),
        rows = row_count,
        "Built positional alignment"
    );

    Ok(AlignmentMatrix {
        witness_ids: witnesses.iter().map(|w| w.id.clone()).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn witness(id: &str, tokens: &[&str]) -> Witness {
        let mut w = Witness::new(id, format!("{id}.txt"), tokens.join(" "));
        w.tokens = tokens.iter().map(|t| t.to_string()).collect();
        w
    }

    #[test]
    fn rejects_fewer_than_two_witnesses() {
        assert_eq!(
            align(&[]).unwrap_err(),
            EditionError::InsufficientWitnesses { found: 0 }
        );
        assert_eq!(
            align(&[witness("a", &["x"])]).unwrap_err(),
            EditionError::InsufficientWitnesses { found: 1 }
        );
    }

    #[test]
    fn pads_shorter_witness_with_empty_cells() {
        let a = witness("a", &["1", "2", "3"]);
        let b = witness("b", &["1", "2", "3", "4", "5"]);
        let matrix = align(&[a, b]).unwrap();

        assert_eq!(matrix.row_count(), 5);
        assert_eq!(matrix.row(3).unwrap()[0], "");
        assert_eq!(matrix.row(4).unwrap()[0], "");
        assert_eq!(matrix.row(4).unwrap()[1], "5");
    }

    #[test]
    fn every_row_has_one_cell_per_witness() {
        for lens in [[0usize, 0, 0], [1, 0, 4], [3, 3, 3], [7, 2, 5]] {
            let witnesses: Vec<Witness> = lens
                .iter()
                .enumerate()
                .map(|(i, &n)| {
                    let toks: Vec<String> = (0..n).map(|t| format!("t{t}")).collect();
                    let refs: Vec<&str> = toks.iter().map(String::as_str).collect();
                    witness(&format!("w{i}"), &refs)
                })
                .collect();
            let matrix = align(&witnesses).unwrap();
            assert_eq!(matrix.row_count(), *lens.iter().max().unwrap());
            assert!(matrix.rows().iter().all(|r| r.len() == 3));
        }
    }

    #[test]
    fn all_empty_witnesses_give_empty_matrix() {
        let matrix = align(&[witness("a", &[]), witness("b", &[])]).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.witness_ids(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn alignment_is_deterministic() {
        let ws = vec![witness("a", &["x", "y"]), witness("b", &["x"])];
        assert_eq!(align(&ws).unwrap(), align(&ws).unwrap());
    }
}
