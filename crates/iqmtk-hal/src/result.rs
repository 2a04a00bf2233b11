//! Execution results.

use std::collections::BTreeMap;

use iqmtk_compile::PostProcessing;
use iqmtk_ir::ClbitId;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Per-shot readouts of one circuit.
///
/// `shots[s][i]` is the value of `bits[i]` in shot `s`, so the table has
/// shape `n_shots × bits.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResult {
    bits: Vec<ClbitId>,
    shots: Vec<Vec<u8>>,
}

impl BackendResult {
    /// Create a result from a shot table. Every row must have one entry
    /// per bit, each 0 or 1.
    pub fn new(bits: Vec<ClbitId>, shots: Vec<Vec<u8>>) -> HalResult<Self> {
        for (s, row) in shots.iter().enumerate() {
            if row.len() != bits.len() {
                return Err(HalError::Backend(format!(
                    "Shot {s} has {} readouts, expected {}",
                    row.len(),
                    bits.len()
                )));
            }
            if row.iter().any(|&v| v > 1) {
                return Err(HalError::Backend(format!("Shot {s} has a non-binary readout")));
            }
        }
        Ok(Self { bits, shots })
    }

    /// Create a result from one readout column per bit.
    ///
    /// All columns must have the same length, which becomes the number of
    /// shots.
    pub fn from_columns(bits: Vec<ClbitId>, columns: Vec<Vec<u8>>) -> HalResult<Self> {
        if columns.len() != bits.len() {
            return Err(HalError::Backend(format!(
                "Got {} readout columns for {} bits",
                columns.len(),
                bits.len()
            )));
        }
        let n_shots = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != n_shots) {
            return Err(HalError::Backend("Readout columns differ in length".into()));
        }
        let shots = (0..n_shots)
            .map(|s| columns.iter().map(|c| c[s]).collect())
            .collect();
        Self::new(bits, shots)
    }

    /// Apply classical post-processing to every shot.
    #[must_use]
    pub fn postprocessed(mut self, postprocessing: &PostProcessing) -> Self {
        if !postprocessing.is_empty() {
            for shot in &mut self.shots {
                postprocessing.apply(shot, &self.bits);
            }
        }
        self
    }

    /// Bits in column order.
    pub fn bits(&self) -> &[ClbitId] {
        &self.bits
    }

    /// The shot table.
    pub fn get_shots(&self) -> &[Vec<u8>] {
        &self.shots
    }

    /// Number of shots.
    pub fn n_shots(&self) -> usize {
        self.shots.len()
    }

    /// Summarise the shots as outcome counts.
    pub fn get_counts(&self) -> Counts {
        let mut counts = Counts::new();
        for shot in &self.shots {
            counts.add(shot.clone(), 1);
        }
        counts
    }
}

/// Outcome counts, keyed by readout vector in bit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts(BTreeMap<Vec<u8>, u64>);

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `outcome`.
    pub fn add(&mut self, outcome: Vec<u8>, count: u64) {
        *self.0.entry(outcome).or_default() += count;
    }

    /// Occurrences of `outcome`.
    pub fn get(&self, outcome: &[u8]) -> u64 {
        self.0.get(outcome).copied().unwrap_or(0)
    }

    /// Total number of shots counted.
    pub fn total_shots(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether nothing was counted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most frequent outcome. Ties go to the smallest readout.
    pub fn most_frequent(&self) -> Option<(&[u8], u64)> {
        self.0
            .iter()
            .rev()
            .max_by_key(|(_, c)| **c)
            .map(|(o, c)| (o.as_slice(), *c))
    }

    /// Iterate over outcomes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.0.iter().map(|(o, c)| (o.as_slice(), *c))
    }

    /// Outcome frequencies.
    pub fn probabilities(&self) -> BTreeMap<Vec<u8>, f64> {
        let total = self.total_shots();
        if total == 0 {
            return BTreeMap::new();
        }
        self.0
            .iter()
            .map(|(o, &c)| (o.clone(), c as f64 / total as f64))
            .collect()
    }
}

/// Render a readout vector as a bitstring, first bit leftmost.
pub fn bitstring(outcome: &[u8]) -> String {
    outcome.iter().map(|&b| if b == 0 { '0' } else { '1' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_compile::ClassicalOp;

    fn bits(n: u32) -> Vec<ClbitId> {
        (0..n).map(ClbitId).collect()
    }

    #[test]
    fn test_from_columns_transposes() {
        let result =
            BackendResult::from_columns(bits(2), vec![vec![0, 1, 1], vec![1, 1, 0]]).unwrap();
        assert_eq!(result.n_shots(), 3);
        assert_eq!(result.get_shots(), &[vec![0, 1], vec![1, 1], vec![1, 0]]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        assert!(BackendResult::from_columns(bits(2), vec![vec![0, 1], vec![1]]).is_err());
        assert!(BackendResult::from_columns(bits(2), vec![vec![0]]).is_err());
        assert!(BackendResult::new(bits(1), vec![vec![2]]).is_err());
    }

    #[test]
    fn test_counts() {
        let result = BackendResult::new(
            bits(2),
            vec![vec![0, 0], vec![1, 1], vec![1, 1], vec![0, 1]],
        )
        .unwrap();
        let counts = result.get_counts();
        assert_eq!(counts.total_shots(), 4);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts.get(&[1, 1]), 2);
        assert_eq!(counts.get(&[1, 0]), 0);
        assert_eq!(counts.most_frequent(), Some((&[1_u8, 1][..], 2)));
        assert!((counts.probabilities()[&vec![0, 0]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_most_frequent_tie_prefers_smallest() {
        let mut counts = Counts::new();
        counts.add(vec![1], 3);
        counts.add(vec![0], 3);
        assert_eq!(counts.most_frequent(), Some((&[0_u8][..], 3)));
    }

    #[test]
    fn test_postprocessing_applied_to_every_shot() {
        let pp = PostProcessing::from_ops(vec![
            ClassicalOp::Flip { bit: ClbitId(0) },
            ClassicalOp::Xor {
                source: ClbitId(0),
                target: ClbitId(1),
            },
        ]);
        let result = BackendResult::new(bits(2), vec![vec![0, 0], vec![1, 0]])
            .unwrap()
            .postprocessed(&pp);
        assert_eq!(result.get_shots(), &[vec![1, 1], vec![0, 0]]);
    }

    #[test]
    fn test_bitstring() {
        assert_eq!(bitstring(&[0, 1, 1]), "011");
        assert_eq!(bitstring(&[]), "");
    }
}
