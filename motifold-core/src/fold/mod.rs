//! Partition-function engine and posterior base-pair probabilities.

pub mod matrices;
pub mod partition;
pub mod posterior;
pub mod pseudoknot;

pub use matrices::{Mat, Tensor4};

use crate::constants::PB_PRINT_FLOOR;
use crate::energy::{EnergyModel, EnergyParams};
use crate::sequence::RnaSequence;
use crate::types::Prob;

/// Which partition-function recurrence to run.
///
/// The fast/slow toggle selects one of two pure functions over the same
/// tables; dispatch is a plain match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldMode {
    /// McCaskill-style nested-only recurrences. `fast` selects the O(N^3)
    /// factorized form over the O(N^4) reference form.
    NoPseudoknots { fast: bool },
    /// Dirks-Pierce pseudoknot recurrences with the rank-4 gap tensors.
    Pseudoknots { fast: bool },
}

impl Default for FoldMode {
    fn default() -> Self {
        Self::NoPseudoknots { fast: true }
    }
}

/// Nested-only partition functions.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    pub q: Mat,
    pub qb: Mat,
    pub qm: Mat,
}

/// Pseudoknotted partition functions.
#[derive(Debug, Clone)]
pub struct PkPartitionSet {
    pub q: Mat,
    pub qb: Mat,
    pub qm: Mat,
    pub qp: Mat,
    pub qz: Mat,
    pub qg: Tensor4,
    pub qgl: Tensor4,
    pub qgr: Tensor4,
    pub qgls: Tensor4,
    pub qgrs: Tensor4,
}

impl PkPartitionSet {
    /// The nested Q/Qb/Qm slice of the pseudoknotted tables, which the
    /// posterior back-recursion runs over.
    #[must_use]
    pub fn nested(&self) -> PartitionSet {
        PartitionSet {
            q: self.q.clone(),
            qb: self.qb.clone(),
            qm: self.qm.clone(),
        }
    }
}

/// Partition functions of either mode.
#[derive(Debug, Clone)]
pub enum Partition {
    Nested(PartitionSet),
    Pseudoknotted(PkPartitionSet),
}

impl Partition {
    /// Ensemble partition function of the full strand.
    #[must_use]
    pub fn total(&self) -> f64 {
        let q = match self {
            Self::Nested(p) => &p.q,
            Self::Pseudoknotted(p) => &p.q,
        };
        let n = q.nrows();
        q[[0, n - 1]]
    }
}

/// Run the partition-function recurrence selected by `mode`.
#[must_use]
pub fn compute_partition(seq: &RnaSequence, params: &EnergyParams, mode: FoldMode) -> Partition {
    let em = EnergyModel::new(seq, params);
    match mode {
        FoldMode::NoPseudoknots { fast: true } => {
            Partition::Nested(partition::partition_no_pk_on3(&em))
        }
        FoldMode::NoPseudoknots { fast: false } => {
            Partition::Nested(partition::partition_no_pk_on4(&em))
        }
        // Both pseudoknot variants evaluate the same recurrences; the
        // interior-loop fast path of the quintic variant never left the
        // reference implementation (see DESIGN.md).
        FoldMode::Pseudoknots { .. } => Partition::Pseudoknotted(pseudoknot::partition_pk(&em)),
    }
}

/// Posterior base-pair probability matrix Pb for the given mode.
#[must_use]
pub fn base_pair_probabilities(seq: &RnaSequence, params: &EnergyParams, mode: FoldMode) -> Mat {
    let em = EnergyModel::new(seq, params);
    match compute_partition(seq, params, mode) {
        Partition::Nested(parts) => posterior::posterior_no_pk(&em, &parts),
        Partition::Pseudoknotted(parts) => posterior::posterior_no_pk(&em, &parts.nested()),
    }
}

/// Diagnostic text rendering of Pb: -log10(Pb) rounded to an integer per
/// cell, blanks below the print floor, sequence on the margins. Cells
/// above `theta` are the ones the ILP keeps as decision variables.
#[must_use]
pub fn format_posterior(seq: &RnaSequence, pb: &Mat, theta: Prob) -> String {
    let n = seq.len();
    let raw = seq.to_string();
    let mut out = String::new();
    out.push_str(&format!("  {raw}   (cells with Pb > {theta} become decision variables)\n"));
    for u in 0..n {
        let mut line = String::from("  ");
        for v in 0..n {
            let p = pb[[u, v]];
            if p < PB_PRINT_FLOOR {
                line.push(' ');
            } else {
                line.push_str(&format!("{}", (-p.log10()) as i64));
            }
        }
        line.push(raw.as_bytes()[u] as char);
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pb(raw: &str, mode: FoldMode) -> (RnaSequence, Mat) {
        let seq = RnaSequence::new("t", raw).unwrap();
        let params = EnergyParams::default_turner();
        let m = base_pair_probabilities(&seq, &params, mode);
        (seq, m)
    }

    #[test]
    fn fast_and_reference_posteriors_agree() {
        let (seq, a) = pb("GGGGAAAACCCCAAGGGAAACCC", FoldMode::NoPseudoknots { fast: false });
        let (_, b) = pb("GGGGAAAACCCCAAGGGAAACCC", FoldMode::NoPseudoknots { fast: true });
        let n = seq.len();
        for i in 0..n {
            for j in i + 1..n {
                assert!(
                    (a[[i, j]] - b[[i, j]]).abs() < 1e-6,
                    "Pb({i},{j}): {} vs {}",
                    a[[i, j]],
                    b[[i, j]]
                );
            }
        }
    }

    #[test]
    fn pseudoknot_mode_yields_a_posterior() {
        let (seq, m) = pb("GGGAAACCCAAA", FoldMode::Pseudoknots { fast: true });
        let n = seq.len();
        let mut mass = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                assert!((0.0..=1.0 + 1e-9).contains(&m[[i, j]]));
                mass += m[[i, j]];
            }
        }
        assert!(mass > 0.0);
    }

    #[test]
    fn posterior_rendering_omits_tiny_cells() {
        let (seq, m) = pb("GGGAAACCC", FoldMode::default());
        let text = format_posterior(&seq, &m, 0.0);
        assert!(text.contains("GGGAAACCC"));
        // every line is sequence-width plus margin and margin base
        for line in text.lines().skip(1) {
            assert_eq!(line.chars().count(), 2 + seq.len() + 1);
        }
    }
}
