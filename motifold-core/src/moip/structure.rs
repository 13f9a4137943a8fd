use std::fmt;

use crate::motif::Motif;
use crate::types::BasePair;

/// One predicted secondary structure: the selected base pairs, the
/// inserted motifs and the two objective values it was solved at.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryStructure {
    length: usize,
    pairs: Vec<BasePair>,
    motifs: Vec<Motif>,
    /// Objective 1: total score of the inserted motifs.
    motif_coverage: f64,
    /// Objective 2: expected accuracy, the summed probability of the
    /// selected pairs.
    expected_accuracy: f64,
    /// Sentinel flag for the structure returned on solver failure.
    is_empty: bool,
}

impl SecondaryStructure {
    /// Fresh structure over a sequence of the given length.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            length,
            pairs: Vec::new(),
            motifs: Vec::new(),
            motif_coverage: 0.0,
            expected_accuracy: 0.0,
            is_empty: false,
        }
    }

    /// Sentinel returned when a solve finds no solution.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            length: 0,
            pairs: Vec::new(),
            motifs: Vec::new(),
            motif_coverage: 0.0,
            expected_accuracy: 0.0,
            is_empty: true,
        }
    }

    /// Whether this is the no-solution sentinel.
    #[must_use]
    pub fn is_empty_structure(&self) -> bool {
        self.is_empty
    }

    /// Record the pair (u, v); order of arguments is irrelevant.
    pub fn set_basepair(&mut self, u: usize, v: usize) {
        let pair = if u < v { (u, v) } else { (v, u) };
        self.pairs.push(pair);
    }

    /// Record an inserted motif.
    pub fn insert_motif(&mut self, motif: Motif) {
        self.motifs.push(motif);
    }

    /// Order the selected pairs by position.
    pub fn sort(&mut self) {
        self.pairs.sort_unstable();
    }

    pub fn set_objective_scores(&mut self, motif_coverage: f64, expected_accuracy: f64) {
        self.motif_coverage = motif_coverage;
        self.expected_accuracy = expected_accuracy;
    }

    #[must_use]
    pub fn pairs(&self) -> &[BasePair] {
        &self.pairs
    }

    #[must_use]
    pub fn motifs(&self) -> &[Motif] {
        &self.motifs
    }

    #[must_use]
    pub fn motif_coverage(&self) -> f64 {
        self.motif_coverage
    }

    #[must_use]
    pub fn expected_accuracy(&self) -> f64 {
        self.expected_accuracy
    }

    /// Pareto dominance: at least as good in both objectives and strictly
    /// better in one.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        self.motif_coverage >= other.motif_coverage
            && self.expected_accuracy >= other.expected_accuracy
            && (self.motif_coverage > other.motif_coverage
                || self.expected_accuracy > other.expected_accuracy)
    }

    /// Dot-bracket rendering; crossing pairs fall back onto bracket
    /// layers.
    #[must_use]
    pub fn dot_bracket(&self) -> String {
        const OPENERS: [char; 4] = ['(', '[', '{', '<'];
        const CLOSERS: [char; 4] = [')', ']', '}', '>'];
        let mut out = vec!['.'; self.length];
        let mut layers: Vec<Vec<BasePair>> = Vec::new();
        for &(u, v) in &self.pairs {
            let layer = layers
                .iter()
                .position(|l| l.iter().all(|&(a, b)| !crosses((u, v), (a, b))))
                .unwrap_or_else(|| {
                    layers.push(Vec::new());
                    layers.len() - 1
                });
            layers[layer].push((u, v));
            let k = layer.min(OPENERS.len() - 1);
            out[u] = OPENERS[k];
            out[v] = CLOSERS[k];
        }
        out.into_iter().collect()
    }
}

fn crosses(a: BasePair, b: BasePair) -> bool {
    let ((i, j), (k, l)) = if a.0 < b.0 { (a, b) } else { (b, a) };
    k < j && j < l && i < k
}

impl fmt::Display for SecondaryStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty {
            return write!(f, "(empty structure)");
        }
        write!(
            f,
            "{} obj1={:.4} obj2={:.4}",
            self.dot_bracket(),
            self.motif_coverage,
            self.expected_accuracy
        )?;
        for m in &self.motifs {
            write!(f, " {}", m.position_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(obj1: f64, obj2: f64) -> SecondaryStructure {
        let mut s = SecondaryStructure::new(10);
        s.set_objective_scores(obj1, obj2);
        s
    }

    #[test]
    fn dominance_requires_a_strict_edge() {
        let a = structure(1.0, 1.0);
        let b = structure(1.0, 0.5);
        let c = structure(0.5, 2.0);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        // incomparable
        assert!(!a.dominates(&c));
        assert!(!c.dominates(&a));
        // equal structures do not dominate each other
        assert!(!a.dominates(&structure(1.0, 1.0)));
    }

    #[test]
    fn pairs_sort_into_position_order() {
        let mut s = SecondaryStructure::new(12);
        s.set_basepair(8, 3);
        s.set_basepair(0, 11);
        s.sort();
        assert_eq!(s.pairs(), [(0, 11), (3, 8)]);
    }

    #[test]
    fn dot_bracket_handles_nesting_and_crossings() {
        let mut s = SecondaryStructure::new(9);
        s.set_basepair(0, 8);
        s.set_basepair(1, 7);
        s.sort();
        assert_eq!(s.dot_bracket(), "((.....))");

        let mut pk = SecondaryStructure::new(10);
        pk.set_basepair(0, 5);
        pk.set_basepair(3, 8);
        pk.sort();
        assert_eq!(pk.dot_bracket(), "(..[.)..].");
    }

    #[test]
    fn empty_sentinel() {
        let s = SecondaryStructure::empty();
        assert!(s.is_empty_structure());
        assert!(!structure(0.0, 0.0).is_empty_structure());
    }
}
