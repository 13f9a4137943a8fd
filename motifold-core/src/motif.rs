use std::fmt;

/// Catalog a motif was drawn from.
///
/// The three catalogs use different identifier schemes; the variant data
/// carries the native identifier and [`MotifSource::identifier`] renders a
/// uniform one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotifSource {
    /// RNA 3D Motif catalog entry, identified by PDB code.
    Rna3dMotif { pdb_id: String },
    /// RNA 3D Motif Atlas entry.
    RnaMotifAtlas { atlas_id: String },
    /// CaRNAval recurrent interaction network.
    Carnaval { rin_id: u32 },
}

impl MotifSource {
    /// Source-qualified identifier of the motif.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            Self::Rna3dMotif { pdb_id } => pdb_id.clone(),
            Self::RnaMotifAtlas { atlas_id } => atlas_id.clone(),
            Self::Carnaval { rin_id } => format!("RIN{rin_id}"),
        }
    }
}

impl fmt::Display for MotifSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// One sequence-contiguous stretch of a motif, placed at concrete
/// positions: the half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// First sequence position covered.
    pub start: usize,
    /// One past the last covered position.
    pub end: usize,
    /// Consensus residue count of the component. Defaults to the interval
    /// length; catalogs with flexible components may override it.
    pub k: usize,
}

impl Component {
    /// Component covering `[start, end)` with consensus length `end - start`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            k: end.saturating_sub(start),
        }
    }

    /// Override the consensus residue count.
    #[must_use]
    pub fn with_consensus_length(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Last covered position.
    #[must_use]
    pub fn last(&self) -> usize {
        self.end - 1
    }

    /// Whether `u` lies inside the covered interval.
    #[must_use]
    pub fn contains(&self, u: usize) -> bool {
        (self.start..self.end).contains(&u)
    }

    /// Whether this component overlaps another.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A structural motif resolved to concrete positions on one sequence.
///
/// The same catalog motif may appear several times at different positions;
/// each placement is a distinct insertion site.
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    /// Originating catalog and native identifier.
    pub source: MotifSource,
    /// Components in sequence order.
    pub components: Vec<Component>,
    /// Insertion score, higher preferred.
    pub score: f64,
}

impl Motif {
    /// New insertion site.
    #[must_use]
    pub fn new(source: MotifSource, components: Vec<Component>, score: f64) -> Self {
        Self {
            source,
            components,
            score,
        }
    }

    /// Source-qualified identifier.
    #[must_use]
    pub fn identifier(&self) -> String {
        self.source.identifier()
    }

    /// Render the insertion positions, e.g. `RIN120 ( 3-7 12-15 )`.
    #[must_use]
    pub fn position_string(&self) -> String {
        let mut s = format!("{} (", self.identifier());
        for c in &self.components {
            s.push_str(&format!(" {}-{}", c.start, c.end));
        }
        s.push_str(" )");
        s
    }

    /// Check the insertion-site invariants against a sequence of length
    /// `n`: at least one component, every component non-empty with k >= 1
    /// and inside `[0, n)`, components ordered and non-overlapping.
    pub(crate) fn validate(&self, n: usize) -> Result<(), String> {
        if self.components.is_empty() {
            return Err(format!("{} has no components", self.identifier()));
        }
        for c in &self.components {
            if c.start >= c.end || c.end > n {
                return Err(format!(
                    "{} component {}-{} is outside [0, {n})",
                    self.identifier(),
                    c.start,
                    c.end
                ));
            }
            if c.k == 0 {
                return Err(format!(
                    "{} component {}-{} has consensus length 0",
                    self.identifier(),
                    c.start,
                    c.end
                ));
            }
        }
        for pair in self.components.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(format!(
                    "{} components overlap or are out of order",
                    self.identifier()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_source_qualified() {
        let m = MotifSource::Carnaval { rin_id: 120 };
        assert_eq!(m.identifier(), "RIN120");
        let m = MotifSource::RnaMotifAtlas {
            atlas_id: "IL_85647.3".into(),
        };
        assert_eq!(m.identifier(), "IL_85647.3");
        let m = MotifSource::Rna3dMotif {
            pdb_id: "1Y26".into(),
        };
        assert_eq!(m.identifier(), "1Y26");
    }

    #[test]
    fn component_geometry() {
        let c = Component::new(3, 7);
        assert_eq!(c.k, 4);
        assert_eq!(c.with_consensus_length(6).k, 6);
        assert_eq!(c.last(), 6);
        assert!(c.contains(3));
        assert!(c.contains(6));
        assert!(!c.contains(7));
        assert!(c.overlaps(&Component::new(6, 9)));
        assert!(!c.overlaps(&Component::new(7, 9)));
    }

    #[test]
    fn validation_rejects_bad_sites() {
        let src = MotifSource::Carnaval { rin_id: 1 };
        let empty = Motif::new(src.clone(), vec![], 1.0);
        assert!(empty.validate(20).is_err());

        let out_of_range = Motif::new(src.clone(), vec![Component::new(15, 25)], 1.0);
        assert!(out_of_range.validate(20).is_err());

        let overlapping = Motif::new(
            src.clone(),
            vec![Component::new(2, 6), Component::new(5, 9)],
            1.0,
        );
        assert!(overlapping.validate(20).is_err());

        let ok = Motif::new(
            src,
            vec![Component::new(2, 6), Component::new(10, 14)],
            1.0,
        );
        assert!(ok.validate(20).is_ok());
    }
}
