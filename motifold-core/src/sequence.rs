use std::fmt;

use crate::constants::{MIN_PAIR_SPAN, MIN_SEQUENCE_LENGTH, MIN_TAIL_SPAN};
use crate::types::MotifoldError;

/// A single RNA base.
///
/// Thymine is normalized to uracil on sequence entry; every character
/// outside the RNA alphabet becomes [`Base::N`], which never pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// Adenine
    A,
    /// Cytosine
    C,
    /// Guanine
    G,
    /// Uracil
    U,
    /// Unknown or ambiguous base
    N,
}

impl Base {
    /// Classify a raw character. `T`/`t` is treated as uracil; anything
    /// outside the alphabet maps to [`Base::N`].
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'A' => Self::A,
            'C' => Self::C,
            'G' => Self::G,
            'U' | 'T' => Self::U,
            _ => Self::N,
        }
    }

    /// Index into the 4-row energy tables.
    ///
    /// Unknown bases collapse onto row 0, mirroring the reference
    /// parameterization, which stores its "no inner base" mismatch entries
    /// in the first row.
    #[must_use]
    pub const fn table_index(self) -> usize {
        match self {
            Self::A | Self::N => 0,
            Self::C => 1,
            Self::G => 2,
            Self::U => 3,
        }
    }

    /// Whether this is a concrete (non-N) base.
    #[must_use]
    pub const fn is_concrete(self) -> bool {
        !matches!(self, Self::N)
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::U => 'U',
            Self::N => 'N',
        };
        write!(f, "{c}")
    }
}

/// Type of an ordered base pair, derived from a fixed 5x5 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairType {
    Au,
    Ua,
    Cg,
    Gc,
    Gu,
    Ug,
    /// Any combination that cannot pair, including everything with N.
    Other,
}

impl PairType {
    /// Derive the pair type of the ordered pair (left, right).
    #[must_use]
    pub const fn of(left: Base, right: Base) -> Self {
        match (left, right) {
            (Base::A, Base::U) => Self::Au,
            (Base::U, Base::A) => Self::Ua,
            (Base::C, Base::G) => Self::Cg,
            (Base::G, Base::C) => Self::Gc,
            (Base::G, Base::U) => Self::Gu,
            (Base::U, Base::G) => Self::Ug,
            _ => Self::Other,
        }
    }

    /// Index into the 6-column energy tables.
    ///
    /// Only meaningful for real pair types; callers guarantee the pair is
    /// not [`PairType::Other`] before looking up energies.
    #[must_use]
    pub const fn table_index(self) -> usize {
        match self {
            Self::Au => 0,
            Self::Ua => 1,
            Self::Cg => 2,
            Self::Gc => 3,
            Self::Gu => 4,
            Self::Ug | Self::Other => 5,
        }
    }

    /// Whether the pair is a strict Watson-Crick pair (wobble excluded).
    #[must_use]
    pub const fn is_watson_crick(self) -> bool {
        matches!(self, Self::Au | Self::Ua | Self::Cg | Self::Gc)
    }

    /// Whether the two bases can pair at all.
    #[must_use]
    pub const fn can_pair(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// An RNA sequence normalized for folding.
///
/// Normalization folds case, replaces thymine with uracil, and annotates
/// unknown characters as N. The flags recording those substitutions are
/// kept so that drivers can warn the user.
#[derive(Debug, Clone)]
pub struct RnaSequence {
    name: String,
    bases: Vec<Base>,
    contains_thymine: bool,
    unknown_chars: Vec<char>,
}

impl RnaSequence {
    /// Normalize and encode a raw sequence.
    ///
    /// # Errors
    ///
    /// Returns [`MotifoldError::InvalidSequence`] when the sequence is
    /// shorter than the minimum foldable length or contains no concrete
    /// base.
    pub fn new(name: impl Into<String>, raw: &str) -> Result<Self, MotifoldError> {
        let name = name.into();
        let mut bases = Vec::with_capacity(raw.len());
        let mut contains_thymine = false;
        let mut unknown_chars = Vec::new();
        for c in raw.chars() {
            if matches!(c, 'T' | 't') {
                contains_thymine = true;
            }
            let base = Base::from_char(c);
            if base == Base::N {
                unknown_chars.push(c);
            }
            bases.push(base);
        }
        if bases.len() < MIN_SEQUENCE_LENGTH {
            return Err(MotifoldError::InvalidSequence(format!(
                "sequence {name:?} has length {}, minimum is {MIN_SEQUENCE_LENGTH}",
                bases.len()
            )));
        }
        if bases.iter().all(|b| !b.is_concrete()) {
            return Err(MotifoldError::InvalidSequence(format!(
                "sequence {name:?} contains no recognizable base"
            )));
        }
        Ok(Self {
            name,
            bases,
            contains_thymine,
            unknown_chars,
        })
    }

    /// Sequence identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True for the (never constructible) empty sequence; kept for API
    /// symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Base at position `i`.
    #[must_use]
    pub fn base(&self, i: usize) -> Base {
        self.bases[i]
    }

    /// All bases in order.
    #[must_use]
    pub fn bases(&self) -> &[Base] {
        &self.bases
    }

    /// Pair type of the ordered pair (i, j).
    #[must_use]
    pub fn pair_type(&self, i: usize, j: usize) -> PairType {
        PairType::of(self.bases[i], self.bases[j])
    }

    /// Whether the span (i, j) may host a pair at all: the pair must
    /// enclose at least three bases and may not open in the 3' tail.
    /// Argument order is irrelevant.
    #[must_use]
    pub fn admissible(&self, u: usize, v: usize) -> bool {
        let (a, b) = if u < v { (u, v) } else { (v, u) };
        b < self.len() && b - a >= MIN_PAIR_SPAN && a + MIN_TAIL_SPAN <= self.len()
    }

    /// Admissible and chemically able to pair.
    #[must_use]
    pub fn pairable(&self, i: usize, j: usize) -> bool {
        self.admissible(i, j) && self.pair_type(i, j).can_pair()
    }

    /// Admissible and joined by a strict Watson-Crick pair.
    #[must_use]
    pub fn watson_crick(&self, i: usize, j: usize) -> bool {
        self.admissible(i, j) && self.pair_type(i, j).is_watson_crick()
    }

    /// Whether thymines were replaced by uracils during normalization.
    #[must_use]
    pub fn contains_thymine(&self) -> bool {
        self.contains_thymine
    }

    /// The unknown characters encountered during normalization, in input
    /// order.
    #[must_use]
    pub fn unknown_chars(&self) -> &[char] {
        &self.unknown_chars
    }
}

impl fmt::Display for RnaSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.bases {
            write!(f, "{b}")?;
        }
        Ok(())
    }
}
