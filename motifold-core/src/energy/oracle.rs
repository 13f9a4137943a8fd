use crate::constants::MAX_TABULATED_LOOP;
use crate::energy::{encode_bases, EnergyParams};
use crate::sequence::{Base, PairType, RnaSequence};
use crate::types::FreeEnergy;

/// Free-energy oracle over one sequence.
///
/// Pure lookups into the parameter tables; every method that takes a pair
/// (i, j) requires the caller to have established `admissible(i, j)` and a
/// real pair type.
#[derive(Debug, Clone, Copy)]
pub struct EnergyModel<'a> {
    seq: &'a RnaSequence,
    params: &'a EnergyParams,
}

impl<'a> EnergyModel<'a> {
    #[must_use]
    pub fn new(seq: &'a RnaSequence, params: &'a EnergyParams) -> Self {
        Self { seq, params }
    }

    #[must_use]
    pub fn sequence(&self) -> &'a RnaSequence {
        self.seq
    }

    #[must_use]
    pub fn params(&self) -> &'a EnergyParams {
        self.params
    }

    #[inline]
    fn pair_index(&self, i: usize, j: usize) -> usize {
        let pt = self.seq.pair_type(i, j);
        debug_assert!(pt.can_pair(), "energy lookup on a non-pair ({i}, {j})");
        pt.table_index()
    }

    #[inline]
    fn base_index(&self, i: usize) -> usize {
        self.seq.base(i).table_index()
    }

    /// Free energy of the hairpin loop closed by (i, j).
    #[must_use]
    pub fn hairpin(&self, i: usize, j: usize) -> FreeEnergy {
        let size = j - i - 1;
        debug_assert!(size >= 3);
        debug_assert!(self.seq.admissible(i, j));
        let p = self.params;

        let polyc = (i + 1..j).all(|k| self.seq.base(k) == Base::C);
        let mut e = self.loop_of_size(&p.hairpin, size);

        if size == 3 {
            e += self.terminal_au_penalty(i, j);
            e += p.triloop[encode_bases(&[
                self.seq.base(i),
                self.seq.base(i + 1),
                self.seq.base(i + 2),
                self.seq.base(j - 1),
                self.seq.base(j),
            ])];
            if polyc {
                e += p.polyc_penalty;
            }
            if self.seq.base(i + 1) == Base::G
                && self.seq.base(i + 2) == Base::G
                && self.seq.base(j - 1) == Base::G
            {
                e += p.hairpin_ggg;
            }
        } else {
            if size == 4 {
                e += p.tetraloop[encode_bases(&[
                    self.seq.base(i),
                    self.seq.base(i + 1),
                    self.seq.base(i + 2),
                    self.seq.base(j - 2),
                    self.seq.base(j - 1),
                    self.seq.base(j),
                ])];
            }
            e += p.mismatch_hairpin[self.base_index(i + 1)][self.base_index(j - 1)]
                [self.pair_index(i, j)];
            if polyc {
                e += p.polyc_slope * size as f64 + p.polyc_int;
            }
        }
        e
    }

    /// Free energy of the internal loop closed by the outer pair (i, j)
    /// and the inner pair (h, m): stacking when both sides are empty,
    /// bulge when one side is empty, tabulated or asymmetry-scored
    /// interior loop otherwise. With `pk` the result is scaled by the
    /// pseudoknot span factors.
    #[must_use]
    pub fn internal_loop(&self, i: usize, h: usize, m: usize, j: usize, pk: bool) -> FreeEnergy {
        let l1 = h - i - 1;
        let l2 = j - m - 1;
        let size = l1 + l2;
        let p = self.params;

        if size == 0 {
            let stack = p.stack[self.pair_index(i, j)][self.pair_index(h, m)];
            return stack * if pk { p.pk_stack_span } else { 1.0 };
        }

        let mut e = 0.0;
        if l1 == 0 || l2 == 0 {
            e += self.loop_of_size(&p.bulge, size);
            if size == 1 {
                // single-base bulge folds as a stacked region
                e += p.stack[self.pair_index(i, j)][self.pair_index(h, m)];
                e -= p.salt_correction;
            } else {
                e += self.terminal_au_penalty(i, j);
                e += self.terminal_au_penalty(h, m);
            }
        } else {
            let asymmetry = l1.abs_diff(l2);
            if asymmetry > 1 || size > 4 {
                e += self.interior_asymmetry(l1, l2);
                if l1 > 1 && l2 > 1 {
                    e += self.interior_mismatch(m, h, m + 1, h - 1);
                    e += self.interior_mismatch(i, j, i + 1, j - 1);
                } else {
                    // one side presents a single base only
                    e += self.interior_mismatch_closing(m, h);
                    e += self.interior_mismatch_closing(i, j);
                }
            } else {
                e += match (l1, l2) {
                    (1, 1) => p.int11[self.pair_index(i, j)][self.pair_index(h, m)]
                        [self.base_index(i + 1)][self.base_index(j - 1)],
                    (2, 2) => p.int22[self.pair_index(i, j)][self.pair_index(h, m)]
                        [self.base_index(i + 1)][self.base_index(j - 1)]
                        [self.base_index(i + 2)][self.base_index(j - 2)],
                    (1, 2) => p.int21[self.pair_index(i, j)][self.base_index(j - 2)]
                        [self.base_index(i + 1)][self.pair_index(h, m)][self.base_index(j - 1)],
                    (2, 1) => p.int21[self.pair_index(m, h)][self.base_index(i + 1)]
                        [self.base_index(j - 1)][self.pair_index(j, i)][self.base_index(i + 2)],
                    _ => unreachable!("interior loop with sides {l1}x{l2} is tabulated"),
                };
            }
        }
        e * if pk { p.pk_interior_span } else { 1.0 }
    }

    /// Length-and-asymmetry contribution of an interior loop with side
    /// lengths l1 and l2 (both >= 1).
    #[must_use]
    pub fn interior_asymmetry(&self, l1: usize, l2: usize) -> FreeEnergy {
        let p = self.params;
        let idx = l1.min(l2).min(4) - 1;
        let penalty = l1.abs_diff(l2) as f64 * p.asymmetry_penalty[idx];
        self.loop_entropy(l1 + l2) + p.max_asymmetry.min(penalty)
    }

    /// Interior-loop length term for total size `l` (>= 2).
    #[must_use]
    pub fn loop_entropy(&self, l: usize) -> FreeEnergy {
        self.loop_of_size(&self.params.interior, l)
    }

    /// Penalty for a terminal AU or UA pair.
    #[must_use]
    pub fn terminal_au_penalty(&self, i: usize, j: usize) -> FreeEnergy {
        match self.seq.pair_type(i, j) {
            PairType::Au | PairType::Ua => self.params.at_penalty,
            _ => 0.0,
        }
    }

    /// Interior mismatch of the pair (i, j) with inner bases at k and l.
    #[must_use]
    pub fn interior_mismatch(&self, i: usize, j: usize, k: usize, l: usize) -> FreeEnergy {
        self.params.mismatch_interior[self.base_index(k)][self.base_index(l)]
            [self.pair_index(i, j)]
    }

    /// Interior mismatch of the pair (i, j) when a loop side is too short
    /// to present inner bases; reads the N-collapsed first table row.
    #[must_use]
    pub fn interior_mismatch_closing(&self, i: usize, j: usize) -> FreeEnergy {
        self.params.mismatch_interior[Base::N.table_index()][Base::N.table_index()]
            [self.pair_index(i, j)]
    }

    /// Tabulated value for sizes up to 30, logarithmic extrapolation
    /// beyond.
    fn loop_of_size(&self, table: &[FreeEnergy; 30], size: usize) -> FreeEnergy {
        if size <= MAX_TABULATED_LOOP {
            table[size - 1]
        } else {
            table[MAX_TABULATED_LOOP - 1]
                + self.params.loop_greater30 * (size as f64 / MAX_TABULATED_LOOP as f64).ln()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_over(seq: &str) -> (RnaSequence, EnergyParams) {
        (
            RnaSequence::new("test", seq).unwrap(),
            EnergyParams::default_turner(),
        )
    }

    #[test]
    fn stacking_is_the_zero_size_internal_loop() {
        let (seq, params) = model_over("GGGAAACCCC");
        let em = EnergyModel::new(&seq, &params);
        // (1, 8) directly inside (0, 9): l1 = l2 = 0
        let e = em.internal_loop(0, 1, 8, 9, false);
        assert!((e - params.stack[3][3]).abs() < 1e-9);
        // pseudoknot spans scale the stack
        let scaled = em.internal_loop(0, 1, 8, 9, true);
        assert!((scaled - e * params.pk_stack_span).abs() < 1e-9);
    }

    #[test]
    fn single_bulge_adds_stacking_minus_salt() {
        let (seq, params) = model_over("GAGGAAACCCC");
        let em = EnergyModel::new(&seq, &params);
        // outer (0, 10) G-C, inner (2, 9) G-C, bulged base at 1
        let e = em.internal_loop(0, 2, 9, 10, false);
        let expected = params.bulge[0] + params.stack[3][3] - params.salt_correction;
        assert!((e - expected).abs() < 1e-9);
    }

    #[test]
    fn larger_bulge_pays_terminal_penalties() {
        let (seq, params) = model_over("AAAGGAAACCCU");
        let em = EnergyModel::new(&seq, &params);
        // outer (0, 11) A-U, inner (4, 10) G-C, bulge of 3 on the left
        let e = em.internal_loop(0, 4, 10, 11, false);
        let expected = params.bulge[2] + params.at_penalty;
        assert!((e - expected).abs() < 1e-9);
    }

    #[test]
    fn tabulated_one_by_one_loop() {
        let (seq, params) = model_over("GAGAAAAACAC");
        let em = EnergyModel::new(&seq, &params);
        // outer (0, 10) G-C, inner (2, 8) G-C, one free base each side
        let e = em.internal_loop(0, 2, 8, 10, false);
        let a = Base::A.table_index();
        assert!((e - params.int11[3][3][a][a]).abs() < 1e-9);
    }

    #[test]
    fn asymmetry_formula() {
        let (seq, params) = model_over("GGGGAAAACCCC");
        let em = EnergyModel::new(&seq, &params);
        let e = em.interior_asymmetry(1, 4);
        let expected =
            em.loop_entropy(5) + (3.0 * params.asymmetry_penalty[0]).min(params.max_asymmetry);
        assert!((e - expected).abs() < 1e-9);
    }

    #[test]
    fn hairpin_length_extrapolates_logarithmically() {
        let long = "G".repeat(1) + &"A".repeat(40) + "C" + &"GCGCGC".repeat(2);
        let (seq, params) = model_over(&long);
        let em = EnergyModel::new(&seq, &params);
        let e = em.hairpin(0, 41);
        let expected_base = params.hairpin[29] + params.loop_greater30 * (40.0f64 / 30.0).ln();
        // mismatch term added on top of the length term
        assert!(e > expected_base - 3.0 && e < expected_base + 3.0);
    }

    #[test]
    fn triloop_terminal_au_penalty_applies() {
        let (seq, params) = model_over("UAAAAAAAAA");
        let em = EnergyModel::new(&seq, &params);
        // hairpin (0, 4): U-A closing pair, loop AAA
        let e = em.hairpin(0, 4);
        assert!((e - (params.hairpin[2] + params.at_penalty)).abs() < 1e-9);
    }

    #[test]
    fn polyc_triloop_pays_the_penalty() {
        let (seq, params) = model_over("GCCCCAAAAA");
        let em = EnergyModel::new(&seq, &params);
        // hairpin (0, 4) G-C with loop CCC
        let e = em.hairpin(0, 4);
        assert!((e - (params.hairpin[2] + params.polyc_penalty)).abs() < 1e-9);
    }
}
