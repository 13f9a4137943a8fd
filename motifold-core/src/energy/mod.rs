//! Nearest-neighbor thermodynamic parameters and the free-energy oracle.

mod oracle;
mod tables;

pub use oracle::EnergyModel;

use crate::sequence::Base;
use crate::types::{FreeEnergy, MotifoldError};

/// Scale factor from the embedded hundredths-of-kcal tables to kcal/mol.
const TABLE_SCALE: f64 = 100.0;

/// Immutable nearest-neighbor free-energy parameters at 37 degrees
/// Celsius.
///
/// Built once from the embedded tables; all stored values are in
/// kcal/mol. Pair-indexed axes run AU, UA, CG, GC, GU, UG; base-indexed
/// axes run A, C, G, U.
#[derive(Debug, Clone)]
pub struct EnergyParams {
    pub stack: [[FreeEnergy; 6]; 6],
    pub hairpin: [FreeEnergy; 30],
    pub bulge: [FreeEnergy; 30],
    pub interior: [FreeEnergy; 30],
    pub asymmetry_penalty: [FreeEnergy; 4],
    pub max_asymmetry: FreeEnergy,
    pub mismatch_hairpin: [[[FreeEnergy; 6]; 4]; 4],
    pub mismatch_interior: [[[FreeEnergy; 6]; 4]; 4],
    pub dangle5: [[FreeEnergy; 4]; 6],
    pub dangle3: [[FreeEnergy; 4]; 6],
    /// Multiloop closing penalty (a1).
    pub multiloop_closing: FreeEnergy,
    /// Multiloop per-branch penalty (a2).
    pub multiloop_paired: FreeEnergy,
    /// Multiloop per-unpaired-base penalty (a3).
    pub multiloop_unpaired: FreeEnergy,
    pub at_penalty: FreeEnergy,
    /// 1x1 interior loops, [outer pair][inner pair][left base][right base].
    pub int11: Box<[[[[FreeEnergy; 4]; 4]; 6]; 6]>,
    /// 1x2 interior loops, [outer pair][b][b][inner pair][b], matching the
    /// lookup order of the oracle.
    pub int21: Box<[[[[[FreeEnergy; 4]; 6]; 4]; 4]; 6]>,
    /// 2x2 interior loops, [outer pair][inner pair][b][b][b][b].
    pub int22: Box<[[[[[[FreeEnergy; 4]; 4]; 4]; 4]; 6]; 6]>,
    pub polyc_penalty: FreeEnergy,
    pub polyc_slope: FreeEnergy,
    pub polyc_int: FreeEnergy,
    /// Pseudoknot initiation penalty (b1).
    pub pk_penalty: FreeEnergy,
    /// Penalty per pair inside a pseudoknot (b2).
    pub pk_paired_penalty: FreeEnergy,
    /// Penalty per unpaired base inside a pseudoknot (b3).
    pub pk_unpaired_penalty: FreeEnergy,
    /// Initiation of a pseudoknot inside a multiloop (b1m).
    pub pk_multiloop_penalty: FreeEnergy,
    /// Initiation of a pseudoknot inside a pseudoknot (b1p).
    pub pk_pk_penalty: FreeEnergy,
    pub pk_band_penalty: FreeEnergy,
    pub pk_stack_span: FreeEnergy,
    pub pk_interior_span: FreeEnergy,
    /// Multiloop penalties inside pseudoknots, aliased to the nested
    /// multiloop penalties at load time.
    pub multiloop_closing_pk: FreeEnergy,
    pub multiloop_paired_pk: FreeEnergy,
    pub multiloop_unpaired_pk: FreeEnergy,
    pub intermolecular_initiation: FreeEnergy,
    pub salt_correction: FreeEnergy,
    /// Coefficient of the logarithmic loop-size extrapolation, 1.75 RT.
    pub loop_greater30: FreeEnergy,
    /// Bonus for hairpins closed by GGG.
    pub hairpin_ggg: FreeEnergy,
    /// Special triloop energies indexed by the encoded 5-mer.
    pub triloop: Box<[FreeEnergy; 1024]>,
    /// Special tetraloop energies indexed by the encoded 6-mer.
    pub tetraloop: Box<[FreeEnergy; 4096]>,
}

impl EnergyParams {
    /// Load the embedded default parameter set.
    #[must_use]
    pub fn default_turner() -> Self {
        let scale6x6 = |t: &[[i32; 6]; 6]| {
            let mut out = [[0.0; 6]; 6];
            for (row, src) in out.iter_mut().zip(t) {
                for (v, s) in row.iter_mut().zip(src) {
                    *v = f64::from(*s) / TABLE_SCALE;
                }
            }
            out
        };
        let scale30 = |t: &[i32; 30]| {
            let mut out = [0.0; 30];
            for (v, s) in out.iter_mut().zip(t) {
                *v = f64::from(*s) / TABLE_SCALE;
            }
            out
        };
        let scale_mismatch = |t: &[[[i32; 6]; 4]; 4]| {
            let mut out = [[[0.0; 6]; 4]; 4];
            for (plane, src_plane) in out.iter_mut().zip(t) {
                for (row, src_row) in plane.iter_mut().zip(src_plane) {
                    for (v, s) in row.iter_mut().zip(src_row) {
                        *v = f64::from(*s) / TABLE_SCALE;
                    }
                }
            }
            out
        };
        let scale_dangle = |t: &[[i32; 4]; 6]| {
            let mut out = [[0.0; 4]; 6];
            for (row, src) in out.iter_mut().zip(t) {
                for (v, s) in row.iter_mut().zip(src) {
                    *v = f64::from(*s) / TABLE_SCALE;
                }
            }
            out
        };

        let a1 = f64::from(tables::MULTILOOP_CLOSING) / TABLE_SCALE;
        let a2 = f64::from(tables::MULTILOOP_PAIRED) / TABLE_SCALE;
        let a3 = f64::from(tables::MULTILOOP_UNPAIRED) / TABLE_SCALE;

        let mut params = Self {
            stack: scale6x6(&tables::STACK),
            hairpin: scale30(&tables::HAIRPIN),
            bulge: scale30(&tables::BULGE),
            interior: scale30(&tables::INTERIOR),
            asymmetry_penalty: {
                let mut out = [0.0; 4];
                for (v, s) in out.iter_mut().zip(&tables::ASYMMETRY_PENALTY) {
                    *v = f64::from(*s) / TABLE_SCALE;
                }
                out
            },
            max_asymmetry: f64::from(tables::MAX_ASYMMETRY) / TABLE_SCALE,
            mismatch_hairpin: scale_mismatch(&tables::MISMATCH_HAIRPIN),
            mismatch_interior: scale_mismatch(&tables::MISMATCH_INTERIOR),
            dangle5: scale_dangle(&tables::DANGLE5),
            dangle3: scale_dangle(&tables::DANGLE3),
            multiloop_closing: a1,
            multiloop_paired: a2,
            multiloop_unpaired: a3,
            at_penalty: f64::from(tables::AT_PENALTY) / TABLE_SCALE,
            int11: Box::new([[[[0.0; 4]; 4]; 6]; 6]),
            int21: Box::new([[[[[0.0; 4]; 6]; 4]; 4]; 6]),
            int22: Box::new([[[[[[0.0; 4]; 4]; 4]; 4]; 6]; 6]),
            polyc_penalty: f64::from(tables::POLYC_PENALTY) / TABLE_SCALE,
            polyc_slope: f64::from(tables::POLYC_SLOPE) / TABLE_SCALE,
            polyc_int: f64::from(tables::POLYC_INT) / TABLE_SCALE,
            pk_penalty: f64::from(tables::PK_PENALTY) / TABLE_SCALE,
            pk_paired_penalty: f64::from(tables::PK_PAIRED_PENALTY) / TABLE_SCALE,
            pk_unpaired_penalty: f64::from(tables::PK_UNPAIRED_PENALTY) / TABLE_SCALE,
            pk_multiloop_penalty: f64::from(tables::PK_MULTILOOP_PENALTY) / TABLE_SCALE,
            pk_pk_penalty: f64::from(tables::PK_PK_PENALTY) / TABLE_SCALE,
            pk_band_penalty: 0.0,
            pk_stack_span: 1.0,
            pk_interior_span: 1.0,
            multiloop_closing_pk: a1,
            multiloop_paired_pk: a2,
            multiloop_unpaired_pk: a3,
            intermolecular_initiation: f64::from(tables::INTERMOLECULAR_INITIATION) / TABLE_SCALE,
            salt_correction: 0.0,
            loop_greater30: 1.079,
            hairpin_ggg: 0.0,
            triloop: Box::new([0.0; 1024]),
            tetraloop: Box::new([0.0; 4096]),
        };

        params.fill_small_interior_tables();
        params.fill_special_loops();
        params
    }

    /// Generate the 1x1, 1x2 and 2x2 interior-loop tables from the inner
    /// mismatch core, closing-pair adjustments and size extensions.
    fn fill_small_interior_tables(&mut self) {
        let core = |x: usize, y: usize| f64::from(tables::INT11_CORE[x][y]) / TABLE_SCALE;
        let closure = |p: usize| f64::from(tables::INT_CLOSURE[p]) / TABLE_SCALE;
        let ext21 = f64::from(tables::INT21_EXTENSION) / TABLE_SCALE;
        let ext22 = f64::from(tables::INT22_EXTENSION) / TABLE_SCALE;

        for p1 in 0..6 {
            for p2 in 0..6 {
                for x in 0..4 {
                    for y in 0..4 {
                        self.int11[p1][p2][x][y] = core(x, y) + closure(p1) + closure(p2);
                        for z in 0..4 {
                            for w in 0..4 {
                                self.int22[p1][p2][x][y][z][w] = core(x, y)
                                    + core(z, w)
                                    + closure(p1)
                                    + closure(p2)
                                    + ext22;
                            }
                        }
                    }
                }
            }
        }
        for p1 in 0..6 {
            for b1 in 0..4 {
                for b2 in 0..4 {
                    for p2 in 0..6 {
                        for b3 in 0..4 {
                            self.int21[p1][b1][b2][p2][b3] =
                                core(b2, b3) + closure(p1) + closure(p2) + ext21;
                        }
                    }
                }
            }
        }
    }

    /// Zero the special-loop tables, then overwrite the entry of every
    /// listed loop sequence.
    fn fill_special_loops(&mut self) {
        self.triloop.fill(0.0);
        self.tetraloop.fill(0.0);
        for (loop_seq, value) in tables::TRILOOPS {
            let idx = encode_loop(loop_seq).expect("embedded triloop table is well formed");
            self.triloop[idx] = f64::from(value) / TABLE_SCALE;
        }
        for (loop_seq, value) in tables::TETRALOOPS {
            let idx = encode_loop(loop_seq).expect("embedded tetraloop table is well formed");
            self.tetraloop[idx] = f64::from(value) / TABLE_SCALE;
        }
    }

    /// Apply scalar overrides from a `name value` text, one per line,
    /// `#`-comments and blank lines ignored. Values are in kcal/mol.
    ///
    /// # Errors
    ///
    /// Returns [`MotifoldError::EnergyParams`] on malformed lines or
    /// unknown parameter names.
    pub fn apply_overrides(&mut self, text: &str) -> Result<(), MotifoldError> {
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                return Err(MotifoldError::EnergyParams(format!(
                    "line {}: expected `name value`, got {line:?}",
                    lineno + 1
                )));
            };
            let value: f64 = value.parse().map_err(|e| {
                MotifoldError::EnergyParams(format!("line {}: bad value {value:?}: {e}", lineno + 1))
            })?;
            let slot = match name {
                "multiloop_closing" => &mut self.multiloop_closing,
                "multiloop_paired" => &mut self.multiloop_paired,
                "multiloop_unpaired" => &mut self.multiloop_unpaired,
                "at_penalty" => &mut self.at_penalty,
                "max_asymmetry" => &mut self.max_asymmetry,
                "salt_correction" => &mut self.salt_correction,
                "loop_greater30" => &mut self.loop_greater30,
                "hairpin_ggg" => &mut self.hairpin_ggg,
                "polyc_penalty" => &mut self.polyc_penalty,
                "polyc_slope" => &mut self.polyc_slope,
                "polyc_int" => &mut self.polyc_int,
                "pk_penalty" => &mut self.pk_penalty,
                "pk_paired_penalty" => &mut self.pk_paired_penalty,
                "pk_unpaired_penalty" => &mut self.pk_unpaired_penalty,
                "pk_multiloop_penalty" => &mut self.pk_multiloop_penalty,
                "pk_pk_penalty" => &mut self.pk_pk_penalty,
                "pk_band_penalty" => &mut self.pk_band_penalty,
                "pk_stack_span" => &mut self.pk_stack_span,
                "pk_interior_span" => &mut self.pk_interior_span,
                "intermolecular_initiation" => &mut self.intermolecular_initiation,
                other => {
                    return Err(MotifoldError::EnergyParams(format!(
                        "line {}: unknown parameter {other:?}",
                        lineno + 1
                    )))
                }
            };
            *slot = value;
        }
        Ok(())
    }
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self::default_turner()
    }
}

/// Encode a loop sequence as an index into the special-loop tables
/// (base-4, first base most significant). Returns `None` for sequences
/// containing anything but A, C, G, U.
pub(crate) fn encode_loop(seq: &str) -> Option<usize> {
    let mut idx = 0;
    for c in seq.chars() {
        let base = Base::from_char(c);
        if !base.is_concrete() {
            return None;
        }
        idx = idx * 4 + base.table_index();
    }
    Some(idx)
}

/// Encode a slice of bases the same way as [`encode_loop`]; unknown bases
/// fall back onto row 0 like every other table lookup.
pub(crate) fn encode_bases(bases: &[Base]) -> usize {
    bases.iter().fold(0, |idx, b| idx * 4 + b.table_index())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_scaled_to_kcal() {
        let p = EnergyParams::default_turner();
        assert!((p.stack[2][2] - (-3.3)).abs() < 1e-9);
        assert!((p.hairpin[2] - 5.7).abs() < 1e-9);
        assert!((p.multiloop_closing - 3.4).abs() < 1e-9);
    }

    #[test]
    fn pk_multiloop_penalties_alias_nested_ones() {
        let p = EnergyParams::default_turner();
        assert_eq!(p.multiloop_closing_pk, p.multiloop_closing);
        assert_eq!(p.multiloop_paired_pk, p.multiloop_paired);
        assert_eq!(p.multiloop_unpaired_pk, p.multiloop_unpaired);
    }

    #[test]
    fn special_loops_overwrite_zeroed_tables() {
        let p = EnergyParams::default_turner();
        let cuucgg = encode_loop("CUUCGG").unwrap();
        assert!((p.tetraloop[cuucgg] - (-3.0)).abs() < 1e-9);
        let caacg = encode_loop("CAACG").unwrap();
        assert!((p.triloop[caacg] - 6.8).abs() < 1e-9);
        // everything not listed stays zero
        let aaaaaa = encode_loop("AAAAAA").unwrap();
        assert_eq!(p.tetraloop[aaaaaa], 0.0);
    }

    #[test]
    fn small_interior_tables_carry_closure_adjustments() {
        let p = EnergyParams::default_turner();
        // CG/GC closures pay no helix-end penalty
        let cg = 2;
        let au = 0;
        assert!(p.int11[au][au][0][0] > p.int11[cg][cg][0][0]);
        assert!(p.int22[cg][cg][0][0][0][0] > p.int11[cg][cg][0][0]);
    }

    #[test]
    fn overrides_parse_and_reject() {
        let mut p = EnergyParams::default_turner();
        p.apply_overrides("# comment\nat_penalty 0.75\n\npk_penalty 8.0\n")
            .unwrap();
        assert!((p.at_penalty - 0.75).abs() < 1e-9);
        assert!((p.pk_penalty - 8.0).abs() < 1e-9);

        assert!(matches!(
            p.apply_overrides("no_such_param 1.0"),
            Err(MotifoldError::EnergyParams(_))
        ));
        assert!(matches!(
            p.apply_overrides("at_penalty abc"),
            Err(MotifoldError::EnergyParams(_))
        ));
    }
}
