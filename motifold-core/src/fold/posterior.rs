//! Posterior base-pair probabilities by back-recursion.
//!
//! Probability mass starts at the full strand, P(0, n-1) = 1, and is
//! distributed outside-in over the rightmost-pair decompositions of Q, Qm
//! and Qb. Every division is guarded: a zero partition cell means the
//! corresponding path carries no mass and the contribution is skipped.

use crate::constants::RT;
use crate::energy::EnergyModel;
use crate::fold::matrices::{square, Mat};
use crate::fold::PartitionSet;

/// Distribute P(i, j) into the enclosed cells and collect Pb.
#[must_use]
pub fn posterior_no_pk(em: &EnergyModel, parts: &PartitionSet) -> Mat {
    let seq = em.sequence();
    let n = seq.len();
    let params = em.params();
    let (a1, a2, a3) = (
        params.multiloop_closing,
        params.multiloop_paired,
        params.multiloop_unpaired,
    );
    let (q, qb, qm) = (&parts.q, &parts.qb, &parts.qm);

    let mut p = square(n);
    let mut pm = square(n);
    let mut pb = square(n);

    // recursing into the entire strand is certain
    p[[0, n - 1]] = 1.0;

    let ni = n as isize;
    for l in (1..=ni).rev() {
        for i in 0..ni - l + 1 {
            let j = i + l - 1;
            let (iu, ju) = (i as usize, j as usize);
            let p_ij = p[[iu, ju]];
            let pm_ij = pm[[iu, ju]];
            let q_ij = q[[iu, ju]];
            let qm_ij = qm[[iu, ju]];

            // P and Pm distribute over rightmost pairs (d, e)
            for d in i..=j - 4 {
                for e in d + 4..=j {
                    let (du, eu) = (d as usize, e as usize);
                    let qb_de = qb[[du, eu]];
                    if qb_de == 0.0 {
                        continue;
                    }
                    if q_ij > 0.0 {
                        let dp = if d > i {
                            p_ij * q[[iu, du - 1]] * qb_de / q_ij
                        } else {
                            p_ij * qb_de / q_ij
                        };
                        if d > i {
                            p[[iu, du - 1]] += dp;
                        }
                        pb[[du, eu]] += dp;
                        debug_assert!(!dp.is_nan());
                    }
                    if qm_ij > 0.0 {
                        pb[[du, eu]] += pm_ij
                            * (-(a2 + a3 * ((d - i) + (j - e)) as f64) / RT).exp()
                            * qb_de
                            / qm_ij;
                        let weight = (-(a2 + a3 * (j - e) as f64) / RT).exp();
                        let dp = if d > i {
                            pm_ij * qm[[iu, du - 1]] * qb_de * weight / qm_ij
                        } else {
                            pm_ij * qb_de * weight / qm_ij
                        };
                        if d > i {
                            pm[[iu, du - 1]] += dp;
                        }
                        pb[[du, eu]] += dp;
                        debug_assert!(!dp.is_nan());
                    }
                }
            }

            // Pb distributes into interior pairs and enclosed multiloops;
            // read after the loop above so mass routed to (i, j) by its own
            // rightmost-pair terms is included
            let pb_ij = pb[[iu, ju]];
            let qb_ij = qb[[iu, ju]];
            if qb_ij > 0.0 && pb_ij > 0.0 {
                for d in i + 1..=j - 5 {
                    for e in d + 4..=j - 1 {
                        let (du, eu) = (d as usize, e as usize);
                        let qb_de = qb[[du, eu]];
                        if qb_de == 0.0 {
                            continue;
                        }
                        pb[[du, eu]] += pb_ij
                            * qb_de
                            * (-em.internal_loop(iu, du, eu, ju, false) / RT).exp()
                            / qb_ij;
                        let dp = pb_ij
                            * qm[[iu + 1, du - 1]]
                            * qb_de
                            * (-(a1 + 2.0 * a2 + (j - e - 1) as f64 * a3) / RT).exp()
                            / qb_ij;
                        pm[[iu + 1, du - 1]] += dp;
                        pb[[du, eu]] += dp;
                        debug_assert!(!dp.is_nan());
                    }
                }
            }
        }
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyParams;
    use crate::fold::partition::partition_no_pk_on4;
    use crate::sequence::RnaSequence;

    fn pb_of(raw: &str) -> (RnaSequence, Mat) {
        let seq = RnaSequence::new("t", raw).unwrap();
        let params = EnergyParams::default_turner();
        let em = EnergyModel::new(&seq, &params);
        let parts = partition_no_pk_on4(&em);
        let pb = posterior_no_pk(&em, &parts);
        (seq, pb)
    }

    #[test]
    fn probabilities_are_bounded() {
        let (seq, pb) = pb_of("GGGGAAAACCCCAAGGGAAACCC");
        let n = seq.len();
        for i in 0..n {
            for j in i + 1..n {
                assert!(
                    (0.0..=1.0 + 1e-9).contains(&pb[[i, j]]),
                    "Pb({i},{j}) = {}",
                    pb[[i, j]]
                );
            }
        }
    }

    #[test]
    fn row_sums_respect_single_pairing() {
        let (seq, pb) = pb_of("GGGGAAAACCCCAAGGGAAACCC");
        let n = seq.len();
        for i in 0..n {
            let mut total = 0.0;
            for j in i + 1..n {
                total += pb[[i, j]];
            }
            for k in 0..i {
                total += pb[[k, i]];
            }
            assert!(total <= 1.0 + 1e-6, "base {i} pairs with total {total}");
        }
    }

    #[test]
    fn hairpin_closing_pair_dominates() {
        // 30-nt stem-loop with a unique register: the closing pair of the
        // stem must dwarf every candidate outside the native stem
        let (seq, pb) = pb_of("GCGAUGGUCCAACAAACAAAGGACCAUCGC");
        let n = seq.len();
        let closing = pb[[0, n - 1]];
        assert!(closing > 0.2, "closing pair probability {closing}");
        let mut best_other = 0.0f64;
        for i in 0..n {
            for j in i + 1..n {
                if j != n - 1 - i {
                    best_other = best_other.max(pb[[i, j]]);
                }
            }
        }
        assert!(
            closing >= 5.0 * best_other,
            "closing {closing} vs best other {best_other}"
        );
    }

    #[test]
    fn unpairable_cells_carry_no_mass() {
        let (seq, pb) = pb_of("GGGAAACCC");
        let n = seq.len();
        for i in 0..n {
            for j in i + 1..n {
                if !seq.pairable(i, j) {
                    assert_eq!(pb[[i, j]], 0.0);
                }
            }
        }
    }
}
