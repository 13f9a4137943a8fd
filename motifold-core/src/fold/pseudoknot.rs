//! Pseudoknotted partition functions after Dirks & Pierce (2003).
//!
//! Alongside Q, Qb and Qm this computes the pseudoknot partition Qp, the
//! gap-region partition Qz and the rank-4 gap tensors Qg, Qgl, Qgr, Qgls
//! and Qgrs indexed (i, d, e, j). Gap-spanning structures are assembled
//! from Qgl and Qgr products and enter Q, Qb, Qm and Qz under the
//! pseudoknot penalties b1, b1m, b1p, b2 and b3.
//!
//! The recurrence proceeds over subsequence lengths; per-length work is
//! kept serial because the gap tensors couple cells of the same length
//! through every intermediate index.

use crate::constants::RT;
use crate::energy::EnergyModel;
use crate::fold::matrices::{square, tensor};
use crate::fold::PkPartitionSet;

/// Compute the pseudoknotted partition functions.
///
/// Quartic memory in the sequence length; intended for short sequences.
#[must_use]
pub fn partition_pk(em: &EnergyModel) -> PkPartitionSet {
    let seq = em.sequence();
    let n = seq.len();
    let p = em.params();
    let (a1, a2, a3) = (
        p.multiloop_closing_pk,
        p.multiloop_paired_pk,
        p.multiloop_unpaired_pk,
    );
    let b1 = p.pk_penalty;
    let b1m = p.pk_multiloop_penalty;
    let b1p = p.pk_pk_penalty;
    let b2 = p.pk_paired_penalty;
    let b3 = p.pk_unpaired_penalty;

    let mut q = square(n);
    let mut qb = square(n);
    let mut qm = square(n);
    let mut qp = square(n);
    let mut qz = square(n);
    let mut qg = tensor(n);
    let mut qgl = tensor(n);
    let mut qgr = tensor(n);
    let mut qgls = tensor(n);
    let mut qgrs = tensor(n);

    let at = |m: &ndarray::Array2<f64>, i: isize, j: isize| m[[i as usize, j as usize]];
    let at4 = |t: &ndarray::Array4<f64>, i: isize, d: isize, e: isize, j: isize| {
        t[[i as usize, d as usize, e as usize, j as usize]]
    };

    // empty-gap conventions
    for i in 1..n {
        q[[i, i - 1]] = 1.0;
        qz[[i, i - 1]] = 1.0;
    }

    let ni = n as isize;
    for l in 1..=ni {
        for i in 0..ni - l + 1 {
            let j = i + l - 1;
            let (iu, ju) = (i as usize, j as usize);
            let pairable_ij = seq.pairable(iu, ju);
            let wc_ij = seq.watson_crick(iu, ju);

            if pairable_ij {
                // Qb: hairpin, interior, multiloop and inner pseudoknot
                let mut acc = (-em.hairpin(iu, ju) / RT).exp();
                for d in i + 1..=j - 5 {
                    for e in d + 4..=j - 1 {
                        if !seq.pairable(d as usize, e as usize) {
                            continue;
                        }
                        let qb_de = at(&qb, d, e);
                        acc += (-em.internal_loop(iu, d as usize, e as usize, ju, true) / RT)
                            .exp()
                            * qb_de;
                        if d >= i + 6 && seq.watson_crick(d as usize, e as usize) && wc_ij {
                            acc += at(&qm, i + 1, d - 1)
                                * qb_de
                                * (-(a1 + 2.0 * a2 + (j - e - 1) as f64 * a3) / RT).exp();
                        }
                    }
                }
                if wc_ij {
                    // rightmost pseudoknot filling [d, e]
                    for d in i + 1..=j - 9 {
                        for e in d + 8..=j - 1 {
                            let g = a1 + b1m + 3.0 * a2 + (j - e - 1) as f64 * a3;
                            acc += (-(g + a3 * (d - i - 1) as f64) / RT).exp() * at(&qp, d, e);
                            acc += at(&qm, i + 1, d - 1) * at(&qp, d, e) * (-g / RT).exp();
                        }
                    }
                }
                qb[[iu, ju]] = acc;

                // Qg: empty gap and interior-loop spanning terms
                qg[[iu, iu, ju, ju]] = 1.0;
                for d in i + 1..=j - 5 {
                    for e in d + 4..=j - 1 {
                        if seq.pairable(d as usize, e as usize) {
                            qg[[iu, d as usize, e as usize, ju]] +=
                                (-em.internal_loop(iu, d as usize, e as usize, ju, true) / RT)
                                    .exp();
                        }
                    }
                }
            }

            if pairable_ij && wc_ij {
                // multiloop left
                for d in i + 6..=j - 5 {
                    for e in d + 4..=j - 1 {
                        if seq.pairable(d as usize, e as usize)
                            && seq.watson_crick(d as usize, e as usize)
                        {
                            qg[[iu, d as usize, e as usize, ju]] += at(&qm, i + 1, d - 1)
                                * (-(a1 + 2.0 * a2 + (j - e - 1) as f64 * a3) / RT).exp();
                        }
                    }
                }
                // multiloop right
                for d in i + 1..=j - 10 {
                    for e in d + 4..=j - 6 {
                        if seq.pairable(d as usize, e as usize)
                            && seq.watson_crick(d as usize, e as usize)
                        {
                            qg[[iu, d as usize, e as usize, ju]] += (-(a1
                                + 2.0 * a2
                                + (d - i - 1) as f64 * a3)
                                / RT)
                                .exp()
                                * at(&qm, e + 1, j - 1);
                        }
                    }
                }
                // multiloop on both sides
                for d in i + 6..=j - 10 {
                    for e in d + 4..=j - 6 {
                        if seq.pairable(d as usize, e as usize)
                            && seq.watson_crick(d as usize, e as usize)
                        {
                            qg[[iu, d as usize, e as usize, ju]] += at(&qm, i + 1, d - 1)
                                * (-(a1 + 2.0 * a2) / RT).exp()
                                * at(&qm, e + 1, j - 1);
                        }
                    }
                }
                // interior loop plus multiloop left
                for d in i + 7..=j - 6 {
                    for e in d + 4..=j - 2 {
                        if !seq.pairable(d as usize, e as usize) {
                            continue;
                        }
                        for f in e + 1..=j - 1 {
                            qg[[iu, d as usize, e as usize, ju]] += at4(&qgls, i + 1, d, e, f)
                                * (-(a1 + a2 + (j - f - 1) as f64 * a3) / RT).exp();
                        }
                    }
                }
                // interior loop plus multiloop right
                for d in i + 2..=j - 11 {
                    for e in d + 4..=j - 7 {
                        if !seq.pairable(d as usize, e as usize) {
                            continue;
                        }
                        for c in i + 1..=d - 1 {
                            qg[[iu, d as usize, e as usize, ju]] += (-(a1
                                + a2
                                + (c - i - 1) as f64 * a3)
                                / RT)
                                .exp()
                                * at4(&qgrs, c, d, e, j - 1);
                        }
                    }
                }
                // interior loop plus multiloops on both sides
                for d in i + 7..=j - 11 {
                    for e in d + 4..=j - 7 {
                        if !seq.pairable(d as usize, e as usize) {
                            continue;
                        }
                        for c in i + 6..=d - 1 {
                            qg[[iu, d as usize, e as usize, ju]] += at(&qm, i + 1, c - 1)
                                * at4(&qgrs, c, d, e, j - 1)
                                * (-(a1 + a2) / RT).exp();
                        }
                    }
                }
            }

            // Qgls and Qgrs: gap structures flanked by multiloop branches
            for c in i + 5..=j - 6 {
                if seq.pairable(c as usize, ju) && seq.watson_crick(c as usize, ju) {
                    for d in c + 1..=j - 5 {
                        for e in d + 4..=j - 1 {
                            if seq.pairable(d as usize, e as usize) {
                                qgls[[iu, d as usize, e as usize, ju]] += (-a2 / RT).exp()
                                    * at(&qm, i, c - 1)
                                    * at4(&qg, c, d, e, j);
                            }
                        }
                    }
                }
            }
            for d in i + 1..=j - 10 {
                for e in d + 4..=j - 6 {
                    if !seq.pairable(d as usize, e as usize) {
                        continue;
                    }
                    for f in e + 1..=j - 5 {
                        if seq.pairable(iu, f as usize) && seq.watson_crick(iu, f as usize) {
                            qgrs[[iu, d as usize, e as usize, ju]] += at4(&qg, i, d, e, f)
                                * at(&qm, f + 1, j)
                                * (-a2 / RT).exp();
                        }
                    }
                }
            }

            // Qgl and Qgr: close one gap side with a band pair
            for d in i + 1..=j - 5 {
                for f in d + 4..=j - 1 {
                    if seq.pairable(d as usize, f as usize)
                        && seq.watson_crick(d as usize, f as usize)
                    {
                        for e in d..=f - 3 {
                            qgl[[iu, e as usize, f as usize, ju]] +=
                                at4(&qg, i, d, f, j) * at(&qz, d + 1, e) * (-b2 / RT).exp();
                        }
                    }
                }
            }
            for d in i + 1..=j - 4 {
                for e in d + 3..=j - 1 {
                    for f in e..=j - 1 {
                        qgr[[iu, d as usize, e as usize, ju]] +=
                            at4(&qgl, i, d, f, j) * at(&qz, e, f - 1);
                    }
                }
            }

            // Qp: two interleaved bands
            for d in i + 2..=j - 4 {
                for e in (d + 2).max(i + 5)..=j - 3 {
                    for f in e + 1..=j - 2 {
                        qp[[iu, ju]] +=
                            at4(&qgl, i, d - 1, e, f) * at4(&qgr, d, e - 1, f + 1, j);
                    }
                }
            }

            // Q, Qm, Qz
            let interior_span = i > 0 && j != ni - 1;
            q[[iu, ju]] = 1.0;
            if interior_span {
                qz[[iu, ju]] = (-(b3 * (j - i + 1) as f64) / RT).exp();
            }
            for d in i..=j - 4 {
                for e in d + 4..=j {
                    if !(seq.pairable(d as usize, e as usize)
                        && seq.watson_crick(d as usize, e as usize))
                    {
                        continue;
                    }
                    let qb_de = at(&qb, d, e);
                    let q_left = if d == i { 1.0 } else { at(&q, i, d - 1) };
                    q[[iu, ju]] += q_left * qb_de;
                    if interior_span {
                        qm[[iu, ju]] +=
                            (-(a2 + ((d - i) + (j - e)) as f64 * a3) / RT).exp() * qb_de;
                        if d >= i + 5 {
                            let qm_left = at(&qm, i, d - 1);
                            qm[[iu, ju]] +=
                                qm_left * qb_de * (-(a2 + (j - e) as f64 * a3) / RT).exp();
                        }
                        let qz_left = if d == i { 1.0 } else { at(&qz, i, d - 1) };
                        qz[[iu, ju]] +=
                            qz_left * qb_de * (-(b2 + (j - e) as f64 * b3) / RT).exp();
                    }
                }
            }
            // rightmost pseudoknot filling (d, e)
            for d in i..=j - 8 {
                for e in d + 8..=j {
                    let qp_de = at(&qp, d, e);
                    if qp_de == 0.0 {
                        continue;
                    }
                    let q_left = if d == i { 1.0 } else { at(&q, i, d - 1) };
                    q[[iu, ju]] += q_left * qp_de * (-b1 / RT).exp();
                    if interior_span {
                        qm[[iu, ju]] += (-(b1m + 2.0 * a2 + ((d - i) + (j - e)) as f64 * a3)
                            / RT)
                            .exp()
                            * qp_de;
                        if d >= i + 5 {
                            let qm_left = at(&qm, i, d - 1);
                            qm[[iu, ju]] += qm_left
                                * qp_de
                                * (-(b1m + 2.0 * a2 + (j - e) as f64 * a3) / RT).exp();
                        }
                        let qz_left = if d == i { 1.0 } else { at(&qz, i, d - 1) };
                        qz[[iu, ju]] += qz_left
                            * qp_de
                            * (-(b1p + 2.0 * b2 + (j - e) as f64 * b3) / RT).exp();
                    }
                }
            }
        }
    }

    PkPartitionSet {
        q,
        qb,
        qm,
        qp,
        qz,
        qg,
        qgl,
        qgr,
        qgls,
        qgrs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyParams;
    use crate::fold::partition::partition_no_pk_on4;
    use crate::sequence::RnaSequence;

    #[test]
    fn gap_seeds_and_conventions() {
        let seq = RnaSequence::new("t", "GGGAAACCC").unwrap();
        let params = EnergyParams::default_turner();
        let em = EnergyModel::new(&seq, &params);
        let pk = partition_pk(&em);
        for i in 1..9 {
            assert_eq!(pk.q[[i, i - 1]], 1.0);
            assert_eq!(pk.qz[[i, i - 1]], 1.0);
        }
        // Qg(i, i, j, j) = 1 exactly for pairable spans
        assert_eq!(pk.qg[[0, 0, 8, 8]], 1.0);
        assert_eq!(pk.qg[[3, 3, 7, 7]], 0.0);
    }

    #[test]
    fn matches_nested_partition_when_pseudoknots_are_negligible() {
        // all-Watson-Crick helix; the pseudoknot initiation penalty makes
        // crossed contributions vanish against the nested ones
        let seq = RnaSequence::new("t", "GGGAAACCC").unwrap();
        let params = EnergyParams::default_turner();
        let em = EnergyModel::new(&seq, &params);
        let nested = partition_no_pk_on4(&em);
        let pk = partition_pk(&em);
        let a = nested.q[[0, 8]];
        let b = pk.q[[0, 8]];
        assert!((a - b).abs() / a < 0.05, "{a} vs {b}");
    }

    #[test]
    fn pseudoknot_partition_is_positive_for_a_crossing_capable_sequence() {
        let seq = RnaSequence::new("t", "GGGGAAAACCCCAAAAGGGGAAAACCCC").unwrap();
        let params = EnergyParams::default_turner();
        let em = EnergyModel::new(&seq, &params);
        let pk = partition_pk(&em);
        let n = seq.len();
        assert!(pk.q[[0, n - 1]] >= 1.0);
        // some interior span hosts a pseudoknot
        let mut found = false;
        for i in 0..n {
            for j in i + 8..n {
                if pk.qp[[i, j]] > 0.0 {
                    found = true;
                }
            }
        }
        assert!(found, "no pseudoknot mass anywhere");
    }
}
