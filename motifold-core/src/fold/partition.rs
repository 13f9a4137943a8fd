//! Non-pseudoknotted partition functions.
//!
//! Two equivalent recurrences over subsequences of growing length: the
//! O(N^4) reference form and the O(N^3) form that factors rightmost-pair
//! sums through Qs/Qms and extensible interior loops through the rolling
//! Qx tensors. Within one length sweep the start positions are
//! data-independent and run in parallel; results are collected per task
//! and written back serially.

use ndarray::Ix2;
use rayon::prelude::*;

use crate::constants::RT;
use crate::energy::EnergyModel;
use crate::fold::matrices::{square, Rolling};
use crate::fold::PartitionSet;

/// O(N^4) recurrence producing Q, Qb and Qm.
#[must_use]
pub fn partition_no_pk_on4(em: &EnergyModel) -> PartitionSet {
    let seq = em.sequence();
    let n = seq.len();
    let p = em.params();
    let (a1, a2, a3) = (
        p.multiloop_closing,
        p.multiloop_paired,
        p.multiloop_unpaired,
    );

    let mut q = square(n);
    let mut qb = square(n);
    let mut qm = square(n);

    // empty subsequences contribute exp(-G_empty / RT) = 1
    for i in 0..n - 1 {
        q[[i, i + 1]] = 1.0;
    }
    for l in 3..5 {
        for i in 0..=n - l {
            q[[i, i + l - 1]] = 1.0;
        }
    }

    for l in 5..=n {
        let updates: Vec<(usize, f64, f64, f64)> = (0..n - l + 1)
            .into_par_iter()
            .map(|i| {
                let j = i + l - 1;

                let mut qb_ij = 0.0;
                if seq.pairable(i, j) {
                    qb_ij = (-em.hairpin(i, j) / RT).exp();
                    if l >= 7 {
                        // rightmost inner pair (d, e)
                        for d in i + 1..=j - 5 {
                            for e in d + 4..=j - 1 {
                                let qb_de = qb[[d, e]];
                                if qb_de == 0.0 {
                                    continue;
                                }
                                qb_ij +=
                                    qb_de * (-em.internal_loop(i, d, e, j, false) / RT).exp();
                                if d >= i + 2 {
                                    let unpaired = (j - e - 1) as f64;
                                    qb_ij += qb_de
                                        * qm[[i + 1, d - 1]]
                                        * (-(a1 + 2.0 * a2 + unpaired * a3) / RT).exp();
                                }
                            }
                        }
                    }
                }

                let mut qm_ij = 0.0;
                let mut q_ij = 1.0;
                for d in i..=j - 4 {
                    for e in d + 4..=j {
                        let qb_de = if d == i && e == j { qb_ij } else { qb[[d, e]] };
                        if qb_de == 0.0 {
                            continue;
                        }
                        qm_ij += qb_de
                            * (-(a2 + a3 * ((d - i) + (j - e)) as f64) / RT).exp();
                        if d > i {
                            qm_ij += qb_de
                                * qm[[i, d - 1]]
                                * (-(a2 + a3 * (j - e) as f64) / RT).exp();
                            q_ij += q[[i, d - 1]] * qb_de;
                        } else {
                            q_ij += qb_de;
                        }
                    }
                }

                (i, qb_ij, qm_ij, q_ij)
            })
            .collect();

        for (i, qb_ij, qm_ij, q_ij) in updates {
            let j = i + l - 1;
            qb[[i, j]] = qb_ij;
            qm[[i, j]] = qm_ij;
            q[[i, j]] = q_ij;
        }
    }

    PartitionSet { q, qb, qm }
}

struct FastCell {
    i: usize,
    qb: f64,
    qm: f64,
    q: f64,
    qs: f64,
    qms: f64,
    /// Updated Qx row of this start position, present for lengths that
    /// can host extensible interior loops.
    qx_row: Option<Vec<f64>>,
    /// Seeds for the Qx snapshot two lengths ahead, written to row i - 1.
    qx2_seeds: Vec<(usize, f64)>,
}

/// O(N^3) recurrence producing the same Q, Qb and Qm as
/// [`partition_no_pk_on4`] up to floating-point rounding.
#[must_use]
pub fn partition_no_pk_on3(em: &EnergyModel) -> PartitionSet {
    let seq = em.sequence();
    let n = seq.len();
    let p = em.params();
    let (a1, a2, a3) = (
        p.multiloop_closing,
        p.multiloop_paired,
        p.multiloop_unpaired,
    );

    let mut q = square(n);
    let mut qb = square(n);
    let mut qm = square(n);
    let mut qs = square(n);
    let mut qms = square(n);
    let mut qx: Rolling<Ix2> = Rolling::new((n, n));

    for i in 0..n - 1 {
        q[[i, i + 1]] = 1.0;
    }
    for l in 3..5 {
        for i in 0..=n - l {
            q[[i, i + l - 1]] = 1.0;
        }
    }

    for l in 5..=n {
        // serial advance of the rolling snapshots before the parallel body
        qx.advance();

        let qx_cur = &qx.cur;
        let updates: Vec<FastCell> = (0..n - l + 1)
            .into_par_iter()
            .map(|start| {
                let i = start as isize;
                let j = i + l as isize - 1;
                let iu = i as usize;
                let ju = j as usize;

                // Qx deposits: interior loops with one side fixed at 4.
                // Shorter subsequences enter Qb directly as special cases.
                let mut qx_row: Option<Vec<f64>> = None;
                let mut qx2_seeds = Vec::new();
                if l >= 15 {
                    let mut row = qx_cur.row(iu).to_vec();
                    let d = i + 5;
                    let l1 = 4usize;
                    for e in d + 4..=j - 5 {
                        let l2 = (j - e - 1) as usize;
                        let qb_de = qb[[d as usize, e as usize]];
                        if qb_de != 0.0 {
                            // mismatch of the inner pair against its
                            // loop-adjacent bases, frozen at deposit time
                            let g = em.interior_asymmetry(l1, l2)
                                + em.interior_mismatch(
                                    e as usize,
                                    d as usize,
                                    e as usize + 1,
                                    d as usize - 1,
                                );
                            row[l1 + l2] += qb_de * (-g / RT).exp();
                        }
                    }
                    let e = j - 5;
                    let l2 = 4usize;
                    for d in i + 6..=e - 4 {
                        let l1 = (d - i - 1) as usize;
                        let qb_de = qb[[d as usize, e as usize]];
                        if qb_de != 0.0 {
                            let g = em.interior_asymmetry(l1, l2)
                                + em.interior_mismatch(
                                    e as usize,
                                    d as usize,
                                    e as usize + 1,
                                    d as usize - 1,
                                );
                            row[l1 + l2] += qb_de * (-g / RT).exp();
                        }
                    }
                    if iu > 0 {
                        // propagate to the snapshot two lengths ahead
                        for s in 8..=l - 7 {
                            if row[s] != 0.0 {
                                let g = em.loop_entropy(s + 2) - em.loop_entropy(s);
                                qx2_seeds.push((s + 2, row[s] * (-g / RT).exp()));
                            }
                        }
                    }
                    qx_row = Some(row);
                }

                let mut qb_ij = 0.0;
                if seq.pairable(iu, ju) {
                    qb_ij = (-em.hairpin(iu, ju) / RT).exp();
                    // extensible interior loops, both sides >= 4
                    if let Some(row) = &qx_row {
                        let mismatch =
                            (-em.interior_mismatch(iu, ju, iu + 1, ju - 1) / RT).exp();
                        for s in 8..=l - 7 {
                            qb_ij += row[s] * mismatch;
                        }
                    }
                    // small inextensible interior loops (both sides <= 3)
                    for d in i + 1..=i + 4 {
                        for e in (d + 4).max(j - 4)..=j - 1 {
                            let qb_de = qb[[d as usize, e as usize]];
                            if qb_de != 0.0 {
                                qb_ij += qb_de
                                    * (-em.internal_loop(
                                        iu, d as usize, e as usize, ju, false,
                                    ) / RT)
                                        .exp();
                            }
                        }
                    }
                    // bulges and asymmetric loops with l1 <= 3, l2 >= 4
                    for d in i + 1..=i + 4 {
                        for e in d + 4..=j - 5 {
                            let qb_de = qb[[d as usize, e as usize]];
                            if qb_de != 0.0 {
                                qb_ij += qb_de
                                    * (-em.internal_loop(
                                        iu, d as usize, e as usize, ju, false,
                                    ) / RT)
                                        .exp();
                            }
                        }
                    }
                    // the symmetric cases, l2 <= 3 and l1 >= 4
                    for e in j - 4..=j - 1 {
                        for d in i + 5..=e - 4 {
                            let qb_de = qb[[d as usize, e as usize]];
                            if qb_de != 0.0 {
                                qb_ij += qb_de
                                    * (-em.internal_loop(
                                        iu, d as usize, e as usize, ju, false,
                                    ) / RT)
                                        .exp();
                            }
                        }
                    }
                    // multiloop closed by (i, j)
                    for d in i + 6..=j - 5 {
                        qb_ij += qm[[iu + 1, d as usize - 1]]
                            * qms[[d as usize, ju - 1]]
                            * (-(a1 + a2) / RT).exp();
                    }
                }

                // rightmost pairs opening at i
                let mut qs_ij = 0.0;
                let mut qms_ij = 0.0;
                for d in i + 4..=j {
                    let qb_id = if d == j {
                        qb_ij
                    } else {
                        qb[[iu, d as usize]]
                    };
                    if qb_id != 0.0 {
                        qs_ij += qb_id;
                        qms_ij += qb_id * (-(a2 + a3 * (j - d) as f64) / RT).exp();
                    }
                }

                let mut qm_ij = 0.0;
                let mut q_ij = 1.0;
                for d in i..=j - 4 {
                    let (qs_dj, qms_dj) = if d == i {
                        (qs_ij, qms_ij)
                    } else {
                        (qs[[d as usize, ju]], qms[[d as usize, ju]])
                    };
                    if qms_dj != 0.0 {
                        qm_ij += qms_dj * (-a3 * (d - i) as f64 / RT).exp();
                        if d > i {
                            qm_ij += qms_dj * qm[[iu, d as usize - 1]];
                        }
                    }
                    if qs_dj != 0.0 {
                        if d > i {
                            q_ij += q[[iu, d as usize - 1]] * qs_dj;
                        } else {
                            q_ij += qs_dj;
                        }
                    }
                }

                FastCell {
                    i: iu,
                    qb: qb_ij,
                    qm: qm_ij,
                    q: q_ij,
                    qs: qs_ij,
                    qms: qms_ij,
                    qx_row,
                    qx2_seeds,
                }
            })
            .collect();

        for cell in updates {
            let j = cell.i + l - 1;
            qb[[cell.i, j]] = cell.qb;
            qm[[cell.i, j]] = cell.qm;
            q[[cell.i, j]] = cell.q;
            qs[[cell.i, j]] = cell.qs;
            qms[[cell.i, j]] = cell.qms;
            if let Some(row) = cell.qx_row {
                for (s, v) in row.into_iter().enumerate() {
                    qx.cur[[cell.i, s]] = v;
                }
            }
            for (s, v) in cell.qx2_seeds {
                qx.ahead2[[cell.i - 1, s]] = v;
            }
        }
    }

    PartitionSet { q, qb, qm }
}
