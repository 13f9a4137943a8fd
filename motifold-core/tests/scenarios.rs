//! End-to-end scenarios over the full pipeline.

use motifold_core::config::PredictionConfig;
use motifold_core::energy::EnergyParams;
use motifold_core::fold::{self, FoldMode};
use motifold_core::motif::{Component, Motif, MotifSource};
use motifold_core::sequence::RnaSequence;
use motifold_core::types::MotifoldError;
use motifold_core::{predict, SecondaryStructure};

fn quiet() -> PredictionConfig {
    PredictionConfig {
        quiet: true,
        ..Default::default()
    }
}

fn assert_pareto_invariant(pareto: &[SecondaryStructure]) {
    for a in pareto {
        for b in pareto {
            assert!(!a.dominates(b), "{a} dominates {b}");
        }
    }
}

/// A short triple helix folds onto its nested stem and nothing else.
#[cfg(feature = "solver")]
#[test]
fn s1_triple_helix() {
    let seq = RnaSequence::new("s1", "GGGAAACCC").unwrap();
    let params = EnergyParams::default_turner();
    // no motifs: the motif-coverage extreme is trivially 0 and the sweep
    // runs over the window [0, 0]
    let outcome = predict(&seq, &params, vec![], &quiet(), None).unwrap();
    assert_eq!(outcome.pareto.len(), 1);
    let s = &outcome.pareto[0];
    assert_eq!(s.pairs(), [(0, 8), (1, 7), (2, 6)]);
    assert_eq!(s.motif_coverage(), 0.0);
    assert!(s.expected_accuracy() > 0.0);
    assert_pareto_invariant(&outcome.pareto);
}

/// Sequences too short to host a pair are rejected at construction.
#[test]
fn s2_too_short_sequence() {
    assert!(matches!(
        RnaSequence::new("s2", "AAAA"),
        Err(MotifoldError::InvalidSequence(_))
    ));
}

/// One high-scoring motif produces two Pareto points: the inserted one
/// (higher coverage) and the purely thermodynamic one (higher accuracy).
#[cfg(feature = "solver")]
#[test]
fn s3_motif_against_thermodynamics() {
    let seq = RnaSequence::new("s3", "GCGCAAAAGCGC").unwrap();
    let params = EnergyParams::default_turner();
    let config = PredictionConfig {
        theta: 0.01,
        quiet: true,
        ..Default::default()
    };
    // hairpin-loop motif over [1, 11): its closing pair (1, 10) is part
    // of the native helix, but insertion forbids the deeper pairs (2, 9)
    // and (3, 8)
    let site = Motif::new(
        MotifSource::RnaMotifAtlas {
            atlas_id: "HL_001".into(),
        },
        vec![Component::new(1, 11)],
        10.0,
    );
    let outcome = predict(&seq, &params, vec![site], &config, None).unwrap();
    assert_pareto_invariant(&outcome.pareto);
    assert_eq!(outcome.pareto.len(), 2, "{:?}", outcome.pareto);

    let with_motif = outcome
        .pareto
        .iter()
        .find(|s| !s.motifs().is_empty())
        .expect("one point inserts the motif");
    let without = outcome
        .pareto
        .iter()
        .find(|s| s.motifs().is_empty())
        .expect("one point is purely thermodynamic");
    assert_eq!(with_motif.motif_coverage(), 10.0);
    assert!(without.expected_accuracy() > with_motif.expected_accuracy());

    // the closing pair of the inserted motif is forced in
    assert!(with_motif.pairs().contains(&(1, 10)));
    // no selected pair touches the inside of the inserted component
    for &(u, v) in with_motif.pairs() {
        for w in [u, v] {
            assert!(
                !(2..=8).contains(&w),
                "pair ({u}, {v}) intrudes into the inserted component"
            );
        }
    }
}

/// In a 30-nt stem-loop the closing pair out-weighs every candidate
/// outside the native stem at least five-fold.
#[test]
fn s4_hairpin_closing_pair_dominance() {
    let seq = RnaSequence::new("s4", "GCGAUGGUCCAACAAACAAAGGACCAUCGC").unwrap();
    let params = EnergyParams::default_turner();
    let pb = fold::base_pair_probabilities(&seq, &params, FoldMode::default());
    let n = seq.len();
    let closing = pb[[0, n - 1]];
    let mut best_interior = 0.0f64;
    for i in 0..n {
        for j in i + 1..n {
            if j != n - 1 - i {
                best_interior = best_interior.max(pb[[i, j]]);
            }
        }
    }
    assert!(
        closing >= 5.0 * best_interior,
        "closing {closing} vs interior {best_interior}"
    );
}

/// A two-component motif whose closing pair is below the minimum span is
/// never inserted.
#[cfg(feature = "solver")]
#[test]
fn s5_non_admissible_closing_pair() {
    let seq = RnaSequence::new("s5", "GCGCAAAAGCGC").unwrap();
    let params = EnergyParams::default_turner();
    let site = Motif::new(
        MotifSource::Carnaval { rin_id: 42 },
        // adjacent components three positions apart: closing pair (2, 5)
        vec![Component::new(0, 3), Component::new(5, 8)],
        1000.0,
    );
    let outcome = predict(&seq, &params, vec![site], &quiet(), None).unwrap();
    assert!(!outcome.pareto.is_empty());
    for s in &outcome.pareto {
        assert!(s.motifs().is_empty(), "motif must never be inserted: {s}");
        assert_eq!(s.motif_coverage(), 0.0);
    }
}

/// A sequence long enough to fold but with no pairable bases still runs
/// end to end; the only structure is the unpaired one.
#[cfg(feature = "solver")]
#[test]
fn sequence_without_pairs_yields_the_open_chain() {
    let seq = RnaSequence::new("open", "AAAAAAAA").unwrap();
    let params = EnergyParams::default_turner();
    let outcome = predict(&seq, &params, vec![], &quiet(), None).unwrap();
    assert_eq!(outcome.pareto.len(), 1);
    assert!(outcome.pareto[0].pairs().is_empty());
    assert_eq!(outcome.pareto[0].expected_accuracy(), 0.0);
}

/// Motif completeness, non-overlap and closing pairs hold in every
/// returned structure of a run with competing multi-component motifs.
#[cfg(feature = "solver")]
#[test]
fn returned_structures_respect_motif_invariants() {
    let seq = RnaSequence::new("inv", "GGGGGAAAACCCCCAAGGGGGAAAACCCCC").unwrap();
    let params = EnergyParams::default_turner();
    let sites = vec![
        Motif::new(
            MotifSource::Carnaval { rin_id: 1 },
            vec![Component::new(0, 3), Component::new(11, 14)],
            5.0,
        ),
        Motif::new(
            MotifSource::Carnaval { rin_id: 2 },
            vec![Component::new(1, 4), Component::new(10, 13)],
            4.0,
        ),
    ];
    let outcome = predict(&seq, &params, sites, &quiet(), None).unwrap();
    assert_pareto_invariant(&outcome.pareto);
    for s in &outcome.pareto {
        // non-overlap across all inserted components
        let mut covered = vec![false; seq.len()];
        for m in s.motifs() {
            for c in &m.components {
                for u in c.start..c.end {
                    assert!(!covered[u], "position {u} covered twice in {s}");
                    covered[u] = true;
                }
            }
        }
        // closing pairs of every inserted multi-component motif
        for m in s.motifs() {
            for pair in m.components.windows(2) {
                let expected = (pair[0].end - 1, pair[1].start);
                assert!(
                    s.pairs().contains(&expected),
                    "adjacent components not joined by {expected:?} in {s}"
                );
            }
        }
    }
}

/// The two nested-only recurrences agree on an 80-nt sequence.
#[test]
fn partition_recurrences_agree_at_80_nt() {
    let raw = "GGGGGCCAAAGGCUUAAGCGAUGGUCCAACAAACAAAGGACCAUCGCAAGGGGAAAACCCCAAAGCGCGAAACGCGCAAA";
    assert_eq!(raw.len(), 80);
    let seq = RnaSequence::new("agree", raw).unwrap();
    let params = EnergyParams::default_turner();
    let reference = fold::compute_partition(&seq, &params, FoldMode::NoPseudoknots { fast: false });
    let fast = fold::compute_partition(&seq, &params, FoldMode::NoPseudoknots { fast: true });
    let (fold::Partition::Nested(a), fold::Partition::Nested(b)) = (reference, fast) else {
        panic!("nested mode must produce nested partitions");
    };
    for i in 0..80 {
        for j in i + 1..80 {
            for (x, y, name) in [
                (a.q[[i, j]], b.q[[i, j]], "Q"),
                (a.qb[[i, j]], b.qb[[i, j]], "Qb"),
                (a.qm[[i, j]], b.qm[[i, j]], "Qm"),
            ] {
                assert!(
                    (x - y).abs() <= 1e-4 * x.abs().max(1.0),
                    "{name}({i},{j}): {x} vs {y}"
                );
            }
        }
    }
}

/// Posterior bounds and row sums on a longer sequence.
#[test]
fn posterior_bounds_hold_end_to_end() {
    let raw = "GGGGGCCAAAGGCUUAAGCGAUGGUCCAACAAACAAAGGACCAUCGCAAGGGGAAAACCCC";
    let seq = RnaSequence::new("bounds", raw).unwrap();
    let params = EnergyParams::default_turner();
    let pb = fold::base_pair_probabilities(&seq, &params, FoldMode::default());
    let n = seq.len();
    for i in 0..n {
        let mut total = 0.0;
        for j in i + 1..n {
            assert!((0.0..=1.0 + 1e-9).contains(&pb[[i, j]]));
            total += pb[[i, j]];
        }
        for k in 0..i {
            total += pb[[k, i]];
        }
        assert!(total <= 1.0 + 1e-6, "base {i}: {total}");
    }
}
