//! # Motifold - bi-objective RNA secondary structure prediction
//!
//! Motifold predicts RNA secondary structures by jointly optimizing two
//! competing objectives: the thermodynamic quality of the selected base
//! pairs and the coverage of the sequence by known structural motifs. It
//! enumerates the Pareto frontier of structures trading the two criteria
//! against each other.
//!
//! ## Overview
//!
//! The pipeline has two stages. A McCaskill-style partition-function
//! engine (with optional Dirks-Pierce pseudoknot recurrences) turns the
//! sequence into a posterior base-pair probability matrix. A 0/1 integer
//! linear program over those probabilities and a set of candidate motif
//! insertion sites is then solved repeatedly under the epsilon-constraint
//! scheme, yielding the set of non-dominated structures.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use motifold_core::config::PredictionConfig;
//! use motifold_core::energy::EnergyParams;
//! use motifold_core::sequence::RnaSequence;
//!
//! let seq = RnaSequence::new("example", "GCGCAAAAGCGCAAGCGC")?;
//! let params = EnergyParams::default_turner();
//! let config = PredictionConfig { quiet: true, ..Default::default() };
//! let outcome = motifold_core::predict(&seq, &params, vec![], &config, None)?;
//! for s in &outcome.pareto {
//!     println!("{s}");
//! }
//! # Ok::<(), motifold_core::types::MotifoldError>(())
//! ```
//!
//! ## Module organization
//!
//! - [`sequence`]: alphabet encoding, pair types, admissibility
//! - [`energy`]: nearest-neighbor parameter tables and the free-energy
//!   oracle
//! - [`fold`]: partition functions and posterior probabilities
//! - [`motif`]: position-resolved motif insertion sites
//! - [`moip`]: the integer program and the Pareto enumerator
//! - [`config`]: run configuration, deadlines and cancellation
//!
//! ## Error handling
//!
//! Fallible operations return [`Result<T, MotifoldError>`](types::MotifoldError).
//! Invalid sequences and malformed insertion sites are fatal at
//! initialization; per-solve infeasibility is not an error and simply
//! terminates a branch of the Pareto sweep.

pub mod config;
pub mod constants;
pub mod energy;
pub mod fold;
pub mod moip;
pub mod motif;
pub mod sequence;
pub mod types;

pub use config::{CancelToken, PredictionConfig};
pub use energy::EnergyParams;
pub use fold::FoldMode;
pub use moip::structure::SecondaryStructure;
pub use moip::Moip;
pub use motif::{Component, Motif, MotifSource};
pub use sequence::RnaSequence;
pub use types::MotifoldError;

use fold::Mat;
use moip::Objective;

/// Result of a full prediction run.
#[derive(Debug)]
pub struct PredictionOutcome {
    /// Posterior base-pair probability matrix, kept for diagnostics.
    pub pb: Mat,
    /// The non-dominated structures found.
    pub pareto: Vec<SecondaryStructure>,
}

/// Run the full pipeline: posterior probabilities, then the
/// epsilon-constraint sweep over the integer program.
///
/// With explicit `bounds` the sweep runs once over `[lambda_min,
/// lambda_max]`. Without bounds the motif-coverage extreme is solved
/// first, seeds the Pareto set, and its objective value becomes the upper
/// bound of the sweep.
///
/// # Errors
///
/// Sequence and insertion-site validation errors, and solver backend
/// failures other than per-solve infeasibility.
pub fn predict(
    seq: &RnaSequence,
    params: &EnergyParams,
    sites: Vec<Motif>,
    config: &PredictionConfig,
    bounds: Option<(f64, f64)>,
) -> Result<PredictionOutcome, MotifoldError> {
    predict_with_cancel(seq, params, sites, config, bounds, CancelToken::new())
}

/// [`predict`] with an external cancellation token, checked between
/// solver invocations.
///
/// # Errors
///
/// See [`predict`].
pub fn predict_with_cancel(
    seq: &RnaSequence,
    params: &EnergyParams,
    sites: Vec<Motif>,
    config: &PredictionConfig,
    bounds: Option<(f64, f64)>,
    cancel: CancelToken,
) -> Result<PredictionOutcome, MotifoldError> {
    if !config.quiet {
        eprintln!("computing pairing probabilities for {} ({} nt)", seq.name(), seq.len());
    }
    let pb = fold::base_pair_probabilities(seq, params, config.fold_mode);
    let mut moip = Moip::new(seq, &pb, sites, config, cancel)?;
    match bounds {
        Some((lambda_min, lambda_max)) => {
            moip.extend_pareto(lambda_min, lambda_max)?;
        }
        None => {
            // seed with the motif-coverage extreme so the sweep cannot
            // lose the high-coverage end of the frontier
            let extreme = moip.solve_objective(Objective::MotifCoverage, None)?;
            if extreme.is_empty_structure() {
                return Ok(PredictionOutcome {
                    pb,
                    pareto: Vec::new(),
                });
            }
            let lambda_max = extreme.motif_coverage();
            moip.add_solution(extreme);
            moip.extend_pareto(0.0, lambda_max)?;
        }
    }
    let pareto = moip.into_pareto();
    Ok(PredictionOutcome { pb, pareto })
}
