use thiserror::Error;

/// A posterior or ensemble probability.
pub type Prob = f64;

/// A Gibbs free energy in kcal/mol at 37 degrees Celsius.
pub type FreeEnergy = f64;

/// A selected base pair (i, j) with i < j.
pub type BasePair = (usize, usize);

/// Error types that can occur during structure prediction.
#[derive(Error, Debug)]
pub enum MotifoldError {
    /// Input sequence cannot be folded (too short, or no concrete base).
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    /// Runtime-loaded energy parameter overrides failed to parse.
    /// The compile-time default table cannot fail.
    #[error("energy parameter load failure: {0}")]
    EnergyParams(String),
    /// An insertion site violates the motif invariants (empty component,
    /// out-of-range interval, overlapping components).
    #[error("invalid motif insertion site: {0}")]
    InvalidMotif(String),
    /// The crate was built without a MILP backend.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(&'static str),
    /// The MILP backend failed for a reason other than infeasibility.
    /// Per-solve infeasibility is not an error; it terminates the current
    /// Pareto branch.
    #[error("solver error: {0}")]
    Solver(String),
    /// A NaN was produced on a nominally reachable path of the posterior
    /// back-recursion.
    #[error("numeric error: {0}")]
    Numeric(String),
}
