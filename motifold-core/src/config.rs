use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::fold::FoldMode;

/// Deadlines for the Pareto enumeration.
///
/// Both are checked between solver invocations; a solve already running
/// is never interrupted. On expiry the enumerator returns the Pareto set
/// collected so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    /// Budget for a single solver invocation. A solve that exceeds it
    /// ends the enumeration when it returns.
    pub per_solve: Option<Duration>,
    /// Budget for the whole enumeration.
    pub total: Option<Duration>,
}

/// Cooperative cancellation checked between solver invocations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the enumerator stops before its next solve.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings for one prediction run.
///
/// # Examples
///
/// ```rust
/// use motifold_core::config::PredictionConfig;
/// use motifold_core::fold::FoldMode;
///
/// let config = PredictionConfig {
///     fold_mode: FoldMode::NoPseudoknots { fast: false },
///     theta: 0.02,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// Partition-function recurrence to run.
    ///
    /// **Default**: the fast nested-only recurrence.
    pub fold_mode: FoldMode,

    /// Pair-probability threshold: only pairs with Pb > theta become
    /// decision variables of the integer program.
    ///
    /// **Default**: `0.0` (every admissible pair with nonzero posterior).
    pub theta: f64,

    /// Suppress progress messages on stderr.
    ///
    /// **Default**: `false`
    pub quiet: bool,

    /// Deadlines for the Pareto enumeration.
    ///
    /// **Default**: none.
    pub limits: SearchLimits,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            fold_mode: FoldMode::default(),
            theta: 0.0,
            quiet: false,
            limits: SearchLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
