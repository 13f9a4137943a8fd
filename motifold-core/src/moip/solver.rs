//! Narrow interface to the 0/1 MILP backend.
//!
//! The model is kept as plain owned data: binary variables, linear
//! constraints and the no-repeat cuts accumulated across solves. Each
//! solve materializes a fresh backend problem, maximizes the given
//! objective and reads the assignment back, so backend state never
//! outlives a solve.

use crate::constants::ASSIGNMENT_CUTOFF;
use crate::types::MotifoldError;

/// Handle of one binary decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarId(pub(crate) usize);

/// A linear expression over the model's variables.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    pub(crate) terms: Vec<(VarId, f64)>,
    pub(crate) constant: f64,
}

impl LinExpr {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coefficient * variable`.
    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    /// Add a constant.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Number of variable terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate under an assignment.
    #[must_use]
    pub fn eval(&self, assignment: &Assignment) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(v, c)| c * assignment.value(v))
                .sum::<f64>()
    }
}

/// Comparison sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// `expr <sense> rhs` over the model's variables.
#[derive(Debug, Clone)]
pub struct LinConstraint {
    pub expr: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

/// A solved 0/1 assignment.
#[derive(Debug, Clone)]
pub struct Assignment {
    values: Vec<f64>,
    objective: f64,
}

impl Assignment {
    /// Relaxed value of a variable.
    #[must_use]
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    /// Whether the variable is set in the rounded assignment.
    #[must_use]
    pub fn is_set(&self, var: VarId) -> bool {
        self.values[var.0] > ASSIGNMENT_CUTOFF
    }

    /// Optimal objective value reported by the backend.
    #[must_use]
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Whether a constraint with no variable terms is satisfied.
#[cfg(feature = "solver")]
fn constant_holds(c: &LinConstraint) -> bool {
    match c.sense {
        Sense::Le => c.expr.constant <= c.rhs,
        Sense::Ge => c.expr.constant >= c.rhs,
        Sense::Eq => (c.expr.constant - c.rhs).abs() < 1e-9,
    }
}

/// Owned 0/1 MILP model.
#[derive(Debug, Default)]
pub struct BinaryModel {
    num_vars: usize,
    constraints: Vec<LinConstraint>,
    cuts: Vec<LinConstraint>,
}

impl BinaryModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one binary variable.
    pub fn add_variable(&mut self) -> VarId {
        let id = VarId(self.num_vars);
        self.num_vars += 1;
        id
    }

    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.num_vars
    }

    /// Add a structural constraint.
    pub fn add_constraint(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        self.constraints.push(LinConstraint { expr, sense, rhs });
    }

    /// Add a no-repeat cut; cuts persist across solves like constraints
    /// but are tracked separately for reporting.
    pub fn add_cut(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        self.cuts.push(LinConstraint { expr, sense, rhs });
    }

    /// Structural constraints plus accumulated cuts.
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.constraints.len() + self.cuts.len()
    }

    #[must_use]
    pub fn num_cuts(&self) -> usize {
        self.cuts.len()
    }

    /// Maximize `objective`, optionally subject to `bounds` holding a
    /// second expression inside `[lo, hi]`.
    ///
    /// Returns `Ok(None)` when the model is infeasible; every other
    /// backend failure is an error.
    ///
    /// # Errors
    ///
    /// [`MotifoldError::SolverUnavailable`] without the `solver` feature,
    /// [`MotifoldError::Solver`] on unexpected backend failures.
    pub fn solve(
        &self,
        objective: &LinExpr,
        bounds: Option<(&LinExpr, f64, f64)>,
    ) -> Result<Option<Assignment>, MotifoldError> {
        self.solve_impl(objective, bounds)
    }

    #[cfg(feature = "solver")]
    fn solve_impl(
        &self,
        objective: &LinExpr,
        bounds: Option<(&LinExpr, f64, f64)>,
    ) -> Result<Option<Assignment>, MotifoldError> {
        use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel};

        // constraints without variable terms never reach the backend:
        // they are constant and either hold or make the model infeasible
        for c in self.constraints.iter().chain(self.cuts.iter()) {
            if c.expr.is_empty() && !constant_holds(c) {
                return Ok(None);
            }
        }
        if let Some((expr, lo, hi)) = bounds {
            if expr.is_empty() && !(lo..=hi).contains(&expr.constant) {
                return Ok(None);
            }
        }
        if self.num_vars == 0 {
            return Ok(Some(Assignment {
                values: Vec::new(),
                objective: objective.constant,
            }));
        }

        let mut problem = ProblemVariables::new();
        let vars: Vec<good_lp::Variable> = (0..self.num_vars)
            .map(|_| problem.add(variable().binary()))
            .collect();

        let to_expression = |expr: &LinExpr| {
            let mut e = Expression::default();
            for &(v, c) in &expr.terms {
                e += c * vars[v.0];
            }
            e += expr.constant;
            e
        };

        let objective_expr = to_expression(objective);
        let mut model = problem.maximise(objective_expr.clone()).using(good_lp::microlp);
        for c in self
            .constraints
            .iter()
            .chain(self.cuts.iter())
            .filter(|c| !c.expr.is_empty())
        {
            let lhs = to_expression(&c.expr);
            let built = match c.sense {
                Sense::Le => constraint::leq(lhs, c.rhs),
                Sense::Ge => constraint::geq(lhs, c.rhs),
                Sense::Eq => constraint::eq(lhs, c.rhs),
            };
            model = model.with(built);
        }
        if let Some((expr, lo, hi)) = bounds {
            if !expr.is_empty() {
                let e = to_expression(expr);
                model = model.with(constraint::geq(e.clone(), lo));
                model = model.with(constraint::leq(e, hi));
            }
        }

        match model.solve() {
            Ok(solution) => {
                let objective = objective_expr.eval_with(&solution);
                let values = vars.iter().map(|&v| solution.value(v)).collect();
                Ok(Some(Assignment { values, objective }))
            }
            Err(good_lp::ResolutionError::Infeasible) => Ok(None),
            Err(other) => Err(MotifoldError::Solver(other.to_string())),
        }
    }

    #[cfg(not(feature = "solver"))]
    fn solve_impl(
        &self,
        _objective: &LinExpr,
        _bounds: Option<(&LinExpr, f64, f64)>,
    ) -> Result<Option<Assignment>, MotifoldError> {
        Err(MotifoldError::SolverUnavailable(
            "motifold-core was built without the `solver` feature",
        ))
    }
}

#[cfg(all(test, feature = "solver"))]
mod tests {
    use super::*;

    #[test]
    fn maximizes_a_tiny_binary_program() {
        let mut model = BinaryModel::new();
        let x = model.add_variable();
        let y = model.add_variable();

        // x + y <= 1
        let mut c = LinExpr::new();
        c.add_term(x, 1.0);
        c.add_term(y, 1.0);
        model.add_constraint(c, Sense::Le, 1.0);

        // maximize 2x + y: picks x
        let mut obj = LinExpr::new();
        obj.add_term(x, 2.0);
        obj.add_term(y, 1.0);

        let solution = model.solve(&obj, None).unwrap().unwrap();
        assert!(solution.is_set(x));
        assert!(!solution.is_set(y));
        assert!((solution.objective() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reports_infeasibility_as_none() {
        let mut model = BinaryModel::new();
        let x = model.add_variable();
        let mut ge = LinExpr::new();
        ge.add_term(x, 1.0);
        model.add_constraint(ge.clone(), Sense::Ge, 1.0);
        model.add_constraint(ge, Sense::Le, 0.0);

        let mut obj = LinExpr::new();
        obj.add_term(x, 1.0);
        assert!(model.solve(&obj, None).unwrap().is_none());
    }

    #[test]
    fn bounds_constrain_a_second_expression() {
        let mut model = BinaryModel::new();
        let x = model.add_variable();
        let y = model.add_variable();

        let mut obj = LinExpr::new();
        obj.add_term(x, 1.0);
        obj.add_term(y, 1.0);

        let mut other = LinExpr::new();
        other.add_term(x, 1.0);

        // keep x at zero through the bound window
        let solution = model.solve(&obj, Some((&other, 0.0, 0.0))).unwrap().unwrap();
        assert!(!solution.is_set(x));
        assert!(solution.is_set(y));
    }

    #[test]
    fn cuts_forbid_a_previous_assignment() {
        let mut model = BinaryModel::new();
        let x = model.add_variable();
        let y = model.add_variable();

        let mut obj = LinExpr::new();
        obj.add_term(x, 2.0);
        obj.add_term(y, 1.0);

        let first = model.solve(&obj, None).unwrap().unwrap();
        assert!(first.is_set(x) && first.is_set(y));

        // forbid exactly (x=1, y=1)
        let mut cut = LinExpr::new();
        cut.add_term(x, -1.0);
        cut.add_term(y, -1.0);
        cut.add_constant(2.0);
        model.add_cut(cut, Sense::Ge, 1.0);

        let second = model.solve(&obj, None).unwrap().unwrap();
        assert!(!(second.is_set(x) && second.is_set(y)));
        assert!(second.objective() < first.objective());
    }
}
