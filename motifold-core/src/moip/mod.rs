//! The multi-objective integer program over base pairs and motif
//! insertions, and the epsilon-constraint Pareto enumerator driving it.

pub mod solver;
pub mod structure;

use std::time::Instant;

use crate::config::{CancelToken, PredictionConfig, SearchLimits};
use crate::constants::{MIN_PAIR_SPAN, MIN_TAIL_SPAN};
use crate::fold::Mat;
use crate::motif::Motif;
use crate::sequence::RnaSequence;
use crate::types::MotifoldError;

use solver::{Assignment, BinaryModel, LinExpr, Sense, VarId};
use structure::SecondaryStructure;

/// The two objectives of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Objective 1: summed score of inserted motifs.
    MotifCoverage,
    /// Objective 2: expected accuracy, the summed posterior probability
    /// of the selected pairs.
    ExpectedAccuracy,
}

/// The integer program: one y(u, v) variable per allowed pair, one
/// C(x, j) variable per component of every insertion site, the structural
/// constraints tying them together, and the Pareto set accumulated by the
/// enumerator.
pub struct Moip<'a> {
    seq: &'a RnaSequence,
    pb: &'a Mat,
    theta: f64,
    sites: Vec<Motif>,
    model: BinaryModel,
    /// y-variable lookup: row u holds the entries for v = u+4 .. n-1;
    /// `None` marks pairs whose posterior did not clear theta.
    yuv: Vec<Vec<Option<VarId>>>,
    /// C-variable lookup per site and component.
    cxj: Vec<Vec<VarId>>,
    obj_motifs: LinExpr,
    obj_accuracy: LinExpr,
    pareto: Vec<SecondaryStructure>,
    limits: SearchLimits,
    cancel: CancelToken,
    quiet: bool,
    started: Instant,
}

impl<'a> Moip<'a> {
    /// Build the program over a posterior matrix and a set of insertion
    /// sites.
    ///
    /// # Errors
    ///
    /// [`MotifoldError::InvalidMotif`] when an insertion site violates
    /// the motif invariants.
    pub fn new(
        seq: &'a RnaSequence,
        pb: &'a Mat,
        sites: Vec<Motif>,
        config: &PredictionConfig,
        cancel: CancelToken,
    ) -> Result<Self, MotifoldError> {
        let n = seq.len();
        debug_assert_eq!(pb.nrows(), n);
        for site in &sites {
            site.validate(n).map_err(MotifoldError::InvalidMotif)?;
        }

        let mut moip = Self {
            seq,
            pb,
            theta: config.theta,
            sites,
            model: BinaryModel::new(),
            yuv: Vec::new(),
            cxj: Vec::new(),
            obj_motifs: LinExpr::new(),
            obj_accuracy: LinExpr::new(),
            pareto: Vec::new(),
            limits: config.limits,
            cancel,
            quiet: config.quiet,
            started: Instant::now(),
        };
        moip.define_variables();
        moip.define_constraints();
        moip.define_objectives();
        if !moip.quiet {
            eprintln!(
                "{} decision variables, {} constraints",
                moip.model.num_variables(),
                moip.model.num_constraints()
            );
        }
        Ok(moip)
    }

    fn define_variables(&mut self) {
        let n = self.seq.len();
        // y(u, v) exists exactly for admissible pairs above the
        // probability threshold
        for u in 0..n + 1 - MIN_TAIL_SPAN {
            let mut row = Vec::with_capacity(n - u - MIN_PAIR_SPAN);
            for v in u + MIN_PAIR_SPAN..n {
                if self.pb[[u, v]] > self.theta {
                    row.push(Some(self.model.add_variable()));
                } else {
                    row.push(None);
                }
            }
            self.yuv.push(row);
        }
        for site in &self.sites {
            let vars = site
                .components
                .iter()
                .map(|_| self.model.add_variable())
                .collect();
            self.cxj.push(vars);
        }
    }

    /// Whether y(u, v) exists: the pair is admissible and its posterior
    /// cleared the threshold. Argument order is irrelevant.
    #[must_use]
    pub fn allowed_basepair(&self, u: usize, v: usize) -> bool {
        let (a, b) = if u < v { (u, v) } else { (v, u) };
        self.seq.admissible(a, b) && self.yuv[a][b - a - MIN_PAIR_SPAN].is_some()
    }

    /// The y variable of an allowed pair.
    fn y(&self, u: usize, v: usize) -> VarId {
        let (a, b) = if u < v { (u, v) } else { (v, u) };
        self.yuv[a][b - a - MIN_PAIR_SPAN].expect("y() requires an allowed pair")
    }

    /// The C variable of component j of site x.
    fn c(&self, x: usize, j: usize) -> VarId {
        self.cxj[x][j]
    }

    fn define_constraints(&mut self) {
        let n = self.seq.len();

        // at most one pairing per nucleotide
        for u in 0..n {
            let mut expr = LinExpr::new();
            let mut count = 0usize;
            for v in 0..u {
                if self.allowed_basepair(v, u) {
                    expr.add_term(self.y(v, u), 1.0);
                    count += 1;
                }
            }
            for v in u + MIN_PAIR_SPAN..n {
                if self.allowed_basepair(u, v) {
                    expr.add_term(self.y(u, v), 1.0);
                    count += 1;
                }
            }
            if count > 1 {
                self.model.add_constraint(expr, Sense::Le, 1.0);
            }
        }

        // no lonely pairs, opening side: a pair from u needs a neighbor
        // pair from u-1 or u+1
        for u in 0..n {
            let mut expr = LinExpr::new();
            let mut count = 0usize;
            if u > 0 {
                for v in u..n {
                    if self.allowed_basepair(u - 1, v) {
                        expr.add_term(self.y(u - 1, v), 1.0);
                    }
                }
            }
            for v in u + 1..n {
                if self.allowed_basepair(u, v) {
                    expr.add_term(self.y(u, v), -1.0);
                    count += 1;
                }
            }
            if u + 1 < n {
                for v in u + 2..n {
                    if self.allowed_basepair(u + 1, v) {
                        expr.add_term(self.y(u + 1, v), 1.0);
                    }
                }
            }
            if count > 0 {
                self.model.add_constraint(expr, Sense::Ge, 0.0);
            }
        }
        // no lonely pairs, closing side
        for v in 2..n {
            let mut expr = LinExpr::new();
            let mut count = 0usize;
            for u in 0..v - 1 {
                if self.allowed_basepair(u, v - 1) {
                    expr.add_term(self.y(u, v - 1), 1.0);
                }
            }
            for u in 0..v {
                if self.allowed_basepair(u, v) {
                    expr.add_term(self.y(u, v), -1.0);
                    count += 1;
                }
            }
            if v + 1 < n {
                for u in 0..=v {
                    if self.allowed_basepair(u, v + 1) {
                        expr.add_term(self.y(u, v + 1), 1.0);
                    }
                }
            }
            if count > 0 {
                self.model.add_constraint(expr, Sense::Ge, 0.0);
            }
        }

        // no pair inside an inserted component
        for (x, site) in self.sites.iter().enumerate() {
            for (j, comp) in site.components.iter().enumerate() {
                let k = comp.k as f64;
                let mut expr = LinExpr::new();
                expr.add_term(self.c(x, j), k - 2.0);
                let mut count = 0usize;
                for u in comp.start + 1..comp.end.saturating_sub(2) {
                    for v in 0..n {
                        if self.allowed_basepair(u, v) {
                            expr.add_term(self.y(u, v), 1.0);
                            count += 1;
                        }
                    }
                }
                if count > 1 {
                    self.model.add_constraint(expr, Sense::Le, k - 2.0);
                }
            }
        }

        // no two inserted components may share a position
        for u in 0..n {
            let mut expr = LinExpr::new();
            let mut terms = 0usize;
            for (x, site) in self.sites.iter().enumerate() {
                for (j, comp) in site.components.iter().enumerate() {
                    if comp.contains(u) {
                        expr.add_term(self.c(x, j), 1.0);
                        terms += 1;
                    }
                }
            }
            if terms > 1 {
                self.model.add_constraint(expr, Sense::Le, 1.0);
            }
        }

        // all components of a motif or none
        for (x, site) in self.sites.iter().enumerate() {
            let m = site.components.len();
            if m == 1 {
                continue;
            }
            let mut expr = LinExpr::new();
            for j in 1..m {
                expr.add_term(self.c(x, j), 1.0);
            }
            expr.add_term(self.c(x, 0), -((m - 1) as f64));
            self.model.add_constraint(expr, Sense::Eq, 0.0);
        }

        // an inserted motif is held by its closing pairs; a non-admissible
        // closing pair leaves the right-hand side empty and forces the
        // component out
        for (x, site) in self.sites.iter().enumerate() {
            let first = site.components[0];
            let last = *site.components.last().expect("validated non-empty");
            let mut expr = LinExpr::new();
            expr.add_term(self.c(x, 0), 1.0);
            if self.allowed_basepair(first.start, last.last()) {
                expr.add_term(self.y(first.start, last.last()), -1.0);
            }
            self.model.add_constraint(expr, Sense::Le, 0.0);
            if site.components.len() == 1 {
                continue;
            }
            for j in 0..site.components.len() - 1 {
                let left = site.components[j];
                let right = site.components[j + 1];
                let mut expr = LinExpr::new();
                expr.add_term(self.c(x, j), 1.0);
                if self.allowed_basepair(left.last(), right.start) {
                    expr.add_term(self.y(left.last(), right.start), -1.0);
                }
                self.model.add_constraint(expr, Sense::Le, 0.0);
            }
        }
    }

    fn define_objectives(&mut self) {
        let n = self.seq.len();
        for (x, site) in self.sites.iter().enumerate() {
            self.obj_motifs.add_term(self.c(x, 0), site.score);
        }
        for u in 0..n + 1 - MIN_TAIL_SPAN {
            for v in u + MIN_PAIR_SPAN..n {
                if self.allowed_basepair(u, v) {
                    self.obj_accuracy.add_term(self.y(u, v), self.pb[[u, v]]);
                }
            }
        }
    }

    /// Number of decision variables.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.model.num_variables()
    }

    /// Number of constraints including accumulated no-repeat cuts.
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.model.num_constraints()
    }

    /// Maximize one objective, optionally bounding the other inside
    /// `[lo, hi]`. On success the exact 0/1 assignment found is forbidden
    /// for all later solves by a no-repeat cut. On infeasibility the
    /// empty sentinel is returned.
    ///
    /// # Errors
    ///
    /// Backend failures other than infeasibility.
    pub fn solve_objective(
        &mut self,
        objective: Objective,
        bounds: Option<(f64, f64)>,
    ) -> Result<SecondaryStructure, MotifoldError> {
        let (obj_expr, other_expr) = match objective {
            Objective::MotifCoverage => (&self.obj_motifs, &self.obj_accuracy),
            Objective::ExpectedAccuracy => (&self.obj_accuracy, &self.obj_motifs),
        };
        if !self.quiet {
            match bounds {
                Some((lo, hi)) => eprintln!("solving {objective:?} with the other objective in [{lo}, {hi}]"),
                None => eprintln!("solving {objective:?} unconstrained"),
            }
        }
        let Some(assignment) = self.model.solve(obj_expr, bounds.map(|(lo, hi)| (other_expr, lo, hi)))?
        else {
            if !self.quiet {
                eprintln!("no more solutions in this window");
            }
            return Ok(SecondaryStructure::empty());
        };

        let s = self.read_structure(&assignment);
        self.add_no_repeat_cut(&assignment);
        Ok(s)
    }

    fn read_structure(&self, assignment: &Assignment) -> SecondaryStructure {
        let n = self.seq.len();
        let mut s = SecondaryStructure::new(n);
        // component completeness guarantees the whole motif is in when
        // its first component is
        for (x, site) in self.sites.iter().enumerate() {
            if assignment.is_set(self.c(x, 0)) {
                s.insert_motif(site.clone());
            }
        }
        for u in 0..n + 1 - MIN_TAIL_SPAN {
            for v in u + MIN_PAIR_SPAN..n {
                if self.allowed_basepair(u, v) && assignment.is_set(self.y(u, v)) {
                    s.set_basepair(u, v);
                }
            }
        }
        s.sort();
        s.set_objective_scores(
            self.obj_motifs.eval(assignment),
            self.obj_accuracy.eval(assignment),
        );
        s
    }

    /// Forbid the exact assignment just produced: over the set variables
    /// D and the rest, sum (1 - v) over D plus sum v elsewhere >= 1.
    fn add_no_repeat_cut(&mut self, assignment: &Assignment) {
        let mut cut = LinExpr::new();
        for idx in 0..self.model.num_variables() {
            let var = VarId(idx);
            if assignment.is_set(var) {
                cut.add_term(var, -1.0);
                cut.add_constant(1.0);
            } else {
                cut.add_term(var, 1.0);
            }
        }
        self.model.add_cut(cut, Sense::Ge, 1.0);
    }

    /// Whether no current Pareto member dominates `s`.
    #[must_use]
    pub fn is_undominated(&self, s: &SecondaryStructure) -> bool {
        !self.pareto.iter().any(|t| t.dominates(s))
    }

    /// Insert `s` into the Pareto set, removing every member it
    /// dominates.
    pub fn add_solution(&mut self, s: SecondaryStructure) {
        let quiet = self.quiet;
        self.pareto.retain(|t| {
            let dominated = s.dominates(t);
            if dominated && !quiet {
                eprintln!("dropping dominated structure {t}");
            }
            !dominated
        });
        if !quiet {
            eprintln!("keeping structure {s}");
        }
        self.pareto.push(s);
    }

    /// The epsilon-constraint sweep: maximize expected accuracy with the
    /// motif objective held inside `[lambda_min, lambda_max]`, then
    /// tighten the lower bound to the value just reached and repeat.
    /// Stops on infeasibility, domination, deadline expiry or
    /// cancellation; the Pareto set keeps everything collected so far.
    ///
    /// # Errors
    ///
    /// Backend failures other than infeasibility.
    pub fn extend_pareto(
        &mut self,
        lambda_min: f64,
        lambda_max: f64,
    ) -> Result<(), MotifoldError> {
        let mut lambda_min = lambda_min;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            if let Some(total) = self.limits.total {
                if self.started.elapsed() > total {
                    return Ok(());
                }
            }
            let solve_started = Instant::now();
            let s =
                self.solve_objective(Objective::ExpectedAccuracy, Some((lambda_min, lambda_max)))?;
            let solve_time = solve_started.elapsed();
            if s.is_empty_structure() {
                return Ok(());
            }
            if !self.is_undominated(&s) {
                return Ok(());
            }
            lambda_min = s.motif_coverage();
            self.add_solution(s);
            if let Some(per_solve) = self.limits.per_solve {
                if solve_time > per_solve {
                    return Ok(());
                }
            }
        }
    }

    /// The Pareto set collected so far.
    #[must_use]
    pub fn pareto(&self) -> &[SecondaryStructure] {
        &self.pareto
    }

    /// Consume the program, returning the Pareto set.
    #[must_use]
    pub fn into_pareto(self) -> Vec<SecondaryStructure> {
        self.pareto
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fold::matrices::square;
    use crate::motif::{Component, MotifSource};

    fn quiet_config(theta: f64) -> PredictionConfig {
        PredictionConfig {
            theta,
            quiet: true,
            ..Default::default()
        }
    }

    /// n = 9 sequence with a hand-built posterior concentrated on the
    /// nested helix.
    fn tiny_instance() -> (RnaSequence, Mat) {
        let seq = RnaSequence::new("t", "GGGAAACCC").unwrap();
        let mut pb = square(9);
        pb[[0, 8]] = 0.9;
        pb[[1, 7]] = 0.85;
        pb[[2, 6]] = 0.8;
        pb[[0, 6]] = 0.05;
        pb[[1, 8]] = 0.04;
        (seq, pb)
    }

    #[test]
    fn variables_follow_the_threshold() {
        let (seq, pb) = tiny_instance();
        let moip = Moip::new(&seq, &pb, vec![], &quiet_config(0.1), CancelToken::new()).unwrap();
        assert!(moip.allowed_basepair(0, 8));
        assert!(moip.allowed_basepair(8, 0));
        // below theta
        assert!(!moip.allowed_basepair(0, 6));
        // admissible but zero posterior
        assert!(!moip.allowed_basepair(0, 5));
        // not admissible at all
        assert!(!moip.allowed_basepair(3, 8));
        assert_eq!(moip.num_variables(), 3);
    }

    #[test]
    fn sentinel_rows_never_panic() {
        let (seq, pb) = tiny_instance();
        let moip = Moip::new(&seq, &pb, vec![], &quiet_config(0.0), CancelToken::new()).unwrap();
        for u in 0..9 {
            for v in 0..9 {
                if u != v {
                    let _ = moip.allowed_basepair(u, v);
                }
            }
        }
    }

    #[test]
    fn rejects_invalid_sites() {
        let (seq, pb) = tiny_instance();
        let bad = Motif::new(
            MotifSource::Carnaval { rin_id: 7 },
            vec![Component::new(5, 30)],
            1.0,
        );
        assert!(matches!(
            Moip::new(&seq, &pb, vec![bad], &quiet_config(0.0), CancelToken::new()),
            Err(MotifoldError::InvalidMotif(_))
        ));
    }

    #[test]
    fn dominated_members_are_erased_including_the_first() {
        let (seq, pb) = tiny_instance();
        let mut moip =
            Moip::new(&seq, &pb, vec![], &quiet_config(0.0), CancelToken::new()).unwrap();
        let mut weak = SecondaryStructure::new(9);
        weak.set_objective_scores(1.0, 1.0);
        let mut incomparable = SecondaryStructure::new(9);
        incomparable.set_objective_scores(5.0, 0.5);
        moip.add_solution(weak);
        moip.add_solution(incomparable);
        assert_eq!(moip.pareto().len(), 2);

        // dominates the member sitting at index 0
        let mut strong = SecondaryStructure::new(9);
        strong.set_objective_scores(2.0, 2.0);
        moip.add_solution(strong.clone());
        assert_eq!(moip.pareto().len(), 2);
        assert!(moip.pareto().iter().any(|s| *s == strong));
        assert!(moip
            .pareto()
            .iter()
            .all(|s| !(s.motif_coverage() == 1.0 && s.expected_accuracy() == 1.0)));
    }

    #[cfg(feature = "solver")]
    mod with_solver {
        use super::*;

        #[test]
        fn maximizing_accuracy_picks_the_helix() {
            let (seq, pb) = tiny_instance();
            let mut moip =
                Moip::new(&seq, &pb, vec![], &quiet_config(0.0), CancelToken::new()).unwrap();
            let s = moip
                .solve_objective(Objective::ExpectedAccuracy, None)
                .unwrap();
            assert!(!s.is_empty_structure());
            assert_eq!(s.pairs(), [(0, 8), (1, 7), (2, 6)]);
            assert!((s.expected_accuracy() - 2.55).abs() < 1e-6);
            assert_eq!(s.motif_coverage(), 0.0);
        }

        #[test]
        fn no_repeat_cut_changes_the_next_assignment() {
            let (seq, pb) = tiny_instance();
            let mut moip =
                Moip::new(&seq, &pb, vec![], &quiet_config(0.0), CancelToken::new()).unwrap();
            let first = moip
                .solve_objective(Objective::ExpectedAccuracy, None)
                .unwrap();
            let second = moip
                .solve_objective(Objective::ExpectedAccuracy, None)
                .unwrap();
            assert!(!second.is_empty_structure());
            assert_ne!(first.pairs(), second.pairs());
            assert!(second.expected_accuracy() <= first.expected_accuracy());
        }

        #[test]
        fn non_admissible_closing_pair_blocks_insertion() {
            let (seq, pb) = tiny_instance();
            // two components whose adjacent closing pair (1, 3) is closer
            // than the minimum span
            let site = Motif::new(
                MotifSource::Carnaval { rin_id: 9 },
                vec![Component::new(0, 2), Component::new(3, 5)],
                100.0,
            );
            let mut moip =
                Moip::new(&seq, &pb, vec![site], &quiet_config(0.0), CancelToken::new()).unwrap();
            let s = moip.solve_objective(Objective::MotifCoverage, None).unwrap();
            assert!(!s.is_empty_structure());
            assert!(s.motifs().is_empty());
            assert_eq!(s.motif_coverage(), 0.0);
        }

        #[test]
        fn cancellation_stops_the_sweep_immediately() {
            let (seq, pb) = tiny_instance();
            let cancel = CancelToken::new();
            cancel.cancel();
            let mut moip = Moip::new(&seq, &pb, vec![], &quiet_config(0.0), cancel).unwrap();
            moip.extend_pareto(0.0, 0.0).unwrap();
            assert!(moip.pareto().is_empty());
        }

        #[test]
        fn pareto_members_are_pairwise_incomparable() {
            let (seq, pb) = tiny_instance();
            let site = Motif::new(
                MotifSource::RnaMotifAtlas {
                    atlas_id: "HL_1".into(),
                },
                vec![Component::new(0, 9)],
                10.0,
            );
            let mut moip =
                Moip::new(&seq, &pb, vec![site], &quiet_config(0.0), CancelToken::new()).unwrap();
            moip.extend_pareto(0.0, 10.0).unwrap();
            let pareto = moip.pareto();
            assert!(!pareto.is_empty());
            for a in pareto {
                for b in pareto {
                    assert!(!a.dominates(b));
                }
            }
        }
    }
}
