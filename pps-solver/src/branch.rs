use crate::presolve::Reduction;
use crate::{
    Comparison, Engine, EngineError, Program, QpBackend, QpStatus, Sense, Solution, SolveStatus,
    VarKind,
};

/// Settings for [`BranchAndBound`], wrapping those of its backend
#[derive(Clone, Debug)]
pub struct EngineSettings<S> {
    /// Passed through to the continuous backend
    pub backend: S,
    /// The search fails once it has visited this many nodes
    pub max_nodes: usize,
    /// Feasibility tolerance for propagation and presolve, relative to the
    /// magnitude of each right-hand side
    pub tolerance: f64,
}

impl<S> EngineSettings<S> {
    /// Default limits around the given backend settings
    pub fn with_backend(backend: S) -> Self {
        Self {
            backend,
            max_nodes: 100_000,
            tolerance: 1e-7,
        }
    }
}

/// A depth-first branch-and-bound over the binary variables of a program.
///
/// Every leaf fixes all binaries; what remains is reduced to a convex,
/// continuous quadratic program and handed to the backend `B`. Nodes are cut
/// by propagation and, when the program carries an [`crate::ObjectiveBound`],
/// by comparing its estimate with the incumbent; the child with the better
/// estimate is explored first. Neither cut discards a leaf that could beat the
/// incumbent, so the best leaf is a global optimum of the program whenever
/// every leaf is convex.
pub struct BranchAndBound<B> {
    backend: B,
    max_nodes: usize,
    tolerance: f64,
}

impl<B: QpBackend> Default for BranchAndBound<B> {
    fn default() -> Self {
        Self::new(EngineSettings::with_backend(B::default_settings()))
    }
}

impl<B: QpBackend> Engine for BranchAndBound<B> {
    type Settings = EngineSettings<B::Settings>;

    fn new(settings: Self::Settings) -> Self {
        Self {
            backend: B::new(settings.backend),
            max_nodes: settings.max_nodes,
            tolerance: settings.tolerance,
        }
    }

    fn is_available(&self) -> bool {
        self.backend.probe()
    }

    fn solve(&self, program: &Program, verbose: bool) -> Result<Solution, EngineError> {
        let mut search = Search::new(self, program, verbose);

        tracing::debug!(
            program = program.name(),
            variables = program.variables().len(),
            constraints = program.constraints().len(),
            branching = search.branching.len(),
            reporting = search.reporting.len(),
            "starting branch-and-bound"
        );

        let mut lower = search.lower.clone();
        let mut upper = search.upper.clone();
        if search.propagate(&mut lower, &mut upper) {
            let estimate = search.estimate(&lower, &upper);
            search.visit(0, estimate, lower, upper)?;
        } else {
            tracing::trace!("root pruned by propagation");
        }

        let Search {
            nodes,
            leaves,
            best,
            unbounded,
            reporting,
            ..
        } = search;

        if unbounded {
            tracing::debug!(nodes, leaves, "unbounded leaf found");
            return Ok(Solution::without_point(SolveStatus::Unbounded, nodes));
        }

        let Some((_, mut values)) = best else {
            tracing::debug!(nodes, leaves, "no feasible leaf");
            return Ok(Solution::without_point(SolveStatus::Infeasible, nodes));
        };

        // Reporting flags were held at 1; drop each one nobody relies on.
        for var in reporting {
            values[var] = 0.0;
            let holds = program
                .constraints()
                .iter()
                .filter(|constraint| constraint.terms.iter().any(|(v, _)| v.index() == var))
                .all(|constraint| constraint.is_satisfied(&values, self.tolerance));
            if !holds {
                values[var] = 1.0;
            }
        }

        let objective = program.objective().evaluate(&values);
        tracing::debug!(nodes, leaves, objective, "search complete");
        Ok(Solution::optimal(objective, values, nodes))
    }
}

/// A constraint row in `Σ c_j x_j <= rhs` form
struct Row {
    terms: Vec<(usize, f64)>,
    rhs: f64,
}

struct Search<'a, B> {
    engine: &'a BranchAndBound<B>,
    program: &'a Program,
    verbose: bool,
    rows: Vec<Row>,
    // binaries the search decides, in variable order
    branching: Vec<usize>,
    // binaries held at 1 and settled after the search
    reporting: Vec<usize>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    nodes: usize,
    leaves: usize,
    best: Option<(f64, Vec<f64>)>,
    unbounded: bool,
}

impl<'a, B: QpBackend> Search<'a, B> {
    fn new(engine: &'a BranchAndBound<B>, program: &'a Program, verbose: bool) -> Self {
        let mut rows = Vec::with_capacity(program.constraints().len());
        for constraint in program.constraints() {
            let terms = constraint
                .terms
                .iter()
                .map(|(var, coef)| (var.index(), *coef))
                .collect::<Vec<_>>();
            let negated = terms.iter().map(|&(j, c)| (j, -c)).collect::<Vec<_>>();
            match constraint.cmp {
                Comparison::Le => rows.push(Row {
                    terms,
                    rhs: constraint.rhs,
                }),
                Comparison::Ge => rows.push(Row {
                    terms: negated,
                    rhs: -constraint.rhs,
                }),
                Comparison::Eq => {
                    rows.push(Row {
                        terms,
                        rhs: constraint.rhs,
                    });
                    rows.push(Row {
                        terms: negated,
                        rhs: -constraint.rhs,
                    });
                }
            }
        }

        let mut lower = Vec::with_capacity(program.variables().len());
        let mut upper = Vec::with_capacity(program.variables().len());
        let mut branching = Vec::new();
        let mut reporting = Vec::new();

        for (j, var) in program.variables().iter().enumerate() {
            if var.kind == VarKind::Continuous {
                lower.push(var.lower);
                upper.push(var.upper);
                continue;
            }

            // Equalities appear as an opposing pair, so a binary that only
            // ever carries a non-positive coefficient only relaxes rows.
            let relaxes = rows
                .iter()
                .flat_map(|row| row.terms.iter())
                .filter(|(v, _)| *v == j)
                .all(|(_, c)| *c <= 0.0);
            let idle = !program.objective().mentions(crate::VarId(j));

            if relaxes && idle {
                reporting.push(j);
                lower.push(1.0);
                upper.push(1.0);
            } else {
                branching.push(j);
                lower.push(0.0);
                upper.push(1.0);
            }
        }

        Self {
            engine,
            program,
            verbose,
            rows,
            branching,
            reporting,
            lower,
            upper,
            nodes: 0,
            leaves: 0,
            best: None,
            unbounded: false,
        }
    }

    fn slack(&self, rhs: f64) -> f64 {
        self.engine.tolerance * (1.0 + rhs.abs())
    }

    /// Tighten binary bounds until nothing changes. Returns false if some row
    /// cannot be satisfied within the current bounds.
    fn propagate(&self, lower: &mut [f64], upper: &mut [f64]) -> bool {
        loop {
            let mut changed = false;
            for row in self.rows.iter() {
                let min_activity = row
                    .terms
                    .iter()
                    .map(|&(j, c)| if c > 0.0 { c * lower[j] } else { c * upper[j] })
                    .sum::<f64>();
                if !min_activity.is_finite() {
                    continue;
                }
                let limit = row.rhs + self.slack(row.rhs);
                if min_activity > limit {
                    return false;
                }
                for &(j, c) in row.terms.iter() {
                    if lower[j] == upper[j] || self.program.variables()[j].kind != VarKind::Binary {
                        continue;
                    }
                    if c > 0.0 && min_activity + c > limit {
                        upper[j] = 0.0;
                        changed = true;
                    } else if c < 0.0 && min_activity - c > limit {
                        lower[j] = 1.0;
                        changed = true;
                    }
                }
                if changed {
                    // Activities of later rows are stale; start over.
                    break;
                }
            }
            if !changed {
                return true;
            }
        }
    }

    /// The bound's estimate for a node, if the program has one
    fn estimate(&self, lower: &[f64], upper: &[f64]) -> Option<f64> {
        self.program.bound().map(|bound| bound.estimate(lower, upper))
    }

    /// Whether estimate `a` is strictly more promising than `b`
    fn prefers(&self, a: Option<f64>, b: Option<f64>) -> bool {
        match (a, b, self.program.sense()) {
            (Some(a), Some(b), Sense::Maximize) => a > b,
            (Some(a), Some(b), Sense::Minimize) => a < b,
            _ => false,
        }
    }

    /// Whether no leaf below a node with this estimate can beat the incumbent
    fn is_dominated(&self, estimate: Option<f64>) -> bool {
        let Some(estimate) = estimate else {
            return false;
        };
        let sense = self.program.sense();
        let hopeless = match sense {
            Sense::Maximize => estimate == f64::NEG_INFINITY,
            Sense::Minimize => estimate == f64::INFINITY,
        };
        if hopeless {
            return true;
        }
        let Some((best, _)) = &self.best else {
            return false;
        };
        let slack = self.slack(*best);
        match sense {
            Sense::Maximize => estimate <= best + slack,
            Sense::Minimize => estimate >= best - slack,
        }
    }

    /// Explore a node whose bounds have already been propagated
    fn visit(
        &mut self,
        depth: usize,
        estimate: Option<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<(), EngineError> {
        if self.unbounded {
            return Ok(());
        }
        self.nodes += 1;
        if self.nodes > self.engine.max_nodes {
            return Err(EngineError::NodeLimit(self.engine.max_nodes));
        }
        if self.is_dominated(estimate) {
            tracing::trace!(node = self.nodes, depth, ?estimate, "pruned by bound");
            return Ok(());
        }

        let next = self.branching[depth..]
            .iter()
            .position(|&j| lower[j] != upper[j])
            .map(|offset| depth + offset);

        let Some(depth) = next else {
            return self.leaf(&lower, &upper);
        };

        let var = self.branching[depth];
        let mut children = Vec::with_capacity(2);
        for value in [1.0, 0.0] {
            let mut lower = lower.clone();
            let mut upper = upper.clone();
            lower[var] = value;
            upper[var] = value;
            if self.propagate(&mut lower, &mut upper) {
                let estimate = self.estimate(&lower, &upper);
                children.push((estimate, lower, upper));
            } else {
                tracing::trace!(node = self.nodes, depth, value, "pruned by propagation");
            }
        }
        if children.len() == 2 && self.prefers(children[1].0, children[0].0) {
            children.swap(0, 1);
        }

        for (estimate, lower, upper) in children {
            self.visit(depth + 1, estimate, lower, upper)?;
        }
        Ok(())
    }

    fn leaf(&mut self, lower: &[f64], upper: &[f64]) -> Result<(), EngineError> {
        self.leaves += 1;
        let node = self.nodes;

        let Ok(reduction) = Reduction::new(self.program, lower, upper, self.engine.tolerance)
        else {
            tracing::trace!(node, "leaf infeasible in presolve");
            return Ok(());
        };
        if !reduction.is_convex() {
            return Err(EngineError::NonConvex { node });
        }

        let x = if reduction.qp.n == 0 {
            Vec::new()
        } else {
            let mut qp = reduction.qp.clone();
            qp.ensure_rows();
            let solution = self.engine.backend.solve_qp(&qp, self.verbose)?;
            match solution.status {
                QpStatus::Solved => solution.x,
                QpStatus::Infeasible => {
                    tracing::trace!(node, "leaf infeasible");
                    return Ok(());
                }
                QpStatus::Unbounded => {
                    tracing::trace!(node, "leaf unbounded");
                    self.unbounded = true;
                    return Ok(());
                }
            }
        };

        let values = reduction.recover(&x);
        let objective = self.program.objective().evaluate(&values);
        tracing::trace!(node, objective, "leaf solved");

        let improves = match &self.best {
            None => true,
            Some((best, _)) => {
                let slack = self.slack(*best);
                match self.program.sense() {
                    Sense::Maximize => objective > best + slack,
                    Sense::Minimize => objective < best - slack,
                }
            }
        };
        if improves {
            self.best = Some((objective, values));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LinearExpr, QpSolution, QuadExpr, QuadraticProgram};
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;

    /// Solves only the trivial programs these tests produce: a single
    /// variable with a diagonal objective and box rows.
    struct Scalar {
        solves: Cell<usize>,
    }

    impl QpBackend for Scalar {
        type Settings = ();

        fn default_settings() {}

        fn new(_: ()) -> Self {
            Self {
                solves: Cell::new(0),
            }
        }

        fn solve_qp(&self, qp: &QuadraticProgram, _: bool) -> Result<QpSolution, EngineError> {
            assert_eq!(qp.n, 1);
            self.solves.set(self.solves.get() + 1);
            let (mut lo, mut hi) = (f64::NEG_INFINITY, f64::INFINITY);
            for (row, &rhs) in qp.rows.iter().zip(qp.upper.iter()) {
                match row.as_slice() {
                    [] if rhs < 0.0 => return Ok(QpSolution::certificate(QpStatus::Infeasible)),
                    [] => {}
                    &[(_, c)] if c > 0.0 => hi = hi.min(rhs / c),
                    &[(_, c)] => lo = lo.max(rhs / c),
                    _ => panic!("unexpected row"),
                }
            }
            if lo > hi {
                return Ok(QpSolution::certificate(QpStatus::Infeasible));
            }
            let p = qp.hessian.first().map(|h| h.2).unwrap_or_default();
            let q = qp.linear[0];
            let x = if p > 0.0 {
                (-q / p).clamp(lo, hi)
            } else if q > 0.0 {
                lo
            } else if q < 0.0 {
                hi
            } else {
                lo.max(hi.min(0.0))
            };
            if !x.is_finite() {
                return Ok(QpSolution::certificate(QpStatus::Unbounded));
            }
            Ok(QpSolution::solved(vec![x]))
        }
    }

    // Choose one of two curves for a price p; the flag `used` reports whether
    // the second one was picked.
    fn two_curves() -> Program {
        let mut program = Program::new("two");
        let p = program.continuous("p", 0.0, f64::INFINITY);
        let mut profit = QuadExpr::new();
        let mut pick = LinearExpr::new();
        let m = 1000.0;
        let mut choices = Vec::new();
        for (i, (a, b)) in [(100.0, 2.0), (80.0, 1.0)].into_iter().enumerate() {
            let q = program.continuous(format!("q{i}"), 0.0, f64::INFINITY);
            let x = program.binary(format!("x{i}"));
            program.constrain("zero", q, Comparison::Le, LinearExpr::new().term(x, m));
            program.constrain(
                "upper",
                q,
                Comparison::Le,
                LinearExpr::constant(a + m).term(p, -b).term(x, -m),
            );
            program.constrain(
                "lower",
                q,
                Comparison::Ge,
                LinearExpr::constant(a - m).term(p, -b).term(x, m),
            );
            profit.add_product(p, q, 1.0);
            pick.add_term(x, 1.0);
            choices.push(x);
        }
        program.constrain("pick", pick, Comparison::Eq, LinearExpr::constant(1.0));
        let used = program.binary("used");
        program.constrain(
            "used",
            choices[1],
            Comparison::Le,
            LinearExpr::from(used),
        );
        program.set_objective(Sense::Maximize, profit);
        program
    }

    #[test]
    fn test_best_leaf_wins() {
        let engine = BranchAndBound::<Scalar>::new(EngineSettings::with_backend(()));
        let program = two_curves();
        let solution = engine.solve(&program, false).unwrap();

        // p(100 - 2p) peaks at 1250, p(80 - p) at 1600
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(solution.objective.unwrap(), 1600.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.values[0], 40.0, epsilon = 1e-6);
        assert_eq!(solution.values[2], 0.0);
        assert_eq!(solution.values[4], 1.0);
        assert_eq!(solution.values[5], 1.0);
        assert!(program.is_feasible(&solution.values, 1e-6));
    }

    /// The peak profit of each curve in `two_curves` that is still allowed
    #[derive(Debug)]
    struct Peaks;

    impl crate::ObjectiveBound for Peaks {
        fn estimate(&self, _: &[f64], upper: &[f64]) -> f64 {
            [(2, 1250.0), (4, 1600.0)]
                .into_iter()
                .filter(|&(choice, _)| upper[choice] == 1.0)
                .map(|(_, peak)| peak)
                .fold(f64::NEG_INFINITY, f64::max)
        }
    }

    #[test]
    fn test_bound_prunes() {
        let engine = BranchAndBound::<Scalar>::new(EngineSettings::with_backend(()));
        let program = two_curves();
        let plain = engine.solve(&program, false).unwrap();
        assert_eq!(engine.backend.solves.get(), 2);

        let engine = BranchAndBound::<Scalar>::new(EngineSettings::with_backend(()));
        let mut program = two_curves();
        program.set_bound(Peaks);
        let pruned = engine.solve(&program, false).unwrap();

        // The second curve is explored first and its leaf beats the
        // first curve's peak, so that leaf is never solved.
        assert_eq!(engine.backend.solves.get(), 1);
        assert_eq!(pruned.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(
            pruned.objective.unwrap(),
            plain.objective.unwrap(),
            epsilon = 1e-6
        );
        assert_eq!(pruned.values, plain.values);
    }

    #[test]
    fn test_bound_cleared_with_objective() {
        let mut program = two_curves();
        program.set_bound(Peaks);
        assert!(program.bound().is_some());
        program.set_objective(Sense::Maximize, QuadExpr::new());
        assert!(program.bound().is_none());
    }

    #[test]
    fn test_reporting_flag_dropped() {
        let engine = BranchAndBound::<Scalar>::new(EngineSettings::with_backend(()));
        let mut program = two_curves();
        // Make the first curve the better one
        let p = crate::VarId(0);
        let q0 = crate::VarId(1);
        let mut profit = QuadExpr::new();
        profit.add_product(p, q0, 2.0);
        profit.add_product(p, crate::VarId(3), 1.0);
        program.set_objective(Sense::Maximize, profit);

        let solution = engine.solve(&program, false).unwrap();
        assert_eq!(solution.values[2], 1.0);
        assert_eq!(solution.values[4], 0.0);
        assert_eq!(solution.values[5], 0.0);
    }

    #[test]
    fn test_infeasible() {
        let engine = BranchAndBound::<Scalar>::new(EngineSettings::with_backend(()));
        let mut program = Program::new("none");
        let x = program.binary("x");
        let y = program.binary("y");
        program.constrain(
            "both",
            LinearExpr::from(x).term(y, 1.0),
            Comparison::Ge,
            LinearExpr::constant(3.0),
        );
        let solution = engine.solve(&program, false).unwrap();
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_node_limit() {
        let engine = BranchAndBound::<Scalar>::new(EngineSettings {
            backend: (),
            max_nodes: 2,
            tolerance: 1e-7,
        });
        let result = engine.solve(&two_curves(), false);
        assert!(matches!(result, Err(EngineError::NodeLimit(2))));
    }
}
