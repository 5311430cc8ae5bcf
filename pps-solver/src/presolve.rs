use crate::{Comparison, Program, QuadraticProgram, Sense, VarKind};
use rustc_hash::FxHashMap;

// Coefficients this small after substitution are cancellation noise.
const DROP: f64 = 1e-12;

/// `constant + Σ coef * x_j`, over original variable indices
#[derive(Clone, Debug)]
struct Affine {
    constant: f64,
    terms: Vec<(usize, f64)>,
}

/// A row in `≤` or `=` form, over the variables still live in the reduction
#[derive(Clone, Debug)]
struct Row {
    terms: Vec<(usize, f64)>,
    rhs: f64,
    equality: bool,
}

impl Row {
    fn substitute(&mut self, var: usize, replacement: &Affine) {
        let Some(pos) = self.terms.iter().position(|(j, _)| *j == var) else {
            return;
        };
        let (_, coef) = self.terms.swap_remove(pos);
        self.rhs -= coef * replacement.constant;
        for &(j, c) in replacement.terms.iter() {
            add_term(&mut self.terms, j, coef * c);
        }
        self.terms.retain(|(_, c)| c.abs() > DROP);
        self.terms.sort_unstable_by_key(|(j, _)| *j);
    }
}

fn add_term(terms: &mut Vec<(usize, f64)>, var: usize, coef: f64) {
    if let Some((_, c)) = terms.iter_mut().find(|(j, _)| *j == var) {
        *c += coef;
    } else {
        terms.push((var, coef));
    }
}

/// The objective, always in minimization form
#[derive(Clone, Debug, Default)]
struct Quadratic {
    constant: f64,
    linear: FxHashMap<usize, f64>,
    // keyed (i, j) with i <= j
    products: FxHashMap<(usize, usize), f64>,
}

impl Quadratic {
    fn substitute(&mut self, var: usize, replacement: &Affine) {
        if let Some(coef) = self.linear.remove(&var) {
            self.constant += coef * replacement.constant;
            for &(j, c) in replacement.terms.iter() {
                *self.linear.entry(j).or_default() += coef * c;
            }
        }

        let touching = self
            .products
            .keys()
            .filter(|(i, j)| *i == var || *j == var)
            .copied()
            .collect::<Vec<_>>();

        for key in touching {
            let Some(coef) = self.products.remove(&key) else {
                continue;
            };
            if key.0 == key.1 {
                // coef * (α + Σ β_j x_j)²
                let alpha = replacement.constant;
                self.constant += coef * alpha * alpha;
                for &(j, b) in replacement.terms.iter() {
                    *self.linear.entry(j).or_default() += 2.0 * coef * alpha * b;
                }
                for &(j, bj) in replacement.terms.iter() {
                    for &(k, bk) in replacement.terms.iter() {
                        if j <= k {
                            let scale = if j == k { 1.0 } else { 2.0 };
                            *self.products.entry((j, k)).or_default() += scale * coef * bj * bk;
                        }
                    }
                }
            } else {
                // coef * x_other * (α + Σ β_j x_j)
                let other = if key.0 == var { key.1 } else { key.0 };
                *self.linear.entry(other).or_default() += coef * replacement.constant;
                for &(j, b) in replacement.terms.iter() {
                    let pair = if j <= other { (j, other) } else { (other, j) };
                    *self.products.entry(pair).or_default() += coef * b;
                }
            }
        }
    }
}

/// Why a leaf has no feasible point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Infeasible;

/// The continuous problem left at a leaf of the search, with everything
/// needed to map its solution back onto the full program.
#[derive(Debug)]
pub(crate) struct Reduction {
    /// Original indices of the variables the QP is over, in QP column order
    pub(crate) live: Vec<usize>,
    /// The QP itself
    pub(crate) qp: QuadraticProgram,
    // (variable, expression) in the order they were eliminated
    eliminated: Vec<(usize, Affine)>,
    n: usize,
}

impl Reduction {
    /// Reduce `program` with every binary fixed to its value in `lower`.
    ///
    /// `lower`/`upper` carry the bounds of every variable (binaries have
    /// `lower == upper`). Constant rows are checked, singleton rows turned into
    /// bounds, fixed variables substituted out and every equality (explicit,
    /// or an opposing pair of inequalities) used to eliminate one variable.
    pub(crate) fn new(
        program: &Program,
        lower: &[f64],
        upper: &[f64],
        tolerance: f64,
    ) -> Result<Self, Infeasible> {
        let n = program.variables().len();
        let mut lower = lower.to_vec();
        let mut upper = upper.to_vec();
        let mut alive = vec![true; n];
        let mut eliminated = Vec::new();

        let mut rows = program
            .constraints()
            .iter()
            .map(|constraint| {
                let terms = constraint.terms.iter().map(|(var, coef)| (var.index(), *coef));
                match constraint.cmp {
                    Comparison::Le => Row {
                        terms: terms.collect(),
                        rhs: constraint.rhs,
                        equality: false,
                    },
                    Comparison::Ge => Row {
                        terms: terms.map(|(j, c)| (j, -c)).collect(),
                        rhs: -constraint.rhs,
                        equality: false,
                    },
                    Comparison::Eq => Row {
                        terms: terms.collect(),
                        rhs: constraint.rhs,
                        equality: true,
                    },
                }
            })
            .collect::<Vec<_>>();

        let sign = match program.sense() {
            Sense::Maximize => -1.0,
            Sense::Minimize => 1.0,
        };
        let mut objective = Quadratic {
            constant: sign * program.objective().linear().offset(),
            ..Default::default()
        };
        for (var, coef) in program.objective().linear().terms() {
            *objective.linear.entry(var.index()).or_default() += sign * coef;
        }
        for (x, y, coef) in program.objective().products() {
            *objective.products.entry((x.index(), y.index())).or_default() += sign * coef;
        }

        // Binaries are fixed by the search; they go first.
        for (j, var) in program.variables().iter().enumerate() {
            if var.kind == VarKind::Binary {
                fix(j, lower[j], &mut alive, &mut rows, &mut objective, &mut eliminated);
            }
        }

        let slack = |rhs: f64| tolerance * (1.0 + rhs.abs());

        'presolve: loop {
            // Constant rows and singleton rows
            let mut i = 0;
            while i < rows.len() {
                let row = &rows[i];
                match row.terms.as_slice() {
                    [] => {
                        let ok = if row.equality {
                            row.rhs.abs() <= slack(row.rhs)
                        } else {
                            row.rhs >= -slack(row.rhs)
                        };
                        if !ok {
                            return Err(Infeasible);
                        }
                        rows.swap_remove(i);
                    }
                    &[(j, c)] => {
                        let bound = row.rhs / c;
                        if row.equality || c > 0.0 {
                            upper[j] = upper[j].min(bound);
                        }
                        if row.equality || c < 0.0 {
                            lower[j] = lower[j].max(bound);
                        }
                        rows.swap_remove(i);
                    }
                    _ => i += 1,
                }
            }

            // Collapsed bounds
            for j in 0..n {
                if !alive[j] {
                    continue;
                }
                let width = upper[j] - lower[j];
                if width < -slack(lower[j]) {
                    return Err(Infeasible);
                }
                if width <= slack(lower[j]) {
                    let value = 0.5 * (lower[j] + upper[j]);
                    fix(j, value, &mut alive, &mut rows, &mut objective, &mut eliminated);
                    continue 'presolve;
                }
            }

            // Opposing inequality pairs
            for a in 0..rows.len() {
                if rows[a].equality {
                    continue;
                }
                for b in (a + 1)..rows.len() {
                    if rows[b].equality {
                        continue;
                    }
                    let Some(ratio) = opposing(&rows[a], &rows[b]) else {
                        continue;
                    };
                    // rows[b] is ratio * rows[a] with ratio < 0, so together
                    // they read  rows[b].rhs / ratio <= lhs_a <= rows[a].rhs
                    let floor = rows[b].rhs / ratio;
                    let ceiling = rows[a].rhs;
                    if floor > ceiling + slack(ceiling) {
                        return Err(Infeasible);
                    }
                    if floor >= ceiling - slack(ceiling) {
                        rows[a].rhs = 0.5 * (floor + ceiling);
                        rows[a].equality = true;
                        rows.swap_remove(b);
                        continue 'presolve;
                    }
                }
            }

            // Eliminate through an equality
            if let Some(i) = rows.iter().position(|row| row.equality) {
                let row = rows.swap_remove(i);
                let &(pivot, c) = row
                    .terms
                    .iter()
                    .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                    .ok_or(Infeasible)?;

                let replacement = Affine {
                    constant: row.rhs / c,
                    terms: row
                        .terms
                        .iter()
                        .filter(|(j, _)| *j != pivot)
                        .map(|&(j, coef)| (j, -coef / c))
                        .collect(),
                };

                // The pivot's bounds now constrain the rest of the row
                if lower[pivot].is_finite() {
                    rows.push(Row {
                        terms: replacement.terms.iter().map(|&(j, b)| (j, -b)).collect(),
                        rhs: replacement.constant - lower[pivot],
                        equality: false,
                    });
                }
                if upper[pivot].is_finite() {
                    rows.push(Row {
                        terms: replacement.terms.clone(),
                        rhs: upper[pivot] - replacement.constant,
                        equality: false,
                    });
                }

                eliminate(pivot, replacement, &mut alive, &mut rows, &mut objective, &mut eliminated);
                continue 'presolve;
            }

            break;
        }

        // What is left is a QP over the surviving variables, with their
        // bounds written out as rows.
        let live = (0..n).filter(|&j| alive[j]).collect::<Vec<_>>();
        let column = live
            .iter()
            .enumerate()
            .map(|(col, &j)| (j, col))
            .collect::<FxHashMap<_, _>>();

        let mut qp = QuadraticProgram {
            n: live.len(),
            linear: live
                .iter()
                .map(|j| objective.linear.get(j).copied().unwrap_or_default())
                .collect(),
            ..Default::default()
        };

        for (&(i, j), &coef) in objective.products.iter() {
            if coef.abs() <= DROP {
                continue;
            }
            let (ci, cj) = (column[&i], column[&j]);
            let (r, c) = if ci <= cj { (ci, cj) } else { (cj, ci) };
            qp.hessian
                .push((r, c, if ci == cj { 2.0 * coef } else { coef }));
        }
        qp.hessian.sort_unstable_by_key(|&(r, c, _)| (c, r));

        for row in rows {
            qp.rows
                .push(row.terms.iter().map(|&(j, c)| (column[&j], c)).collect());
            qp.upper.push(row.rhs);
        }
        for (col, &j) in live.iter().enumerate() {
            if lower[j].is_finite() {
                qp.rows.push(vec![(col, -1.0)]);
                qp.upper.push(-lower[j]);
            }
            if upper[j].is_finite() {
                qp.rows.push(vec![(col, 1.0)]);
                qp.upper.push(upper[j]);
            }
        }

        Ok(Self {
            live,
            qp,
            eliminated,
            n,
        })
    }

    /// Whether P is positive semidefinite, i.e. the reduction is a convex QP
    pub(crate) fn is_convex(&self) -> bool {
        let k = self.qp.n;
        let mut dense = vec![0.0; k * k];
        for &(r, c, value) in self.qp.hessian.iter() {
            dense[r * k + c] += value;
            if r != c {
                dense[c * k + r] += value;
            }
        }
        let scale = dense.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let shift = 1e-9 * (1.0 + scale);
        for i in 0..k {
            dense[i * k + i] += shift;
        }
        cholesky_succeeds(&mut dense, k)
    }

    /// Map a point of the QP (one value per live variable) back to every
    /// variable of the original program
    pub(crate) fn recover(&self, x: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.n];
        for (&j, &value) in self.live.iter().zip(x) {
            values[j] = value;
        }
        for (j, affine) in self.eliminated.iter().rev() {
            values[*j] = affine.constant
                + affine
                    .terms
                    .iter()
                    .map(|&(k, c)| c * values[k])
                    .sum::<f64>();
        }
        values
    }
}

fn fix(
    var: usize,
    value: f64,
    alive: &mut [bool],
    rows: &mut [Row],
    objective: &mut Quadratic,
    eliminated: &mut Vec<(usize, Affine)>,
) {
    let replacement = Affine {
        constant: value,
        terms: Vec::new(),
    };
    eliminate(var, replacement, alive, rows, objective, eliminated);
}

fn eliminate(
    var: usize,
    replacement: Affine,
    alive: &mut [bool],
    rows: &mut [Row],
    objective: &mut Quadratic,
    eliminated: &mut Vec<(usize, Affine)>,
) {
    for row in rows.iter_mut() {
        row.substitute(var, &replacement);
    }
    objective.substitute(var, &replacement);
    alive[var] = false;
    eliminated.push((var, replacement));
}

/// If `b` is a negative multiple of `a` (same variables), return the multiple
fn opposing(a: &Row, b: &Row) -> Option<f64> {
    if a.terms.len() != b.terms.len() || a.terms.is_empty() {
        return None;
    }
    let ratio = b.terms[0].1 / a.terms[0].1;
    if !(ratio < 0.0) || !ratio.is_finite() {
        return None;
    }
    let same = a.terms.iter().zip(b.terms.iter()).all(|(&(ja, ca), &(jb, cb))| {
        ja == jb && (cb - ratio * ca).abs() <= 1e-9 * (1.0 + cb.abs())
    });
    same.then_some(ratio)
}

fn cholesky_succeeds(a: &mut [f64], k: usize) -> bool {
    for j in 0..k {
        let mut d = a[j * k + j];
        for p in 0..j {
            d -= a[j * k + p] * a[j * k + p];
        }
        if !(d > 0.0) {
            return false;
        }
        let d = d.sqrt();
        a[j * k + j] = d;
        for i in (j + 1)..k {
            let mut s = a[i * k + j];
            for p in 0..j {
                s -= a[i * k + p] * a[j * k + p];
            }
            a[i * k + j] = s / d;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearExpr;
    use approx::assert_abs_diff_eq;

    // max (p - 2) q   s.t.  q = 100 - 2p  (written as a big-M pair with x = 1)
    fn single_curve(x: f64) -> (Program, Vec<f64>, Vec<f64>) {
        let mut program = Program::new("curve");
        let p = program.continuous("p", 0.0, f64::INFINITY);
        let q = program.continuous("q", 0.0, f64::INFINITY);
        let choice = program.binary("x");
        let m = 1000.0;
        program.constrain(
            "zero",
            q,
            Comparison::Le,
            LinearExpr::new().term(choice, m),
        );
        program.constrain(
            "upper",
            q,
            Comparison::Le,
            LinearExpr::constant(100.0 + m).term(p, -2.0).term(choice, -m),
        );
        program.constrain(
            "lower",
            q,
            Comparison::Ge,
            LinearExpr::constant(100.0 - m).term(p, -2.0).term(choice, m),
        );
        let mut profit = crate::QuadExpr::new();
        profit.add_product(p, q, 1.0);
        profit.add_term(q, -2.0);
        program.set_objective(Sense::Maximize, profit);

        let lower = vec![0.0, 0.0, x];
        let upper = vec![f64::INFINITY, f64::INFINITY, x];
        (program, lower, upper)
    }

    #[test]
    fn test_chosen_curve_is_eliminated() {
        let (program, lower, upper) = single_curve(1.0);
        let reduction = Reduction::new(&program, &lower, &upper, 1e-9).unwrap();

        // Only one of p, q survives, with a strictly convex objective
        assert_eq!(reduction.live.len(), 1);
        assert!(reduction.is_convex());
        assert_eq!(reduction.qp.hessian.len(), 1);
        assert!(reduction.qp.hessian[0].2 > 0.0);

        // Whatever survived, recovering puts the point back on the curve
        let values = reduction.recover(&[10.0]);
        assert_abs_diff_eq!(values[1], 100.0 - 2.0 * values[0], epsilon = 1e-9);
        assert_eq!(values[2], 1.0);
    }

    #[test]
    fn test_unchosen_curve_zeroes_quantity() {
        let (program, lower, upper) = single_curve(0.0);
        let reduction = Reduction::new(&program, &lower, &upper, 1e-9).unwrap();

        // q is pinned at zero, leaving p free with a zero objective
        assert_eq!(reduction.live, vec![0]);
        assert!(reduction.qp.hessian.is_empty());
        assert_eq!(reduction.qp.linear, vec![0.0]);

        let values = reduction.recover(&[7.0]);
        assert_eq!(values, vec![7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_contradiction() {
        let mut program = Program::new("bad");
        let x = program.continuous("x", 0.0, 1.0);
        program.constrain("high", x, Comparison::Ge, LinearExpr::constant(2.0));
        let result = Reduction::new(&program, &[0.0], &[1.0], 1e-9);
        assert_eq!(result.unwrap_err(), Infeasible);
    }

    #[test]
    fn test_nonconvex_detected() {
        // max x * y is indefinite once nothing pins either variable
        let mut program = Program::new("saddle");
        let x = program.continuous("x", 0.0, 1.0);
        let y = program.continuous("y", 0.0, 1.0);
        let mut objective = crate::QuadExpr::new();
        objective.add_product(x, y, 1.0);
        program.set_objective(Sense::Maximize, objective);

        let reduction =
            Reduction::new(&program, &[0.0, 0.0], &[1.0, 1.0], 1e-9).unwrap();
        assert!(!reduction.is_convex());
    }
}
