use crate::EngineError;

/// A convex, continuous quadratic program in the form
///
/// ```text
/// minimize    ½ xᵀPx + qᵀx
/// subject to  Ax <= b
/// ```
///
/// This is what the branch-and-bound search hands to a [`QpBackend`] once
/// every binary is fixed and the equalities are eliminated.
#[derive(Clone, Debug, Default)]
pub struct QuadraticProgram {
    /// Number of variables
    pub n: usize,
    /// Upper-triangular entries `(row, col, value)` of P, `row <= col`
    pub hessian: Vec<(usize, usize, f64)>,
    /// The linear objective q
    pub linear: Vec<f64>,
    /// Rows of A as `(col, value)` pairs
    pub rows: Vec<Vec<(usize, f64)>>,
    /// The right-hand side b
    pub upper: Vec<f64>,
}

impl QuadraticProgram {
    /// Number of constraint rows
    pub fn m(&self) -> usize {
        self.rows.len()
    }

    /// P in compressed sparse column form
    pub fn hessian_csc(&self) -> Csc {
        Csc::from_triplets(self.n, self.n, self.hessian.iter().copied())
    }

    /// A in compressed sparse column form
    pub fn constraint_csc(&self) -> Csc {
        Csc::from_triplets(
            self.m(),
            self.n,
            self.rows
                .iter()
                .enumerate()
                .flat_map(|(i, row)| row.iter().map(move |&(j, value)| (i, j, value))),
        )
    }

    /// Both backends choke on an empty constraint set, so pad with `0 <= 1`
    pub(crate) fn ensure_rows(&mut self) {
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
            self.upper.push(1.0);
        }
    }
}

/// A compressed sparse column matrix, in the layout both backends expect
#[derive(Clone, Debug, PartialEq)]
pub struct Csc {
    /// Number of rows
    pub m: usize,
    /// Number of columns
    pub n: usize,
    /// Column start offsets, length `n + 1`
    pub colptr: Vec<usize>,
    /// Row index of each stored value
    pub rowval: Vec<usize>,
    /// The stored values
    pub nzval: Vec<f64>,
}

impl Csc {
    /// Build from `(row, col, value)` triplets. Duplicates are summed and
    /// exact zeros dropped; rows are sorted within each column.
    pub fn from_triplets(m: usize, n: usize, triplets: impl Iterator<Item = (usize, usize, f64)>) -> Self {
        let mut entries = triplets.collect::<Vec<_>>();
        entries.sort_unstable_by_key(|&(i, j, _)| (j, i));

        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::with_capacity(entries.len());
        let mut nzval = Vec::with_capacity(entries.len());

        let mut entries = entries.into_iter().peekable();
        for col in 0..n {
            colptr.push(rowval.len());
            while let Some(&(row, _, mut value)) = entries.peek().filter(|(_, j, _)| *j == col) {
                entries.next();
                while let Some((_, _, more)) = entries
                    .peek()
                    .copied()
                    .filter(|&(i, j, _)| i == row && j == col)
                {
                    value += more;
                    entries.next();
                }
                if value != 0.0 {
                    rowval.push(row);
                    nzval.push(value);
                }
            }
        }
        colptr.push(rowval.len());

        Self {
            m,
            n,
            colptr,
            rowval,
            nzval,
        }
    }
}

/// How a continuous solve ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QpStatus {
    /// Solved to the backend's tolerance
    Solved,
    /// Certified primal infeasible
    Infeasible,
    /// Certified dual infeasible: the objective is unbounded below
    Unbounded,
}

/// A backend's answer for one quadratic program
#[derive(Clone, Debug)]
pub struct QpSolution {
    /// How the solve ended
    pub status: QpStatus,
    /// The primal point, when solved
    pub x: Vec<f64>,
}

impl QpSolution {
    /// A solved outcome
    pub fn solved(x: Vec<f64>) -> Self {
        Self {
            status: QpStatus::Solved,
            x,
        }
    }

    /// An outcome without a point
    pub fn certificate(status: QpStatus) -> Self {
        Self {
            status,
            x: Vec::new(),
        }
    }
}

/// A solver for convex, continuous quadratic programs.
///
/// Implementations wrap a third-party library; the branch-and-bound engine
/// does the rest.
pub trait QpBackend {
    /// The configuration type for this backend
    type Settings;

    /// The settings a backend runs with unless told otherwise
    fn default_settings() -> Self::Settings;

    /// Create a new instance with the provided settings
    fn new(settings: Self::Settings) -> Self;

    /// Solve a convex quadratic program
    fn solve_qp(&self, qp: &QuadraticProgram, verbose: bool) -> Result<QpSolution, EngineError>;

    /// Solve `min (x - 1)²  s.t. x >= 0` and check the answer
    fn probe(&self) -> bool {
        let qp = QuadraticProgram {
            n: 1,
            hessian: vec![(0, 0, 2.0)],
            linear: vec![-2.0],
            rows: vec![vec![(0, -1.0)]],
            upper: vec![0.0],
        };
        match self.solve_qp(&qp, false) {
            Ok(QpSolution {
                status: QpStatus::Solved,
                x,
            }) => x.first().is_some_and(|x| (x - 1.0).abs() < 1e-4),
            _ => false,
        }
    }
}
