use crate::{Program, VarId};

/// The Engine trait defines the interface for mixed-integer quadratic solvers.
///
/// An Engine takes a fully formulated [`Program`] and either reports an
/// optimal point, reports that none exists, or fails. It must not assume
/// anything about where the program came from; the pricing model is just one
/// producer of programs.
pub trait Engine {
    /// The configuration type for this engine
    type Settings;

    /// Create a new instance with the provided settings
    fn new(settings: Self::Settings) -> Self;

    /// Whether the engine is present and usable in this process
    fn is_available(&self) -> bool;

    /// Solve the program, blocking until done.
    ///
    /// `verbose` forwards the engine's own diagnostic output and never
    /// changes the answer.
    fn solve(&self, program: &Program, verbose: bool) -> Result<Solution, EngineError>;
}

/// How a solve ended, when it ended without failing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal point was found
    Optimal,
    /// No point satisfies the constraints
    Infeasible,
    /// The objective improves without limit
    Unbounded,
}

/// The engine's answer.
#[derive(Clone, Debug)]
pub struct Solution {
    /// How the solve ended
    pub status: SolveStatus,
    /// The objective value at `values`, when optimal
    pub objective: Option<f64>,
    /// A value per program variable, when optimal; empty otherwise
    pub values: Vec<f64>,
    /// Number of search nodes visited
    pub nodes: usize,
}

impl Solution {
    pub(crate) fn optimal(objective: f64, values: Vec<f64>, nodes: usize) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective: Some(objective),
            values,
            nodes,
        }
    }

    pub(crate) fn without_point(status: SolveStatus, nodes: usize) -> Self {
        Self {
            status,
            objective: None,
            values: Vec::new(),
            nodes,
        }
    }

    /// The value of a variable, if the solve produced a point
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }
}

/// The ways an engine can fail, as opposed to proving there is no optimum.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The continuous backend rejected the problem it was handed
    #[error("backend setup failed: {0}")]
    Setup(String),
    /// The continuous backend stopped without a usable answer
    #[error("backend failed: {0}")]
    Backend(String),
    /// A relaxation had negative curvature in its minimization form
    #[error("subproblem at node {node} is not convex")]
    NonConvex {
        /// The search node that produced the subproblem
        node: usize,
    },
    /// The search visited more nodes than allowed
    #[error("node limit of {0} reached before the search completed")]
    NodeLimit(usize),
}
