use crate::{BranchAndBound, EngineError, QpBackend, QpSolution, QpStatus, QuadraticProgram};
use clarabel::{algebra::*, solver::*};

/// The branch-and-bound engine over Clarabel
pub type ClarabelEngine = BranchAndBound<ClarabelBackend>;

/// Solves leaf programs with the Clarabel interior point solver
pub struct ClarabelBackend(DefaultSettings<f64>);

impl QpBackend for ClarabelBackend {
    type Settings = DefaultSettings<f64>;

    fn default_settings() -> Self::Settings {
        let mut settings = DefaultSettings::default();
        settings.verbose = false;
        settings
    }

    fn new(settings: Self::Settings) -> Self {
        Self(settings)
    }

    fn solve_qp(&self, qp: &QuadraticProgram, verbose: bool) -> Result<QpSolution, EngineError> {
        let p = qp.hessian_csc();
        let a = qp.constraint_csc();

        let p_matrix = CscMatrix::new(p.m, p.n, p.colptr, p.rowval, p.nzval);
        let a_matrix = CscMatrix::new(a.m, a.n, a.colptr, a.rowval, a.nzval);

        // Every row is Ax + s = b with s >= 0
        let cones = [NonnegativeConeT(qp.m())];

        let mut settings = self.0.clone();
        settings.verbose = verbose;

        let mut solver =
            DefaultSolver::new(&p_matrix, &qp.linear, &a_matrix, &qp.upper, &cones, settings)
                .into_solver()?;
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                Ok(QpSolution::solved(solver.solution.x.clone()))
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Ok(QpSolution::certificate(QpStatus::Infeasible))
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                Ok(QpSolution::certificate(QpStatus::Unbounded))
            }
            status => Err(EngineError::Backend(format!("clarabel stopped with {status:?}"))),
        }
    }
}

/// `DefaultSolver::new` checks the problem data and returns a `Result` in
/// newer clarabel releases, the bare solver in older ones
trait IntoSolver {
    fn into_solver(self) -> Result<DefaultSolver<f64>, EngineError>;
}

impl IntoSolver for DefaultSolver<f64> {
    fn into_solver(self) -> Result<DefaultSolver<f64>, EngineError> {
        Ok(self)
    }
}

impl<E: std::fmt::Debug> IntoSolver for Result<DefaultSolver<f64>, E> {
    fn into_solver(self) -> Result<DefaultSolver<f64>, EngineError> {
        self.map_err(|error| EngineError::Setup(format!("{error:?}")))
    }
}
