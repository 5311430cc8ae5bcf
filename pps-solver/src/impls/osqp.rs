use crate::{BranchAndBound, EngineError, QpBackend, QpSolution, QpStatus, QuadraticProgram};
use osqp::{CscMatrix, Problem, Settings, Status};

/// The branch-and-bound engine over OSQP
pub type OsqpEngine = BranchAndBound<OsqpBackend>;

/// Solves leaf programs with the OSQP operator splitting solver.
///
/// OSQP is an ADMM method and is typically less precise than an interior
/// point method, so it polishes every solution.
pub struct OsqpBackend(Settings);

impl QpBackend for OsqpBackend {
    type Settings = Settings;

    fn default_settings() -> Self::Settings {
        Settings::default().verbose(false).polish(true)
    }

    fn new(settings: Self::Settings) -> Self {
        Self(settings)
    }

    fn solve_qp(&self, qp: &QuadraticProgram, verbose: bool) -> Result<QpSolution, EngineError> {
        let p = qp.hessian_csc();
        let a = qp.constraint_csc();

        let p_matrix = CscMatrix {
            nrows: p.m,
            ncols: p.n,
            indptr: p.colptr.into(),
            indices: p.rowval.into(),
            data: p.nzval.into(),
        };
        let a_matrix = CscMatrix {
            nrows: a.m,
            ncols: a.n,
            indptr: a.colptr.into(),
            indices: a.rowval.into(),
            data: a.nzval.into(),
        };

        // OSQP wants l <= Ax <= u; every row here is one-sided
        let lower = vec![f64::NEG_INFINITY; qp.m()];

        let settings = self.0.clone().verbose(verbose);
        let mut problem = Problem::new(&p_matrix, &qp.linear, &a_matrix, &lower, &qp.upper, &settings)
            .map_err(|error| EngineError::Setup(format!("{error:?}")))?;

        match problem.solve() {
            Status::Solved(solution) | Status::SolvedInaccurate(solution) => {
                Ok(QpSolution::solved(solution.x().to_vec()))
            }
            Status::PrimalInfeasible(_) | Status::PrimalInfeasibleInaccurate(_) => {
                Ok(QpSolution::certificate(QpStatus::Infeasible))
            }
            Status::DualInfeasible(_) | Status::DualInfeasibleInaccurate(_) => {
                Ok(QpSolution::certificate(QpStatus::Unbounded))
            }
            _ => Err(EngineError::Backend(
                "osqp stopped without a solution".to_string(),
            )),
        }
    }
}
