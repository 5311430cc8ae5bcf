use crate::{BuildError, Engine, PricingModel, SolveStatus};
use pps_core::{
    models::{OptimizationResult, PricingSettings, Scenario, ValidationError},
    ports::Optimizer,
};

/// Why an optimization call could not be attempted
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    /// The scenario or settings are malformed
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// No usable engine is present
    #[error("no usable optimization engine is available")]
    EngineUnavailable,
    /// The settings are inconsistent with the scenario
    #[error("unable to build the program: {0}")]
    Build(BuildError),
}

impl From<BuildError> for PricingError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Invalid(error) => Self::Validation(error),
            error => Self::Build(error),
        }
    }
}

/// The [`Optimizer`] port over an [`Engine`].
///
/// Each call validates the input, checks the engine, builds a fresh
/// [`PricingModel`], solves it and reads the result back.
pub struct PricingOptimizer<E> {
    engine: E,
}

impl<E: Engine> PricingOptimizer<E> {
    /// Wrap an engine
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Create the engine from its settings
    pub fn with_settings(settings: E::Settings) -> Self {
        Self::new(E::new(settings))
    }

    /// The wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: Engine + Default> Default for PricingOptimizer<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: Engine> Optimizer for PricingOptimizer<E> {
    type Error = PricingError;

    fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    fn optimize(
        &self,
        scenario: &Scenario,
        settings: &PricingSettings,
    ) -> Result<OptimizationResult, Self::Error> {
        scenario.validate()?;
        settings.validate()?;

        if !self.engine.is_available() {
            return Err(PricingError::EngineUnavailable);
        }

        let model = PricingModel::build(scenario, settings)?;

        let solution = match self.engine.solve(model.program(), settings.verbose) {
            Ok(solution) => solution,
            Err(error) => {
                tracing::warn!(%error, "engine failed");
                return Ok(OptimizationResult::error(error.to_string()));
            }
        };

        let result = model.extract(&solution);
        match solution.status {
            SolveStatus::Optimal => tracing::info!(
                objective = result.objective,
                total_usage = result.total_usage,
                nodes = solution.nodes,
                "optimal pricing found"
            ),
            status => tracing::warn!(?status, nodes = solution.nodes, "no optimal pricing"),
        }
        Ok(result)
    }
}
