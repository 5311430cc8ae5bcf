use crate::EngineConfig;
use clap::ValueEnum;
use pps_core::{
    models::{OptimizationResult, PricingSettings, Scenario},
    ports::Optimizer,
};
use pps_solver::{
    BranchAndBound, PricingError, PricingOptimizer, QpBackend, clarabel::ClarabelBackend,
    osqp::OsqpBackend,
};

// The QP backends the branch-and-bound can run on
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum EngineLib {
    Clarabel,
    Osqp,
}

// Every backend gets the configured search limits and its own defaults
fn optimizer<B: QpBackend>(engine: &EngineConfig) -> PricingOptimizer<BranchAndBound<B>> {
    PricingOptimizer::with_settings(engine.settings(B::default_settings()))
}

impl EngineLib {
    pub fn optimize(
        &self,
        scenario: &Scenario,
        settings: &PricingSettings,
        engine: &EngineConfig,
    ) -> Result<OptimizationResult, PricingError> {
        match self {
            Self::Clarabel => optimizer::<ClarabelBackend>(engine).optimize(scenario, settings),
            Self::Osqp => optimizer::<OsqpBackend>(engine).optimize(scenario, settings),
        }
    }

    pub fn is_available(&self, engine: &EngineConfig) -> bool {
        match self {
            Self::Clarabel => optimizer::<ClarabelBackend>(engine).is_available(),
            Self::Osqp => optimizer::<OsqpBackend>(engine).is_available(),
        }
    }
}
