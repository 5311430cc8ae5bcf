use crate::models::{OptimizationResult, PricingSettings, Scenario};

/// Interface for anything that can price a catalog.
///
/// A call is synchronous and self-contained: it builds its own program,
/// blocks until the engine finishes and holds no state afterwards. Callers
/// that need to stay responsive should run it on a worker thread.
///
/// Implementations report infeasible programs and engine failures through the
/// [`OptimizationResult::status`]; the `Err` path is reserved for calls that
/// should never have been made (malformed input, no usable engine).
pub trait Optimizer {
    /// Error type for calls that could not be attempted
    type Error: std::error::Error;

    /// Whether an engine is present and usable. Callers check this before
    /// offering a solve action.
    fn is_available(&self) -> bool;

    /// Price the scenario.
    ///
    /// # Arguments
    ///
    /// - `scenario`: the plans, segments and capacity
    /// - `settings`: margin, verbosity and big-M override
    fn optimize(
        &self,
        scenario: &Scenario,
        settings: &PricingSettings,
    ) -> Result<OptimizationResult, Self::Error>;
}
