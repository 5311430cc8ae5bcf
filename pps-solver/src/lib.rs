#![warn(missing_docs)]
//! The pricing model and the engines that solve it.
//!
//! A [`PricingModel`] turns a [`pps_core::models::Scenario`] into a
//! [`Program`]: price, choice, quantity and activation variables, the big-M
//! rows tying quantities to the demand curves, and a profit objective with a
//! `price * qty` product in it. Any [`Engine`] that can handle binaries and a
//! quadratic objective can solve it; [`BranchAndBound`] is the reference
//! engine, branching on the binaries, pruning with the profit bound the model
//! attaches, and handing the convex leaf problems to a [`QpBackend`]. [`PricingOptimizer`] ties the pieces together behind the
//! [`pps_core::ports::Optimizer`] port.

/**
 * A solver-agnostic representation of mixed-integer programs with a
 * quadratic objective.
 */
mod program;
pub use program::*;

mod engine;
pub use engine::*;

mod qp;
pub use qp::*;

mod presolve;

mod branch;
pub use branch::*;

/**
 * Implementations of the continuous backend.
 */
mod impls;
pub use impls::*;

mod builder;
pub use builder::*;

mod extract;

mod optimizer;
pub use optimizer::*;

/// Writers for standard model file formats
pub mod export;
