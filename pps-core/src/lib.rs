#![warn(missing_docs)]
//! Domain models and ports for pricing a catalog of tiered plans.
//!
//! A seller offers a handful of plans (ordered by their usage allowance) to a
//! number of customer segments, each of which reacts to price along a linear
//! demand curve. The seller wants the prices, and the resulting assignment of
//! segments to plans, that maximize total profit without exceeding a shared
//! capacity. This crate holds the vocabulary for that problem; the
//! optimization itself lives behind the [`ports::Optimizer`] trait.

/// Core domain models for the pricing problem.
///
/// These are plain data structures with validation at their boundaries.
/// Anything that reaches an optimizer through a [`models::Scenario`] that has
/// passed [`models::Scenario::validate`] is well-formed.
pub mod models;

/// Interface traits for the pricing system.
///
/// The optimizer is the only port: callers hand it a scenario and receive an
/// [`models::OptimizationResult`], without knowing which mathematical
/// programming engine did the work.
pub mod ports;
