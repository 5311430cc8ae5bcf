/// Leaf solves with the Clarabel interior point solver
#[cfg(feature = "clarabel")]
pub mod clarabel;

/// Leaf solves with the OSQP operator splitting solver
#[cfg(feature = "osqp")]
pub mod osqp;
