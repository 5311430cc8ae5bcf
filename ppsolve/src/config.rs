//! Layered configuration for the command-line tools.
//!
//! Values come from, in increasing priority: the built-in defaults, a TOML
//! file named with `--config`, and `PPS_`-prefixed environment variables.
//! Command-line flags are applied on top by the caller.

use pps_core::models::PricingSettings;
use pps_solver::EngineSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run can be configured with
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct AppConfig {
    /// Margin, verbosity and big-M override
    #[serde(default)]
    pub pricing: PricingSettings,

    /// Limits for the branch-and-bound search
    #[serde(default)]
    pub engine: EngineConfig,
}

/// The backend-independent part of the engine settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// The search fails after visiting this many nodes
    pub max_nodes: usize,
    /// Feasibility tolerance for propagation and presolve
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let defaults = EngineSettings::with_backend(());
        Self {
            max_nodes: defaults.max_nodes,
            tolerance: defaults.tolerance,
        }
    }
}

impl EngineConfig {
    /// Engine settings around the given backend settings
    pub fn settings<S>(&self, backend: S) -> EngineSettings<S> {
        EngineSettings {
            backend,
            max_nodes: self.max_nodes,
            tolerance: self.tolerance,
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. The config file, if given
    /// 3. Default values (lowest priority)
    ///
    /// Environment variables are mapped using the pattern
    /// `PPS_<SECTION>__<KEY>` to `<section>.<key>`:
    ///
    /// ```bash
    /// export PPS_PRICING__MARGIN=2.5
    /// export PPS_ENGINE__MAX_NODES=5000
    /// ```
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if path.exists() {
                config = config.add_source(config::File::from(path))
            } else {
                return Err(anyhow::anyhow!(
                    "Config file {} does not exist",
                    path.display()
                ));
            }
        }

        config = config.add_source(
            config::Environment::with_prefix("PPS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = config.build()?.try_deserialize::<Self>()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }
}
