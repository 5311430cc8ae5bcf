use clap::ValueEnum;
use pps_core::models::{OptimizationResult, PricingSettings, Scenario};
use schemars::{Schema, schema_for};

// The JSON documents the tools read or write
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum Document {
    /// The `solve` and `export` input
    Scenario,
    /// The `solve` output
    Result,
    /// The `[pricing]` section of the config file
    Settings,
}

impl Document {
    pub fn schema(&self) -> Schema {
        match self {
            Self::Scenario => schema_for!(Scenario),
            Self::Result => schema_for!(OptimizationResult),
            Self::Settings => schema_for!(PricingSettings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_schema() {
        let schema = serde_json::to_value(Document::Scenario.schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        for key in ["plans", "segments", "capacity"] {
            assert!(properties.contains_key(key), "{key}");
        }
    }
}
