/// Tunables for a single optimization call.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PricingSettings {
    /// Minimum price gap between successive plans by data limit
    pub margin: f64,
    /// Forward the engine's own diagnostic output. Has no effect on the result.
    pub verbose: bool,
    /// Override for the quantity big-M. When absent it is calibrated from the demand data.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub big_m: Option<f64>,
}

impl PricingSettings {
    /// The margin applied when the caller does not specify one
    pub const DEFAULT_MARGIN: f64 = 5.0;
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            margin: Self::DEFAULT_MARGIN,
            verbose: false,
            big_m: None,
        }
    }
}
