use super::PlanId;

/// A product tier offered to every segment.
///
/// `data_limit` is the usage one purchase of the plan consumes against the
/// shared capacity, and `cost` is the seller's marginal cost per unit sold.
/// Plans are ordered by `data_limit` when prices are laid out, since a plan
/// with a larger allowance may never be cheaper than a smaller one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plan {
    /// The unique key of the plan
    pub id: PlanId,
    /// A display name, not used by the optimization
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Usage consumed per unit sold; must be positive
    pub data_limit: f64,
    /// Marginal cost per unit sold; must be non-negative
    pub cost: f64,
}

impl Plan {
    /// Convenience constructor; validation happens on the enclosing scenario
    pub fn new(id: impl Into<PlanId>, name: impl Into<String>, data_limit: f64, cost: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_limit,
            cost,
        }
    }
}
