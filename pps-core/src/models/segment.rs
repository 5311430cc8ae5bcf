use super::{DemandCurve, Map, PlanId, SegmentId};

/// A slice of the customer population with its own price sensitivity.
///
/// Demand is keyed by plan id. A plan without an entry gets
/// [`DemandCurve::ZERO`]: the segment may still be assigned that plan, but it
/// will consume nothing there.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// The unique key of the segment
    pub id: SegmentId,
    /// A display name, not used by the optimization
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// The number of customers in the segment. Informational only.
    #[cfg_attr(feature = "serde", serde(default))]
    pub size: f64,
    /// The demand curve for each plan
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "schemars", schemars(with = "Map<PlanId, super::DemandCurveDto>"))]
    pub demand: Map<PlanId, DemandCurve>,
}

impl Segment {
    /// An empty segment, with no demand for anything
    pub fn new(id: impl Into<SegmentId>, name: impl Into<String>, size: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            demand: Map::default(),
        }
    }

    /// Builder-style helper to set the demand curve for a plan
    pub fn with_demand(mut self, plan: impl Into<PlanId>, curve: DemandCurve) -> Self {
        self.demand.insert(plan.into(), curve);
        self
    }

    /// The demand curve for `plan`, defaulting to the zero curve
    pub fn demand_for(&self, plan: &PlanId) -> DemandCurve {
        self.demand.get(plan).copied().unwrap_or_default()
    }
}
