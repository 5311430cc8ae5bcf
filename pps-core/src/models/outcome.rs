use super::{Map, PlanId, SegmentId};

/// How an optimization call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// A provably optimal pricing was found
    Optimal,
    /// The program has no optimal solution (infeasible or unbounded)
    Infeasible,
    /// The engine failed while solving
    Error,
}

/// The outcome of one optimization call.
///
/// Only an [`Status::Optimal`] result carries values. Every other status comes
/// with empty mappings, no objective and, usually, a message.
///
/// Pair-keyed values are nested by plan, then segment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationResult {
    /// How the solve ended
    pub status: Status,
    /// Total profit, present only when optimal
    pub objective: Option<f64>,
    /// The price of each plan
    pub prices: Map<PlanId, f64>,
    /// The usage quantity of each segment under each plan (zero unless chosen)
    pub quantities: Map<PlanId, Map<SegmentId, f64>>,
    /// 1 when the segment is served by the plan, 0 otherwise
    pub choices: Map<PlanId, Map<SegmentId, u8>>,
    /// 1 when at least one segment is served by the plan
    pub active: Map<PlanId, u8>,
    /// Total usage, recomputed from the quantities and data limits
    pub total_usage: f64,
    /// Why there are no values, for any status other than optimal
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub message: Option<String>,
}

impl OptimizationResult {
    /// A valueless result for an infeasible or unbounded program
    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::empty(Status::Infeasible, message.into())
    }

    /// A valueless result for an engine failure
    pub fn error(message: impl Into<String>) -> Self {
        Self::empty(Status::Error, message.into())
    }

    fn empty(status: Status, message: String) -> Self {
        Self {
            status,
            objective: None,
            prices: Map::default(),
            quantities: Map::default(),
            choices: Map::default(),
            active: Map::default(),
            total_usage: 0.0,
            message: Some(message),
        }
    }

    /// Whether the result carries values
    pub fn is_optimal(&self) -> bool {
        self.status == Status::Optimal
    }

    /// The usage of `segment` under `plan`
    pub fn quantity(&self, plan: &PlanId, segment: &SegmentId) -> Option<f64> {
        self.quantities.get(plan)?.get(segment).copied()
    }

    /// Whether `segment` is served by `plan`
    pub fn choice(&self, plan: &PlanId, segment: &SegmentId) -> Option<u8> {
        self.choices.get(plan)?.get(segment).copied()
    }

    /// The plan serving `segment`, if any
    pub fn chosen_plan(&self, segment: &SegmentId) -> Option<&PlanId> {
        self.choices
            .iter()
            .find(|(_, row)| row.get(segment).is_some_and(|&x| x == 1))
            .map(|(plan, _)| plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_results() {
        let result = OptimizationResult::infeasible("capacity too small");
        assert_eq!(result.status, Status::Infeasible);
        assert!(!result.is_optimal());
        assert!(result.objective.is_none());
        assert!(result.prices.is_empty());
        assert_eq!(result.message.as_deref(), Some("capacity too small"));

        let result = OptimizationResult::error("numerical trouble");
        assert_eq!(result.status, Status::Error);
        assert!(result.choices.is_empty());
    }

    #[test]
    fn test_lookup() {
        let plan = PlanId::from("P1");
        let segment = SegmentId::from("S1");
        let mut result = OptimizationResult::infeasible("");
        result.status = Status::Optimal;
        result.message = None;
        result.quantities.insert(
            plan.clone(),
            std::iter::once((segment.clone(), 12.5)).collect(),
        );
        result
            .choices
            .insert(plan.clone(), std::iter::once((segment.clone(), 1)).collect());

        assert_eq!(result.quantity(&plan, &segment), Some(12.5));
        assert_eq!(result.choice(&plan, &segment), Some(1));
        assert_eq!(result.chosen_plan(&segment), Some(&plan));
        assert_eq!(result.chosen_plan(&"S2".into()), None);
    }

    #[test]
    fn test_serialize() {
        let value = serde_json::to_value(OptimizationResult::infeasible("no")).unwrap();
        assert_eq!(value["status"], "Infeasible");
        assert_eq!(value["objective"], serde_json::Value::Null);
        assert_eq!(value["message"], "no");
    }
}
