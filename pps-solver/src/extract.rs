use crate::{PricingModel, Solution, SolveStatus};
use pps_core::models::{Map, OptimizationResult, Status};

impl PricingModel {
    /// Read a solution of this model's program back into business terms.
    ///
    /// Binaries are rounded, a quantity is zero whenever its segment is not
    /// served by the plan and otherwise clamped at zero, and the total usage is
    /// recomputed from the quantities rather than taken from the objective.
    /// Only an optimal solution yields values.
    pub fn extract(&self, solution: &Solution) -> OptimizationResult {
        let objective = match (solution.status, solution.objective) {
            (SolveStatus::Optimal, Some(objective)) => objective,
            (SolveStatus::Unbounded, _) => {
                return OptimizationResult::infeasible("the program is unbounded");
            }
            _ => return OptimizationResult::infeasible("the program is infeasible"),
        };

        let value = |var: crate::VarId| solution.value(var).unwrap_or_default();
        let flag = |var: crate::VarId| u8::from(value(var) > 0.5);

        let mut prices = Map::with_capacity(self.plans.len());
        let mut quantities = Map::with_capacity(self.plans.len());
        let mut choices = Map::with_capacity(self.plans.len());
        let mut active = Map::with_capacity(self.plans.len());
        let mut total_usage = 0.0;

        for plan in self.plans.iter() {
            prices.insert(plan.id.clone(), value(plan.price));
            active.insert(plan.id.clone(), flag(plan.active));

            let mut row_qty = Map::with_capacity(self.segments.len());
            let mut row_choice = Map::with_capacity(self.segments.len());
            for (segment, &(choice, qty)) in self.segments.iter().zip(plan.assignments.iter()) {
                let chosen = flag(choice);
                let qty = if chosen == 1 { value(qty).max(0.0) } else { 0.0 };
                total_usage += qty * plan.data_limit;
                row_qty.insert(segment.clone(), qty);
                row_choice.insert(segment.clone(), chosen);
            }
            quantities.insert(plan.id.clone(), row_qty);
            choices.insert(plan.id.clone(), row_choice);
        }

        OptimizationResult {
            status: Status::Optimal,
            objective: Some(objective),
            prices,
            quantities,
            choices,
            active,
            total_usage,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{PricingModel, Solution, SolveStatus};
    use pps_core::models::{DemandCurve, Plan, PlanId, PricingSettings, Scenario, Segment, Status};

    fn model() -> PricingModel {
        let scenario = Scenario {
            plans: vec![Plan::new("P1", "", 1.0, 2.0), Plan::new("P2", "", 10.0, 5.0)],
            segments: vec![
                Segment::new("S", "", 1.0)
                    .with_demand("P1", DemandCurve::new(100.0, 2.0).unwrap())
                    .with_demand("P2", DemandCurve::new(80.0, 1.0).unwrap()),
            ],
            capacity: 1000.0,
        };
        PricingModel::build(&scenario, &PricingSettings::default()).unwrap()
    }

    #[test]
    fn test_optimal() {
        let model = model();
        // price[P1], price[P2], choice[P1,S], qty[P1,S], choice[P2,S], qty[P2,S], active[P1], active[P2]
        let values = vec![26.0, 31.0, 1.0, 48.0, 0.0, 1e-9, 1.0, 0.0];
        let solution = Solution {
            status: SolveStatus::Optimal,
            objective: Some(24.0 * 48.0),
            values,
            nodes: 3,
        };
        let result = model.extract(&solution);

        assert_eq!(result.status, Status::Optimal);
        assert_eq!(result.objective, Some(1152.0));
        assert_eq!(result.prices[&PlanId::from("P1")], 26.0);
        assert_eq!(result.choice(&"P1".into(), &"S".into()), Some(1));
        assert_eq!(result.quantity(&"P2".into(), &"S".into()), Some(0.0));
        assert_eq!(result.chosen_plan(&"S".into()), Some(&PlanId::from("P1")));
        assert_eq!(result.active[&PlanId::from("P2")], 0);
        assert_eq!(result.total_usage, 48.0);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_non_optimal() {
        let model = model();
        for status in [SolveStatus::Infeasible, SolveStatus::Unbounded] {
            let result = model.extract(&Solution {
                status,
                objective: None,
                values: Vec::new(),
                nodes: 1,
            });
            assert_eq!(result.status, Status::Infeasible);
            assert!(result.objective.is_none());
            assert!(result.prices.is_empty());
            assert!(result.message.is_some());
        }
    }
}
