use super::{Plan, PlanId, PricingSettings, Segment, SegmentId};
use rustc_hash::FxHashSet;

/// Everything an optimizer needs to price a catalog: the plans, the segments
/// that may buy them, and the capacity they share.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario {
    /// The plans on offer, in any order
    pub plans: Vec<Plan>,
    /// The customer segments
    #[cfg_attr(feature = "serde", serde(default))]
    pub segments: Vec<Segment>,
    /// Upper bound on total usage, summed over every plan and segment
    pub capacity: f64,
}

impl Scenario {
    /// Check the scenario for anything that would make the program malformed.
    ///
    /// This is a pure function of the data; it does not consult any engine.
    /// The first problem encountered is reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.plans.is_empty() {
            return Err(ValidationError::NoPlans);
        }

        let mut plan_ids = FxHashSet::default();
        for Plan {
            id,
            data_limit,
            cost,
            ..
        } in self.plans.iter()
        {
            if !plan_ids.insert(id) {
                return Err(ValidationError::DuplicatePlan(id.clone()));
            }
            if !data_limit.is_finite() || *data_limit <= 0.0 {
                return Err(ValidationError::DataLimit {
                    plan: id.clone(),
                    value: *data_limit,
                });
            }
            if !cost.is_finite() || *cost < 0.0 {
                return Err(ValidationError::Cost {
                    plan: id.clone(),
                    value: *cost,
                });
            }
        }

        let mut segment_ids = FxHashSet::default();
        for segment in self.segments.iter() {
            if !segment_ids.insert(&segment.id) {
                return Err(ValidationError::DuplicateSegment(segment.id.clone()));
            }
            if let Some(plan) = segment.demand.keys().find(|plan| !plan_ids.contains(plan)) {
                return Err(ValidationError::UnknownPlan {
                    segment: segment.id.clone(),
                    plan: plan.clone(),
                });
            }
        }

        if !self.capacity.is_finite() || self.capacity < 0.0 {
            return Err(ValidationError::Capacity(self.capacity));
        }

        Ok(())
    }

    /// The plans in ascending `data_limit` order.
    ///
    /// The sort is stable, so plans with equal limits keep the order the
    /// caller gave them in.
    pub fn sorted_plans(&self) -> Vec<&Plan> {
        self.ladder()
            .into_iter()
            .map(|index| &self.plans[index])
            .collect()
    }

    /// Positions into `plans`, in the order of [`Self::sorted_plans`]
    pub fn ladder(&self) -> Vec<usize> {
        let mut ladder = (0..self.plans.len()).collect::<Vec<_>>();
        ladder.sort_by(|&a, &b| self.plans[a].data_limit.total_cmp(&self.plans[b].data_limit));
        ladder
    }
}

impl PricingSettings {
    /// Check the settings for values no program could honor
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ValidationError::Margin(self.margin));
        }
        match self.big_m {
            Some(m) if !m.is_finite() || m <= 0.0 => Err(ValidationError::BigM(m)),
            _ => Ok(()),
        }
    }
}

/// The ways in which a scenario (or the settings it is solved with) can be malformed.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Error when there is nothing to price
    #[error("at least one plan is required")]
    NoPlans,
    /// Error when two plans share an id
    #[error("duplicate plan id {0}")]
    DuplicatePlan(PlanId),
    /// Error when two segments share an id
    #[error("duplicate segment id {0}")]
    DuplicateSegment(SegmentId),
    /// Error when a data limit is zero, negative or not finite
    #[error("plan {plan} has data limit {value}, which must be positive and finite")]
    DataLimit {
        /// The offending plan
        plan: PlanId,
        /// The offending value
        value: f64,
    },
    /// Error when a cost is negative or not finite
    #[error("plan {plan} has cost {value}, which must be non-negative and finite")]
    Cost {
        /// The offending plan
        plan: PlanId,
        /// The offending value
        value: f64,
    },
    /// Error when a segment carries demand for a plan that is not on offer
    #[error("segment {segment} has demand for unknown plan {plan}")]
    UnknownPlan {
        /// The offending segment
        segment: SegmentId,
        /// The plan id it references
        plan: PlanId,
    },
    /// Error when the capacity is negative or not finite
    #[error("capacity {0} must be non-negative and finite")]
    Capacity(f64),
    /// Error when the price margin is negative or not finite
    #[error("margin {0} must be non-negative and finite")]
    Margin(f64),
    /// Error when a big-M override is not a positive finite number
    #[error("big-M override {0} must be positive and finite")]
    BigM(f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DemandCurve;

    fn scenario() -> Scenario {
        Scenario {
            plans: vec![
                Plan::new("P2", "Standard", 10.0, 5.0),
                Plan::new("P1", "Entry", 1.0, 2.0),
            ],
            segments: vec![
                Segment::new("S", "Everyone", 100.0)
                    .with_demand("P1", DemandCurve::new(100.0, 2.0).unwrap()),
            ],
            capacity: 1000.0,
        }
    }

    #[test]
    fn test_valid() {
        assert_eq!(scenario().validate(), Ok(()));
    }

    #[test]
    fn test_sorted() {
        let scenario = scenario();
        let ids = scenario
            .sorted_plans()
            .into_iter()
            .map(|plan| plan.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["P1", "P2"]);
    }

    #[test]
    fn test_sorted_is_stable() {
        let scenario = Scenario {
            plans: vec![
                Plan::new("B", "", 5.0, 0.0),
                Plan::new("A", "", 5.0, 0.0),
                Plan::new("C", "", 1.0, 0.0),
            ],
            ..Default::default()
        };
        let ids = scenario
            .sorted_plans()
            .into_iter()
            .map(|plan| plan.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["C", "B", "A"]);
        assert_eq!(scenario.ladder(), vec![2, 0, 1]);
    }

    #[test]
    fn test_no_plans() {
        let scenario = Scenario {
            capacity: 10.0,
            ..Default::default()
        };
        assert_eq!(scenario.validate(), Err(ValidationError::NoPlans));
    }

    #[test]
    fn test_bad_plans() {
        let mut bad = scenario();
        bad.plans[0].data_limit = 0.0;
        assert!(matches!(bad.validate(), Err(ValidationError::DataLimit { .. })));

        let mut bad = scenario();
        bad.plans[1].cost = -1.0;
        assert!(matches!(bad.validate(), Err(ValidationError::Cost { .. })));

        let mut bad = scenario();
        bad.plans[1].id = "P2".into();
        assert_eq!(
            bad.validate(),
            Err(ValidationError::DuplicatePlan("P2".into()))
        );
    }

    #[test]
    fn test_bad_segments() {
        let mut bad = scenario();
        bad.segments.push(bad.segments[0].clone());
        assert_eq!(
            bad.validate(),
            Err(ValidationError::DuplicateSegment("S".into()))
        );

        let mut bad = scenario();
        bad.segments[0]
            .demand
            .insert("P9".into(), DemandCurve::ZERO);
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::UnknownPlan { .. })
        ));
    }

    #[test]
    fn test_bad_capacity() {
        let mut bad = scenario();
        bad.capacity = -1.0;
        assert_eq!(bad.validate(), Err(ValidationError::Capacity(-1.0)));

        bad.capacity = f64::INFINITY;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_settings() {
        assert_eq!(PricingSettings::default().validate(), Ok(()));
        assert_eq!(PricingSettings::default().margin, 5.0);

        let settings = PricingSettings {
            margin: -1.0,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(ValidationError::Margin(-1.0)));

        let settings = PricingSettings {
            big_m: Some(0.0),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(ValidationError::BigM(0.0)));
    }
}
