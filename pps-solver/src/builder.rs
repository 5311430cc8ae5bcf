mod bound;
use bound::{DemandBound, Offer};

use crate::{Comparison, LinearExpr, Program, QuadExpr, Sense, VarId};
use pps_core::models::{PlanId, PricingSettings, Scenario, SegmentId, ValidationError};

/// The big-M constants of a pricing model.
///
/// `quantity` switches the demand-curve rows on and off. It has to exceed any
/// quantity and any curve value a price up to `price` can produce, or it would
/// cut off valid assignments; larger values are correct but numerically weaker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BigM {
    /// No useful price exceeds this
    pub price: f64,
    /// No quantity or curve value exceeds this
    pub quantity: f64,
}

impl BigM {
    /// Derive the tightest constants the demand data supports.
    ///
    /// A price above every choke price sells nothing, and the ordering ladder
    /// can lift the top plan by at most `|plans| * margin` beyond that. The
    /// quantity bound then covers the largest intercept and the largest swing
    /// any slope can produce over that price range.
    pub fn calibrate(scenario: &Scenario, margin: f64) -> Self {
        let curves = || {
            scenario.segments.iter().flat_map(|segment| {
                scenario
                    .plans
                    .iter()
                    .map(|plan| segment.demand_for(&plan.id))
            })
        };

        let choke = curves()
            .filter_map(|curve| curve.choke_price())
            .fold(0.0, f64::max);
        let price = choke + scenario.plans.len() as f64 * margin;

        let max_a = curves().map(|curve| curve.intercept()).fold(0.0, f64::max);
        let max_b = curves().map(|curve| curve.slope()).fold(0.0, f64::max);
        let quantity = (max_a + max_b * price).max(1.0);

        Self { price, quantity }
    }
}

/// The ways a model can fail to build
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The scenario or settings are malformed
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The big-M override would cut off prices or demand the scenario allows
    #[error("big-M {big_m} must be at least {required} and exceed every demand intercept")]
    BigMTooSmall {
        /// The override that was supplied
        big_m: f64,
        /// The calibrated quantity big-M, the smallest value that can be accepted
        required: f64,
    },
}

/// The decision variables for one plan
#[derive(Debug)]
pub(crate) struct PlanVars {
    pub(crate) id: PlanId,
    pub(crate) data_limit: f64,
    pub(crate) price: VarId,
    pub(crate) active: VarId,
    /// `(choice, qty)` for each segment, in segment order
    pub(crate) assignments: Vec<(VarId, VarId)>,
}

/// A pricing scenario, formulated as a mixed-integer program.
///
/// The model is built for a single optimization call and remembers which
/// variables mean what, so that a [`crate::Solution`] of its program can be
/// read back into an [`pps_core::models::OptimizationResult`].
#[derive(Debug)]
pub struct PricingModel {
    pub(crate) program: Program,
    pub(crate) big_m: BigM,
    pub(crate) plans: Vec<PlanVars>,
    pub(crate) segments: Vec<SegmentId>,
}

impl PricingModel {
    /// Formulate `scenario` under `settings`.
    ///
    /// With `qty = choice * (a - b * price)` written as a big-M disjunction,
    /// the only nonlinearity left is the `price * qty` product in the profit.
    pub fn build(scenario: &Scenario, settings: &PricingSettings) -> Result<Self, BuildError> {
        scenario.validate()?;
        settings.validate()?;

        // An unchosen pair caps its plan's price at (a + M) / b, so an
        // override must leave room for every price up to the calibrated one.
        let mut big_m = BigM::calibrate(scenario, settings.margin);
        if let Some(m) = settings.big_m {
            let intercept = scenario
                .segments
                .iter()
                .flat_map(|segment| segment.demand.values())
                .map(|curve| curve.intercept())
                .fold(0.0, f64::max);
            if m < big_m.quantity || m <= intercept {
                return Err(BuildError::BigMTooSmall {
                    big_m: m,
                    required: big_m.quantity,
                });
            }
            big_m.quantity = m;
        }
        let m = big_m.quantity;

        let ladder = scenario.ladder();
        let mut rungs = vec![0; ladder.len()];
        for (rung, &index) in ladder.iter().enumerate() {
            rungs[index] = rung;
        }

        let mut program = Program::new("pricing");

        let prices = scenario
            .plans
            .iter()
            .map(|plan| program.continuous(format!("price[{}]", plan.id), 0.0, f64::INFINITY))
            .collect::<Vec<_>>();
        let mut assignments = vec![Vec::with_capacity(scenario.segments.len()); prices.len()];

        let mut profit = QuadExpr::new();
        let mut offers = Vec::with_capacity(scenario.segments.len());

        for segment in scenario.segments.iter() {
            let mut chosen = LinearExpr::new();
            let mut segment_offers = Vec::with_capacity(scenario.plans.len());

            for (i, plan) in scenario.plans.iter().enumerate() {
                let pair = format!("{},{}", plan.id, segment.id);
                let choice = program.binary(format!("choice[{pair}]"));
                let qty = program.continuous(format!("qty[{pair}]"), 0.0, f64::INFINITY);
                let curve = segment.demand_for(&plan.id);
                let (a, b) = (curve.intercept(), curve.slope());

                program.constrain(
                    format!("qty_zero[{pair}]"),
                    qty,
                    Comparison::Le,
                    LinearExpr::new().term(choice, m),
                );
                program.constrain(
                    format!("qty_upper[{pair}]"),
                    qty,
                    Comparison::Le,
                    LinearExpr::constant(a + m)
                        .term(prices[i], -b)
                        .term(choice, -m),
                );
                program.constrain(
                    format!("qty_lower[{pair}]"),
                    qty,
                    Comparison::Ge,
                    LinearExpr::constant(a - m)
                        .term(prices[i], -b)
                        .term(choice, m),
                );

                profit.add_product(prices[i], qty, 1.0);
                profit.add_term(qty, -plan.cost);

                chosen.add_term(choice, 1.0);
                assignments[i].push((choice, qty));
                segment_offers.push(Offer {
                    rung: rungs[i],
                    choice: choice.index(),
                    curve,
                });
            }
            offers.push(segment_offers);

            program.constrain(
                format!("single_choice[{}]", segment.id),
                chosen,
                Comparison::Eq,
                LinearExpr::constant(1.0),
            );
        }

        let count = scenario.segments.len() as f64;
        let plans = scenario
            .plans
            .iter()
            .zip(prices)
            .zip(assignments)
            .map(|((plan, price), assignments)| {
                let active = program.binary(format!("active[{}]", plan.id));
                let used = assignments
                    .iter()
                    .fold(LinearExpr::new(), |expr, &(choice, _)| expr.term(choice, 1.0));
                program.constrain(
                    format!("activation[{}]", plan.id),
                    used,
                    Comparison::Le,
                    LinearExpr::new().term(active, count),
                );
                PlanVars {
                    id: plan.id.clone(),
                    data_limit: plan.data_limit,
                    price,
                    active,
                    assignments,
                }
            })
            .collect::<Vec<_>>();

        // More data must never be cheaper
        for pair in ladder.windows(2) {
            let (prev, next) = (&plans[pair[0]], &plans[pair[1]]);
            program.constrain(
                format!("order[{},{}]", prev.id, next.id),
                next.price,
                Comparison::Ge,
                LinearExpr::from(prev.price).plus(settings.margin),
            );
        }

        let usage = plans.iter().fold(LinearExpr::new(), |expr, vars| {
            vars.assignments
                .iter()
                .fold(expr, |expr, &(_, qty)| expr.term(qty, vars.data_limit))
        });
        program.constrain("capacity", usage, Comparison::Le, LinearExpr::constant(scenario.capacity));

        program.set_objective(Sense::Maximize, profit);
        program.set_bound(DemandBound::new(
            settings.margin,
            scenario.capacity,
            ladder
                .iter()
                .map(|&index| (scenario.plans[index].cost, scenario.plans[index].data_limit))
                .collect(),
            offers,
        ));

        tracing::debug!(
            plans = plans.len(),
            segments = scenario.segments.len(),
            variables = program.variables().len(),
            constraints = program.constraints().len(),
            m_price = big_m.price,
            m_quantity = big_m.quantity,
            "built pricing model"
        );

        Ok(Self {
            program,
            big_m,
            plans,
            segments: scenario.segments.iter().map(|segment| segment.id.clone()).collect(),
        })
    }

    /// The formulated program
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The big-M constants the program was built with
    pub fn big_m(&self) -> BigM {
        self.big_m
    }

    /// The price variable of a plan
    pub fn price(&self, plan: &PlanId) -> Option<VarId> {
        self.plan_vars(plan).map(|vars| vars.price)
    }

    /// The activation flag of a plan
    pub fn active(&self, plan: &PlanId) -> Option<VarId> {
        self.plan_vars(plan).map(|vars| vars.active)
    }

    /// The `(choice, qty)` variables of a plan and segment
    pub fn assignment(&self, plan: &PlanId, segment: &SegmentId) -> Option<(VarId, VarId)> {
        let index = self.segments.iter().position(|id| id == segment)?;
        self.plan_vars(plan)?.assignments.get(index).copied()
    }

    fn plan_vars(&self, plan: &PlanId) -> Option<&PlanVars> {
        self.plans.iter().find(|vars| &vars.id == plan)
    }
}
