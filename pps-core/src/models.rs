mod demand;
mod ids;
mod map;
mod outcome;
mod plan;
mod scenario;
mod segment;
mod settings;

pub use demand::{DemandCurve, DemandCurveDto, DemandCurveError};
pub use ids::{PlanId, SegmentId};
pub use map::Map;
pub use outcome::{OptimizationResult, Status};
pub use plan::Plan;
pub use scenario::{Scenario, ValidationError};
pub use segment::Segment;
pub use settings::PricingSettings;
