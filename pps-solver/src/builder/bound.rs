use crate::ObjectiveBound;
use pps_core::models::DemandCurve;

/// One plan a segment may choose, as seen by [`DemandBound`]
#[derive(Debug)]
pub(crate) struct Offer {
    /// Position of the plan on the price ladder
    pub(crate) rung: usize,
    /// Index of the choice binary
    pub(crate) choice: usize,
    pub(crate) curve: DemandCurve,
}

/// An upper bound on the profit of a pricing program under partial choices.
///
/// The relaxation keeps each plan's price interval. Every rung of the ladder
/// starts `margin` above the one below it, and a plan's price can never pass
/// the choke price of a segment that chose it, nor the cap of the rung above
/// less `margin`. Segments whose choice is settled share their plan's price,
/// so their curves are pooled and maximized together. Each open segment is
/// credited with the best profit any of its remaining plans could earn from
/// it alone.
///
/// Capacity enters through a shadow price `λ >= 0` charged on every unit of
/// data sold: for any `λ`, the relaxed profit with costs raised by
/// `λ * data_limit`, plus `λ * capacity`, is still an upper bound. The
/// estimate is the smallest such bound found by a search over `λ`.
#[derive(Debug)]
pub(crate) struct DemandBound {
    margin: f64,
    capacity: f64,
    /// `(cost, data_limit)` per rung, smallest data limit first
    rungs: Vec<(f64, f64)>,
    /// The offers of each segment
    segments: Vec<Vec<Offer>>,
    /// Past this shadow price no sale on a rung with data is profitable
    max_shadow: f64,
}

/// Steps of the ternary search over the shadow price
const SHADOW_STEPS: usize = 60;

/// Demand of all settled segments on one rung
#[derive(Clone, Copy)]
struct Pool {
    intercept: f64,
    slope: f64,
    choke: f64,
    used: bool,
}

impl Default for Pool {
    fn default() -> Self {
        Self {
            intercept: 0.0,
            slope: 0.0,
            choke: f64::INFINITY,
            used: false,
        }
    }
}

impl Pool {
    fn add(&mut self, curve: &DemandCurve) {
        self.intercept += curve.intercept();
        self.slope += curve.slope();
        if let Some(choke) = curve.choke_price() {
            self.choke = self.choke.min(choke);
        }
        self.used = true;
    }
}

/// The largest `(p - cost)(a - b p)` over `floor <= p <= cap`
fn peak(intercept: f64, slope: f64, cost: f64, floor: f64, cap: f64) -> f64 {
    if slope == 0.0 {
        return if intercept == 0.0 {
            0.0
        } else if cap.is_infinite() {
            f64::INFINITY
        } else {
            (cap - cost) * intercept
        };
    }
    let price = ((intercept / slope + cost) / 2.0).min(cap).max(floor);
    (price - cost) * (intercept - slope * price)
}

// Rounding in the ladder must not make a feasible node look empty
fn below(cap: f64, floor: f64) -> bool {
    cap < floor - 1e-6 * (1.0 + floor.abs())
}

/// The price intervals and demand of one node, independent of the shadow price
struct Relaxation<'a> {
    floors: Vec<f64>,
    caps: Vec<f64>,
    pools: Vec<Pool>,
    /// For each open segment, its offers with the cap they can reach
    open: Vec<Vec<(&'a Offer, f64)>>,
}

impl DemandBound {
    pub(crate) fn new(
        margin: f64,
        capacity: f64,
        rungs: Vec<(f64, f64)>,
        segments: Vec<Vec<Offer>>,
    ) -> Self {
        let choke = segments
            .iter()
            .flatten()
            .filter_map(|offer| offer.curve.choke_price())
            .fold(0.0, f64::max);
        let limit = rungs
            .iter()
            .map(|&(_, limit)| limit)
            .filter(|&limit| limit > 0.0)
            .fold(f64::INFINITY, f64::min);
        let max_shadow = if limit.is_finite() { choke / limit } else { 0.0 };
        Self {
            margin,
            capacity,
            rungs,
            segments,
            max_shadow,
        }
    }

    /// Settle what the bounds settle; `None` if no price ladder fits them
    fn relax(&self, lower: &[f64], upper: &[f64]) -> Option<Relaxation<'_>> {
        let rungs = self.rungs.len();
        let mut pools = vec![Pool::default(); rungs];
        let mut open = Vec::new();

        for offers in self.segments.iter() {
            let allowed = offers
                .iter()
                .filter(|offer| upper[offer.choice] >= 0.5)
                .collect::<Vec<_>>();
            // A single remaining plan is as good as chosen
            let settled = offers
                .iter()
                .find(|offer| lower[offer.choice] >= 0.5)
                .or(match allowed.as_slice() {
                    &[offer] => Some(offer),
                    _ => None,
                });
            if let Some(offer) = settled {
                pools[offer.rung].add(&offer.curve);
            } else if allowed.is_empty() {
                return None;
            } else {
                open.push(allowed);
            }
        }

        let floors = (0..rungs)
            .map(|rung| rung as f64 * self.margin)
            .collect::<Vec<_>>();
        let mut caps = vec![f64::INFINITY; rungs];
        for rung in (0..rungs).rev() {
            let above = caps.get(rung + 1).map_or(f64::INFINITY, |cap| cap - self.margin);
            caps[rung] = pools[rung].choke.min(above);
            if below(caps[rung], floors[rung]) {
                return None;
            }
        }

        let open = open
            .into_iter()
            .map(|offers| {
                offers
                    .into_iter()
                    .filter_map(|offer| {
                        let rung = offer.rung;
                        let cap = offer
                            .curve
                            .choke_price()
                            .map_or(caps[rung], |choke| choke.min(caps[rung]));
                        (!below(cap, floors[rung])).then_some((offer, cap))
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        if open.iter().any(Vec::is_empty) {
            return None;
        }

        Some(Relaxation {
            floors,
            caps,
            pools,
            open,
        })
    }

    /// The relaxed profit when each unit of data costs `shadow` on top
    fn profit(&self, relaxation: &Relaxation<'_>, shadow: f64) -> f64 {
        let cost = |rung: usize| {
            let (cost, limit) = self.rungs[rung];
            cost + shadow * limit
        };

        let pooled = relaxation
            .pools
            .iter()
            .enumerate()
            .filter(|(_, pool)| pool.used)
            .map(|(rung, pool)| {
                peak(
                    pool.intercept,
                    pool.slope,
                    cost(rung),
                    relaxation.floors[rung],
                    relaxation.caps[rung],
                )
            })
            .sum::<f64>();

        let open = relaxation
            .open
            .iter()
            .map(|offers| {
                offers
                    .iter()
                    .map(|&(offer, cap)| {
                        peak(
                            offer.curve.intercept(),
                            offer.curve.slope(),
                            cost(offer.rung),
                            relaxation.floors[offer.rung],
                            cap,
                        )
                    })
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .sum::<f64>();

        pooled + open + shadow * self.capacity
    }
}

impl ObjectiveBound for DemandBound {
    fn estimate(&self, lower: &[f64], upper: &[f64]) -> f64 {
        let Some(relaxation) = self.relax(lower, upper) else {
            return f64::NEG_INFINITY;
        };
        let free = self.profit(&relaxation, 0.0);
        if !free.is_finite() {
            return free;
        }

        // The bound is convex in the shadow price
        let (mut low, mut high) = (0.0, self.max_shadow);
        for _ in 0..SHADOW_STEPS {
            let left = low + (high - low) / 3.0;
            let right = high - (high - low) / 3.0;
            if self.profit(&relaxation, left) < self.profit(&relaxation, right) {
                high = right;
            } else {
                low = left;
            }
        }
        free.min(self.profit(&relaxation, low))
    }
}
