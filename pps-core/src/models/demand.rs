/// A linear demand curve, `quantity = a - b * price`.
///
/// `a` is the quantity a segment would consume at a price of zero, and `b` is
/// the quantity lost per unit of price. Both are finite and non-negative; the
/// curve itself is allowed to go negative at high prices, as it is the
/// optimization program (not the curve) that keeps quantities non-negative.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "DemandCurveDto", into = "DemandCurveDto")
)]
pub struct DemandCurve {
    a: f64,
    b: f64,
}

impl DemandCurve {
    /// The curve of a segment that never buys a plan.
    pub const ZERO: Self = Self { a: 0.0, b: 0.0 };

    /// Creates a new curve, validating both parameters
    pub fn new(a: f64, b: f64) -> Result<Self, DemandCurveError> {
        Self::try_from(DemandCurveDto { a, b })
    }

    /// The intercept: quantity demanded at a price of zero
    pub fn intercept(&self) -> f64 {
        self.a
    }

    /// The slope: quantity lost per unit increase in price
    pub fn slope(&self) -> f64 {
        self.b
    }

    /// Evaluate the curve. The result is negative past the choke price.
    pub fn quantity_at(&self, price: f64) -> f64 {
        self.a - self.b * price
    }

    /// The price at which demand falls to zero, if the curve is price sensitive at all
    pub fn choke_price(&self) -> Option<f64> {
        if self.b > 0.0 {
            Some(self.a / self.b)
        } else {
            None
        }
    }

    /// Whether the segment would consume nothing at any price
    pub fn is_zero(&self) -> bool {
        self.a == 0.0 && self.b == 0.0
    }
}

impl Default for DemandCurve {
    fn default() -> Self {
        Self::ZERO
    }
}

/// DTO to ensure that we always validate when we deserialize from an untrusted source
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema), schemars(inline))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DemandCurveDto {
    /// The intercept (quantity at price zero)
    pub a: f64,
    /// The slope (quantity lost per unit of price)
    #[cfg_attr(feature = "serde", serde(default))]
    pub b: f64,
}

impl From<DemandCurve> for DemandCurveDto {
    fn from(value: DemandCurve) -> Self {
        Self {
            a: value.a,
            b: value.b,
        }
    }
}

impl TryFrom<DemandCurveDto> for DemandCurve {
    type Error = DemandCurveError;

    fn try_from(value: DemandCurveDto) -> Result<Self, Self::Error> {
        let DemandCurveDto { a, b } = value;
        if a.is_nan() || b.is_nan() {
            Err(DemandCurveError::NaN)
        } else if a.is_infinite() || b.is_infinite() {
            Err(DemandCurveError::Infinity)
        } else if a < 0.0 {
            Err(DemandCurveError::NegativeIntercept(a))
        } else if b < 0.0 {
            Err(DemandCurveError::NegativeSlope(b))
        } else {
            // normalize -0.0 so that printed models stay tidy
            Ok(Self { a: a + 0.0, b: b + 0.0 })
        }
    }
}

/// Errors that can occur when creating a DemandCurve
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DemandCurveError {
    /// Error when either parameter is NaN
    #[error("NaN value encountered")]
    NaN,
    /// Error when either parameter is infinite
    #[error("demand parameters cannot be infinite")]
    Infinity,
    /// Error when the intercept is negative
    #[error("intercept must be non-negative, got {0}")]
    NegativeIntercept(f64),
    /// Error when the slope is negative (demand rising with price)
    #[error("slope must be non-negative, got {0}")]
    NegativeSlope(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity() {
        let curve = DemandCurve::new(100.0, 2.0).unwrap();
        assert_eq!(curve.quantity_at(0.0), 100.0);
        assert_eq!(curve.quantity_at(10.0), 80.0);
        assert_eq!(curve.quantity_at(60.0), -20.0);
        assert_eq!(curve.choke_price(), Some(50.0));
    }

    #[test]
    fn test_inelastic() {
        let curve = DemandCurve::new(40.0, 0.0).unwrap();
        assert_eq!(curve.choke_price(), None);
        assert!(!curve.is_zero());
        assert!(DemandCurve::ZERO.is_zero());
        assert_eq!(DemandCurve::default(), DemandCurve::ZERO);
    }

    #[test]
    fn test_invalid() {
        assert_eq!(DemandCurve::new(f64::NAN, 1.0), Err(DemandCurveError::NaN));
        assert_eq!(
            DemandCurve::new(1.0, f64::INFINITY),
            Err(DemandCurveError::Infinity)
        );
        assert_eq!(
            DemandCurve::new(-1.0, 1.0),
            Err(DemandCurveError::NegativeIntercept(-1.0))
        );
        assert_eq!(
            DemandCurve::new(1.0, -0.5),
            Err(DemandCurveError::NegativeSlope(-0.5))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let curve: DemandCurve = serde_json::from_str(r#"{"a": 5000, "b": 200}"#).unwrap();
        assert_eq!(curve.choke_price(), Some(25.0));

        let missing_slope: DemandCurve = serde_json::from_str(r#"{"a": 10}"#).unwrap();
        assert_eq!(missing_slope.slope(), 0.0);

        assert!(serde_json::from_str::<DemandCurve>(r#"{"a": -1, "b": 0}"#).is_err());
    }
}
