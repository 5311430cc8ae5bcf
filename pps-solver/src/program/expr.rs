use super::VarId;

/// An affine expression `Σ c_j x_j + constant`.
///
/// Terms are merged on insertion, so each variable appears at most once.
/// Zero coefficients are kept until the expression is turned into a
/// constraint or objective, where they are dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    /// The zero expression
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Add `coef * var`, returning the expression for chaining
    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Add a constant, returning the expression for chaining
    pub fn plus(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// Add `coef * var` in place
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if let Some((_, c)) = self.terms.iter_mut().find(|(v, _)| *v == var) {
            *c += coef;
        } else {
            self.terms.push((var, coef));
        }
    }

    /// The variable terms
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// The constant offset
    pub fn offset(&self) -> f64 {
        self.constant
    }

    /// Evaluate the expression at a point indexed by variable
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.index()])
            .sum::<f64>()
            + self.constant
    }

    /// Split into sorted non-zero terms and the constant
    pub(crate) fn into_parts(mut self) -> (Vec<(VarId, f64)>, f64) {
        self.terms.retain(|(_, coef)| *coef != 0.0);
        self.terms.sort_unstable_by_key(|(var, _)| *var);
        (self.terms, self.constant)
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self::new().term(var, 1.0)
    }
}

/// A quadratic expression: an affine part plus `Σ c_ij x_i x_j`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadExpr {
    linear: LinearExpr,
    products: Vec<(VarId, VarId, f64)>,
}

impl QuadExpr {
    /// The zero expression
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coef * x * y` in place. The pair is stored with the smaller id first.
    pub fn add_product(&mut self, x: VarId, y: VarId, coef: f64) {
        let (x, y) = if x <= y { (x, y) } else { (y, x) };
        if let Some((_, _, c)) = self
            .products
            .iter_mut()
            .find(|(a, b, _)| *a == x && *b == y)
        {
            *c += coef;
        } else {
            self.products.push((x, y, coef));
        }
    }

    /// Add `coef * var` in place
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.linear.add_term(var, coef);
    }

    /// The affine part
    pub fn linear(&self) -> &LinearExpr {
        &self.linear
    }

    /// The bilinear and square terms, as `(x, y, coef)` with `x <= y`
    pub fn products(&self) -> &[(VarId, VarId, f64)] {
        &self.products
    }

    /// Evaluate the expression at a point indexed by variable
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.linear.evaluate(values)
            + self
                .products
                .iter()
                .map(|(x, y, coef)| coef * values[x.index()] * values[y.index()])
                .sum::<f64>()
    }

    /// Whether `var` appears anywhere in the expression with a non-zero coefficient
    pub fn mentions(&self, var: VarId) -> bool {
        self.linear
            .terms()
            .iter()
            .any(|(v, coef)| *v == var && *coef != 0.0)
            || self
                .products
                .iter()
                .any(|(x, y, coef)| (*x == var || *y == var) && *coef != 0.0)
    }

    pub(crate) fn normalize(mut self) -> Self {
        let (terms, constant) = self.linear.into_parts();
        self.linear = LinearExpr { terms, constant };
        self.products.retain(|(_, _, coef)| *coef != 0.0);
        self.products.sort_unstable_by_key(|(x, y, _)| (*x, *y));
        self
    }
}

impl From<LinearExpr> for QuadExpr {
    fn from(linear: LinearExpr) -> Self {
        Self {
            linear,
            products: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_terms() {
        let x = VarId(0);
        let y = VarId(1);
        let expr = LinearExpr::constant(3.0)
            .term(y, 2.0)
            .term(x, 1.0)
            .term(y, -2.0)
            .plus(1.0);
        assert_eq!(expr.terms().len(), 2);
        assert_eq!(expr.evaluate(&[5.0, 7.0]), 9.0);

        let (terms, constant) = expr.into_parts();
        assert_eq!(terms, vec![(x, 1.0)]);
        assert_eq!(constant, 4.0);
    }

    #[test]
    fn test_products() {
        let p = VarId(0);
        let q = VarId(1);
        let mut profit = QuadExpr::new();
        profit.add_product(q, p, 1.0);
        profit.add_term(q, -2.0);
        // (p - 2) * q at p = 10, q = 3
        assert_eq!(profit.evaluate(&[10.0, 3.0]), 24.0);
        assert_eq!(profit.products(), &[(p, q, 1.0)]);
        assert!(profit.mentions(p));
        assert!(!profit.mentions(VarId(2)));
    }
}
