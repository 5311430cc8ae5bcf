mod expr;
pub use expr::{LinearExpr, QuadExpr};

use std::{fmt, sync::Arc};

/// A handle to a variable of a [`Program`]. Handles are dense indices into
/// [`Program::variables`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// The position of the variable in its program
    pub fn index(self) -> usize {
        self.0
    }
}

/// The domain of a variable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    /// Any real value within bounds
    Continuous,
    /// 0 or 1
    Binary,
}

/// A decision variable
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// A readable name, unique within the program
    pub name: String,
    /// The domain
    pub kind: VarKind,
    /// Lower bound, possibly `-inf`
    pub lower: f64,
    /// Upper bound, possibly `+inf`
    pub upper: f64,
}

/// The relation between a constraint's left-hand side and its right-hand side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "=",
        })
    }
}

/// A linear constraint in the normalized form `Σ c_j x_j (cmp) rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// A readable name, unique within the program
    pub name: String,
    /// The non-zero terms, sorted by variable
    pub terms: Vec<(VarId, f64)>,
    /// The comparison
    pub cmp: Comparison,
    /// The right-hand side
    pub rhs: f64,
}

impl Constraint {
    /// The value of the left-hand side at a point
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.index()])
            .sum()
    }

    /// Whether the constraint holds at a point, up to a relative tolerance
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        let slack = tolerance * (1.0 + self.rhs.abs());
        match self.cmp {
            Comparison::Le => lhs <= self.rhs + slack,
            Comparison::Ge => lhs >= self.rhs - slack,
            Comparison::Eq => (lhs - self.rhs).abs() <= slack,
        }
    }
}

/// The optimization direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    /// Find the largest objective value
    Maximize,
    /// Find the smallest objective value
    Minimize,
}

/// An optimistic estimate of the objective over part of a search tree.
///
/// `lower` and `upper` hold the current bounds of every variable; only the
/// binary entries are meaningful. The estimate must be at least as good, in
/// the program's [`Sense`], as the objective of every feasible point whose
/// binaries lie within those bounds. The worst infinity marks bounds that
/// admit no feasible point.
pub trait ObjectiveBound: fmt::Debug + Send + Sync {
    /// Estimate the best objective reachable within the bounds
    fn estimate(&self, lower: &[f64], upper: &[f64]) -> f64;
}

/// A solver-agnostic mixed-integer program with a quadratic objective.
///
/// This is the hand-off between the model builder and an [`crate::Engine`]:
/// it knows nothing about plans or segments, only variables, linear
/// constraints and an objective.
#[derive(Clone, Debug)]
pub struct Program {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    sense: Sense,
    objective: QuadExpr,
    bound: Option<Arc<dyn ObjectiveBound>>,
}

impl Program {
    /// An empty program with a zero objective to be maximized
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            sense: Sense::Maximize,
            objective: QuadExpr::new(),
            bound: None,
        }
    }

    /// Declare a continuous variable
    pub fn continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_variable(Variable {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        })
    }

    /// Declare a binary variable
    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_variable(Variable {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        })
    }

    fn push_variable(&mut self, variable: Variable) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(variable);
        id
    }

    /// Add `lhs (cmp) rhs`. Both sides may carry variables and constants;
    /// everything is moved to the normalized form of [`Constraint`].
    pub fn constrain(
        &mut self,
        name: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        cmp: Comparison,
        rhs: impl Into<LinearExpr>,
    ) {
        let mut expr = lhs.into();
        let rhs = rhs.into();
        for &(var, coef) in rhs.terms() {
            expr.add_term(var, -coef);
        }
        let (terms, constant) = expr.into_parts();
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            cmp,
            rhs: rhs.offset() - constant,
        });
    }

    /// Replace the objective. Any bound set for the old objective is dropped.
    pub fn set_objective(&mut self, sense: Sense, objective: QuadExpr) {
        self.sense = sense;
        self.objective = objective.normalize();
        self.bound = None;
    }

    /// Attach an estimate of the objective that a search may prune with
    pub fn set_bound(&mut self, bound: impl ObjectiveBound + 'static) {
        self.bound = Some(Arc::new(bound));
    }

    /// The program's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All variables, indexed by [`VarId::index`]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Look up a variable
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    /// All constraints, in insertion order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The optimization direction
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// The objective
    pub fn objective(&self) -> &QuadExpr {
        &self.objective
    }

    /// The objective estimate, if one was attached
    pub fn bound(&self) -> Option<&dyn ObjectiveBound> {
        self.bound.as_deref()
    }

    /// The number of binary variables
    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|var| var.kind == VarKind::Binary)
            .count()
    }

    /// Whether a point satisfies every bound, integrality requirement and constraint
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && self.variables.iter().zip(values).all(|(var, &x)| {
                let slack = tolerance * (1.0 + x.abs());
                x >= var.lower - slack
                    && x <= var.upper + slack
                    && (var.kind == VarKind::Continuous || x == 0.0 || x == 1.0)
            })
            && self
                .constraints
                .iter()
                .all(|constraint| constraint.is_satisfied(values, tolerance))
    }
}
