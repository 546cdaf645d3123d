//! Symbolic expressions for circuit equations.
//!
//! Components describe their behavior as expressions over unknowns (node
//! voltages, branch currents), per-step knowns (audio inputs, companion-model
//! history) and the reserved time variable. The tree supports exactly what the
//! engine needs:
//!
//! - construction with light constant folding ([`Expr::add`], [`Expr::mul`], ...)
//! - rewriting ([`Expr::rewrite`]) for substitution passes
//! - symbolic differentiation ([`Expr::derivative`]) for the Newton Jacobian
//! - the `d/dt` marker ([`Expr::Ddt`]) consumed by discretization
//! - the two-argument "value of named component" marker ([`Expr::ValueOf`])
//!   consumed by dependent-variable resolution (see [`matching`])
//!
//! It is not a computer algebra system: no canonical ordering, no factoring.

mod derivative;
pub mod matching;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exponent above which [`Func::Exp`] continues linearly.
///
/// Keeps Newton iterates finite when a junction is driven far beyond its
/// operating range.
pub const EXP_LIMIT: f64 = 30.0;

/// A named scalar quantity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub String);

impl Symbol {
    /// Create a symbol from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Voltage of a (qualified) node.
    pub fn node_voltage(node: &str) -> Self {
        Self(format!("V[{node}]"))
    }

    /// Branch current introduced by a (qualified) component.
    pub fn branch_current(component: &str) -> Self {
        Self(format!("I[{component}]"))
    }

    /// Unknown standing for a resolved dependent-variable reference.
    pub fn probe(probe: &Probe) -> Self {
        Self(probe.to_string())
    }

    /// Audio input sample of port `index`.
    pub fn input(index: usize) -> Self {
        Self(format!("in[{index}]"))
    }

    /// Symbol text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which quantity of a component a probe reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    /// Voltage across the component (first terminal minus second)
    Voltage,
    /// Current through the component (into the first terminal)
    Current,
}

/// A reference to a quantity of a named component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Probe {
    /// Component name (qualified with the subcircuit path during assembly)
    pub name: String,
    pub quantity: Quantity,
}

impl Probe {
    pub fn voltage(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: Quantity::Voltage,
        }
    }

    pub fn current(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: Quantity::Current,
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantity {
            Quantity::Voltage => write!(f, "V({})", self.name),
            Quantity::Current => write!(f, "I({})", self.name),
        }
    }
}

/// Scalar functions available in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    /// Exponential, continued linearly above [`EXP_LIMIT`]
    Exp,
    /// Slope of [`Func::Exp`]: `exp(min(x, EXP_LIMIT))`
    ExpSlope,
    Ln,
    Sin,
    Cos,
    Tanh,
}

impl Func {
    /// Evaluate the function.
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Func::Exp => {
                if x > EXP_LIMIT {
                    EXP_LIMIT.exp() * (1.0 + (x - EXP_LIMIT))
                } else {
                    x.exp()
                }
            }
            Func::ExpSlope => x.min(EXP_LIMIT).exp(),
            Func::Ln => x.ln(),
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tanh => x.tanh(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::Exp => "exp",
            Func::ExpSlope => "exp'",
            Func::Ln => "ln",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tanh => "tanh",
        }
    }
}

/// A symbolic expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// Quantity solved for each step
    Unknown(Symbol),
    /// Quantity known before each step is solved (inputs, history)
    Known(Symbol),
    /// The reserved simulation time variable
    Time,
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Call(Func, Box<Expr>),
    /// Time derivative, replaced by a companion model before solving
    Ddt(Box<Expr>),
    /// "Value of `probe` at `at`", resolved during assembly
    ValueOf(Probe, Box<Expr>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn zero() -> Self {
        Expr::Const(0.0)
    }

    pub fn unknown(symbol: Symbol) -> Self {
        Expr::Unknown(symbol)
    }

    pub fn known(symbol: Symbol) -> Self {
        Expr::Known(symbol)
    }

    /// The dependent-variable marker for `probe` evaluated at time `t`.
    pub fn value_of(probe: Probe) -> Self {
        Expr::ValueOf(probe, Box::new(Expr::Time))
    }

    /// Constant value, if this expression is one.
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_const() == Some(0.0)
    }

    /// Sum with constant folding and flattening.
    pub fn add(self, rhs: Expr) -> Expr {
        Expr::sum(vec![self, rhs])
    }

    /// Sum of many terms.
    pub fn sum(terms: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(terms.len());
        let mut constant = 0.0;
        for term in terms {
            match term {
                Expr::Const(v) => constant += v,
                Expr::Add(inner) => {
                    for t in inner {
                        match t {
                            Expr::Const(v) => constant += v,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if constant != 0.0 {
            flat.push(Expr::Const(constant));
        }
        match flat.len() {
            0 => Expr::Const(0.0),
            1 => flat.pop().unwrap_or(Expr::Const(0.0)),
            _ => Expr::Add(flat),
        }
    }

    pub fn sub(self, rhs: Expr) -> Expr {
        self.add(rhs.neg())
    }

    /// Product with constant folding and flattening.
    pub fn mul(self, rhs: Expr) -> Expr {
        Expr::product(vec![self, rhs])
    }

    /// Product of many factors.
    pub fn product(factors: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(factors.len());
        let mut constant = 1.0;
        for factor in factors {
            match factor {
                Expr::Const(v) => constant *= v,
                Expr::Mul(inner) => {
                    for f in inner {
                        match f {
                            Expr::Const(v) => constant *= v,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if constant == 0.0 || flat.is_empty() {
            return Expr::Const(constant);
        }
        if constant != 1.0 {
            flat.insert(0, Expr::Const(constant));
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Expr::Const(constant))
        } else {
            Expr::Mul(flat)
        }
    }

    pub fn div(self, rhs: Expr) -> Expr {
        match (self.as_const(), rhs.as_const()) {
            (Some(a), Some(b)) => Expr::Const(a / b),
            (Some(a), _) if a == 0.0 => Expr::Const(0.0),
            (_, Some(b)) if b == 1.0 => self,
            (_, Some(b)) => self.mul(Expr::Const(1.0 / b)),
            _ => Expr::Div(Box::new(self), Box::new(rhs)),
        }
    }

    pub fn neg(self) -> Expr {
        match self {
            Expr::Const(v) => Expr::Const(-v),
            Expr::Neg(inner) => *inner,
            Expr::Mul(mut factors) => {
                if let Some(Expr::Const(c)) = factors.first_mut() {
                    *c = -*c;
                    Expr::Mul(factors)
                } else {
                    Expr::Neg(Box::new(Expr::Mul(factors)))
                }
            }
            other => Expr::Neg(Box::new(other)),
        }
    }

    /// Apply a scalar function, folding constant arguments.
    pub fn call(func: Func, arg: Expr) -> Expr {
        match arg {
            Expr::Const(v) => Expr::Const(func.apply(v)),
            other => Expr::Call(func, Box::new(other)),
        }
    }

    pub fn exp(self) -> Expr {
        Expr::call(Func::Exp, self)
    }

    pub fn ln(self) -> Expr {
        Expr::call(Func::Ln, self)
    }

    pub fn sin(self) -> Expr {
        Expr::call(Func::Sin, self)
    }

    pub fn cos(self) -> Expr {
        Expr::call(Func::Cos, self)
    }

    pub fn tanh(self) -> Expr {
        Expr::call(Func::Tanh, self)
    }

    /// Time derivative marker. Constants differentiate to zero immediately.
    pub fn ddt(self) -> Expr {
        match self {
            Expr::Const(_) => Expr::Const(0.0),
            other => Expr::Ddt(Box::new(other)),
        }
    }

    /// Visit every node of the tree in pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Const(_) | Expr::Unknown(_) | Expr::Known(_) | Expr::Time => {}
            Expr::Add(terms) | Expr::Mul(terms) => {
                for term in terms {
                    term.visit(f);
                }
            }
            Expr::Div(a, b) => {
                a.visit(f);
                b.visit(f);
            }
            Expr::Neg(a) | Expr::Call(_, a) | Expr::Ddt(a) | Expr::ValueOf(_, a) => a.visit(f),
        }
    }

    /// Rebuild the tree top-down. Where `f` returns a replacement the subtree
    /// is replaced without descending into the replacement.
    pub fn rewrite(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        if let Some(replacement) = f(self) {
            return replacement;
        }
        match self {
            Expr::Const(_) | Expr::Unknown(_) | Expr::Known(_) | Expr::Time => self.clone(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.rewrite(f)).collect()),
            Expr::Mul(factors) => Expr::product(factors.iter().map(|t| t.rewrite(f)).collect()),
            Expr::Div(a, b) => a.rewrite(f).div(b.rewrite(f)),
            Expr::Neg(a) => a.rewrite(f).neg(),
            Expr::Call(func, a) => Expr::call(*func, a.rewrite(f)),
            Expr::Ddt(a) => a.rewrite(f).ddt(),
            Expr::ValueOf(probe, at) => Expr::ValueOf(probe.clone(), Box::new(at.rewrite(f))),
        }
    }

    /// Distinct unknowns referenced by this expression, in first-occurrence order.
    pub fn unknowns(&self) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Unknown(s) = e {
                if !out.contains(&s) {
                    out.push(s);
                }
            }
        });
        out
    }

    pub fn contains_unknowns(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Expr::Unknown(_)));
        found
    }

    /// Whether any `d/dt` marker remains.
    pub fn contains_ddt(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Expr::Ddt(_)));
        found
    }

    /// Whether the expression is constant in unknowns, knowns and time.
    pub fn is_constant(&self) -> bool {
        let mut constant = true;
        self.visit(&mut |e| {
            constant &= !matches!(
                e,
                Expr::Unknown(_) | Expr::Known(_) | Expr::Time | Expr::Ddt(_) | Expr::ValueOf(..)
            )
        });
        constant
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::add(self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::sub(self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::div(self, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(v) => write!(f, "{v}"),
            Expr::Unknown(s) | Expr::Known(s) => write!(f, "{s}"),
            Expr::Time => f.write_str(matching::TIME_NAME),
            Expr::Add(terms) => {
                f.write_str("(")?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write!(f, "{term}")?;
                }
                f.write_str(")")
            }
            Expr::Mul(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    write!(f, "{factor}")?;
                }
                Ok(())
            }
            Expr::Div(a, b) => write!(f, "{a}/({b})"),
            Expr::Neg(a) => write!(f, "-{a}"),
            Expr::Call(func, a) => write!(f, "{}({a})", func.name()),
            Expr::Ddt(a) => write!(f, "d/dt({a})"),
            Expr::ValueOf(probe, at) => write!(f, "{probe}[{at}]"),
        }
    }
}
