//! Symbolic differentiation with respect to an unknown.

use super::{Expr, Func, Symbol};

impl Expr {
    /// Partial derivative with respect to the unknown `x`.
    ///
    /// Knowns and time are constants here. `d/dt` and `ValueOf` markers must be
    /// eliminated before differentiating; they are treated as constants.
    pub fn derivative(&self, x: &Symbol) -> Expr {
        match self {
            Expr::Const(_) | Expr::Known(_) | Expr::Time => Expr::zero(),
            Expr::Unknown(s) => {
                if s == x {
                    Expr::Const(1.0)
                } else {
                    Expr::zero()
                }
            }
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.derivative(x)).collect()),
            Expr::Mul(factors) => {
                let mut terms = Vec::new();
                for (i, factor) in factors.iter().enumerate() {
                    let d = factor.derivative(x);
                    if d.is_zero() {
                        continue;
                    }
                    let mut product = Vec::with_capacity(factors.len());
                    product.push(d);
                    for (j, other) in factors.iter().enumerate() {
                        if j != i {
                            product.push(other.clone());
                        }
                    }
                    terms.push(Expr::product(product));
                }
                Expr::sum(terms)
            }
            Expr::Div(a, b) => {
                let da = a.derivative(x);
                let db = b.derivative(x);
                let first = da.div((**b).clone());
                if db.is_zero() {
                    return first;
                }
                let b2 = (**b).clone().mul((**b).clone());
                first.sub(((**a).clone().mul(db)).div(b2))
            }
            Expr::Neg(a) => a.derivative(x).neg(),
            Expr::Call(func, a) => {
                let da = a.derivative(x);
                if da.is_zero() {
                    return Expr::zero();
                }
                let arg = (**a).clone();
                let outer = match func {
                    Func::Exp | Func::ExpSlope => Expr::call(Func::ExpSlope, arg),
                    Func::Ln => Expr::Const(1.0).div(arg),
                    Func::Sin => arg.cos(),
                    Func::Cos => arg.sin().neg(),
                    Func::Tanh => {
                        let t = arg.tanh();
                        Expr::Const(1.0).sub(t.clone().mul(t))
                    }
                };
                outer.mul(da)
            }
            Expr::Ddt(_) | Expr::ValueOf(..) => Expr::zero(),
        }
    }
}
