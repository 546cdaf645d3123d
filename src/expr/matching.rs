//! Recognition and substitution of dependent-variable references.
//!
//! A dependent-variable reference is the two-argument marker
//! [`Expr::ValueOf`]`(probe, at)`: "the value of `probe` at time `at`". Only
//! references evaluated at the current time are resolvable. The reserved name
//! [`TIME_NAME`] refers to the time variable itself and is never looked up as a
//! component.

use std::collections::HashMap;

use super::{Expr, Probe};

/// Reserved name of the time variable.
pub const TIME_NAME: &str = "t";

/// Whether `probe` names the reserved time variable rather than a component.
pub fn is_time(probe: &Probe) -> bool {
    probe.name == TIME_NAME
}

/// Distinct component references in `expr` evaluated at the current time,
/// appended to `out` in first-occurrence order.
pub fn find_references(expr: &Expr, out: &mut Vec<Probe>) {
    expr.visit(&mut |node| {
        if let Expr::ValueOf(probe, at) = node {
            if !is_time(probe) && **at == Expr::Time && !out.contains(probe) {
                out.push(probe.clone());
            }
        }
    });
}

/// References that cannot be resolved: markers evaluated at any point other
/// than the current time.
pub fn find_foreign_references(expr: &Expr) -> Option<Probe> {
    let mut found = None;
    expr.visit(&mut |node| {
        if let Expr::ValueOf(probe, at) = node {
            if found.is_none() && !is_time(probe) && **at != Expr::Time {
                found = Some(probe.clone());
            }
        }
    });
    found
}

/// Replace resolved references by their expressions. References to the time
/// variable collapse to their argument.
pub fn substitute_references(expr: &Expr, resolved: &HashMap<Probe, Expr>) -> Expr {
    expr.rewrite(&mut |node| match node {
        Expr::ValueOf(probe, at) if is_time(probe) => {
            Some(substitute_references(at, resolved))
        }
        Expr::ValueOf(probe, at) if **at == Expr::Time => resolved.get(probe).cloned(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Symbol;

    #[test]
    fn test_find_references_in_order() {
        let e = Expr::value_of(Probe::voltage("R2")) * Expr::from(2.0)
            + Expr::value_of(Probe::current("R1"))
            + Expr::value_of(Probe::voltage("R2"));
        let mut refs = Vec::new();
        find_references(&e, &mut refs);
        assert_eq!(refs, vec![Probe::voltage("R2"), Probe::current("R1")]);
    }

    #[test]
    fn test_time_is_not_a_component() {
        let e = Expr::value_of(Probe::voltage(TIME_NAME)).sin();
        let mut refs = Vec::new();
        find_references(&e, &mut refs);
        assert!(refs.is_empty());

        let resolved = HashMap::new();
        assert_eq!(substitute_references(&e, &resolved), Expr::Time.sin());
    }

    #[test]
    fn test_substitute() {
        let probe = Probe::voltage("R1");
        let e = Expr::value_of(probe.clone()) * Expr::from(10.0);
        let mut resolved = HashMap::new();
        resolved.insert(probe.clone(), Expr::unknown(Symbol::probe(&probe)));
        let out = substitute_references(&e, &resolved);
        assert_eq!(out, Expr::unknown(Symbol::new("V(R1)")) * Expr::from(10.0));
    }

    #[test]
    fn test_foreign_references() {
        let e = Expr::ValueOf(Probe::voltage("C1"), Box::new(Expr::Const(0.0)));
        let mut refs = Vec::new();
        find_references(&e, &mut refs);
        assert!(refs.is_empty());
        assert_eq!(find_foreign_references(&e), Some(Probe::voltage("C1")));
    }
}
