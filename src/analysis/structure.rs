//! Structural rank check.
//!
//! A square system can still be singular for every parameter value when some
//! set of equations references fewer unknowns than it has members (a floating
//! node, two ideal voltage sources in parallel). Such networks are found by a
//! maximum bipartite matching between equations and the unknowns they
//! reference (Kuhn's augmenting paths).

use std::collections::HashMap;

use super::Equation;
use crate::error::{Error, Result};
use crate::expr::Symbol;

pub(super) fn check_structural_rank(unknowns: &[Symbol], equations: &[Equation]) -> Result<()> {
    let column: HashMap<&Symbol, usize> = unknowns.iter().enumerate().map(|(i, s)| (s, i)).collect();
    let adjacency: Vec<Vec<usize>> = equations
        .iter()
        .map(|eq| {
            eq.residual
                .unknowns()
                .into_iter()
                .filter_map(|s| column.get(s).copied())
                .collect()
        })
        .collect();

    let mut matched: Vec<Option<usize>> = vec![None; unknowns.len()];
    for (row, eq) in equations.iter().enumerate() {
        let mut seen = vec![false; unknowns.len()];
        if !augment(row, &adjacency, &mut matched, &mut seen) {
            return Err(Error::singular(format!(
                "equation [{}] {} = 0 is structurally dependent on the others",
                eq.label, eq.residual
            )));
        }
    }
    Ok(())
}

fn augment(
    row: usize,
    adjacency: &[Vec<usize>],
    matched: &mut [Option<usize>],
    seen: &mut [bool],
) -> bool {
    for &col in &adjacency[row] {
        if seen[col] {
            continue;
        }
        seen[col] = true;
        let free = match matched[col] {
            None => true,
            Some(other) => augment(other, adjacency, matched, seen),
        };
        if free {
            matched[col] = Some(row);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn eq(residual: Expr) -> Equation {
        Equation {
            label: "test".into(),
            residual,
        }
    }

    #[test]
    fn test_full_rank_needs_augmenting_path() {
        let x = Expr::unknown(Symbol::new("x"));
        let y = Expr::unknown(Symbol::new("y"));
        let unknowns = [Symbol::new("x"), Symbol::new("y")];
        let equations = [eq(x.clone() + y), eq(x - 1.0.into())];
        assert!(check_structural_rank(&unknowns, &equations).is_ok());
    }

    #[test]
    fn test_parallel_constraints_are_singular() {
        let x = Expr::unknown(Symbol::new("x"));
        let unknowns = [Symbol::new("x"), Symbol::new("y")];
        let equations = [eq(x.clone() - 1.0.into()), eq(x - 2.0.into())];
        assert!(matches!(
            check_structural_rank(&unknowns, &equations),
            Err(Error::SingularSystemError { .. })
        ));
    }
}
