//! Dependent-variable resolution.
//!
//! Repeatedly scans equations and outputs for `ValueOf` markers. Each distinct
//! reference becomes an unknown `V(X)`/`I(X)` with the equation
//! `unknown - definition = 0`, and the markers are substituted by the unknown.
//! Definitions may reference other components, so this runs to a fixed point.

use std::collections::{HashMap, HashSet};

use super::{AudioOutput, Equation};
use crate::error::{Error, Result};
use crate::expr::matching::{find_foreign_references, find_references, substitute_references};
use crate::expr::{Expr, Probe, Symbol};

pub(super) fn resolve_references(
    unknowns: &mut Vec<Symbol>,
    equations: &mut Vec<Equation>,
    outputs: &mut [AudioOutput],
    definitions: &HashMap<Probe, Expr>,
) -> Result<()> {
    let mut resolved: HashMap<Probe, Expr> = HashMap::new();
    // Every pass resolves at least one new definition, so a chain can take
    // no more passes than there are definitions.
    let max_passes = definitions.len() + 1;

    // Time markers are primitives and never pending.
    for eq in equations.iter_mut() {
        eq.residual = substitute_references(&eq.residual, &resolved);
    }
    for output in outputs.iter_mut() {
        output.expr = substitute_references(&output.expr, &resolved);
    }

    for _ in 0..max_passes {
        let mut pending = Vec::new();
        for expr in equations
            .iter()
            .map(|e| &e.residual)
            .chain(outputs.iter().map(|o| &o.expr))
        {
            if let Some(probe) = find_foreign_references(expr) {
                return Err(Error::unresolved(
                    probe.to_string(),
                    "only values at the current time can be referenced",
                ));
            }
            find_references(expr, &mut pending);
        }
        if pending.is_empty() {
            return Ok(());
        }

        for probe in pending {
            let definition = definitions.get(&probe).ok_or_else(|| {
                Error::unresolved(
                    probe.to_string(),
                    format!("no component '{}' defines this quantity", probe.name),
                )
            })?;
            check_acyclic(&probe, definitions)?;

            let symbol = Symbol::probe(&probe);
            if unknowns.contains(&symbol) {
                return Err(Error::unresolved(
                    probe.to_string(),
                    "reference resolved twice",
                ));
            }
            unknowns.push(symbol.clone());
            let unknown = Expr::unknown(symbol);
            equations.push(Equation {
                label: format!("ref {probe}"),
                residual: unknown.clone() - definition.clone(),
            });
            resolved.insert(probe, unknown);
        }

        for eq in equations.iter_mut() {
            eq.residual = substitute_references(&eq.residual, &resolved);
        }
        for output in outputs.iter_mut() {
            output.expr = substitute_references(&output.expr, &resolved);
        }
    }

    Err(Error::unresolved(
        "<references>",
        format!("resolution did not reach a fixed point after {max_passes} passes"),
    ))
}

/// Depth-first search through definitions starting at `start`. A probe seen
/// again on the current path is a cycle.
fn check_acyclic(start: &Probe, definitions: &HashMap<Probe, Expr>) -> Result<()> {
    fn visit(
        probe: &Probe,
        definitions: &HashMap<Probe, Expr>,
        path: &mut Vec<Probe>,
        done: &mut HashSet<Probe>,
    ) -> Result<()> {
        if done.contains(probe) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|p| p == probe) {
            let chain: Vec<String> = path[pos..]
                .iter()
                .chain(std::iter::once(probe))
                .map(ToString::to_string)
                .collect();
            return Err(Error::unresolved(
                probe.to_string(),
                format!("cyclic reference {}", chain.join(" -> ")),
            ));
        }
        let Some(definition) = definitions.get(probe) else {
            return Ok(());
        };

        path.push(probe.clone());
        let mut refs = Vec::new();
        find_references(definition, &mut refs);
        for next in &refs {
            visit(next, definitions, path, done)?;
        }
        path.pop();
        done.insert(probe.clone());
        Ok(())
    }

    visit(start, definitions, &mut Vec::new(), &mut HashSet::new())
}
