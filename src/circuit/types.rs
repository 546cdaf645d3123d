//! Core types for circuit representation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// Identity of one circuit instance. Nodes are only connectable inside
/// the scope that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Allocate a fresh, process-unique scope.
    pub fn fresh() -> Self {
        ScopeId(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed))
    }
}

/// A unique identifier for a node within a circuit scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub scope: ScopeId,
    pub index: usize,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}.{}", self.scope.0, self.index)
    }
}

/// A component's connection point.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// Terminal name, unique within its component
    pub name: String,
    /// Node this terminal is attached to (`None` = floating)
    pub node: Option<NodeId>,
}

impl Terminal {
    /// Create an unconnected terminal.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.node.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_unique() {
        let a = ScopeId::fresh();
        let b = ScopeId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_terminals_start_floating() {
        let t = Terminal::new("p");
        assert_eq!(t.name, "p");
        assert!(!t.is_connected());
    }
}
