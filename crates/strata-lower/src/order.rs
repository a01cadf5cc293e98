//! Declaration ordering
//!
//! Flat declarations form a dependency graph: a subclass is emitted after its
//! superclass, every ordinary declaration of a unit before the unit's barrier
//! and the barrier before the unit's static initializers. The order is a
//! topological sort that pops the ready declaration with the lowest ordinal,
//! so unconstrained declarations keep their original relative order.

use crate::error::{LowerError, LowerResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use strata_ast::ast::ClassId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// Class object declaration
    Class {
        class: ClassId,
        superclass: Option<ClassId>,
    },
    /// Any function: member, constructor, top-level, closure, trampoline
    Member,
    Barrier,
    StaticInit,
}

impl DeclKind {
    pub fn is_ordinary(self) -> bool {
        matches!(self, DeclKind::Class { .. } | DeclKind::Member)
    }
}

/// One declaration as the orderer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    /// Original position, used as the tie-break
    pub ordinal: usize,
    /// Index of the compilation unit
    pub unit: usize,
    pub kind: DeclKind,
}

/// A node in the declaration graph
#[derive(Debug, Clone)]
pub struct DeclNode {
    pub name: String,
    pub ordinal: usize,
    /// Declarations that must come after this one
    pub dependents: Vec<usize>,
    /// Number of declarations that must come before this one
    pub in_degree: usize,
}

/// Declaration dependency graph
#[derive(Debug, Default)]
pub struct DeclGraph {
    nodes: Vec<DeclNode>,
    edges: FxHashSet<(usize, usize)>,
}

impl DeclGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration and return its index.
    pub fn add(&mut self, name: impl Into<String>, ordinal: usize) -> usize {
        self.nodes.push(DeclNode {
            name: name.into(),
            ordinal,
            dependents: Vec::new(),
            in_degree: 0,
        });
        self.nodes.len() - 1
    }

    /// Require `before` to be emitted before `after`.
    pub fn add_edge(&mut self, before: usize, after: usize) {
        if self.edges.insert((before, after)) {
            self.nodes[before].dependents.push(after);
            self.nodes[after].in_degree += 1;
        }
    }

    pub fn get(&self, index: usize) -> Option<&DeclNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Stable topological order, as node indices.
    ///
    /// Returns `Err(LowerError::DependencyCycle)` when some declaration can
    /// never become ready.
    pub fn stable_order(&self) -> LowerResult<Vec<usize>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.in_degree).collect();
        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.in_degree == 0)
            .map(|(index, node)| Reverse((node.ordinal, index)))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, index))) = ready.pop() {
            order.push(index);
            for &dependent in &self.nodes[index].dependents {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse((self.nodes[dependent].ordinal, dependent)));
                }
            }
        }

        if order.len() < self.nodes.len() {
            let remaining: FxHashSet<usize> = (0..self.nodes.len())
                .filter(|&index| in_degree[index] > 0)
                .collect();
            return Err(LowerError::DependencyCycle(self.find_cycle(&remaining)));
        }
        Ok(order)
    }

    /// Names along one cycle among `remaining`, first name repeated at the end.
    fn find_cycle(&self, remaining: &FxHashSet<usize>) -> Vec<String> {
        let mut starts: Vec<usize> = remaining.iter().copied().collect();
        starts.sort_by_key(|&index| self.nodes[index].ordinal);

        let mut visited = FxHashSet::default();
        for start in starts {
            let mut path = Vec::new();
            let mut on_path = FxHashSet::default();
            if let Some(cycle) = self.dfs_cycle(start, remaining, &mut visited, &mut on_path, &mut path) {
                return cycle
                    .into_iter()
                    .map(|index| self.nodes[index].name.clone())
                    .collect();
            }
        }
        // Every remaining node waits on a cycle, so one is always found above
        let mut names: Vec<String> = remaining
            .iter()
            .map(|&index| self.nodes[index].name.clone())
            .collect();
        names.sort();
        names
    }

    fn dfs_cycle(
        &self,
        node: usize,
        remaining: &FxHashSet<usize>,
        visited: &mut FxHashSet<usize>,
        on_path: &mut FxHashSet<usize>,
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        visited.insert(node);
        on_path.insert(node);
        path.push(node);

        for &next in &self.nodes[node].dependents {
            if !remaining.contains(&next) {
                continue;
            }
            if on_path.contains(&next) {
                let start = path.iter().position(|&p| p == next).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = self.dfs_cycle(next, remaining, visited, on_path, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        on_path.remove(&node);
        None
    }
}

/// Build the dependency graph of `declarations` and return them in
/// emission order, as indices into `declarations`.
pub fn order_declarations(declarations: &[Declaration]) -> LowerResult<Vec<usize>> {
    let mut graph = DeclGraph::new();
    let mut classes: FxHashMap<ClassId, usize> = FxHashMap::default();
    let mut barriers: FxHashMap<usize, usize> = FxHashMap::default();

    for decl in declarations {
        let index = graph.add(decl.name.clone(), decl.ordinal);
        match decl.kind {
            DeclKind::Class { class, .. } => {
                classes.insert(class, index);
            }
            DeclKind::Barrier => {
                if barriers.insert(decl.unit, index).is_some() {
                    return Err(LowerError::internal(format!(
                        "unit {} has more than one barrier",
                        decl.unit
                    )));
                }
            }
            DeclKind::Member | DeclKind::StaticInit => {}
        }
    }

    for (index, decl) in declarations.iter().enumerate() {
        match decl.kind {
            DeclKind::Class {
                superclass: Some(superclass),
                ..
            } => {
                let parent = classes
                    .get(&superclass)
                    .copied()
                    .ok_or(LowerError::UnknownClass(superclass.as_u32()))?;
                graph.add_edge(parent, index);
            }
            DeclKind::Barrier => continue,
            _ => {}
        }

        let barrier = barriers.get(&decl.unit).copied().ok_or_else(|| {
            LowerError::internal(format!("unit {} has no barrier", decl.unit))
        })?;
        if decl.kind.is_ordinary() {
            graph.add_edge(index, barrier);
        } else if decl.kind == DeclKind::StaticInit {
            graph.add_edge(barrier, index);
        }
    }

    debug!(
        declarations = graph.len(),
        edges = graph.edge_count(),
        "ordering declarations"
    );
    graph.stable_order()
}
