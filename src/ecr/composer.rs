//! Capability composition.
//!
//! A device variant names the wire commands it accepts. [`resolve`] turns
//! that list into every operation the variant can perform: helpers pulled in
//! through `depends`, wrappers through `related`, and composites whose whole
//! `requires` set is present. The graph is walked until nothing new is added,
//! so the result does not depend on declaration order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// One node of the operation graph.
#[derive(Debug, Clone, Copy)]
pub struct Primitive<K: 'static> {
    pub id: K,
    /// Wire command this operation issues directly; `None` for helpers and
    /// composites that only call other operations.
    pub code: Option<u16>,
    /// Helpers invoked internally.
    pub depends: &'static [K],
    /// Composite unlocks once all of these are present.
    pub requires: &'static [K],
    /// Convenience wrappers built on this operation alone.
    pub related: &'static [K],
}

impl<K> Primitive<K> {
    pub const fn new(id: K, code: Option<u16>) -> Self {
        Self {
            id,
            code,
            depends: &[],
            requires: &[],
            related: &[],
        }
    }

    pub const fn depends(mut self, depends: &'static [K]) -> Self {
        self.depends = depends;
        self
    }

    pub const fn requires(mut self, requires: &'static [K]) -> Self {
        self.requires = requires;
        self
    }

    pub const fn related(mut self, related: &'static [K]) -> Self {
        self.related = related;
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.requires.is_empty()
    }
}

/// Resolved operation set of one variant.
#[derive(Clone, PartialEq, Eq)]
pub struct FinalCommandSet<K: Ord> {
    ops: BTreeSet<K>,
}

impl<K: Ord + Copy> FinalCommandSet<K> {
    pub fn contains(&self, op: K) -> bool {
        self.ops.contains(&op)
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.ops.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for FinalCommandSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ops.iter()).finish()
    }
}

impl<K: Ord> FromIterator<K> for FinalCommandSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

fn index<K: Ord + Copy>(registry: &[Primitive<K>]) -> BTreeMap<K, &Primitive<K>> {
    registry.iter().map(|p| (p.id, p)).collect()
}

/// Add everything reachable through `edges` from the current set.
fn close_over<K, F>(set: &mut BTreeSet<K>, nodes: &BTreeMap<K, &Primitive<K>>, edges: F)
where
    K: Ord + Copy,
    F: Fn(&Primitive<K>) -> &'static [K],
{
    let mut stack: Vec<K> = set.iter().copied().collect();
    while let Some(op) = stack.pop() {
        let Some(node) = nodes.get(&op) else { continue };
        for &next in edges(node) {
            if set.insert(next) {
                stack.push(next);
            }
        }
    }
}

/// Resolve selected wire codes into the full operation set.
///
/// Codes with no primitive in `registry` are skipped.
pub fn resolve<K>(selected: &[u16], registry: &[Primitive<K>]) -> FinalCommandSet<K>
where
    K: Ord + Copy + fmt::Debug,
{
    let nodes = index(registry);
    let mut set = BTreeSet::new();
    for &code in selected {
        let mut matched = false;
        for p in registry.iter().filter(|p| p.code == Some(code)) {
            set.insert(p.id);
            matched = true;
        }
        if !matched {
            warn!("No operation issues command 0x{code:02X}");
        }
    }

    loop {
        let before = set.len();
        close_over(&mut set, &nodes, |p| p.depends);
        close_over(&mut set, &nodes, |p| p.related);
        for p in registry.iter().filter(|p| p.is_composite()) {
            if p.requires.iter().all(|r| set.contains(r)) {
                set.insert(p.id);
            }
        }
        if set.len() == before {
            break;
        }
    }

    FinalCommandSet { ops: set }
}

/// First cycle found through `depends`/`related` edges, as a path that
/// starts and ends on the same operation.
pub fn detect_cycle<K>(registry: &[Primitive<K>]) -> Option<Vec<K>>
where
    K: Ord + Copy,
{
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }

    fn visit<K: Ord + Copy>(
        op: K,
        nodes: &BTreeMap<K, &Primitive<K>>,
        marks: &mut BTreeMap<K, Mark>,
        path: &mut Vec<K>,
    ) -> Option<Vec<K>> {
        match marks.get(&op) {
            Some(Mark::Done) => return None,
            Some(Mark::Active) => {
                let start = path.iter().position(|&p| p == op).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(op);
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(op, Mark::Active);
        path.push(op);
        if let Some(node) = nodes.get(&op) {
            for &next in node.depends.iter().chain(node.related) {
                if let Some(cycle) = visit(next, nodes, marks, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        marks.insert(op, Mark::Done);
        None
    }

    let nodes = index(registry);
    let mut marks = BTreeMap::new();
    let mut path = Vec::new();
    registry
        .iter()
        .find_map(|p| visit(p.id, &nodes, &mut marks, &mut path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
