//! `PropertySet` and target description types.
//!
//! Passes that need the device carry their own [`Architecture`]; the
//! [`PropertySet`] is where passes leave results for later passes, such as
//! the layout chosen by placement.
//!
//! ```
//! use iqmtk_compile::{Architecture, BasisGates, Layout, PropertySet};
//! use iqmtk_ir::QubitId;
//!
//! let arch = Architecture::from_edges([(0, 1), (1, 2)]);
//! assert!(arch.is_connected(1, 0));
//! assert_eq!(arch.distance(0, 2), Some(2));
//!
//! let mut props = PropertySet::new();
//! props.initial_layout = Some(Layout::trivial(3));
//! assert_eq!(props.initial_layout.unwrap().get_physical(QubitId(2)), Some(2));
//! assert!(BasisGates::iqm().contains("prx"));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, VecDeque};

use iqmtk_ir::QubitId;

/// A mapping from logical qubits to physical qubits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    logical_to_physical: FxHashMap<QubitId, u32>,
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (logical qubit i -> physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// Any previous mapping of either side is removed first, so both
    /// directions stay consistent.
    pub fn add(&mut self, logical: QubitId, physical: u32) {
        if let Some(old_logical) = self.physical_to_logical.remove(&physical) {
            self.logical_to_physical.remove(&old_logical);
        }
        if let Some(old_physical) = self.logical_to_physical.remove(&logical) {
            self.physical_to_logical.remove(&old_physical);
        }
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Get the physical qubit for a logical qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Get the logical qubit for a physical qubit.
    pub fn get_logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Swap the contents of two physical qubits.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.remove(&p1);
        let l2 = self.physical_to_logical.remove(&p2);

        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.logical_to_physical.iter().map(|(&l, &p)| (l, p))
    }
}

/// Serialised form of an [`Architecture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchitectureRepr {
    nodes: Vec<u32>,
    edges: Vec<(u32, u32)>,
}

/// Connectivity graph of a device.
///
/// Nodes are physical qubit indices; edges are undirected couplings. A node
/// may exist without any coupling. All-pairs BFS distances are computed on
/// construction, so `distance` is a lookup and `shortest_path` walks a
/// predecessor table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ArchitectureRepr", into = "ArchitectureRepr")]
pub struct Architecture {
    nodes: BTreeSet<u32>,
    edges: Vec<(u32, u32)>,
    adjacency: FxHashMap<u32, Vec<u32>>,
    /// `dist[from][to]`, `u32::MAX` when unreachable.
    dist: Vec<Vec<u32>>,
    /// `pred[from][to]` is the node before `to` on a shortest path.
    pred: Vec<Vec<u32>>,
}

impl Architecture {
    /// Create an architecture from explicit nodes and couplings.
    ///
    /// Edge endpoints are added to the node set; duplicate and reversed
    /// edges and self-loops are dropped.
    pub fn new(
        nodes: impl IntoIterator<Item = u32>,
        edges: impl IntoIterator<Item = (u32, u32)>,
    ) -> Self {
        let mut arch = Self {
            nodes: nodes.into_iter().collect(),
            edges: vec![],
            adjacency: FxHashMap::default(),
            dist: vec![],
            pred: vec![],
        };
        for (a, b) in edges {
            arch.nodes.insert(a);
            arch.nodes.insert(b);
            if a == b || arch.is_connected(a, b) {
                continue;
            }
            arch.edges.push((a, b));
            arch.adjacency.entry(a).or_default().push(b);
            arch.adjacency.entry(b).or_default().push(a);
        }
        arch.precompute_distances();
        arch
    }

    /// Create an architecture whose nodes are exactly the edge endpoints.
    pub fn from_edges(edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self::new([], edges)
    }

    /// Create a linear chain 0-1-2-...
    pub fn linear(n: u32) -> Self {
        Self::new(0..n, (1..n).map(|i| (i - 1, i)))
    }

    /// Create a star with centre 0.
    pub fn star(n: u32) -> Self {
        Self::new(0..n, (1..n).map(|i| (0, i)))
    }

    /// Create a fully connected architecture.
    pub fn full(n: u32) -> Self {
        Self::new(0..n, (0..n).flat_map(|i| ((i + 1)..n).map(move |j| (i, j))))
    }

    fn precompute_distances(&mut self) {
        let size = self.nodes.last().map_or(0, |&m| m as usize + 1);
        self.dist = vec![vec![u32::MAX; size]; size];
        self.pred = vec![vec![u32::MAX; size]; size];

        for &src in &self.nodes {
            let s = src as usize;
            self.dist[s][s] = 0;
            let mut queue = VecDeque::from([src]);
            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                    let nb = neighbor as usize;
                    if self.dist[s][nb] == u32::MAX {
                        self.dist[s][nb] = self.dist[s][cur] + 1;
                        self.pred[s][nb] = current;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Physical nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().copied()
    }

    /// Number of physical nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether `node` is part of the architecture.
    pub fn contains(&self, node: u32) -> bool {
        self.nodes.contains(&node)
    }

    /// Couplings in insertion order.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Check if two nodes are directly coupled.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Neighbours of a node.
    pub fn neighbors(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    /// Number of couplings of a node.
    pub fn degree(&self, node: u32) -> usize {
        self.adjacency.get(&node).map_or(0, Vec::len)
    }

    /// Shortest-path distance, `None` if unreachable or unknown.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        let d = *self.dist.get(from as usize)?.get(to as usize)?;
        (d != u32::MAX).then_some(d)
    }

    /// A shortest path from `from` to `to`, both ends included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        self.distance(from, to)?;
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            current = self.pred[from as usize][current as usize];
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

impl PartialEq for Architecture {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl From<ArchitectureRepr> for Architecture {
    fn from(repr: ArchitectureRepr) -> Self {
        Self::new(repr.nodes, repr.edges)
    }
}

impl From<Architecture> for ArchitectureRepr {
    fn from(arch: Architecture) -> Self {
        Self {
            nodes: arch.nodes.into_iter().collect(),
            edges: arch.edges,
        }
    }
}

/// Gate names a target executes natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisGates {
    gates: BTreeSet<String>,
}

impl BasisGates {
    /// Create a new basis gate set.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gates: gates.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a gate is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.contains(gate)
    }

    /// Gate names in sorted order.
    pub fn gates(&self) -> impl Iterator<Item = &str> {
        self.gates.iter().map(String::as_str)
    }

    /// Number of gates.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// IQM native gates (PRX + CZ).
    pub fn iqm() -> Self {
        Self::new(["prx", "cz", "measure", "barrier"])
    }
}

/// Results passes share with later passes.
///
/// Besides the layouts, passes can store arbitrary typed values with
/// [`insert`](Self::insert) and [`get`](Self::get); each type holds at most
/// one value.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Logical → physical placement chosen before routing.
    pub initial_layout: Option<Layout>,

    /// Logical → physical placement after routing swaps.
    pub final_layout: Option<Layout>,

    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap(0, 2);

        assert_eq!(layout.get_physical(QubitId(0)), Some(2));
        assert_eq!(layout.get_physical(QubitId(2)), Some(0));
        assert_eq!(layout.get_logical(0), Some(QubitId(2)));
    }

    #[test]
    fn test_layout_swap_with_empty_node() {
        let mut layout = Layout::new();
        layout.add(QubitId(0), 4);
        layout.swap(4, 7);

        assert_eq!(layout.get_physical(QubitId(0)), Some(7));
        assert_eq!(layout.get_logical(4), None);
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_layout_add_replaces() {
        let mut layout = Layout::trivial(2);
        layout.add(QubitId(0), 1);
        assert_eq!(layout.get_logical(1), Some(QubitId(0)));
        assert_eq!(layout.get_physical(QubitId(1)), None);
        assert_eq!(layout.get_logical(0), None);
    }

    #[test]
    fn test_architecture_isolated_nodes() {
        let arch = Architecture::new([0, 5], [(0, 1), (1, 0), (2, 2)]);
        assert_eq!(arch.nodes().collect::<Vec<_>>(), [0, 1, 2, 5]);
        assert_eq!(arch.edges(), &[(0, 1)]);
        assert!(arch.contains(5));
        assert_eq!(arch.degree(5), 0);
        assert_eq!(arch.distance(0, 5), None);
        assert_eq!(arch.shortest_path(0, 5), None);
    }

    #[test]
    fn test_architecture_paths() {
        let arch = Architecture::linear(5);
        assert_eq!(arch.distance(0, 4), Some(4));
        assert_eq!(arch.shortest_path(4, 1), Some(vec![4, 3, 2, 1]));
        assert_eq!(arch.shortest_path(2, 2), Some(vec![2]));

        let star = Architecture::star(5);
        assert_eq!(star.distance(1, 2), Some(2));
        assert_eq!(star.degree(0), 4);
        assert_eq!(Architecture::full(4).edges().len(), 6);
    }

    #[test]
    fn test_architecture_serde_rebuilds_caches() {
        let arch = Architecture::new([9], [(0, 1), (1, 2)]);
        let json = serde_json::to_string(&arch).unwrap();
        let back: Architecture = serde_json::from_str(&json).unwrap();
        assert_eq!(back, arch);
        assert_eq!(back.distance(0, 2), Some(2));
        assert!(back.contains(9));
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));
        props.get_mut::<CustomData>().unwrap().0 = 7;
        assert_eq!(props.remove::<CustomData>(), Some(CustomData(7)));
        assert_eq!(props.get::<CustomData>(), None);
    }
}
