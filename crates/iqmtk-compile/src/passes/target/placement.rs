//! Placement of logical qubits onto physical nodes.

use iqmtk_ir::{CircuitDag, QubitId};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Architecture, Layout, PropertySet};

/// Cost of a pair of nodes that cannot reach each other.
const UNREACHABLE: u64 = 1 << 20;

/// Greedy interaction-graph placement.
///
/// The most interacting qubit goes on the best connected node. Each
/// further qubit, taken in order of how strongly it interacts with the
/// qubits already placed, goes on the free node that minimises the
/// weighted distance to its placed partners. A circuit that already lives
/// on device nodes keeps its placement.
///
/// Stores the result in [`PropertySet::initial_layout`].
pub struct Placement {
    arch: Architecture,
}

impl Placement {
    /// Create a placement pass for `arch`.
    pub fn new(arch: Architecture) -> Self {
        Self { arch }
    }

    /// Compute the layout without running the pass.
    pub fn place(&self, dag: &CircuitDag) -> CompileResult<Layout> {
        let logical: Vec<QubitId> = dag.qubits().iter().map(|q| q.id).collect();
        if logical.len() > self.arch.num_nodes() {
            return Err(CompileError::CircuitTooLarge {
                required: logical.len(),
                available: u32::try_from(self.arch.num_nodes()).unwrap_or(u32::MAX),
            });
        }

        let already_placed: Option<Vec<(QubitId, u32)>> = dag
            .qubits()
            .iter()
            .map(|q| {
                q.node_index()
                    .filter(|&n| self.arch.contains(n))
                    .map(|n| (q.id, n))
            })
            .collect();
        if let Some(pairs) = already_placed {
            let mut layout = Layout::new();
            for (l, p) in pairs {
                layout.add(l, p);
            }
            return Ok(layout);
        }

        let weights = interaction_weights(dag);
        let weight = |a: QubitId, b: QubitId| -> u64 {
            weights.get(&ordered(a, b)).copied().unwrap_or(0)
        };
        let total = |a: QubitId| -> u64 { logical.iter().map(|&b| weight(a, b)).sum() };

        let mut layout = Layout::new();
        let mut unplaced = logical.clone();
        while !unplaced.is_empty() {
            // Strongest pull towards the placed set first, then busiest.
            let (pos, &next) = unplaced
                .iter()
                .enumerate()
                .max_by_key(|&(i, &l)| {
                    let pull: u64 = layout.iter().map(|(m, _)| weight(l, m)).sum();
                    (pull, total(l), std::cmp::Reverse(i))
                })
                .ok_or(CompileError::MissingLayout)?;
            unplaced.remove(pos);

            let node = self.best_node(&layout, next, &weight)?;
            debug!("placing {} on node {}", next, node);
            layout.add(next, node);
        }
        Ok(layout)
    }

    fn best_node(
        &self,
        layout: &Layout,
        qubit: QubitId,
        weight: &dyn Fn(QubitId, QubitId) -> u64,
    ) -> CompileResult<u32> {
        let dist = |a: u32, b: u32| self.arch.distance(a, b).map_or(UNREACHABLE, u64::from);
        let placed: Vec<(QubitId, u32)> = layout.iter().collect();

        self.arch
            .nodes()
            .filter(|&n| layout.get_logical(n).is_none())
            .min_by_key(|&n| {
                let pull: u64 = placed.iter().map(|&(m, p)| weight(qubit, m) * dist(n, p)).sum();
                let spread = placed.iter().map(|&(_, p)| dist(n, p)).min().unwrap_or(0);
                (pull, spread, std::cmp::Reverse(self.arch.degree(n)), n)
            })
            .ok_or(CompileError::CircuitTooLarge {
                required: layout.len() + 1,
                available: u32::try_from(self.arch.num_nodes()).unwrap_or(u32::MAX),
            })
    }
}

fn ordered(a: QubitId, b: QubitId) -> (QubitId, QubitId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Number of multi-qubit operations acting on each pair of qubits.
fn interaction_weights(dag: &CircuitDag) -> FxHashMap<(QubitId, QubitId), u64> {
    let mut weights = FxHashMap::default();
    for inst in dag.instructions().filter(|i| i.is_gate()) {
        for (i, &a) in inst.qubits.iter().enumerate() {
            for &b in &inst.qubits[i + 1..] {
                *weights.entry(ordered(a, b)).or_insert(0) += 1;
            }
        }
    }
    weights
}

impl Pass for Placement {
    fn name(&self) -> &'static str {
        "Placement"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        properties.initial_layout = Some(self.place(dag)?);
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.initial_layout.is_none()
    }
}
