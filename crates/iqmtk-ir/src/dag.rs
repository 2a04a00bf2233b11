//! DAG-based circuit representation.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// An edge in the circuit DAG representing a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: WireId,
}

/// DAG-based circuit representation.
///
/// Each wire runs from its `In` node through the operations that touch it
/// to its `Out` node. Conditional gates occupy the classical wires they
/// read, so they stay ordered after the measurements that feed them.
///
/// Operation nodes are only ever appended, and an operation only links to
/// nodes that already exist. Restricted to operations, node index order is
/// therefore a topological order that keeps independent operations in
/// insertion order. Passes that rewrite a circuit build a fresh DAG with
/// [`CircuitDag::empty_like`] and re-apply instructions.
#[derive(Debug, Clone)]
pub struct CircuitDag {
    graph: DiGraph<DagNode, DagEdge, u32>,
    /// Qubits in insertion order.
    qubits: Vec<Qubit>,
    /// Classical bits in insertion order.
    clbits: Vec<Clbit>,
    /// Input and output node of every wire.
    wire_io: FxHashMap<WireId, (NodeIndex, NodeIndex)>,
    /// Last node before the output node, per wire.
    wire_front: FxHashMap<WireId, NodeIndex>,
    /// Global phase of the circuit in radians.
    global_phase: f64,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::default(),
            qubits: vec![],
            clbits: vec![],
            wire_io: FxHashMap::default(),
            wire_front: FxHashMap::default(),
            global_phase: 0.0,
        }
    }

    /// Create a DAG with the same qubits, bits and phase but no operations.
    pub fn empty_like(&self) -> Self {
        let mut dag = Self::with_bits(self.qubits.iter().cloned(), self.clbits.iter().cloned());
        dag.global_phase = self.global_phase;
        dag
    }

    /// Create an operation-free DAG over the given bits.
    pub fn with_bits(
        qubits: impl IntoIterator<Item = Qubit>,
        clbits: impl IntoIterator<Item = Clbit>,
    ) -> Self {
        let mut dag = Self::new();
        for q in qubits {
            dag.add_qubit(q);
        }
        for c in clbits {
            dag.add_clbit(c);
        }
        dag
    }

    fn add_wire(&mut self, wire: WireId) {
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.wire_io.insert(wire, (in_node, out_node));
        self.wire_front.insert(wire, in_node);
    }

    /// Add a qubit. A qubit whose id is already present is ignored.
    pub fn add_qubit(&mut self, qubit: Qubit) {
        let wire = WireId::Qubit(qubit.id);
        if self.wire_io.contains_key(&wire) {
            return;
        }
        self.add_wire(wire);
        self.qubits.push(qubit);
    }

    /// Add a classical bit. A bit whose id is already present is ignored.
    pub fn add_clbit(&mut self, clbit: Clbit) {
        let wire = WireId::Clbit(clbit.id);
        if self.wire_io.contains_key(&wire) {
            return;
        }
        self.add_wire(wire);
        self.clbits.push(clbit);
    }

    fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = instruction.as_gate().map(|g| g.name().to_string());

        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let expected = gate.num_qubits();
                let got = u32::try_from(instruction.qubits.len()).unwrap_or(u32::MAX);
                if expected != got {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: gate.name().to_string(),
                        expected,
                        got,
                    });
                }
            }
            InstructionKind::Measure => {
                if instruction.qubits.len() != 1 || instruction.clbits.len() != 1 {
                    return Err(IrError::MalformedInstruction("measure".into()));
                }
            }
            InstructionKind::Reset => {
                if instruction.qubits.len() != 1 || !instruction.clbits.is_empty() {
                    return Err(IrError::MalformedInstruction("reset".into()));
                }
            }
            InstructionKind::Barrier => {}
        }

        let mut seen = FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !self.wire_io.contains_key(&WireId::Qubit(qubit)) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        for clbit in instruction.classical_wires() {
            if !self.wire_io.contains_key(&WireId::Clbit(clbit)) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Splice `op_node` in front of the output node of `wire`.
    fn connect(&mut self, wire: WireId, op_node: NodeIndex) -> IrResult<()> {
        let (_, out_node) = self.wire_io[&wire];
        let prev_node = self.wire_front[&wire];

        let edge = self
            .graph
            .edges_directed(prev_node, Direction::Outgoing)
            .find(|e| e.weight().wire == wire && e.target() == out_node)
            .map(|e| e.id())
            .ok_or_else(|| {
                IrError::InvalidDag(format!("Missing edge into output of wire {wire:?}"))
            })?;

        self.graph.remove_edge(edge);
        self.graph.add_edge(prev_node, op_node, DagEdge { wire });
        self.graph.add_edge(op_node, out_node, DagEdge { wire });
        self.wire_front.insert(wire, op_node);
        Ok(())
    }

    /// Apply an instruction to the end of the circuit.
    ///
    /// Checks gate arity, operand existence and duplicate qubits before
    /// touching the graph.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        self.validate(&instruction)?;

        let wires: Vec<WireId> = instruction
            .qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(instruction.classical_wires().into_iter().map(WireId::Clbit))
            .collect();

        let op_node = self.graph.add_node(DagNode::Op(instruction));
        for wire in wires {
            self.connect(wire, op_node)?;
        }
        Ok(op_node)
    }

    /// Iterate over operations in topological order.
    ///
    /// The order is deterministic: independent operations appear in the
    /// order they were applied.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph[idx].instruction().map(|inst| (idx, inst)))
    }

    /// Iterate over instructions in topological order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.topological_ops().map(|(_, inst)| inst)
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn get_instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.graph.node_weight(node).and_then(DagNode::instruction)
    }

    /// The node following `node` on `wire`, possibly the wire's output node.
    pub fn next_on_wire(&self, node: NodeIndex, wire: WireId) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .find(|e| e.weight().wire == wire)
            .map(|e| e.target())
    }

    /// Check whether `node` is the last operation on every wire it touches.
    pub fn is_last_on_wires(&self, node: NodeIndex) -> bool {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .all(|e| matches!(self.graph[e.target()], DagNode::Out(_)))
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Get the number of operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.graph.node_count().saturating_sub(2 * self.wire_io.len())
    }

    /// Calculate the circuit depth.
    ///
    /// Output nodes may be visited before their predecessors, but they
    /// never feed an operation, so operation depths are exact.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.graph.node_count()];
        let mut max_depth = 0;

        for node in self.graph.node_indices() {
            let pred = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| depths[e.source().index()])
                .max()
                .unwrap_or(0);
            let depth = if matches!(self.graph[node], DagNode::Op(_)) {
                pred + 1
            } else {
                pred
            };
            depths[node.index()] = depth;
            max_depth = max_depth.max(depth);
        }

        max_depth
    }

    /// Qubits in insertion order.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Classical bits in insertion order.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    /// Look up a qubit by id.
    pub fn qubit(&self, id: QubitId) -> Option<&Qubit> {
        self.qubits.iter().find(|q| q.id == id)
    }

    /// Look up a classical bit by id.
    pub fn clbit(&self, id: ClbitId) -> Option<&Clbit> {
        self.clbits.iter().find(|c| c.id == id)
    }

    /// Get the global phase.
    pub fn global_phase(&self) -> f64 {
        self.global_phase
    }

    /// Set the global phase.
    pub fn set_global_phase(&mut self, phase: f64) {
        self.global_phase = phase;
    }

    /// Add to the global phase.
    pub fn add_global_phase(&mut self, phase: f64) {
        self.global_phase += phase;
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &DiGraph<DagNode, DagEdge, u32> {
        &self.graph
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks acyclicity and that every wire is a connected path from its
    /// `In` node to its `Out` node.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }

        for (&wire, &(in_node, out_node)) in &self.wire_io {
            let mut current = in_node;
            let mut steps = 0;
            while current != out_node {
                current = self
                    .graph
                    .edges_directed(current, Direction::Outgoing)
                    .find(|e| e.weight().wire == wire)
                    .map(|e| e.target())
                    .ok_or_else(|| {
                        IrError::InvalidDag(format!(
                            "Wire {wire:?} is broken after node {current:?}"
                        ))
                    })?;
                steps += 1;
                if steps > self.graph.node_count() {
                    return Err(IrError::InvalidDag(format!("Wire {wire:?} does not terminate")));
                }
            }
        }

        Ok(())
    }
}

impl Default for CircuitDag {
    fn default() -> Self {
        Self::new()
    }
}
