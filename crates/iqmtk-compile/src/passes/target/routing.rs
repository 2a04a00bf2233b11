//! Routing onto the device coupling graph.

use std::collections::BTreeSet;

use iqmtk_ir::{CircuitDag, Instruction, NodeIndex, Qubit, QubitId, StandardGate, WireId};
use tracing::debug;

use crate::decompose::expand_to_cx;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Architecture, Layout, PropertySet};

use super::placement::Placement;

/// Swap-insertion routing.
///
/// Rewrites the circuit onto physical nodes: every qubit becomes
/// `node[p]` with id `p`. Before a two-qubit gate on uncoupled nodes the
/// first operand is walked along a shortest path with SWAP gates.
/// Measurements followed only by measurements are held back and emitted
/// at the end under the final layout, so no SWAP follows a readout.
///
/// Needs [`PropertySet::initial_layout`]; leaves the layout after the
/// last SWAP in [`PropertySet::final_layout`]. Gates on three or more
/// qubits are expanded to CX first.
pub struct Routing {
    arch: Architecture,
}

impl Routing {
    /// Create a routing pass for `arch`.
    pub fn new(arch: Architecture) -> Self {
        Self { arch }
    }

    fn physical(layout: &Layout, qubit: QubitId) -> CompileResult<u32> {
        layout.get_physical(qubit).ok_or(CompileError::MissingLayout)
    }

    /// True when nothing but measurements follows on the measured qubit
    /// and bit.
    fn is_terminal(dag: &CircuitDag, node: NodeIndex, inst: &Instruction) -> bool {
        inst.qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(inst.clbits.iter().map(|&c| WireId::Clbit(c)))
            .all(|wire| {
                let mut current = node;
                while let Some(next) = dag.next_on_wire(current, wire) {
                    match dag.get_instruction(next) {
                        None => return true,
                        Some(i) if i.is_measure() => current = next,
                        Some(_) => return false,
                    }
                }
                true
            })
    }

    fn route_gate(
        &self,
        inst: &Instruction,
        layout: &mut Layout,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        if let &[a, b] = inst.qubits.as_slice() {
            let (pa, pb) = (Self::physical(layout, a)?, Self::physical(layout, b)?);
            if !self.arch.is_connected(pa, pb) {
                let path = self
                    .arch
                    .shortest_path(pa, pb)
                    .ok_or(CompileError::RoutingFailed {
                        qubit1: pa,
                        qubit2: pb,
                    })?;
                for hop in path[..path.len() - 1].windows(2) {
                    out.push(Instruction::gate(
                        StandardGate::Swap,
                        [QubitId(hop[0]), QubitId(hop[1])],
                    ));
                    layout.swap(hop[0], hop[1]);
                }
                debug!("routed {} with {} swaps", inst.name(), path.len() - 2);
            }
        }

        let mut mapped = inst.clone();
        mapped.qubits = inst
            .qubits
            .iter()
            .map(|&q| Self::physical(layout, q).map(QubitId))
            .collect::<CompileResult<_>>()?;
        out.push(mapped);
        Ok(())
    }
}

impl Pass for Routing {
    fn name(&self) -> &'static str {
        "Routing"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let mut layout = properties
            .initial_layout
            .clone()
            .ok_or(CompileError::MissingLayout)?;

        let mut routed = Vec::with_capacity(dag.num_ops());
        let mut held = Vec::new();
        for (node, inst) in dag.topological_ops() {
            if inst.is_measure() && Self::is_terminal(dag, node, inst) {
                held.push(inst.clone());
                continue;
            }
            for part in expand_to_cx(inst) {
                if part.qubits.len() > 2 && !part.is_barrier() {
                    return Err(CompileError::TooManyQubits {
                        gate: part.name().to_string(),
                        num_qubits: part.qubits.len(),
                    });
                }
                self.route_gate(&part, &mut layout, &mut routed)?;
            }
        }
        for inst in held {
            self.route_gate(&inst, &mut layout, &mut routed)?;
        }

        let mut nodes: BTreeSet<u32> = layout.iter().map(|(_, p)| p).collect();
        nodes.extend(routed.iter().flat_map(|i| i.qubits.iter().map(|q| q.0)));

        let mut new_dag = CircuitDag::with_bits(
            nodes.into_iter().map(|p| Qubit::node(QubitId(p), p)),
            dag.clbits().iter().cloned(),
        );
        new_dag.set_global_phase(dag.global_phase());
        for inst in routed {
            new_dag.apply(inst)?;
        }

        *dag = new_dag;
        properties.final_layout = Some(layout);
        Ok(())
    }
}

/// Placement followed by routing.
///
/// An existing initial layout is reused.
pub struct DefaultMapping {
    placement: Placement,
    routing: Routing,
}

impl DefaultMapping {
    /// Create the mapping pass for `arch`.
    pub fn new(arch: Architecture) -> Self {
        Self {
            placement: Placement::new(arch.clone()),
            routing: Routing::new(arch),
        }
    }
}

impl Pass for DefaultMapping {
    fn name(&self) -> &'static str {
        "DefaultMapping"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        if self.placement.should_run(dag, properties) {
            self.placement.run(dag, properties)?;
        }
        self.routing.run(dag, properties)
    }
}
