//! Moving measurements to the end of the circuit.

use iqmtk_ir::{CircuitDag, Instruction, NodeIndex, WireId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Commute every measurement to the end of the circuit.
///
/// A measurement can move when nothing but further measurements follows it
/// on its qubit and on its bit. Anything else is a genuine mid-circuit
/// measurement and fails the pass.
pub struct DelayMeasures;

impl DelayMeasures {
    fn check_tail(dag: &CircuitDag, node: NodeIndex, inst: &Instruction) -> CompileResult<()> {
        let Some(&qubit) = inst.qubits.first() else {
            return Ok(());
        };
        let wires = inst
            .qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(inst.clbits.iter().map(|&c| WireId::Clbit(c)));

        for wire in wires {
            let mut current = node;
            while let Some(next) = dag.next_on_wire(current, wire) {
                match dag.get_instruction(next) {
                    None => break,
                    Some(follower) if follower.is_measure() => current = next,
                    Some(follower) => {
                        return Err(CompileError::MidCircuitMeasurement {
                            qubit,
                            op: follower.name().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Pass for DelayMeasures {
    fn name(&self) -> &'static str {
        "DelayMeasures"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut body = Vec::with_capacity(dag.num_ops());
        let mut measures = Vec::new();
        for (node, inst) in dag.topological_ops() {
            if inst.is_measure() {
                Self::check_tail(dag, node, inst)?;
                measures.push(inst.clone());
            } else {
                body.push(inst.clone());
            }
        }

        let mut new_dag = dag.empty_like();
        for inst in body.into_iter().chain(measures) {
            new_dag.apply(inst)?;
        }
        *dag = new_dag;
        Ok(())
    }
}
