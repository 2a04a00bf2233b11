//! Rebase to the IQM native gate set.

use iqmtk_ir::{CircuitDag, Gate, GateKind, Instruction};

use crate::decompose::{cx_to_cz, expand_to_cx, gate_to_prx};
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Rewrite every gate as PRX and CZ.
///
/// Multi-qubit gates are expanded to CX, CX becomes CZ between two PRX
/// gates and each single-qubit gate becomes at most two PRX gates.
/// Measurements, resets and barriers pass through, and a classical
/// condition follows its gate onto the replacements. Boxes must be
/// decomposed first.
pub struct IqmRebase;

/// Rebase a single instruction.
pub fn rebase_instruction(inst: &Instruction) -> CompileResult<Vec<Instruction>> {
    let Some(gate) = inst.as_gate() else {
        return Ok(vec![inst.clone()]);
    };
    if let GateKind::Boxed(b) = &gate.kind {
        return Err(CompileError::UnsupportedGate(b.name.clone()));
    }

    let mut out = Vec::new();
    for part in expand_to_cx(inst).iter().flat_map(cx_to_cz) {
        let Some(std) = part.as_gate().and_then(Gate::as_standard) else {
            out.push(part);
            continue;
        };
        if std.num_qubits() != 1 {
            out.push(part);
            continue;
        }
        for prx in gate_to_prx(std)? {
            let mut native = Gate::standard(prx);
            native.condition = part.condition().cloned();
            out.push(Instruction::gate(native, part.qubits.clone()));
        }
    }
    Ok(out)
}

impl Pass for IqmRebase {
    fn name(&self) -> &'static str {
        "IqmRebase"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut new_dag = dag.empty_like();
        for inst in dag.instructions() {
            for native in rebase_instruction(inst)? {
                new_dag.apply(native)?;
            }
        }
        *dag = new_dag;
        Ok(())
    }
}
