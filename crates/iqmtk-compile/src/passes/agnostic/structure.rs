//! Passes that reshape a circuit without touching its gates.

use iqmtk_ir::{
    CircuitDag, Clbit, DEFAULT_CLBIT_REGISTER, DEFAULT_QUBIT_REGISTER, GateKind, Instruction,
    NODE_REGISTER, Qubit,
};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Inline every circuit box, recursively.
///
/// Local qubit `i` of a box body becomes the box's `i`-th operand. A
/// condition on the box is copied onto every gate of the body.
pub struct DecomposeBoxes;

fn inline_into(inst: &Instruction, out: &mut Vec<Instruction>) {
    let Some(gate) = inst.as_gate() else {
        out.push(inst.clone());
        return;
    };
    let GateKind::Boxed(body) = &gate.kind else {
        out.push(inst.clone());
        return;
    };

    for inner in &body.ops {
        let mut mapped = inner.clone();
        mapped.qubits = inner
            .qubits
            .iter()
            .filter_map(|q| inst.qubits.get(q.0 as usize).copied())
            .collect();
        if let (Some(cond), Some(g)) = (&gate.condition, mapped.gate_mut()) {
            g.condition = Some(cond.clone());
        }
        inline_into(&mapped, out);
    }
}

impl Pass for DecomposeBoxes {
    fn name(&self) -> &'static str {
        "DecomposeBoxes"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut flat = Vec::with_capacity(dag.num_ops());
        for inst in dag.instructions() {
            inline_into(inst, &mut flat);
        }

        let mut new_dag = dag.empty_like();
        for inst in flat {
            new_dag.apply(inst)?;
        }
        *dag = new_dag;
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.instructions()
            .any(|i| i.as_gate().is_some_and(|g| matches!(g.kind, GateKind::Boxed(_))))
    }
}

/// Move every qubit into register `q` and every bit into register `c`,
/// numbered in insertion order. Ids are unchanged.
///
/// Qubits that all live on device nodes are already placed and stay as
/// they are.
pub struct FlattenRegisters;

fn is_placed(dag: &CircuitDag) -> bool {
    !dag.qubits().is_empty() && dag.qubits().iter().all(|q| q.register == NODE_REGISTER)
}

impl Pass for FlattenRegisters {
    fn name(&self) -> &'static str {
        "FlattenRegisters"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let placed = is_placed(dag);
        let qubits = dag.qubits().iter().zip(0..).map(|(q, i)| {
            if placed {
                q.clone()
            } else {
                Qubit::new(q.id, DEFAULT_QUBIT_REGISTER, i)
            }
        });
        let clbits = dag
            .clbits()
            .iter()
            .zip(0..)
            .map(|(c, i)| Clbit::new(c.id, DEFAULT_CLBIT_REGISTER, i));

        let mut new_dag = CircuitDag::with_bits(qubits, clbits);
        new_dag.set_global_phase(dag.global_phase());
        for inst in dag.instructions() {
            new_dag.apply(inst.clone())?;
        }
        *dag = new_dag;
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        let flat_q = is_placed(dag)
            || dag
                .qubits()
                .iter()
                .zip(0..)
                .all(|(q, i)| q.register == DEFAULT_QUBIT_REGISTER && q.index == i);
        let flat_c = dag
            .clbits()
            .iter()
            .zip(0..)
            .all(|(c, i)| c.register == DEFAULT_CLBIT_REGISTER && c.index == i);
        !(flat_q && flat_c)
    }
}

/// Drop all barriers.
pub struct RemoveBarriers;

impl Pass for RemoveBarriers {
    fn name(&self) -> &'static str {
        "RemoveBarriers"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut new_dag = dag.empty_like();
        for inst in dag.instructions().filter(|i| !i.is_barrier()) {
            new_dag.apply(inst.clone())?;
        }
        *dag = new_dag;
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.instructions().any(Instruction::is_barrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_ir::{Circuit, CircuitBox, ClassicalCondition, ClbitId, QubitId, StandardGate};

    fn run(pass: &dyn Pass, circuit: &mut Circuit) {
        let mut props = PropertySet::new();
        if pass.should_run(circuit.dag(), &props) {
            pass.run(circuit.dag_mut(), &mut props).unwrap();
        }
    }

    #[test]
    fn test_decompose_nested_boxes() {
        let inner = CircuitBox::new(
            "inner",
            2,
            vec![Instruction::gate(StandardGate::CX, [QubitId(1), QubitId(0)])],
        )
        .unwrap();
        let outer = CircuitBox::new(
            "outer",
            2,
            vec![
                Instruction::gate(StandardGate::H, [QubitId(0)]),
                Instruction::gate(inner, [QubitId(0), QubitId(1)]),
            ],
        )
        .unwrap();

        let mut c = Circuit::with_size("boxes", 3, 0);
        c.add_box(outer, [QubitId(2), QubitId(0)]).unwrap();
        run(&DecomposeBoxes, &mut c);

        let ops = c.ops();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name(), "h");
        assert_eq!(ops[0].qubits, vec![QubitId(2)]);
        assert_eq!(ops[1].name(), "cx");
        assert_eq!(ops[1].qubits, vec![QubitId(0), QubitId(2)]);
    }

    #[test]
    fn test_box_condition_reaches_body() {
        let body = CircuitBox::new(
            "flip",
            1,
            vec![
                Instruction::gate(StandardGate::X, [QubitId(0)]),
                Instruction::gate(StandardGate::Z, [QubitId(0)]),
            ],
        )
        .unwrap();
        let cond = ClassicalCondition::new([ClbitId(0)], 1);
        let mut c = Circuit::with_size("cond", 1, 1);
        c.gate(iqmtk_ir::Gate::boxed(body).with_condition(cond.clone()), [QubitId(0)])
            .unwrap();
        run(&DecomposeBoxes, &mut c);

        assert!(c.ops().iter().all(|i| i.condition() == Some(&cond)));
    }

    #[test]
    fn test_flatten_registers() {
        let mut c = Circuit::new("regs");
        let a = c.add_qreg("a", 2);
        let b = c.add_qreg("b", 1);
        let m = c.add_creg("m", 1);
        c.cx(a[1], b[0]).unwrap().measure(b[0], m[0]).unwrap();

        let flatten = FlattenRegisters;
        assert!(flatten.should_run(c.dag(), &PropertySet::new()));
        run(&flatten, &mut c);

        let names: Vec<_> = c.qubits().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["q[0]", "q[1]", "q[2]"]);
        assert_eq!(c.clbits()[0].to_string(), "c[0]");
        assert_eq!(c.ops()[0].qubits, vec![a[1], b[0]]);
        assert!(!flatten.should_run(c.dag(), &PropertySet::new()));
    }

    #[test]
    fn test_flatten_keeps_device_nodes() {
        let dag = CircuitDag::with_bits(
            [Qubit::node(QubitId(3), 3), Qubit::node(QubitId(1), 1)],
            [Clbit::new(ClbitId(0), "m", 0)],
        );
        let mut c = Circuit::from_dag("placed", dag);
        run(&FlattenRegisters, &mut c);
        assert_eq!(c.qubits()[0].to_string(), "node[3]");
        assert_eq!(c.clbits()[0].to_string(), "c[0]");
    }

    #[test]
    fn test_remove_barriers() {
        let mut c = Circuit::with_size("b", 2, 0);
        c.h(QubitId(0)).unwrap().barrier_all().unwrap().h(QubitId(1)).unwrap();
        run(&RemoveBarriers, &mut c);
        assert_eq!(c.dag().num_ops(), 2);
        assert!(!c.ops().iter().any(|i| i.is_barrier()));
    }
}
