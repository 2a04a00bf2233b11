//! Removal of gates that provably do nothing.

use iqmtk_ir::{CircuitDag, Instruction, WireId};
use rustc_hash::FxHashSet;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;
use crate::unitary::{EPSILON, Unitary2x2};

use super::peephole::{OneQubitMerge, Peephole};

const SWEEP: Peephole = Peephole {
    merge: OneQubitMerge::SameAxis,
    cancel_pairs: true,
};

/// Clean-up run after the rebase.
///
/// Fuses PRX gates about the same axis, drops zero rotations, cancels
/// CX/CZ pairs and removes diagonal gates whose every qubit is measured
/// next. Gate types are preserved, so the output stays in the IQM gate
/// set. One run is one round; wrap it in [`Repeat`](crate::Repeat) to
/// reach a fixpoint.
pub struct RemoveRedundancies;

fn is_diagonal(inst: &Instruction) -> bool {
    let Some(gate) = inst.as_gate() else {
        return false;
    };
    if gate.condition.is_some() {
        return false;
    }
    let Some(std) = gate.as_standard() else {
        return false;
    };
    std.is_diagonal()
        || Unitary2x2::from_gate(std)
            .is_some_and(|u| u.data[1].norm() < EPSILON && u.data[2].norm() < EPSILON)
}

fn strip_before_measure(dag: &CircuitDag) -> CompileResult<Option<CircuitDag>> {
    let doomed: FxHashSet<_> = dag
        .topological_ops()
        .filter(|(node, inst)| {
            is_diagonal(inst)
                && inst.qubits.iter().all(|&q| {
                    dag.next_on_wire(*node, WireId::Qubit(q))
                        .and_then(|next| dag.get_instruction(next))
                        .is_some_and(Instruction::is_measure)
                })
        })
        .map(|(node, _)| node)
        .collect();
    if doomed.is_empty() {
        return Ok(None);
    }

    let mut new_dag = dag.empty_like();
    for (node, inst) in dag.topological_ops() {
        if !doomed.contains(&node) {
            new_dag.apply(inst.clone())?;
        }
    }
    Ok(Some(new_dag))
}

impl Pass for RemoveRedundancies {
    fn name(&self) -> &'static str {
        "RemoveRedundancies"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        *dag = SWEEP.apply(dag)?;
        if let Some(stripped) = strip_before_measure(dag)? {
            *dag = stripped;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Repeat;
    use iqmtk_ir::{Circuit, ClbitId, QubitId};
    use std::f64::consts::PI;

    #[test]
    fn test_diagonal_before_measure_removed() {
        let mut c = Circuit::with_size("r", 2, 2);
        c.prx(PI / 2.0, 0.0, QubitId(0))
            .unwrap()
            .cz(QubitId(0), QubitId(1))
            .unwrap()
            .rz(0.3, QubitId(0))
            .unwrap()
            .measure_all()
            .unwrap();

        // One round only sees the rotation next to the measurement.
        let mut once = c.clone();
        RemoveRedundancies
            .run(once.dag_mut(), &mut PropertySet::new())
            .unwrap();
        assert_eq!(once.dag().num_ops(), 4);

        Repeat::new(RemoveRedundancies)
            .run(c.dag_mut(), &mut PropertySet::new())
            .unwrap();
        let names: Vec<_> = c.ops().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, ["prx", "measure", "measure"]);
    }

    #[test]
    fn test_cz_kept_when_one_side_continues() {
        let mut c = Circuit::with_size("r", 2, 1);
        c.cz(QubitId(0), QubitId(1))
            .unwrap()
            .prx(PI / 2.0, 0.0, QubitId(1))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap();
        RemoveRedundancies
            .run(c.dag_mut(), &mut PropertySet::new())
            .unwrap();
        assert_eq!(c.dag().num_ops(), 3);
    }

    #[test]
    fn test_inverse_prx_pair_removed() {
        let mut c = Circuit::with_size("r", 1, 0);
        c.prx(0.4, 1.0, QubitId(0))
            .unwrap()
            .prx(-0.4, 1.0, QubitId(0))
            .unwrap();
        RemoveRedundancies
            .run(c.dag_mut(), &mut PropertySet::new())
            .unwrap();
        assert_eq!(c.dag().num_ops(), 0);
    }
}
