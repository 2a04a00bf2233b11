//! Simplification of the start of a circuit using known input states.

use std::f64::consts::PI;

use iqmtk_ir::{CircuitDag, Instruction, QubitId, StandardGate};
use rustc_hash::FxHashMap;

use crate::decompose::prx;
use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;
use crate::unitary::{EPSILON, Unitary2x2};

/// Drop or fold gates that act on qubits in a known basis state.
///
/// Every qubit starts in |0⟩. While a qubit stays in a computational basis
/// state its gates are tracked instead of emitted: diagonal gates vanish,
/// bit flips toggle the tracked value and CX with a known control either
/// vanishes or flips its target. The first operation that would leave the
/// basis emits the pending flip as PRX(π, 0). Measurements are always
/// kept, so no classical operations are introduced.
#[derive(Debug, Clone, Copy)]
pub struct SimplifyInitial {
    create_all_qubits: bool,
}

impl SimplifyInitial {
    /// Treat every qubit as starting in |0⟩.
    pub fn new() -> Self {
        Self {
            create_all_qubits: true,
        }
    }

    /// Choose whether qubits count as initialised. When not, the pass only
    /// learns basis states from resets.
    pub fn with_create_all_qubits(create_all_qubits: bool) -> Self {
        Self { create_all_qubits }
    }
}

impl Default for SimplifyInitial {
    fn default() -> Self {
        Self::new()
    }
}

/// Computational basis value of each tracked qubit.
struct Known {
    values: FxHashMap<QubitId, bool>,
    out: CircuitDag,
}

impl Known {
    fn get(&self, q: QubitId) -> Option<bool> {
        self.values.get(&q).copied()
    }

    fn toggle(&mut self, q: QubitId) {
        if let Some(v) = self.values.get_mut(&q) {
            *v = !*v;
        }
    }

    /// Stop tracking `q`, emitting its pending flip.
    fn release(&mut self, q: QubitId) -> CompileResult<()> {
        if self.values.remove(&q) == Some(true) {
            self.out.apply(Instruction::gate(prx(PI, 0.0), [q]))?;
        }
        Ok(())
    }

    fn emit(&mut self, inst: &Instruction) -> CompileResult<()> {
        for &q in &inst.qubits {
            self.release(q)?;
        }
        self.out.apply(inst.clone())?;
        Ok(())
    }
}

fn is_bit_flip(gate: &StandardGate) -> bool {
    matches!(gate, StandardGate::X | StandardGate::Y)
        || Unitary2x2::from_gate(gate)
            .is_some_and(|u| u.data[0].norm() < EPSILON && u.data[3].norm() < EPSILON)
}

impl Pass for SimplifyInitial {
    fn name(&self) -> &'static str {
        "SimplifyInitial"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let values = if self.create_all_qubits {
            dag.qubits().iter().map(|q| (q.id, false)).collect()
        } else {
            FxHashMap::default()
        };
        let mut known = Known {
            values,
            out: dag.empty_like(),
        };

        for inst in dag.instructions() {
            if inst.is_reset() {
                let Some(&q) = inst.qubits.first() else {
                    continue;
                };
                if known.get(q).is_none() {
                    known.out.apply(inst.clone())?;
                }
                known.values.insert(q, false);
                continue;
            }

            let plain = inst
                .as_gate()
                .filter(|g| g.condition.is_none())
                .and_then(|g| g.as_standard());
            let Some(gate) = plain else {
                known.emit(inst)?;
                continue;
            };

            let all_known = inst.qubits.iter().all(|&q| known.get(q).is_some());
            match (gate, inst.qubits.as_slice()) {
                (g, _) if all_known && g.is_diagonal() => {}
                (g, &[q]) if all_known && is_bit_flip(g) => known.toggle(q),
                (StandardGate::CX, &[c, _]) if known.get(c) == Some(false) => {}
                (StandardGate::CX, &[c, t]) if known.get(c) == Some(true) => {
                    if known.get(t).is_some() {
                        known.toggle(t);
                    } else {
                        known.out.apply(Instruction::gate(prx(PI, 0.0), [t]))?;
                    }
                }
                (StandardGate::CZ, &[a, b])
                    if known.get(a) == Some(false) || known.get(b) == Some(false) => {}
                _ => known.emit(inst)?,
            }
        }

        let pending: Vec<_> = dag
            .qubits()
            .iter()
            .map(|q| q.id)
            .filter(|&q| known.get(q) == Some(true))
            .collect();
        for q in pending {
            known.release(q)?;
        }
        *dag = known.out;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_ir::Circuit;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    fn simplify(c: &mut Circuit) {
        SimplifyInitial::new()
            .run(c.dag_mut(), &mut PropertySet::new())
            .unwrap();
    }

    #[test]
    fn test_leading_diagonals_and_cx_vanish() {
        let mut c = Circuit::with_size("i", 2, 2);
        c.rz(0.4, q(0))
            .unwrap()
            .cz(q(0), q(1))
            .unwrap()
            .cx(q(0), q(1))
            .unwrap()
            .measure_all()
            .unwrap();
        simplify(&mut c);
        let names: Vec<_> = c.ops().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, ["measure", "measure"]);
    }

    #[test]
    fn test_flip_propagates_through_cx() {
        let mut c = Circuit::with_size("i", 2, 2);
        c.x(q(0))
            .unwrap()
            .cx(q(0), q(1))
            .unwrap()
            .measure_all()
            .unwrap();
        simplify(&mut c);
        let ops = c.ops();
        let flips: Vec<_> = ops.iter().filter(|i| i.name() == "prx").collect();
        assert_eq!(flips.len(), 2);
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn test_double_flip_cancels() {
        let mut c = Circuit::with_size("i", 1, 1);
        c.prx(PI, 0.3, q(0))
            .unwrap()
            .y(q(0))
            .unwrap()
            .measure(q(0), iqmtk_ir::ClbitId(0))
            .unwrap();
        simplify(&mut c);
        assert_eq!(c.dag().num_ops(), 1);
    }

    #[test]
    fn test_superposition_releases_qubit() {
        let mut c = Circuit::with_size("i", 1, 0);
        c.x(q(0)).unwrap().h(q(0)).unwrap().z(q(0)).unwrap();
        simplify(&mut c);
        let names: Vec<_> = c.ops().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, ["prx", "h", "z"]);
    }

    #[test]
    fn test_reset_dropped_only_on_known_qubit() {
        let mut c = Circuit::with_size("i", 1, 1);
        c.reset(q(0))
            .unwrap()
            .h(q(0))
            .unwrap()
            .reset(q(0))
            .unwrap()
            .measure(q(0), iqmtk_ir::ClbitId(0))
            .unwrap();
        simplify(&mut c);
        let names: Vec<_> = c.ops().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, ["h", "reset", "measure"]);
    }

    #[test]
    fn test_uncreated_qubits_are_untouched() {
        let mut c = Circuit::with_size("i", 1, 0);
        c.x(q(0)).unwrap();
        SimplifyInitial::with_create_all_qubits(false)
            .run(c.dag_mut(), &mut PropertySet::new())
            .unwrap();
        assert_eq!(c.ops()[0].name(), "x");
    }
}
