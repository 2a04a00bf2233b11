//! Predicates a circuit must satisfy before it can run on a device.
//!
//! Unlike passes, predicates never modify the circuit. A backend publishes
//! the predicates it requires and rejects circuits that fail any of them.

use rustc_hash::FxHashSet;

use iqmtk_ir::{Circuit, ClbitId, NODE_REGISTER, QubitId};

use crate::property::{Architecture, BasisGates};

/// A property of a circuit that can be checked without changing it.
pub trait Predicate: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Check whether `circuit` satisfies the predicate.
    fn verify(&self, circuit: &Circuit) -> bool;
}

/// No gate carries a classical condition.
pub struct NoClassicalControl;

impl Predicate for NoClassicalControl {
    fn name(&self) -> &'static str {
        "NoClassicalControlPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        circuit.dag().instructions().all(|i| i.condition().is_none())
    }
}

/// No gate is conditioned on a bit measured earlier in the circuit.
///
/// Conditions on bits that no measurement writes are allowed.
pub struct NoFastFeedforward;

impl Predicate for NoFastFeedforward {
    fn name(&self) -> &'static str {
        "NoFastFeedforwardPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        let mut measured: FxHashSet<ClbitId> = FxHashSet::default();
        for (_, inst) in circuit.dag().topological_ops() {
            if let Some(cond) = inst.condition() {
                if cond.bits.iter().any(|b| measured.contains(b)) {
                    return false;
                }
            }
            if inst.is_measure() {
                measured.extend(inst.clbits.iter().copied());
            }
        }
        true
    }
}

/// The circuit contains no barriers.
pub struct NoBarriers;

impl Predicate for NoBarriers {
    fn name(&self) -> &'static str {
        "NoBarriersPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        !circuit.dag().instructions().any(|i| i.is_barrier())
    }
}

/// Every measurement is the last operation on its qubit and bit.
pub struct NoMidMeasure;

impl Predicate for NoMidMeasure {
    fn name(&self) -> &'static str {
        "NoMidMeasurePredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        let dag = circuit.dag();
        dag.topological_ops()
            .filter(|(_, inst)| inst.is_measure())
            .all(|(node, _)| dag.is_last_on_wires(node))
    }
}

/// All parameters are numeric.
pub struct NoSymbols;

impl Predicate for NoSymbols {
    fn name(&self) -> &'static str {
        "NoSymbolsPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        !circuit.is_symbolic()
    }
}

/// Every operation is in the allowed set.
pub struct GateSet(pub BasisGates);

impl Predicate for GateSet {
    fn name(&self) -> &'static str {
        "GateSetPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        circuit
            .dag()
            .instructions()
            .all(|i| self.0.contains(i.name()))
    }
}

/// The circuit lives on device nodes and every two-qubit gate acts on a
/// coupled pair. Gates on more qubits are rejected; barriers may span any
/// nodes.
pub struct Connectivity(pub Architecture);

impl Predicate for Connectivity {
    fn name(&self) -> &'static str {
        "ConnectivityPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        let on_device = circuit.qubits().iter().all(|q| {
            q.register == NODE_REGISTER && q.node_index().is_some_and(|n| self.0.contains(n))
        });
        if !on_device {
            return false;
        }
        let dag = circuit.dag();
        let node = |id: QubitId| dag.qubit(id).and_then(|q| q.node_index());
        dag.instructions()
            .filter(|i| i.is_gate())
            .all(|i| match i.qubits.as_slice() {
                [_] => true,
                [a, b] => match (node(*a), node(*b)) {
                    (Some(na), Some(nb)) => self.0.is_connected(na, nb),
                    _ => false,
                },
                _ => false,
            })
    }
}

/// The circuit uses at most this many qubits.
pub struct MaxQubits(pub usize);

impl Predicate for MaxQubits {
    fn name(&self) -> &'static str {
        "MaxNQubitsPredicate"
    }

    fn verify(&self, circuit: &Circuit) -> bool {
        circuit.num_qubits() <= self.0
    }
}

/// Gate names IQM devices execute.
pub fn iqm_gate_set() -> BasisGates {
    BasisGates::new(["prx", "cz", "measure"])
}

/// Everything an IQM device requires of a circuit on `arch`.
pub fn iqm_required_predicates(arch: &Architecture) -> Vec<Box<dyn Predicate>> {
    vec![
        Box::new(NoClassicalControl),
        Box::new(NoFastFeedforward),
        Box::new(NoBarriers),
        Box::new(NoMidMeasure),
        Box::new(NoSymbols),
        Box::new(GateSet(iqm_gate_set())),
        Box::new(Connectivity(arch.clone())),
    ]
}

/// Name of the first predicate `circuit` fails.
pub fn first_failure<'a>(
    predicates: &'a [Box<dyn Predicate>],
    circuit: &Circuit,
) -> Option<&'a str> {
    predicates
        .iter()
        .find(|p| !p.verify(circuit))
        .map(|p| p.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_ir::{ClassicalCondition, CircuitDag, ParameterExpression, Qubit, StandardGate};

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    fn on_nodes(nodes: &[u32]) -> Circuit {
        let dag = CircuitDag::with_bits(
            nodes.iter().map(|&n| Qubit::node(QubitId(n), n)),
            [],
        );
        Circuit::from_dag("placed", dag)
    }

    #[test]
    fn test_classical_control() {
        let mut c = Circuit::with_size("p", 1, 1);
        assert!(NoClassicalControl.verify(&c));
        c.conditional(StandardGate::X, [q(0)], ClassicalCondition::new([ClbitId(0)], 1))
            .unwrap();
        assert!(!NoClassicalControl.verify(&c));
        // Nothing measured bit 0, so this is not feed-forward.
        assert!(NoFastFeedforward.verify(&c));
    }

    #[test]
    fn test_fast_feedforward() {
        let mut c = Circuit::with_size("p", 2, 1);
        c.measure(q(0), ClbitId(0))
            .unwrap()
            .conditional(StandardGate::X, [q(1)], ClassicalCondition::new([ClbitId(0)], 1))
            .unwrap();
        assert!(!NoFastFeedforward.verify(&c));
    }

    #[test]
    fn test_mid_measure() {
        let mut c = Circuit::with_size("p", 1, 1);
        c.measure(q(0), ClbitId(0)).unwrap();
        assert!(NoMidMeasure.verify(&c));
        c.x(q(0)).unwrap();
        assert!(!NoMidMeasure.verify(&c));
    }

    #[test]
    fn test_barriers_and_symbols() {
        let mut c = Circuit::with_size("p", 2, 0);
        c.rz(ParameterExpression::symbol("a"), q(0)).unwrap();
        assert!(NoBarriers.verify(&c));
        assert!(!NoSymbols.verify(&c));
        c.barrier_all().unwrap();
        assert!(!NoBarriers.verify(&c));
    }

    #[test]
    fn test_gate_set() {
        let mut c = Circuit::with_size("p", 2, 2);
        c.prx(0.5, 0.0, q(0)).unwrap().cz(q(0), q(1)).unwrap().measure_all().unwrap();
        assert!(GateSet(iqm_gate_set()).verify(&c));
        c.h(q(1)).unwrap();
        assert!(!GateSet(iqm_gate_set()).verify(&c));
    }

    #[test]
    fn test_connectivity() {
        let arch = Architecture::linear(3);
        let mut c = on_nodes(&[0, 1, 2]);
        c.cz(q(0), q(1)).unwrap();
        assert!(Connectivity(arch.clone()).verify(&c));
        c.cz(q(0), q(2)).unwrap();
        assert!(!Connectivity(arch.clone()).verify(&c));

        // Unplaced circuits fail even without two-qubit gates.
        assert!(!Connectivity(arch).verify(&Circuit::with_size("p", 1, 0)));
    }

    #[test]
    fn test_connectivity_uses_node_indices() {
        // Star around node 2; the circuit only touches nodes 0 and 2.
        let arch = Architecture::from_edges([(0, 2), (1, 2), (3, 2), (4, 2)]);
        let dag = CircuitDag::with_bits(
            [Qubit::node(q(0), 0), Qubit::node(q(1), 2)],
            [],
        );
        let mut c = Circuit::from_dag("placed", dag);
        c.cz(q(0), q(1)).unwrap();
        assert!(Connectivity(arch.clone()).verify(&c));

        // Same ids on nodes 0 and 1, which are not coupled.
        let dag = CircuitDag::with_bits(
            [Qubit::node(q(0), 0), Qubit::node(q(1), 1)],
            [],
        );
        let mut c = Circuit::from_dag("placed", dag);
        c.cz(q(0), q(1)).unwrap();
        assert!(!Connectivity(arch).verify(&c));
    }

    #[test]
    fn test_required_predicates_report_first_failure() {
        let arch = Architecture::linear(2);
        let preds = iqm_required_predicates(&arch);
        assert_eq!(preds.len(), 7);

        let mut c = on_nodes(&[0, 1]);
        c.cz(q(0), q(1)).unwrap();
        assert_eq!(first_failure(&preds, &c), None);
        c.barrier_all().unwrap();
        assert_eq!(first_failure(&preds, &c), Some("NoBarriersPredicate"));
        assert!(MaxQubits(2).verify(&c));
        assert!(!MaxQubits(1).verify(&c));
    }
}
