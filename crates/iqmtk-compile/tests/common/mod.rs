//! Shared helpers: a small statevector simulator that turns a circuit with
//! final measurements into its outcome distribution.

#![allow(dead_code)]

use std::collections::BTreeMap;

use num_complex::Complex64;

use iqmtk_compile::decompose::expand_to_cx;
use iqmtk_compile::passes::{DecomposeBoxes, RemoveBarriers};
use iqmtk_compile::unitary::Unitary2x2;
use iqmtk_compile::{Pass, PostProcessing, PropertySet};
use iqmtk_ir::{Circuit, ClbitId, QubitId, StandardGate};

/// Probability of each outcome, keyed by the bits in clbit order.
pub type Distribution = BTreeMap<Vec<u8>, f64>;

struct State {
    amps: Vec<Complex64>,
    wires: Vec<QubitId>,
}

impl State {
    fn new(wires: Vec<QubitId>) -> Self {
        let mut amps = vec![Complex64::new(0.0, 0.0); 1 << wires.len()];
        amps[0] = Complex64::new(1.0, 0.0);
        Self { amps, wires }
    }

    fn bit(&self, q: QubitId) -> usize {
        let pos = self.wires.iter().position(|&w| w == q).unwrap();
        1 << pos
    }

    fn apply_1q(&mut self, u: &Unitary2x2, q: QubitId) {
        let m = self.bit(q);
        for i in 0..self.amps.len() {
            if i & m == 0 {
                let (a, b) = (self.amps[i], self.amps[i | m]);
                self.amps[i] = u.data[0] * a + u.data[1] * b;
                self.amps[i | m] = u.data[2] * a + u.data[3] * b;
            }
        }
    }

    fn apply_cx(&mut self, c: QubitId, t: QubitId) {
        let (mc, mt) = (self.bit(c), self.bit(t));
        for i in 0..self.amps.len() {
            if i & mc != 0 && i & mt == 0 {
                self.amps.swap(i, i | mt);
            }
        }
    }

    fn apply_cz(&mut self, a: QubitId, b: QubitId) {
        let (ma, mb) = (self.bit(a), self.bit(b));
        for (i, amp) in self.amps.iter_mut().enumerate() {
            if i & ma != 0 && i & mb != 0 {
                *amp = -*amp;
            }
        }
    }
}

/// Outcome distribution of `circuit`, with `pp` applied to every outcome.
///
/// Measurements must be final. Boxes and barriers are allowed.
pub fn distribution(circuit: &Circuit, pp: &PostProcessing) -> Distribution {
    let mut dag = circuit.dag().clone();
    let mut props = PropertySet::new();
    DecomposeBoxes.run(&mut dag, &mut props).unwrap();
    RemoveBarriers.run(&mut dag, &mut props).unwrap();

    let mut state = State::new(dag.qubits().iter().map(|q| q.id).collect());
    let mut readout: Vec<(QubitId, ClbitId)> = Vec::new();

    for (_, inst) in dag.topological_ops() {
        if inst.is_measure() {
            readout.push((inst.qubits[0], inst.clbits[0]));
            continue;
        }
        assert!(inst.is_gate(), "unexpected {}", inst.name());
        assert!(
            readout.iter().all(|(q, _)| !inst.qubits.contains(q)),
            "gate after measurement"
        );
        for part in expand_to_cx(inst) {
            let gate = part.as_gate().unwrap().as_standard().unwrap();
            match (gate, part.qubits.as_slice()) {
                (StandardGate::CX, &[c, t]) => state.apply_cx(c, t),
                (StandardGate::CZ, &[a, b]) => state.apply_cz(a, b),
                (g, &[q]) => state.apply_1q(&Unitary2x2::from_gate(g).unwrap(), q),
                (g, _) => panic!("cannot simulate {}", g.name()),
            }
        }
    }

    let columns: Vec<ClbitId> = dag.clbits().iter().map(|c| c.id).collect();
    let mut dist = Distribution::new();
    for (i, amp) in state.amps.iter().enumerate() {
        let p = amp.norm_sqr();
        if p < 1e-12 {
            continue;
        }
        let mut shot = vec![0u8; columns.len()];
        for &(q, c) in &readout {
            let col = columns.iter().position(|&x| x == c).unwrap();
            shot[col] = u8::from(i & state.bit(q) != 0);
        }
        pp.apply(&mut shot, &columns);
        *dist.entry(shot).or_insert(0.0) += p;
    }
    dist
}

/// Assert two distributions agree to within `1e-6` on every outcome.
pub fn assert_same_distribution(a: &Distribution, b: &Distribution) {
    let keys: std::collections::BTreeSet<_> = a.keys().chain(b.keys()).collect();
    for k in keys {
        let (pa, pb) = (
            a.get(k).copied().unwrap_or(0.0),
            b.get(k).copied().unwrap_or(0.0),
        );
        assert!(
            (pa - pb).abs() < 1e-6,
            "outcome {k:?}: {pa} vs {pb}\nleft: {a:?}\nright: {b:?}"
        );
    }
}

/// A four-qubit circuit touching every standard gate family.
pub fn kitchen_sink() -> Circuit {
    let q = QubitId;
    let mut c = Circuit::with_size("kitchen_sink", 4, 4);
    c.h(q(0))
        .unwrap()
        .t(q(1))
        .unwrap()
        .sx(q(2))
        .unwrap()
        .u(0.3, 1.1, -0.4, q(3))
        .unwrap()
        .cx(q(0), q(2))
        .unwrap()
        .ry(0.7, q(1))
        .unwrap()
        .cy(q(1), q(3))
        .unwrap()
        .ch(q(3), q(0))
        .unwrap()
        .crz(0.9, q(2), q(1))
        .unwrap()
        .rzz(0.5, q(0), q(3))
        .unwrap()
        .iswap(q(1), q(2))
        .unwrap()
        .swap(q(0), q(1))
        .unwrap()
        .ccx(q(0), q(1), q(3))
        .unwrap()
        .cswap(q(2), q(0), q(3))
        .unwrap()
        .rxx(0.2, q(1), q(2))
        .unwrap()
        .sdg(q(3))
        .unwrap()
        .measure_all()
        .unwrap();
    c
}
