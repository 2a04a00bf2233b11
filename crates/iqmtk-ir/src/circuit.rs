//! High-level circuit builder API.

use std::collections::{BTreeMap, BTreeSet};

use crate::dag::CircuitDag;
use crate::error::IrResult;
use crate::gate::{CircuitBox, ClassicalCondition, Gate, GateKind, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// A named quantum circuit.
///
/// Gate methods validate their operands and return `&mut Self` so calls can
/// be chained with `?`.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    dag: CircuitDag,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dag: CircuitDag::new(),
        }
    }

    /// Create a circuit with `num_qubits` qubits in register `q` and
    /// `num_clbits` bits in register `c`.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let dag = CircuitDag::with_bits(
            (0..num_qubits).map(|i| Qubit::default_register(QubitId(i))),
            (0..num_clbits).map(|i| Clbit::default_register(ClbitId(i))),
        );
        Self {
            name: name.into(),
            dag,
        }
    }

    /// Wrap an existing DAG.
    pub fn from_dag(name: impl Into<String>, dag: CircuitDag) -> Self {
        Self {
            name: name.into(),
            dag,
        }
    }

    fn next_qubit_id(&self) -> QubitId {
        QubitId(self.dag.qubits().iter().map(|q| q.id.0 + 1).max().unwrap_or(0))
    }

    fn next_clbit_id(&self) -> ClbitId {
        ClbitId(self.dag.clbits().iter().map(|c| c.id.0 + 1).max().unwrap_or(0))
    }

    /// Add a qubit to the default `q` register.
    pub fn add_qubit(&mut self) -> QubitId {
        let id = self.next_qubit_id();
        self.dag.add_qubit(Qubit::default_register(id));
        id
    }

    /// Add a quantum register.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> Vec<QubitId> {
        let name = name.into();
        (0..size)
            .map(|i| {
                let id = self.next_qubit_id();
                self.dag.add_qubit(Qubit::new(id, name.clone(), i));
                id
            })
            .collect()
    }

    /// Add a classical bit to the default `c` register.
    pub fn add_clbit(&mut self) -> ClbitId {
        let id = self.next_clbit_id();
        self.dag.add_clbit(Clbit::default_register(id));
        id
    }

    /// Add a classical register.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> Vec<ClbitId> {
        let name = name.into();
        (0..size)
            .map(|i| {
                let id = self.next_clbit_id();
                self.dag.add_clbit(Clbit::new(id, name.clone(), i));
                id
            })
            .collect()
    }

    fn apply_gate(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::gate(gate, qubits))?;
        Ok(self)
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::H, [qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::X, [qubit])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Y, [qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Z, [qubit])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::S, [qubit])
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Sdg, [qubit])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::T, [qubit])
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Tdg, [qubit])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::SX, [qubit])
    }

    /// Apply sqrt(X)-dagger gate.
    pub fn sxdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::SXdg, [qubit])
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: impl Into<ParameterExpression>, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rx(theta.into()), [qubit])
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: impl Into<ParameterExpression>, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Ry(theta.into()), [qubit])
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: impl Into<ParameterExpression>, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rz(theta.into()), [qubit])
    }

    /// Apply phase gate.
    pub fn p(&mut self, lambda: impl Into<ParameterExpression>, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::P(lambda.into()), [qubit])
    }

    /// Apply universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            [qubit],
        )
    }

    /// Apply phased RX gate (IQM native).
    pub fn prx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::PRX(theta.into(), phi.into()), [qubit])
    }

    // =========================================================================
    // Multi-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CX, [control, target])
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CY, [control, target])
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CZ, [control, target])
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CH, [control, target])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Swap, [q1, q2])
    }

    /// Apply iSWAP gate.
    pub fn iswap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::ISwap, [q1, q2])
    }

    /// Apply controlled-Rx gate.
    pub fn crx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CRx(theta.into()), [control, target])
    }

    /// Apply controlled-Ry gate.
    pub fn cry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CRy(theta.into()), [control, target])
    }

    /// Apply controlled-Rz gate.
    pub fn crz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CRz(theta.into()), [control, target])
    }

    /// Apply controlled-phase gate.
    pub fn cp(
        &mut self,
        lambda: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CP(lambda.into()), [control, target])
    }

    /// Apply XX rotation gate.
    pub fn rxx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::RXX(theta.into()), [q1, q2])
    }

    /// Apply YY rotation gate.
    pub fn ryy(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::RYY(theta.into()), [q1, q2])
    }

    /// Apply ZZ rotation gate.
    pub fn rzz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::RZZ(theta.into()), [q1, q2])
    }

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CCX, [c1, c2, target])
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CSwap, [control, t1, t2])
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Apply an arbitrary gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::gate(gate, qubits))?;
        Ok(self)
    }

    /// Apply a gate that only fires when `condition` holds.
    pub fn conditional(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
        condition: ClassicalCondition,
    ) -> IrResult<&mut Self> {
        self.gate(Gate::standard(gate).with_condition(condition), qubits)
    }

    /// Apply a circuit box.
    pub fn add_box(
        &mut self,
        circuit_box: CircuitBox,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.gate(Gate::boxed(circuit_box), qubits)
    }

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::measure(qubit, clbit))?;
        Ok(self)
    }

    /// Measure the `i`-th qubit into the `i`-th classical bit, adding bits
    /// to register `c` as needed.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        while self.dag.num_clbits() < self.dag.num_qubits() {
            self.add_clbit();
        }
        let pairs: Vec<_> = self
            .dag
            .qubits()
            .iter()
            .zip(self.dag.clbits())
            .map(|(q, c)| (q.id, c.id))
            .collect();
        for (q, c) in pairs {
            self.dag.apply(Instruction::measure(q, c))?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::reset(qubit))?;
        Ok(self)
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::barrier(qubits))?;
        Ok(self)
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits: Vec<_> = self.dag.qubits().iter().map(|q| q.id).collect();
        self.barrier(qubits)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Check if any gate, boxed or not, has a symbolic parameter.
    pub fn is_symbolic(&self) -> bool {
        !self.free_symbols().is_empty()
    }

    /// Names of all unbound symbols.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        for inst in self.dag.instructions() {
            collect_symbols(inst, &mut symbols);
        }
        symbols
    }

    /// Return a copy with the given symbols replaced by values.
    pub fn bind_parameters(&self, values: &BTreeMap<String, f64>) -> IrResult<Self> {
        let lookup = |name: &str| values.get(name).copied();
        let mut dag = self.dag.empty_like();
        for inst in self.dag.instructions() {
            let mut inst = inst.clone();
            bind_instruction(&mut inst, &lookup);
            dag.apply(inst)?;
        }
        Ok(Self::from_dag(self.name.clone(), dag))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the circuit.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.dag.num_qubits()
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.dag.num_clbits()
    }

    /// Get the circuit depth.
    pub fn depth(&self) -> usize {
        self.dag.depth()
    }

    /// Instructions in topological order.
    pub fn ops(&self) -> Vec<&Instruction> {
        self.dag.instructions().collect()
    }

    /// Qubits in insertion order.
    pub fn qubits(&self) -> &[Qubit] {
        self.dag.qubits()
    }

    /// Classical bits in insertion order.
    pub fn clbits(&self) -> &[Clbit] {
        self.dag.clbits()
    }

    /// Get a reference to the underlying DAG.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Get a mutable reference to the underlying DAG.
    pub fn dag_mut(&mut self) -> &mut CircuitDag {
        &mut self.dag
    }

    /// Consume the circuit and return the DAG.
    pub fn into_dag(self) -> CircuitDag {
        self.dag
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?.measure_all()?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit on `n` qubits.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size("ghz", n, n);
        if n == 0 {
            return Ok(circuit);
        }
        circuit.h(QubitId(0))?;
        for i in 1..n {
            circuit.cx(QubitId(i - 1), QubitId(i))?;
        }
        circuit.measure_all()?;
        Ok(circuit)
    }
}

fn collect_symbols(inst: &Instruction, symbols: &mut BTreeSet<String>) {
    let Some(gate) = inst.as_gate() else {
        return;
    };
    match &gate.kind {
        GateKind::Standard(g) => {
            for p in g.parameters() {
                symbols.extend(p.symbols());
            }
        }
        GateKind::Boxed(b) => {
            for inner in &b.ops {
                collect_symbols(inner, symbols);
            }
        }
    }
}

fn bind_instruction(inst: &mut Instruction, lookup: &dyn Fn(&str) -> Option<f64>) {
    let InstructionKind::Gate(gate) = &mut inst.kind else {
        return;
    };
    match &mut gate.kind {
        GateKind::Standard(g) => g.map_parameters(&mut |p| p.substitute(lookup).simplify()),
        GateKind::Boxed(b) => {
            for inner in &mut b.ops {
                bind_instruction(inner, lookup);
            }
        }
    }
}
