//! Quantum gate types.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;
use crate::qubit::ClbitId;

/// Standard gates with known semantics.
///
/// Rotation angles are radians. `PRX(θ, φ) = Rz(φ)·Rx(θ)·Rz(−φ)` is the
/// native one-qubit gate of IQM devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),
    /// Phased RX gate PRX(θ, φ).
    PRX(ParameterExpression, ParameterExpression),
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// YY rotation gate.
    RYY(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),
    /// Toffoli gate.
    CCX,
    /// Fredkin gate.
    CSwap,
}

impl StandardGate {
    /// Lower-case gate name, as used in gate sets and circuit JSON.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(..) => "u",
            StandardGate::PRX(..) => "prx",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Build a gate from its name and parameters.
    pub fn from_name(name: &str, params: Vec<ParameterExpression>) -> IrResult<Self> {
        let expected = match name {
            "rx" | "ry" | "rz" | "p" | "crx" | "cry" | "crz" | "cp" | "rxx" | "ryy" | "rzz" => 1,
            "prx" => 2,
            "u" => 3,
            _ => 0,
        };
        if params.len() != expected {
            return Err(IrError::ParameterCountMismatch {
                gate_name: name.to_string(),
                expected,
                got: params.len(),
            });
        }
        let mut params = params.into_iter();
        let mut next = || params.next().unwrap_or(ParameterExpression::Constant(0.0));

        let gate = match name {
            "id" => StandardGate::I,
            "x" => StandardGate::X,
            "y" => StandardGate::Y,
            "z" => StandardGate::Z,
            "h" => StandardGate::H,
            "s" => StandardGate::S,
            "sdg" => StandardGate::Sdg,
            "t" => StandardGate::T,
            "tdg" => StandardGate::Tdg,
            "sx" => StandardGate::SX,
            "sxdg" => StandardGate::SXdg,
            "rx" => StandardGate::Rx(next()),
            "ry" => StandardGate::Ry(next()),
            "rz" => StandardGate::Rz(next()),
            "p" => StandardGate::P(next()),
            "u" => StandardGate::U(next(), next(), next()),
            "prx" => StandardGate::PRX(next(), next()),
            "cx" => StandardGate::CX,
            "cy" => StandardGate::CY,
            "cz" => StandardGate::CZ,
            "ch" => StandardGate::CH,
            "swap" => StandardGate::Swap,
            "iswap" => StandardGate::ISwap,
            "crx" => StandardGate::CRx(next()),
            "cry" => StandardGate::CRy(next()),
            "crz" => StandardGate::CRz(next()),
            "cp" => StandardGate::CP(next()),
            "rxx" => StandardGate::RXX(next()),
            "ryy" => StandardGate::RYY(next()),
            "rzz" => StandardGate::RZZ(next()),
            "ccx" => StandardGate::CCX,
            "cswap" => StandardGate::CSwap,
            other => return Err(IrError::UnknownGate(other.to_string())),
        };
        Ok(gate)
    }

    /// Number of qubits this gate acts on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CCX | StandardGate::CSwap => 3,
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_) => 2,
            _ => 1,
        }
    }

    /// Parameters of this gate, in declaration order.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],
            StandardGate::U(a, b, c) => vec![a, b, c],
            StandardGate::PRX(theta, phi) => vec![theta, phi],
            _ => vec![],
        }
    }

    /// Apply `f` to every parameter in place.
    pub fn map_parameters(&mut self, f: &mut dyn FnMut(&ParameterExpression) -> ParameterExpression) {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => *p = f(p),
            StandardGate::U(a, b, c) => {
                *a = f(a);
                *b = f(b);
                *c = f(c);
            }
            StandardGate::PRX(theta, phi) => {
                *theta = f(theta);
                *phi = f(phi);
            }
            _ => {}
        }
    }

    /// Check if any parameter is still symbolic.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Check if the gate is diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::Z
                | StandardGate::S
                | StandardGate::Sdg
                | StandardGate::T
                | StandardGate::Tdg
                | StandardGate::Rz(_)
                | StandardGate::P(_)
                | StandardGate::CZ
                | StandardGate::CRz(_)
                | StandardGate::CP(_)
                | StandardGate::RZZ(_)
        )
    }
}

/// A named sub-circuit usable as a gate.
///
/// The body acts on local qubits `0..num_qubits`; applying the box maps
/// local qubit `i` onto the `i`-th operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBox {
    /// Name of the box.
    pub name: String,
    /// Number of qubits the box acts on.
    pub num_qubits: u32,
    /// Body instructions on local qubits.
    pub ops: Vec<Instruction>,
}

impl CircuitBox {
    /// Create a box, checking that the body only uses local qubits and
    /// contains neither measurements nor classical control.
    pub fn new(name: impl Into<String>, num_qubits: u32, ops: Vec<Instruction>) -> IrResult<Self> {
        let name = name.into();
        for inst in &ops {
            if !inst.clbits.is_empty() || inst.as_gate().is_some_and(|g| g.condition.is_some()) {
                return Err(IrError::InvalidBox {
                    name,
                    reason: format!("'{}' uses classical bits", inst.name()),
                });
            }
            if let Some(q) = inst.qubits.iter().find(|q| q.0 >= num_qubits) {
                return Err(IrError::InvalidBox {
                    name,
                    reason: format!("qubit {q} outside 0..{num_qubits}"),
                });
            }
        }
        Ok(Self {
            name,
            num_qubits,
            ops,
        })
    }
}

/// The operation a [`Gate`] performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A boxed sub-circuit.
    Boxed(CircuitBox),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Boxed(b) => &b.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Boxed(b) => b.num_qubits,
        }
    }
}

/// Classical control: the gate fires only when the listed bits, read as a
/// little-endian integer, equal `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// Bits the condition reads.
    pub bits: Vec<ClbitId>,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(bits: impl IntoIterator<Item = ClbitId>, value: u64) -> Self {
        Self {
            bits: bits.into_iter().collect(),
            value,
        }
    }
}

/// A gate with optional classical control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            condition: None,
        }
    }

    /// Create a gate applying a circuit box.
    pub fn boxed(circuit_box: CircuitBox) -> Self {
        Self {
            kind: GateKind::Boxed(circuit_box),
            condition: None,
        }
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// The standard gate, if this is not a box.
    pub fn as_standard(&self) -> Option<&StandardGate> {
        match &self.kind {
            GateKind::Standard(g) => Some(g),
            GateKind::Boxed(_) => None,
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CircuitBox> for Gate {
    fn from(circuit_box: CircuitBox) -> Self {
        Gate::boxed(circuit_box)
    }
}
