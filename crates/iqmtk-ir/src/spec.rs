//! JSON form of a circuit.
//!
//! ```json
//! {
//!   "name": "bell",
//!   "num_qubits": 2,
//!   "num_clbits": 2,
//!   "ops": [
//!     {"gate": "h", "qubits": [0]},
//!     {"gate": "rz", "qubits": [1], "params": [0.5]},
//!     {"gate": "cx", "qubits": [0, 1]},
//!     {"gate": "measure", "qubits": [0], "clbits": [0]},
//!     {"gate": "x", "qubits": [1], "condition": {"bits": [0], "value": 1}}
//!   ]
//! }
//! ```
//!
//! Operand indices are positions in the circuit's qubit and bit lists.
//! Parameters are numbers, symbol names (`"pi"` is π) or a structured
//! [`ParameterExpression`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{CircuitBox, ClassicalCondition, Gate, GateKind, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// Serialisable description of a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSpec {
    /// Circuit name.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: u32,
    /// Number of classical bits.
    #[serde(default)]
    pub num_clbits: u32,
    /// Register slots of the qubits; default `q[i]` when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qubits: Vec<BitSpec>,
    /// Register slots of the classical bits; default `c[i]` when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<BitSpec>,
    /// Global phase in radians.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub global_phase: f64,
    /// Operations in order.
    #[serde(default)]
    pub ops: Vec<OpSpec>,
}

/// A register slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitSpec {
    /// Register name.
    pub register: String,
    /// Index within the register.
    pub index: u32,
}

/// One operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpSpec {
    /// Gate name, `measure`, `reset`, `barrier` or `box`.
    pub gate: String,
    /// Qubit operands.
    pub qubits: Vec<u32>,
    /// Classical operands (measurement only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<u32>,
    /// Gate parameters in radians.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
    /// Classical control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,
    /// Body of a `box` operation.
    #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
    pub circuit_box: Option<BoxSpec>,
}

/// Classical control on bit positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Bit positions read by the condition.
    pub bits: Vec<u32>,
    /// Little-endian value the bits must equal.
    pub value: u64,
}

/// A boxed sub-circuit on local qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpec {
    /// Box name.
    pub name: String,
    /// Number of local qubits.
    pub num_qubits: u32,
    /// Body operations.
    pub ops: Vec<OpSpec>,
}

/// A gate parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// A number in radians.
    Number(f64),
    /// A symbol name, or `pi`.
    Name(String),
    /// Any other expression.
    Expression(ParameterExpression),
}

impl From<&ParameterExpression> for ParamSpec {
    fn from(expr: &ParameterExpression) -> Self {
        match expr {
            ParameterExpression::Constant(v) => ParamSpec::Number(*v),
            ParameterExpression::Pi => ParamSpec::Name("pi".into()),
            ParameterExpression::Symbol(s) => ParamSpec::Name(s.clone()),
            other => ParamSpec::Expression(other.clone()),
        }
    }
}

impl From<ParamSpec> for ParameterExpression {
    fn from(spec: ParamSpec) -> Self {
        match spec {
            ParamSpec::Number(v) => ParameterExpression::Constant(v),
            ParamSpec::Name(s) if s == "pi" => ParameterExpression::Pi,
            ParamSpec::Name(s) => ParameterExpression::Symbol(s),
            ParamSpec::Expression(e) => e,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

impl CircuitSpec {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the circuit this spec describes.
    pub fn to_circuit(&self) -> IrResult<Circuit> {
        let qubits: Vec<Qubit> = (0..self.num_qubits)
            .map(|i| match self.qubits.get(i as usize) {
                Some(b) => Qubit::new(QubitId(i), b.register.clone(), b.index),
                None => Qubit::default_register(QubitId(i)),
            })
            .collect();
        let clbits: Vec<Clbit> = (0..self.num_clbits)
            .map(|i| match self.clbits.get(i as usize) {
                Some(b) => Clbit::new(ClbitId(i), b.register.clone(), b.index),
                None => Clbit::default_register(ClbitId(i)),
            })
            .collect();

        let mut dag = CircuitDag::with_bits(qubits, clbits);
        dag.set_global_phase(self.global_phase);
        for op in &self.ops {
            dag.apply(op.to_instruction()?)?;
        }
        Ok(Circuit::from_dag(self.name.clone(), dag))
    }
}

impl OpSpec {
    fn to_instruction(&self) -> IrResult<Instruction> {
        let qubits = self.qubits.iter().map(|&q| QubitId(q)).collect();
        let clbits = self.clbits.iter().map(|&c| ClbitId(c)).collect();
        let kind = match self.gate.as_str() {
            "measure" => InstructionKind::Measure,
            "reset" => InstructionKind::Reset,
            "barrier" => InstructionKind::Barrier,
            "box" => {
                let spec = self
                    .circuit_box
                    .as_ref()
                    .ok_or_else(|| IrError::InvalidBox {
                        name: "box".into(),
                        reason: "missing body".into(),
                    })?;
                InstructionKind::Gate(self.with_condition(Gate::boxed(spec.to_box()?)))
            }
            name => {
                let params = self.params.iter().cloned().map(Into::into).collect();
                let gate = StandardGate::from_name(name, params)?;
                InstructionKind::Gate(self.with_condition(Gate::standard(gate)))
            }
        };
        Ok(Instruction {
            kind,
            qubits,
            clbits,
        })
    }

    fn with_condition(&self, gate: Gate) -> Gate {
        match &self.condition {
            Some(c) => gate.with_condition(ClassicalCondition::new(
                c.bits.iter().map(|&b| ClbitId(b)),
                c.value,
            )),
            None => gate,
        }
    }

    fn from_instruction(
        inst: &Instruction,
        qubit_pos: &dyn Fn(QubitId) -> u32,
        clbit_pos: &dyn Fn(ClbitId) -> u32,
    ) -> Self {
        let mut op = OpSpec {
            gate: inst.name().to_string(),
            qubits: inst.qubits.iter().map(|&q| qubit_pos(q)).collect(),
            clbits: inst.clbits.iter().map(|&c| clbit_pos(c)).collect(),
            params: vec![],
            condition: None,
            circuit_box: None,
        };
        if let InstructionKind::Gate(gate) = &inst.kind {
            match &gate.kind {
                GateKind::Standard(g) => {
                    op.params = g.parameters().into_iter().map(ParamSpec::from).collect();
                }
                GateKind::Boxed(b) => {
                    op.gate = "box".into();
                    op.circuit_box = Some(BoxSpec::from(b));
                }
            }
            op.condition = gate.condition.as_ref().map(|c| ConditionSpec {
                bits: c.bits.iter().map(|&b| clbit_pos(b)).collect(),
                value: c.value,
            });
        }
        op
    }
}

impl BoxSpec {
    fn to_box(&self) -> IrResult<CircuitBox> {
        let ops = self
            .ops
            .iter()
            .map(OpSpec::to_instruction)
            .collect::<IrResult<Vec<_>>>()?;
        CircuitBox::new(self.name.clone(), self.num_qubits, ops)
    }
}

impl From<&CircuitBox> for BoxSpec {
    fn from(b: &CircuitBox) -> Self {
        Self {
            name: b.name.clone(),
            num_qubits: b.num_qubits,
            ops: b
                .ops
                .iter()
                .map(|inst| OpSpec::from_instruction(inst, &|q| q.0, &|c| c.0))
                .collect(),
        }
    }
}

impl From<&Circuit> for CircuitSpec {
    fn from(circuit: &Circuit) -> Self {
        let qubit_pos: FxHashMap<QubitId, u32> = circuit
            .qubits()
            .iter()
            .zip(0u32..)
            .map(|(q, i)| (q.id, i))
            .collect();
        let clbit_pos: FxHashMap<ClbitId, u32> = circuit
            .clbits()
            .iter()
            .zip(0u32..)
            .map(|(c, i)| (c.id, i))
            .collect();

        let is_default_q = circuit
            .qubits()
            .iter()
            .zip(0u32..)
            .all(|(q, i)| q.register == crate::qubit::DEFAULT_QUBIT_REGISTER && q.index == i);
        let is_default_c = circuit
            .clbits()
            .iter()
            .zip(0u32..)
            .all(|(c, i)| c.register == crate::qubit::DEFAULT_CLBIT_REGISTER && c.index == i);

        let qubit_of = |q: QubitId| qubit_pos.get(&q).copied().unwrap_or(q.0);
        let clbit_of = |c: ClbitId| clbit_pos.get(&c).copied().unwrap_or(c.0);

        Self {
            name: circuit.name().to_string(),
            num_qubits: u32::try_from(circuit.num_qubits()).unwrap_or(u32::MAX),
            num_clbits: u32::try_from(circuit.num_clbits()).unwrap_or(u32::MAX),
            qubits: if is_default_q {
                vec![]
            } else {
                circuit
                    .qubits()
                    .iter()
                    .map(|q| BitSpec {
                        register: q.register.clone(),
                        index: q.index,
                    })
                    .collect()
            },
            clbits: if is_default_c {
                vec![]
            } else {
                circuit
                    .clbits()
                    .iter()
                    .map(|c| BitSpec {
                        register: c.register.clone(),
                        index: c.index,
                    })
                    .collect()
            },
            global_phase: circuit.dag().global_phase(),
            ops: circuit
                .dag()
                .instructions()
                .map(|inst| OpSpec::from_instruction(inst, &qubit_of, &clbit_of))
                .collect(),
        }
    }
}

impl Circuit {
    /// Parse a circuit from its JSON form.
    pub fn from_json(json: &str) -> IrResult<Self> {
        CircuitSpec::from_json(json)?.to_circuit()
    }

    /// Serialise the circuit to its JSON form.
    pub fn to_json(&self) -> IrResult<String> {
        CircuitSpec::from(self).to_json()
    }
}
