//! Conversion between compiled circuits and IQM records.
//!
//! Compiled circuits address device node `i` as the qubit `node[i]`; the
//! device calls the same qubit `QB{i+1}`. Instructions are sent with the
//! node names and a qubit mapping from node name to device name.

use std::f64::consts::TAU;

use iqmtk_ir::{Circuit, ClbitId, InstructionKind, QubitId, StandardGate};
use serde_json::{Map, Value};

use crate::api::{Instruction, SingleQubitMapping};
use crate::error::{IqmDeviceUnsupportedError, IqmError, IqmResult};

/// Device name of node `node`.
pub fn node_name(node: u32) -> String {
    format!("QB{}", node + 1)
}

/// Node index of a device qubit name `QB<n>`, `n ≥ 1`.
pub fn parse_node_name(name: &str) -> IqmResult<u32> {
    name.strip_prefix("QB")
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .map(|n| n - 1)
        .ok_or_else(|| {
            IqmDeviceUnsupportedError(format!("Unexpected qubit name '{name}'")).into()
        })
}

fn qubit_name(circuit: &Circuit, id: QubitId) -> IqmResult<String> {
    let qubit = circuit
        .dag()
        .qubit(id)
        .ok_or_else(|| IqmError::Translation(format!("Unknown qubit {id}")))?;
    if qubit.node_index().is_none() {
        return Err(IqmError::Translation(format!(
            "Qubit {qubit} is not a device node; compile the circuit first"
        )));
    }
    Ok(qubit.to_string())
}

fn clbit_key(circuit: &Circuit, id: ClbitId) -> IqmResult<String> {
    circuit
        .dag()
        .clbit(id)
        .map(ToString::to_string)
        .ok_or_else(|| IqmError::Translation(format!("Unknown bit {id}")))
}

fn arg_map<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn angle(param: &iqmtk_ir::ParameterExpression) -> IqmResult<f64> {
    param
        .as_f64()
        .ok_or_else(|| IqmError::Translation(format!("Unbound parameter {param}")))
}

/// Translate a circuit in the IQM gate set into IQM instructions.
///
/// PRX angles are sent in full turns. Measurement keys are the bit names.
pub fn translate_circuit(circuit: &Circuit) -> IqmResult<Vec<Instruction>> {
    let mut instructions = Vec::with_capacity(circuit.dag().num_ops());
    for inst in circuit.dag().instructions() {
        let qubits = inst
            .qubits
            .iter()
            .map(|&q| qubit_name(circuit, q))
            .collect::<IqmResult<Vec<_>>>()?;

        let (name, args) = match &inst.kind {
            InstructionKind::Gate(gate) => {
                if gate.condition.is_some() {
                    return Err(IqmError::Translation(
                        "Classically controlled gates are not supported".into(),
                    ));
                }
                match gate.as_standard() {
                    Some(StandardGate::PRX(theta, phi)) => (
                        "prx",
                        arg_map([
                            ("angle_t", (angle(theta)? / TAU).into()),
                            ("phase_t", (angle(phi)? / TAU).into()),
                        ]),
                    ),
                    Some(StandardGate::CZ) => ("cz", Map::new()),
                    _ => {
                        return Err(IqmError::Translation(format!(
                            "Gate '{}' is not native to IQM devices",
                            gate.name()
                        )));
                    }
                }
            }
            InstructionKind::Measure => {
                let bit = inst
                    .clbits
                    .first()
                    .ok_or_else(|| IqmError::Translation("Measurement without a bit".into()))?;
                ("measure", arg_map([("key", clbit_key(circuit, *bit)?.into())]))
            }
            InstructionKind::Barrier => {
                return Err(IqmError::Translation("Barriers are not supported".into()));
            }
            InstructionKind::Reset => {
                return Err(IqmError::Translation("Reset is not supported".into()));
            }
        };

        instructions.push(Instruction {
            name: name.to_string(),
            qubits,
            args,
        });
    }
    Ok(instructions)
}

/// Map every node qubit of the circuit to its device qubit.
pub fn qubit_mapping(circuit: &Circuit) -> IqmResult<Vec<SingleQubitMapping>> {
    circuit
        .qubits()
        .iter()
        .map(|q| {
            let node = q.node_index().ok_or_else(|| {
                IqmError::Translation(format!(
                    "Qubit {q} is not a device node; compile the circuit first"
                ))
            })?;
            Ok(SingleQubitMapping {
                logical_name: q.to_string(),
                physical_name: node_name(node),
            })
        })
        .collect()
}

/// Measurement key of every measured bit, in bit order.
pub fn measurement_keys(circuit: &Circuit) -> Vec<(ClbitId, String)> {
    let measured: Vec<ClbitId> = circuit
        .dag()
        .instructions()
        .filter(|i| i.is_measure())
        .flat_map(|i| i.clbits.iter().copied())
        .collect();
    circuit
        .clbits()
        .iter()
        .filter(|c| measured.contains(&c.id))
        .map(|c| (c.id, c.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_ir::{CircuitDag, Clbit, Qubit};
    use std::f64::consts::PI;

    fn placed(nodes: &[u32], nbits: u32) -> Circuit {
        let qubits = nodes
            .iter()
            .zip(0..)
            .map(|(&n, i)| Qubit::node(QubitId(i), n));
        let clbits = (0..nbits).map(|i| Clbit::default_register(ClbitId(i)));
        Circuit::from_dag("placed", CircuitDag::with_bits(qubits, clbits))
    }

    #[test]
    fn test_node_names() {
        assert_eq!(node_name(0), "QB1");
        assert_eq!(parse_node_name("QB20").unwrap(), 19);
        assert!(parse_node_name("QB0").is_err());
        assert!(parse_node_name("COMP_R").is_err());
        assert!(matches!(
            parse_node_name("Q1"),
            Err(IqmError::DeviceUnsupported(_))
        ));
    }

    #[test]
    fn test_translate_native_gates() {
        let mut c = placed(&[2, 0], 2);
        c.prx(PI, PI / 2.0, QubitId(0))
            .unwrap()
            .cz(QubitId(0), QubitId(1))
            .unwrap()
            .measure(QubitId(0), ClbitId(1))
            .unwrap();

        let instrs = translate_circuit(&c).unwrap();
        assert_eq!(instrs.len(), 3);

        assert_eq!(instrs[0].name, "prx");
        assert_eq!(instrs[0].qubits, ["node[2]"]);
        assert!((instrs[0].args["angle_t"].as_f64().unwrap() - 0.5).abs() < 1e-12);
        assert!((instrs[0].args["phase_t"].as_f64().unwrap() - 0.25).abs() < 1e-12);

        assert_eq!(instrs[1].name, "cz");
        assert_eq!(instrs[1].qubits, ["node[2]", "node[0]"]);
        assert!(instrs[1].args.is_empty());

        assert_eq!(instrs[2].name, "measure");
        assert_eq!(instrs[2].args["key"], "c[1]");
    }

    #[test]
    fn test_non_native_gate_rejected() {
        let mut c = placed(&[0], 0);
        c.h(QubitId(0)).unwrap();
        assert!(matches!(translate_circuit(&c), Err(IqmError::Translation(_))));
    }

    #[test]
    fn test_unplaced_qubit_rejected() {
        let mut c = Circuit::with_size("raw", 1, 1);
        c.measure(QubitId(0), ClbitId(0)).unwrap();
        assert!(translate_circuit(&c).is_err());
        assert!(qubit_mapping(&c).is_err());
    }

    #[test]
    fn test_symbolic_angle_rejected() {
        let mut c = placed(&[0], 0);
        c.prx(iqmtk_ir::ParameterExpression::symbol("a"), 0.0, QubitId(0))
            .unwrap();
        let err = translate_circuit(&c).unwrap_err();
        assert!(err.to_string().contains("Unbound parameter"));
    }

    #[test]
    fn test_qubit_mapping() {
        let c = placed(&[3, 0], 0);
        let mapping = qubit_mapping(&c).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[0].logical_name, "node[3]");
        assert_eq!(mapping[0].physical_name, "QB4");
        assert_eq!(mapping[1].physical_name, "QB1");
    }

    #[test]
    fn test_measurement_keys_skip_unmeasured_bits() {
        let mut c = placed(&[0, 1], 3);
        c.measure(QubitId(1), ClbitId(2))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap();
        let keys = measurement_keys(&c);
        assert_eq!(
            keys,
            vec![(ClbitId(0), "c[0]".to_string()), (ClbitId(2), "c[2]".to_string())]
        );
    }
}
