//! Gate decompositions into the IQM native gates.
//!
//! Multi-qubit gates are first expanded into CX, CZ and single-qubit gates
//! ([`expand_to_cx`]). CX is then rewritten around CZ ([`cx_to_cz`]) and
//! every single-qubit gate becomes at most two PRX gates ([`gate_to_prx`]).
//!
//! PRX(θ, φ) = RZ(φ) · RX(θ) · RZ(−φ), so any RZ(a) · RX(b) · RZ(c) equals
//! PRX(−π, (a − c)/2) followed by PRX(π + b, a) up to global phase.

use std::f64::consts::{FRAC_PI_2, PI};

use iqmtk_ir::{Gate, Instruction, ParameterExpression, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::unitary::{EPSILON, Unitary2x2};

type Step = (StandardGate, Vec<QubitId>);

/// Build a PRX gate from anything convertible to parameter expressions.
pub fn prx(theta: impl Into<ParameterExpression>, phi: impl Into<ParameterExpression>) -> StandardGate {
    StandardGate::PRX(theta.into(), phi.into())
}

/// Expand a gate acting on two or more qubits into CX, CZ and
/// single-qubit gates.
///
/// Single-qubit gates, CX, CZ, boxes and non-gate instructions come back
/// unchanged. A classical condition is copied onto every emitted gate.
/// Symbolic angles stay symbolic.
pub fn expand_to_cx(inst: &Instruction) -> Vec<Instruction> {
    let Some(gate) = inst.as_gate() else {
        return vec![inst.clone()];
    };
    let Some(steps) = gate.as_standard().and_then(|g| cx_steps(g, &inst.qubits)) else {
        return vec![inst.clone()];
    };

    steps
        .into_iter()
        .flat_map(|(g, qubits)| {
            let mut emitted = Gate::standard(g);
            emitted.condition.clone_from(&gate.condition);
            expand_to_cx(&Instruction::gate(emitted, qubits))
        })
        .collect()
}

fn cx_steps(gate: &StandardGate, qubits: &[QubitId]) -> Option<Vec<Step>> {
    use StandardGate as G;

    let half = |p: &ParameterExpression| p.clone() / 2.0;
    let steps = match (gate, qubits) {
        (G::CY, &[c, t]) => vec![(G::Sdg, vec![t]), (G::CX, vec![c, t]), (G::S, vec![t])],
        (G::CH, &[c, t]) => vec![
            (G::S, vec![t]),
            (G::H, vec![t]),
            (G::T, vec![t]),
            (G::CX, vec![c, t]),
            (G::Tdg, vec![t]),
            (G::H, vec![t]),
            (G::Sdg, vec![t]),
        ],
        (G::CRz(theta), &[c, t]) => vec![
            (G::Rz(half(theta)), vec![t]),
            (G::CX, vec![c, t]),
            (G::Rz(-half(theta)), vec![t]),
            (G::CX, vec![c, t]),
        ],
        (G::CRy(theta), &[c, t]) => vec![
            (G::Ry(half(theta)), vec![t]),
            (G::CX, vec![c, t]),
            (G::Ry(-half(theta)), vec![t]),
            (G::CX, vec![c, t]),
        ],
        (G::CRx(theta), &[c, t]) => vec![
            (G::H, vec![t]),
            (G::Rz(half(theta)), vec![t]),
            (G::CX, vec![c, t]),
            (G::Rz(-half(theta)), vec![t]),
            (G::CX, vec![c, t]),
            (G::H, vec![t]),
        ],
        (G::CP(lambda), &[c, t]) => vec![
            (G::P(half(lambda)), vec![c]),
            (G::CX, vec![c, t]),
            (G::P(-half(lambda)), vec![t]),
            (G::CX, vec![c, t]),
            (G::P(half(lambda)), vec![t]),
        ],
        (G::RZZ(theta), &[a, b]) => zz_steps(theta, a, b, &[], &[]),
        (G::RXX(theta), &[a, b]) => zz_steps(theta, a, b, &[G::H], &[G::H]),
        (G::RYY(theta), &[a, b]) => zz_steps(
            theta,
            a,
            b,
            &[G::Rx(FRAC_PI_2.into())],
            &[G::Rx((-FRAC_PI_2).into())],
        ),
        (G::Swap, &[a, b]) => vec![
            (G::CX, vec![a, b]),
            (G::CX, vec![b, a]),
            (G::CX, vec![a, b]),
        ],
        (G::ISwap, &[a, b]) => vec![
            (G::S, vec![a]),
            (G::S, vec![b]),
            (G::H, vec![a]),
            (G::CX, vec![a, b]),
            (G::CX, vec![b, a]),
            (G::H, vec![b]),
        ],
        (G::CCX, &[a, b, c]) => ccx_steps(a, b, c),
        (G::CSwap, &[c, a, b]) => {
            let mut steps = vec![(G::CX, vec![b, a])];
            steps.extend(ccx_steps(c, a, b));
            steps.push((G::CX, vec![b, a]));
            steps
        }
        _ => return None,
    };
    Some(steps)
}

/// Basis change on both qubits, then CX · RZ · CX, then the inverse change.
fn zz_steps(
    theta: &ParameterExpression,
    a: QubitId,
    b: QubitId,
    before: &[StandardGate],
    after: &[StandardGate],
) -> Vec<Step> {
    let mut steps = Vec::with_capacity(3 + 2 * (before.len() + after.len()));
    for g in before {
        steps.push((g.clone(), vec![a]));
        steps.push((g.clone(), vec![b]));
    }
    steps.push((StandardGate::CX, vec![a, b]));
    steps.push((StandardGate::Rz(theta.clone()), vec![b]));
    steps.push((StandardGate::CX, vec![a, b]));
    for g in after {
        steps.push((g.clone(), vec![a]));
        steps.push((g.clone(), vec![b]));
    }
    steps
}

/// Toffoli with six CX.
fn ccx_steps(a: QubitId, b: QubitId, c: QubitId) -> Vec<Step> {
    use StandardGate as G;
    vec![
        (G::H, vec![c]),
        (G::CX, vec![b, c]),
        (G::Tdg, vec![c]),
        (G::CX, vec![a, c]),
        (G::T, vec![c]),
        (G::CX, vec![b, c]),
        (G::Tdg, vec![c]),
        (G::CX, vec![a, c]),
        (G::T, vec![b]),
        (G::T, vec![c]),
        (G::H, vec![c]),
        (G::CX, vec![a, b]),
        (G::T, vec![a]),
        (G::Tdg, vec![b]),
        (G::CX, vec![a, b]),
    ]
}

/// Rewrite CX(c, t) as PRX(−π/2, π/2) on t, CZ(c, t), PRX(π/2, π/2) on t.
///
/// Anything other than CX comes back unchanged.
pub fn cx_to_cz(inst: &Instruction) -> Vec<Instruction> {
    let Some(gate) = inst.as_gate() else {
        return vec![inst.clone()];
    };
    let is_cx = matches!(gate.as_standard(), Some(StandardGate::CX));
    let (true, &[control, target]) = (is_cx, inst.qubits.as_slice()) else {
        return vec![inst.clone()];
    };

    let emit = |g: StandardGate, qubits: Vec<QubitId>| {
        let mut emitted = Gate::standard(g);
        emitted.condition.clone_from(&gate.condition);
        Instruction::gate(emitted, qubits)
    };
    vec![
        emit(prx(-FRAC_PI_2, FRAC_PI_2), vec![target]),
        emit(StandardGate::CZ, vec![control, target]),
        emit(prx(FRAC_PI_2, FRAC_PI_2), vec![target]),
    ]
}

/// Synthesise a single-qubit unitary as at most two PRX gates.
///
/// The identity yields no gates. Half turns and rotations of the form
/// RZ(a) · RX(b) · RZ(−a) yield a single PRX.
pub fn unitary_to_prx(u: &Unitary2x2) -> Vec<StandardGate> {
    if u.is_identity() {
        return vec![];
    }
    let (a, b, c) = u.zxz_decomposition();
    if (Unitary2x2::normalize_angle(b).abs() - PI).abs() < EPSILON {
        // RX(π) · RZ(c) = RZ(−c) · RX(π)
        return vec![prx(PI, Unitary2x2::normalize_angle((a - c) / 2.0))];
    }
    if Unitary2x2::normalize_angle(a + c).abs() < EPSILON {
        return vec![prx(Unitary2x2::normalize_angle(b), Unitary2x2::normalize_angle(a))];
    }
    vec![
        prx(-PI, Unitary2x2::normalize_angle((a - c) / 2.0)),
        prx(
            Unitary2x2::normalize_angle(PI + b),
            Unitary2x2::normalize_angle(a),
        ),
    ]
}

/// Rewrite a single-qubit gate as PRX gates, in time order.
///
/// Bound gates go through their matrix. RX, RY, RZ, P, U and PRX also
/// accept symbolic angles and produce PRX gates with symbolic angles.
pub fn gate_to_prx(gate: &StandardGate) -> CompileResult<Vec<StandardGate>> {
    if gate.num_qubits() != 1 {
        return Err(CompileError::TooManyQubits {
            gate: gate.name().to_string(),
            num_qubits: gate.num_qubits() as usize,
        });
    }
    if let StandardGate::PRX(..) = gate {
        return Ok(vec![gate.clone()]);
    }
    if let Some(u) = Unitary2x2::from_gate(gate) {
        return Ok(unitary_to_prx(&u));
    }

    let pi = ParameterExpression::pi;
    let gates = match gate {
        StandardGate::Rx(theta) => vec![prx(theta.clone(), 0.0)],
        StandardGate::Ry(theta) => vec![prx(theta.clone(), FRAC_PI_2)],
        StandardGate::Rz(theta) | StandardGate::P(theta) => vec![
            prx(-pi(), theta.clone() / 2.0),
            prx(pi(), theta.clone()),
        ],
        StandardGate::U(theta, phi, lambda) => {
            let a = phi.clone() + FRAC_PI_2;
            let c = lambda.clone() - FRAC_PI_2;
            vec![
                prx(-pi(), (a.clone() - c) / 2.0),
                prx(pi() + theta.clone(), a),
            ]
        }
        _ if gate.is_parameterized() => {
            return Err(CompileError::SymbolicParameter {
                gate: gate.name().to_string(),
            });
        }
        _ => return Err(CompileError::UnsupportedGate(gate.name().to_string())),
    };
    Ok(gates
        .into_iter()
        .map(|mut g| {
            g.map_parameters(&mut ParameterExpression::simplify);
            g
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_ir::{ClassicalCondition, ClbitId};

    fn prx_product(gates: &[StandardGate]) -> Unitary2x2 {
        gates.iter().fold(Unitary2x2::identity(), |acc, g| {
            Unitary2x2::from_gate(g).unwrap() * acc
        })
    }

    #[test]
    fn test_single_qubit_gates_become_prx() {
        let gates = [
            StandardGate::H,
            StandardGate::X,
            StandardGate::Y,
            StandardGate::Z,
            StandardGate::S,
            StandardGate::Tdg,
            StandardGate::SX,
            StandardGate::Rx(0.3.into()),
            StandardGate::Ry((-1.2).into()),
            StandardGate::Rz(2.5.into()),
            StandardGate::P(0.7.into()),
            StandardGate::U(0.4.into(), 1.1.into(), (-0.3).into()),
        ];
        for g in gates {
            let out = gate_to_prx(&g).unwrap();
            assert!(out.len() <= 2, "{g:?} gave {out:?}");
            assert!(out.iter().all(|p| p.name() == "prx"));
            let expected = Unitary2x2::from_gate(&g).unwrap();
            assert!(prx_product(&out).approx_eq_up_to_phase(&expected), "{g:?}");
        }
    }

    #[test]
    fn test_identity_and_rotations_are_short() {
        assert!(gate_to_prx(&StandardGate::I).unwrap().is_empty());
        assert!(gate_to_prx(&StandardGate::Rz(0.0.into())).unwrap().is_empty());
        assert_eq!(gate_to_prx(&StandardGate::X).unwrap().len(), 1);
        assert_eq!(gate_to_prx(&StandardGate::Rx(0.5.into())).unwrap().len(), 1);
    }

    #[test]
    fn test_symbolic_closed_forms() {
        let cases = [
            StandardGate::Rx("a".into()),
            StandardGate::Ry("a".into()),
            StandardGate::Rz("a".into()),
            StandardGate::P("a".into()),
            StandardGate::U("a".into(), "b".into(), "c".into()),
        ];
        for g in cases {
            let out = gate_to_prx(&g).unwrap();
            assert!(out.iter().all(StandardGate::is_parameterized));

            let mut bound = g.clone();
            let mut bind = |p: &ParameterExpression| p.bind("a", 0.9).bind("b", -0.4).bind("c", 1.7);
            bound.map_parameters(&mut bind);
            let out: Vec<_> = out
                .into_iter()
                .map(|mut p| {
                    p.map_parameters(&mut bind);
                    p
                })
                .collect();
            let expected = Unitary2x2::from_gate(&bound).unwrap();
            assert!(prx_product(&out).approx_eq_up_to_phase(&expected), "{g:?}");
        }
    }

    #[test]
    fn test_gate_to_prx_rejects_multi_qubit() {
        assert!(matches!(
            gate_to_prx(&StandardGate::CZ),
            Err(CompileError::TooManyQubits { num_qubits: 2, .. })
        ));
    }

    #[test]
    fn test_expand_keeps_condition() {
        let cond = ClassicalCondition::new([ClbitId(0)], 1);
        let gate = Gate::standard(StandardGate::Swap).with_condition(cond.clone());
        let out = expand_to_cx(&Instruction::gate(gate, [QubitId(0), QubitId(1)]));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|i| i.name() == "cx" && i.condition() == Some(&cond)));
    }

    #[test]
    fn test_expand_cswap_reaches_native_arity() {
        let inst = Instruction::gate(StandardGate::CSwap, [QubitId(0), QubitId(1), QubitId(2)]);
        let out = expand_to_cx(&inst);
        assert_eq!(out.iter().filter(|i| i.name() == "cx").count(), 8);
        assert!(out.iter().all(|i| i.qubits.len() <= 2));
    }

    #[test]
    fn test_expand_symbolic_crz() {
        let inst = Instruction::gate(StandardGate::CRz("t".into()), [QubitId(0), QubitId(1)]);
        let out = expand_to_cx(&inst);
        assert_eq!(out.len(), 4);
        let rz = out[0].as_gate().and_then(Gate::as_standard).unwrap();
        assert!(rz.is_parameterized());
        assert_eq!(rz.parameters()[0].bind("t", 1.0).as_f64(), Some(0.5));
    }

    #[test]
    fn test_cx_to_cz() {
        let out = cx_to_cz(&Instruction::gate(StandardGate::CX, [QubitId(3), QubitId(1)]));
        let names: Vec<_> = out.iter().map(Instruction::name).collect();
        assert_eq!(names, ["prx", "cz", "prx"]);
        assert_eq!(out[1].qubits, vec![QubitId(3), QubitId(1)]);
        assert_eq!(out[0].qubits, vec![QubitId(1)]);

        let h = Instruction::gate(StandardGate::H, [QubitId(0)]);
        assert_eq!(cx_to_cz(&h), vec![h]);
    }
}
