//! Local re-synthesis passes for optimisation levels 1 and 2.

use iqmtk_ir::{CircuitDag, Instruction};
use tracing::debug;

use crate::decompose::{cx_to_cz, expand_to_cx};
use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::peephole::{OneQubitMerge, Peephole};

const SWEEP: Peephole = Peephole {
    merge: OneQubitMerge::Unitary,
    cancel_pairs: true,
};

fn rewrite(
    dag: &CircuitDag,
    f: impl Fn(&Instruction) -> Vec<Instruction>,
) -> CompileResult<CircuitDag> {
    let mut new_dag = dag.empty_like();
    for inst in dag.instructions() {
        for out in f(inst) {
            new_dag.apply(out)?;
        }
    }
    Ok(new_dag)
}

/// Expand multi-qubit gates to CX, then fuse single-qubit runs into PRX
/// and cancel adjacent CX pairs.
pub struct SynthesiseIqm;

impl Pass for SynthesiseIqm {
    fn name(&self) -> &'static str {
        "SynthesiseIqm"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let expanded = rewrite(dag, expand_to_cx)?;
        *dag = SWEEP.apply(&expanded)?;
        Ok(())
    }
}

/// Lower everything to PRX and CZ, then sweep until the operation count
/// stops shrinking.
///
/// Working on CZ lets pairs cancel in either orientation and lets the PRX
/// gates around each CZ fuse with their neighbours.
pub struct FullPeepholeOptimise;

impl Pass for FullPeepholeOptimise {
    fn name(&self) -> &'static str {
        "FullPeepholeOptimise"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let expanded = rewrite(dag, expand_to_cx)?;
        let mut current = rewrite(&expanded, cx_to_cz)?;
        let mut rounds = 0_usize;
        loop {
            let next = SWEEP.apply(&current)?;
            rounds += 1;
            let shrunk = next.num_ops() < current.num_ops();
            current = next;
            if !shrunk {
                break;
            }
        }
        debug!("FullPeepholeOptimise converged after {} sweeps", rounds);
        *dag = current;
        Ok(())
    }
}
