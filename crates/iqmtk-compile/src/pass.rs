//! The unit of compilation: a pass over a circuit DAG.

use iqmtk_ir::CircuitDag;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// Whether a pass may rewrite the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Inspects the DAG and records facts in the [`PropertySet`] only.
    Analysis,
    /// Rewrites the DAG.
    Transformation,
}

/// One step of an IQM compilation pipeline.
///
/// Rewriting passes build a fresh DAG with [`CircuitDag::empty_like`] and
/// swap it into `*dag` once the walk is complete, so a failing pass leaves
/// the input untouched.
pub trait Pass: Send + Sync {
    /// Stable name, used in logs and error messages.
    fn name(&self) -> &str;

    fn kind(&self) -> PassKind;

    /// Apply the pass. Placement and routing read and write the layout
    /// stored in `properties`.
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()>;

    /// Skip hook consulted by the pass manager before `run`.
    fn should_run(&self, _dag: &CircuitDag, _properties: &PropertySet) -> bool {
        true
    }
}
