//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use iqmtk_ir::{Circuit, CircuitDag};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::passes::{
    DecomposeBoxes, DefaultMapping, DelayMeasures, FlattenRegisters, FullPeepholeOptimise,
    IqmRebase, RemoveBarriers, RemoveRedundancies, SimplifyInitial, SynthesiseIqm,
};
use crate::property::{Architecture, PropertySet};

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            dag.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag, properties)?;
                debug!("Pass {} completed, ops: {}", pass.name(), dag.num_ops());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            dag.depth(),
            dag.num_ops()
        );

        Ok(())
    }

    /// Compile `circuit` in place and return the properties gathered on the
    /// way, including the initial and final layouts.
    pub fn apply(&self, circuit: &mut Circuit) -> CompileResult<PropertySet> {
        let mut properties = PropertySet::new();
        self.run(circuit.dag_mut(), &mut properties)?;
        Ok(properties)
    }

    /// Names of the passes, in order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for PassManager {
    fn name(&self) -> &'static str {
        "PassManager"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        PassManager::run(self, dag, properties)
    }
}

/// Upper bound on the rounds a [`Repeat`] will run.
const MAX_ROUNDS: usize = 64;

/// Run a sequence of passes until the operation count stops shrinking.
pub struct Repeat {
    body: PassManager,
}

impl Repeat {
    /// Repeat a single pass.
    pub fn new(pass: impl Pass + 'static) -> Self {
        let mut body = PassManager::new();
        body.add_pass(pass);
        Self { body }
    }

    /// Repeat every pass of `body`, in order, as one round.
    pub fn sequence(body: PassManager) -> Self {
        Self { body }
    }
}

impl Pass for Repeat {
    fn name(&self) -> &'static str {
        "Repeat"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        for round in 1..=MAX_ROUNDS {
            let before = dag.num_ops();
            for pass in &self.body.passes {
                if pass.should_run(dag, properties) {
                    pass.run(dag, properties)?;
                }
            }
            if dag.num_ops() >= before {
                debug!("Repeat settled after {} rounds", round);
                break;
            }
        }
        Ok(())
    }
}

/// Builder for the IQM default compilation pipeline.
pub struct PassManagerBuilder {
    /// Optimisation level (0-2).
    optimisation_level: u8,
    /// Device coupling graph.
    architecture: Option<Architecture>,
}

impl PassManagerBuilder {
    /// Create a new builder at optimisation level 2.
    pub fn new() -> Self {
        Self {
            optimisation_level: 2,
            architecture: None,
        }
    }

    /// Set the optimisation level.
    ///
    /// - Level 0: rebase and mapping only
    /// - Level 1: local re-synthesis and initial-state simplification
    /// - Level 2: peephole optimisation to a fixpoint (default)
    ///
    /// Levels above 2 are rejected by [`build`](Self::build).
    #[must_use]
    pub fn with_optimisation_level(mut self, level: u8) -> Self {
        self.optimisation_level = level;
        self
    }

    /// Set the device coupling graph. Without one the pipeline skips
    /// placement and routing.
    #[must_use]
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    /// Build the pass manager.
    pub fn build(self) -> CompileResult<PassManager> {
        let level = self.optimisation_level;
        let mut pm = PassManager::new();

        pm.add_pass(DecomposeBoxes);
        pm.add_pass(FlattenRegisters);
        pm.add_pass(RemoveBarriers);
        match level {
            0 => pm.add_pass(IqmRebase),
            1 => pm.add_pass(SynthesiseIqm),
            2 => pm.add_pass(FullPeepholeOptimise),
            _ => return Err(CompileError::InvalidOptimisationLevel(level)),
        }

        if let Some(arch) = self.architecture {
            pm.add_pass(DefaultMapping::new(arch));
        }
        pm.add_pass(DelayMeasures);
        pm.add_pass(IqmRebase);
        pm.add_pass(Repeat::new(RemoveRedundancies));

        if level >= 1 {
            pm.add_pass(SimplifyInitial::new());
        }

        Ok(pm)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
