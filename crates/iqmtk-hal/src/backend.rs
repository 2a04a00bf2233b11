//! Backend trait and submission options.
//!
//! The [`Backend`] trait defines the lifecycle of a circuit on a device:
//!
//! ```text
//!   get_compiled_circuit() ──→ process_circuits() ──→ circuit_status() ──→ get_result()
//!          (sync)                   (async)               (async)            (async)
//! ```
//!
//! ## Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `backend_info()` | sync | yes | `&BackendInfo` |
//! | `required_predicates()` | sync | yes | `Vec<Box<dyn Predicate>>` |
//! | `rebase_pass()` | sync | yes | `Box<dyn Pass>` |
//! | `default_compilation_pass()` | sync | yes | `HalResult<PassManager>` |
//! | `process_circuits()` | async | yes | `HalResult<Vec<ResultHandle>>` |
//! | `circuit_status()` | async | yes | `HalResult<CircuitStatus>` |
//! | `cancel()` | async | yes | `HalResult<()>` |
//! | `cached_result()` | async | yes | `Option<BackendResult>` |
//! | `pop_result()` | async | yes | `Option<BackendResult>` |
//! | `get_compiled_circuit(s)()` | sync | provided | `HalResult<Circuit>` |
//! | `valid_circuit()` | sync | provided | `bool` |
//! | `process_circuit()` | async | provided | `HalResult<ResultHandle>` |
//! | `get_result(s)()` | async | provided | `HalResult<BackendResult>` |
//! | `run_circuit(s)()` | async | provided | `HalResult<BackendResult>` |

use std::time::Duration;

use async_trait::async_trait;
use iqmtk_compile::{Pass, PassManager, Predicate, first_failure};
use iqmtk_ir::Circuit;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{HalError, HalResult};
use crate::info::BackendInfo;
use crate::job::{CircuitStatus, ResultHandle};
use crate::result::BackendResult;

/// Default bound on [`Backend::get_result`].
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(900);

/// Interval between status polls in [`Backend::get_result`].
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shot counts for a batch of circuits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Shots {
    /// The same count for every circuit.
    Uniform(u32),
    /// One count per circuit.
    PerCircuit(Vec<u32>),
}

impl Shots {
    /// Expand to one positive count per circuit.
    pub fn resolve(shots: Option<Shots>, num_circuits: usize) -> HalResult<Vec<u32>> {
        let counts = match shots {
            None => {
                return Err(HalError::InvalidShots(
                    "Parameter n_shots is required".into(),
                ));
            }
            Some(Shots::Uniform(n)) => vec![n; num_circuits],
            Some(Shots::PerCircuit(counts)) => {
                if counts.len() != num_circuits {
                    return Err(HalError::InvalidShots(format!(
                        "Got {} shot counts for {num_circuits} circuits",
                        counts.len()
                    )));
                }
                counts
            }
        };
        if counts.contains(&0) {
            return Err(HalError::InvalidShots("Shot count must be positive".into()));
        }
        Ok(counts)
    }
}

impl From<u32> for Shots {
    fn from(n: u32) -> Self {
        Shots::Uniform(n)
    }
}

impl From<Vec<u32>> for Shots {
    fn from(counts: Vec<u32>) -> Self {
        Shots::PerCircuit(counts)
    }
}

/// Options for [`Backend::process_circuits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Reject circuits that fail a required predicate before submitting.
    pub valid_check: bool,
    /// Strip final classical-equivalent gates and apply them to the
    /// results instead.
    pub postprocess: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            valid_check: true,
            postprocess: false,
        }
    }
}

impl ProcessOptions {
    /// Default options: validity check on, post-processing off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the validity check.
    #[must_use]
    pub fn with_valid_check(mut self, valid_check: bool) -> Self {
        self.valid_check = valid_check;
        self
    }

    /// Enable or disable post-processing.
    #[must_use]
    pub fn with_postprocess(mut self, postprocess: bool) -> Self {
        self.postprocess = postprocess;
        self
    }
}

/// Trait for quantum backends.
///
/// Implementations describe their device statically, supply the passes
/// that make a circuit runnable, and drive submitted circuits through the
/// status state machine. Completed results are cached by the backend and
/// looked up by handle.
///
/// # Contract
///
/// - `backend_info()` is synchronous and infallible; it is fixed at
///   construction.
/// - `process_circuits()` returns one handle per circuit, in order.
/// - `circuit_status()` returning `Completed` implies the result is
///   cached.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Static description of the backend.
    fn backend_info(&self) -> &BackendInfo;

    /// Predicates a circuit must satisfy to run on the device.
    fn required_predicates(&self) -> Vec<Box<dyn Predicate>>;

    /// A pass that rewrites any gate into the native gate set.
    fn rebase_pass(&self) -> Box<dyn Pass>;

    /// The compilation pipeline for an optimisation level (0, 1 or 2).
    fn default_compilation_pass(&self, optimisation_level: u8) -> HalResult<PassManager>;

    /// Submit circuits for execution.
    async fn process_circuits(
        &self,
        circuits: &[Circuit],
        n_shots: Option<Shots>,
        options: ProcessOptions,
    ) -> HalResult<Vec<ResultHandle>>;

    /// Query the status of a circuit, caching its result on completion.
    async fn circuit_status(&self, handle: &ResultHandle) -> HalResult<CircuitStatus>;

    /// Cancel a circuit.
    async fn cancel(&self, handle: &ResultHandle) -> HalResult<()>;

    /// Look up a cached result.
    async fn cached_result(&self, handle: &ResultHandle) -> Option<BackendResult>;

    /// Remove a result from the cache.
    async fn pop_result(&self, handle: &ResultHandle) -> Option<BackendResult>;

    /// Compile a circuit with the default pipeline.
    fn get_compiled_circuit(&self, circuit: &Circuit, optimisation_level: u8) -> HalResult<Circuit> {
        let pm = self.default_compilation_pass(optimisation_level)?;
        let mut compiled = circuit.clone();
        pm.apply(&mut compiled)?;
        Ok(compiled)
    }

    /// Compile several circuits with the default pipeline.
    fn get_compiled_circuits(
        &self,
        circuits: &[Circuit],
        optimisation_level: u8,
    ) -> HalResult<Vec<Circuit>> {
        let pm = self.default_compilation_pass(optimisation_level)?;
        circuits
            .iter()
            .map(|c| {
                let mut compiled = c.clone();
                pm.apply(&mut compiled)?;
                Ok(compiled)
            })
            .collect()
    }

    /// Check a circuit against every required predicate.
    fn valid_circuit(&self, circuit: &Circuit) -> bool {
        first_failure(&self.required_predicates(), circuit).is_none()
    }

    /// Fail on the first circuit that does not satisfy a required
    /// predicate, naming the predicate.
    fn check_circuits(&self, circuits: &[Circuit]) -> HalResult<()> {
        let predicates = self.required_predicates();
        for (i, circuit) in circuits.iter().enumerate() {
            if let Some(name) = first_failure(&predicates, circuit) {
                return Err(HalError::InvalidCircuit(format!(
                    "Circuit {i} ({}) does not satisfy {name}",
                    circuit.name()
                )));
            }
        }
        Ok(())
    }

    /// Submit one circuit.
    async fn process_circuit(
        &self,
        circuit: &Circuit,
        n_shots: u32,
        options: ProcessOptions,
    ) -> HalResult<ResultHandle> {
        let handles = self
            .process_circuits(std::slice::from_ref(circuit), Some(n_shots.into()), options)
            .await?;
        handles
            .into_iter()
            .next()
            .ok_or_else(|| HalError::Backend("No handle returned for circuit".into()))
    }

    /// Wait for a circuit's result.
    ///
    /// Returns the cached result if present, otherwise polls
    /// [`circuit_status`](Backend::circuit_status) every second until a
    /// terminal state or `timeout` (default 900 s).
    async fn get_result(
        &self,
        handle: &ResultHandle,
        timeout: Option<Duration>,
    ) -> HalResult<BackendResult> {
        if let Some(result) = self.cached_result(handle).await {
            return Ok(result);
        }

        let deadline = Instant::now() + timeout.unwrap_or(DEFAULT_RESULT_TIMEOUT);
        loop {
            let status = self.circuit_status(handle).await?;
            debug!("Job {} status: {}", handle.id, status);

            match status {
                CircuitStatus::Completed => {
                    return self.cached_result(handle).await.ok_or_else(|| {
                        HalError::Backend(format!("Job {} completed without a result", handle.id))
                    });
                }
                CircuitStatus::Error(msg) => return Err(HalError::JobFailed(msg)),
                CircuitStatus::Cancelled => return Err(HalError::JobCancelled),
                CircuitStatus::Submitted | CircuitStatus::Queued | CircuitStatus::Running => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(HalError::Timeout(handle.id.to_string()));
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Wait for several results, in handle order.
    async fn get_results(
        &self,
        handles: &[ResultHandle],
        timeout: Option<Duration>,
    ) -> HalResult<Vec<BackendResult>> {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(self.get_result(handle, timeout).await?);
        }
        Ok(results)
    }

    /// Submit one circuit and wait for its result.
    async fn run_circuit(
        &self,
        circuit: &Circuit,
        n_shots: u32,
        options: ProcessOptions,
    ) -> HalResult<BackendResult> {
        let handle = self.process_circuit(circuit, n_shots, options).await?;
        self.get_result(&handle, None).await
    }

    /// Submit circuits and wait for all results.
    async fn run_circuits(
        &self,
        circuits: &[Circuit],
        n_shots: Option<Shots>,
        options: ProcessOptions,
    ) -> HalResult<Vec<BackendResult>> {
        let handles = self.process_circuits(circuits, n_shots, options).await?;
        self.get_results(&handles, None).await
    }
}
