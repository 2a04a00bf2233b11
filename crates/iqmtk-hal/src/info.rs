//! Backend capability introspection.
//!
//! [`BackendInfo`] describes what a backend can run: the device it talks
//! to, its coupling graph and the operations it executes natively.
//! Compilers use it to choose passes; the CLI prints it.

use std::collections::BTreeSet;

use iqmtk_compile::Architecture;
use serde::{Deserialize, Serialize};

/// Static description of a backend, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Name of the backend implementation.
    pub name: String,
    /// Name of the device as reported by the service.
    pub device_name: String,
    /// Version of the backend implementation.
    pub version: String,
    /// Physical qubit connectivity. All edges are bidirectional.
    pub architecture: Architecture,
    /// Operations the device executes (`prx`, `cz`, `measure`, ...).
    pub gate_set: BTreeSet<String>,
    /// Number of qubits on the device, including uncoupled ones.
    pub num_qubits: u32,
    /// Results carry per-shot outcomes.
    pub supports_shots: bool,
    /// Results can be summarised as counts.
    pub supports_counts: bool,
    /// `process_circuits` can strip final gates into classical
    /// post-processing.
    pub supports_contextual_optimisation: bool,
    /// Result handles can be stored and used from another process.
    pub persistent_handles: bool,
}

impl BackendInfo {
    /// Create a description with shot, count and persistent-handle
    /// support enabled.
    pub fn new(
        name: impl Into<String>,
        device_name: impl Into<String>,
        architecture: Architecture,
        gate_set: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let num_qubits = u32::try_from(architecture.num_nodes()).unwrap_or(u32::MAX);
        Self {
            name: name.into(),
            device_name: device_name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            architecture,
            gate_set: gate_set.into_iter().map(Into::into).collect(),
            num_qubits,
            supports_shots: true,
            supports_counts: true,
            supports_contextual_optimisation: false,
            persistent_handles: true,
        }
    }

    /// Set the implementation version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Declare support for contextual optimisation.
    #[must_use]
    pub fn with_contextual_optimisation(mut self, supported: bool) -> Self {
        self.supports_contextual_optimisation = supported;
        self
    }

    /// Check whether the device executes `op` natively.
    pub fn supports(&self, op: &str) -> bool {
        self.gate_set.contains(op)
    }
}
