//! IQM backend implementation.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use iqmtk_compile::{
    Architecture, Pass, PassManager, PassManagerBuilder, PostProcessing, Predicate,
    iqm_required_predicates, passes::IqmRebase, prepare_circuit,
};
use iqmtk_hal::{
    Backend, BackendInfo, BackendResult, CircuitStatus, HalError, HalResult, Job, ProcessOptions,
    ResultHandle, Shots,
};
use iqmtk_ir::Circuit;

use crate::api::{CircuitMeasurements, IqmCircuit, IqmClient, Metadata, QuantumArchitecture, RunRequest};
use crate::auth::resolve_credentials;
use crate::config::IqmConfig;
use crate::error::{IqmDeviceUnsupportedError, IqmError, IqmResult};
use crate::translate::{measurement_keys, parse_node_name, qubit_mapping, translate_circuit};

/// IQM Resonance base URL; the device name is appended.
pub const DEFAULT_URL_BASE: &str = "https://cocos.resonance.meetiqm.com";

/// Maximum number of cached jobs before evicting completed entries.
const MAX_CACHED_JOBS: usize = 10_000;

/// Name reported in [`BackendInfo::name`].
pub const BACKEND_NAME: &str = "IQMBackend";

/// Options for [`IqmBackend::new`].
#[derive(Clone, Default)]
pub struct IqmBackendOptions {
    /// API token. Falls back to the stored config, then `IQM_TOKENS_FILE`.
    pub api_token: Option<String>,
    /// Device URL, overriding `https://cocos.resonance.meetiqm.com/<device>`.
    pub url: Option<String>,
    /// Couplings to use instead of the device's, by qubit name.
    pub arch: Option<Vec<(String, String)>>,
}

impl std::fmt::Debug for IqmBackendOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IqmBackendOptions")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("url", &self.url)
            .field("arch", &self.arch)
            .finish()
    }
}

impl IqmBackendOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API token.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the device URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Restrict the couplings used for routing.
    #[must_use]
    pub fn with_arch(
        mut self,
        couplings: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.arch = Some(
            couplings
                .into_iter()
                .map(|(a, b)| (a.into(), b.into()))
                .collect(),
        );
        self
    }
}

/// Job cache entry.
struct CachedJob {
    job: Job,
    result: Option<BackendResult>,
    metadata: Option<Metadata>,
}

/// Device description checked and converted for the compiler.
#[derive(Debug)]
struct Device {
    architecture: Architecture,
    gate_set: Vec<&'static str>,
}

/// Map a device operation name to the name used in the gate set.
fn native_operation(name: &str) -> IqmResult<Option<&'static str>> {
    match name {
        "prx" | "phased_rx" => Ok(Some("prx")),
        "cz" => Ok(Some("cz")),
        "measure" | "measurement" => Ok(Some("measure")),
        "barrier" => Ok(Some("barrier")),
        "move" => Err(IqmDeviceUnsupportedError(
            "Devices with MOVE gates (computational resonators) are not supported".into(),
        )
        .into()),
        _ => Ok(None),
    }
}

fn describe_device(
    qa: &QuantumArchitecture,
    arch: Option<&[(String, String)]>,
) -> IqmResult<Device> {
    let mut gate_set = Vec::new();
    for name in qa.operations.names() {
        match native_operation(name)? {
            Some(op) if !gate_set.contains(&op) => gate_set.push(op),
            Some(_) => {}
            None => debug!("Ignoring device operation '{}'", name),
        }
    }
    for required in ["prx", "cz", "measure"] {
        if !gate_set.contains(&required) {
            return Err(IqmDeviceUnsupportedError(format!(
                "Device does not provide the '{required}' operation"
            ))
            .into());
        }
    }

    let nodes = qa
        .qubits
        .iter()
        .map(|q| parse_node_name(q))
        .collect::<IqmResult<Vec<_>>>()?;

    let couplings: Vec<(String, String)> = match arch {
        Some(arch) => arch.to_vec(),
        None => qa
            .qubit_connectivity
            .iter()
            .map(|pair| match pair.as_slice() {
                [a, b] => Ok((a.clone(), b.clone())),
                _ => Err(IqmDeviceUnsupportedError(format!(
                    "Coupling {pair:?} does not connect exactly two qubits"
                ))
                .into()),
            })
            .collect::<IqmResult<_>>()?,
    };

    let mut edges = Vec::with_capacity(couplings.len());
    for (a, b) in &couplings {
        let (a, b) = (parse_node_name(a)?, parse_node_name(b)?);
        if !nodes.contains(&a) || !nodes.contains(&b) {
            return Err(IqmError::InvalidArchitecture(
                "Architecture contains qubits not in device".into(),
            ));
        }
        edges.push((a, b));
    }

    Ok(Device {
        architecture: Architecture::new(nodes, edges),
        gate_set,
    })
}

/// Convert the readouts of one circuit to a result.
fn to_result(handle: &ResultHandle, measurements: &CircuitMeasurements) -> HalResult<BackendResult> {
    let columns = handle
        .keys
        .iter()
        .map(|(_, key)| {
            let readouts = measurements.get(key).ok_or_else(|| {
                IqmError::UnexpectedResponse(format!("No readouts for measurement key '{key}'"))
            })?;
            readouts
                .iter()
                .map(|r| {
                    r.first().copied().ok_or_else(|| {
                        IqmError::UnexpectedResponse(format!("Empty readout for key '{key}'"))
                    })
                })
                .collect::<IqmResult<Vec<u8>>>()
        })
        .collect::<IqmResult<Vec<_>>>()?;

    let result = BackendResult::from_columns(handle.bits(), columns)?;
    Ok(match &handle.postprocessing {
        Some(pp) => result.postprocessed(pp),
        None => result,
    })
}

/// IQM quantum computer backend.
///
/// Connects to one IQM device through the IQM Server REST API. The device's
/// qubits, couplings and native operations are fetched once, at
/// construction.
pub struct IqmBackend {
    /// API client.
    client: IqmClient,
    /// Static device description.
    info: BackendInfo,
    /// Cached job information.
    jobs: Arc<Mutex<FxHashMap<Uuid, CachedJob>>>,
}

impl std::fmt::Debug for IqmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IqmBackend")
            .field("client", &self.client)
            .field("device", &self.info.device_name)
            .finish_non_exhaustive()
    }
}

impl IqmBackend {
    /// Connect to `device`.
    ///
    /// Resolves credentials, fetches the device's quantum architecture and
    /// checks that this backend can drive it.
    #[instrument(skip(options))]
    pub async fn new(device: &str, options: IqmBackendOptions) -> IqmResult<Self> {
        let config = match options.api_token.as_deref() {
            Some(token) if !token.trim().is_empty() => IqmConfig::default(),
            _ => IqmConfig::from_default_config_file()?,
        };
        let credentials = resolve_credentials(options.api_token.as_deref(), &config)?;

        let url = options
            .url
            .clone()
            .unwrap_or_else(|| format!("{DEFAULT_URL_BASE}/{device}"));
        let client = IqmClient::new(url, credentials.token)?;

        let qa = client.get_quantum_architecture().await?;
        let device_desc = describe_device(&qa, options.arch.as_deref())?;
        info!(
            "Connected to IQM device {}: {} qubits, {} couplings",
            qa.name,
            device_desc.architecture.num_nodes(),
            device_desc.architecture.edges().len()
        );

        let info = BackendInfo::new(
            BACKEND_NAME,
            qa.name.clone(),
            device_desc.architecture,
            device_desc.gate_set,
        )
        .with_contextual_optimisation(true);

        Ok(Self {
            client,
            info,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        })
    }

    /// The device's connectivity.
    pub fn architecture(&self) -> &Architecture {
        &self.info.architecture
    }

    /// Metadata of a submitted job: the request as the server received it
    /// and the calibration set used.
    #[instrument(skip(self, handle), fields(job = %handle.id))]
    pub async fn get_metadata(&self, handle: &ResultHandle) -> HalResult<Metadata> {
        {
            let jobs = self.jobs.lock().await;
            if let Some(metadata) = jobs.get(&handle.id).and_then(|c| c.metadata.clone()) {
                return Ok(metadata);
            }
        }

        let response = self.client.get_job(handle.id).await?;
        let metadata = response.metadata.ok_or_else(|| {
            HalError::Backend(format!("Job {} has no metadata", handle.id))
        })?;

        let mut jobs = self.jobs.lock().await;
        if let Some(cached) = jobs.get_mut(&handle.id) {
            cached.metadata = Some(metadata.clone());
        }
        Ok(metadata)
    }

    async fn cache_job(&self, job: Job) {
        let mut jobs = self.jobs.lock().await;
        if jobs.len() >= MAX_CACHED_JOBS {
            jobs.retain(|_, j| !j.job.status.is_terminal());
            if jobs.len() >= MAX_CACHED_JOBS {
                warn!(
                    capacity = MAX_CACHED_JOBS,
                    "IQM job cache at capacity with no terminal entries; evicting an active entry"
                );
                if let Some(key) = jobs.keys().next().copied() {
                    jobs.remove(&key);
                }
            }
        }
        jobs.insert(
            job.handle.id,
            CachedJob {
                job,
                result: None,
                metadata: None,
            },
        );
    }

    async fn submit(
        &self,
        index: usize,
        circuit: &Circuit,
        shots: u32,
        postprocess: bool,
    ) -> HalResult<ResultHandle> {
        let (stripped, postprocessing) = if postprocess {
            prepare_circuit(circuit)?
        } else {
            (circuit.clone(), PostProcessing::new())
        };

        let name = if circuit.name().is_empty() {
            format!("circuit_{index}")
        } else {
            circuit.name().to_string()
        };
        let request = RunRequest {
            circuits: vec![IqmCircuit {
                name,
                instructions: translate_circuit(&stripped)?,
            }],
            qubit_mapping: Some(qubit_mapping(circuit)?),
            shots,
            calibration_set_id: None,
        };

        let id = self.client.submit_job(&request).await?;
        info!("Job submitted: {} ({} shots)", id, shots);

        let handle =
            ResultHandle::new(id, measurement_keys(&stripped)).with_postprocessing(postprocessing);
        self.cache_job(Job::new(handle.clone(), shots)).await;
        Ok(handle)
    }
}

#[async_trait]
impl Backend for IqmBackend {
    fn backend_info(&self) -> &BackendInfo {
        &self.info
    }

    fn required_predicates(&self) -> Vec<Box<dyn Predicate>> {
        iqm_required_predicates(&self.info.architecture)
    }

    fn rebase_pass(&self) -> Box<dyn Pass> {
        Box::new(IqmRebase)
    }

    fn default_compilation_pass(&self, optimisation_level: u8) -> HalResult<PassManager> {
        Ok(PassManagerBuilder::new()
            .with_optimisation_level(optimisation_level)
            .with_architecture(self.info.architecture.clone())
            .build()?)
    }

    #[instrument(skip(self, circuits, n_shots), fields(circuits = circuits.len()))]
    async fn process_circuits(
        &self,
        circuits: &[Circuit],
        n_shots: Option<Shots>,
        options: ProcessOptions,
    ) -> HalResult<Vec<ResultHandle>> {
        let shots = Shots::resolve(n_shots, circuits.len())?;
        if options.valid_check {
            self.check_circuits(circuits)?;
        }

        let mut handles = Vec::with_capacity(circuits.len());
        for (i, (circuit, shots)) in circuits.iter().zip(shots).enumerate() {
            handles.push(self.submit(i, circuit, shots, options.postprocess).await?);
        }
        Ok(handles)
    }

    #[instrument(skip(self, handle), fields(job = %handle.id))]
    async fn circuit_status(&self, handle: &ResultHandle) -> HalResult<CircuitStatus> {
        let response = self.client.get_job(handle.id).await.map_err(|e| match e {
            IqmError::JobNotFound(_) => HalError::JobNotFound(handle.id.to_string()),
            other => other.into(),
        })?;

        let mut result = None;
        let status = match response.status.as_str() {
            "pending" | "pending compilation" | "received" | "validation started"
            | "validation ended" | "fetch calibration started" | "fetch calibration ended"
            | "compilation started" | "compilation ended" => CircuitStatus::Submitted,
            "pending execution" | "accepted" | "waiting" => CircuitStatus::Queued,
            "execution started" | "execution ended" | "post-processing pending"
            | "post-processing started" | "post-processing ended" => CircuitStatus::Running,
            "ready" | "completed" => {
                let measurements = response
                    .measurements
                    .as_ref()
                    .and_then(|m| m.first())
                    .ok_or_else(|| {
                        IqmError::UnexpectedResponse(format!(
                            "Job {} is ready but has no measurements",
                            handle.id
                        ))
                    })?;
                result = Some(to_result(handle, measurements)?);
                CircuitStatus::Completed
            }
            "failed" => CircuitStatus::Error(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Job failed".to_string()),
            ),
            "aborted" | "cancelled" => CircuitStatus::Cancelled,
            other => {
                warn!("Unknown IQM job status '{}'", other);
                CircuitStatus::Running
            }
        };
        for warning in response.warnings.iter().flatten() {
            warn!("IQM job {}: {}", handle.id, warning);
        }
        debug!("Job {} status: {}", handle.id, status);

        let mut jobs = self.jobs.lock().await;
        if !jobs.contains_key(&handle.id) {
            drop(jobs);
            self.cache_job(Job::new(handle.clone(), 0)).await;
            jobs = self.jobs.lock().await;
        }
        if let Some(cached) = jobs.get_mut(&handle.id) {
            cached.job.set_status(status.clone());
            if let Some(result) = result {
                cached.result = Some(result);
            }
            if let Some(metadata) = response.metadata {
                cached.metadata = Some(metadata);
            }
        }

        Ok(status)
    }

    #[instrument(skip(self, handle), fields(job = %handle.id))]
    async fn cancel(&self, handle: &ResultHandle) -> HalResult<()> {
        self.client.abort_job(handle.id).await?;
        info!("Job aborted: {}", handle.id);

        let mut jobs = self.jobs.lock().await;
        if let Some(cached) = jobs.get_mut(&handle.id) {
            cached.job.set_status(CircuitStatus::Cancelled);
        }
        Ok(())
    }

    async fn cached_result(&self, handle: &ResultHandle) -> Option<BackendResult> {
        let jobs = self.jobs.lock().await;
        jobs.get(&handle.id).and_then(|c| c.result.clone())
    }

    async fn pop_result(&self, handle: &ResultHandle) -> Option<BackendResult> {
        let mut jobs = self.jobs.lock().await;
        jobs.remove(&handle.id).and_then(|c| c.result)
    }
}
