//! IQM Server REST API client.
//!
//! This module implements the subset of the IQM Server API needed to
//! describe a device, submit circuits and collect their measurements.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{IqmError, IqmResult};

/// IQM Server API client.
#[derive(Clone)]
pub struct IqmClient {
    /// HTTP client.
    client: Client,
    /// Device base URL.
    base_url: String,
    /// Bearer token.
    token: String,
}

impl std::fmt::Debug for IqmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IqmClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl IqmClient {
    /// Create a new client for the device at `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> IqmResult<Self> {
        let base_url = base_url.into();
        let token = token.into();

        if base_url.trim().is_empty() {
            return Err(IqmError::Config("Empty IQM server URL".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(IqmError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// The device base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the device's qubits, couplings and native operations.
    #[instrument(skip(self))]
    pub async fn get_quantum_architecture(&self) -> IqmResult<QuantumArchitecture> {
        let url = format!("{}/api/v1/quantum-architecture", self.base_url);
        debug!("Getting quantum architecture from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let body: QuantumArchitectureResponse = self.handle_response(response).await?;
        Ok(body.quantum_architecture)
    }

    /// Submit circuits as one job.
    #[instrument(skip(self, request), fields(circuits = request.circuits.len(), shots = request.shots))]
    pub async fn submit_job(&self, request: &RunRequest) -> IqmResult<Uuid> {
        let url = format!("{}/api/v1/jobs", self.base_url);
        debug!("Submitting job to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let body: SubmitResponse = self.handle_response(response).await?;
        Ok(body.id)
    }

    /// Get the state of a job, with measurements once it is ready.
    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: Uuid) -> IqmResult<JobResponse> {
        let url = format!("{}/api/v1/jobs/{}", self.base_url, job_id);
        debug!("Getting job from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Abort a job.
    #[instrument(skip(self))]
    pub async fn abort_job(&self, job_id: Uuid) -> IqmResult<()> {
        let url = format!("{}/api/v1/jobs/{}/abort", self.base_url, job_id);
        debug!("Aborting job at {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_for(response).await)
        }
    }

    /// Handle HTTP response, extracting JSON or returning error.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> IqmResult<T> {
        if response.status().is_success() {
            let body = response.json().await?;
            Ok(body)
        } else {
            Err(error_for(response).await)
        }
    }
}

async fn error_for(response: reqwest::Response) -> IqmError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => IqmError::AuthFailed(message),
        StatusCode::NOT_FOUND => IqmError::JobNotFound(message),
        _ => IqmError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct QuantumArchitectureResponse {
    quantum_architecture: QuantumArchitecture,
}

/// Device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumArchitecture {
    /// Device name.
    pub name: String,
    /// Native operations.
    pub operations: Operations,
    /// Qubit names, `QB1` to `QBn`.
    pub qubits: Vec<String>,
    /// Coupled qubit pairs.
    pub qubit_connectivity: Vec<Vec<String>>,
}

/// Native operations, either as a plain list of names or as a map from
/// name to the loci it acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operations {
    /// Operation names.
    Names(Vec<String>),
    /// Operation name to loci.
    Loci(BTreeMap<String, Value>),
}

impl Operations {
    /// Operation names, in listing order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Operations::Names(names) => names.iter().map(String::as_str).collect(),
            Operations::Loci(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// One native instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Operation name.
    pub name: String,
    /// Logical qubit names.
    pub qubits: Vec<String>,
    /// Operation arguments.
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// A named circuit in IQM form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IqmCircuit {
    /// Circuit name.
    pub name: String,
    /// Instructions in execution order.
    pub instructions: Vec<Instruction>,
}

/// Mapping of one logical qubit name to a device qubit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleQubitMapping {
    /// Name used in the instructions.
    pub logical_name: String,
    /// Device qubit name.
    pub physical_name: String,
}

/// Job submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Circuits to execute.
    pub circuits: Vec<IqmCircuit>,
    /// Logical-to-physical qubit mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qubit_mapping: Option<Vec<SingleQubitMapping>>,
    /// Number of shots.
    pub shots: u32,
    /// Calibration set to use; the server default when absent.
    #[serde(default)]
    pub calibration_set_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Uuid,
}

/// Readouts of one circuit: measurement key to per-shot values.
pub type CircuitMeasurements = BTreeMap<String, Vec<Vec<u8>>>;

/// Job state as returned by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    /// Status string, e.g. `pending execution` or `ready`.
    pub status: String,
    /// Readouts, one map per submitted circuit.
    #[serde(default)]
    pub measurements: Option<Vec<CircuitMeasurements>>,
    /// Error message when the job failed.
    #[serde(default)]
    pub message: Option<String>,
    /// Execution metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Server warnings.
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

/// Metadata of a job: the request as received and the calibration used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Calibration set the job ran with.
    #[serde(default)]
    pub calibration_set_id: Option<Uuid>,
    /// The submitted request.
    pub request: RunRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_empty_url() {
        assert!(matches!(IqmClient::new("", "t"), Err(IqmError::Config(_))));
    }

    #[test]
    fn test_client_debug_redacts_token() {
        let client = IqmClient::new("https://example.com/dev/", "secret").unwrap();
        assert_eq!(client.base_url(), "https://example.com/dev");
        assert!(!format!("{client:?}").contains("secret"));
    }

    #[test]
    fn test_operations_forms() {
        let list: Operations = serde_json::from_str(r#"["prx", "cz"]"#).unwrap();
        assert_eq!(list.names(), ["prx", "cz"]);
        let map: Operations =
            serde_json::from_str(r#"{"cz": [["QB1", "QB2"]], "measure": [["QB1"]]}"#).unwrap();
        assert_eq!(map.names(), ["cz", "measure"]);
    }

    #[test]
    fn test_run_request_json() {
        let request = RunRequest {
            circuits: vec![IqmCircuit {
                name: "c".into(),
                instructions: vec![],
            }],
            qubit_mapping: Some(vec![SingleQubitMapping {
                logical_name: "node[0]".into(),
                physical_name: "QB1".into(),
            }]),
            shots: 10,
            calibration_set_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["shots"], 10);
        assert_eq!(json["qubit_mapping"][0]["physical_name"], "QB1");
        assert!(json["calibration_set_id"].is_null());
    }

    #[test]
    fn test_job_response_minimal() {
        let job: JobResponse = serde_json::from_str(r#"{"status": "pending execution"}"#).unwrap();
        assert_eq!(job.status, "pending execution");
        assert!(job.measurements.is_none());
    }
}
