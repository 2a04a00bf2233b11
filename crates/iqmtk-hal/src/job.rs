//! Result handles and job lifecycle types.
//!
//! The circuit state machine:
//!
//! ```text
//!   process_circuits() ──→ Submitted ──→ Queued ──→ Running ──→ Completed
//!                             │            │           │
//!                             │            │           ├──→ Error(message)
//!                             │            │           │
//!                             └────────────┴───────────┴──→ Cancelled
//! ```
//!
//! Terminal states (`Completed`, `Error`, `Cancelled`) are permanent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use iqmtk_compile::PostProcessing;
use iqmtk_ir::ClbitId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HalError;

/// Reference to one submitted circuit.
///
/// A handle carries everything needed to turn the raw job output back into
/// a [`BackendResult`](crate::BackendResult): the job id, the measurement
/// keys in bit order and any classical post-processing stripped from the
/// circuit before submission. Handles serialise to a single JSON line, so
/// they can be stored and used from another process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultHandle {
    /// Remote job id.
    pub id: Uuid,
    /// Measurement key for each readout bit, in bit order.
    pub keys: Vec<(ClbitId, String)>,
    /// Classical operations to apply to every shot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postprocessing: Option<PostProcessing>,
}

impl ResultHandle {
    /// Create a handle without post-processing.
    pub fn new(id: Uuid, keys: Vec<(ClbitId, String)>) -> Self {
        Self {
            id,
            keys,
            postprocessing: None,
        }
    }

    /// Attach post-processing. An empty record is dropped.
    #[must_use]
    pub fn with_postprocessing(mut self, postprocessing: PostProcessing) -> Self {
        self.postprocessing = (!postprocessing.is_empty()).then_some(postprocessing);
        self
    }

    /// Readout bits in result column order.
    pub fn bits(&self) -> Vec<ClbitId> {
        self.keys.iter().map(|(bit, _)| *bit).collect()
    }
}

impl fmt::Display for ResultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl FromStr for ResultHandle {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s.trim()).map_err(|e| HalError::InvalidHandle(e.to_string()))
    }
}

/// Status of a submitted circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitStatus {
    /// Accepted by the service, not yet compiled for the device.
    Submitted,
    /// Waiting for the device.
    Queued,
    /// Currently executing.
    Running,
    /// Finished; the result is available.
    Completed,
    /// Failed with a message from the service.
    Error(String),
    /// Aborted before completion.
    Cancelled,
}

impl CircuitStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CircuitStatus::Completed | CircuitStatus::Error(_) | CircuitStatus::Cancelled
        )
    }

    /// Check if the circuit is still waiting or running.
    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    /// Check if the circuit completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, CircuitStatus::Completed)
    }
}

impl fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitStatus::Submitted => write!(f, "Submitted"),
            CircuitStatus::Queued => write!(f, "Queued"),
            CircuitStatus::Running => write!(f, "Running"),
            CircuitStatus::Completed => write!(f, "Completed"),
            CircuitStatus::Error(msg) => write!(f, "Error: {msg}"),
            CircuitStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Bookkeeping record for a submitted circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// The circuit's handle.
    pub handle: ResultHandle,
    /// Last observed status.
    pub status: CircuitStatus,
    /// Number of shots requested.
    pub shots: u32,
    /// Time the job was submitted.
    pub created_at: DateTime<Utc>,
    /// Time a terminal status was first observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new job record.
    pub fn new(handle: ResultHandle, shots: u32) -> Self {
        Self {
            handle,
            status: CircuitStatus::Submitted,
            shots,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Update the status.
    pub fn set_status(&mut self, status: CircuitStatus) {
        if status.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqmtk_compile::ClassicalOp;

    fn handle() -> ResultHandle {
        ResultHandle::new(
            Uuid::new_v4(),
            vec![(ClbitId(0), "c[0]".into()), (ClbitId(1), "c[1]".into())],
        )
    }

    #[test]
    fn test_handle_round_trips_through_string() {
        let h = handle().with_postprocessing(PostProcessing::from_ops(vec![ClassicalOp::Flip {
            bit: ClbitId(1),
        }]));
        let text = h.to_string();
        assert!(!text.contains('\n'));
        let parsed: ResultHandle = text.parse().unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn test_empty_postprocessing_dropped() {
        let h = handle().with_postprocessing(PostProcessing::new());
        assert!(h.postprocessing.is_none());
        assert!(!h.to_string().contains("postprocessing"));
    }

    #[test]
    fn test_malformed_handle() {
        let err = "not a handle".parse::<ResultHandle>().unwrap_err();
        assert!(matches!(err, HalError::InvalidHandle(_)));
    }

    #[test]
    fn test_status_classification() {
        assert!(CircuitStatus::Completed.is_terminal());
        assert!(CircuitStatus::Error("x".into()).is_terminal());
        assert!(CircuitStatus::Cancelled.is_terminal());
        assert!(CircuitStatus::Submitted.is_pending());
        assert!(CircuitStatus::Queued.is_pending());
        assert!(!CircuitStatus::Running.is_success());
        assert_eq!(CircuitStatus::Error("boom".into()).to_string(), "Error: boom");
    }

    #[test]
    fn test_job_records_finish_time() {
        let mut job = Job::new(handle(), 100);
        job.set_status(CircuitStatus::Queued);
        assert!(job.finished_at.is_none());
        job.set_status(CircuitStatus::Completed);
        let finished = job.finished_at;
        assert!(finished.is_some());
        job.set_status(CircuitStatus::Completed);
        assert_eq!(job.finished_at, finished);
    }
}
