//! iqmtk Hardware Abstraction Layer
//!
//! This crate defines the interface between compiled circuits and the
//! services that execute them.
//!
//! # Overview
//!
//! The HAL provides:
//! - A common [`Backend`] trait covering compilation, submission, status
//!   polling and result retrieval
//! - [`BackendInfo`] to describe a device's connectivity and native gates
//! - [`ResultHandle`], a serialisable reference to a submitted circuit
//! - Unified result handling via [`BackendResult`] and [`Counts`]
//!
//! # Example: Running a Circuit
//!
//! ```ignore
//! use iqmtk_hal::{Backend, ProcessOptions};
//! use iqmtk_adapter_iqm::{IqmBackend, IqmBackendOptions};
//! use iqmtk_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = IqmBackend::new("garnet", IqmBackendOptions::default()).await?;
//!
//!     let compiled = backend.get_compiled_circuit(&Circuit::bell()?, 2)?;
//!     let handle = backend
//!         .process_circuit(&compiled, 1000, ProcessOptions::default())
//!         .await?;
//!     println!("Submitted: {handle}");
//!
//!     let result = backend.get_result(&handle, None).await?;
//!     if let Some((outcome, count)) = result.get_counts().most_frequent() {
//!         println!("Most frequent: {outcome:?} ({count} times)");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Persistent Handles
//!
//! A [`ResultHandle`] renders as one line of JSON and parses back with
//! [`str::parse`], so a result can be collected by a different process
//! than the one that submitted the circuit:
//!
//! ```rust
//! use iqmtk_hal::ResultHandle;
//! use iqmtk_ir::ClbitId;
//!
//! let handle = ResultHandle::new(uuid::Uuid::nil(), vec![(ClbitId(0), "c[0]".into())]);
//! let stored = handle.to_string();
//! let restored: ResultHandle = stored.parse().unwrap();
//! assert_eq!(restored, handle);
//! ```

pub mod backend;
pub mod error;
pub mod info;
pub mod job;
pub mod result;

pub use backend::{Backend, DEFAULT_RESULT_TIMEOUT, POLL_INTERVAL, ProcessOptions, Shots};
pub use error::{HalError, HalResult};
pub use info::BackendInfo;
pub use job::{CircuitStatus, Job, ResultHandle};
pub use result::{BackendResult, Counts, bitstring};
