//! Tests against a live IQM device.
//!
//! Run with `PYTKET_RUN_REMOTE_TESTS=1` and an API token in
//! `PYTKET_REMOTE_IQM_API_TOKEN`:
//!
//! ```text
//! cargo test -p iqmtk-adapter-iqm --test remote -- --ignored
//! ```

use std::time::Duration;

use iqmtk_adapter_iqm::{Backend, IqmBackend, IqmBackendOptions, IqmError, ProcessOptions};
use iqmtk_hal::CircuitStatus;
use iqmtk_ir::{Circuit, QubitId};

const DEVICE: &str = "pyrite:test";

fn remote_enabled() -> bool {
    std::env::var("PYTKET_RUN_REMOTE_TESTS").is_ok_and(|v| !v.is_empty())
}

async fn backend() -> IqmBackend {
    let token = std::env::var("PYTKET_REMOTE_IQM_API_TOKEN")
        .expect("PYTKET_REMOTE_IQM_API_TOKEN must be set");
    IqmBackend::new(DEVICE, IqmBackendOptions::new().with_api_token(token))
        .await
        .unwrap()
}

fn sample_circuit() -> Circuit {
    let mut c = Circuit::with_size("test_circuit", 4, 4);
    c.h(QubitId(0))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .cx(QubitId(1), QubitId(2))
        .unwrap()
        .x(QubitId(3))
        .unwrap()
        .measure_all()
        .unwrap();
    c
}

#[tokio::test]
#[ignore = "requires IQM credentials"]
async fn test_iqm() {
    if !remote_enabled() {
        return;
    }
    let backend = backend().await;
    let compiled = backend.get_compiled_circuit(&sample_circuit(), 2).unwrap();

    let result = backend
        .run_circuit(&compiled, 10, ProcessOptions::new())
        .await
        .unwrap();
    assert_eq!(result.n_shots(), 10);
    assert_eq!(result.get_counts().total_shots(), 10);
}

#[tokio::test]
#[ignore = "requires IQM credentials"]
async fn test_invalid_cred() {
    if !remote_enabled() {
        return;
    }
    let err = IqmBackend::new(DEVICE, IqmBackendOptions::new().with_api_token("invalid"))
        .await
        .unwrap_err();
    assert!(matches!(err, IqmError::AuthFailed(_)));
}

#[tokio::test]
#[ignore = "requires IQM credentials"]
async fn test_handles() {
    if !remote_enabled() {
        return;
    }
    let backend = backend().await;
    let circuits = backend
        .get_compiled_circuits(&[sample_circuit(), Circuit::bell().unwrap()], 1)
        .unwrap();

    let handles = backend
        .process_circuits(&circuits, Some(5.into()), ProcessOptions::new())
        .await
        .unwrap();
    for handle in &handles {
        let status = backend.circuit_status(handle).await.unwrap();
        assert!(!status.is_terminal() || status == CircuitStatus::Completed);
    }

    let results = backend
        .get_results(&handles, Some(Duration::from_secs(600)))
        .await
        .unwrap();
    for (result, circuit) in results.iter().zip(&circuits) {
        assert_eq!(result.n_shots(), 5);
        assert!(result.get_shots().iter().all(|s| s.len() == circuit.num_clbits()));
    }
    assert_eq!(
        backend.circuit_status(&handles[0]).await.unwrap(),
        CircuitStatus::Completed
    );

    let metadata = backend.get_metadata(&handles[0]).await.unwrap();
    assert!(metadata.calibration_set_id.is_some());
    assert_eq!(metadata.request.circuits.len(), 1);
    assert_eq!(metadata.request.circuits[0].name, "test_circuit");
    assert!(metadata.request.calibration_set_id.is_none());
    assert_eq!(
        metadata.request.qubit_mapping.as_ref().map(Vec::len),
        Some(circuits[0].num_qubits())
    );
    assert_eq!(metadata.request.shots, 5);
}

#[tokio::test]
#[ignore = "requires IQM credentials"]
async fn test_postprocess() {
    if !remote_enabled() {
        return;
    }
    let backend = backend().await;
    let mut c = Circuit::with_size("postprocess", 2, 2);
    c.y(QubitId(0)).unwrap().z(QubitId(1)).unwrap().measure_all().unwrap();
    let compiled = backend.get_compiled_circuit(&c, 2).unwrap();

    let result = backend
        .run_circuit(&compiled, 10, ProcessOptions::new().with_postprocess(true))
        .await
        .unwrap();
    assert_eq!(result.n_shots(), 10);
    assert!(result.get_shots().iter().all(|s| s.len() == 2));
}
