//! Backend lifecycle against a mocked IQM server.

use std::f64::consts::PI;

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};

use iqmtk_adapter_iqm::translate::qubit_mapping;
use iqmtk_adapter_iqm::{
    Backend, IqmBackend, IqmBackendOptions, IqmError, ProcessOptions, Shots,
};
use iqmtk_hal::{CircuitStatus, HalError, ResultHandle};
use iqmtk_ir::{Circuit, CircuitDag, Clbit, ClbitId, Qubit, QubitId};

const JOB_ID: &str = "7e9c1e4a-3d52-4e8a-9c55-2b6d4c1f0a11";
const CALIBRATION_ID: &str = "0c5d2b4e-8b9f-4d7a-a1e3-6f2c9b8d7e10";

fn architecture(operations: Value) -> Value {
    json!({
        "quantum_architecture": {
            "name": "Adonis",
            "operations": operations,
            "qubits": ["QB1", "QB2", "QB3", "QB4", "QB5"],
            "qubit_connectivity": [["QB1", "QB3"], ["QB2", "QB3"], ["QB4", "QB3"], ["QB5", "QB3"]],
        }
    })
}

async fn mock_architecture(server: &mut ServerGuard, operations: Value) -> Mock {
    server
        .mock("GET", "/api/v1/quantum-architecture")
        .match_header("authorization", "Bearer token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(architecture(operations).to_string())
        .create_async()
        .await
}

async fn mock_job(server: &mut ServerGuard, body: Value) -> Mock {
    server
        .mock("GET", format!("/api/v1/jobs/{JOB_ID}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

fn options(server: &ServerGuard) -> IqmBackendOptions {
    IqmBackendOptions::new()
        .with_api_token("token")
        .with_url(server.url())
}

async fn connect(server: &mut ServerGuard) -> IqmBackend {
    mock_architecture(server, json!(["phased_rx", "cz", "measurement", "barrier"])).await;
    IqmBackend::new("adonis", options(server)).await.unwrap()
}

/// A circuit already expressed on device nodes 0 and 2.
fn placed_circuit() -> Circuit {
    let qubits = [Qubit::node(QubitId(0), 0), Qubit::node(QubitId(1), 2)];
    let clbits = [
        Clbit::default_register(ClbitId(0)),
        Clbit::default_register(ClbitId(1)),
    ];
    let mut c = Circuit::from_dag("placed", CircuitDag::with_bits(qubits, clbits));
    c.prx(PI / 2.0, 0.0, QubitId(0))
        .unwrap()
        .cz(QubitId(0), QubitId(1))
        .unwrap()
        .prx(PI, 0.0, QubitId(1))
        .unwrap()
        .measure(QubitId(0), ClbitId(0))
        .unwrap()
        .measure(QubitId(1), ClbitId(1))
        .unwrap();
    c
}

fn ready(n_shots: usize, readout: [u8; 2]) -> Value {
    json!({
        "status": "ready",
        "measurements": [{
            "c[0]": vec![[readout[0]]; n_shots],
            "c[1]": vec![[readout[1]]; n_shots],
        }],
        "metadata": {
            "calibration_set_id": CALIBRATION_ID,
            "request": {
                "circuits": [{"name": "placed", "instructions": []}],
                "qubit_mapping": [
                    {"logical_name": "node[0]", "physical_name": "QB1"},
                    {"logical_name": "node[2]", "physical_name": "QB3"},
                ],
                "shots": n_shots,
                "calibration_set_id": null,
            },
        },
    })
}

#[tokio::test]
async fn test_backend_info() {
    let mut server = Server::new_async().await;
    let arch = mock_architecture(&mut server, json!(["phased_rx", "cz", "measurement", "barrier"])).await;

    let backend = IqmBackend::new("adonis", options(&server)).await.unwrap();
    arch.assert_async().await;

    let info = backend.backend_info();
    assert_eq!(info.name, "IQMBackend");
    assert_eq!(info.device_name, "Adonis");
    assert_eq!(info.num_qubits, 5);
    assert!(info.gate_set.len() >= 3);
    for op in ["prx", "cz", "measure"] {
        assert!(info.supports(op), "missing {op}");
    }
    assert!(info.supports_shots && info.supports_counts);
    assert!(info.supports_contextual_optimisation);
    assert!(info.persistent_handles);

    // QB3 is the hub.
    assert!(backend.architecture().is_connected(0, 2));
    assert!(!backend.architecture().is_connected(0, 1));
}

#[tokio::test]
async fn test_operation_loci_form() {
    let mut server = Server::new_async().await;
    mock_architecture(
        &mut server,
        json!({"prx": [["QB1"]], "cz": [["QB1", "QB3"]], "measure": [["QB1"]]}),
    )
    .await;

    let backend = IqmBackend::new("adonis", options(&server)).await.unwrap();
    assert!(backend.backend_info().supports("measure"));
    assert!(!backend.backend_info().supports("barrier"));
}

#[tokio::test]
async fn test_move_device_unsupported() {
    let mut server = Server::new_async().await;
    mock_architecture(&mut server, json!(["prx", "cz", "measure", "move"])).await;

    let err = IqmBackend::new("deneb", options(&server)).await.unwrap_err();
    assert!(matches!(err, IqmError::DeviceUnsupported(_)));
}

#[tokio::test]
async fn test_explicit_arch() {
    let mut server = Server::new_async().await;
    mock_architecture(&mut server, json!(["prx", "cz", "measure"])).await;

    let backend = IqmBackend::new("adonis", options(&server).with_arch([("QB1", "QB3")]))
        .await
        .unwrap();
    assert_eq!(backend.architecture().edges(), &[(0, 2)]);

    let err = IqmBackend::new("adonis", options(&server).with_arch([("QB1", "QB7")]))
        .await
        .unwrap_err();
    assert!(matches!(err, IqmError::InvalidArchitecture(_)));
    assert!(err.to_string().contains("Architecture contains qubits not in device"));
}

#[tokio::test]
async fn test_invalid_credentials() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v1/quantum-architecture")
        .with_status(401)
        .with_body("invalid token")
        .create_async()
        .await;

    let err = IqmBackend::new("adonis", options(&server)).await.unwrap_err();
    assert!(matches!(err, IqmError::AuthFailed(_)));
    assert!(matches!(HalError::from(err), HalError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_missing_shots() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;

    let err = backend
        .process_circuits(&[placed_circuit()], None, ProcessOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Parameter n_shots is required"));
}

#[tokio::test]
async fn test_uncompiled_rejected() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;
    let submit = server
        .mock("POST", "/api/v1/jobs")
        .expect(0)
        .create_async()
        .await;

    let err = backend
        .process_circuit(&Circuit::bell().unwrap(), 10, ProcessOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidCircuit(_)));
    submit.assert_async().await;
}

#[tokio::test]
async fn test_submit_and_collect() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;

    let mut circuit = backend
        .get_compiled_circuit(&Circuit::ghz(3).unwrap(), 2)
        .unwrap();
    circuit.set_name("test_circuit");
    assert!(backend.valid_circuit(&circuit));
    let mapping = serde_json::to_value(qubit_mapping(&circuit).unwrap()).unwrap();

    let submit = server
        .mock("POST", "/api/v1/jobs")
        .match_header("authorization", "Bearer token")
        .match_body(Matcher::PartialJson(json!({
            "circuits": [{"name": "test_circuit"}],
            "qubit_mapping": mapping,
            "shots": 10,
            "calibration_set_id": null,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": JOB_ID}).to_string())
        .create_async()
        .await;

    let handle = backend
        .process_circuit(&circuit, 10, ProcessOptions::new())
        .await
        .unwrap();
    submit.assert_async().await;
    assert_eq!(handle.id.to_string(), JOB_ID);
    assert_eq!(handle.keys.len(), 3);

    let pending = mock_job(&mut server, json!({"status": "pending execution"})).await;
    assert_eq!(
        backend.circuit_status(&handle).await.unwrap(),
        CircuitStatus::Queued
    );
    assert!(backend.cached_result(&handle).await.is_none());
    pending.remove_async().await;

    let mut body = ready(10, [1, 0]);
    body["measurements"][0]["c[2]"] = json!(vec![[1]; 10]);
    mock_job(&mut server, body).await;

    assert_eq!(
        backend.circuit_status(&handle).await.unwrap(),
        CircuitStatus::Completed
    );
    let result = backend.get_result(&handle, None).await.unwrap();
    assert_eq!(result.n_shots(), 10);
    assert!(result.get_shots().iter().all(|s| s == &[1, 0, 1]));
    assert_eq!(result.get_counts().total_shots(), 10);

    let metadata = backend.get_metadata(&handle).await.unwrap();
    assert_eq!(metadata.calibration_set_id.unwrap().to_string(), CALIBRATION_ID);
    assert_eq!(metadata.request.circuits.len(), 1);
    assert_eq!(metadata.request.shots, 10);
    assert!(metadata.request.calibration_set_id.is_none());

    assert!(backend.pop_result(&handle).await.is_some());
    assert!(backend.pop_result(&handle).await.is_none());
}

#[tokio::test]
async fn test_default_circuit_name() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;

    let mut unnamed = placed_circuit();
    unnamed.set_name("");
    let submit = server
        .mock("POST", "/api/v1/jobs")
        .match_body(Matcher::PartialJson(json!({
            "circuits": [{"name": "circuit_1"}],
            "shots": 5,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": JOB_ID}).to_string())
        .expect(1)
        .create_async()
        .await;
    let named = server
        .mock("POST", "/api/v1/jobs")
        .match_body(Matcher::PartialJson(json!({
            "circuits": [{"name": "placed"}],
            "shots": 3,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": JOB_ID}).to_string())
        .expect(1)
        .create_async()
        .await;

    let handles = backend
        .process_circuits(
            &[placed_circuit(), unnamed],
            Some(Shots::from(vec![3, 5])),
            ProcessOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(handles.len(), 2);
    submit.assert_async().await;
    named.assert_async().await;
}

#[tokio::test]
async fn test_failed_job() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;
    let handle = ResultHandle::new(
        JOB_ID.parse().unwrap(),
        vec![(ClbitId(0), "c[0]".into())],
    );

    mock_job(&mut server, json!({"status": "failed", "message": "calibration expired"})).await;

    let status = backend.circuit_status(&handle).await.unwrap();
    assert_eq!(status, CircuitStatus::Error("calibration expired".into()));
    let err = backend.get_result(&handle, None).await.unwrap_err();
    assert!(matches!(err, HalError::JobFailed(msg) if msg == "calibration expired"));
}

#[tokio::test]
async fn test_cancel() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;
    let handle = ResultHandle::new(JOB_ID.parse().unwrap(), vec![]);

    let abort = server
        .mock("POST", format!("/api/v1/jobs/{JOB_ID}/abort").as_str())
        .with_status(200)
        .create_async()
        .await;
    backend.cancel(&handle).await.unwrap();
    abort.assert_async().await;

    mock_job(&mut server, json!({"status": "aborted"})).await;
    let err = backend.get_result(&handle, None).await.unwrap_err();
    assert!(matches!(err, HalError::JobCancelled));
}

#[tokio::test]
async fn test_unknown_job() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;
    let handle = ResultHandle::new(JOB_ID.parse().unwrap(), vec![]);

    server
        .mock("GET", format!("/api/v1/jobs/{JOB_ID}").as_str())
        .with_status(404)
        .create_async()
        .await;
    let err = backend.circuit_status(&handle).await.unwrap_err();
    assert!(matches!(err, HalError::JobNotFound(id) if id == JOB_ID));
}

#[tokio::test]
async fn test_postprocess() {
    let mut server = Server::new_async().await;
    let backend = connect(&mut server).await;

    // The final PRX(π) becomes a bit flip and the CZ before the
    // measurements is dropped.
    let submit = server
        .mock("POST", "/api/v1/jobs")
        .match_body(Matcher::PartialJson(json!({
            "circuits": [{
                "instructions": [
                    {"name": "prx", "qubits": ["node[0]"]},
                    {"name": "measure", "qubits": ["node[0]"]},
                    {"name": "measure", "qubits": ["node[2]"]},
                ],
            }],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": JOB_ID}).to_string())
        .create_async()
        .await;

    let handle = backend
        .process_circuit(
            &placed_circuit(),
            10,
            ProcessOptions::new().with_postprocess(true),
        )
        .await
        .unwrap();
    submit.assert_async().await;
    assert!(handle.postprocessing.is_some());

    mock_job(&mut server, ready(10, [0, 0])).await;
    let result = backend.get_result(&handle, None).await.unwrap();
    assert_eq!(result.n_shots(), 10);
    assert!(result.get_shots().iter().all(|s| s == &[0, 1]));
}

#[tokio::test]
async fn test_persistent_handle() {
    let mut server = Server::new_async().await;
    let first = connect(&mut server).await;

    server
        .mock("POST", "/api/v1/jobs")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": JOB_ID}).to_string())
        .create_async()
        .await;
    let handle = first
        .process_circuit(&placed_circuit(), 4, ProcessOptions::new())
        .await
        .unwrap();
    let stored = handle.to_string();
    drop(first);

    // A fresh backend knows nothing about the job but the handle.
    let second = connect(&mut server).await;
    let restored: ResultHandle = stored.parse().unwrap();
    assert_eq!(restored, handle);

    mock_job(&mut server, ready(4, [1, 1])).await;
    let result = second.get_result(&restored, None).await.unwrap();
    assert_eq!(result.get_shots(), vec![vec![1, 1]; 4].as_slice());
}
