//! Enclave preparation against the in-memory orchestrator.

use std::sync::Arc;

use chaosnet_core::{BuildEvent, ChaosError, ClientDefaults, ConsensusClientType, ExecutionClientType};
use chaosnet_enclave::{EnclaveManager, EnclaveState, LifecycleNotification, PrepareAction};
use chaosnet_testing::fixtures::{fast_enclave_config, init_test_tracing, network_config, three_node_network};
use chaosnet_testing::{InMemoryCluster, InMemoryOrchestrator, OrchestratorCall};

const ENCLAVE: &str = "chaos-devnet";

fn manager(orchestrator: &InMemoryOrchestrator) -> EnclaveManager {
    init_test_tracing();
    EnclaveManager::new(
        fast_enclave_config(ENCLAVE),
        Arc::new(orchestrator.clone()),
        three_node_network(),
        &ClientDefaults::standard(),
    )
    .unwrap()
}

fn create(enclave: &str) -> OrchestratorCall {
    OrchestratorCall::CreateEnclave(enclave.to_string())
}

fn destroy(enclave: &str) -> OrchestratorCall {
    OrchestratorCall::DestroyEnclave(enclave.to_string())
}

fn build(enclave: &str) -> OrchestratorCall {
    OrchestratorCall::BuildNetwork(enclave.to_string())
}

#[tokio::test]
async fn test_missing_enclave_is_created_and_built() {
    let cluster = InMemoryCluster::new();
    let orchestrator = InMemoryOrchestrator::new().with_cluster(cluster.clone());
    let manager = manager(&orchestrator);

    let action = manager.prepare_enclave(false).await.unwrap();

    assert_eq!(action, PrepareAction::Created);
    assert_eq!(orchestrator.mutations(), vec![create(ENCLAVE), build(ENCLAVE)]);
    // 3 nodes with el, cl and vc each
    assert_eq!(cluster.len(), 9);
    assert_eq!(manager.observe_state().await.unwrap(), EnclaveState::ExistsRunningMatch);
}

#[tokio::test]
async fn test_running_devnet_with_declared_shape_is_reused() {
    let orchestrator = InMemoryOrchestrator::new();
    let manager = manager(&orchestrator);
    manager.prepare_enclave(false).await.unwrap();
    orchestrator.clear_calls();

    let action = manager.prepare_enclave(false).await.unwrap();

    assert_eq!(action, PrepareAction::Attached);
    assert!(orchestrator.mutations().is_empty());
}

#[tokio::test]
async fn test_running_devnet_with_other_shape_is_refused() {
    let orchestrator = InMemoryOrchestrator::new().with_enclave(
        ENCLAVE,
        [
            "el-1-geth-teku",
            "cl-1-teku-geth",
            "el-2-reth-lighthouse",
            "cl-2-lighthouse-reth",
            "grafana",
        ],
    );
    let manager = manager(&orchestrator);

    let err = manager.prepare_enclave(false).await.unwrap_err();

    match err {
        ChaosError::ConfigTopologyMismatch { enclave, declared, observed } => {
            assert_eq!(enclave, ENCLAVE);
            assert!(declared.contains("nethermind/prysm"));
            assert!(observed.contains("reth/lighthouse"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(orchestrator.mutations().is_empty());
}

#[tokio::test]
async fn test_same_clients_in_other_order_is_a_mismatch() {
    let swapped = network_config(&[
        (ExecutionClientType::Besu, ConsensusClientType::Lighthouse, 1),
        (ExecutionClientType::Geth, ConsensusClientType::Teku, 1),
        (ExecutionClientType::Nethermind, ConsensusClientType::Prysm, 1),
    ]);
    let orchestrator = InMemoryOrchestrator::new();
    manager(&orchestrator).prepare_enclave(false).await.unwrap();

    let other = EnclaveManager::new(
        fast_enclave_config(ENCLAVE),
        Arc::new(orchestrator.clone()),
        swapped,
        &ClientDefaults::standard(),
    )
    .unwrap();
    assert_eq!(other.observe_state().await.unwrap(), EnclaveState::ExistsRunningMismatch);
}

#[tokio::test]
async fn test_empty_enclave_gets_the_network_built_in_place() {
    let orchestrator = InMemoryOrchestrator::new().with_enclave(ENCLAVE, ["grafana", "prometheus"]);
    let manager = manager(&orchestrator);
    assert_eq!(manager.observe_state().await.unwrap(), EnclaveState::ExistsEmpty);

    let action = manager.prepare_enclave(false).await.unwrap();

    assert_eq!(action, PrepareAction::BuiltInExisting);
    assert_eq!(orchestrator.mutations(), vec![build(ENCLAVE)]);
}

#[tokio::test]
async fn test_restart_destroys_settles_then_rebuilds() {
    let orchestrator = InMemoryOrchestrator::new();
    let manager = manager(&orchestrator);
    manager.prepare_enclave(false).await.unwrap();
    orchestrator.clear_calls();
    let mut notifications = manager.notifications().subscribe();

    let action = manager.prepare_enclave(true).await.unwrap();

    assert_eq!(action, PrepareAction::Restarted);
    assert_eq!(
        orchestrator.mutations(),
        vec![destroy(ENCLAVE), create(ENCLAVE), build(ENCLAVE)]
    );

    let mut seen = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        seen.push(notification);
    }
    let destroyed = seen
        .iter()
        .position(|n| matches!(n, LifecycleNotification::EnclaveDestroyed { .. }))
        .unwrap();
    let settled = seen
        .iter()
        .position(|n| matches!(n, LifecycleNotification::PlatformSettled { .. }))
        .unwrap();
    let created = seen
        .iter()
        .position(|n| matches!(n, LifecycleNotification::EnclaveCreated { .. }))
        .unwrap();
    assert!(destroyed < settled && settled < created);
    assert!(matches!(
        seen.last(),
        Some(LifecycleNotification::NetworkBuilt { nodes: 3, .. })
    ));
}

#[tokio::test]
async fn test_restart_of_missing_enclave_only_creates() {
    let orchestrator = InMemoryOrchestrator::new();
    let action = manager(&orchestrator).prepare_enclave(true).await.unwrap();

    assert_eq!(action, PrepareAction::Created);
    assert!(!orchestrator.mutations().contains(&destroy(ENCLAVE)));
}

#[tokio::test]
async fn test_force_restart_recovers_a_broken_devnet() {
    let orchestrator = InMemoryOrchestrator::new().with_enclave(ENCLAVE, ["el-1-geth-teku"]);
    let manager = manager(&orchestrator);
    // an el without its cl cannot be reconciled
    assert!(matches!(
        manager.observe_state().await.unwrap_err(),
        ChaosError::TopologyInconsistent { .. }
    ));

    manager.force_restart_devnet().await.unwrap();

    assert_eq!(
        orchestrator.mutations(),
        vec![destroy(ENCLAVE), create(ENCLAVE), build(ENCLAVE)]
    );
    assert_eq!(manager.observe_state().await.unwrap(), EnclaveState::ExistsRunningMatch);
}

#[tokio::test]
async fn test_failed_build_is_reported() {
    let orchestrator = InMemoryOrchestrator::new();
    orchestrator.script_build(vec![
        BuildEvent::Progress {
            current_step_info: vec!["Uploading the devnet package".to_string()],
        },
        BuildEvent::Warning("slow image pull".to_string()),
        BuildEvent::Error("genesis generation failed".to_string()),
    ]);

    let err = manager(&orchestrator).prepare_enclave(false).await.unwrap_err();

    match &err {
        ChaosError::NetworkBuildFailed { reason } => assert!(reason.contains("genesis generation failed")),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.is_retryable());
    assert_eq!(orchestrator.enclave_services(ENCLAVE), Some(Vec::new()));
}

#[tokio::test]
async fn test_unsuccessful_run_is_a_build_failure() {
    let orchestrator = InMemoryOrchestrator::new();
    orchestrator.script_build(vec![BuildEvent::RunFinished {
        successful: false,
        output: "participant 2 crashed".to_string(),
    }]);

    let err = manager(&orchestrator).prepare_enclave(false).await.unwrap_err();
    assert!(matches!(err, ChaosError::NetworkBuildFailed { .. }));
}

#[tokio::test]
async fn test_unreachable_platform() {
    let orchestrator = InMemoryOrchestrator::new();
    orchestrator.set_reachable(false);

    let err = manager(&orchestrator).prepare_enclave(false).await.unwrap_err();

    match err {
        ChaosError::PlatformUnavailable { platform, message } => {
            assert_eq!(platform, "orchestration");
            assert!(message.contains("make sure it is running"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(orchestrator.calls().len(), 1);
}

#[tokio::test]
async fn test_unrecognized_service_name_fails_reconciliation() {
    let orchestrator = InMemoryOrchestrator::new().with_enclave(
        ENCLAVE,
        ["el-1-geth-teku", "cl-1-teku-geth", "el-2-openethereum-teku"],
    );

    let err = manager(&orchestrator).prepare_enclave(false).await.unwrap_err();

    assert!(matches!(
        err,
        ChaosError::UnrecognizedServiceName { ref name } if name == "el-2-openethereum-teku"
    ));
    assert!(orchestrator.mutations().is_empty());
}
