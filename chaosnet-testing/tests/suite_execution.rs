//! Test execution and fail-fast sequencing against the in-memory platforms.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chaosnet_artifacts::JsonFileArtifactSink;
use chaosnet_core::{
    ArtifactSink, CancellationToken, ChaosError, ClientDefaults, HealthCheckConfig, PlanStep, PodPhase,
    Topology,
};
use chaosnet_sequencer::{ExecutionContext, HealthChecker, SequencerConfig, SuiteRunner, TestExecutor};
use chaosnet_testing::fixtures::{
    fast_sequencer_config, init_test_tracing, network_latency, pod_restart, suite_test, three_node_network,
};
use chaosnet_testing::{SimulatedDeployment, SubmissionScript};

fn deployment() -> SimulatedDeployment {
    init_test_tracing();
    let deployment = SimulatedDeployment::new();
    let topology = Topology::from_network_config(&three_node_network(), &ClientDefaults::standard()).unwrap();
    deployment.cluster.add_topology(&topology);
    deployment
}

fn context(deployment: &SimulatedDeployment, config: SequencerConfig) -> ExecutionContext {
    ExecutionContext {
        faults: Arc::new(deployment.faults.clone()),
        health: Arc::new(HealthChecker::new(Arc::new(deployment.cluster.clone()))),
        config,
        cancel: CancellationToken::new(),
    }
}

fn checks() -> HealthCheckConfig {
    HealthCheckConfig::enabled(None)
}

#[tokio::test]
async fn test_disabled_checks_pass_regardless_of_pod_health() {
    let deployment = deployment();
    deployment
        .faults
        .script(SubmissionScript::completes().with_pod_phase(PodPhase::Failed));
    let context = context(&deployment, fast_sequencer_config());
    let test = suite_test(
        "latency el-1 unchecked",
        vec![network_latency(&["el-1-geth-teku"])],
        HealthCheckConfig::disabled(),
    );

    let artifact = TestExecutor::new(&test, &context).run().await.unwrap();

    assert_eq!(deployment.cluster.phase("el-1-geth-teku"), Some(PodPhase::Failed));
    assert!(artifact.passed);
    assert!(artifact.health_results.is_empty());
    assert_eq!(artifact.pods_under_test.len(), 1);
}

#[tokio::test]
async fn test_failed_test_stops_the_suite() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::completes());
    deployment
        .faults
        .script(SubmissionScript::completes().with_pod_phase(PodPhase::Failed));
    let runner = SuiteRunner::new(
        context(&deployment, fast_sequencer_config()),
        Arc::new(deployment.sink.clone()),
    );
    let tests = vec![
        suite_test("test 1", vec![network_latency(&["el-1-geth-teku"])], checks()),
        suite_test("test 2", vec![network_latency(&["el-2-besu-lighthouse"])], checks()),
        suite_test("test 3", vec![network_latency(&["el-3-nethermind-prysm"])], checks()),
    ];

    let report = runner.run(&tests).await.unwrap();

    assert!(!report.passed());
    assert!(report.stopped_early);
    assert_eq!(report.tests_planned, 3);
    assert_eq!(report.tests_executed(), 2);
    assert!(report.artifacts[0].passed);
    assert!(!report.artifacts[1].passed);
    let failed: Vec<&str> = report.artifacts[1]
        .failed_pods()
        .map(|o| o.pod_name.as_str())
        .collect();
    assert_eq!(failed, vec!["el-2-besu-lighthouse"]);

    // test 3 never injected anything
    assert_eq!(deployment.faults.submitted_faults().len(), 2);
    let persisted = deployment.sink.snapshot();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[1].test_name, "test 2");
}

#[tokio::test]
async fn test_pods_expected_to_die_are_not_checked() {
    let deployment = deployment();
    deployment
        .faults
        .script(SubmissionScript::completes().with_pod_phase(PodPhase::Pending));
    let context = context(&deployment, fast_sequencer_config());
    let test = suite_test("restart el-1", vec![pod_restart(&["el-1-geth-teku"])], checks());

    let artifact = TestExecutor::new(&test, &context).run().await.unwrap();

    assert!(artifact.passed);
    assert!(artifact.pods_under_test[0].expect_death);
    assert!(artifact.health_results.iter().all(|o| o.pod_name != "el-1-geth-teku"));
    // every other el, cl and vc pod is a bystander
    assert_eq!(artifact.health_results.len(), 8);
    assert!(artifact.health_results.iter().all(|o| !o.under_test));
}

#[tokio::test]
async fn test_collateral_damage_on_bystanders_fails_the_test() {
    let deployment = deployment();
    deployment.cluster.set_phase("cl-3-prysm-nethermind", PodPhase::Unknown);
    let context = context(&deployment, fast_sequencer_config());
    let test = suite_test("latency el-1", vec![network_latency(&["el-1-geth-teku"])], checks());

    let artifact = TestExecutor::new(&test, &context).run().await.unwrap();

    assert!(!artifact.passed);
    let failed: Vec<_> = artifact.failed_pods().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].pod_name, "cl-3-prysm-nethermind");
    assert!(!failed[0].under_test);
    assert_eq!(failed[0].reason, "pod is Unknown");
}

#[tokio::test]
async fn test_waits_until_every_fault_completes() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::pending_for(3));
    deployment.faults.script(SubmissionScript::pending_for(1));
    let context = context(&deployment, fast_sequencer_config());
    let test = suite_test(
        "latency two pods",
        vec![
            network_latency(&["el-1-geth-teku"]),
            network_latency(&["el-2-besu-lighthouse"]),
        ],
        HealthCheckConfig::disabled(),
    );

    TestExecutor::new(&test, &context).run().await.unwrap();

    // four polls for the first fault, two for the second
    assert_eq!(deployment.faults.status_queries(), 6);
}

#[tokio::test]
async fn test_injections_after_a_fixed_wait_are_still_awaited() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::pending_for(2));
    let context = context(&deployment, fast_sequencer_config());
    let mut test = suite_test("inject then sleep", Vec::new(), HealthCheckConfig::disabled());
    test.plan_steps = vec![
        PlanStep::WaitForDuration {
            description: "let the chain settle".to_string(),
            duration: Duration::from_millis(2),
        },
        PlanStep::inject("latency el-1", network_latency(&["el-1-geth-teku"])),
    ];

    let artifact = TestExecutor::new(&test, &context).run().await.unwrap();

    assert!(artifact.passed);
    assert_eq!(deployment.faults.status_queries(), 3);
}

#[tokio::test]
async fn test_fault_error_aborts_the_run_but_keeps_artifacts() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::completes());
    deployment
        .faults
        .script(SubmissionScript::errors("chaos daemon not found on node"));
    let runner = SuiteRunner::new(
        context(&deployment, fast_sequencer_config()),
        Arc::new(deployment.sink.clone()),
    );
    let tests = vec![
        suite_test("test 1", vec![network_latency(&["el-1-geth-teku"])], checks()),
        suite_test("test 2", vec![network_latency(&["el-2-besu-lighthouse"])], checks()),
        suite_test("test 3", vec![network_latency(&["el-3-nethermind-prysm"])], checks()),
    ];

    let err = runner.run(&tests).await.unwrap_err();

    match err {
        ChaosError::FaultFailed { fault, reason } => {
            assert!(fault.starts_with("network-latency"));
            assert_eq!(reason, "chaos daemon not found on node");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(deployment.sink.persist_calls(), 1);
    assert_eq!(deployment.sink.snapshot().len(), 1);
}

#[tokio::test]
async fn test_rejected_submission_aborts_without_rollback() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::completes());
    deployment
        .faults
        .script(SubmissionScript::rejected("admission webhook denied the request"));
    let context = context(&deployment, fast_sequencer_config());
    let test = suite_test(
        "two faults",
        vec![
            network_latency(&["el-1-geth-teku"]),
            network_latency(&["el-2-besu-lighthouse"]),
        ],
        checks(),
    );

    let err = TestExecutor::new(&test, &context).run().await.unwrap_err();

    assert!(matches!(err, ChaosError::Platform { .. }));
    // the first fault stays submitted
    assert_eq!(deployment.faults.submitted_faults().len(), 1);
    assert_eq!(deployment.faults.submissions().len(), 2);
}

#[tokio::test]
async fn test_cancellation_interrupts_waiting() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::never_completes());
    let context = context(&deployment, fast_sequencer_config());
    let cancel = context.cancel.clone();
    let test = suite_test("stuck", vec![network_latency(&["el-1-geth-teku"])], checks());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });
    let err = TestExecutor::new(&test, &context).run().await.unwrap_err();

    assert!(matches!(err, ChaosError::Cancelled { .. }));
}

#[tokio::test]
async fn test_completion_timeout() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::never_completes());
    let config = fast_sequencer_config().with_fault_completion_timeout(Duration::from_millis(10));
    let context = context(&deployment, config);
    let test = suite_test("stuck", vec![network_latency(&["el-1-geth-teku"])], checks());

    let err = TestExecutor::new(&test, &context).run().await.unwrap_err();

    match err {
        ChaosError::FaultFailed { reason, .. } => assert!(reason.contains("not complete")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_grace_period_precedes_health_checks() {
    let deployment = deployment();
    let context = context(&deployment, fast_sequencer_config());
    let test = suite_test(
        "latency with grace",
        vec![network_latency(&["el-1-geth-teku"])],
        HealthCheckConfig::enabled(Some(Duration::from_millis(30))),
    );

    let started = Instant::now();
    let artifact = TestExecutor::new(&test, &context).run().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(30));
    assert!(artifact.passed);
    assert_eq!(artifact.health_results.len(), 9);
}

#[tokio::test]
async fn test_artifacts_land_in_the_json_file() {
    let deployment = deployment();
    let temp_dir = tempfile::TempDir::new().unwrap();
    let sink = JsonFileArtifactSink::new(temp_dir.path()).await.unwrap();
    let runner = SuiteRunner::new(context(&deployment, fast_sequencer_config()), Arc::new(sink.clone()));
    let tests = vec![suite_test(
        "latency el-1",
        vec![network_latency(&["el-1-geth-teku"])],
        checks(),
    )];

    let report = runner.run(&tests).await.unwrap();

    assert!(report.passed());
    let loaded = sink.load().await.unwrap();
    assert_eq!(loaded, report.artifacts);
    let raw = std::fs::read_to_string(sink.path()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document[0]["test_name"], "latency el-1");
}

#[tokio::test]
async fn test_status_scripts_are_independent_per_submission() {
    let deployment = deployment();
    deployment.faults.script(SubmissionScript::errors("boom"));
    let context = context(&deployment, fast_sequencer_config());
    let first = suite_test("first", vec![network_latency(&["el-1-geth-teku"])], checks());
    let second = suite_test("second", vec![network_latency(&["el-1-geth-teku"])], checks());

    assert!(TestExecutor::new(&first, &context).run().await.is_err());
    let artifact = TestExecutor::new(&second, &context).run().await.unwrap();
    assert!(artifact.passed);
    assert_eq!(deployment.faults.submissions().len(), 2);
}
