use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use chaosnet_core::{ClientDefaults, ExperimentConfig, PodHealthOutcome, PodUnderTest, TestArtifact};
use chaosnet_planner::{Planner, PlannerConfig};
use chaosnet_testing::fixtures::PLANNER_YAML;

fn experiment_document() -> ExperimentConfig {
    let config = PlannerConfig::from_yaml_str(PLANNER_YAML).unwrap();
    Planner::new(config, Arc::new(ClientDefaults::standard()))
        .build_plan()
        .unwrap()
        .to_experiment_config("bench-devnet")
}

fn artifacts(tests: usize, pods: usize) -> Vec<TestArtifact> {
    (0..tests)
        .map(|t| TestArtifact {
            test_name: format!("network-latency test {}", t),
            passed: true,
            health_results: (0..pods)
                .map(|p| PodHealthOutcome {
                    pod_name: format!("el-{}-geth-teku", p + 1),
                    healthy: true,
                    phase: Some("Running".to_string()),
                    reason: "pod is Running".to_string(),
                    under_test: p == 0,
                })
                .collect(),
            pods_under_test: vec![PodUnderTest {
                name: "el-1-geth-teku".to_string(),
                labels: Default::default(),
                expect_death: false,
            }],
        })
        .collect()
}

fn benchmark_experiment_document(c: &mut Criterion) {
    let document = experiment_document();

    c.bench_function("experiment_to_yaml", |b| b.iter(|| black_box(&document).to_yaml().unwrap()));
    c.bench_function("experiment_to_json", |b| {
        b.iter(|| serde_json::to_vec(black_box(&document)).unwrap())
    });

    let yaml = document.to_yaml().unwrap();
    let json = serde_json::to_vec(&document).unwrap();
    c.bench_function("experiment_from_yaml", |b| {
        b.iter(|| ExperimentConfig::from_yaml_str(black_box(&yaml)).unwrap())
    });
    c.bench_function("experiment_from_json", |b| {
        b.iter(|| serde_json::from_slice::<ExperimentConfig>(black_box(&json)).unwrap())
    });
}

fn benchmark_artifacts(c: &mut Criterion) {
    let small = artifacts(4, 18);
    let large = artifacts(64, 120);

    c.bench_function("artifacts_to_json_pretty_small", |b| {
        b.iter(|| serde_json::to_vec_pretty(black_box(&small)).unwrap())
    });
    c.bench_function("artifacts_to_json_pretty_large", |b| {
        b.iter(|| serde_json::to_vec_pretty(black_box(&large)).unwrap())
    });

    let encoded = serde_json::to_vec_pretty(&large).unwrap();
    c.bench_function("artifacts_from_json_large", |b| {
        b.iter(|| serde_json::from_slice::<Vec<TestArtifact>>(black_box(&encoded)).unwrap())
    });
}

criterion_group!(benches, benchmark_experiment_document, benchmark_artifacts);
criterion_main!(benches);
