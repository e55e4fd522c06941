use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;

use chaosnet_core::{ClientDefaults, Topology};
use chaosnet_planner::{calculate_network_size, Planner, PlannerConfig};
use chaosnet_testing::fixtures::PLANNER_YAML;

fn planner_config() -> PlannerConfig {
    PlannerConfig::from_yaml_str(PLANNER_YAML).unwrap()
}

fn benchmark_planning(c: &mut Criterion) {
    let defaults = Arc::new(ClientDefaults::standard());

    c.bench_function("build_plan_seeded", |b| {
        b.iter_batched(
            || Planner::new(planner_config(), Arc::clone(&defaults)),
            |mut planner| black_box(planner.build_plan().unwrap()),
            BatchSize::SmallInput,
        )
    });

    // tighter target shares grow the padded network
    for percent in [0.5, 0.2, 0.05] {
        c.bench_function(&format!("build_plan_target_{}", percent), |b| {
            b.iter_batched(
                || Planner::new(planner_config().with_target_percent(percent), Arc::clone(&defaults)),
                |mut planner| black_box(planner.build_plan().unwrap()),
                BatchSize::SmallInput,
            )
        });
    }
}

fn benchmark_sizing(c: &mut Criterion) {
    let policy = planner_config()
        .with_multiplier(3)
        .with_target_percent(0.3)
        .target_network_topology;

    c.bench_function("calculate_network_size", |b| {
        b.iter(|| calculate_network_size(black_box(&policy), black_box(6)))
    });
}

fn benchmark_topology_reconciliation(c: &mut Criterion) {
    let mut planner = Planner::new(planner_config(), Arc::new(ClientDefaults::standard()));
    let plan = planner.build_plan().unwrap();
    let services: Vec<String> = plan
        .topology
        .nodes()
        .iter()
        .flat_map(|node| plan.topology.node_service_names(node))
        .chain(["grafana".to_string(), "prometheus".to_string()])
        .collect();

    c.bench_function("topology_from_observed_services", |b| {
        b.iter(|| Topology::from_observed_services(black_box(&services)).unwrap())
    });

    let observed = Topology::from_observed_services(&services).unwrap();
    c.bench_function("topology_is_equal", |b| {
        b.iter(|| black_box(&plan.topology).is_equal(black_box(&observed)))
    });
}

criterion_group!(
    benches,
    benchmark_planning,
    benchmark_sizing,
    benchmark_topology_reconciliation
);
criterion_main!(benches);
