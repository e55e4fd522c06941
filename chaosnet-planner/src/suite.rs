//! Suite compilation: parameter dimensions x targeting x attack size, one
//! [`SuiteTest`] per satisfiable combination.

use tracing::{debug, warn};

use chaosnet_core::fault::{
    ensure_service_id_selectors, ClockSkewFault, IoLatencyFault, NetworkLatencyFault, PacketDropFault,
    PodRestartFault,
};
use chaosnet_core::{
    ChaosError, ChaosTargetSelector, ClientDefaults, ClientKind, ClientRole, ExpressionSelector, FaultSpec,
    HealthCheckConfig, PlanStep, Result, ServiceName, SuiteTest, TargetDescription, TargetScope, Topology,
};

use crate::params::{FaultParams, ParamDimension};
use crate::vocabulary::{AttackSize, TargetingDimension, ValidatedFaultConfig};

/// Builds the inject steps of one test.
///
/// Most faults get one step per selector. I/O latency needs the data volume
/// of each pod, so its selectors must name pods by service id and it gets one
/// step per named pod.
pub fn compose_fault_steps(
    params: &FaultParams,
    targets: &[ChaosTargetSelector],
    defaults: &ClientDefaults,
) -> Result<Vec<PlanStep>> {
    let mut steps = Vec::new();
    for target in targets {
        match params {
            FaultParams::IoLatency {
                delay,
                percent,
                duration,
            } => {
                ensure_service_id_selectors(&target.selector, "I/O latency")?;
                for pod in target.selector.iter().flat_map(|s| s.values.iter()) {
                    let service: ServiceName = pod.parse()?;
                    let client = match service.role {
                        ClientRole::Execution => service.execution.as_str(),
                        ClientRole::Consensus | ClientRole::Validator => service.consensus.as_str(),
                    };
                    let fault = FaultSpec::IoLatency(IoLatencyFault {
                        selector: vec![ExpressionSelector::service_ids(vec![pod.clone()])],
                        volume_path: defaults.data_dir(service.role, client),
                        delay: *delay,
                        percent: *percent,
                        duration: *duration,
                    });
                    steps.push(PlanStep::inject(format!("inject I/O latency on {}", pod), fault));
                }
            }
            _ => {
                let fault = fault_for(params, target.selector.clone());
                let description = format!("inject {} ({}) on {}", fault.kind(), params, target.description);
                steps.push(PlanStep::inject(description, fault));
            }
        }
    }
    Ok(steps)
}

fn fault_for(params: &FaultParams, selector: Vec<ExpressionSelector>) -> FaultSpec {
    match params.clone() {
        FaultParams::ClockSkew { skew, duration } => FaultSpec::ClockSkew(ClockSkewFault {
            selector,
            skew,
            duration,
        }),
        FaultParams::RestartFailures => FaultSpec::PodRestart(PodRestartFault { selector }),
        FaultParams::IoLatency {
            delay,
            percent,
            duration,
        } => FaultSpec::IoLatency(IoLatencyFault {
            selector,
            volume_path: String::new(),
            delay,
            percent,
            duration,
        }),
        FaultParams::NetworkLatency {
            delay,
            jitter,
            duration,
            correlation,
        } => FaultSpec::NetworkLatency(NetworkLatencyFault {
            selector,
            delay,
            jitter,
            correlation,
            duration,
        }),
        FaultParams::PacketDrop {
            percent,
            direction,
            duration,
        } => FaultSpec::PacketDrop(PacketDropFault {
            selector,
            percent,
            direction,
            duration,
        }),
    }
}

/// Indices of the nodes that can be attacked: running the target client and
/// not the bootnode.
pub fn attackable_nodes(topology: &Topology, target: ClientKind, bootnode: Option<usize>) -> Vec<usize> {
    topology
        .nodes()
        .iter()
        .filter(|node| Some(node.index) != bootnode)
        .filter(|node| match target {
            ClientKind::Execution(el) => node.execution.client_type == el,
            ClientKind::Consensus(cl) => node.consensus.client_type == cl,
        })
        .map(|node| node.index)
        .collect()
}

/// Compiles every satisfiable combination into a test. Combinations whose
/// attack size has no valid node count are skipped with a warning.
pub fn compile_suite(
    fault: &ValidatedFaultConfig,
    dimensions: &[ParamDimension],
    topology: &Topology,
    bootnode: Option<usize>,
    defaults: &ClientDefaults,
) -> Result<Vec<SuiteTest>> {
    let candidates = attackable_nodes(topology, fault.target, bootnode);
    let mut tests = Vec::new();

    for (dimension_index, dimension) in dimensions.iter().enumerate() {
        for targeting in &fault.targeting {
            for size in &fault.attack_sizes {
                let Some(count) = size.node_count(candidates.len()) else {
                    warn!(
                        attack_size = %size,
                        nodes = candidates.len(),
                        "skipping {} {}: no node count satisfies the attack size",
                        targeting,
                        size
                    );
                    continue;
                };
                let test = compile_test(
                    fault,
                    dimension,
                    *targeting,
                    *size,
                    &candidates[..count],
                    topology,
                    defaults,
                )?;
                debug!(test = %test.test_name, dimension = dimension_index, "compiled test");
                tests.push(test);
            }
        }
    }

    if tests.is_empty() {
        return Err(ChaosError::configuration(format!(
            "no test could be compiled for {} against {} with {} matching node(s)",
            fault.fault_type,
            fault.target,
            candidates.len()
        )));
    }
    Ok(tests)
}

fn compile_test(
    fault: &ValidatedFaultConfig,
    dimension: &ParamDimension,
    targeting: TargetingDimension,
    size: AttackSize,
    nodes: &[usize],
    topology: &Topology,
    defaults: &ClientDefaults,
) -> Result<SuiteTest> {
    let scope = match targeting {
        TargetingDimension::MatchingNode => TargetScope::WholeNode,
        TargetingDimension::MatchingClient => TargetScope::Client(fault.target),
    };
    let target = TargetDescription::Nodes {
        indices: nodes.to_vec(),
        scope,
    }
    .resolve(topology)?;

    let mut plan_steps = compose_fault_steps(&dimension.params, &[target], defaults)?;
    plan_steps.push(PlanStep::wait_for_faults());

    Ok(SuiteTest {
        test_name: format!(
            "{} {} {} {} ({})",
            fault.fault_type, fault.target, targeting, size, dimension.params
        ),
        plan_steps,
        health: HealthCheckConfig::enabled(dimension.grace_period),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaosnet_core::fault::PacketDirection;
    use chaosnet_core::{
        ConsensusClient, ConsensusClientType, ExecutionClient, ExecutionClientType, ExpressionOperator, Node,
    };
    use std::time::Duration;

    fn topology() -> Topology {
        let node = |index: usize, el: ExecutionClientType, cl: ConsensusClientType| {
            let defaults = ClientDefaults::standard();
            let mut execution = ExecutionClient::new(el);
            execution.apply_defaults(&defaults).unwrap();
            let mut consensus = ConsensusClient::new(cl).with_sidecar(None);
            consensus.apply_defaults(&defaults).unwrap();
            Node::new(index, execution, consensus)
        };
        Topology::from_nodes(vec![
            node(1, ExecutionClientType::Geth, ConsensusClientType::Lighthouse),
            node(2, ExecutionClientType::Geth, ConsensusClientType::Teku),
            node(3, ExecutionClientType::Geth, ConsensusClientType::Prysm),
            node(4, ExecutionClientType::Besu, ConsensusClientType::Teku),
        ])
    }

    fn validated(targeting: Vec<TargetingDimension>, sizes: Vec<AttackSize>) -> ValidatedFaultConfig {
        ValidatedFaultConfig {
            fault_type: crate::vocabulary::FaultType::PacketDrop,
            target: ClientKind::Execution(ExecutionClientType::Geth),
            targeting,
            attack_sizes: sizes,
        }
    }

    fn packet_drop() -> ParamDimension {
        ParamDimension {
            params: FaultParams::PacketDrop {
                percent: 20,
                direction: PacketDirection::Both,
                duration: Duration::from_secs(60),
            },
            grace_period: Some(Duration::from_secs(30)),
        }
    }

    #[test]
    fn test_io_latency_rejects_exists_selector() {
        let params = FaultParams::IoLatency {
            delay: Duration::from_millis(100),
            percent: 50,
            duration: Duration::from_secs(60),
        };
        let target = ChaosTargetSelector::new(
            "everything",
            vec![ExpressionSelector::new("app", ExpressionOperator::Exists, Vec::new())],
        );
        let err = compose_fault_steps(&params, &[target], &ClientDefaults::standard()).unwrap_err();
        assert!(matches!(err, ChaosError::UnsupportedSelector { .. }));
    }

    #[test]
    fn test_io_latency_emits_one_step_per_pod() {
        let params = FaultParams::IoLatency {
            delay: Duration::from_millis(100),
            percent: 50,
            duration: Duration::from_secs(60),
        };
        let target = TargetDescription::Nodes {
            indices: vec![2],
            scope: TargetScope::WholeNode,
        }
        .resolve(&topology())
        .unwrap();
        let steps = compose_fault_steps(&params, &[target], &ClientDefaults::standard()).unwrap();

        let paths: Vec<String> = steps
            .iter()
            .map(|step| match step {
                PlanStep::InjectFault {
                    fault: FaultSpec::IoLatency(f),
                    ..
                } => f.volume_path.clone(),
                other => panic!("unexpected step {:?}", other),
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                "/data/geth/execution-data",
                "/data/teku/beacon-data",
                "/data/teku/validator-data",
            ]
        );
    }

    #[test]
    fn test_every_test_ends_with_one_wait_step() {
        let fault = validated(
            vec![TargetingDimension::MatchingNode, TargetingDimension::MatchingClient],
            vec![AttackSize::One, AttackSize::All],
        );
        let tests = compile_suite(&fault, &[packet_drop()], &topology(), None, &ClientDefaults::standard()).unwrap();

        assert_eq!(tests.len(), 4);
        for test in &tests {
            let waits = test
                .plan_steps
                .iter()
                .filter(|s| matches!(s, PlanStep::WaitForFaultCompletion { .. }))
                .count();
            assert_eq!(waits, 1);
            assert!(matches!(test.plan_steps.last(), Some(PlanStep::WaitForFaultCompletion { .. })));
            assert!(test.health.enable_checks);
            assert_eq!(test.health.grace_period, Some(Duration::from_secs(30)));
        }
    }

    #[test]
    fn test_matching_client_only_targets_the_client() {
        let fault = validated(vec![TargetingDimension::MatchingClient], vec![AttackSize::One]);
        let tests = compile_suite(&fault, &[packet_drop()], &topology(), None, &ClientDefaults::standard()).unwrap();

        let selectors: Vec<_> = tests[0].injected_faults().map(|f| f.selector().to_vec()).collect();
        assert_eq!(selectors.len(), 1);
        assert_eq!(selectors[0][0].values, vec!["el-1-geth-lighthouse".to_string()]);
    }

    #[test]
    fn test_bootnode_is_never_attacked() {
        let candidates = attackable_nodes(&topology(), ClientKind::Execution(ExecutionClientType::Geth), Some(1));
        assert_eq!(candidates, vec![2, 3]);
    }

    #[test]
    fn test_unsatisfiable_sizes_are_skipped_then_fail_when_nothing_remains() {
        // three geth nodes: no minority exists
        let fault = validated(vec![TargetingDimension::MatchingNode], vec![AttackSize::Minority, AttackSize::One]);
        let tests = compile_suite(&fault, &[packet_drop()], &topology(), None, &ClientDefaults::standard()).unwrap();
        assert_eq!(tests.len(), 1);

        let fault = validated(vec![TargetingDimension::MatchingNode], vec![AttackSize::Minority]);
        let err = compile_suite(&fault, &[packet_drop()], &topology(), None, &ClientDefaults::standard()).unwrap_err();
        assert!(matches!(err, ChaosError::ConfigurationInvalid { .. }));
    }
}
