mod common;

use behavior_core::TickContext;
use behavior_graph::{
    tick_agents, AgentConfig, BehaviorAgent, DiagnosticKind, GraphBuilder, GraphConfig, NodeId,
    Status, Wait,
};
use behavior_tools::tags;
use common::{init_tracing, Events, Scripted};

#[test]
fn graph_config_fills_defaults_from_yaml() {
    let config = GraphConfig::from_yaml_str("seed: 9\nrestart_on_completion: true\n").unwrap();
    assert_eq!(config.seed, 9);
    assert!(config.restart_on_completion);
    assert_eq!(config.max_drain_passes, GraphConfig::default().max_drain_passes);
    assert_eq!(config.max_diagnostics, 256);
    assert!(!config.trace);
}

#[test]
fn graph_config_loads_from_file() {
    let path = std::env::temp_dir().join(format!("behavior-graph-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "trace: true\nmax_diagnostics: 4\n").unwrap();
    let config = GraphConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(config.trace);
    assert_eq!(config.max_diagnostics, 4);

    let err = GraphConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read graph config"));
}

#[test]
fn completed_graph_restarts_only_when_configured() {
    for (restart, expected_starts) in [(false, 1), (true, 3)] {
        let events = Events::new();
        let config = GraphConfig {
            restart_on_completion: restart,
            ..GraphConfig::default()
        };
        let mut b = GraphBuilder::new("loop").config(config);
        let a = b.action("a", Scripted::new("a", &events, Status::Success));
        let mut module = b.build(a).unwrap();

        for tick in 0..3 {
            assert_eq!(module.tick(TickContext::new(tick, 0.1)), Status::Success);
        }
        assert_eq!(events.count("a:start"), expected_starts);
    }
}

#[test]
fn trace_log_records_lifecycle_tags() {
    init_tracing();
    let events = Events::new();
    let config = GraphConfig {
        trace: true,
        ..GraphConfig::default()
    };
    let mut b = GraphBuilder::new("traced").config(config);
    let a = b.action("a", Scripted::new("a", &events, Status::Running).then(Status::Success));
    let root = b.sequence("root", [a]);
    let mut module = b.build(root).unwrap();

    module.tick(TickContext::new(0, 0.1));
    module.tick(TickContext::new(1, 0.1));
    let log = module.trace_log().unwrap();
    let tagged: Vec<_> = log.events.iter().map(|e| (e.tick, e.tag.as_ref(), e.a)).collect();
    assert_eq!(
        tagged,
        vec![
            (0, tags::NODE_START, a.0 as u64),
            (0, tags::NODE_START, root.0 as u64),
            (1, tags::NODE_UPDATE, a.0 as u64),
            (1, tags::NODE_END, a.0 as u64),
            (1, tags::NODE_AWAKE, root.0 as u64),
            (1, tags::NODE_END, root.0 as u64),
        ]
    );
    assert_eq!(log.with_tag(tags::NODE_END).count(), 2);
}

#[test]
fn trace_log_is_off_until_enabled() {
    let events = Events::new();
    let mut b = GraphBuilder::new("untraced");
    let a = b.action("a", Scripted::new("a", &events, Status::Success));
    let mut module = b.build(a).unwrap();

    module.start();
    assert!(module.trace_log().is_none());
    module.enable_trace_log();
    module.restart();
    let recorded: Vec<_> = module
        .trace_log()
        .unwrap()
        .events
        .iter()
        .map(|e| e.tag.to_string())
        .collect();
    assert_eq!(recorded, vec![tags::NODE_START, tags::NODE_END]);
}

#[test]
fn diagnostics_are_bounded() {
    let config = GraphConfig {
        max_diagnostics: 2,
        ..GraphConfig::default()
    };
    let mut b = GraphBuilder::new("noisy").config(config);
    let a = b.action("a", Wait::new(1.0));
    let mut module = b.build(a).unwrap();

    for i in 0..3 {
        module.awake_node(NodeId(100 + i));
    }
    assert_eq!(module.diagnostics().len(), 2);
    assert_eq!(module.diagnostics().dropped(), 1);
    assert_eq!(module.diagnostics_mut().drain().len(), 2);
    assert!(module.diagnostics().is_empty());
}

#[test]
fn uninitialized_from_a_hook_is_a_failure() {
    let events = Events::new();
    let mut b = GraphBuilder::new("broken");
    let a = b.action("a", Scripted::new("a", &events, Status::Uninitialized));
    let mut module = b.build(a).unwrap();

    assert_eq!(module.start(), Status::Failure);
    let diagnostics: Vec<_> = module.diagnostics().of_kind(DiagnosticKind::InvalidStatus).collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].node, module.node(a).unwrap().guid);
}

#[test]
fn agents_tick_in_stable_id_order() {
    let events = Events::new();
    let names: [(u64, &'static str); 3] = [(3, "c"), (1, "a"), (2, "b")];
    let mut agents: Vec<_> = names
        .into_iter()
        .map(|(id, name)| {
            let mut b = GraphBuilder::new(name);
            let leaf = b.action(name, Scripted::new(name, &events, Status::Success));
            BehaviorAgent::new(id, b.build(leaf).unwrap())
        })
        .collect();

    tick_agents(&TickContext::new(0, 0.1), &mut agents);
    assert_eq!(events.snapshot(), vec!["a:start", "a:end", "b:start", "b:end", "c:start", "c:end"]);
    assert_eq!(agents.iter().map(|a| a.agent).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn skipped_ticks_carry_their_time_forward() {
    let mut b = GraphBuilder::new("cadence");
    let wait = b.action("wait", Wait::new(0.35));
    let mut agent = BehaviorAgent::new(7u64, b.build(wait).unwrap()).with_config(AgentConfig {
        tick_every: 2,
        tick_offset: 0,
    });

    let statuses: Vec<_> = (0..5)
        .map(|tick| agent.tick(&TickContext::new(tick, 0.1)))
        .collect();
    assert_eq!(
        statuses,
        vec![
            Status::Running,
            Status::Running,
            Status::Running,
            Status::Running,
            Status::Success,
        ]
    );
}

#[test]
fn deterministic_cadence_spreads_agents() {
    let config = AgentConfig::deterministic(5u64, 4);
    assert_eq!(config.tick_offset, 1);
    let ticks: Vec<u64> = (0..10).filter(|t| config.should_tick(*t)).collect();
    assert_eq!(ticks, vec![3, 7]);
}
