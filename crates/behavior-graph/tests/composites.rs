mod common;

use behavior_core::{BlackboardValue, ConditionOperator, EnumValue, TickContext};
use behavior_graph::{
    ConditionSet, DiagnosticKind, GraphBuilder, GraphConfig, ParallelPolicy, Status, Switch,
    VariableCondition,
};
use common::{init_tracing, run_ticks, Events, Scripted};

use Status::{Failure, Running, Success, Waiting};

#[test]
fn sequence_stops_at_first_failure() {
    init_tracing();
    let events = Events::new();
    let mut b = GraphBuilder::new("abc");
    let a = b.action("a", Scripted::new("a", &events, Success));
    let fail = b.action("b", Scripted::new("b", &events, Failure));
    let c = b.action("c", Scripted::new("c", &events, Success));
    let root = b.sequence("root", [a, fail, c]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.tick(TickContext::new(0, 0.1)), Failure);
    assert_eq!(events.snapshot(), vec!["a:start", "a:end", "b:start", "b:end"]);
    assert_eq!(events.count("c:start"), 0);
    assert!(!module.is_running());
}

#[test]
fn sequence_resumes_when_running_child_finishes() {
    init_tracing();
    let events = Events::new();
    let mut b = GraphBuilder::new("resume");
    let a = b.action("a", Scripted::new("a", &events, Running).then(Success));
    let next = b.action("b", Scripted::new("b", &events, Success));
    let root = b.sequence("root", [a, next]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Waiting);
    assert_eq!(module.active_nodes(), &[a]);
    assert_eq!(run_ticks(&mut module, 1, 1), Success);
    assert_eq!(
        events.snapshot(),
        vec!["a:start", "a:update", "a:end", "b:start", "b:end"]
    );
}

#[test]
fn selector_fails_after_every_child_failed_once() {
    init_tracing();
    let events = Events::new();
    let mut b = GraphBuilder::new("selector");
    let children: Vec<_> = ["x", "y", "z"]
        .into_iter()
        .map(|name| b.action(name, Scripted::new(name, &events, Failure)))
        .collect();
    let root = b.selector("root", children);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Failure);
    for name in ["x", "y", "z"] {
        assert_eq!(events.count(&format!("{name}:start")), 1);
        assert_eq!(events.count(&format!("{name}:end")), 1);
    }
}

#[test]
fn selector_stops_at_first_success() {
    let events = Events::new();
    let mut b = GraphBuilder::new("selector-success");
    let x = b.action("x", Scripted::new("x", &events, Failure));
    let y = b.action("y", Scripted::new("y", &events, Success));
    let z = b.action("z", Scripted::new("z", &events, Failure));
    let root = b.selector("root", [x, y, z]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Success);
    assert_eq!(events.count("z:start"), 0);
}

#[test]
fn empty_composites_succeed() {
    let mut b = GraphBuilder::new("empty");
    let seq = b.sequence("seq", []);
    let sel = b.selector("sel", []);
    let par = b.parallel("par", ParallelPolicy::AnySuccess, []);
    let root = b.sequence("root", [seq, sel, par]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Success);
}

#[test]
fn parallel_all_waits_then_succeeds() {
    init_tracing();
    let events = Events::new();
    let mut b = GraphBuilder::new("parallel-all");
    let a = b.action("a", Scripted::new("a", &events, Success));
    let slow = b.action("b", Scripted::new("b", &events, Running).then(Success));
    let c = b.action("c", Scripted::new("c", &events, Success));
    let root = b.parallel("root", ParallelPolicy::All, [a, slow, c]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Waiting);
    assert_eq!(module.node_status(slow), Some(Running));
    assert_eq!(run_ticks(&mut module, 1, 1), Success);
}

fn failing_parallel(policy: ParallelPolicy, events: &Events) -> behavior_graph::BehaviorGraphModule {
    let mut b = GraphBuilder::new("parallel-failure");
    let a = b.action("a", Scripted::new("a", events, Running).then(Failure));
    let slow = b.action(
        "b",
        Scripted::new("b", events, Running).then(Running).then(Success),
    );
    let root = b.parallel("root", policy, [a, slow]);
    b.build(root).unwrap()
}

#[test]
fn parallel_all_reports_failure_only_after_every_child_resolved() {
    init_tracing();
    let events = Events::new();
    let mut module = failing_parallel(ParallelPolicy::All, &events);

    assert_eq!(module.start(), Waiting);
    assert_eq!(run_ticks(&mut module, 1, 1), Waiting);
    assert_eq!(run_ticks(&mut module, 2, 1), Failure);
    assert_eq!(events.count("b:update"), 2);
}

#[test]
fn parallel_all_success_fails_on_first_failure() {
    init_tracing();
    let events = Events::new();
    let mut module = failing_parallel(ParallelPolicy::AllSuccess, &events);

    assert_eq!(module.start(), Waiting);
    assert_eq!(run_ticks(&mut module, 1, 1), Failure);
    // The still-running sibling is ended without another update.
    assert_eq!(events.count("b:update"), 0);
    assert_eq!(events.count("b:end"), 1);
    assert!(module.active_nodes().is_empty());
}

#[test]
fn parallel_any_success_fails_only_after_every_child_failed() {
    let events = Events::new();
    let mut b = GraphBuilder::new("parallel-any-success");
    let a = b.action("a", Scripted::new("a", &events, Failure));
    let slow = b.action("b", Scripted::new("b", &events, Running).then(Failure));
    let root = b.parallel("root", ParallelPolicy::AnySuccess, [a, slow]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Waiting);
    assert_eq!(module.node_status(a), Some(Failure));
    assert_eq!(run_ticks(&mut module, 1, 1), Failure);
    assert_eq!(events.count("b:end"), 1);
}

#[test]
fn parallel_any_success_ignores_earlier_failures() {
    init_tracing();
    let events = Events::new();
    let mut module = failing_parallel(ParallelPolicy::AnySuccess, &events);

    assert_eq!(module.start(), Waiting);
    assert_eq!(run_ticks(&mut module, 1, 1), Waiting);
    assert_eq!(run_ticks(&mut module, 2, 1), Success);
}

#[test]
fn parallel_any_takes_first_resolved_child() {
    let events = Events::new();
    let mut b = GraphBuilder::new("parallel-any");
    let slow = b.action("slow", Scripted::new("slow", &events, Running));
    let quick = b.action("quick", Scripted::new("quick", &events, Running).then(Failure));
    let root = b.parallel("root", ParallelPolicy::Any, [slow, quick]);
    let mut module = b.build(root).unwrap();

    module.start();
    assert_eq!(run_ticks(&mut module, 1, 1), Failure);
    assert_eq!(events.count("slow:end"), 1);
}

#[test]
fn switch_out_of_range_reports_drift_and_default_status() {
    init_tracing();
    let events = Events::new();
    let mut b = GraphBuilder::new("switch");
    let mode = b.variable("mode", EnumValue::new("Mode", 2));
    let first = b.action("first", Scripted::new("first", &events, Failure));
    let second = b.action("second", Scripted::new("second", &events, Failure));
    let root = b.switch("root", Switch::new(mode), vec![Some(first), Some(second)]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Success);
    assert!(events.snapshot().is_empty());
    assert_eq!(module.diagnostics().of_kind(DiagnosticKind::ConfigurationDrift).count(), 1);
}

#[test]
fn switch_routes_by_ordinal_and_treats_empty_slot_as_missing_link() {
    let events = Events::new();
    let mut b = GraphBuilder::new("switch-route");
    let mode = b.variable("mode", 1i64);
    let first = b.action("first", Scripted::new("first", &events, Failure));
    let second = b.action("second", Scripted::new("second", &events, Failure));
    let root = b.switch("root", Switch::new(mode), vec![Some(first), Some(second), None]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Failure);
    assert_eq!(events.count("second:start"), 1);

    module.blackboards_mut().set(mode, 2i64.into()).unwrap();
    assert_eq!(module.restart(), Success);
    assert_eq!(module.diagnostics().of_kind(DiagnosticKind::MissingLink).count(), 1);
}

#[test]
fn branch_routes_on_its_conditions() {
    let events = Events::new();
    let mut b = GraphBuilder::new("branch");
    let armed = b.variable("armed", false);
    let yes = b.action("yes", Scripted::new("yes", &events, Success));
    let no = b.action("no", Scripted::new("no", &events, Failure));
    let conditions =
        ConditionSet::all().with(VariableCondition::new(armed, ConditionOperator::Equal, BlackboardValue::from(true)));
    let root = b.branch("root", conditions, Some(yes), Some(no));
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Failure);
    module.blackboards_mut().set_as(armed, true).unwrap();
    assert_eq!(module.restart(), Success);
    assert_eq!(events.count("yes:start"), 1);
    assert_eq!(events.count("no:start"), 1);
}

#[test]
fn branch_without_child_for_outcome_succeeds() {
    let events = Events::new();
    let mut b = GraphBuilder::new("branch-missing");
    let yes = b.action("yes", Scripted::new("yes", &events, Failure));
    let root = b.branch("root", ConditionSet::any(), Some(yes), None);
    let mut module = b.build(root).unwrap();

    // An empty any-set is false, so the missing slot 1 is taken.
    assert_eq!(module.start(), Success);
    assert_eq!(module.diagnostics().of_kind(DiagnosticKind::MissingLink).count(), 1);
}

#[test]
fn random_choice_is_reproducible_from_seed() {
    let picks = |seed: u64| {
        let events = Events::new();
        let mut b = GraphBuilder::new("random").config(GraphConfig::default().with_seed(seed));
        let names = ["a", "b", "c", "d"];
        let children: Vec<_> = names
            .iter()
            .map(|name| b.action(*name, Scripted::new(*name, &events, Success)))
            .collect();
        let root = b.random("root", children);
        let mut module = b.build(root).unwrap();
        for _ in 0..8 {
            module.restart();
        }
        events.snapshot()
    };
    assert_eq!(picks(7), picks(7));
    assert_eq!(picks(7).len(), 16);
}

#[test]
fn reset_status_returns_subtree_to_uninitialized() {
    init_tracing();
    let events = Events::new();
    let mut b = GraphBuilder::new("reset");
    let a = b.action("a", Scripted::new("a", &events, Success));
    let busy = b.action("b", Scripted::new("b", &events, Running));
    let inner = b.sequence("inner", [a, busy]);
    let root = b.selector("root", [inner]);
    let mut module = b.build(root).unwrap();

    assert_eq!(module.start(), Waiting);
    let first_run = events.take();

    module.reset_status(root);
    assert!(module.nodes().all(|n| n.status == Status::Uninitialized && !n.started));
    assert!(module.active_nodes().is_empty());
    assert_eq!(events.take(), vec!["b:end"]);

    assert_eq!(module.start_node(Some(root)), Waiting);
    assert_eq!(events.take(), first_run);
}

#[test]
fn start_node_of_absent_branch_is_success() {
    let events = Events::new();
    let mut b = GraphBuilder::new("absent");
    let a = b.action("a", Scripted::new("a", &events, Success));
    let mut module = b.build(a).unwrap();

    assert_eq!(module.start_node(None), Success);
    assert!(events.snapshot().is_empty());
}
