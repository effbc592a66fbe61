mod common;

use std::sync::{Arc, Mutex};

use behavior_core::{BlackboardError, BlackboardValue, ObjectHandle};
use behavior_graph::{
    AwakeHandle, Behavior, BehaviorGraphModule, GraphBuilder, GraphSerializer, JsonSerializer,
    MapResolver, NodeContext, NodeData, NodeId, RepeatMode, SerializationError, SerializedValue,
    Status, YamlSerializer,
};
use chrono::{TimeZone, Utc};
use common::{init_tracing, run_ticks, Events, Scripted};

use Status::{Running, Success, Waiting};

/// External request service shared by every `Fetch` built against it.
#[derive(Debug, Clone, Default)]
struct Service(Arc<Mutex<ServiceState>>);

#[derive(Debug, Default)]
struct ServiceState {
    waiting: Vec<AwakeHandle>,
    issued: u32,
    done: bool,
}

impl Service {
    fn request(&self, handle: AwakeHandle) {
        let mut state = self.0.lock().unwrap();
        state.issued += 1;
        state.waiting.push(handle);
    }

    fn issued(&self) -> u32 {
        self.0.lock().unwrap().issued
    }

    fn is_done(&self) -> bool {
        self.0.lock().unwrap().done
    }

    fn complete(&self) {
        let mut state = self.0.lock().unwrap();
        state.done = true;
        for handle in state.waiting.drain(..) {
            handle.awake();
        }
    }
}

/// Waits on the service; re-issues its request after a restore.
struct Fetch {
    service: Service,
    attempts: i64,
}

impl Behavior for Fetch {
    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.attempts += 1;
        self.service.request(ctx.awake_handle());
        Waiting
    }

    fn on_update(&mut self, _ctx: &mut NodeContext<'_>) -> Status {
        if self.service.is_done() {
            Success
        } else {
            Waiting
        }
    }

    fn on_serialize(&self, data: &mut NodeData) {
        data.put("attempts", self.attempts);
    }

    fn on_deserialize(&mut self, ctx: &mut NodeContext<'_>, data: &NodeData) {
        self.attempts = data.get_as::<i64>("attempts").unwrap_or_default();
        if ctx.status() == Waiting {
            self.service.request(ctx.awake_handle());
        }
    }
}

fn courier(service: &Service, events: &Events) -> (BehaviorGraphModule, NodeId) {
    let mut b = GraphBuilder::new("courier");
    b.variable("count", 3i64);
    b.variable("target", ObjectHandle(7));
    let fetch = b.action(
        "fetch",
        Fetch {
            service: service.clone(),
            attempts: 0,
        },
    );
    let done = b.action("done", Scripted::new("done", events, Success));
    let root = b.sequence("root", [fetch, done]);
    (b.build(root).unwrap(), fetch)
}

fn suspended_courier() -> BehaviorGraphModule {
    let (mut module, _) = courier(&Service::default(), &Events::new());
    assert_eq!(module.start(), Waiting);
    assert_eq!(run_ticks(&mut module, 1, 1), Waiting);
    module
        .blackboards_mut()
        .set_by_name("count", BlackboardValue::Int(42))
        .unwrap();
    module
}

fn round_trip(serializer: &dyn GraphSerializer) {
    init_tracing();
    let original = suspended_courier();
    let saving = MapResolver::new().with(ObjectHandle(7), "crate-7");
    let text = original.save(serializer, &saving).unwrap();

    let service = Service::default();
    let events = Events::new();
    let (mut restored, fetch) = courier(&service, &events);
    let loading = MapResolver::new().with(ObjectHandle(99), "crate-7");
    restored.load(&text, serializer, &loading).unwrap();

    assert_eq!(service.issued(), 1);
    assert_eq!(restored.node_status(fetch), Some(Waiting));
    assert!(restored.is_running());
    let boards = restored.blackboards();
    assert_eq!(boards.get_by_name("count").unwrap(), BlackboardValue::Int(42));
    assert_eq!(
        boards.get_by_name("target").unwrap(),
        BlackboardValue::Object(Some(ObjectHandle(99)))
    );
    // Saving again from the restored module yields the same state.
    assert_eq!(
        restored.snapshot(&loading).unwrap(),
        original.snapshot(&saving).unwrap()
    );

    service.complete();
    assert_eq!(run_ticks(&mut restored, 2, 1), Success);
    assert_eq!(events.snapshot(), vec!["done:start", "done:end"]);
}

#[test]
fn waiting_graph_round_trips_through_json() {
    round_trip(&JsonSerializer { pretty: true });
}

#[test]
fn waiting_graph_round_trips_through_yaml() {
    round_trip(&YamlSerializer);
}

#[test]
fn repeat_progress_survives_restore() {
    let build = |events: &Events| {
        let mut b = GraphBuilder::new("repeat-restore");
        let child = b.action("child", Scripted::new("child", events, Success));
        let root = b.repeat("root", RepeatMode::Times(3), child);
        b.build(root).unwrap()
    };
    let mut original = build(&Events::new());
    assert_eq!(original.start(), Running);
    let snapshot = original.snapshot(&MapResolver::new()).unwrap();

    let events = Events::new();
    let mut restored = build(&events);
    restored.restore(&snapshot, &MapResolver::new()).unwrap();
    assert_eq!(run_ticks(&mut restored, 1, 1), Running);
    assert_eq!(run_ticks(&mut restored, 2, 1), Success);
    assert_eq!(events.count("child:start"), 2);
}

#[test]
fn restore_rejects_another_version() {
    let text = suspended_courier()
        .save(&JsonSerializer::default(), &MapResolver::new().with(ObjectHandle(7), "crate-7"))
        .unwrap();
    let (mut module, _) = courier(&Service::default(), &Events::new());
    module.set_version(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

    let err = module
        .load(&text, &JsonSerializer::default(), &MapResolver::new())
        .unwrap_err();
    assert!(matches!(err, SerializationError::VersionMismatch { .. }));
    assert!(!module.is_running());
}

#[test]
fn restore_rejects_a_changed_node_set() {
    let snapshot = suspended_courier()
        .snapshot(&MapResolver::new().with(ObjectHandle(7), "crate-7"))
        .unwrap();

    let events = Events::new();
    let mut b = GraphBuilder::new("courier");
    b.variable("count", 3i64);
    b.variable("target", ObjectHandle(7));
    let fetch = b.action("fetch", Scripted::new("fetch", &events, Waiting));
    let done = b.action("done", Scripted::new("done", &events, Success));
    let extra = b.action("extra", Scripted::new("extra", &events, Success));
    let root = b.sequence("root", [fetch, done, extra]);
    let mut changed = b.build(root).unwrap();

    let err = changed
        .restore(&snapshot, &MapResolver::new().with(ObjectHandle(7), "crate-7"))
        .unwrap_err();
    assert!(matches!(err, SerializationError::MissingNode(_)));
    assert!(events.snapshot().is_empty());
}

#[test]
fn mistyped_value_is_rejected_before_the_run_is_touched() {
    let resolver = MapResolver::new().with(ObjectHandle(7), "crate-7");
    let service = Service::default();
    let events = Events::new();
    let (mut module, fetch) = courier(&service, &events);
    assert_eq!(module.start(), Waiting);
    let before = module.snapshot(&resolver).unwrap();

    let mut mistyped = before.clone();
    mistyped.blackboards[0].variables[0].value = SerializedValue::String("oops".into());
    let err = module.restore(&mistyped, &resolver).unwrap_err();
    assert!(matches!(
        err,
        SerializationError::Blackboard(BlackboardError::TypeMismatch { ref variable, .. })
            if variable == "count"
    ));

    assert!(module.is_running());
    assert_eq!(module.node_status(fetch), Some(Waiting));
    assert_eq!(module.snapshot(&resolver).unwrap(), before);
    service.complete();
    assert_eq!(run_ticks(&mut module, 1, 1), Success);
}

#[test]
fn restore_rejects_another_graph() {
    let snapshot = suspended_courier()
        .snapshot(&MapResolver::new().with(ObjectHandle(7), "crate-7"))
        .unwrap();
    let mut b = GraphBuilder::new("other");
    let a = b.action("a", Scripted::new("a", &Events::new(), Success));
    let mut other = b.build(a).unwrap();

    assert!(matches!(
        other.restore(&snapshot, &MapResolver::new()),
        Err(SerializationError::GraphMismatch { .. })
    ));
}

#[test]
fn object_handles_need_a_stable_id() {
    let module = suspended_courier();
    assert!(matches!(
        module.save(&JsonSerializer::default(), &MapResolver::new()),
        Err(SerializationError::UnregisteredObject(7))
    ));

    let text = module
        .save(&JsonSerializer::default(), &MapResolver::new().with(ObjectHandle(7), "crate-7"))
        .unwrap();
    let (mut fresh, _) = courier(&Service::default(), &Events::new());
    assert!(matches!(
        fresh.load(&text, &JsonSerializer::default(), &MapResolver::new()),
        Err(SerializationError::UnresolvedObject(id)) if id == "crate-7"
    ));
}
