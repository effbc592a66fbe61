#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use behavior_core::TickContext;
use behavior_graph::{Behavior, BehaviorGraphModule, NodeContext, Status};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Shared hook log, e.g. `["a:start", "a:end"]`.
#[derive(Debug, Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

/// Leaf that reports a fixed status on start, then pops one status per
/// update (repeating its current status once the script runs out).
#[derive(Debug)]
pub struct Scripted {
    name: &'static str,
    events: Events,
    start: Status,
    updates: VecDeque<Status>,
}

impl Scripted {
    pub fn new(name: &'static str, events: &Events, start: Status) -> Self {
        Self {
            name,
            events: events.clone(),
            start,
            updates: VecDeque::new(),
        }
    }

    pub fn then(mut self, status: Status) -> Self {
        self.updates.push_back(status);
        self
    }
}

impl Behavior for Scripted {
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> Status {
        self.events.push(format!("{}:start", self.name));
        self.start
    }

    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.events.push(format!("{}:update", self.name));
        self.updates.pop_front().unwrap_or(ctx.status())
    }

    fn on_end(&mut self, _ctx: &mut NodeContext<'_>) {
        self.events.push(format!("{}:end", self.name));
    }
}

/// Ticks `module` `n` times starting at `first`, 0.1 s per tick.
pub fn run_ticks(module: &mut BehaviorGraphModule, first: u64, n: u64) -> Status {
    let mut status = module.status();
    for tick in first..first + n {
        status = module.tick(TickContext::new(tick, 0.1));
    }
    status
}
