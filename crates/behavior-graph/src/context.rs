use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use behavior_core::{
    BlackboardError, BlackboardSet, BlackboardValue, Guid, ListenerKey, ListenerTarget,
    SplitMix64, TickContext, VariableRef, VariableType,
};
use behavior_tools::TraceRecorder;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::{GraphConfig, NodeId, Status};

/// Cloneable, thread-safe handle for resuming nodes from outside a tick.
///
/// Requests are queued and applied at the start of the module's next tick,
/// in the order they were made.
#[derive(Debug, Clone, Default)]
pub struct Awakener {
    queue: Arc<Mutex<VecDeque<NodeId>>>,
}

impl Awakener {
    pub fn awake(&self, node: NodeId) {
        match self.queue.lock() {
            Ok(mut queue) => queue.push_back(node),
            Err(poisoned) => poisoned.into_inner().push_back(node),
        }
    }

    pub fn pending(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub(crate) fn queued(&self) -> Vec<NodeId> {
        match self.queue.lock() {
            Ok(queue) => queue.iter().copied().collect(),
            Err(poisoned) => poisoned.into_inner().iter().copied().collect(),
        }
    }

    pub(crate) fn drain(&self) -> Vec<NodeId> {
        match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

/// An [`Awakener`] bound to one node, for handing to async work.
#[derive(Debug, Clone)]
pub struct AwakeHandle {
    awakener: Awakener,
    node: NodeId,
}

impl AwakeHandle {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn awake(&self) {
        self.awakener.awake(self.node);
    }
}

/// Module-wide state every hook can reach.
#[derive(Debug)]
pub(crate) struct Env {
    pub blackboards: BlackboardSet,
    pub tick: TickContext,
    pub awakener: Awakener,
    pub rng: SplitMix64,
    pub diagnostics: Diagnostics,
    pub trace: TraceRecorder,
    pub config: GraphConfig,
}

impl Env {
    pub fn new(blackboards: BlackboardSet, config: GraphConfig) -> Self {
        let mut trace = TraceRecorder::new();
        if config.trace {
            trace.enable_log();
        }
        Self {
            blackboards,
            tick: TickContext::default(),
            awakener: Awakener::default(),
            rng: SplitMix64::new(config.seed),
            diagnostics: Diagnostics::with_capacity(config.max_diagnostics),
            trace,
            config,
        }
    }

    pub fn report(&mut self, kind: DiagnosticKind, node: Guid, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            kind,
            node,
            tick: self.tick.tick,
            message: message.into(),
        });
    }
}

/// What a node's hooks (and the conditions it owns) see of the module.
pub struct NodeContext<'a> {
    env: &'a mut Env,
    node: NodeId,
    guid: Guid,
    status: Status,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(env: &'a mut Env, node: NodeId, guid: Guid, status: Status) -> Self {
        Self {
            env,
            node,
            guid,
            status,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Status the node held before the current hook.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn tick(&self) -> &TickContext {
        &self.env.tick
    }

    pub fn dt_seconds(&self) -> f32 {
        self.env.tick.dt_seconds
    }

    pub fn blackboards(&self) -> &BlackboardSet {
        &self.env.blackboards
    }

    pub fn blackboards_mut(&mut self) -> &mut BlackboardSet {
        &mut self.env.blackboards
    }

    pub fn get(&self, var: VariableRef) -> Result<BlackboardValue, BlackboardError> {
        self.env.blackboards.get(var)
    }

    pub fn get_as<T: VariableType>(&self, var: VariableRef) -> Result<T, BlackboardError> {
        self.env.blackboards.get_as(var)
    }

    pub fn set(&mut self, var: VariableRef, value: BlackboardValue) -> Result<(), BlackboardError> {
        self.env.blackboards.set(var, value)
    }

    pub fn set_as<T: VariableType>(&mut self, var: VariableRef, value: T) -> Result<(), BlackboardError> {
        self.env.blackboards.set_as(var, value)
    }

    /// Awakens this node whenever `var` is written.
    pub fn subscribe(&mut self, var: VariableRef) -> Result<ListenerKey, BlackboardError> {
        let token = self.node.0 as u64;
        self.env
            .blackboards
            .subscribe(var, ListenerTarget::Notify(token))
    }

    /// Counts writes to `var`; read them with [`NodeContext::take_pending`].
    pub fn subscribe_mailbox(&mut self, var: VariableRef) -> Result<ListenerKey, BlackboardError> {
        self.env.blackboards.subscribe(var, ListenerTarget::Mailbox)
    }

    pub fn take_pending(&mut self, key: ListenerKey) -> Result<usize, BlackboardError> {
        self.env.blackboards.take_pending(key)
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.env.blackboards.unsubscribe(key)
    }

    pub fn awakener(&self) -> Awakener {
        self.env.awakener.clone()
    }

    pub fn awake_handle(&self) -> AwakeHandle {
        AwakeHandle {
            awakener: self.env.awakener.clone(),
            node: self.node,
        }
    }

    pub fn rng(&mut self) -> &mut SplitMix64 {
        &mut self.env.rng
    }

    /// Records a diagnostic against this node.
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.env.report(kind, self.guid, message);
    }
}
