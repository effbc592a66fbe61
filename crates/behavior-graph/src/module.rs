use std::collections::VecDeque;

use behavior_core::{BlackboardSet, Guid, TickContext};
use behavior_tools::{TraceLog, TraceSink};
use chrono::{DateTime, Utc};

use crate::context::Env;
use crate::diagnostics::Diagnostics;
use crate::node::{NodeInfo, NodeKind, NodeSlot};
use crate::{Awakener, Behavior, GraphConfig, NodeId, Status};

/// One executable behavior graph: the node arena, its blackboards and the
/// tick loop.
#[derive(Debug)]
pub struct BehaviorGraphModule {
    pub(crate) guid: Guid,
    pub(crate) name: String,
    pub(crate) version: DateTime<Utc>,
    pub(crate) nodes: Vec<NodeSlot>,
    pub(crate) root: NodeId,
    pub(crate) env: Env,
    pub(crate) active: Vec<NodeId>,
    pub(crate) deferred: VecDeque<NodeId>,
    /// Nodes ended while their own hook was running.
    pub(crate) ending: Vec<NodeId>,
}

impl BehaviorGraphModule {
    pub(crate) fn assemble(
        guid: Guid,
        name: String,
        version: DateTime<Utc>,
        nodes: Vec<NodeSlot>,
        root: NodeId,
        blackboards: BlackboardSet,
        config: GraphConfig,
    ) -> Self {
        Self {
            guid,
            name,
            version,
            nodes,
            root,
            env: Env::new(blackboards, config),
            active: Vec::new(),
            deferred: VecDeque::new(),
            ending: Vec::new(),
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authoring timestamp; snapshots only restore onto the same version.
    pub fn version(&self) -> DateTime<Utc> {
        self.version
    }

    pub fn set_version(&mut self, version: DateTime<Utc>) {
        self.version = version;
    }

    pub fn config(&self) -> &GraphConfig {
        &self.env.config
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Status of the root node.
    pub fn status(&self) -> Status {
        self.nodes[self.root.index()].status
    }

    pub fn is_running(&self) -> bool {
        self.nodes[self.root.index()].started
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeInfo<'_>> {
        self.nodes.get(id.index()).map(|slot| NodeInfo {
            id,
            guid: slot.guid,
            name: &slot.name,
            status: slot.status,
            started: slot.started,
            role: slot.role,
            parents: &slot.parents,
            children: &slot.children,
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeInfo<'_>> {
        (0..self.nodes.len()).filter_map(|i| self.node(NodeId(i as u32)))
    }

    pub fn node_status(&self, id: NodeId) -> Option<Status> {
        self.nodes.get(id.index()).map(|slot| slot.status)
    }

    pub fn find_node(&self, guid: Guid) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|slot| slot.guid == guid)
            .map(|i| NodeId(i as u32))
    }

    /// First node with this name.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|slot| slot.name == name)
            .map(|i| NodeId(i as u32))
    }

    /// Nodes updated by the next sweep.
    pub fn active_nodes(&self) -> &[NodeId] {
        &self.active
    }

    pub fn behavior(&self, id: NodeId) -> Option<&dyn Behavior> {
        match &self.nodes.get(id.index())?.kind {
            NodeKind::Action(behavior) => Some(behavior.as_ref()),
            _ => None,
        }
    }

    pub fn subgraph(&self, id: NodeId) -> Option<&BehaviorGraphModule> {
        match &self.nodes.get(id.index())?.kind {
            NodeKind::Subgraph(subgraph) => Some(subgraph.module()),
            _ => None,
        }
    }

    pub fn blackboards(&self) -> &BlackboardSet {
        &self.env.blackboards
    }

    pub fn blackboards_mut(&mut self) -> &mut BlackboardSet {
        &mut self.env.blackboards
    }

    /// Handle for resuming nodes from outside the tick loop.
    pub fn awakener(&self) -> Awakener {
        self.env.awakener.clone()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.env.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.env.diagnostics
    }

    pub fn trace_log(&self) -> Option<&TraceLog> {
        self.env.trace.log()
    }

    pub fn enable_trace_log(&mut self) {
        self.env.trace.enable_log();
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.env.trace.set_sink(sink);
    }

    pub fn current_tick(&self) -> TickContext {
        self.env.tick
    }

    pub(crate) fn set_tick(&mut self, tick: TickContext) {
        self.env.tick = tick;
    }

    /// Starts the graph from the root, ending and resetting a previous run.
    pub fn start(&mut self) -> Status {
        tracing::debug!(graph = %self.guid, name = %self.name, "starting graph");
        let root = self.root;
        self.reset_status(root);
        self.start_node(Some(root));
        self.status()
    }

    /// Advances the graph by one tick.
    ///
    /// An idle graph is started instead of swept (and so is a completed one
    /// when `restart_on_completion` is set). Otherwise queued awakens and
    /// blackboard notifications are applied first, then every Running node
    /// is updated once.
    pub fn tick(&mut self, tick: TickContext) -> Status {
        self.env.tick = tick;
        if !self.is_running() {
            let status = self.status();
            let restart = status == Status::Uninitialized
                || (status.is_completed() && self.env.config.restart_on_completion);
            if !restart {
                return status;
            }
            self.env.awakener.drain();
            return self.start();
        }
        self.drain();
        self.sweep();
        self.status()
    }

    /// Ends every started node. Blackboard state is kept.
    pub fn end(&mut self) {
        let root = self.root;
        self.end_node(root);
        self.flush_deferred();
    }

    /// Ends the current run and starts again from the root.
    pub fn restart(&mut self) -> Status {
        self.end();
        self.start()
    }

    /// Ends the current run and returns every node to Uninitialized.
    pub fn reset(&mut self) {
        let root = self.root;
        self.reset_status(root);
        self.active.clear();
        self.deferred.clear();
    }
}
