//! Status propagation: start, update, awaken and end.
//!
//! A node's kind is moved out of the arena while its own hook runs, which is
//! what marks it busy. Awakening a busy node is deferred to the end of the
//! current top-level operation instead of re-entering it.

use behavior_core::{Guid, SplitMix64};
use behavior_tools::{tags, TraceEvent};

use crate::diagnostics::DiagnosticKind;
use crate::node::{NodeKind, NodeRole};
use crate::{BehaviorGraphModule, NodeContext, NodeId, Status};

/// A composite or modifier's handle on the module while its hook runs.
pub(crate) struct Scope<'m> {
    module: &'m mut BehaviorGraphModule,
    node: NodeId,
}

impl Scope<'_> {
    pub fn guid(&self) -> Guid {
        self.module.nodes[self.node.index()].guid
    }

    pub fn current_status(&self) -> Status {
        self.module.nodes[self.node.index()].status
    }

    pub fn start_child(&mut self, child: Option<NodeId>) -> Status {
        self.module.start_child(self.node, child)
    }

    /// Status of a child slot; an empty slot counts as Success.
    pub fn status_of(&self, child: Option<NodeId>) -> Status {
        match child {
            Some(c) => self.module.nodes[c.index()].status,
            None => Status::Success,
        }
    }

    pub fn end_child(&mut self, child: Option<NodeId>) {
        if let Some(c) = child {
            self.module.end_child(self.node, c);
        }
    }

    pub fn reset_child(&mut self, child: Option<NodeId>) {
        if let Some(c) = child {
            self.module.reset_status(c);
        }
    }

    pub fn rng(&mut self) -> &mut SplitMix64 {
        &mut self.module.env.rng
    }

    pub fn context(&mut self) -> NodeContext<'_> {
        let slot = &self.module.nodes[self.node.index()];
        let (guid, status) = (slot.guid, slot.status);
        NodeContext::new(&mut self.module.env, self.node, guid, status)
    }

    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let guid = self.guid();
        self.module.env.report(kind, guid, message);
    }
}

#[derive(Clone, Copy)]
enum Step {
    Start,
    Update,
}

impl BehaviorGraphModule {
    fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Starts `node` and returns its status after the start hook.
    ///
    /// An absent node is an empty branch and counts as Success.
    pub fn start_node(&mut self, node: Option<NodeId>) -> Status {
        let Some(id) = node else {
            return Status::Success;
        };
        if !self.contains(id) {
            self.unknown_node(id);
            return Status::Failure;
        }
        let status = self.launch(id);
        self.flush_deferred();
        status
    }

    /// Resumes a started node out of band. Nodes that are not started are
    /// ignored.
    pub fn awake_node(&mut self, id: NodeId) {
        self.awake(id);
        self.flush_deferred();
    }

    /// Ends a node and every started node below it, top-down.
    ///
    /// A node ended from inside its own hook finishes ending once the hook
    /// returns.
    pub fn end_node(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let slot = &mut self.nodes[id.index()];
        if !slot.started {
            return;
        }
        slot.started = false;
        let (status, busy) = (slot.status, slot.is_busy());
        self.active.retain(|n| *n != id);
        self.trace(tags::NODE_END, id, status);
        if busy {
            if !self.ending.contains(&id) {
                self.ending.push(id);
            }
            return;
        }
        self.finish_end(id);
    }

    /// Runs the end hook of an ended node, then ends its children.
    fn finish_end(&mut self, id: NodeId) {
        let (guid, status) = {
            let slot = &self.nodes[id.index()];
            (slot.guid, slot.status)
        };
        let mut kind = std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Busy);
        match &mut kind {
            NodeKind::Action(behavior) => {
                behavior.on_end(&mut NodeContext::new(&mut self.env, id, guid, status));
            }
            NodeKind::Subgraph(subgraph) => subgraph.end(),
            NodeKind::Composite(composite) => composite.end(&mut Scope { module: self, node: id }),
            NodeKind::Modifier(modifier) => modifier.end(&mut Scope { module: self, node: id }),
            // Arrivals are kept so parents that have not reached the join
            // yet still collect this activation's result.
            NodeKind::Join(_) | NodeKind::Busy => {}
        }
        self.nodes[id.index()].kind = kind;

        let children = self.nodes[id.index()].children.clone();
        for child in children.into_iter().flatten() {
            self.end_child(id, child);
        }
    }

    /// Puts a node's kind back after its hook ran and completes an end
    /// requested meanwhile.
    pub(crate) fn restore_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
        if let Some(pos) = self.ending.iter().position(|n| *n == id) {
            self.ending.swap_remove(pos);
            self.finish_end(id);
        }
    }

    /// Returns a node and its subtree to Uninitialized, ending it first if it
    /// is still running.
    pub fn reset_status(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        self.end_node(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let slot = &mut self.nodes[next.index()];
            if slot.started {
                // Still owned by another parent's activation (joins).
                continue;
            }
            slot.status = Status::Uninitialized;
            match &mut slot.kind {
                NodeKind::Composite(c) => c.reset(),
                NodeKind::Modifier(m) => m.reset(),
                NodeKind::Join(j) => j.reset(),
                NodeKind::Subgraph(s) => s.reset(),
                NodeKind::Action(_) | NodeKind::Busy => {}
            }
            stack.extend(slot.children.iter().rev().flatten().copied());
        }
    }

    pub(crate) fn start_child(&mut self, parent: NodeId, child: Option<NodeId>) -> Status {
        match child {
            None => Status::Success,
            Some(c) if self.nodes[c.index()].role == NodeRole::Join => self.arrive(c, parent),
            Some(c) => self.launch(c),
        }
    }

    /// Ends `child` on behalf of `parent`. A join stays alive while any of its
    /// other parents is still started.
    pub(crate) fn end_child(&mut self, parent: NodeId, child: NodeId) {
        let slot = &self.nodes[child.index()];
        if !slot.started {
            return;
        }
        if slot.role == NodeRole::Join
            && slot
                .parents
                .iter()
                .any(|p| *p != parent && self.nodes[p.index()].started)
        {
            return;
        }
        self.end_node(child);
    }

    fn launch(&mut self, id: NodeId) -> Status {
        if self.nodes[id.index()].is_busy() {
            return self.nodes[id.index()].status;
        }
        if self.nodes[id.index()].started {
            self.end_node(id);
        }
        self.nodes[id.index()].started = true;
        self.step(id, Step::Start, tags::NODE_START)
    }

    /// A parent reaching a join. The join's child starts once the join's
    /// policy is satisfied; until then the parent waits.
    fn arrive(&mut self, id: NodeId, parent: NodeId) -> Status {
        let slot = &mut self.nodes[id.index()];
        if slot.is_busy() {
            return slot.status;
        }
        if !slot.started {
            let status = slot.status;
            if let NodeKind::Join(join) = &mut slot.kind {
                // A resolved activation hands its result to parents that had
                // not reached the join yet. A parent arriving again starts a
                // new activation.
                if status.is_completed() && join.launched && !join.arrived.contains(&parent) {
                    join.arrived.push(parent);
                    self.trace(tags::NODE_UPDATE, id, status);
                    return status;
                }
                join.reset();
            }
            self.nodes[id.index()].started = true;
            self.trace(tags::NODE_START, id, Status::Waiting);
        }

        let parent_count = self.nodes[id.index()].parents.len();
        let child = self.nodes[id.index()].children.first().copied().flatten();
        let mut kind = std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Busy);
        let status = match &mut kind {
            NodeKind::Join(join) => {
                if join.arrive(parent, parent_count) {
                    pending_as_waiting(self.start_child(id, child))
                } else {
                    Status::Waiting
                }
            }
            _ => Status::Waiting,
        };
        self.restore_kind(id, kind);

        let status = self.apply_status(id, status, tags::NODE_UPDATE);
        if status.is_completed() {
            let others: Vec<NodeId> = self.nodes[id.index()]
                .parents
                .iter()
                .copied()
                .filter(|p| *p != parent && self.nodes[p.index()].started)
                .collect();
            self.deferred.extend(others);
        }
        status
    }

    /// Sweep update of a Running node.
    pub(crate) fn update_node(&mut self, id: NodeId) -> Status {
        let slot = &self.nodes[id.index()];
        if !slot.started || slot.is_busy() || slot.status != Status::Running {
            return slot.status;
        }
        let status = self.step(id, Step::Update, tags::NODE_UPDATE);
        if status.is_completed() {
            self.awake_parents(id);
        }
        status
    }

    pub(crate) fn awake(&mut self, id: NodeId) {
        if !self.contains(id) {
            self.unknown_node(id);
            return;
        }
        let slot = &self.nodes[id.index()];
        if !slot.started {
            tracing::trace!(node = %slot.guid, "ignoring awaken of idle node");
            return;
        }
        if slot.is_busy() {
            self.deferred.push_back(id);
            return;
        }
        let restarts = matches!(&slot.kind, NodeKind::Action(b) if b.restarts_on_awake());
        let status = if restarts {
            self.end_node(id);
            self.launch(id)
        } else {
            self.step(id, Step::Update, tags::NODE_AWAKE)
        };
        if status.is_completed() {
            self.awake_parents(id);
        }
    }

    /// Awakens every structural parent of a node that just resolved.
    pub(crate) fn awake_parents(&mut self, id: NodeId) {
        let parents = self.nodes[id.index()].parents.clone();
        for parent in parents {
            self.awake(parent);
        }
    }

    pub(crate) fn flush_deferred(&mut self) {
        while let Some(id) = self.deferred.pop_front() {
            self.awake(id);
        }
    }

    /// Runs the start or update hook of `id` and applies the result.
    fn step(&mut self, id: NodeId, step: Step, tag: &'static str) -> Status {
        let (guid, previous) = {
            let slot = &self.nodes[id.index()];
            (slot.guid, slot.status)
        };
        let children = self.nodes[id.index()].children.clone();
        let first = children.first().copied().flatten();
        let tick = self.env.tick;

        let mut kind = std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Busy);
        let status = match (&mut kind, step) {
            (NodeKind::Action(behavior), Step::Start) => {
                behavior.on_start(&mut NodeContext::new(&mut self.env, id, guid, previous))
            }
            (NodeKind::Action(behavior), Step::Update) => {
                behavior.on_update(&mut NodeContext::new(&mut self.env, id, guid, previous))
            }
            (NodeKind::Subgraph(subgraph), Step::Start) => subgraph.start(tick),
            (NodeKind::Subgraph(subgraph), Step::Update) => subgraph.update(tick),
            (NodeKind::Composite(composite), Step::Start) => {
                composite.start(&children, &mut Scope { module: self, node: id })
            }
            (NodeKind::Composite(composite), Step::Update) => {
                composite.update(&children, &mut Scope { module: self, node: id })
            }
            (NodeKind::Modifier(modifier), Step::Start) => {
                modifier.start(first, &mut Scope { module: self, node: id })
            }
            (NodeKind::Modifier(modifier), Step::Update) => {
                modifier.update(first, &mut Scope { module: self, node: id })
            }
            (NodeKind::Join(join), Step::Start) => {
                // Started directly rather than reached through a parent.
                join.reset();
                join.launched = true;
                pending_as_waiting(self.start_child(id, first))
            }
            (NodeKind::Join(join), Step::Update) => {
                if join.launched {
                    pending_as_waiting(first.map_or(Status::Success, |c| self.nodes[c.index()].status))
                } else {
                    Status::Waiting
                }
            }
            (NodeKind::Busy, _) => previous,
        };
        self.restore_kind(id, kind);
        self.apply_status(id, status, tag)
    }

    /// Records a hook's result: Running registers the node for sweeps,
    /// Waiting unregisters it, a terminal status ends it.
    fn apply_status(&mut self, id: NodeId, status: Status, tag: &'static str) -> Status {
        let status = if status == Status::Uninitialized {
            let guid = self.nodes[id.index()].guid;
            tracing::error!(node = %guid, "hook reported Uninitialized; treating as Failure");
            self.env.report(
                DiagnosticKind::InvalidStatus,
                guid,
                "hook reported Uninitialized",
            );
            Status::Failure
        } else {
            status
        };

        let slot = &mut self.nodes[id.index()];
        slot.status = status;
        let started = slot.started;
        self.trace(tag, id, status);
        if !started {
            return status;
        }
        match status {
            Status::Running => {
                if !self.active.contains(&id) {
                    self.active.push(id);
                }
            }
            Status::Waiting => self.active.retain(|n| *n != id),
            Status::Success | Status::Failure => self.end_node(id),
            Status::Uninitialized => {}
        }
        status
    }

    /// One sweep: update every node that was Running when it began.
    pub(crate) fn sweep(&mut self) {
        let snapshot = self.active.clone();
        for id in snapshot {
            if self.active.contains(&id) {
                self.update_node(id);
            }
        }
        self.flush_deferred();
    }

    /// Applies queued awakens and blackboard notifications until nothing new
    /// arrives or the pass budget is spent.
    pub(crate) fn drain(&mut self) {
        let passes = self.env.config.max_drain_passes.max(1);
        for _ in 0..passes {
            let mut work = 0;
            if let Err(err) = self.env.blackboards.poll() {
                tracing::warn!(graph = %self.guid, error = %err, "blackboard poll failed");
            }
            for notice in self.env.blackboards.take_notices() {
                work += 1;
                self.awake(NodeId(notice.token as u32));
            }
            for id in self.env.awakener.drain() {
                work += 1;
                self.awake(id);
            }
            self.flush_deferred();
            if work == 0 {
                break;
            }
        }
    }

    /// Pre-order walk from the root, each node once.
    pub(crate) fn tree_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            order.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev().flatten().copied());
        }
        order
    }

    fn unknown_node(&mut self, id: NodeId) {
        tracing::warn!(graph = %self.guid, node = %id, "no such node");
        let guid = self.guid;
        self.env.report(
            DiagnosticKind::UnknownNode,
            guid,
            format!("node {id} does not exist"),
        );
    }

    fn trace(&mut self, tag: &'static str, id: NodeId, status: Status) {
        let guid = self.nodes[id.index()].guid;
        tracing::debug!(node = %guid, event = tag, status = ?status);
        if self.env.trace.is_enabled() {
            let event = TraceEvent::new(self.env.tick.tick, tag)
                .with_a(id.0 as u64)
                .with_b(status.code());
            self.env.trace.emit(event);
        }
    }
}

fn pending_as_waiting(status: Status) -> Status {
    if status.is_pending() {
        Status::Waiting
    } else {
        status
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{Behavior, GraphBuilder};

    struct Leaf(Arc<Mutex<Vec<&'static str>>>);

    impl Behavior for Leaf {
        fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> Status {
            Status::Running
        }

        fn on_end(&mut self, _ctx: &mut NodeContext<'_>) {
            self.0.lock().unwrap().push("leaf:end");
        }
    }

    #[test]
    fn ending_a_busy_node_finishes_once_its_hook_returns() {
        let ended = Arc::new(Mutex::new(Vec::new()));
        let mut b = GraphBuilder::new("busy");
        let leaf = b.action("leaf", Leaf(ended.clone()));
        let root = b.sequence("root", [leaf]);
        let mut module = b.build(root).unwrap();
        module.start();
        assert!(module.is_running());

        // As if the root's own hook were still on the stack.
        let kind = std::mem::replace(&mut module.nodes[root.index()].kind, NodeKind::Busy);
        module.end_node(root);
        assert!(!module.nodes[root.index()].started);
        assert!(module.nodes[leaf.index()].started);
        assert!(ended.lock().unwrap().is_empty());
        assert_eq!(module.ending, vec![root]);

        module.restore_kind(root, kind);
        assert!(module.ending.is_empty());
        assert!(!module.nodes[leaf.index()].started);
        assert!(module.active_nodes().is_empty());
        assert_eq!(*ended.lock().unwrap(), vec!["leaf:end"]);
    }
}
