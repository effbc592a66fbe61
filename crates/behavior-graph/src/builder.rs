//! Programmatic graph construction and structural validation.
//!
//! Nodes are added bottom-up and referenced by the [`NodeId`] the builder
//! hands back. Unless a GUID is given explicitly, node and variable GUIDs are
//! derived from the graph GUID, so rebuilding the same graph yields the same
//! identities and snapshots taken from one build restore onto the next.

use behavior_core::{
    Blackboard, BlackboardReference, BlackboardSet, BlackboardValue, BlackboardVariable, Guid,
    VariableRef,
};
use chrono::{DateTime, Utc};

use crate::composite::{Composite, CompositeKind, ParallelPolicy, Switch};
use crate::condition::ConditionSet;
use crate::error::BuildError;
use crate::join::{Join, JoinPolicy};
use crate::modifier::{Modifier, ModifierKind, RepeatMode};
use crate::node::{NodeKind, NodeRole, NodeSlot};
use crate::subgraph::RunSubgraph;
use crate::{Behavior, BehaviorGraphModule, GraphConfig, NodeId};

// Variable GUIDs are derived on a separate stream from node GUIDs.
const VARIABLE_STREAM: u64 = 1 << 40;

pub struct GraphBuilder {
    guid: Guid,
    name: String,
    version: DateTime<Utc>,
    config: GraphConfig,
    nodes: Vec<NodeSlot>,
    blackboards: BlackboardSet,
    next_variable: u64,
    deferred_error: Option<BuildError>,
}

impl GraphBuilder {
    /// A builder whose graph GUID is derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let guid = Guid::derive(Guid::NIL, fnv1a(name.as_bytes()));
        Self::with_guid(guid, name)
    }

    pub fn with_guid(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            version: DateTime::<Utc>::default(),
            config: GraphConfig::default(),
            nodes: Vec::new(),
            blackboards: BlackboardSet::default(),
            next_variable: 0,
            deferred_error: None,
        }
    }

    pub fn version(mut self, version: DateTime<Utc>) -> Self {
        self.version = version;
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Replaces the primary blackboard. Variables added earlier are dropped
    /// with the old one.
    pub fn blackboard(mut self, primary: BlackboardReference) -> Self {
        self.blackboards.set_primary(primary);
        self
    }

    /// Adds a group blackboard and returns its board number.
    pub fn group(&mut self, group: BlackboardReference) -> u16 {
        self.blackboards.push_group(group)
    }

    pub fn blackboards(&self) -> &BlackboardSet {
        &self.blackboards
    }

    /// Declares a variable on the primary blackboard.
    pub fn variable(&mut self, name: impl Into<String>, value: impl Into<BlackboardValue>) -> VariableRef {
        let guid = Guid::derive(self.guid, VARIABLE_STREAM + self.next_variable);
        self.next_variable += 1;
        self.variable_with_guid(guid, name, value)
    }

    pub fn variable_with_guid(
        &mut self,
        guid: Guid,
        name: impl Into<String>,
        value: impl Into<BlackboardValue>,
    ) -> VariableRef {
        if self.blackboards.primary().is_none() {
            self.blackboards
                .set_primary(BlackboardReference::detached(Blackboard::new()));
        }
        let var = BlackboardVariable::new(guid, name, value.into());
        let added = match self.blackboards.primary_mut() {
            Some(primary) => primary.blackboard_mut().add(var),
            None => Ok(0),
        };
        match added {
            Ok(index) => VariableRef::primary(index as u32),
            Err(err) => {
                self.deferred_error.get_or_insert(err.into());
                VariableRef::primary(u32::MAX)
            }
        }
    }

    /// First variable called `name`, primary board first.
    pub fn var(&self, name: &str) -> Option<VariableRef> {
        self.blackboards.find_by_name(name)
    }

    pub fn node(&mut self, name: impl Into<String>, kind: NodeKind, children: Vec<Option<NodeId>>) -> NodeId {
        let guid = Guid::derive(self.guid, self.nodes.len() as u64);
        self.node_with_guid(guid, name, kind, children)
    }

    pub fn node_with_guid(
        &mut self,
        guid: Guid,
        name: impl Into<String>,
        kind: NodeKind,
        children: Vec<Option<NodeId>>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot::new(guid, name.into(), kind, children));
        id
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<Option<NodeId>>) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            slot.children = children;
        }
    }

    pub fn action(&mut self, name: impl Into<String>, behavior: impl Behavior) -> NodeId {
        self.node(name, NodeKind::Action(Box::new(behavior)), Vec::new())
    }

    pub fn boxed_action(&mut self, name: impl Into<String>, behavior: Box<dyn Behavior>) -> NodeId {
        self.node(name, NodeKind::Action(behavior), Vec::new())
    }

    pub fn subgraph(&mut self, name: impl Into<String>, subgraph: RunSubgraph) -> NodeId {
        self.node(name, NodeKind::Subgraph(subgraph), Vec::new())
    }

    pub fn composite(
        &mut self,
        name: impl Into<String>,
        kind: CompositeKind,
        slots: Vec<Option<NodeId>>,
    ) -> NodeId {
        self.node(name, NodeKind::Composite(Composite::new(kind)), slots)
    }

    pub fn sequence(&mut self, name: impl Into<String>, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.composite(name, CompositeKind::Sequence, filled(children))
    }

    pub fn selector(&mut self, name: impl Into<String>, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.composite(name, CompositeKind::Selector, filled(children))
    }

    pub fn parallel(
        &mut self,
        name: impl Into<String>,
        policy: ParallelPolicy,
        children: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.composite(name, CompositeKind::Parallel(policy), filled(children))
    }

    pub fn random(&mut self, name: impl Into<String>, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.composite(name, CompositeKind::Random, filled(children))
    }

    /// Slot `i` runs when the switch variable's ordinal is `i`.
    pub fn switch(&mut self, name: impl Into<String>, switch: Switch, slots: Vec<Option<NodeId>>) -> NodeId {
        self.composite(name, CompositeKind::Switch(switch), slots)
    }

    pub fn branch(
        &mut self,
        name: impl Into<String>,
        conditions: ConditionSet,
        when_true: Option<NodeId>,
        when_false: Option<NodeId>,
    ) -> NodeId {
        self.composite(name, CompositeKind::Branch(conditions), vec![when_true, when_false])
    }

    pub fn modifier(&mut self, name: impl Into<String>, kind: ModifierKind, child: NodeId) -> NodeId {
        self.node(name, NodeKind::Modifier(Modifier::new(kind)), vec![Some(child)])
    }

    pub fn inverter(&mut self, name: impl Into<String>, child: NodeId) -> NodeId {
        self.modifier(name, ModifierKind::Inverter, child)
    }

    pub fn force_success(&mut self, name: impl Into<String>, child: NodeId) -> NodeId {
        self.modifier(name, ModifierKind::ForceSuccess, child)
    }

    pub fn force_failure(&mut self, name: impl Into<String>, child: NodeId) -> NodeId {
        self.modifier(name, ModifierKind::ForceFailure, child)
    }

    pub fn repeat(&mut self, name: impl Into<String>, mode: RepeatMode, child: NodeId) -> NodeId {
        self.modifier(name, ModifierKind::Repeat(mode), child)
    }

    pub fn abort(&mut self, name: impl Into<String>, conditions: ConditionSet, child: NodeId) -> NodeId {
        self.modifier(name, ModifierKind::Abort(conditions), child)
    }

    pub fn restart(&mut self, name: impl Into<String>, conditions: ConditionSet, child: NodeId) -> NodeId {
        self.modifier(name, ModifierKind::Restart(conditions), child)
    }

    /// A join may be listed as the child of several parents.
    pub fn join(&mut self, name: impl Into<String>, policy: JoinPolicy, child: NodeId) -> NodeId {
        self.node(name, NodeKind::Join(Join::new(policy)), vec![Some(child)])
    }

    /// Validates the graph rooted at `root` and assembles the module.
    pub fn build(mut self, root: NodeId) -> Result<BehaviorGraphModule, BuildError> {
        if let Some(err) = self.deferred_error.take() {
            return Err(err);
        }
        validate(&mut self.nodes, root)?;
        tracing::debug!(
            graph = %self.guid,
            name = %self.name,
            nodes = self.nodes.len(),
            "built behavior graph"
        );
        Ok(BehaviorGraphModule::assemble(
            self.guid,
            self.name,
            self.version,
            self.nodes,
            root,
            self.blackboards,
            self.config,
        ))
    }
}

fn filled(children: impl IntoIterator<Item = NodeId>) -> Vec<Option<NodeId>> {
    children.into_iter().map(Some).collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Checks the structural rules and fills in parent lists.
fn validate(nodes: &mut [NodeSlot], root: NodeId) -> Result<(), BuildError> {
    if nodes.is_empty() {
        return Err(BuildError::MissingRoot);
    }
    if root.index() >= nodes.len() {
        return Err(BuildError::ForeignNode(root));
    }

    for (i, slot) in nodes.iter().enumerate() {
        if nodes[..i].iter().any(|other| other.guid == slot.guid) {
            return Err(BuildError::DuplicateNode(slot.guid));
        }
        if let Some(child) = slot
            .children
            .iter()
            .flatten()
            .find(|c| c.index() >= nodes.len())
        {
            return Err(BuildError::ForeignNode(*child));
        }
        check_cardinality(slot)?;
    }

    let mut parents = vec![Vec::new(); nodes.len()];
    for (i, slot) in nodes.iter().enumerate() {
        for child in slot.children.iter().flatten() {
            parents[child.index()].push(NodeId(i as u32));
        }
    }
    for (i, (slot, parents)) in nodes.iter().zip(&parents).enumerate() {
        if i == root.index() {
            if !parents.is_empty() {
                return Err(BuildError::RootHasParent(slot.guid));
            }
            continue;
        }
        match slot.role {
            NodeRole::Join if parents.is_empty() => return Err(BuildError::OrphanJoin(slot.guid)),
            NodeRole::Join => {}
            _ if parents.len() > 1 => {
                return Err(BuildError::MultipleParents {
                    node: slot.guid,
                    count: parents.len(),
                })
            }
            _ => {}
        }
    }

    if let Some(node) = find_cycle(nodes) {
        return Err(BuildError::Cycle(nodes[node].guid));
    }

    let mut reached = vec![false; nodes.len()];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if std::mem::replace(&mut reached[id.index()], true) {
            continue;
        }
        stack.extend(nodes[id.index()].children.iter().flatten().copied());
    }
    if let Some(i) = reached.iter().position(|r| !r) {
        return Err(BuildError::Unreachable(nodes[i].guid));
    }

    for (slot, parents) in nodes.iter_mut().zip(parents) {
        slot.parents = parents;
    }
    Ok(())
}

fn check_cardinality(slot: &NodeSlot) -> Result<(), BuildError> {
    let found = slot.children.len();
    let (ok, expected) = match &slot.kind {
        NodeKind::Action(_) | NodeKind::Subgraph(_) | NodeKind::Busy => (found == 0, "no"),
        NodeKind::Modifier(_) | NodeKind::Join(_) => {
            (found == 1 && slot.children[0].is_some(), "exactly one")
        }
        NodeKind::Composite(Composite {
            kind: CompositeKind::Branch(_),
            ..
        }) => (found <= 2, "at most two"),
        NodeKind::Composite(_) => (true, "any number of"),
    };
    if ok {
        Ok(())
    } else {
        Err(BuildError::Cardinality {
            node: slot.guid,
            role: slot.role.label(),
            expected,
            found,
        })
    }
}

/// Index of a node on a cycle, if any.
fn find_cycle(nodes: &[NodeSlot]) -> Option<usize> {
    // 0 = unvisited, 1 = on the current path, 2 = done
    let mut color = vec![0u8; nodes.len()];
    for start in 0..nodes.len() {
        if color[start] != 0 {
            continue;
        }
        color[start] = 1;
        let mut stack = vec![(start, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (node, pos) = *top;
            if pos < nodes[node].children.len() {
                top.1 += 1;
                let Some(child) = nodes[node].children[pos] else {
                    continue;
                };
                match color[child.index()] {
                    0 => {
                        color[child.index()] = 1;
                        stack.push((child.index(), 0));
                    }
                    1 => return Some(child.index()),
                    _ => {}
                }
            } else {
                color[node] = 2;
                stack.pop();
            }
        }
    }
    None
}
