//! Suspending a module mid-run and reconstituting it later.
//!
//! A [`ModuleSnapshot`] captures node statuses, composite/modifier/join
//! bookkeeping, each action's own data, every blackboard value, the random
//! stream and any awakens that were still queued. Object handles are only
//! meaningful inside one session, so they go through an [`ObjectResolver`].

use std::collections::{BTreeMap, HashMap};

use behavior_core::{
    BlackboardValue, EnumValue, Guid, ObjectHandle, SplitMix64, VariableRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SerializationError;
use crate::modifier::ModifierKind;
use crate::node::NodeKind;
use crate::{BehaviorGraphModule, NodeContext, NodeData, NodeId, Status};

/// A blackboard value with object handles replaced by stable ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SerializedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum { type_name: String, ordinal: u32 },
    Object(Option<String>),
}

impl SerializedValue {
    pub fn encode(
        value: &BlackboardValue,
        resolver: &dyn ObjectResolver,
    ) -> Result<Self, SerializationError> {
        Ok(match value {
            BlackboardValue::Bool(b) => SerializedValue::Bool(*b),
            BlackboardValue::Int(i) => SerializedValue::Int(*i),
            BlackboardValue::Float(f) => SerializedValue::Float(*f),
            BlackboardValue::String(s) => SerializedValue::String(s.clone()),
            BlackboardValue::Enum(e) => SerializedValue::Enum {
                type_name: e.type_name.clone(),
                ordinal: e.ordinal,
            },
            BlackboardValue::Object(None) => SerializedValue::Object(None),
            BlackboardValue::Object(Some(handle)) => SerializedValue::Object(Some(
                resolver
                    .object_id(*handle)
                    .ok_or(SerializationError::UnregisteredObject(handle.0))?,
            )),
        })
    }

    pub fn decode(&self, resolver: &dyn ObjectResolver) -> Result<BlackboardValue, SerializationError> {
        Ok(match self {
            SerializedValue::Bool(b) => BlackboardValue::Bool(*b),
            SerializedValue::Int(i) => BlackboardValue::Int(*i),
            SerializedValue::Float(f) => BlackboardValue::Float(*f),
            SerializedValue::String(s) => BlackboardValue::String(s.clone()),
            SerializedValue::Enum { type_name, ordinal } => {
                BlackboardValue::Enum(EnumValue::new(type_name.clone(), *ordinal))
            }
            SerializedValue::Object(None) => BlackboardValue::Object(None),
            SerializedValue::Object(Some(id)) => BlackboardValue::Object(Some(
                resolver
                    .resolve(id)
                    .ok_or_else(|| SerializationError::UnresolvedObject(id.clone()))?,
            )),
        })
    }
}

/// Maps session-local object handles to stable ids and back.
pub trait ObjectResolver {
    fn object_id(&self, handle: ObjectHandle) -> Option<String>;
    fn resolve(&self, id: &str) -> Option<ObjectHandle>;
}

/// Resolver backed by an explicit handle/id table.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    ids: BTreeMap<ObjectHandle, String>,
    handles: BTreeMap<String, ObjectHandle>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: ObjectHandle, id: impl Into<String>) {
        let id = id.into();
        if let Some(old) = self.ids.insert(handle, id.clone()) {
            self.handles.remove(&old);
        }
        self.handles.insert(id, handle);
    }

    pub fn with(mut self, handle: ObjectHandle, id: impl Into<String>) -> Self {
        self.insert(handle, id);
        self
    }
}

impl ObjectResolver for MapResolver {
    fn object_id(&self, handle: ObjectHandle) -> Option<String> {
        self.ids.get(&handle).cloned()
    }

    fn resolve(&self, id: &str) -> Option<ObjectHandle> {
        self.handles.get(id).copied()
    }
}

/// Uses the handle number itself as the id. Only sound when handles are
/// stable across sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleResolver;

impl ObjectResolver for HandleResolver {
    fn object_id(&self, handle: ObjectHandle) -> Option<String> {
        Some(handle.0.to_string())
    }

    fn resolve(&self, id: &str) -> Option<ObjectHandle> {
        id.parse().ok().map(ObjectHandle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    pub guid: Guid,
    pub name: String,
    pub value: SerializedValue,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub variables: Vec<VariableSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub guid: Guid,
    pub status: Status,
    pub started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<usize>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub restart_pending: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrived: Vec<Guid>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub launched: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgraph: Option<Box<ModuleSnapshot>>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl NodeSnapshot {
    fn new(guid: Guid, status: Status, started: bool) -> Self {
        Self {
            guid,
            status,
            started,
            cursor: None,
            iterations: 0,
            restart_pending: false,
            arrived: Vec::new(),
            launched: false,
            data: BTreeMap::new(),
            subgraph: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub graph: Guid,
    pub version: DateTime<Utc>,
    pub tick: u64,
    pub rng_state: u64,
    /// Running nodes, in sweep order.
    pub active: Vec<Guid>,
    /// Awakens queued but not yet applied.
    #[serde(default)]
    pub pending_awakens: Vec<Guid>,
    /// One entry per node, in tree order.
    pub nodes: Vec<NodeSnapshot>,
    pub blackboards: Vec<BoardSnapshot>,
}

/// Text encoding of snapshots.
pub trait GraphSerializer {
    fn serialize(&self, snapshot: &ModuleSnapshot) -> Result<String, SerializationError>;
    fn deserialize(&self, text: &str) -> Result<ModuleSnapshot, SerializationError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pub pretty: bool,
}

impl GraphSerializer for JsonSerializer {
    fn serialize(&self, snapshot: &ModuleSnapshot) -> Result<String, SerializationError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(snapshot)?
        } else {
            serde_json::to_string(snapshot)?
        };
        Ok(text)
    }

    fn deserialize(&self, text: &str) -> Result<ModuleSnapshot, SerializationError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl GraphSerializer for YamlSerializer {
    fn serialize(&self, snapshot: &ModuleSnapshot) -> Result<String, SerializationError> {
        Ok(serde_yaml::to_string(snapshot)?)
    }

    fn deserialize(&self, text: &str) -> Result<ModuleSnapshot, SerializationError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

impl BehaviorGraphModule {
    /// Captures the module's execution state.
    ///
    /// Action `on_serialize` hooks run in tree order.
    pub fn snapshot(&self, resolver: &dyn ObjectResolver) -> Result<ModuleSnapshot, SerializationError> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for id in self.tree_order() {
            let slot = &self.nodes[id.index()];
            let mut node = NodeSnapshot::new(slot.guid, slot.status, slot.started);
            match &slot.kind {
                NodeKind::Action(behavior) => {
                    let mut data = NodeData::new();
                    behavior.on_serialize(&mut data);
                    for (key, value) in data.iter() {
                        node.data
                            .insert(key.clone(), SerializedValue::encode(value, resolver)?);
                    }
                }
                NodeKind::Subgraph(subgraph) => {
                    node.subgraph = Some(Box::new(subgraph.module().snapshot(resolver)?));
                }
                NodeKind::Composite(composite) => node.cursor = composite.cursor,
                NodeKind::Modifier(modifier) => {
                    node.iterations = modifier.iterations;
                    node.restart_pending = modifier.restart_pending;
                }
                NodeKind::Join(join) => {
                    node.arrived = join
                        .arrived
                        .iter()
                        .map(|p| self.nodes[p.index()].guid)
                        .collect();
                    node.launched = join.launched;
                }
                NodeKind::Busy => {}
            }
            nodes.push(node);
        }

        let mut blackboards = Vec::new();
        for reference in self.env.blackboards.references() {
            let mut board = BoardSnapshot::default();
            for var in reference.blackboard().variables() {
                board.variables.push(VariableSnapshot {
                    guid: var.guid(),
                    name: var.name().to_string(),
                    value: SerializedValue::encode(&var.value()?, resolver)?,
                });
            }
            blackboards.push(board);
        }

        let guid_of = |id: &NodeId| self.nodes.get(id.index()).map(|slot| slot.guid);
        let pending_awakens = self
            .env
            .awakener
            .queued()
            .iter()
            .chain(self.deferred.iter())
            .filter_map(guid_of)
            .collect();

        Ok(ModuleSnapshot {
            graph: self.guid,
            version: self.version,
            tick: self.env.tick.tick,
            rng_state: self.env.rng.state(),
            active: self.active.iter().filter_map(guid_of).collect(),
            pending_awakens,
            nodes,
            blackboards,
        })
    }

    /// Reconstitutes state captured by [`BehaviorGraphModule::snapshot`].
    ///
    /// The snapshot must come from the same graph version with exactly the
    /// same node set. Everything, nested subgraph snapshots included, is
    /// decoded and checked before the module is touched; on error the module
    /// is left as it was. A run in progress is then ended. Blackboard values
    /// are restored without notifying listeners and `on_deserialize` hooks
    /// run in tree order so waiting leaves can re-issue their requests.
    pub fn restore(
        &mut self,
        snapshot: &ModuleSnapshot,
        resolver: &dyn ObjectResolver,
    ) -> Result<(), SerializationError> {
        let plan = self.plan_restore(snapshot, resolver)?;
        self.apply_restore(plan);
        Ok(())
    }

    fn plan_restore<'s>(
        &self,
        snapshot: &'s ModuleSnapshot,
        resolver: &dyn ObjectResolver,
    ) -> Result<RestorePlan<'s>, SerializationError> {
        if snapshot.graph != self.guid {
            return Err(SerializationError::GraphMismatch {
                expected: self.guid,
                found: snapshot.graph,
            });
        }
        if snapshot.version != self.version {
            return Err(SerializationError::VersionMismatch {
                expected: self.version,
                found: snapshot.version,
            });
        }

        let ids: HashMap<Guid, NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.guid, NodeId(i as u32)))
            .collect();
        let id_of = |guid: &Guid| ids.get(guid).copied().ok_or(SerializationError::UnknownNode(*guid));

        let mut states: HashMap<NodeId, &NodeSnapshot> = HashMap::new();
        for node in &snapshot.nodes {
            states.insert(id_of(&node.guid)?, node);
        }
        if let Some(missing) = self
            .nodes
            .iter()
            .find(|slot| !snapshot.nodes.iter().any(|n| n.guid == slot.guid))
        {
            return Err(SerializationError::MissingNode(missing.guid));
        }

        let references = self.env.blackboards.references();
        if references.len() != snapshot.blackboards.len() {
            return Err(SerializationError::BoardCount {
                expected: references.len(),
                found: snapshot.blackboards.len(),
            });
        }
        let mut values = Vec::new();
        for (board, (reference, saved)) in references.iter().zip(&snapshot.blackboards).enumerate() {
            for var in &saved.variables {
                let (index, variable) = reference
                    .blackboard()
                    .index_of(var.guid)
                    .and_then(|i| Some((i, reference.blackboard().variable(i)?)))
                    .ok_or(SerializationError::UnknownVariable(var.guid))?;
                let value = var.value.decode(resolver)?;
                variable.check_type(&value)?;
                values.push((VariableRef::new(board as u16, index as u32), value));
            }
        }

        let mut node_data = HashMap::new();
        let mut arrivals = HashMap::new();
        let mut children = HashMap::new();
        for (id, state) in &states {
            if !state.data.is_empty() {
                let data = state
                    .data
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.decode(resolver)?)))
                    .collect::<Result<NodeData, SerializationError>>()?;
                node_data.insert(*id, data);
            }
            if !state.arrived.is_empty() {
                let arrived = state.arrived.iter().map(id_of).collect::<Result<Vec<_>, _>>()?;
                arrivals.insert(*id, arrived);
            }
            if let Some(child) = &state.subgraph {
                let NodeKind::Subgraph(subgraph) = &self.nodes[id.index()].kind else {
                    return Err(SerializationError::UnexpectedSubgraph(state.guid));
                };
                children.insert(*id, subgraph.module().plan_restore(child, resolver)?);
            }
        }
        let active = snapshot.active.iter().map(id_of).collect::<Result<Vec<_>, _>>()?;
        let pending = snapshot
            .pending_awakens
            .iter()
            .map(id_of)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RestorePlan {
            states,
            values,
            node_data,
            arrivals,
            children,
            active,
            pending,
            tick: snapshot.tick,
            rng_state: snapshot.rng_state,
        })
    }

    fn apply_restore(&mut self, plan: RestorePlan<'_>) {
        let RestorePlan {
            states,
            values,
            mut node_data,
            mut arrivals,
            mut children,
            active,
            pending,
            tick,
            rng_state,
        } = plan;

        self.end();
        self.active.clear();
        self.deferred.clear();
        self.ending.clear();
        self.env.awakener.drain();

        for (var, value) in values {
            // Types were checked while planning; only a poisoned cell fails here.
            if let Err(err) = self.env.blackboards.restore(var, value) {
                tracing::error!(graph = %self.guid, error = %err, "blackboard value not restored");
            }
        }
        self.env.rng = SplitMix64::new(rng_state);
        self.env.tick.tick = tick;

        for (id, state) in &states {
            let slot = &mut self.nodes[id.index()];
            slot.status = state.status;
            slot.started = state.started;
            match &mut slot.kind {
                NodeKind::Composite(composite) => composite.cursor = state.cursor,
                NodeKind::Modifier(modifier) => {
                    modifier.iterations = state.iterations;
                    modifier.restart_pending = state.restart_pending;
                }
                NodeKind::Join(join) => {
                    join.arrived = arrivals.remove(id).unwrap_or_default();
                    join.launched = state.launched;
                }
                _ => {}
            }
        }
        self.active = active;

        for id in self.tree_order() {
            if !states.contains_key(&id) {
                continue;
            }
            let (guid, status, started) = {
                let slot = &self.nodes[id.index()];
                (slot.guid, slot.status, slot.started)
            };
            let mut kind = std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Busy);
            match &mut kind {
                NodeKind::Action(behavior) => {
                    let data = node_data.remove(&id).unwrap_or_default();
                    behavior.on_deserialize(&mut NodeContext::new(&mut self.env, id, guid, status), &data);
                }
                NodeKind::Subgraph(subgraph) => {
                    if let Some(child) = children.remove(&id) {
                        subgraph.module_mut().apply_restore(child);
                    }
                }
                NodeKind::Modifier(modifier) if started => {
                    if let ModifierKind::Abort(conditions) | ModifierKind::Restart(conditions) =
                        &mut modifier.kind
                    {
                        conditions.start(&mut NodeContext::new(&mut self.env, id, guid, status));
                    }
                }
                _ => {}
            }
            self.restore_kind(id, kind);
        }

        for id in pending {
            self.env.awakener.awake(id);
        }
        tracing::debug!(graph = %self.guid, tick, "restored graph state");
    }

    /// Snapshot encoded with `serializer`.
    pub fn save(
        &self,
        serializer: &dyn GraphSerializer,
        resolver: &dyn ObjectResolver,
    ) -> Result<String, SerializationError> {
        serializer.serialize(&self.snapshot(resolver)?)
    }

    pub fn load(
        &mut self,
        text: &str,
        serializer: &dyn GraphSerializer,
        resolver: &dyn ObjectResolver,
    ) -> Result<(), SerializationError> {
        let snapshot = serializer.deserialize(text)?;
        self.restore(&snapshot, resolver)
    }
}

/// A snapshot decoded and checked against one module, ready to apply.
struct RestorePlan<'s> {
    states: HashMap<NodeId, &'s NodeSnapshot>,
    values: Vec<(VariableRef, BlackboardValue)>,
    node_data: HashMap<NodeId, NodeData>,
    arrivals: HashMap<NodeId, Vec<NodeId>>,
    children: HashMap<NodeId, RestorePlan<'s>>,
    active: Vec<NodeId>,
    pending: Vec<NodeId>,
    tick: u64,
    rng_state: u64,
}
