//! Serializable graph descriptions and the catalog that builds modules from
//! them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use behavior_core::{
    BlackboardAsset, BlackboardReference, BlackboardSet, BlackboardValue, Guid, VariableDefinition,
    VariableRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::GraphBuilder;
use crate::composite::{Composite, CompositeKind, ParallelPolicy, Switch};
use crate::condition::ConditionSet;
use crate::error::{BuildError, GraphError, SerializationError};
use crate::join::{Join, JoinPolicy};
use crate::modifier::{Modifier, ModifierKind, RepeatMode};
use crate::node::NodeKind;
use crate::registry::{FactoryContext, NodeRegistry};
use crate::subgraph::{RunSubgraph, VariableOverride};
use crate::{BehaviorGraphModule, GraphConfig, NodeId, Status};

/// Refers to a blackboard variable by GUID (preferred) or by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl VariableBinding {
    pub fn by_guid(guid: Guid) -> Self {
        Self {
            guid: Some(guid),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            guid: None,
            name: Some(name.into()),
        }
    }

    pub fn resolve(&self, boards: &BlackboardSet) -> Option<VariableRef> {
        self.guid
            .and_then(|guid| boards.find(guid))
            .or_else(|| self.name.as_deref().and_then(|name| boards.find_by_name(name)))
    }
}

impl fmt::Display for VariableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.guid, &self.name) {
            (_, Some(name)) => f.write_str(name),
            (Some(guid), None) => write!(f, "{guid}"),
            (None, None) => f.write_str("<unbound>"),
        }
    }
}

/// A node parameter: a literal or a variable binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Variable { variable: VariableBinding },
}

impl ParamValue {
    pub fn literal(&self) -> Option<BlackboardValue> {
        match self {
            ParamValue::Bool(b) => Some(BlackboardValue::Bool(*b)),
            ParamValue::Int(i) => Some(BlackboardValue::Int(*i)),
            ParamValue::Float(f) => Some(BlackboardValue::Float(*f)),
            ParamValue::Text(s) => Some(BlackboardValue::String(s.clone())),
            ParamValue::Variable { .. } => None,
        }
    }
}

pub type Params = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub condition: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSetDefinition {
    #[serde(default = "require_all_default")]
    pub require_all: bool,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
}

fn require_all_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideDefinition {
    pub caller: VariableBinding,
    pub callee: VariableBinding,
}

fn success() -> Status {
    Status::Success
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKindDefinition {
    Action {
        action: String,
        #[serde(default)]
        params: Params,
    },
    Subgraph {
        graph: Guid,
        #[serde(default)]
        overrides: Vec<OverrideDefinition>,
        /// Bind callee variables to caller variables of the same name and type.
        #[serde(default)]
        auto_bind: bool,
    },
    Sequence,
    Selector,
    Parallel {
        policy: ParallelPolicy,
    },
    Random,
    Switch {
        variable: VariableBinding,
        #[serde(default = "success")]
        default_status: Status,
    },
    Branch {
        conditions: ConditionSetDefinition,
    },
    Inverter,
    ForceSuccess,
    ForceFailure,
    Repeat {
        mode: RepeatMode,
    },
    Abort {
        conditions: ConditionSetDefinition,
    },
    Restart {
        conditions: ConditionSetDefinition,
    },
    Join {
        #[serde(default)]
        policy: JoinPolicy,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub guid: Guid,
    #[serde(default)]
    pub name: String,
    pub kind: NodeKindDefinition,
    /// Child slots in order; `null` marks an empty slot.
    #[serde(default)]
    pub children: Vec<Option<Guid>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub guid: Guid,
    pub name: String,
    #[serde(default)]
    pub version: DateTime<Utc>,
    /// Asset the primary blackboard is instantiated from.
    #[serde(default)]
    pub blackboard: Option<Guid>,
    /// Assets of the group blackboards, in board order.
    #[serde(default)]
    pub groups: Vec<Guid>,
    pub root: Guid,
    pub nodes: Vec<NodeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDefinition {
    pub guid: Guid,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    assets: Vec<AssetDefinition>,
    #[serde(default)]
    graphs: Vec<GraphDefinition>,
}

/// Graph definitions plus the blackboard assets they instantiate.
///
/// Assets are created once and shared by every module built from the
/// catalog, which is what makes shared variables shared.
#[derive(Debug, Default)]
pub struct GraphCatalog {
    graphs: BTreeMap<Guid, GraphDefinition>,
    assets: BTreeMap<Guid, Arc<BlackboardAsset>>,
}

impl GraphCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, GraphError> {
        let doc: CatalogDocument =
            serde_yaml::from_str(content).map_err(SerializationError::from)?;
        Self::from_document(doc)
    }

    pub fn from_json_str(content: &str) -> Result<Self, GraphError> {
        let doc: CatalogDocument =
            serde_json::from_str(content).map_err(SerializationError::from)?;
        Self::from_document(doc)
    }

    fn from_document(doc: CatalogDocument) -> Result<Self, GraphError> {
        let mut catalog = Self::new();
        for asset in doc.assets {
            catalog.add_asset(asset)?;
        }
        for graph in doc.graphs {
            catalog.add_graph(graph);
        }
        Ok(catalog)
    }

    pub fn add_graph(&mut self, graph: GraphDefinition) {
        self.graphs.insert(graph.guid, graph);
    }

    pub fn add_asset(&mut self, asset: AssetDefinition) -> Result<Arc<BlackboardAsset>, BuildError> {
        let asset = Arc::new(BlackboardAsset::new(asset.guid, asset.name, asset.variables)?);
        self.assets.insert(asset.guid(), Arc::clone(&asset));
        Ok(asset)
    }

    pub fn insert_asset(&mut self, asset: Arc<BlackboardAsset>) {
        self.assets.insert(asset.guid(), asset);
    }

    pub fn graph(&self, guid: Guid) -> Option<&GraphDefinition> {
        self.graphs.get(&guid)
    }

    pub fn graphs(&self) -> impl Iterator<Item = &GraphDefinition> {
        self.graphs.values()
    }

    pub fn asset(&self, guid: Guid) -> Option<&Arc<BlackboardAsset>> {
        self.assets.get(&guid)
    }

    fn reference(&self, guid: Guid) -> Result<BlackboardReference, BuildError> {
        let asset = self.asset(guid).ok_or(BuildError::UnknownAsset(guid))?;
        Ok(BlackboardReference::from_asset(Arc::clone(asset))?)
    }
}

impl BehaviorGraphModule {
    /// Builds a fresh instance of a catalog graph.
    pub fn from_definition(
        catalog: &GraphCatalog,
        graph: Guid,
        registry: &NodeRegistry,
        config: &GraphConfig,
    ) -> Result<Self, BuildError> {
        let mut stack = Vec::new();
        build_graph(catalog, graph, registry, config, &mut stack)
    }
}

fn build_graph(
    catalog: &GraphCatalog,
    guid: Guid,
    registry: &NodeRegistry,
    config: &GraphConfig,
    stack: &mut Vec<Guid>,
) -> Result<BehaviorGraphModule, BuildError> {
    let def = catalog.graph(guid).ok_or(BuildError::UnknownGraph(guid))?;
    if stack.contains(&guid) {
        return Err(BuildError::RecursiveSubgraph(guid));
    }
    stack.push(guid);

    let mut builder = GraphBuilder::with_guid(def.guid, def.name.clone())
        .version(def.version)
        .config(config.clone());
    if let Some(asset) = def.blackboard {
        builder = builder.blackboard(catalog.reference(asset)?);
    }
    for group in &def.groups {
        builder.group(catalog.reference(*group)?);
    }

    let mut ids: BTreeMap<Guid, NodeId> = BTreeMap::new();
    for node in &def.nodes {
        if ids.contains_key(&node.guid) {
            return Err(BuildError::DuplicateNode(node.guid));
        }
        let kind = node_kind(catalog, node, registry, config, stack, builder.blackboards())?;
        let id = builder.node_with_guid(node.guid, node.name.clone(), kind, Vec::new());
        ids.insert(node.guid, id);
    }
    for node in &def.nodes {
        let children = node
            .children
            .iter()
            .map(|child| match child {
                Some(guid) => ids.get(guid).copied().map(Some).ok_or(BuildError::UnknownNode(*guid)),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;
        builder.set_children(ids[&node.guid], children);
    }
    let root = ids
        .get(&def.root)
        .copied()
        .ok_or(BuildError::UnknownNode(def.root))?;

    stack.pop();
    builder.build(root)
}

fn node_kind(
    catalog: &GraphCatalog,
    node: &NodeDefinition,
    registry: &NodeRegistry,
    config: &GraphConfig,
    stack: &mut Vec<Guid>,
    boards: &BlackboardSet,
) -> Result<NodeKind, BuildError> {
    let bind = |binding: &VariableBinding| {
        binding.resolve(boards).ok_or_else(|| BuildError::UnboundVariable {
            node: node.guid,
            variable: binding.to_string(),
        })
    };
    let conditions = |def: &ConditionSetDefinition| -> Result<ConditionSet, BuildError> {
        let mut set = if def.require_all {
            ConditionSet::all()
        } else {
            ConditionSet::any()
        };
        for condition in &def.conditions {
            let ctx = FactoryContext::new(node.guid, &condition.params, boards);
            set.push(registry.create_condition(&condition.condition, &ctx)?);
        }
        Ok(set)
    };
    let composite = |kind| NodeKind::Composite(Composite::new(kind));
    let modifier = |kind| NodeKind::Modifier(Modifier::new(kind));

    Ok(match &node.kind {
        NodeKindDefinition::Action { action, params } => {
            let ctx = FactoryContext::new(node.guid, params, boards);
            NodeKind::Action(registry.create_action(action, &ctx)?)
        }
        NodeKindDefinition::Subgraph {
            graph,
            overrides,
            auto_bind,
        } => {
            let module = build_graph(catalog, *graph, registry, config, stack)?;
            let mut subgraph = RunSubgraph::new(module);
            if *auto_bind {
                subgraph.auto_bind(boards)?;
            }
            let resolved = overrides
                .iter()
                .map(|o| {
                    let callee = o.callee.resolve(subgraph.module().blackboards()).ok_or_else(|| {
                        BuildError::UnboundVariable {
                            node: node.guid,
                            variable: o.callee.to_string(),
                        }
                    })?;
                    Ok(VariableOverride {
                        caller: bind(&o.caller)?,
                        callee,
                    })
                })
                .collect::<Result<Vec<_>, BuildError>>()?;
            subgraph.apply_overrides(boards, &resolved)?;
            NodeKind::Subgraph(subgraph)
        }
        NodeKindDefinition::Sequence => composite(CompositeKind::Sequence),
        NodeKindDefinition::Selector => composite(CompositeKind::Selector),
        NodeKindDefinition::Parallel { policy } => composite(CompositeKind::Parallel(*policy)),
        NodeKindDefinition::Random => composite(CompositeKind::Random),
        NodeKindDefinition::Switch {
            variable,
            default_status,
        } => composite(CompositeKind::Switch(Switch {
            variable: bind(variable)?,
            default_status: *default_status,
        })),
        NodeKindDefinition::Branch { conditions: def } => {
            composite(CompositeKind::Branch(conditions(def)?))
        }
        NodeKindDefinition::Inverter => modifier(ModifierKind::Inverter),
        NodeKindDefinition::ForceSuccess => modifier(ModifierKind::ForceSuccess),
        NodeKindDefinition::ForceFailure => modifier(ModifierKind::ForceFailure),
        NodeKindDefinition::Repeat { mode } => modifier(ModifierKind::Repeat(*mode)),
        NodeKindDefinition::Abort { conditions: def } => {
            modifier(ModifierKind::Abort(conditions(def)?))
        }
        NodeKindDefinition::Restart { conditions: def } => {
            modifier(ModifierKind::Restart(conditions(def)?))
        }
        NodeKindDefinition::Join { policy } => NodeKind::Join(Join::new(*policy)),
    })
}
