//! Behavior graph runtime built on `behavior-core`.
//!
//! A [`BehaviorGraphModule`] owns an arena of nodes (actions, composites,
//! modifiers and joins), its blackboards and the tick loop. Each tick applies
//! queued awakens and blackboard notifications, then updates every Running
//! node once. Nodes that finish outside their parent's own hook awaken the
//! parent, so waiting composites resume without being polled.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod actions;
pub mod agent;
pub mod behavior;
pub mod builder;
pub mod composite;
pub mod condition;
pub mod config;
pub mod context;
pub mod definition;
pub mod diagnostics;
pub mod error;
mod execution;
pub mod join;
pub mod modifier;
pub mod module;
pub mod node;
pub mod registry;
pub mod snapshot;
pub mod status;
pub mod subgraph;

pub use actions::{Log, SetVariable, Wait, WaitForChange};
pub use agent::{tick_agents, BehaviorAgent};
pub use behavior::{Behavior, NodeData};
pub use builder::GraphBuilder;
pub use composite::{CompositeKind, ParallelPolicy, Switch};
pub use condition::{check_conditions, Condition, ConditionSet, VariableChanged, VariableCondition};
pub use config::{AgentConfig, GraphConfig};
pub use context::{AwakeHandle, Awakener, NodeContext};
pub use definition::{GraphCatalog, GraphDefinition, NodeDefinition, NodeKindDefinition, ParamValue, VariableBinding};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{BuildError, GraphError, Result, SerializationError};
pub use join::JoinPolicy;
pub use modifier::{ModifierKind, RepeatMode};
pub use module::BehaviorGraphModule;
pub use node::{NodeId, NodeInfo, NodeKind, NodeRole};
pub use registry::{FactoryContext, NodeRegistry};
pub use snapshot::{
    GraphSerializer, HandleResolver, JsonSerializer, MapResolver, ModuleSnapshot, NodeSnapshot,
    ObjectResolver, SerializedValue, YamlSerializer,
};
pub use status::Status;
pub use subgraph::{RunSubgraph, VariableOverride};
