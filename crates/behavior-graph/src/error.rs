use behavior_core::{BlackboardError, Guid};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::NodeId;

/// Structural problems found while building a module. A module that fails to
/// build is never constructed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("graph has no root node")]
    MissingRoot,

    #[error("root node {0} must not have a parent")]
    RootHasParent(Guid),

    #[error("unknown node {0}")]
    UnknownNode(Guid),

    #[error("node {0} was not created by this builder")]
    ForeignNode(NodeId),

    #[error("duplicate node guid {0}")]
    DuplicateNode(Guid),

    #[error("{role} node {node} needs {expected} children, has {found}")]
    Cardinality {
        node: Guid,
        role: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("node {node} has {count} parents; only joins may have more than one")]
    MultipleParents { node: Guid, count: usize },

    #[error("join node {0} has no parent")]
    OrphanJoin(Guid),

    #[error("cycle through node {0}")]
    Cycle(Guid),

    #[error("node {0} is not reachable from the root")]
    Unreachable(Guid),

    #[error("no action registered as `{0}`")]
    UnknownAction(String),

    #[error("no condition registered as `{0}`")]
    UnknownCondition(String),

    #[error("unknown graph {0}")]
    UnknownGraph(Guid),

    #[error("unknown blackboard asset {0}")]
    UnknownAsset(Guid),

    #[error("graph {0} runs itself as a subgraph")]
    RecursiveSubgraph(Guid),

    #[error("node {node}: parameter `{param}` {reason}")]
    InvalidParam {
        node: Guid,
        param: String,
        reason: String,
    },

    #[error("node {node}: variable `{variable}` is not on any blackboard")]
    UnboundVariable { node: Guid, variable: String },

    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("snapshot was taken from graph version {found}, module is version {expected}")]
    VersionMismatch {
        expected: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    #[error("snapshot is for graph {found}, module is graph {expected}")]
    GraphMismatch { expected: Guid, found: Guid },

    #[error("snapshot references unknown node {0}")]
    UnknownNode(Guid),

    #[error("snapshot has no state for node {0}")]
    MissingNode(Guid),

    #[error("snapshot has {found} blackboards, module has {expected}")]
    BoardCount { expected: usize, found: usize },

    #[error("snapshot references unknown variable {0}")]
    UnknownVariable(Guid),

    #[error("no object registered for id `{0}`")]
    UnresolvedObject(String),

    #[error("object handle {0} has no stable id")]
    UnregisteredObject(u64),

    #[error("node {0} has subgraph state but is not a subgraph")]
    UnexpectedSubgraph(Guid),

    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
