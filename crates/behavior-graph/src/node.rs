use core::fmt;

use behavior_core::Guid;
use serde::{Deserialize, Serialize};

use crate::composite::Composite;
use crate::join::Join;
use crate::modifier::Modifier;
use crate::subgraph::RunSubgraph;
use crate::{Behavior, Status};

/// Index of a node in its module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four structural roles a node can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Action,
    Composite,
    Modifier,
    Join,
}

impl NodeRole {
    pub fn label(self) -> &'static str {
        match self {
            NodeRole::Action => "action",
            NodeRole::Composite => "composite",
            NodeRole::Modifier => "modifier",
            NodeRole::Join => "join",
        }
    }
}

pub enum NodeKind {
    Action(Box<dyn Behavior>),
    Subgraph(RunSubgraph),
    Composite(Composite),
    Modifier(Modifier),
    Join(Join),
    /// Placeholder while the node's own hook is running.
    Busy,
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Action(_) => f.write_str("Action(..)"),
            NodeKind::Subgraph(s) => f.debug_tuple("Subgraph").field(s).finish(),
            NodeKind::Composite(c) => f.debug_tuple("Composite").field(c).finish(),
            NodeKind::Modifier(m) => f.debug_tuple("Modifier").field(m).finish(),
            NodeKind::Join(j) => f.debug_tuple("Join").field(j).finish(),
            NodeKind::Busy => f.write_str("Busy"),
        }
    }
}

impl NodeKind {
    pub fn role(&self) -> NodeRole {
        match self {
            NodeKind::Action(_) | NodeKind::Subgraph(_) | NodeKind::Busy => NodeRole::Action,
            NodeKind::Composite(_) => NodeRole::Composite,
            NodeKind::Modifier(_) => NodeRole::Modifier,
            NodeKind::Join(_) => NodeRole::Join,
        }
    }
}

#[derive(Debug)]
pub(crate) struct NodeSlot {
    pub guid: Guid,
    pub name: String,
    pub role: NodeRole,
    pub status: Status,
    pub started: bool,
    pub parents: Vec<NodeId>,
    pub children: Vec<Option<NodeId>>,
    pub kind: NodeKind,
}

impl NodeSlot {
    pub fn new(guid: Guid, name: String, kind: NodeKind, children: Vec<Option<NodeId>>) -> Self {
        Self {
            guid,
            name,
            role: kind.role(),
            status: Status::Uninitialized,
            started: false,
            parents: Vec::new(),
            children,
            kind,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.kind, NodeKind::Busy)
    }
}

/// Read-only view of a node.
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo<'a> {
    pub id: NodeId,
    pub guid: Guid,
    pub name: &'a str,
    pub status: Status,
    pub started: bool,
    pub role: NodeRole,
    pub parents: &'a [NodeId],
    pub children: &'a [Option<NodeId>],
}
