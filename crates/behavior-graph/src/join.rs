use serde::{Deserialize, Serialize};

use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinPolicy {
    /// Start the child once every parent has arrived.
    #[default]
    WaitForAll,
    /// Start the child on the first arrival.
    WaitForAny,
}

/// Merge point with several parents and one child.
#[derive(Debug, Clone, Default)]
pub struct Join {
    pub policy: JoinPolicy,
    pub(crate) arrived: Vec<NodeId>,
    pub(crate) launched: bool,
}

impl Join {
    pub fn new(policy: JoinPolicy) -> Self {
        Self {
            policy,
            arrived: Vec::new(),
            launched: false,
        }
    }

    pub fn arrived(&self) -> &[NodeId] {
        &self.arrived
    }

    /// Records an arrival; returns whether the child should start now.
    pub(crate) fn arrive(&mut self, parent: NodeId, parent_count: usize) -> bool {
        if !self.arrived.contains(&parent) {
            self.arrived.push(parent);
        }
        if self.launched {
            return false;
        }
        let ready = match self.policy {
            JoinPolicy::WaitForAll => self.arrived.len() >= parent_count,
            JoinPolicy::WaitForAny => true,
        };
        if ready {
            self.launched = true;
        }
        ready
    }

    pub(crate) fn reset(&mut self) {
        self.arrived.clear();
        self.launched = false;
    }
}
