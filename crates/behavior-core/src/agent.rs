use core::fmt::Debug;

/// Stable identifier for the agent that owns a graph module.
///
/// Agents are ticked in `stable_id` order so that multi-agent runs replay
/// identically.
pub trait AgentId: Copy + Ord + Eq + Debug {
    fn stable_id(self) -> u64;
}

impl AgentId for u64 {
    fn stable_id(self) -> u64 {
        self
    }
}

impl AgentId for u32 {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

impl AgentId for usize {
    fn stable_id(self) -> u64 {
        self as u64
    }
}
