//! Runtime configuration for graph modules and agents.

use std::path::Path;

use anyhow::{Context, Result};
use behavior_core::AgentId;
use serde::{Deserialize, Serialize};

/// Per-module runtime settings, usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Seed of the module's random stream (Random composite).
    pub seed: u64,

    /// Start the root again on the tick after it completes.
    pub restart_on_completion: bool,

    /// Upper bound on awaken/notification drain passes per tick.
    #[serde(default = "default_max_drain_passes")]
    pub max_drain_passes: usize,

    /// Diagnostics kept before the oldest are dropped.
    #[serde(default = "default_max_diagnostics")]
    pub max_diagnostics: usize,

    /// Record node lifecycle trace events into an in-memory log.
    pub trace: bool,
}

fn default_max_drain_passes() -> usize {
    8
}
fn default_max_diagnostics() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            restart_on_completion: false,
            max_drain_passes: default_max_drain_passes(),
            max_diagnostics: default_max_diagnostics(),
            trace: false,
        }
    }
}

impl GraphConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph config from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse graph config from {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("invalid graph config")?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// How often an agent ticks its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub tick_every: u32,
    pub tick_offset: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick_every: 1,
            tick_offset: 0,
        }
    }
}

impl AgentConfig {
    /// Spreads agents over `tick_every` ticks by their stable id.
    pub fn deterministic(agent: impl AgentId, tick_every: u32) -> Self {
        let every = tick_every.max(1);
        let offset = (agent.stable_id() % (every as u64)) as u32;
        Self {
            tick_every: every,
            tick_offset: offset,
        }
    }

    pub fn should_tick(&self, tick: u64) -> bool {
        let every = self.tick_every.max(1) as u64;
        ((tick + (self.tick_offset as u64)) % every) == 0
    }
}
