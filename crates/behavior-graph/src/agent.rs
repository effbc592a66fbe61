use behavior_core::{AgentId, TickContext};

use crate::{AgentConfig, BehaviorGraphModule, Status};

/// One agent driving its own module at a configurable cadence.
#[derive(Debug)]
pub struct BehaviorAgent<A: AgentId> {
    pub agent: A,
    pub config: AgentConfig,
    pub module: BehaviorGraphModule,
    // Time from skipped ticks, handed to the next tick that runs.
    carried_dt: f32,
}

impl<A: AgentId> BehaviorAgent<A> {
    pub fn new(agent: A, module: BehaviorGraphModule) -> Self {
        Self {
            agent,
            config: AgentConfig::default(),
            module,
            carried_dt: 0.0,
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Ticks the module when the cadence allows; otherwise banks `dt` and
    /// reports the current root status.
    pub fn tick(&mut self, ctx: &TickContext) -> Status {
        if !self.config.should_tick(ctx.tick) {
            self.carried_dt += ctx.dt_seconds;
            return self.module.status();
        }
        let mut ctx = *ctx;
        ctx.dt_seconds += std::mem::take(&mut self.carried_dt);
        self.module.tick(ctx)
    }
}

/// Ticks every agent in stable id order.
pub fn tick_agents<A: AgentId>(ctx: &TickContext, agents: &mut [BehaviorAgent<A>]) {
    agents.sort_by_key(|a| a.agent.stable_id());
    for agent in agents.iter_mut() {
        agent.tick(ctx);
    }
}
