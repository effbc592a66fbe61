/// Host-supplied timing for one sweep of a behavior graph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self { tick, dt_seconds }
    }

    /// The context for the following tick with the same step length.
    pub fn next(&self) -> Self {
        Self {
            tick: self.tick.wrapping_add(1),
            ..*self
        }
    }
}
