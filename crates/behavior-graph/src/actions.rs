//! Built-in leaves that only touch the blackboard and the clock.

use behavior_core::{ListenerKey, Operand, VariableRef};

use crate::{Behavior, NodeContext, NodeData, Status};

/// Runs for `seconds` of accumulated tick time, then succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Wait {
    pub seconds: f32,
    elapsed: f32,
}

impl Wait {
    pub fn new(seconds: f32) -> Self {
        Self {
            seconds,
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Behavior for Wait {
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> Status {
        self.elapsed = 0.0;
        if self.seconds <= 0.0 {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.elapsed += ctx.dt_seconds();
        if self.elapsed >= self.seconds {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn on_serialize(&self, data: &mut NodeData) {
        data.put("elapsed", self.elapsed as f64);
    }

    fn on_deserialize(&mut self, _ctx: &mut NodeContext<'_>, data: &NodeData) {
        self.elapsed = data.get_as::<f64>("elapsed").unwrap_or(0.0) as f32;
    }
}

/// Writes a value (or another variable's value) and succeeds. Fails when the
/// write is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct SetVariable {
    pub variable: VariableRef,
    pub value: Operand,
}

impl SetVariable {
    pub fn new(variable: VariableRef, value: impl Into<Operand>) -> Self {
        Self {
            variable,
            value: value.into(),
        }
    }
}

impl Behavior for SetVariable {
    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        let written = self
            .value
            .resolve(ctx.blackboards())
            .and_then(|value| ctx.set(self.variable, value));
        match written {
            Ok(()) => Status::Success,
            Err(err) => {
                tracing::warn!(node = %ctx.guid(), error = %err, "set variable failed");
                Status::Failure
            }
        }
    }
}

/// Waits, without being polled, until `variable` is written.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitForChange {
    pub variable: VariableRef,
    listener: Option<ListenerKey>,
}

impl WaitForChange {
    pub fn new(variable: VariableRef) -> Self {
        Self {
            variable,
            listener: None,
        }
    }

    fn listen(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        match ctx.subscribe(self.variable) {
            Ok(key) => {
                self.listener = Some(key);
                Status::Waiting
            }
            Err(err) => {
                tracing::warn!(node = %ctx.guid(), error = %err, "cannot watch variable");
                Status::Failure
            }
        }
    }
}

impl Behavior for WaitForChange {
    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        self.listen(ctx)
    }

    fn on_update(&mut self, _ctx: &mut NodeContext<'_>) -> Status {
        Status::Success
    }

    fn on_end(&mut self, ctx: &mut NodeContext<'_>) {
        if let Some(key) = self.listener.take() {
            ctx.unsubscribe(key);
        }
    }

    fn on_deserialize(&mut self, ctx: &mut NodeContext<'_>, _data: &NodeData) {
        if ctx.status() == Status::Waiting {
            self.listen(ctx);
        }
    }
}

/// Emits an `info` event and succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    pub message: String,
    /// Appended to the event when set.
    pub variable: Option<VariableRef>,
}

impl Log {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            variable: None,
        }
    }

    pub fn with_variable(mut self, variable: VariableRef) -> Self {
        self.variable = Some(variable);
        self
    }
}

impl Behavior for Log {
    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        match self.variable.map(|v| ctx.get(v)) {
            Some(Ok(value)) => {
                tracing::info!(node = %ctx.guid(), value = %value, "{}", self.message)
            }
            _ => tracing::info!(node = %ctx.guid(), "{}", self.message),
        }
        Status::Success
    }
}
