//! Single-child decorators.

use serde::{Deserialize, Serialize};

use crate::condition::ConditionSet;
use crate::execution::Scope;
use crate::{NodeId, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepeatMode {
    Forever,
    /// Run the child n times and report the last run's status.
    Times(u32),
    /// Repeat until the child succeeds, then succeed.
    UntilSuccess,
    /// Repeat until the child fails, then succeed.
    UntilFailure,
}

#[derive(Debug)]
pub enum ModifierKind {
    Inverter,
    ForceSuccess,
    ForceFailure,
    Repeat(RepeatMode),
    /// Fails, ending the child, as soon as the conditions hold.
    Abort(ConditionSet),
    /// Ends, resets and restarts the child whenever the conditions hold.
    Restart(ConditionSet),
}

impl ModifierKind {
    pub fn label(&self) -> &'static str {
        match self {
            ModifierKind::Inverter => "inverter",
            ModifierKind::ForceSuccess => "force_success",
            ModifierKind::ForceFailure => "force_failure",
            ModifierKind::Repeat(_) => "repeat",
            ModifierKind::Abort(_) => "abort",
            ModifierKind::Restart(_) => "restart",
        }
    }
}

#[derive(Debug)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub(crate) iterations: u32,
    pub(crate) restart_pending: bool,
}

impl Modifier {
    pub fn new(kind: ModifierKind) -> Self {
        Self {
            kind,
            iterations: 0,
            restart_pending: false,
        }
    }

    /// Completed child runs in the current activation (Repeat only).
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub(crate) fn start(&mut self, child: Option<NodeId>, scope: &mut Scope<'_>) -> Status {
        self.iterations = 0;
        self.restart_pending = false;
        match &mut self.kind {
            ModifierKind::Inverter | ModifierKind::ForceSuccess | ModifierKind::ForceFailure => {
                let status = scope.start_child(child);
                self.map(status)
            }
            ModifierKind::Repeat(mode) => {
                if *mode == RepeatMode::Times(0) {
                    return Status::Success;
                }
                let status = scope.start_child(child);
                self.repeat(status)
            }
            ModifierKind::Abort(conditions) => {
                let triggered = {
                    let mut ctx = scope.context();
                    conditions.start(&mut ctx);
                    conditions.check(&mut ctx)
                };
                if triggered {
                    return Status::Failure;
                }
                poll_while_pending(scope.start_child(child))
            }
            ModifierKind::Restart(conditions) => {
                conditions.start(&mut scope.context());
                poll_while_pending(scope.start_child(child))
            }
        }
    }

    /// Sweep poll or awaken after the child resolved.
    pub(crate) fn update(&mut self, child: Option<NodeId>, scope: &mut Scope<'_>) -> Status {
        let child_status = scope.status_of(child);
        match &mut self.kind {
            ModifierKind::Inverter | ModifierKind::ForceSuccess | ModifierKind::ForceFailure => {
                self.map(child_status)
            }
            ModifierKind::Repeat(_) => {
                if self.restart_pending {
                    self.restart_pending = false;
                    scope.reset_child(child);
                    let status = scope.start_child(child);
                    return self.repeat(status);
                }
                self.repeat(child_status)
            }
            ModifierKind::Abort(conditions) => {
                if child_status.is_completed() {
                    return child_status;
                }
                if conditions.check(&mut scope.context()) {
                    tracing::debug!(node = %scope.guid(), "abort conditions met");
                    scope.end_child(child);
                    return Status::Failure;
                }
                Status::Running
            }
            ModifierKind::Restart(conditions) => {
                if child_status.is_completed() {
                    return child_status;
                }
                if conditions.check(&mut scope.context()) {
                    tracing::debug!(node = %scope.guid(), "restart conditions met");
                    scope.end_child(child);
                    scope.reset_child(child);
                    return poll_while_pending(scope.start_child(child));
                }
                Status::Running
            }
        }
    }

    pub(crate) fn end(&mut self, scope: &mut Scope<'_>) {
        self.restart_pending = false;
        match &mut self.kind {
            ModifierKind::Abort(conditions) | ModifierKind::Restart(conditions) => {
                conditions.end(&mut scope.context());
            }
            _ => {}
        }
    }

    pub(crate) fn reset(&mut self) {
        self.iterations = 0;
        self.restart_pending = false;
    }

    fn map(&self, status: Status) -> Status {
        if status.is_pending() {
            return Status::Waiting;
        }
        match self.kind {
            ModifierKind::Inverter => status.invert(),
            ModifierKind::ForceSuccess => Status::Success,
            ModifierKind::ForceFailure => Status::Failure,
            _ => status,
        }
    }

    /// Decides what a repeat does with its child's latest status. Another
    /// round is scheduled for the next sweep rather than started in place.
    fn repeat(&mut self, status: Status) -> Status {
        let ModifierKind::Repeat(mode) = self.kind else {
            return status;
        };
        if status.is_pending() {
            return Status::Waiting;
        }
        self.iterations += 1;
        let done = match mode {
            RepeatMode::Forever => false,
            RepeatMode::Times(n) => self.iterations >= n,
            RepeatMode::UntilSuccess => status == Status::Success,
            RepeatMode::UntilFailure => status == Status::Failure,
        };
        if done {
            return match mode {
                RepeatMode::Times(_) => status,
                _ => Status::Success,
            };
        }
        self.restart_pending = true;
        Status::Running
    }
}

fn poll_while_pending(status: Status) -> Status {
    if status.is_pending() {
        Status::Running
    } else {
        status
    }
}
