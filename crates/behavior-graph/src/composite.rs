//! Composite scheduling algorithms.
//!
//! Composites never poll: when they have to wait on a child they report
//! Waiting and are resumed by the child's `awake_parents`.

use behavior_core::{DeterministicRng, VariableRef};
use serde::{Deserialize, Serialize};

use crate::condition::ConditionSet;
use crate::diagnostics::DiagnosticKind;
use crate::execution::Scope;
use crate::{NodeId, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParallelPolicy {
    /// Wait for every child; Success only if all of them succeeded.
    All,
    /// Fail as soon as one child fails; Success once all succeeded.
    AllSuccess,
    /// The first child to resolve decides.
    Any,
    /// Succeed on the first success; fail once every child failed.
    AnySuccess,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Switch {
    pub variable: VariableRef,
    /// Reported for an empty slot or an out-of-range value.
    pub default_status: Status,
}

impl Switch {
    pub fn new(variable: VariableRef) -> Self {
        Self {
            variable,
            default_status: Status::Success,
        }
    }
}

#[derive(Debug)]
pub enum CompositeKind {
    Sequence,
    Selector,
    Parallel(ParallelPolicy),
    Random,
    Switch(Switch),
    /// Slot 0 runs when the conditions hold, slot 1 otherwise.
    Branch(ConditionSet),
}

impl CompositeKind {
    pub fn label(&self) -> &'static str {
        match self {
            CompositeKind::Sequence => "sequence",
            CompositeKind::Selector => "selector",
            CompositeKind::Parallel(_) => "parallel",
            CompositeKind::Random => "random",
            CompositeKind::Switch(_) => "switch",
            CompositeKind::Branch(_) => "branch",
        }
    }
}

#[derive(Debug)]
pub struct Composite {
    pub kind: CompositeKind,
    /// Child currently being waited on (sequential kinds only).
    pub(crate) cursor: Option<usize>,
}

impl Composite {
    pub fn new(kind: CompositeKind) -> Self {
        Self { kind, cursor: None }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub(crate) fn start(&mut self, children: &[Option<NodeId>], scope: &mut Scope<'_>) -> Status {
        self.cursor = None;
        match &mut self.kind {
            CompositeKind::Sequence => run_sequence(&mut self.cursor, children, 0, scope),
            CompositeKind::Selector => run_selector(&mut self.cursor, children, 0, scope),
            CompositeKind::Parallel(policy) => start_parallel(*policy, children, scope),
            CompositeKind::Random => {
                if children.is_empty() {
                    return Status::Success;
                }
                let index = scope.rng().next_index(children.len());
                self.cursor = Some(index);
                pass_through(scope.start_child(children[index]))
            }
            CompositeKind::Switch(switch) => start_switch(&mut self.cursor, *switch, children, scope),
            CompositeKind::Branch(conditions) => {
                let outcome = {
                    let mut ctx = scope.context();
                    conditions.start(&mut ctx);
                    conditions.check(&mut ctx)
                };
                let slot = if outcome { 0 } else { 1 };
                match children.get(slot).copied().flatten() {
                    Some(child) => {
                        self.cursor = Some(slot);
                        pass_through(scope.start_child(Some(child)))
                    }
                    None => {
                        tracing::warn!(node = %scope.guid(), slot, "branch has no child for outcome");
                        scope.report(
                            DiagnosticKind::MissingLink,
                            format!("branch slot {slot} is empty"),
                        );
                        Status::Success
                    }
                }
            }
        }
    }

    /// Re-evaluates after a child resolved.
    pub(crate) fn update(&mut self, children: &[Option<NodeId>], scope: &mut Scope<'_>) -> Status {
        match &self.kind {
            CompositeKind::Sequence => {
                let Some(cursor) = self.cursor else {
                    return Status::Success;
                };
                match scope.status_of(children.get(cursor).copied().flatten()) {
                    Status::Failure => Status::Failure,
                    Status::Success => run_sequence(&mut self.cursor, children, cursor + 1, scope),
                    _ => Status::Waiting,
                }
            }
            CompositeKind::Selector => {
                let Some(cursor) = self.cursor else {
                    return Status::Failure;
                };
                match scope.status_of(children.get(cursor).copied().flatten()) {
                    Status::Success => Status::Success,
                    Status::Failure => run_selector(&mut self.cursor, children, cursor + 1, scope),
                    _ => Status::Waiting,
                }
            }
            CompositeKind::Parallel(policy) => resolve_parallel(*policy, children, scope),
            CompositeKind::Random | CompositeKind::Switch(_) | CompositeKind::Branch(_) => {
                match self.cursor {
                    Some(cursor) => pass_through(scope.status_of(children.get(cursor).copied().flatten())),
                    None => scope.current_status(),
                }
            }
        }
    }

    pub(crate) fn end(&mut self, scope: &mut Scope<'_>) {
        if let CompositeKind::Branch(conditions) = &mut self.kind {
            conditions.end(&mut scope.context());
        }
    }

    pub(crate) fn reset(&mut self) {
        self.cursor = None;
    }
}

fn run_sequence(
    cursor: &mut Option<usize>,
    children: &[Option<NodeId>],
    from: usize,
    scope: &mut Scope<'_>,
) -> Status {
    for (i, child) in children.iter().enumerate().skip(from) {
        match scope.start_child(*child) {
            Status::Success => continue,
            Status::Failure => {
                *cursor = Some(i);
                return Status::Failure;
            }
            _ => {
                *cursor = Some(i);
                return Status::Waiting;
            }
        }
    }
    *cursor = None;
    Status::Success
}

fn run_selector(
    cursor: &mut Option<usize>,
    children: &[Option<NodeId>],
    from: usize,
    scope: &mut Scope<'_>,
) -> Status {
    if children.is_empty() {
        return Status::Success;
    }
    for (i, child) in children.iter().enumerate().skip(from) {
        match scope.start_child(*child) {
            Status::Failure => continue,
            Status::Success => {
                *cursor = Some(i);
                return Status::Success;
            }
            _ => {
                *cursor = Some(i);
                return Status::Waiting;
            }
        }
    }
    *cursor = None;
    Status::Failure
}

fn start_switch(
    cursor: &mut Option<usize>,
    switch: Switch,
    children: &[Option<NodeId>],
    scope: &mut Scope<'_>,
) -> Status {
    let ordinal = match scope.context().get(switch.variable) {
        Ok(value) => value.ordinal(),
        Err(err) => {
            tracing::error!(node = %scope.guid(), error = %err, "switch variable unavailable");
            scope.report(
                DiagnosticKind::ConfigurationDrift,
                format!("switch variable unavailable: {err}"),
            );
            return switch.default_status;
        }
    };
    let index = match ordinal {
        Some(ordinal) if ordinal >= 0 && (ordinal as usize) < children.len() => ordinal as usize,
        other => {
            tracing::error!(
                node = %scope.guid(),
                value = ?other,
                slots = children.len(),
                "switch value has no matching slot"
            );
            scope.report(
                DiagnosticKind::ConfigurationDrift,
                format!("switch value {other:?} outside {} slots", children.len()),
            );
            return switch.default_status;
        }
    };
    match children[index] {
        Some(child) => {
            *cursor = Some(index);
            pass_through(scope.start_child(Some(child)))
        }
        None => {
            tracing::warn!(node = %scope.guid(), index, "switch slot is empty");
            scope.report(DiagnosticKind::MissingLink, format!("switch slot {index} is empty"));
            switch.default_status
        }
    }
}

/// Pending children make the composite wait; terminal statuses pass through.
fn pass_through(status: Status) -> Status {
    if status.is_pending() {
        Status::Waiting
    } else {
        status
    }
}

fn start_parallel(policy: ParallelPolicy, children: &[Option<NodeId>], scope: &mut Scope<'_>) -> Status {
    for (i, child) in children.iter().enumerate() {
        let status = scope.start_child(*child);
        let decisive = match policy {
            ParallelPolicy::All => false,
            ParallelPolicy::AllSuccess => status == Status::Failure,
            ParallelPolicy::Any => status.is_completed(),
            ParallelPolicy::AnySuccess => status == Status::Success,
        };
        if decisive {
            end_others(children, i, scope);
            return status;
        }
    }
    resolve_parallel(policy, children, scope)
}

fn resolve_parallel(policy: ParallelPolicy, children: &[Option<NodeId>], scope: &mut Scope<'_>) -> Status {
    let statuses: Vec<Status> = children.iter().map(|c| scope.status_of(*c)).collect();
    let pending = statuses.iter().any(|s| s.is_pending());
    let decisive = match policy {
        ParallelPolicy::All => None,
        ParallelPolicy::AllSuccess => statuses.iter().position(|s| *s == Status::Failure),
        ParallelPolicy::Any => statuses.iter().position(|s| s.is_completed()),
        ParallelPolicy::AnySuccess => statuses.iter().position(|s| *s == Status::Success),
    };
    if let Some(i) = decisive {
        end_others(children, i, scope);
        return statuses[i];
    }
    if pending {
        return Status::Waiting;
    }
    match policy {
        ParallelPolicy::All | ParallelPolicy::AllSuccess => {
            if statuses.iter().all(|s| *s == Status::Success) {
                Status::Success
            } else {
                Status::Failure
            }
        }
        ParallelPolicy::Any => Status::Success,
        ParallelPolicy::AnySuccess => {
            if statuses.is_empty() {
                Status::Success
            } else {
                Status::Failure
            }
        }
    }
}

fn end_others(children: &[Option<NodeId>], keep: usize, scope: &mut Scope<'_>) {
    for (i, child) in children.iter().enumerate() {
        if i != keep {
            scope.end_child(*child);
        }
    }
}
