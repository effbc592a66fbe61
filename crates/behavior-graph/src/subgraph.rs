//! Running a whole module as one leaf of another.

use behavior_core::{BlackboardError, BlackboardSet, TickContext, VariableRef};

use crate::{BehaviorGraphModule, Status};

/// Maps a caller variable onto a callee variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableOverride {
    pub caller: VariableRef,
    pub callee: VariableRef,
}

/// Leaf that owns a child module and ticks it while it is unresolved.
#[derive(Debug)]
pub struct RunSubgraph {
    module: Box<BehaviorGraphModule>,
}

impl RunSubgraph {
    pub fn new(module: BehaviorGraphModule) -> Self {
        Self {
            module: Box::new(module),
        }
    }

    pub fn module(&self) -> &BehaviorGraphModule {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut BehaviorGraphModule {
        &mut self.module
    }

    /// Points callee variables at the caller's storage.
    ///
    /// Shared callee variables are skipped with a warning; any other failure
    /// aborts.
    pub fn apply_overrides(
        &mut self,
        caller: &BlackboardSet,
        overrides: &[VariableOverride],
    ) -> Result<usize, BlackboardError> {
        let mut applied = 0;
        for o in overrides {
            let source = caller.variable(o.caller)?;
            if bind(self.module.blackboards_mut(), o.callee, source)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Binds every callee primary variable to the first caller variable with
    /// the same name and type.
    pub fn auto_bind(&mut self, caller: &BlackboardSet) -> Result<usize, BlackboardError> {
        let callee = self.module.blackboards_mut();
        let Some(primary) = callee.primary() else {
            return Ok(0);
        };
        let targets: Vec<(VariableRef, Option<VariableRef>)> = primary
            .blackboard()
            .variables()
            .iter()
            .enumerate()
            .map(|(i, v)| {
                (
                    VariableRef::primary(i as u32),
                    caller.find_typed(v.name(), v.value_type()),
                )
            })
            .collect();
        let mut applied = 0;
        for (target, source) in targets {
            let Some(source) = source else { continue };
            if bind(callee, target, caller.variable(source)?)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub(crate) fn start(&mut self, tick: TickContext) -> Status {
        self.module.set_tick(tick);
        running_while_pending(self.module.start())
    }

    pub(crate) fn update(&mut self, tick: TickContext) -> Status {
        running_while_pending(self.module.tick(tick))
    }

    pub(crate) fn end(&mut self) {
        self.module.end();
    }

    pub(crate) fn reset(&mut self) {
        self.module.reset();
    }
}

fn bind(
    callee: &mut BlackboardSet,
    target: VariableRef,
    source: &behavior_core::BlackboardVariable,
) -> Result<bool, BlackboardError> {
    match callee.substitute(target, source) {
        Ok(()) => Ok(true),
        Err(BlackboardError::SharedOverride(name)) => {
            tracing::warn!(variable = %name, "shared variable cannot be overridden");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn running_while_pending(status: Status) -> Status {
    if status.is_pending() {
        Status::Running
    } else {
        status
    }
}
