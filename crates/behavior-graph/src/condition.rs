//! Predicates bound to blackboard variables.

use behavior_core::{evaluate_operands, ConditionOperator, ListenerKey, Operand, VariableRef};

use crate::NodeContext;

/// A predicate owned by a conditional node.
///
/// `on_start` runs once before the owner starts polling, `is_true` any number
/// of times, `on_end` once when the owner's activation finishes.
pub trait Condition: Send + 'static {
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn is_true(&mut self, ctx: &mut NodeContext<'_>) -> bool;

    fn on_end(&mut self, _ctx: &mut NodeContext<'_>) {}
}

/// Evaluates `conditions` under an all/any policy.
///
/// All-required: every condition must hold, an empty list holds. Any: the
/// first true condition wins, an empty list does not hold.
pub fn check_conditions(
    conditions: &mut [Box<dyn Condition>],
    require_all: bool,
    ctx: &mut NodeContext<'_>,
) -> bool {
    if require_all {
        conditions.iter_mut().all(|c| c.is_true(ctx))
    } else {
        conditions.iter_mut().any(|c| c.is_true(ctx))
    }
}

#[derive(Default)]
pub struct ConditionSet {
    pub conditions: Vec<Box<dyn Condition>>,
    pub require_all: bool,
}

impl std::fmt::Debug for ConditionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionSet")
            .field("conditions", &self.conditions.len())
            .field("require_all", &self.require_all)
            .finish()
    }
}

impl ConditionSet {
    pub fn all() -> Self {
        Self {
            conditions: Vec::new(),
            require_all: true,
        }
    }

    pub fn any() -> Self {
        Self {
            conditions: Vec::new(),
            require_all: false,
        }
    }

    pub fn with(mut self, condition: impl Condition) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    pub fn push(&mut self, condition: Box<dyn Condition>) {
        self.conditions.push(condition);
    }

    pub fn start(&mut self, ctx: &mut NodeContext<'_>) {
        for c in &mut self.conditions {
            c.on_start(ctx);
        }
    }

    pub fn check(&mut self, ctx: &mut NodeContext<'_>) -> bool {
        check_conditions(&mut self.conditions, self.require_all, ctx)
    }

    pub fn end(&mut self, ctx: &mut NodeContext<'_>) {
        for c in &mut self.conditions {
            c.on_end(ctx);
        }
    }
}

/// Compares a variable against a constant or another variable.
#[derive(Debug, Clone)]
pub struct VariableCondition {
    pub variable: VariableRef,
    pub operator: ConditionOperator,
    pub comparand: Operand,
}

impl VariableCondition {
    pub fn new(variable: VariableRef, operator: ConditionOperator, comparand: impl Into<Operand>) -> Self {
        Self {
            variable,
            operator,
            comparand: comparand.into(),
        }
    }
}

impl Condition for VariableCondition {
    fn is_true(&mut self, ctx: &mut NodeContext<'_>) -> bool {
        match evaluate_operands(
            ctx.blackboards(),
            &Operand::Variable(self.variable),
            self.operator,
            &self.comparand,
        ) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(node = %ctx.guid(), error = %err, "condition operand unavailable");
                false
            }
        }
    }
}

/// True once the variable has been written since the last check.
#[derive(Debug, Clone)]
pub struct VariableChanged {
    pub variable: VariableRef,
    listener: Option<ListenerKey>,
}

impl VariableChanged {
    pub fn new(variable: VariableRef) -> Self {
        Self {
            variable,
            listener: None,
        }
    }
}

impl Condition for VariableChanged {
    fn on_start(&mut self, ctx: &mut NodeContext<'_>) {
        if let Some(key) = self.listener.take() {
            ctx.unsubscribe(key);
        }
        match ctx.subscribe_mailbox(self.variable) {
            Ok(key) => self.listener = Some(key),
            Err(err) => {
                tracing::warn!(node = %ctx.guid(), error = %err, "cannot watch variable");
            }
        }
    }

    fn is_true(&mut self, ctx: &mut NodeContext<'_>) -> bool {
        match self.listener {
            Some(key) => ctx.take_pending(key).map(|n| n > 0).unwrap_or(false),
            None => false,
        }
    }

    fn on_end(&mut self, ctx: &mut NodeContext<'_>) {
        if let Some(key) = self.listener.take() {
            ctx.unsubscribe(key);
        }
    }
}
