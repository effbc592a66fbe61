//! Named factories for actions and conditions used by graph definitions.

use std::collections::BTreeMap;
use std::fmt;

use behavior_core::{BlackboardSet, BlackboardValue, ConditionOperator, Guid, Operand, VariableRef};

use crate::actions::{Log, SetVariable, Wait, WaitForChange};
use crate::condition::{Condition, VariableChanged, VariableCondition};
use crate::definition::ParamValue;
use crate::error::BuildError;
use crate::Behavior;

pub type ActionFactory =
    Box<dyn Fn(&FactoryContext<'_>) -> Result<Box<dyn Behavior>, BuildError> + Send + Sync>;
pub type ConditionFactory =
    Box<dyn Fn(&FactoryContext<'_>) -> Result<Box<dyn Condition>, BuildError> + Send + Sync>;

/// What a factory sees: the node being built, its parameters and the
/// blackboards variables are resolved against.
pub struct FactoryContext<'a> {
    node: Guid,
    params: &'a BTreeMap<String, ParamValue>,
    blackboards: &'a BlackboardSet,
}

impl<'a> FactoryContext<'a> {
    pub fn new(
        node: Guid,
        params: &'a BTreeMap<String, ParamValue>,
        blackboards: &'a BlackboardSet,
    ) -> Self {
        Self {
            node,
            params,
            blackboards,
        }
    }

    pub fn node(&self) -> Guid {
        self.node
    }

    pub fn blackboards(&self) -> &BlackboardSet {
        self.blackboards
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    fn invalid(&self, param: &str, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidParam {
            node: self.node,
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    fn required(&self, name: &str) -> Result<&ParamValue, BuildError> {
        self.param(name).ok_or_else(|| self.invalid(name, "is missing"))
    }

    /// A literal parameter as a blackboard value.
    pub fn value(&self, name: &str) -> Result<BlackboardValue, BuildError> {
        self.required(name)?
            .literal()
            .ok_or_else(|| self.invalid(name, "must be a literal"))
    }

    pub fn f32(&self, name: &str) -> Result<f32, BuildError> {
        match self.required(name)? {
            ParamValue::Int(i) => Ok(*i as f32),
            ParamValue::Float(f) => Ok(*f as f32),
            _ => Err(self.invalid(name, "must be a number")),
        }
    }

    pub fn string(&self, name: &str) -> Result<String, BuildError> {
        match self.required(name)? {
            ParamValue::Text(s) => Ok(s.clone()),
            _ => Err(self.invalid(name, "must be a string")),
        }
    }

    pub fn operator(&self, name: &str) -> Result<ConditionOperator, BuildError> {
        self.string(name)?
            .parse::<ConditionOperator>()
            .map_err(|err| self.invalid(name, format!("{err}")))
    }

    /// A variable parameter: a `{ guid, name }` binding, or a bare string
    /// naming the variable.
    pub fn variable(&self, name: &str) -> Result<VariableRef, BuildError> {
        let (found, label) = match self.required(name)? {
            ParamValue::Variable { variable } => {
                (variable.resolve(self.blackboards), variable.to_string())
            }
            ParamValue::Text(var) => (self.blackboards.find_by_name(var), var.clone()),
            _ => return Err(self.invalid(name, "must name a variable")),
        };
        found.ok_or(BuildError::UnboundVariable {
            node: self.node,
            variable: label,
        })
    }

    pub fn optional_variable(&self, name: &str) -> Result<Option<VariableRef>, BuildError> {
        match self.param(name) {
            Some(_) => self.variable(name).map(Some),
            None => Ok(None),
        }
    }

    /// Either a variable binding or a literal.
    pub fn operand(&self, name: &str) -> Result<Operand, BuildError> {
        match self.required(name)? {
            ParamValue::Variable { .. } => self.variable(name).map(Operand::Variable),
            other => other
                .literal()
                .map(Operand::Value)
                .ok_or_else(|| self.invalid(name, "must be a literal or a variable")),
        }
    }
}

/// Maps the action and condition names used in definitions to factories.
#[derive(Default)]
pub struct NodeRegistry {
    actions: BTreeMap<String, ActionFactory>,
    conditions: BTreeMap<String, ConditionFactory>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in leaves and conditions:
    /// `wait`, `set_variable`, `wait_for_change`, `log`, `variable_compare`
    /// and `variable_changed`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_action("wait", |ctx| Ok(Box::new(Wait::new(ctx.f32("seconds")?))));
        registry.register_action("set_variable", |ctx| {
            Ok(Box::new(SetVariable::new(
                ctx.variable("variable")?,
                ctx.operand("value")?,
            )))
        });
        registry.register_action("wait_for_change", |ctx| {
            Ok(Box::new(WaitForChange::new(ctx.variable("variable")?)))
        });
        registry.register_action("log", |ctx| {
            let mut log = Log::new(ctx.string("message")?);
            log.variable = ctx.optional_variable("variable")?;
            Ok(Box::new(log))
        });
        registry.register_condition("variable_compare", |ctx| {
            Ok(Box::new(VariableCondition::new(
                ctx.variable("variable")?,
                ctx.operator("operator")?,
                ctx.operand("value")?,
            )))
        });
        registry.register_condition("variable_changed", |ctx| {
            Ok(Box::new(VariableChanged::new(ctx.variable("variable")?)))
        });
        registry
    }

    /// Registers (or replaces) an action factory.
    pub fn register_action<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FactoryContext<'_>) -> Result<Box<dyn Behavior>, BuildError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Box::new(factory));
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FactoryContext<'_>) -> Result<Box<dyn Condition>, BuildError> + Send + Sync + 'static,
    {
        self.conditions.insert(name.into(), Box::new(factory));
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    pub fn create_action(
        &self,
        name: &str,
        ctx: &FactoryContext<'_>,
    ) -> Result<Box<dyn Behavior>, BuildError> {
        let factory = self
            .actions
            .get(name)
            .ok_or_else(|| BuildError::UnknownAction(name.to_string()))?;
        factory(ctx)
    }

    pub fn create_condition(
        &self,
        name: &str,
        ctx: &FactoryContext<'_>,
    ) -> Result<Box<dyn Condition>, BuildError> {
        let factory = self
            .conditions
            .get(name)
            .ok_or_else(|| BuildError::UnknownCondition(name.to_string()))?;
        factory(ctx)
    }
}
