//! Comparison kernel shared by every variable-bound condition.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BlackboardSet, BlackboardValue, Result, VariableRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    Greater,
    Lower,
    GreaterOrEqual,
    LowerOrEqual,
}

impl ConditionOperator {
    pub const ALL: [ConditionOperator; 6] = [
        ConditionOperator::Equal,
        ConditionOperator::NotEqual,
        ConditionOperator::Greater,
        ConditionOperator::Lower,
        ConditionOperator::GreaterOrEqual,
        ConditionOperator::LowerOrEqual,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            ConditionOperator::Equal => "==",
            ConditionOperator::NotEqual => "!=",
            ConditionOperator::Greater => ">",
            ConditionOperator::Lower => "<",
            ConditionOperator::GreaterOrEqual => ">=",
            ConditionOperator::LowerOrEqual => "<=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            ConditionOperator::Equal => ordering == Ordering::Equal,
            ConditionOperator::NotEqual => ordering != Ordering::Equal,
            ConditionOperator::Greater => ordering == Ordering::Greater,
            ConditionOperator::Lower => ordering == Ordering::Less,
            ConditionOperator::GreaterOrEqual => ordering != Ordering::Less,
            ConditionOperator::LowerOrEqual => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown condition operator `{0}`")]
pub struct ParseOperatorError(pub String);

impl FromStr for ConditionOperator {
    type Err = ParseOperatorError;

    /// Accepts both the symbol (`>=`) and the variant name (`GreaterOrEqual`).
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.symbol() == s || format!("{op:?}").eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseOperatorError(s.to_string()))
    }
}

/// Either side of a comparison.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    Value(BlackboardValue),
    Variable(VariableRef),
}

impl Operand {
    pub fn resolve(&self, boards: &BlackboardSet) -> Result<BlackboardValue> {
        match self {
            Operand::Value(value) => Ok(value.clone()),
            Operand::Variable(var) => boards.get(*var),
        }
    }
}

impl From<BlackboardValue> for Operand {
    fn from(value: BlackboardValue) -> Self {
        Operand::Value(value)
    }
}

impl From<VariableRef> for Operand {
    fn from(var: VariableRef) -> Self {
        Operand::Variable(var)
    }
}

/// Compares two resolved values.
///
/// Object handles have no ordering: `Equal` is identity and `NotEqual` only
/// asks whether the left side is set.
pub fn evaluate(left: &BlackboardValue, op: ConditionOperator, right: &BlackboardValue) -> bool {
    if left.is_comparable() {
        return match left.compare(right) {
            Some(ordering) => op.accepts(ordering),
            None => {
                tracing::warn!(
                    left = %left,
                    right = %right,
                    operator = %op,
                    "comparison between incompatible values"
                );
                false
            }
        };
    }
    match op {
        ConditionOperator::Equal => left == right,
        ConditionOperator::NotEqual => !left.is_null(),
        _ => {
            tracing::warn!(operator = %op, "ordering operator applied to object values");
            false
        }
    }
}

pub fn evaluate_operands(
    boards: &BlackboardSet,
    left: &Operand,
    op: ConditionOperator,
    right: &Operand,
) -> Result<bool> {
    let left = left.resolve(boards)?;
    let right = right.resolve(boards)?;
    Ok(evaluate(&left, op, &right))
}
