//! The fixed set of value types a blackboard variable can hold.

use core::cmp::Ordering;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque host object reference (entity, asset, scene object).
///
/// Handles are only meaningful inside one running session; snapshots map them
/// to stable string ids through an object resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ObjectHandle(pub u64);

/// An enum value stored by ordinal, tagged with the enum's type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumValue {
    pub type_name: String,
    pub ordinal: u32,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            type_name: type_name.into(),
            ordinal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    /// Enum values of the named enum type.
    Enum(String),
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::String => f.write_str("string"),
            ValueType::Enum(name) => write!(f, "enum {name}"),
            ValueType::Object => f.write_str("object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlackboardValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(EnumValue),
    Object(Option<ObjectHandle>),
}

impl BlackboardValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            BlackboardValue::Bool(_) => ValueType::Bool,
            BlackboardValue::Int(_) => ValueType::Int,
            BlackboardValue::Float(_) => ValueType::Float,
            BlackboardValue::String(_) => ValueType::String,
            BlackboardValue::Enum(e) => ValueType::Enum(e.type_name.clone()),
            BlackboardValue::Object(_) => ValueType::Object,
        }
    }

    /// Zero value of a type: `false`, `0`, empty string, first enum ordinal, null object.
    pub fn default_for(value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Bool => BlackboardValue::Bool(false),
            ValueType::Int => BlackboardValue::Int(0),
            ValueType::Float => BlackboardValue::Float(0.0),
            ValueType::String => BlackboardValue::String(String::new()),
            ValueType::Enum(name) => BlackboardValue::Enum(EnumValue::new(name.clone(), 0)),
            ValueType::Object => BlackboardValue::Object(None),
        }
    }

    pub fn is_of_type(&self, value_type: &ValueType) -> bool {
        match (self, value_type) {
            (BlackboardValue::Enum(e), ValueType::Enum(name)) => &e.type_name == name,
            _ => self.value_type() == *value_type,
        }
    }

    /// Whether the value has an ordering. Object handles only support identity.
    pub fn is_comparable(&self) -> bool {
        !matches!(self, BlackboardValue::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BlackboardValue::Object(None))
    }

    /// Ordering between two comparable values.
    ///
    /// Integers and floats compare numerically with each other; enums only
    /// compare within the same enum type. Everything else is `None`.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        use BlackboardValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Enum(a), Enum(b)) if a.type_name == b.type_name => Some(a.ordinal.cmp(&b.ordinal)),
            _ => None,
        }
    }

    /// Position used by switch-style routing: enum ordinal or integer value.
    pub fn ordinal(&self) -> Option<i64> {
        match self {
            BlackboardValue::Enum(e) => Some(e.ordinal as i64),
            BlackboardValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BlackboardValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            BlackboardValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            BlackboardValue::Float(f) => Some(*f),
            BlackboardValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BlackboardValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Option<ObjectHandle>> {
        match self {
            BlackboardValue::Object(o) => Some(*o),
            _ => None,
        }
    }
}

impl fmt::Display for BlackboardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlackboardValue::Bool(b) => write!(f, "{b}"),
            BlackboardValue::Int(i) => write!(f, "{i}"),
            BlackboardValue::Float(x) => write!(f, "{x}"),
            BlackboardValue::String(s) => write!(f, "{s:?}"),
            BlackboardValue::Enum(e) => write!(f, "{}#{}", e.type_name, e.ordinal),
            BlackboardValue::Object(Some(h)) => write!(f, "object({})", h.0),
            BlackboardValue::Object(None) => f.write_str("null"),
        }
    }
}

/// Rust types with a direct blackboard representation.
///
/// This is the typed overload of the blackboard access contract: `get_as` /
/// `set_as` go through it instead of matching on [`BlackboardValue`].
pub trait VariableType: Sized {
    fn from_value(value: &BlackboardValue) -> Option<Self>;
    fn into_value(self) -> BlackboardValue;
}

macro_rules! variable_type {
    ($ty:ty, $variant:ident) => {
        impl VariableType for $ty {
            fn from_value(value: &BlackboardValue) -> Option<Self> {
                match value {
                    BlackboardValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn into_value(self) -> BlackboardValue {
                BlackboardValue::$variant(self)
            }
        }

        impl From<$ty> for BlackboardValue {
            fn from(value: $ty) -> Self {
                BlackboardValue::$variant(value)
            }
        }
    };
}

variable_type!(bool, Bool);
variable_type!(i64, Int);
variable_type!(f64, Float);
variable_type!(String, String);
variable_type!(EnumValue, Enum);
variable_type!(Option<ObjectHandle>, Object);

impl From<i32> for BlackboardValue {
    fn from(value: i32) -> Self {
        BlackboardValue::Int(value as i64)
    }
}

impl From<f32> for BlackboardValue {
    fn from(value: f32) -> Self {
        BlackboardValue::Float(value as f64)
    }
}

impl From<&str> for BlackboardValue {
    fn from(value: &str) -> Self {
        BlackboardValue::String(value.to_string())
    }
}

impl From<ObjectHandle> for BlackboardValue {
    fn from(value: ObjectHandle) -> Self {
        BlackboardValue::Object(Some(value))
    }
}
