//! Deterministic, engine-agnostic primitives for behavior graphs.
//!
//! This crate holds the data side of the runtime: GUIDs, the fixed set of
//! blackboard value types, change-notifying variable cells, blackboards and
//! their template assets, and the comparison kernel used by conditions. The
//! node runtime lives in `behavior-graph`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod asset;
pub mod blackboard;
pub mod blackboards;
pub mod compare;
pub mod error;
pub mod guid;
pub mod rng;
pub mod tick;
pub mod value;
pub mod variable;

pub use agent::AgentId;
pub use asset::{BlackboardAsset, BlackboardReference, VariableDefinition};
pub use blackboard::{
    Blackboard, ChangeCallback, ChangeNotice, ListenerId, ListenerTarget, ValueChange,
};
pub use blackboards::{BlackboardSet, ListenerKey, VariableRef};
pub use compare::{evaluate, evaluate_operands, ConditionOperator, Operand, ParseOperatorError};
pub use error::{BlackboardError, Result};
pub use guid::Guid;
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;
pub use value::{BlackboardValue, EnumValue, ObjectHandle, ValueType, VariableType};
pub use variable::{BlackboardVariable, VariableCell};
