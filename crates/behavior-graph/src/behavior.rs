use std::collections::BTreeMap;

use behavior_core::{BlackboardValue, VariableType};

use crate::{NodeContext, Status};

/// Lifecycle contract of an action leaf.
///
/// `on_start` runs once per activation, `on_update` on every sweep while the
/// node is Running and whenever it is awakened, and `on_end` exactly once when
/// the activation finishes or is interrupted.
pub trait Behavior: Send + 'static {
    fn on_start(&mut self, ctx: &mut NodeContext<'_>) -> Status;

    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> Status {
        ctx.status()
    }

    fn on_end(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Persist whatever the node needs to resume.
    fn on_serialize(&self, _data: &mut NodeData) {}

    /// Restore from [`Behavior::on_serialize`] output. Runs after the node's
    /// status has been restored, so a node that was waiting on external work
    /// can re-issue it here.
    fn on_deserialize(&mut self, _ctx: &mut NodeContext<'_>, _data: &NodeData) {}

    /// Awakening ends and restarts the node instead of calling `on_update`.
    fn restarts_on_awake(&self) -> bool {
        false
    }
}

/// Per-node key/value state carried in snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    fields: BTreeMap<String, BlackboardValue>,
}

impl NodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<BlackboardValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&BlackboardValue> {
        self.fields.get(key)
    }

    pub fn get_as<T: VariableType>(&self, key: &str) -> Option<T> {
        self.fields.get(key).and_then(T::from_value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BlackboardValue)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, BlackboardValue)> for NodeData {
    fn from_iter<I: IntoIterator<Item = (String, BlackboardValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
