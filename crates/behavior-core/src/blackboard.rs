use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BlackboardError, BlackboardValue, BlackboardVariable, Guid, Result, VariableType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ListenerId(pub u64);

/// What a change listener receives per write.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub variable: Guid,
    pub value: BlackboardValue,
    pub version: u64,
}

/// Queued notification for a `Notify` listener. The owner of the blackboard
/// drains these and turns the token back into whatever it identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    pub token: u64,
    pub variable: Guid,
}

pub type ChangeCallback = Box<dyn FnMut(&ValueChange) + Send>;

pub enum ListenerTarget {
    /// Count writes; read and clear with [`Blackboard::take_pending`].
    Mailbox,
    /// Queue a [`ChangeNotice`] carrying the token.
    Notify(u64),
    /// Invoke immediately.
    Callback(ChangeCallback),
}

impl fmt::Debug for ListenerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerTarget::Mailbox => f.write_str("Mailbox"),
            ListenerTarget::Notify(token) => f.debug_tuple("Notify").field(token).finish(),
            ListenerTarget::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

#[derive(Debug)]
struct Listener {
    variable: usize,
    target: ListenerTarget,
    seen_version: u64,
    pending: usize,
}

/// Ordered set of variables with change listeners.
///
/// Listeners remember the last storage version they were told about. A write
/// through this blackboard dispatches immediately; writes made elsewhere to a
/// shared cell are picked up by [`Blackboard::poll`]. Either way each write is
/// delivered exactly once.
#[derive(Debug, Default)]
pub struct Blackboard {
    variables: Vec<BlackboardVariable>,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener: u64,
    notices: Vec<ChangeNotice>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variables(variables: Vec<BlackboardVariable>) -> Result<Self> {
        let mut board = Self::new();
        for var in variables {
            board.add(var)?;
        }
        Ok(board)
    }

    pub fn add(&mut self, variable: BlackboardVariable) -> Result<usize> {
        if self.index_of(variable.guid()).is_some() {
            return Err(BlackboardError::DuplicateVariable(variable.guid()));
        }
        self.variables.push(variable);
        Ok(self.variables.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[BlackboardVariable] {
        &self.variables
    }

    pub fn variable(&self, index: usize) -> Option<&BlackboardVariable> {
        self.variables.get(index)
    }

    pub fn index_of(&self, guid: Guid) -> Option<usize> {
        self.variables.iter().position(|v| v.guid() == guid)
    }

    /// First variable with this name.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name() == name)
    }

    pub fn find(&self, guid: Guid) -> Option<&BlackboardVariable> {
        self.index_of(guid).map(|i| &self.variables[i])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&BlackboardVariable> {
        self.index_of_name(name).map(|i| &self.variables[i])
    }

    fn entry(&self, index: usize) -> Result<&BlackboardVariable> {
        self.variables
            .get(index)
            .ok_or_else(|| BlackboardError::UnknownVariable(format!("#{index}")))
    }

    pub fn get(&self, index: usize) -> Result<BlackboardValue> {
        self.entry(index)?.value()
    }

    pub fn get_as<T: VariableType>(&self, index: usize) -> Result<T> {
        let var = self.entry(index)?;
        let value = var.value()?;
        T::from_value(&value).ok_or_else(|| BlackboardError::TypeMismatch {
            variable: var.name().to_string(),
            expected: var.value_type().clone(),
            found: value.value_type(),
        })
    }

    /// Writes and notifies this blackboard's listeners on the variable.
    pub fn set(&mut self, index: usize, value: BlackboardValue) -> Result<()> {
        self.entry(index)?.write(value)?;
        self.dispatch(index)
    }

    pub fn set_as<T: VariableType>(&mut self, index: usize, value: T) -> Result<()> {
        self.set(index, value.into_value())
    }

    pub fn get_by_name(&self, name: &str) -> Result<BlackboardValue> {
        let index = self
            .index_of_name(name)
            .ok_or_else(|| BlackboardError::UnknownVariable(name.to_string()))?;
        self.get(index)
    }

    pub fn set_by_name(&mut self, name: &str, value: BlackboardValue) -> Result<()> {
        let index = self
            .index_of_name(name)
            .ok_or_else(|| BlackboardError::UnknownVariable(name.to_string()))?;
        self.set(index, value)
    }

    pub fn get_by_guid(&self, guid: Guid) -> Result<BlackboardValue> {
        let index = self
            .index_of(guid)
            .ok_or_else(|| BlackboardError::UnknownVariable(guid.to_string()))?;
        self.get(index)
    }

    pub fn set_by_guid(&mut self, guid: Guid, value: BlackboardValue) -> Result<()> {
        let index = self
            .index_of(guid)
            .ok_or_else(|| BlackboardError::UnknownVariable(guid.to_string()))?;
        self.set(index, value)
    }

    /// Writes without notifying anyone and without bumping the version.
    pub fn restore(&mut self, index: usize, value: BlackboardValue) -> Result<()> {
        self.entry(index)?.restore(value)
    }

    /// Registers a listener. Writes made before this call are not reported.
    pub fn subscribe(&mut self, index: usize, target: ListenerTarget) -> Result<ListenerId> {
        let seen_version = self.entry(index)?.version()?;
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(
            id,
            Listener {
                variable: index,
                target,
                seen_version,
                pending: 0,
            },
        );
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of writes seen by a mailbox listener since the last call.
    pub fn take_pending(&mut self, id: ListenerId) -> Result<usize> {
        let listener = self
            .listeners
            .get_mut(&id)
            .ok_or(BlackboardError::UnknownListener(id.0))?;
        Ok(std::mem::take(&mut listener.pending))
    }

    pub fn take_notices(&mut self) -> Vec<ChangeNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Delivers writes made to shared storage through other blackboards.
    /// Returns the number of deliveries.
    pub fn poll(&mut self) -> Result<usize> {
        let mut delivered = 0;
        for index in 0..self.variables.len() {
            delivered += self.deliver(index)?;
        }
        Ok(delivered)
    }

    /// Points variable `index` at `source`'s storage.
    ///
    /// Listeners on the entry are rebased on the new storage so the swap
    /// itself is not reported as a change.
    pub fn substitute(&mut self, index: usize, source: &BlackboardVariable) -> Result<()> {
        let var = self
            .variables
            .get_mut(index)
            .ok_or_else(|| BlackboardError::UnknownVariable(format!("#{index}")))?;
        var.substitute(source)?;
        let version = var.version()?;
        for listener in self.listeners.values_mut() {
            if listener.variable == index {
                listener.seen_version = version;
            }
        }
        Ok(())
    }

    /// Copy with fresh storage for every non-shared variable and no listeners.
    pub fn instance(&self) -> Result<Self> {
        let variables = self
            .variables
            .iter()
            .map(|v| if v.is_shared() { Ok(v.share()) } else { v.instance() })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            variables,
            ..Self::default()
        })
    }

    fn dispatch(&mut self, index: usize) -> Result<()> {
        self.deliver(index).map(|_| ())
    }

    fn deliver(&mut self, index: usize) -> Result<usize> {
        let Self {
            variables,
            listeners,
            notices,
            ..
        } = self;
        let Some(var) = variables.get(index) else {
            return Ok(0);
        };
        let version = var.version()?;
        let mut delivered = 0;
        let mut change: Option<ValueChange> = None;
        for listener in listeners.values_mut() {
            if listener.variable != index || listener.seen_version >= version {
                continue;
            }
            let count = (version - listener.seen_version) as usize;
            listener.seen_version = version;
            delivered += count;
            match &mut listener.target {
                ListenerTarget::Mailbox => listener.pending += count,
                ListenerTarget::Notify(token) => {
                    for _ in 0..count {
                        notices.push(ChangeNotice {
                            token: *token,
                            variable: var.guid(),
                        });
                    }
                }
                ListenerTarget::Callback(callback) => {
                    if change.is_none() {
                        change = Some(ValueChange {
                            variable: var.guid(),
                            value: var.value()?,
                            version,
                        });
                    }
                    if let Some(change) = &change {
                        for _ in 0..count {
                            callback(change);
                        }
                    }
                }
            }
        }
        Ok(delivered)
    }
}
