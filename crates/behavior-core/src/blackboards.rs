#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    BlackboardError, BlackboardReference, BlackboardValue, BlackboardVariable, ChangeNotice, Guid,
    ListenerId, ListenerTarget, Result, ValueType, VariableType,
};

/// Position of a variable inside a [`BlackboardSet`]. Board 0 is the primary
/// blackboard; higher boards are groups in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableRef {
    pub board: u16,
    pub index: u32,
}

impl VariableRef {
    pub const fn new(board: u16, index: u32) -> Self {
        Self { board, index }
    }

    pub const fn primary(index: u32) -> Self {
        Self { board: 0, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey {
    pub board: u16,
    pub listener: ListenerId,
}

/// The primary blackboard of a module plus its group blackboards.
#[derive(Debug, Default)]
pub struct BlackboardSet {
    references: Vec<BlackboardReference>,
}

impl BlackboardSet {
    pub fn new(primary: BlackboardReference) -> Self {
        Self {
            references: vec![primary],
        }
    }

    pub fn with_group(mut self, group: BlackboardReference) -> Self {
        self.push_group(group);
        self
    }

    /// Adds a group blackboard and returns its board number.
    pub fn push_group(&mut self, group: BlackboardReference) -> u16 {
        if self.references.is_empty() {
            self.references.push(BlackboardReference::default());
        }
        self.references.push(group);
        (self.references.len() - 1) as u16
    }

    pub fn primary(&self) -> Option<&BlackboardReference> {
        self.references.first()
    }

    pub fn primary_mut(&mut self) -> Option<&mut BlackboardReference> {
        self.references.first_mut()
    }

    /// Replaces the primary blackboard, keeping any groups.
    pub fn set_primary(&mut self, primary: BlackboardReference) {
        match self.references.first_mut() {
            Some(slot) => *slot = primary,
            None => self.references.push(primary),
        }
    }

    pub fn references(&self) -> &[BlackboardReference] {
        &self.references
    }

    pub fn board(&self, board: u16) -> Result<&BlackboardReference> {
        self.references
            .get(board as usize)
            .ok_or(BlackboardError::UnknownBoard(board))
    }

    pub fn board_mut(&mut self, board: u16) -> Result<&mut BlackboardReference> {
        self.references
            .get_mut(board as usize)
            .ok_or(BlackboardError::UnknownBoard(board))
    }

    /// Looks a GUID up in the primary board first, then in the groups.
    pub fn find(&self, guid: Guid) -> Option<VariableRef> {
        self.references.iter().enumerate().find_map(|(b, r)| {
            r.blackboard()
                .index_of(guid)
                .map(|i| VariableRef::new(b as u16, i as u32))
        })
    }

    /// First variable with this name, primary board first.
    pub fn find_by_name(&self, name: &str) -> Option<VariableRef> {
        self.references.iter().enumerate().find_map(|(b, r)| {
            r.blackboard()
                .index_of_name(name)
                .map(|i| VariableRef::new(b as u16, i as u32))
        })
    }

    pub fn find_typed(&self, name: &str, value_type: &ValueType) -> Option<VariableRef> {
        self.references.iter().enumerate().find_map(|(b, r)| {
            r.blackboard()
                .variables()
                .iter()
                .position(|v| v.name() == name && v.value_type() == value_type)
                .map(|i| VariableRef::new(b as u16, i as u32))
        })
    }

    pub fn variable(&self, var: VariableRef) -> Result<&BlackboardVariable> {
        self.board(var.board)?
            .blackboard()
            .variable(var.index as usize)
            .ok_or_else(|| BlackboardError::UnknownVariable(format!("{}#{}", var.board, var.index)))
    }

    pub fn get(&self, var: VariableRef) -> Result<BlackboardValue> {
        self.board(var.board)?.blackboard().get(var.index as usize)
    }

    pub fn get_as<T: VariableType>(&self, var: VariableRef) -> Result<T> {
        self.board(var.board)?.blackboard().get_as(var.index as usize)
    }

    pub fn set(&mut self, var: VariableRef, value: BlackboardValue) -> Result<()> {
        self.board_mut(var.board)?
            .blackboard_mut()
            .set(var.index as usize, value)
    }

    pub fn set_as<T: VariableType>(&mut self, var: VariableRef, value: T) -> Result<()> {
        self.set(var, value.into_value())
    }

    pub fn get_by_name(&self, name: &str) -> Result<BlackboardValue> {
        let var = self
            .find_by_name(name)
            .ok_or_else(|| BlackboardError::UnknownVariable(name.to_string()))?;
        self.get(var)
    }

    pub fn set_by_name(&mut self, name: &str, value: BlackboardValue) -> Result<()> {
        let var = self
            .find_by_name(name)
            .ok_or_else(|| BlackboardError::UnknownVariable(name.to_string()))?;
        self.set(var, value)
    }

    pub fn get_by_guid(&self, guid: Guid) -> Result<BlackboardValue> {
        let var = self
            .find(guid)
            .ok_or_else(|| BlackboardError::UnknownVariable(guid.to_string()))?;
        self.get(var)
    }

    pub fn set_by_guid(&mut self, guid: Guid, value: BlackboardValue) -> Result<()> {
        let var = self
            .find(guid)
            .ok_or_else(|| BlackboardError::UnknownVariable(guid.to_string()))?;
        self.set(var, value)
    }

    pub fn restore(&mut self, var: VariableRef, value: BlackboardValue) -> Result<()> {
        self.board_mut(var.board)?
            .blackboard_mut()
            .restore(var.index as usize, value)
    }

    pub fn subscribe(&mut self, var: VariableRef, target: ListenerTarget) -> Result<ListenerKey> {
        let listener = self
            .board_mut(var.board)?
            .blackboard_mut()
            .subscribe(var.index as usize, target)?;
        Ok(ListenerKey {
            board: var.board,
            listener,
        })
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        match self.board_mut(key.board) {
            Ok(r) => r.blackboard_mut().unsubscribe(key.listener),
            Err(_) => false,
        }
    }

    pub fn take_pending(&mut self, key: ListenerKey) -> Result<usize> {
        self.board_mut(key.board)?
            .blackboard_mut()
            .take_pending(key.listener)
    }

    pub fn take_notices(&mut self) -> Vec<ChangeNotice> {
        self.references
            .iter_mut()
            .flat_map(|r| r.blackboard_mut().take_notices())
            .collect()
    }

    /// Polls every board for writes made through other instances.
    pub fn poll(&mut self) -> Result<usize> {
        let mut delivered = 0;
        for r in &mut self.references {
            delivered += r.blackboard_mut().poll()?;
        }
        Ok(delivered)
    }

    pub fn substitute(&mut self, var: VariableRef, source: &BlackboardVariable) -> Result<()> {
        self.board_mut(var.board)?
            .blackboard_mut()
            .substitute(var.index as usize, source)
    }

    /// Fresh instance storage for every board.
    pub fn instance(&self) -> Result<Self> {
        let references = self
            .references
            .iter()
            .map(BlackboardReference::instance)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { references })
    }
}
