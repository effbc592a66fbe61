use std::sync::{Arc, Mutex, MutexGuard};

use crate::{BlackboardError, BlackboardValue, Guid, Result, ValueType};

/// Storage behind a variable. Every successful write bumps `version` by one,
/// which is what listeners count notifications against.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableCell {
    pub value: BlackboardValue,
    pub version: u64,
}

/// A typed, named blackboard entry.
///
/// The storage cell is reference counted: shared variables and subgraph
/// overrides point several entries at one cell, so a write through any of them
/// is visible through all of them.
#[derive(Debug, Clone)]
pub struct BlackboardVariable {
    guid: Guid,
    name: String,
    value_type: ValueType,
    is_shared: bool,
    cell: Arc<Mutex<VariableCell>>,
}

impl BlackboardVariable {
    /// A variable whose declared type is the type of `value`.
    pub fn new(guid: Guid, name: impl Into<String>, value: BlackboardValue) -> Self {
        let value_type = value.value_type();
        Self {
            guid,
            name: name.into(),
            value_type,
            is_shared: false,
            cell: Arc::new(Mutex::new(VariableCell { value, version: 0 })),
        }
    }

    pub fn typed(
        guid: Guid,
        name: impl Into<String>,
        value_type: ValueType,
        value: BlackboardValue,
    ) -> Result<Self> {
        let name = name.into();
        if !value.is_of_type(&value_type) {
            return Err(BlackboardError::TypeMismatch {
                variable: name,
                expected: value_type,
                found: value.value_type(),
            });
        }
        let mut var = Self::new(guid, name, value);
        var.value_type = value_type;
        Ok(var)
    }

    pub fn with_shared(mut self, is_shared: bool) -> Self {
        self.is_shared = is_shared;
        self
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    fn lock(&self) -> Result<MutexGuard<'_, VariableCell>> {
        self.cell
            .lock()
            .map_err(|_| BlackboardError::LockPoisoned(self.name.clone()))
    }

    pub fn value(&self) -> Result<BlackboardValue> {
        Ok(self.lock()?.value.clone())
    }

    pub fn version(&self) -> Result<u64> {
        Ok(self.lock()?.version)
    }

    /// Fails with `TypeMismatch` unless `value` fits this variable.
    pub fn check_type(&self, value: &BlackboardValue) -> Result<()> {
        if value.is_of_type(&self.value_type) {
            Ok(())
        } else {
            Err(BlackboardError::TypeMismatch {
                variable: self.name.clone(),
                expected: self.value_type.clone(),
                found: value.value_type(),
            })
        }
    }

    /// Stores `value` and returns the new version.
    ///
    /// Writing an equal value still counts as a write.
    pub fn write(&self, value: BlackboardValue) -> Result<u64> {
        self.check_type(&value)?;
        let mut cell = self.lock()?;
        cell.value = value;
        cell.version = cell.version.wrapping_add(1);
        Ok(cell.version)
    }

    /// Stores `value` without counting it as a change (snapshot restore).
    pub fn restore(&self, value: BlackboardValue) -> Result<()> {
        self.check_type(&value)?;
        self.lock()?.value = value;
        Ok(())
    }

    /// Same entry with its own storage, initialised to the current value.
    pub fn instance(&self) -> Result<Self> {
        let value = self.value()?;
        Ok(Self {
            guid: self.guid,
            name: self.name.clone(),
            value_type: self.value_type.clone(),
            is_shared: self.is_shared,
            cell: Arc::new(Mutex::new(VariableCell { value, version: 0 })),
        })
    }

    /// Same entry pointing at the same storage.
    pub fn share(&self) -> Self {
        self.clone()
    }

    /// Points this entry at `source`'s storage. GUID and name are kept.
    pub fn substitute(&mut self, source: &BlackboardVariable) -> Result<()> {
        if self.is_shared {
            return Err(BlackboardError::SharedOverride(self.name.clone()));
        }
        if source.value_type != self.value_type {
            return Err(BlackboardError::TypeMismatch {
                variable: self.name.clone(),
                expected: self.value_type.clone(),
                found: source.value_type.clone(),
            });
        }
        self.cell = Arc::clone(&source.cell);
        Ok(())
    }

    pub fn same_storage(&self, other: &BlackboardVariable) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}
