use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Blackboard, BlackboardError, BlackboardValue, BlackboardVariable, Guid, Result, ValueType};

/// Declaration of one variable in a blackboard template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableDefinition {
    pub guid: Guid,
    pub name: String,
    pub value_type: ValueType,
    pub default: BlackboardValue,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_shared: bool,
}

impl VariableDefinition {
    pub fn new(guid: Guid, name: impl Into<String>, default: BlackboardValue) -> Self {
        Self {
            guid,
            name: name.into(),
            value_type: default.value_type(),
            default,
            is_shared: false,
        }
    }

    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }
}

/// Blackboard template. Every instance gets fresh storage for its own
/// variables; shared variables use the single cell created here.
#[derive(Debug)]
pub struct BlackboardAsset {
    guid: Guid,
    name: String,
    definitions: Vec<VariableDefinition>,
    shared: Vec<Option<BlackboardVariable>>,
}

impl BlackboardAsset {
    pub fn new(
        guid: Guid,
        name: impl Into<String>,
        definitions: Vec<VariableDefinition>,
    ) -> Result<Self> {
        let mut shared = Vec::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if definitions[..i].iter().any(|d| d.guid == def.guid) {
                return Err(BlackboardError::DuplicateVariable(def.guid));
            }
            let var = BlackboardVariable::typed(
                def.guid,
                def.name.clone(),
                def.value_type.clone(),
                def.default.clone(),
            )?;
            shared.push(def.is_shared.then(|| var.with_shared(true)));
        }
        Ok(Self {
            guid,
            name: name.into(),
            definitions,
            shared,
        })
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definitions(&self) -> &[VariableDefinition] {
        &self.definitions
    }

    /// A new blackboard built from the template.
    pub fn instantiate(&self) -> Result<Blackboard> {
        let mut board = Blackboard::new();
        for (def, shared) in self.definitions.iter().zip(&self.shared) {
            let var = match shared {
                Some(cell) => cell.share(),
                None => BlackboardVariable::typed(
                    def.guid,
                    def.name.clone(),
                    def.value_type.clone(),
                    def.default.clone(),
                )?,
            };
            board.add(var)?;
        }
        Ok(board)
    }
}

/// A module's handle on one blackboard, remembering the template it came from.
#[derive(Debug, Default)]
pub struct BlackboardReference {
    asset: Option<Arc<BlackboardAsset>>,
    blackboard: Blackboard,
}

impl BlackboardReference {
    pub fn from_asset(asset: Arc<BlackboardAsset>) -> Result<Self> {
        let blackboard = asset.instantiate()?;
        Ok(Self {
            asset: Some(asset),
            blackboard,
        })
    }

    /// A blackboard not backed by any template.
    pub fn detached(blackboard: Blackboard) -> Self {
        Self {
            asset: None,
            blackboard,
        }
    }

    pub fn asset(&self) -> Option<&Arc<BlackboardAsset>> {
        self.asset.as_ref()
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Another reference to the same template with fresh instance storage.
    pub fn instance(&self) -> Result<Self> {
        let blackboard = match &self.asset {
            Some(asset) => asset.instantiate()?,
            None => self.blackboard.instance()?,
        };
        Ok(Self {
            asset: self.asset.clone(),
            blackboard,
        })
    }
}
