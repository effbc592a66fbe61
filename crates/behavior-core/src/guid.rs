use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rng::mix64;

/// Stable identity for nodes, variables, blackboard assets and graphs.
///
/// GUIDs survive renames and serialization; names are display keys only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Guid(Uuid);

impl Guid {
    pub const NIL: Guid = Guid(Uuid::nil());

    /// A fresh random GUID.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_u128(self) -> u128 {
        self.0.as_u128()
    }

    pub fn is_nil(self) -> bool {
        self.0.is_nil()
    }

    /// Deterministically derive the `index`-th GUID under `namespace`.
    ///
    /// Rebuilding the same graph under the same namespace yields the same node
    /// GUIDs, which is what snapshot restore keys on.
    pub fn derive(namespace: Guid, index: u64) -> Self {
        let raw = namespace.as_u128();
        let hi = (raw >> 64) as u64;
        let lo = raw as u64;
        let salt = mix64(index.wrapping_add(0x9E37_79B9_7F4A_7C15));
        let hi = mix64(hi ^ salt);
        let lo = mix64(lo ^ salt.rotate_left(17) ^ index);
        Self::from_u128(((hi as u128) << 64) | lo as u128)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}
