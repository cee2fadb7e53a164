//! Per-user collection version counter.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Version tag of one user's collection.
///
/// Serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i32);

impl Version {
    /// Version of a freshly provisioned user.
    pub const INITIAL: Version = Version(0);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// Returns the version that follows `self` after one committed mutation.
    ///
    /// Wraps from `i32::MAX` to `0`, never to `i32::MIN`.
    pub const fn next(self) -> Self {
        if self.0 == i32::MAX {
            Self(0)
        } else {
            Self(self.0 + 1)
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Version {
    fn from(value: i32) -> Self {
        Self(value)
    }
}
