use std::fmt;

/// Numeric id of a registered storage, assigned in registration order.
///
/// Written into every message header and used as an index into a world's
/// storage list, so both peers must register the same entity types in the
/// same order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(u32);

impl StorageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
