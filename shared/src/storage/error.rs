use thiserror::Error;

/// Errors from the recoverable storage API (`try_*` accessors and world
/// lookups). The panicking accessors raise the same conditions as panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Handle refers to a slot that was destroyed or never existed
    #[error("Stale handle: slot {index} generation {generation} is not alive in storage `{storage}`")]
    StaleHandle {
        storage: &'static str,
        index: u32,
        generation: u32,
    },

    /// No storage was registered for the entity type
    #[error("No storage is registered for entity type `{name}`")]
    NotRegistered { name: &'static str },

    /// A storage for the entity type already exists
    #[error("A storage for entity type `{name}` is already registered")]
    AlreadyRegistered { name: &'static str },
}
