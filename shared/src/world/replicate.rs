use crate::serde::{SerdeErr, StreamRead, StreamWrite};

/// Selects how much of an entity is written.
///
/// `Full` carries the complete state and is used for `Create` messages and
/// snapshots. `Delta` carries what changed since the last tick's flush and
/// is used for `Update` messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncMode {
    Full,
    Delta,
}

/// An entity type that can be stored in a world and replicated to peers.
///
/// Implementations walk their fields through the streaming contract, usually
/// via [`Serde`](crate::serde::Serde). `read` must consume exactly what the
/// matching `write` produced: leftover bytes after a wire payload are a
/// protocol fault.
///
/// `Clone` lets a receiver decode an update into a copy and commit it only
/// once the whole payload has been read.
pub trait Replicate: Clone + Default + 'static {
    /// Name used to key the entity's storage in snapshots
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn write<W: StreamWrite + ?Sized>(&self, writer: &mut W, mode: SyncMode);

    fn read<R: StreamRead + ?Sized>(&mut self, reader: &mut R, mode: SyncMode)
        -> Result<(), SerdeErr>;

    /// Called once after an update has been sent to every observer
    fn post_update(&mut self) {}

    /// Called on every live entity at the start of each server tick
    fn end_tick(&mut self) {}
}
