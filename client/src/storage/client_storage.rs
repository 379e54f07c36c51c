use std::any::Any;

use log::{debug, trace};

use replica_shared::{
    ByteReader, EntityTable, Handle, MessageHeader, MessageType, ReceiveError, Replicate,
    StorageError, StorageId, SyncMode,
};

use crate::events::ClientEvents;

/// The client's mirror of the entities of one type the server replicates to
/// it. Slots only change when a server message arrives, at the index and
/// generation the server chose.
pub struct ClientStorage<T: Replicate> {
    id: StorageId,
    table: EntityTable<T>,
}

impl<T: Replicate> ClientStorage<T> {
    pub(crate) fn new(id: StorageId) -> Self {
        Self {
            id,
            table: EntityTable::new(),
        }
    }

    pub fn id(&self) -> StorageId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn alive(&self, handle: Handle<T>) -> bool {
        self.table.contains(handle.index(), handle.generation())
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.table.get(handle.index(), handle.generation())
    }

    /// # Panics
    ///
    /// Panics if the handle is stale
    pub fn entity(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(entity) => entity,
            None => panic!(
                "{}",
                StorageError::StaleHandle {
                    storage: T::type_name(),
                    index: handle.index(),
                    generation: handle.generation(),
                }
            ),
        }
    }

    /// Mirrored entities in storage order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.table
            .iter()
            .map(|(index, generation, entity)| (Handle::new(index, generation), entity))
    }

    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    fn end_tick(&mut self) {
        for (_, _, entity) in self.table.iter_mut() {
            entity.end_tick();
        }
    }

    /// Applies one message received from the server
    fn receive(
        &mut self,
        header: &MessageHeader,
        payload: &[u8],
        events: &mut ClientEvents,
    ) -> Result<(), ReceiveError> {
        let handle = Handle::<T>::new(header.index, header.generation);
        match header.message_type {
            MessageType::Create => {
                let mut entity = T::default();
                read_payload(&mut entity, payload, SyncMode::Full)?;
                if self
                    .table
                    .insert_at(handle.index(), handle.generation(), entity)
                    .is_some()
                {
                    debug!("Create for {:?} replaced a stale mirror", handle);
                }
                trace!("Mirrored {:?}", handle);
                events.push_create(handle);
            }
            MessageType::Update => match self.table.get_mut(handle.index(), handle.generation()) {
                Some(entity) => {
                    read_payload(entity, payload, SyncMode::Delta)?;
                    events.push_update(handle);
                }
                None => {
                    let mut scratch = T::default();
                    read_payload(&mut scratch, payload, SyncMode::Delta)?;
                    debug!("Ignoring Update of unmirrored {:?}", handle);
                }
            },
            MessageType::Destroy => {
                if !payload.is_empty() {
                    return Err(ReceiveError::TrailingBytes {
                        storage: T::type_name(),
                        remaining: payload.len(),
                    });
                }
                if self
                    .table
                    .remove(handle.index(), handle.generation())
                    .is_some()
                {
                    trace!("Removed mirror of {:?}", handle);
                    events.push_destroy(handle);
                } else {
                    debug!("Ignoring Destroy of unmirrored {:?}", handle);
                }
            }
        }
        Ok(())
    }
}

fn read_payload<T: Replicate>(
    entity: &mut T,
    payload: &[u8],
    mode: SyncMode,
) -> Result<(), ReceiveError> {
    let mut reader = ByteReader::new(payload);
    entity
        .read(&mut reader, mode)
        .map_err(|source| ReceiveError::Payload {
            storage: T::type_name(),
            source,
        })?;
    if !reader.is_exhausted() {
        return Err(ReceiveError::TrailingBytes {
            storage: T::type_name(),
            remaining: reader.remaining(),
        });
    }
    Ok(())
}

/// Type-erased view of a [`ClientStorage`] for dispatch by storage id
pub(crate) trait ErasedStorage {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn end_tick(&mut self);
    fn receive(
        &mut self,
        header: &MessageHeader,
        payload: &[u8],
        events: &mut ClientEvents,
    ) -> Result<(), ReceiveError>;
}

impl<T: Replicate> ErasedStorage for ClientStorage<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn end_tick(&mut self) {
        ClientStorage::end_tick(self);
    }

    fn receive(
        &mut self,
        header: &MessageHeader,
        payload: &[u8],
        events: &mut ClientEvents,
    ) -> Result<(), ReceiveError> {
        ClientStorage::receive(self, header, payload, events)
    }
}
