use std::collections::BTreeSet;

use log::{debug, trace};

use replica_shared::{
    ByteReader, EntityTable, Handle, MessageHeader, MessageType, ReceiveError, Replicate,
    StorageError, StorageId, SyncMode,
};

use crate::{
    connections::Connections,
    events::ServerEvents,
    storage::{
        entity_mut::EntityMut,
        storage_config::{CreatePolicy, StorageConfig},
    },
    ClientKey,
};

pub(crate) struct ServerRecord<T> {
    pub(crate) entity: T,
    pub(crate) observers: BTreeSet<ClientKey>,
    pub(crate) authority: Option<ClientKey>,
}

impl<T> ServerRecord<T> {
    pub(crate) fn new(entity: T, authority: Option<ClientKey>) -> Self {
        Self {
            entity,
            observers: BTreeSet::new(),
            authority,
        }
    }
}

/// The canonical entities of one type, with the clients observing each one
/// and the client (if any) holding authority over it.
///
/// Read access is available through
/// [`ServerWorld::storage`](crate::ServerWorld::storage). Operations that
/// send to clients go through [`StorageMut`](crate::StorageMut).
pub struct ServerStorage<T: Replicate> {
    id: StorageId,
    config: StorageConfig,
    pub(crate) table: EntityTable<ServerRecord<T>>,
}

impl<T: Replicate> ServerStorage<T> {
    pub(crate) fn new(id: StorageId, config: StorageConfig) -> Self {
        Self {
            id,
            config,
            table: EntityTable::new(),
        }
    }

    pub fn id(&self) -> StorageId {
        self.id
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
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
        self.record(handle).map(|record| &record.entity)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.record_mut(handle).map(|record| &mut record.entity)
    }

    /// # Panics
    ///
    /// Panics if the handle is stale. Use `get` for handles of unknown
    /// validity.
    pub fn entity(&self, handle: Handle<T>) -> &T {
        match self.record(handle) {
            Some(record) => &record.entity,
            None => panic!("{}", self.stale(handle)),
        }
    }

    /// # Panics
    ///
    /// Panics if the handle is stale. Use `get_mut` for handles of unknown
    /// validity.
    pub fn entity_mut(&mut self, handle: Handle<T>) -> &mut T {
        let stale = self.stale(handle);
        match self.record_mut(handle) {
            Some(record) => &mut record.entity,
            None => panic!("{}", stale),
        }
    }

    /// Creates an entity with no observers and no authority. Nothing is sent
    /// until a client is added as observer.
    pub fn create(&mut self, entity: T) -> (Handle<T>, &mut T) {
        let (index, generation) = self.table.insert(ServerRecord::new(entity, None));
        let handle = Handle::new(index, generation);
        trace!("Created {:?}", handle);
        let record = self
            .table
            .get_mut(index, generation)
            .unwrap_or_else(|| unreachable!("entity inserted above"));
        (handle, &mut record.entity)
    }

    /// # Panics
    ///
    /// Panics if the handle is stale
    pub fn authority(&self, handle: Handle<T>) -> Option<ClientKey> {
        match self.record(handle) {
            Some(record) => record.authority,
            None => panic!("{}", self.stale(handle)),
        }
    }


    pub fn is_observer(&self, handle: Handle<T>, client: ClientKey) -> bool {
        self.record(handle)
            .is_some_and(|record| record.observers.contains(&client))
    }

    /// Clients observing the entity, in key order. Empty for a stale handle.
    pub fn observers(&self, handle: Handle<T>) -> impl Iterator<Item = ClientKey> + '_ {
        self.record(handle)
            .into_iter()
            .flat_map(|record| record.observers.iter().copied())
    }

    /// Live entities in storage order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.table
            .iter()
            .map(|(index, generation, record)| (Handle::new(index, generation), &record.entity))
    }

    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    // Crate-public

    pub(crate) fn record(&self, handle: Handle<T>) -> Option<&ServerRecord<T>> {
        self.table.get(handle.index(), handle.generation())
    }

    pub(crate) fn record_mut(&mut self, handle: Handle<T>) -> Option<&mut ServerRecord<T>> {
        self.table.get_mut(handle.index(), handle.generation())
    }

    pub(crate) fn stale(&self, handle: Handle<T>) -> StorageError {
        StorageError::StaleHandle {
            storage: T::type_name(),
            index: handle.index(),
            generation: handle.generation(),
        }
    }

    /// Callers check that the client is connected
    pub(crate) fn set_authority_of(
        &mut self,
        handle: Handle<T>,
        authority: Option<ClientKey>,
    ) -> Result<(), StorageError> {
        let stale = self.stale(handle);
        let record = self.record_mut(handle).ok_or(stale)?;
        record.authority = authority;
        Ok(())
    }

    fn header(&self, message_type: MessageType, handle: Handle<T>) -> MessageHeader {
        MessageHeader::new(self.id, message_type, handle.index(), handle.generation())
    }

    /// Sends `Destroy` to every observer, then removes the entity
    pub(crate) fn destroy_entity(
        &mut self,
        handle: Handle<T>,
        connections: &mut Connections,
    ) -> Result<T, StorageError> {
        let Some(record) = self.record(handle) else {
            return Err(self.stale(handle));
        };

        let header = self.header(MessageType::Destroy, handle);
        for client in &record.observers {
            connections.send_notice(*client, header);
        }

        let record = self
            .table
            .remove(handle.index(), handle.generation())
            .ok_or_else(|| self.stale(handle))?;
        trace!("Destroyed {:?}", handle);
        Ok(record.entity)
    }

    /// Adds the client as observer and sends it the full entity. Returns
    /// `false` if it was already observing.
    pub(crate) fn add_observer_to(
        &mut self,
        handle: Handle<T>,
        client: ClientKey,
        connections: &mut Connections,
    ) -> Result<bool, StorageError> {
        let header = self.header(MessageType::Create, handle);
        let stale = self.stale(handle);
        let record = self.record_mut(handle).ok_or(stale)?;
        if !record.observers.insert(client) {
            return Ok(false);
        }

        let entity = &record.entity;
        connections.send(client, header, |writer| entity.write(writer, SyncMode::Full));
        Ok(true)
    }

    /// Sends `Destroy` to the client and stops it observing. Returns `false`
    /// if it was not observing.
    pub(crate) fn remove_observer_from(
        &mut self,
        handle: Handle<T>,
        client: ClientKey,
        connections: &mut Connections,
    ) -> Result<bool, StorageError> {
        let header = self.header(MessageType::Destroy, handle);
        let stale = self.stale(handle);
        let record = self.record_mut(handle).ok_or(stale)?;
        if !record.observers.remove(&client) {
            return Ok(false);
        }

        connections.send_notice(client, header);
        Ok(true)
    }

    /// Sends the entity's changes to every observer, then runs its
    /// `post_update` hook once
    pub(crate) fn update_observers_of(
        &mut self,
        handle: Handle<T>,
        connections: &mut Connections,
    ) -> Result<(), StorageError> {
        let header = self.header(MessageType::Update, handle);
        let stale = self.stale(handle);
        let record = self.record_mut(handle).ok_or(stale)?;

        let entity = &record.entity;
        for client in &record.observers {
            connections.send(*client, header, |writer| entity.write(writer, SyncMode::Delta));
        }
        record.entity.post_update();
        Ok(())
    }

    pub(crate) fn run_each<F>(&mut self, connections: &mut Connections, mut callback: F)
    where
        F: FnMut(&mut EntityMut<'_, T>),
    {
        let mut position = self.table.len();
        while position > 0 {
            position -= 1;
            let Some((index, generation, _)) = self.table.at(position) else {
                continue;
            };
            let mut entity = EntityMut::new(self, connections, Handle::new(index, generation));
            callback(&mut entity);
        }
    }

    pub(crate) fn end_tick(&mut self) {
        for (_, _, record) in self.table.iter_mut() {
            record.entity.end_tick();
        }
    }

    /// Removes the client from every observer set and returns authority it
    /// held to the server
    pub(crate) fn remove_client(&mut self, client: ClientKey) {
        for (_, _, record) in self.table.iter_mut() {
            record.observers.remove(&client);
            if record.authority == Some(client) {
                record.authority = None;
            }
        }
    }

    /// Applies one message received from a client
    pub(crate) fn receive(
        &mut self,
        sender: ClientKey,
        header: &MessageHeader,
        payload: &[u8],
        connections: &mut Connections,
        events: &mut ServerEvents,
    ) -> Result<(), ReceiveError> {
        match header.message_type {
            MessageType::Create => self.receive_create(sender, payload, connections, events),
            MessageType::Update => {
                self.receive_update(sender, header, payload, connections, events)
            }
            MessageType::Destroy => {
                self.receive_destroy(sender, header, payload, connections, events)
            }
        }
    }

    fn receive_create(
        &mut self,
        sender: ClientKey,
        payload: &[u8],
        connections: &mut Connections,
        events: &mut ServerEvents,
    ) -> Result<(), ReceiveError> {
        let mut entity = T::default();
        read_payload(&mut entity, payload, SyncMode::Full)?;

        let permitted = match self.config.create_policy {
            CreatePolicy::ServerOnly => false,
            CreatePolicy::AuthenticatedClients => connections.is_authenticated(sender),
            CreatePolicy::AnyClient => true,
        };
        if !permitted {
            debug!(
                "Ignoring Create for `{}` from client {}: not permitted by {:?}",
                T::type_name(),
                sender,
                self.config.create_policy
            );
            return Ok(());
        }

        let (index, generation) = self.table.insert(ServerRecord::new(entity, Some(sender)));
        let handle = Handle::new(index, generation);
        trace!("Client {} created {:?}", sender, handle);
        self.add_observer_to(handle, sender, connections)
            .unwrap_or_else(|_| unreachable!("entity inserted above"));
        events.push_create(sender, handle);
        Ok(())
    }

    fn receive_update(
        &mut self,
        sender: ClientKey,
        header: &MessageHeader,
        payload: &[u8],
        connections: &mut Connections,
        events: &mut ServerEvents,
    ) -> Result<(), ReceiveError> {
        let handle = Handle::new(header.index, header.generation);
        let authorized = self
            .record(handle)
            .is_some_and(|record| record.authority == Some(sender));

        if !authorized {
            // still decoded so that a malformed payload is a fault either way
            let mut scratch = T::default();
            read_payload(&mut scratch, payload, SyncMode::Delta)?;
            debug!("Ignoring Update of {:?} from client {}: not the authority", handle, sender);
            return Ok(());
        }

        // decoded into a copy so a failed read leaves the entity untouched
        if let Some(record) = self.record_mut(handle) {
            let mut updated = record.entity.clone();
            read_payload(&mut updated, payload, SyncMode::Delta)?;
            record.entity = updated;
        }
        self.update_observers_of(handle, connections)
            .unwrap_or_else(|_| unreachable!("authority checked above"));
        events.push_update(sender, handle);
        Ok(())
    }

    fn receive_destroy(
        &mut self,
        sender: ClientKey,
        header: &MessageHeader,
        payload: &[u8],
        connections: &mut Connections,
        events: &mut ServerEvents,
    ) -> Result<(), ReceiveError> {
        if !payload.is_empty() {
            return Err(ReceiveError::TrailingBytes {
                storage: T::type_name(),
                remaining: payload.len(),
            });
        }

        let handle = Handle::new(header.index, header.generation);
        let authorized = self
            .record(handle)
            .is_some_and(|record| record.authority == Some(sender));
        if !authorized {
            debug!("Ignoring Destroy of {:?} from client {}: not the authority", handle, sender);
            return Ok(());
        }

        self.destroy_entity(handle, connections)
            .unwrap_or_else(|_| unreachable!("authority checked above"));
        events.push_destroy(sender, handle);
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
