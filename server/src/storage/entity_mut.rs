use replica_shared::{Handle, Replicate};

use crate::{connections::Connections, storage::server_storage::ServerStorage, ClientKey};

/// The entity currently visited by [`StorageMut::run`](crate::StorageMut::run).
///
/// Besides the entity itself it can replicate changes, manage observers and
/// authority, and destroy the entity. Once destroyed, accessing the entity
/// panics.
pub struct EntityMut<'s, T: Replicate> {
    storage: &'s mut ServerStorage<T>,
    connections: &'s mut Connections,
    handle: Handle<T>,
    destroyed: bool,
}

impl<'s, T: Replicate> EntityMut<'s, T> {
    pub(crate) fn new(
        storage: &'s mut ServerStorage<T>,
        connections: &'s mut Connections,
        handle: Handle<T>,
    ) -> Self {
        Self {
            storage,
            connections,
            handle,
            destroyed: false,
        }
    }

    pub fn handle(&self) -> Handle<T> {
        self.handle
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn get(&self) -> &T {
        self.storage.entity(self.handle)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.storage.entity_mut(self.handle)
    }

    pub fn authority(&self) -> Option<ClientKey> {
        self.storage.authority(self.handle)
    }

    /// # Panics
    ///
    /// Panics if the client is not connected
    pub fn set_authority(&mut self, authority: Option<ClientKey>) {
        if let Some(client) = authority {
            if let Err(error) = self.connections.ensure_connected(client) {
                panic!("{}", error);
            }
        }
        if let Err(error) = self.storage.set_authority_of(self.handle, authority) {
            panic!("{}", error);
        }
    }

    pub fn observers(&self) -> impl Iterator<Item = ClientKey> + '_ {
        self.storage.observers(self.handle)
    }

    /// Sends the entity's changes to every observer
    pub fn update_observers(&mut self) {
        if let Err(error) = self
            .storage
            .update_observers_of(self.handle, self.connections)
        {
            panic!("{}", error);
        }
    }

    /// Returns `false` if the client was already observing
    ///
    /// # Panics
    ///
    /// Panics if the client is not connected
    pub fn add_observer(&mut self, client: ClientKey) -> bool {
        if let Err(error) = self.connections.ensure_connected(client) {
            panic!("{}", error);
        }
        match self
            .storage
            .add_observer_to(self.handle, client, self.connections)
        {
            Ok(added) => added,
            Err(error) => panic!("{}", error),
        }
    }

    /// Returns `false` if the client was not observing
    pub fn remove_observer(&mut self, client: ClientKey) -> bool {
        match self
            .storage
            .remove_observer_from(self.handle, client, self.connections)
        {
            Ok(removed) => removed,
            Err(error) => panic!("{}", error),
        }
    }

    /// Destroys the entity, notifying its observers. The iteration continues
    /// with the next entity.
    pub fn destroy(&mut self) -> T {
        match self.storage.destroy_entity(self.handle, self.connections) {
            Ok(entity) => {
                self.destroyed = true;
                entity
            }
            Err(error) => panic!("{}", error),
        }
    }
}
