use std::ops::{Deref, DerefMut};

use replica_shared::{Handle, Replicate, StorageError};

use crate::{
    connections::Connections,
    storage::{entity_mut::EntityMut, server_storage::ServerStorage},
    ClientKey, ReplicaServerError,
};

/// Mutable access to one storage together with the connections its
/// replication operations send on.
///
/// Dereferences to [`ServerStorage`] for everything that does not send.
pub struct StorageMut<'w, T: Replicate> {
    storage: &'w mut ServerStorage<T>,
    connections: &'w mut Connections,
}

impl<'w, T: Replicate> StorageMut<'w, T> {
    pub(crate) fn new(storage: &'w mut ServerStorage<T>, connections: &'w mut Connections) -> Self {
        Self {
            storage,
            connections,
        }
    }

    /// Sends `Destroy` to every observer, then removes the entity and
    /// recycles its slot
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale. Use `try_destroy` for handles of
    /// unknown validity.
    pub fn destroy(&mut self, handle: Handle<T>) -> T {
        match self.try_destroy(handle) {
            Ok(entity) => entity,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_destroy(&mut self, handle: Handle<T>) -> Result<T, StorageError> {
        self.storage.destroy_entity(handle, self.connections)
    }

    /// Grants authority over the entity to a client, or returns control to
    /// the server with `None`
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the client is not connected
    pub fn set_authority(&mut self, handle: Handle<T>, authority: Option<ClientKey>) {
        if let Err(error) = self.try_set_authority(handle, authority) {
            panic!("{}", error);
        }
    }

    pub fn try_set_authority(
        &mut self,
        handle: Handle<T>,
        authority: Option<ClientKey>,
    ) -> Result<(), ReplicaServerError> {
        if let Some(client) = authority {
            self.connections.ensure_connected(client)?;
        }
        self.storage.set_authority_of(handle, authority)?;
        Ok(())
    }

    /// Adds the client as observer and queues the full entity to it. Adding
    /// an existing observer does nothing and returns `false`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the client is not connected
    pub fn add_observer(&mut self, handle: Handle<T>, client: ClientKey) -> bool {
        match self.try_add_observer(handle, client) {
            Ok(added) => added,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_add_observer(
        &mut self,
        handle: Handle<T>,
        client: ClientKey,
    ) -> Result<bool, ReplicaServerError> {
        self.connections.ensure_connected(client)?;
        Ok(self.storage.add_observer_to(handle, client, self.connections)?)
    }

    /// Queues `Destroy` to the client and stops it observing. Removing a
    /// client that is not observing does nothing and returns `false`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale
    pub fn remove_observer(&mut self, handle: Handle<T>, client: ClientKey) -> bool {
        match self
            .storage
            .remove_observer_from(handle, client, self.connections)
        {
            Ok(removed) => removed,
            Err(error) => panic!("{}", error),
        }
    }

    /// Queues the entity's changes to every observer, then runs its
    /// `post_update` hook
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale
    pub fn update_observers(&mut self, handle: Handle<T>) {
        if let Err(error) = self.storage.update_observers_of(handle, self.connections) {
            panic!("{}", error);
        }
    }

    /// Visits every live entity, last to first. The callback may destroy the
    /// visited entity; every other entity is still visited exactly once.
    pub fn run<F>(&mut self, callback: F)
    where
        F: FnMut(&mut EntityMut<'_, T>),
    {
        self.storage.run_each(self.connections, callback);
    }
}

impl<T: Replicate> Deref for StorageMut<'_, T> {
    type Target = ServerStorage<T>;

    fn deref(&self) -> &Self::Target {
        self.storage
    }
}

impl<T: Replicate> DerefMut for StorageMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.storage
    }
}
