use std::{collections::HashMap, mem};

use log::{info, trace, warn};

use replica_shared::{
    Connection, ConnectionError, Listener, ReceiveError, Replicate, StorageError, StorageId,
};

use crate::{
    connections::Connections,
    events::{DisconnectReason, ServerEvents},
    storage::{
        erased_storage::ErasedStorage, server_storage::ServerStorage,
        storage_config::StorageConfig, storage_mut::StorageMut,
    },
    ClientKey, ReplicaServerError, ServerConfig,
};

/// The server side of a replicated world: every registered storage, every
/// client connection, and the tick loop that moves messages between them.
///
/// A tick runs, in order: entity housekeeping, exit handling, accepting new
/// connections, reading and applying client messages, and flushing queued
/// output. Faults on one connection drop that client only.
pub struct ServerWorld {
    config: ServerConfig,
    listener: Option<Box<dyn Listener>>,
    pub(crate) connections: Connections,
    pub(crate) storages: Vec<Box<dyn ErasedStorage>>,
    names: HashMap<&'static str, StorageId>,
    events: ServerEvents,
    payload: Vec<u8>,
    exit_requested: bool,
}

impl ServerWorld {
    pub fn new<L: Listener + 'static>(listener: L, config: ServerConfig) -> Self {
        Self {
            config,
            listener: Some(Box::new(listener)),
            connections: Connections::new(),
            storages: Vec::new(),
            names: HashMap::new(),
            events: ServerEvents::new(),
            payload: Vec::new(),
            exit_requested: false,
        }
    }

    // Storages

    /// Registers the storage for entities of type `T`. Ids are handed out in
    /// registration order, so clients must register the same types in the
    /// same order.
    ///
    /// # Panics
    ///
    /// Panics if `T` is already registered
    pub fn register<T: Replicate>(&mut self, config: StorageConfig) -> StorageId {
        match self.try_register::<T>(config) {
            Ok(id) => id,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_register<T: Replicate>(
        &mut self,
        config: StorageConfig,
    ) -> Result<StorageId, StorageError> {
        let name = T::type_name();
        if self.names.contains_key(name) {
            return Err(StorageError::AlreadyRegistered { name });
        }

        let Ok(next) = u32::try_from(self.storages.len()) else {
            panic!("Storage id space exhausted");
        };
        let id = StorageId::new(next);
        self.storages.push(Box::new(ServerStorage::<T>::new(id, config)));
        self.names.insert(name, id);
        info!("Registered storage `{}` as id {}", name, id);
        Ok(id)
    }

    /// # Panics
    ///
    /// Panics if `T` is not registered
    pub fn storage<T: Replicate>(&self) -> &ServerStorage<T> {
        match self.try_storage::<T>() {
            Ok(storage) => storage,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_storage<T: Replicate>(&self) -> Result<&ServerStorage<T>, StorageError> {
        let id = self.storage_id::<T>()?;
        self.storages[id.as_usize()]
            .as_any()
            .downcast_ref::<ServerStorage<T>>()
            .ok_or(StorageError::NotRegistered {
                name: T::type_name(),
            })
    }

    /// # Panics
    ///
    /// Panics if `T` is not registered
    pub fn storage_mut<T: Replicate>(&mut self) -> StorageMut<'_, T> {
        match self.try_storage_mut::<T>() {
            Ok(storage) => storage,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_storage_mut<T: Replicate>(&mut self) -> Result<StorageMut<'_, T>, StorageError> {
        let id = self.storage_id::<T>()?;
        let storage = self.storages[id.as_usize()]
            .as_any_mut()
            .downcast_mut::<ServerStorage<T>>()
            .ok_or(StorageError::NotRegistered {
                name: T::type_name(),
            })?;
        Ok(StorageMut::new(storage, &mut self.connections))
    }

    pub fn storage_id<T: Replicate>(&self) -> Result<StorageId, StorageError> {
        self.names
            .get(T::type_name())
            .copied()
            .ok_or(StorageError::NotRegistered {
                name: T::type_name(),
            })
    }

    // Clients

    pub fn client_keys(&self) -> Vec<ClientKey> {
        self.connections.keys()
    }

    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    pub fn client_exists(&self, client: ClientKey) -> bool {
        self.connections.contains(client)
    }

    pub fn is_authenticated(&self, client: ClientKey) -> bool {
        self.connections.is_authenticated(client)
    }

    /// Marks whether the client passes `CreatePolicy::AuthenticatedClients`
    pub fn set_authenticated(
        &mut self,
        client: ClientKey,
        authenticated: bool,
    ) -> Result<(), ReplicaServerError> {
        let Some(connection) = self.connections.get_mut(client) else {
            return Err(ReplicaServerError::UnknownClient { client });
        };
        connection.authenticated = authenticated;
        Ok(())
    }

    /// Drops the client right away, flushing what was queued for it. Its
    /// observations and authorities are released.
    pub fn disconnect_client(&mut self, client: ClientKey) -> Result<(), ReplicaServerError> {
        if !self.connections.contains(client) {
            return Err(ReplicaServerError::UnknownClient { client });
        }
        self.disconnect(client, DisconnectReason::Kicked);
        Ok(())
    }

    // Ticking

    /// Requests that the next tick disconnects everyone and stops
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// Runs one tick. Returns `false` once the world has stopped.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        for storage in &mut self.storages {
            storage.end_tick();
        }

        if self.exit_requested {
            self.shutdown();
            return false;
        }

        self.accept_connections();
        self.receive_messages();
        self.flush_connections();
        true
    }

    pub fn take_events(&mut self) -> ServerEvents {
        mem::replace(&mut self.events, ServerEvents::new())
    }

    fn shutdown(&mut self) {
        info!("Server exiting, disconnecting {} clients", self.connections.len());
        for client in self.connections.keys() {
            self.disconnect(client, DisconnectReason::ServerShutdown);
        }
        self.listener = None;
    }

    fn accept_connections(&mut self) {
        let Some(listener) = self.listener.as_mut() else {
            return;
        };

        loop {
            match listener.accept() {
                Ok(Some(stream)) => {
                    let connection = Connection::new(stream, self.config.connection.clone());
                    let client = self.connections.insert(connection);
                    info!("Client {} connected", client);
                    self.events.push_connection(client);
                }
                Ok(None) => break,
                Err(error) => {
                    warn!("Failed to accept a connection: {}", error);
                    self.events.push_error(ReplicaServerError::Accept(error));
                    break;
                }
            }
        }
    }

    fn receive_messages(&mut self) {
        for client in self.connections.keys().into_iter().rev() {
            let Err(error) = self.receive_from(client) else {
                continue;
            };

            match error {
                ReceiveError::Connection(ConnectionError::Closed) => {
                    self.disconnect(client, DisconnectReason::PeerClosed);
                }
                error => {
                    warn!("Dropping client {}: {}", client, error);
                    self.events.push_error(ReplicaServerError::Receive {
                        client,
                        source: error,
                    });
                    self.disconnect(client, DisconnectReason::ProtocolFault);
                }
            }
        }
    }

    fn receive_from(&mut self, client: ClientKey) -> Result<(), ReceiveError> {
        match self.connections.get_mut(client) {
            Some(connection) => connection.connection.receive()?,
            None => return Ok(()),
        };

        for _ in 0..self.config.max_messages_per_tick {
            let Some(connection) = self.connections.get_mut(client) else {
                break;
            };
            let Some(header) = connection.connection.read_message(&mut self.payload)? else {
                break;
            };

            let Some(storage) = self.storages.get_mut(header.storage_id.as_usize()) else {
                return Err(ReceiveError::UnknownStorage {
                    storage_id: header.storage_id,
                });
            };
            trace!(
                "Client {} sent {:?} for `{}`",
                client,
                header.message_type,
                storage.type_name()
            );
            storage.receive(
                client,
                &header,
                &self.payload,
                &mut self.connections,
                &mut self.events,
            )?;
        }
        Ok(())
    }

    fn flush_connections(&mut self) {
        for client in self.connections.keys() {
            let Some(connection) = self.connections.get_mut(client) else {
                continue;
            };
            if let Err(error) = connection.connection.flush() {
                warn!("Dropping client {}: {}", client, error);
                self.events.push_error(ReplicaServerError::Send {
                    client,
                    source: error,
                });
                self.disconnect(client, DisconnectReason::SendFailed);
            }
        }
    }

    fn disconnect(&mut self, client: ClientKey, reason: DisconnectReason) {
        let Some(mut connection) = self.connections.remove(client) else {
            return;
        };
        connection.connection.close();

        for storage in &mut self.storages {
            storage.remove_client(client);
        }
        info!("Client {} disconnected: {:?}", client, reason);
        self.events.push_disconnection(client, reason);
    }
}
