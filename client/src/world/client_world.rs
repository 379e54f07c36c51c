use std::{collections::HashMap, mem};

use log::{info, trace, warn};

use replica_shared::{
    ByteStream, Connection, ConnectionError, Handle, MessageHeader, MessageType, ReceiveError,
    Replicate, StorageError, StorageId, SyncMode,
};

use crate::{
    events::{ClientEvents, DisconnectReason},
    storage::client_storage::{ClientStorage, ErasedStorage},
    ClientConfig, ReplicaClientError,
};

/// The client side of a replicated world: one mirror storage per registered
/// type and the single connection to the server.
///
/// Any fault on the connection stops the client for good; `tick` returns
/// `false` from then on.
pub struct ClientWorld {
    config: ClientConfig,
    connection: Option<Connection>,
    storages: Vec<Box<dyn ErasedStorage>>,
    names: HashMap<&'static str, StorageId>,
    events: ClientEvents,
    payload: Vec<u8>,
    exit_requested: bool,
}

impl ClientWorld {
    pub fn new<S: ByteStream + 'static>(stream: S, config: ClientConfig) -> Self {
        let connection = Connection::new(Box::new(stream), config.connection.clone());
        Self {
            config,
            connection: Some(connection),
            storages: Vec::new(),
            names: HashMap::new(),
            events: ClientEvents::new(),
            payload: Vec::new(),
            exit_requested: false,
        }
    }

    // Storages

    /// Registers the mirror for entities of type `T`. Registration order must
    /// match the server's.
    ///
    /// # Panics
    ///
    /// Panics if `T` is already registered
    pub fn register<T: Replicate>(&mut self) -> StorageId {
        match self.try_register::<T>() {
            Ok(id) => id,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_register<T: Replicate>(&mut self) -> Result<StorageId, StorageError> {
        let name = T::type_name();
        if self.names.contains_key(name) {
            return Err(StorageError::AlreadyRegistered { name });
        }

        let Ok(next) = u32::try_from(self.storages.len()) else {
            panic!("Storage id space exhausted");
        };
        let id = StorageId::new(next);
        self.storages.push(Box::new(ClientStorage::<T>::new(id)));
        self.names.insert(name, id);
        Ok(id)
    }

    /// # Panics
    ///
    /// Panics if `T` is not registered
    pub fn storage<T: Replicate>(&self) -> &ClientStorage<T> {
        match self.try_storage::<T>() {
            Ok(storage) => storage,
            Err(error) => panic!("{}", error),
        }
    }

    pub fn try_storage<T: Replicate>(&self) -> Result<&ClientStorage<T>, StorageError> {
        let id = self.storage_id::<T>()?;
        self.storages[id.as_usize()]
            .as_any()
            .downcast_ref::<ClientStorage<T>>()
            .ok_or(StorageError::NotRegistered {
                name: T::type_name(),
            })
    }

    pub fn storage_id<T: Replicate>(&self) -> Result<StorageId, StorageError> {
        self.names
            .get(T::type_name())
            .copied()
            .ok_or(StorageError::NotRegistered {
                name: T::type_name(),
            })
    }

    // Requests

    /// Asks the server to create an entity. The mirror only changes once the
    /// server replicates the result back.
    pub fn request_create<T: Replicate>(&mut self, entity: &T) -> Result<(), ReplicaClientError> {
        let id = self.storage_id::<T>()?;
        let connection = self.connection_mut()?;
        connection.send(
            MessageHeader::new(id, MessageType::Create, 0, 0),
            |writer| entity.write(writer, SyncMode::Full),
        );
        Ok(())
    }

    /// Sends the entity's changes for the server to apply. Ignored by the
    /// server unless this client holds authority over the entity.
    pub fn request_update<T: Replicate>(
        &mut self,
        handle: Handle<T>,
        entity: &T,
    ) -> Result<(), ReplicaClientError> {
        let id = self.storage_id::<T>()?;
        let connection = self.connection_mut()?;
        connection.send(
            MessageHeader::new(id, MessageType::Update, handle.index(), handle.generation()),
            |writer| entity.write(writer, SyncMode::Delta),
        );
        Ok(())
    }

    /// Ignored by the server unless this client holds authority over the
    /// entity
    pub fn request_destroy<T: Replicate>(
        &mut self,
        handle: Handle<T>,
    ) -> Result<(), ReplicaClientError> {
        let id = self.storage_id::<T>()?;
        let connection = self.connection_mut()?;
        connection.send_notice(MessageHeader::new(
            id,
            MessageType::Destroy,
            handle.index(),
            handle.generation(),
        ));
        Ok(())
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, ReplicaClientError> {
        self.connection
            .as_mut()
            .ok_or(ReplicaClientError::Disconnected)
    }

    // Ticking

    /// Requests that the next tick closes the connection and stops
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn is_running(&self) -> bool {
        self.connection.is_some()
    }

    /// Runs one tick. Returns `false` once the client has stopped.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        for storage in &mut self.storages {
            storage.end_tick();
        }

        if self.exit_requested {
            self.stop(DisconnectReason::Exit);
            return false;
        }

        if let Err(error) = self.receive_messages() {
            match error {
                ReceiveError::Connection(ConnectionError::Closed) => {
                    self.stop(DisconnectReason::PeerClosed);
                }
                error => {
                    warn!("Disconnecting from the server: {}", error);
                    self.events.push_error(ReplicaClientError::Receive(error));
                    self.stop(DisconnectReason::ProtocolFault);
                }
            }
            return false;
        }

        if let Some(connection) = self.connection.as_mut() {
            if let Err(error) = connection.flush() {
                warn!("Disconnecting from the server: {}", error);
                self.events.push_error(ReplicaClientError::Send(error));
                self.stop(DisconnectReason::SendFailed);
                return false;
            }
        }
        true
    }

    pub fn take_events(&mut self) -> ClientEvents {
        mem::replace(&mut self.events, ClientEvents::new())
    }

    fn receive_messages(&mut self) -> Result<(), ReceiveError> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(());
        };
        connection.receive()?;

        for _ in 0..self.config.max_messages_per_tick {
            let Some(header) = connection.read_message(&mut self.payload)? else {
                break;
            };
            let Some(storage) = self.storages.get_mut(header.storage_id.as_usize()) else {
                return Err(ReceiveError::UnknownStorage {
                    storage_id: header.storage_id,
                });
            };
            trace!(
                "Server sent {:?} for `{}`",
                header.message_type,
                storage.type_name()
            );
            storage.receive(&header, &self.payload, &mut self.events)?;
        }
        Ok(())
    }

    fn stop(&mut self, reason: DisconnectReason) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        connection.close();
        info!("Disconnected from the server: {:?}", reason);
        self.events.push_disconnection(reason);
    }
}
