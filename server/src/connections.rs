use log::trace;

use replica_shared::{ByteWriter, Connection, MessageHeader};

use crate::{ClientKey, ReplicaServerError};

pub(crate) struct ClientConnection {
    pub(crate) connection: Connection,
    pub(crate) authenticated: bool,
}

/// Every connected client, addressed by key
pub(crate) struct Connections {
    clients: Vec<Option<ClientConnection>>,
    free_keys: Vec<ClientKey>,
}

impl Connections {
    pub(crate) fn new() -> Self {
        Self {
            clients: Vec::new(),
            free_keys: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, connection: Connection) -> ClientKey {
        let client = ClientConnection {
            connection,
            authenticated: false,
        };

        if let Some(key) = self.free_keys.pop() {
            self.clients[key.as_usize()] = Some(client);
            return key;
        }

        let Ok(next) = u32::try_from(self.clients.len()) else {
            panic!("Client key space exhausted");
        };
        self.clients.push(Some(client));
        ClientKey::new(next)
    }

    pub(crate) fn remove(&mut self, key: ClientKey) -> Option<ClientConnection> {
        let client = self.clients.get_mut(key.as_usize())?.take()?;
        self.free_keys.push(key);
        Some(client)
    }

    pub(crate) fn get_mut(&mut self, key: ClientKey) -> Option<&mut ClientConnection> {
        self.clients.get_mut(key.as_usize())?.as_mut()
    }

    pub(crate) fn contains(&self, key: ClientKey) -> bool {
        matches!(self.clients.get(key.as_usize()), Some(Some(_)))
    }

    pub(crate) fn ensure_connected(&self, key: ClientKey) -> Result<(), ReplicaServerError> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(ReplicaServerError::UnknownClient { client: key })
        }
    }

    pub(crate) fn is_authenticated(&self, key: ClientKey) -> bool {
        matches!(
            self.clients.get(key.as_usize()),
            Some(Some(ClientConnection {
                authenticated: true,
                ..
            }))
        )
    }

    /// Connected keys in ascending order
    pub(crate) fn keys(&self) -> Vec<ClientKey> {
        self.clients
            .iter()
            .enumerate()
            .filter(|(_, client)| client.is_some())
            .map(|(index, _)| ClientKey::new(index as u32))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.len() - self.free_keys.len()
    }

    /// Queues a message for one client. Messages for clients that are no
    /// longer connected are dropped.
    pub(crate) fn send<F>(&mut self, key: ClientKey, header: MessageHeader, write_payload: F)
    where
        F: FnOnce(&mut ByteWriter<'_>),
    {
        match self.get_mut(key) {
            Some(client) => client.connection.send(header, write_payload),
            None => trace!("Dropping {:?} message for departed client {}", header.message_type, key),
        }
    }

    pub(crate) fn send_notice(&mut self, key: ClientKey, header: MessageHeader) {
        self.send(key, header, |_| {});
    }
}
