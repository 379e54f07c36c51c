//! A server and its clients wired together over the in-memory transport

use replica_client::{ClientConfig, ClientWorld};
use replica_server::{
    transport::{LocalConnector, LocalListener},
    ClientKey, ConnectEvent, ServerConfig, ServerWorld, StorageConfig,
};

use crate::fixtures::{register_client_protocol, register_server_protocol};

pub struct TestServer {
    pub world: ServerWorld,
    connector: LocalConnector,
}

impl TestServer {
    /// A server with both fixture storages on their default configs
    pub fn new() -> Self {
        Self::with_storages(StorageConfig::default(), StorageConfig::default())
    }

    pub fn with_storages(position: StorageConfig, roster: StorageConfig) -> Self {
        Self::with_config(ServerConfig::default(), position, roster)
    }

    pub fn with_config(config: ServerConfig, position: StorageConfig, roster: StorageConfig) -> Self {
        let (listener, connector) = LocalListener::new();
        let mut world = ServerWorld::new(listener, config);
        register_server_protocol(&mut world, position, roster);
        Self { world, connector }
    }

    pub fn connector(&self) -> LocalConnector {
        self.connector.clone()
    }

    /// Connects a new client and ticks the server until it is accepted.
    /// Drains the server's pending events.
    pub fn connect(&mut self) -> (ClientKey, ClientWorld) {
        self.connect_with(ClientConfig::default())
    }

    pub fn connect_with(&mut self, config: ClientConfig) -> (ClientKey, ClientWorld) {
        let mut client = ClientWorld::new(self.connector.connect(), config);
        register_client_protocol(&mut client);

        self.world.tick();
        let mut events = self.world.take_events();
        let Some(key) = events.read::<ConnectEvent>().last() else {
            panic!("server did not accept the connection");
        };
        (key, client)
    }
}

impl Default for TestServer {
    fn default() -> Self {
        Self::new()
    }
}

/// One round trip: clients flush their requests, the server applies them and
/// flushes, then clients apply what the server sent
pub fn exchange_packets(server: &mut TestServer, clients: &mut [&mut ClientWorld]) {
    for client in clients.iter_mut() {
        client.tick();
    }
    server.world.tick();
    for client in clients.iter_mut() {
        client.tick();
    }
}

pub fn exchange_packets_n_times(
    server: &mut TestServer,
    clients: &mut [&mut ClientWorld],
    times: usize,
) {
    for _ in 0..times {
        exchange_packets(server, clients);
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
