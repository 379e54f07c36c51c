use std::default::Default;

use replica_shared::ConnectionConfig;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Used to configure the connections with Clients
    pub connection: ConnectionConfig,
    /// Most messages read from a single client in one tick. Further messages
    /// stay buffered for the following ticks.
    pub max_messages_per_tick: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            max_messages_per_tick: 256,
        }
    }
}
