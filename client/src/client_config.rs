use std::default::Default;

use replica_shared::ConnectionConfig;

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Used to configure the connection with the Server
    pub connection: ConnectionConfig,
    /// Most messages applied from the server in one tick
    pub max_messages_per_tick: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            max_messages_per_tick: 1024,
        }
    }
}
