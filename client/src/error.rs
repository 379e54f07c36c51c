use thiserror::Error;

use replica_shared::{ConnectionError, ReceiveError, StorageError};

#[derive(Debug, Error)]
pub enum ReplicaClientError {
    /// A message from the server could not be framed or applied; the client
    /// stopped
    #[error("Receive fault, disconnected from the server: {0}")]
    Receive(#[from] ReceiveError),

    /// Buffered requests could not be written; the client stopped
    #[error("Send fault, disconnected from the server: {0}")]
    Send(#[source] ConnectionError),

    /// The connection is already gone
    #[error("Not connected to a server")]
    Disconnected,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
