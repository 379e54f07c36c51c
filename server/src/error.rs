use std::io;

use thiserror::Error;

use replica_shared::{ConnectionError, ReceiveError, SerdeErr, StorageError};

use crate::ClientKey;

#[derive(Debug, Error)]
pub enum ReplicaServerError {
    /// Listener failed while accepting a connection
    #[error("Failed to accept a connection: {0}")]
    Accept(#[source] io::Error),

    /// A message from the client was malformed; the client was dropped
    #[error("Dropped client {client} after a receive fault: {source}")]
    Receive {
        client: ClientKey,
        #[source]
        source: ReceiveError,
    },

    /// Buffered output for the client could not be written; the client was
    /// dropped
    #[error("Dropped client {client} after a send fault: {source}")]
    Send {
        client: ClientKey,
        #[source]
        source: ConnectionError,
    },

    /// No client is connected under the key
    #[error("No client is connected with key {client}")]
    UnknownClient { client: ClientKey },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures while loading a whole-world snapshot. A failed load leaves every
/// storage as it was.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Document is not an object keyed by storage name
    #[error("Malformed snapshot document: {0}")]
    Document(#[source] SerdeErr),

    /// One storage's records could not be decoded
    #[error("Malformed snapshot records for storage `{storage}`: {source}")]
    Storage {
        storage: &'static str,
        #[source]
        source: SerdeErr,
    },
}
