use std::io;

use thiserror::Error;

use crate::{serde::SerdeErr, types::StorageId};

/// Framing and I/O faults on a single connection. Any of these ends the
/// connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Peer closed the stream and no complete message remains
    #[error("Connection closed by peer")]
    Closed,

    /// Underlying stream failed
    #[error("I/O error on connection: {0}")]
    Io(#[from] io::Error),

    /// Length prefix is smaller than a message header
    #[error("Invalid message length {length} (minimum is {minimum} bytes)")]
    InvalidLength { length: i64, minimum: usize },

    /// Message body exceeds the configured maximum
    #[error("Message of {length} bytes exceeds the {limit} byte limit")]
    MessageTooLarge { length: usize, limit: usize },

    /// Message type byte is not a known message type
    #[error("Invalid message type {value} (valid range: 0-2)")]
    InvalidMessageType { value: u8 },

    /// Outbound data piled up past the configured limit
    #[error("{buffered} bytes buffered for sending, limit is {limit}")]
    BufferLimitExceeded { buffered: usize, limit: usize },
}

/// Failures while dispatching one received message to its storage
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Header names a storage id no storage was registered under
    #[error("Message addressed to unknown storage id {storage_id}")]
    UnknownStorage { storage_id: StorageId },

    /// Payload could not be decoded as the storage's entity type
    #[error("Malformed payload for storage `{storage}`: {source}")]
    Payload {
        storage: &'static str,
        #[source]
        source: SerdeErr,
    },

    /// Payload decoded but bytes were left over
    #[error("{remaining} trailing bytes after payload for storage `{storage}`")]
    TrailingBytes {
        storage: &'static str,
        remaining: usize,
    },
}
