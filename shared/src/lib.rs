//! # Replica Shared
//! Common functionality shared between replica-server & replica-client
//! crates: generational entity storage, the streaming serde contract and its
//! encodings, message framing and byte-stream transports.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod serde;
pub mod transport;

mod connection;
mod storage;
mod types;
mod world;

pub use connection::{
    connection_config::ConnectionConfig,
    error::{ConnectionError, ReceiveError},
    framed_connection::Connection,
    message_header::{MessageHeader, MessageType, HEADER_BYTES, LENGTH_PREFIX_BYTES},
};
pub use serde::{
    ByteReader, ByteWriter, JsonReader, JsonWriter, Serde, SerdeErr, StreamRead, StreamWrite,
};
pub use storage::{
    dense_array::{DenseArray, SwapRemoved},
    entity_table::{EntityTable, SlotView},
    error::StorageError,
    handle::Handle,
    slot_allocator::SlotAllocator,
};
pub use transport::{
    local::{local_stream_pair, LocalConnector, LocalListener, LocalStream},
    ByteStream, Listener,
};
pub use types::StorageId;
pub use world::{
    delta_set::DeltaSet,
    replicate::{Replicate, SyncMode},
};

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub use transport::tcp::{connect_tcp, TcpListenerTransport};
    }
}
