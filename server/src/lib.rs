//! # Replica Server
//! A server that holds the canonical set of entities, replicates them to the
//! clients observing each one over framed byte streams, and only lets the
//! client holding authority over an entity change it.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod transport {
    pub use replica_shared::{
        transport::local::{local_stream_pair, LocalConnector, LocalListener, LocalStream},
        ByteStream, Listener,
    };

    cfg_if! {
        if #[cfg(feature = "transport_tcp")] {
            pub use replica_shared::TcpListenerTransport;
        }
    }
}
pub mod shared {
    pub use replica_shared::{
        ConnectionConfig, DeltaSet, Handle, Replicate, Serde, SerdeErr, StorageError, StorageId,
        StreamRead, StreamWrite, SyncMode,
    };
}

mod client_key;
mod connections;
mod error;
mod events;
mod server_config;
mod storage;
mod world;

pub use client_key::ClientKey;
pub use error::{ReplicaServerError, SnapshotError};
pub use events::{
    ConnectEvent, CreateEntityEvent, DestroyEntityEvent, DisconnectEvent, DisconnectReason,
    ErrorEvent, ServerEvent, ServerEvents, UpdateEntityEvent,
};
pub use server_config::ServerConfig;
pub use storage::{
    entity_mut::EntityMut,
    server_storage::ServerStorage,
    storage_config::{CreatePolicy, StorageConfig},
    storage_mut::StorageMut,
};
pub use world::server_world::ServerWorld;
