//! # Replica Client
//! A client that mirrors the entities a replica-server replicates to it and
//! sends create, update and destroy requests back over a framed byte stream.

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
        transport::local::{local_stream_pair, LocalStream},
        ByteStream,
    };

    cfg_if! {
        if #[cfg(feature = "transport_tcp")] {
            pub use replica_shared::connect_tcp;
        }
    }
}
pub mod shared {
    pub use replica_shared::{
        ConnectionConfig, DeltaSet, Handle, Replicate, Serde, SerdeErr, StorageError, StorageId,
        StreamRead, StreamWrite, SyncMode,
    };
}

mod client_config;
mod error;
mod events;
mod storage;
mod world;

pub use client_config::ClientConfig;
pub use error::ReplicaClientError;
pub use events::{
    ClientEvent, ClientEvents, CreateEntityEvent, DestroyEntityEvent, DisconnectEvent,
    DisconnectReason, ErrorEvent, UpdateEntityEvent,
};
pub use storage::client_storage::ClientStorage;
pub use world::client_world::ClientWorld;
