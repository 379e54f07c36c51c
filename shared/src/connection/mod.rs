pub mod connection_config;
pub mod error;
pub mod framed_connection;
pub mod message_header;
