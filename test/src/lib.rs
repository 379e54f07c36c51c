//! Fixtures and harness for end-to-end tests of replica-server and
//! replica-client

pub mod fixtures;
pub mod harness;

pub use fixtures::{register_client_protocol, register_server_protocol, Position, Roster};
pub use harness::{exchange_packets, exchange_packets_n_times, init_logging, TestServer};
