pub(crate) mod server_world;
mod snapshot;
