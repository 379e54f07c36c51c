pub(crate) mod client_world;
