pub(crate) mod client_storage;
