pub(crate) mod entity_mut;
pub(crate) mod erased_storage;
pub(crate) mod server_storage;
pub(crate) mod storage_config;
pub(crate) mod storage_mut;
