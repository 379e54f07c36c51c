pub mod dense_array;
pub mod entity_table;
pub mod error;
pub mod handle;
pub mod slot_allocator;
