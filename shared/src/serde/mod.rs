mod byte_reader;
mod byte_writer;
mod error;
mod json;
mod serde_impls;
mod stream;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
pub use error::SerdeErr;
pub use json::{JsonReader, JsonWriter};
pub use serde_impls::Serde;
pub use stream::{StreamRead, StreamWrite};
