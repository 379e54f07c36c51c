use std::default::Default;

/// Contains Config properties which will be used by a Server or Client
/// connection
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Largest accepted message body, in bytes. Larger inbound messages are a
    /// protocol fault.
    pub max_message_size: usize,
    /// Most bytes buffered per direction. Inbound reading pauses at this
    /// limit; outbound data past it is a fault.
    pub max_buffered_bytes: usize,
    /// Size of each read from the underlying stream
    pub read_chunk_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1024 * 1024,
            max_buffered_bytes: 16 * 1024 * 1024,
            read_chunk_size: 64 * 1024,
        }
    }
}
