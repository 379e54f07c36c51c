//! Byte-stream transports a [`Connection`](crate::Connection) can run over.
//!
//! Streams must be non-blocking: a read or write that cannot make progress
//! returns [`std::io::ErrorKind::WouldBlock`], and a read returning `Ok(0)`
//! means the peer closed its side.

use std::io::{self, Read, Write};

pub mod local;

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub mod tcp;
    }
}

/// A non-blocking, ordered, reliable byte stream to one peer
pub trait ByteStream: Read + Write {
    /// Closes the stream in both directions. Further reads on the peer's side
    /// report end of stream once buffered bytes are drained.
    fn shutdown(&mut self) {}
}

/// Produces streams for newly connected peers
pub trait Listener {
    /// Returns the next pending connection, or `None` if none is waiting
    fn accept(&mut self) -> io::Result<Option<Box<dyn ByteStream>>>;
}
