use std::io;

use log::{trace, warn};

use crate::{
    connection::{
        connection_config::ConnectionConfig,
        error::ConnectionError,
        message_header::{MessageHeader, HEADER_BYTES, LENGTH_PREFIX_BYTES},
    },
    serde::ByteWriter,
    transport::ByteStream,
};

/// A framed, buffered endpoint over one [`ByteStream`].
///
/// Outgoing messages are appended to a buffer and written out by
/// [`flush`](Connection::flush), once per tick. Incoming bytes are pulled by
/// [`receive`](Connection::receive) and split into messages in two phases:
/// first the length prefix is confirmed and cached, then the whole body.
///
/// Send-side faults are deferred and reported by the next `flush`, so code
/// fanning out to many connections never has to handle them inline.
pub struct Connection {
    stream: Box<dyn ByteStream>,
    config: ConnectionConfig,
    inbound: Vec<u8>,
    read_cursor: usize,
    pending_length: Option<usize>,
    outbound: Vec<u8>,
    peer_closed: bool,
    send_fault: Option<ConnectionError>,
}

impl Connection {
    pub fn new(stream: Box<dyn ByteStream>, config: ConnectionConfig) -> Self {
        Self {
            stream,
            config,
            inbound: Vec::new(),
            read_cursor: 0,
            pending_length: None,
            outbound: Vec::new(),
            peer_closed: false,
            send_fault: None,
        }
    }

    // Receiving

    /// Pulls every byte currently available from the stream, stopping early
    /// once the inbound buffer reaches its limit. Returns the number of bytes
    /// read.
    pub fn receive(&mut self) -> Result<usize, ConnectionError> {
        self.compact();

        let mut total = 0;
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        while !self.peer_closed && self.buffered() < self.config.max_buffered_bytes {
            let room = self.config.max_buffered_bytes - self.buffered();
            let want = chunk.len().min(room);
            match self.stream.read(&mut chunk[..want]) {
                Ok(0) => {
                    trace!("Peer closed its side of the connection");
                    self.peer_closed = true;
                }
                Ok(count) => {
                    self.inbound.extend_from_slice(&chunk[..count]);
                    total += count;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ConnectionError::Io(err)),
            }
        }
        Ok(total)
    }

    /// Whether a complete message is buffered. Validates the length prefix as
    /// soon as it is available.
    pub fn can_read(&mut self) -> Result<bool, ConnectionError> {
        let length = match self.pending_length {
            Some(length) => length,
            None => {
                if self.buffered() < LENGTH_PREFIX_BYTES {
                    return Ok(false);
                }
                let length = self.parse_length()?;
                self.pending_length = Some(length);
                length
            }
        };
        Ok(self.buffered() >= LENGTH_PREFIX_BYTES + length)
    }

    /// Takes the next complete message, copying its payload into `payload`.
    ///
    /// Returns `Ok(None)` if no complete message is buffered yet, and
    /// [`ConnectionError::Closed`] once the peer has closed and no complete
    /// message remains.
    pub fn read_message(
        &mut self,
        payload: &mut Vec<u8>,
    ) -> Result<Option<MessageHeader>, ConnectionError> {
        if !self.can_read()? {
            if self.peer_closed {
                return Err(ConnectionError::Closed);
            }
            return Ok(None);
        }

        let Some(length) = self.pending_length.take() else {
            return Ok(None);
        };
        let start = self.read_cursor + LENGTH_PREFIX_BYTES;
        let body = &self.inbound[start..start + length];
        let (header, body_payload) = MessageHeader::read(body)?;

        payload.clear();
        payload.extend_from_slice(body_payload);
        self.read_cursor = start + length;

        trace!(
            "Read {:?} message for storage {} ({} payload bytes)",
            header.message_type,
            header.storage_id,
            payload.len()
        );
        Ok(Some(header))
    }

    pub fn is_peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Bytes received but not yet consumed
    pub fn buffered(&self) -> usize {
        self.inbound.len() - self.read_cursor
    }

    fn parse_length(&self) -> Result<usize, ConnectionError> {
        let mut word = [0u8; LENGTH_PREFIX_BYTES];
        word.copy_from_slice(&self.inbound[self.read_cursor..self.read_cursor + LENGTH_PREFIX_BYTES]);
        let length = i32::from_le_bytes(word);

        let Ok(length) = usize::try_from(length) else {
            return Err(ConnectionError::InvalidLength {
                length: i64::from(length),
                minimum: HEADER_BYTES,
            });
        };
        if length < HEADER_BYTES {
            return Err(ConnectionError::InvalidLength {
                length: length as i64,
                minimum: HEADER_BYTES,
            });
        }
        if length > self.config.max_message_size {
            return Err(ConnectionError::MessageTooLarge {
                length,
                limit: self.config.max_message_size,
            });
        }
        Ok(length)
    }

    fn compact(&mut self) {
        if self.read_cursor > 0 {
            self.inbound.drain(..self.read_cursor);
            self.read_cursor = 0;
        }
    }

    // Sending

    /// Queues a message whose payload is produced by `write_payload`
    pub fn send<F>(&mut self, header: MessageHeader, write_payload: F)
    where
        F: FnOnce(&mut ByteWriter<'_>),
    {
        if self.send_fault.is_some() {
            return;
        }

        let start = self.outbound.len();
        self.outbound.extend_from_slice(&[0u8; LENGTH_PREFIX_BYTES]);
        header.write(&mut self.outbound);
        if header.message_type.has_payload() {
            write_payload(&mut ByteWriter::new(&mut self.outbound));
        }

        let length = self.outbound.len() - start - LENGTH_PREFIX_BYTES;
        let encoded = match i32::try_from(length) {
            Ok(encoded) if length <= self.config.max_message_size => encoded,
            _ => {
                self.outbound.truncate(start);
                self.fail_send(ConnectionError::MessageTooLarge {
                    length,
                    limit: self.config.max_message_size,
                });
                return;
            }
        };
        self.outbound[start..start + LENGTH_PREFIX_BYTES].copy_from_slice(&encoded.to_le_bytes());

        if self.outbound.len() > self.config.max_buffered_bytes {
            let buffered = self.outbound.len();
            self.fail_send(ConnectionError::BufferLimitExceeded {
                buffered,
                limit: self.config.max_buffered_bytes,
            });
        }
    }

    /// Queues a message without payload, such as a `Destroy`
    pub fn send_notice(&mut self, header: MessageHeader) {
        self.send(header, |_| {});
    }

    /// Writes as much buffered output as the stream accepts. Reports any
    /// deferred send fault.
    pub fn flush(&mut self) -> Result<(), ConnectionError> {
        if let Some(fault) = self.send_fault.take() {
            return Err(fault);
        }

        let mut written = 0;
        while written < self.outbound.len() {
            match self.stream.write(&self.outbound[written..]) {
                Ok(0) => {
                    self.outbound.drain(..written);
                    return Err(ConnectionError::Closed);
                }
                Ok(count) => written += count,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.outbound.drain(..written);
                    return Err(ConnectionError::Io(err));
                }
            }
        }
        self.outbound.drain(..written);

        if let Err(err) = self.stream.flush() {
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(ConnectionError::Io(err));
            }
        }
        Ok(())
    }

    /// Bytes queued but not yet written to the stream
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Flushes what it can and shuts the stream down
    pub fn close(&mut self) {
        if let Err(err) = self.flush() {
            warn!("Dropping unsent data while closing connection: {}", err);
        }
        self.stream.shutdown();
    }

    fn fail_send(&mut self, fault: ConnectionError) {
        warn!("Send failed, connection will be dropped: {}", fault);
        self.send_fault = Some(fault);
    }
}
