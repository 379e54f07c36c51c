use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{ByteStream, Listener};

#[derive(Default)]
struct Pipe {
    bytes: VecDeque<u8>,
    closed: bool,
}

type SharedPipe = Arc<Mutex<Pipe>>;

fn lock(pipe: &SharedPipe) -> MutexGuard<'_, Pipe> {
    pipe.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One end of an in-memory stream pair. Used to run a server and its clients
/// in one process without sockets.
pub struct LocalStream {
    incoming: SharedPipe,
    outgoing: SharedPipe,
}

/// Creates two connected stream ends
pub fn local_stream_pair() -> (LocalStream, LocalStream) {
    let a_to_b = SharedPipe::default();
    let b_to_a = SharedPipe::default();
    (
        LocalStream {
            incoming: b_to_a.clone(),
            outgoing: a_to_b.clone(),
        },
        LocalStream {
            incoming: a_to_b,
            outgoing: b_to_a,
        },
    )
}

impl LocalStream {
    /// Closes both directions, as if the process owning this end went away
    pub fn close(&mut self) {
        lock(&self.incoming).closed = true;
        lock(&self.outgoing).closed = true;
    }

    /// Whether this end was closed by either side
    pub fn is_closed(&self) -> bool {
        lock(&self.outgoing).closed
    }
}

impl Read for LocalStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = lock(&self.incoming);
        if pipe.bytes.is_empty() {
            if pipe.closed {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let count = buf.len().min(pipe.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.bytes.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl Write for LocalStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pipe = lock(&self.outgoing);
        if pipe.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        pipe.bytes.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for LocalStream {
    fn shutdown(&mut self) {
        self.close();
    }
}

impl Drop for LocalStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// In-memory listener. Every [`LocalConnector::connect`] queues the server
/// end of a new stream pair for the next `accept`.
pub struct LocalListener {
    pending: Arc<Mutex<VecDeque<LocalStream>>>,
}

#[derive(Clone)]
pub struct LocalConnector {
    pending: Arc<Mutex<VecDeque<LocalStream>>>,
}

impl LocalListener {
    pub fn new() -> (Self, LocalConnector) {
        let pending = Arc::new(Mutex::new(VecDeque::new()));
        (
            Self {
                pending: pending.clone(),
            },
            LocalConnector { pending },
        )
    }
}

impl Listener for LocalListener {
    fn accept(&mut self) -> io::Result<Option<Box<dyn ByteStream>>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(pending
            .pop_front()
            .map(|stream| -> Box<dyn ByteStream> { Box::new(stream) }))
    }
}

impl LocalConnector {
    /// Returns the client end of a new connection
    pub fn connect(&self) -> LocalStream {
        let (server_end, client_end) = local_stream_pair();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(server_end);
        client_end
    }
}
