use std::{
    io,
    net::{Shutdown, SocketAddr, TcpListener, TcpStream},
};

use log::{info, warn};

use super::{ByteStream, Listener};

impl ByteStream for TcpStream {
    fn shutdown(&mut self) {
        if let Err(err) = TcpStream::shutdown(self, Shutdown::Both) {
            if err.kind() != io::ErrorKind::NotConnected {
                warn!("Failed to shut down TCP stream: {}", err);
            }
        }
    }
}

/// Non-blocking TCP listener
pub struct TcpListenerTransport {
    listener: TcpListener,
}

impl TcpListenerTransport {
    pub fn bind(address: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        info!("Listening for TCP connections on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Listener for TcpListenerTransport {
    /// A stream that cannot be made non-blocking is dropped and the next
    /// pending one is tried
    fn accept(&mut self) -> io::Result<Option<Box<dyn ByteStream>>> {
        loop {
            match self.listener.accept() {
                Ok((stream, address)) => {
                    if let Err(err) = prepare(&stream) {
                        warn!("Dropping TCP connection from {}: {}", address, err);
                        continue;
                    }
                    info!("Accepted TCP connection from {}", address);
                    return Ok(Some(Box::new(stream)));
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }
}

/// Connects to a server, returning a stream ready for a client connection.
/// The connect itself blocks; the returned stream does not.
pub fn connect_tcp(address: SocketAddr) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(address)?;
    prepare(&stream)?;
    Ok(stream)
}

fn prepare(stream: &TcpStream) -> io::Result<()> {
    stream.set_nonblocking(true)?;
    stream.set_nodelay(true)
}
