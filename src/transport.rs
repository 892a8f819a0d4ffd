//! Transport contract and the blocking TCP implementation.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use log::debug;

/// Default ESC/VP.net TCP port.
pub const DEFAULT_PORT: u16 = 3629;

/// Byte-level transport to the projector.
///
/// The controller consumes the session through this seam only: one blocking
/// request/response exchange per [`send`](Transport::send) call, a
/// connection-state query, and an explicit disconnect. Implementations own
/// connect/reconnect policy; [`MockProjector`](crate::MockProjector)
/// implements the same contract for tests.
pub trait Transport: Send {
    /// Send one command and return the device's raw reply.
    fn send(&mut self, command: &[u8]) -> io::Result<Vec<u8>>;

    /// Whether a session is currently established.
    fn is_connected(&self) -> bool;

    /// Tear down the session, if any.
    fn disconnect(&mut self) -> io::Result<()>;
}

/// Blocking TCP transport over `std::net::TcpStream`.
///
/// Connects lazily on the first send after construction or disconnect.
/// Replies are small single-segment ASCII lines, so one read per exchange is
/// sufficient.
pub struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a transport for `addr` (`"host:port"`), without connecting yet.
    ///
    /// Projectors listen on [`DEFAULT_PORT`] unless reconfigured.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
        }
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        match &mut self.stream {
            Some(stream) => Ok(stream),
            stream @ None => {
                debug!("connecting to {}", self.addr);
                Ok(stream.insert(TcpStream::connect(&self.addr)?))
            }
        }
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, command: &[u8]) -> io::Result<Vec<u8>> {
        let result = (|| {
            let stream = self.stream()?;
            stream.write_all(command)?;
            let mut buffer = [0u8; 512];
            let read = stream.read(&mut buffer)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "connection closed by the device",
                ));
            }
            Ok(buffer[..read].to_vec())
        })();
        if result.is_err() {
            // A failed exchange leaves the session in an unknown state.
            self.stream = None;
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn disconnect(&mut self) -> io::Result<()> {
        if let Some(stream) = self.stream.take() {
            debug!("disconnecting from {}", self.addr);
            match stream.shutdown(Shutdown::Both) {
                Err(e) if e.kind() != io::ErrorKind::NotConnected => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}
