//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::protocol::{self, Action, Command, Reply, MAX_LINE_SIZE};
use crate::store::Store;

use super::ShutdownHandle;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared store
    store: Arc<Store>,

    /// Signals the accept loop when a client sends SHUTDOWN
    shutdown: ShutdownHandle,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and disables Nagle's algorithm
    pub fn new(stream: TcpStream, store: Arc<Store>, shutdown: ShutdownHandle) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            store,
            shutdown,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads command lines in a loop and sends replies. Returns when the
    /// client disconnects, sends QUIT or SHUTDOWN, or an I/O error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(StoreError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Connection from {} closed: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(StoreError::Io(ref e))
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e @ StoreError::Protocol(_)) => {
                    tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                    let _ = self.send(&Reply::error(&e));
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let (reply, action) = self.respond(line);

            if let Err(e) = self.send(&reply) {
                if let StoreError::Io(ref io_err) = e {
                    if is_disconnect(io_err) {
                        tracing::debug!(
                            "Client {} disconnected before reply could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            match action {
                Action::Continue => {}
                Action::Close => {
                    tracing::debug!("Client {} quit", self.peer_addr);
                    return Ok(());
                }
                Action::Shutdown { save } => {
                    tracing::info!(
                        "SHUTDOWN requested by {} (save: {})",
                        self.peer_addr,
                        save
                    );
                    self.shutdown.request(save);
                    return Ok(());
                }
            }
        }
    }

    /// Parse and execute one request line
    fn respond(&self, line: Vec<u8>) -> (Reply, Action) {
        let line = match String::from_utf8(line) {
            Ok(line) => line,
            Err(_) => return (Reply::error("request is not valid UTF-8"), Action::Continue),
        };

        match Command::parse(&line) {
            Ok(command) => {
                tracing::trace!("{} from {}", command.name(), self.peer_addr);
                protocol::execute(&self.store, command)
            }
            Err(e) => (Reply::error(e), Action::Continue),
        }
    }

    /// Read one line, without its line terminator
    ///
    /// `Ok(None)` on a clean end of stream.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_SIZE as u64 + 1)
            .read_until(b'\n', &mut buf)?;

        if read == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            if buf.len() > MAX_LINE_SIZE {
                return Err(StoreError::Protocol(format!(
                    "request line exceeds {} bytes",
                    MAX_LINE_SIZE
                )));
            }
            // Final line without a terminator
            return Ok(Some(buf));
        }

        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Send a reply and flush
    fn send(&mut self, reply: &Reply) -> Result<()> {
        reply.write_to(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
