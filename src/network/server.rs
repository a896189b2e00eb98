//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::store::Store;

use super::Connection;

/// Shared stop signal for the accept loop
///
/// Set by Ctrl-C or by a client's SHUTDOWN command.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownState>,
}

#[derive(Debug, Default)]
struct ShutdownState {
    requested: AtomicBool,
    skip_save: AtomicBool,
}

impl ShutdownHandle {
    /// Ask the server to stop; `save = false` requests no shutdown snapshot
    pub fn request(&self, save: bool) {
        if !save {
            self.inner.skip_save.store(true, Ordering::SeqCst);
        }
        self.inner.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Whether any requester asked to skip the shutdown snapshot
    pub fn save_skipped(&self) -> bool {
        self.inner.skip_save.load(Ordering::SeqCst)
    }
}

/// Decrements the active-connection count when a worker exits
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// TCP server for exokv
///
/// ## Concurrency:
/// - One acceptor (the thread calling `run`), polling a non-blocking listener
/// - One thread per client connection, capped at `max_connections`
pub struct Server {
    config: Config,
    store: Arc<Store>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    active: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl Server {
    /// Poll interval of the accept loop while idle
    const ACCEPT_POLL: Duration = Duration::from_millis(20);

    /// Bind the listener on `config.listen_addr`
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            store,
            listener,
            shutdown: ShutdownHandle::default(),
            active: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        })
    }

    /// The bound address (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the accept loop from elsewhere
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of connections currently served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept connections until shutdown is requested (blocking)
    ///
    /// Connection threads already running are left to finish on their own.
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.is_requested() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Self::ACCEPT_POLL);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(Self::ACCEPT_POLL);
                }
            }
        }

        tracing::info!(
            "Accept loop stopped ({} connections still open)",
            self.active_connections()
        );
        Ok(())
    }

    /// Start a worker for an accepted stream, or refuse it when at capacity
    fn dispatch(&self, mut stream: TcpStream, addr: SocketAddr) {
        if self.active.fetch_add(1, Ordering::SeqCst) >= self.config.max_connections {
            self.active.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Refusing {}: max connections reached", addr);
            let _ = stream.write_all(b"-ERR max number of clients reached\r\n");
            return;
        }
        let slot = ConnectionSlot(Arc::clone(&self.active));

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let store = Arc::clone(&self.store);
        let shutdown = self.shutdown.clone();
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("exokv-conn-{}", id))
            .spawn(move || {
                let _slot = slot;
                if let Err(e) = serve(stream, store, shutdown, read_ms, write_ms) {
                    tracing::debug!("Connection {} from {} ended with error: {}", id, addr, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", addr, e);
        }
    }
}

fn serve(
    stream: TcpStream,
    store: Arc<Store>,
    shutdown: ShutdownHandle,
    read_ms: u64,
    write_ms: u64,
) -> Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode
    stream.set_nonblocking(false)?;

    let mut connection = Connection::new(stream, store, shutdown)?;
    connection.set_timeouts(read_ms, write_ms)?;
    connection.handle()
}
