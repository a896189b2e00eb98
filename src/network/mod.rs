//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - One thread per connection, capped by `max_connections`
//! - Commands routed through `protocol::execute` to the shared `Store`

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
