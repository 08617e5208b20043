//! Request service
//!
//! A thin TCP front over one arena store. The server accepts connections on
//! a non-blocking listener, queues them into a bounded channel, and drains
//! the queue from a single worker thread — so every store call is
//! serialized through one logical worker and the store's
//! no-internal-synchronization contract holds. One request, one response,
//! one connection.
//!
//! ## Architecture
//! - Acceptor: non-blocking accept loop, pushes sockets into the channel
//! - Worker: blocks on the channel, holds the store mutex per request
//! - Shutdown: a shared stop flag; the acceptor stops accepting and drops
//!   its channel end, the worker finishes every queued connection, then
//!   `run` returns

mod client;
mod connection;
mod server;

pub use client::Client;
pub use server::{Server, ShutdownHandle};
