//! TCP server: acceptor, bounded queue, single worker.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use parking_lot::Mutex;

use crate::arena::{ArenaOptions, ArenaStore};
use crate::blob::Blob;
use crate::config::Config;
use crate::error::Result;

use super::connection;

/// How long the acceptor sleeps between empty polls. The stop flag is
/// checked at this cadence, so shutdown latency is bounded by it.
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Request service over one arena store.
///
/// The store is attached at bind time and fronted by a mutex; the single
/// worker thread serializes all store calls, so clients never observe a
/// partially applied operation. Accepted connections queue in a channel
/// bounded by `max_connections` — when it fills, the acceptor blocks,
/// which back-pressures clients at the TCP level.
pub struct Server {
    config: Config,
    listener: TcpListener,
    store: Mutex<ArenaStore<Blob, Blob>>,
    stop: Arc<AtomicBool>,
}

/// Stops a running [`Server`] from another thread.
///
/// Shutdown drains: the acceptor stops taking new connections, the worker
/// finishes everything already queued, then `run` returns.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Server {
    /// Validate `config`, attach the arena region, and bind the listener.
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;
        let store = ArenaStore::attach(&config.region_path, ArenaOptions::from(&config))?;
        let listener = TcpListener::bind(&config.listen_addr)?;
        tracing::info!(
            addr = %config.listen_addr,
            region = %config.region_path.display(),
            entries = store.len(),
            "server bound"
        );
        Ok(Self {
            config,
            listener,
            store: Mutex::new(store),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The bound address (useful when the config asked for port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// Accept and serve until [`ShutdownHandle::shutdown`] is called.
    ///
    /// Returns after the worker has drained every queued connection.
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        let (tx, rx) = channel::bounded::<std::net::TcpStream>(self.config.max_connections);

        thread::scope(|scope| {
            let worker = scope.spawn(|| {
                // Blocks on the channel; the iterator ends once the
                // acceptor drops its end and the queue is empty.
                for stream in rx.iter() {
                    if let Err(e) = connection::serve(stream, &self.store, &self.config) {
                        tracing::warn!(error = %e, "connection handling failed");
                    }
                }
                tracing::debug!("worker drained and stopped");
            });

            while !self.stop.load(Ordering::Relaxed) {
                match self.listener.accept() {
                    Ok((stream, peer)) => {
                        tracing::trace!(peer = %peer, "connection queued");
                        if tx.send(stream).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }

            // Closing the channel is what lets the worker finish.
            drop(tx);
            if worker.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        });

        tracing::info!("server stopped");
        Ok(())
    }
}
