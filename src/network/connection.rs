//! Per-connection request handling.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use parking_lot::Mutex;

use crate::arena::ArenaStore;
use crate::blob::Blob;
use crate::config::Config;
use crate::error::{Result, RungError};
use crate::protocol::{
    read_request, write_response, Request, Response, STATUS_DUPLICATE, STATUS_INTERNAL,
    STATUS_NOT_FOUND,
};

/// Serve exactly one request/response exchange on `stream`.
///
/// The store mutex is held for the duration of the store call only, not
/// for the socket I/O around it. Client disconnects mid-exchange are a
/// normal end, not an error.
pub(crate) fn serve(
    stream: TcpStream,
    store: &Mutex<ArenaStore<Blob, Blob>>,
    config: &Config,
) -> Result<()> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    // The listener is non-blocking for the stop flag; the accepted socket
    // must not inherit that.
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    if config.read_timeout_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
    }
    if config.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
    }

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    tracing::debug!(peer = %peer, "connection accepted");

    let response = match read_request(&mut reader) {
        Ok(request) => {
            tracing::trace!(peer = %peer, request = ?request, "request received");
            let mut store = store.lock();
            execute(&mut store, request)
        }
        Err(RungError::Io(ref e)) if disconnect_kind(e.kind()) => {
            tracing::debug!(peer = %peer, "client went away before sending a request");
            return Ok(());
        }
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "malformed request");
            Response::invalid_request()
        }
    };

    if let Err(RungError::Io(ref e)) = write_response(&mut writer, &response) {
        if disconnect_kind(e.kind()) {
            tracing::debug!(peer = %peer, "client went away before the response");
            return Ok(());
        }
        tracing::warn!(peer = %peer, error = %e, "failed to write response");
    }
    Ok(())
}

/// Run one request against the store and shape the reply.
fn execute(store: &mut ArenaStore<Blob, Blob>, request: Request) -> Response {
    match request {
        Request::Get { key } => match store.lookup(&key) {
            Ok(found) => {
                let rank = i32::try_from(found.rank).unwrap_or(i32::MAX);
                Response::found(key, found.value, rank)
            }
            Err(RungError::KeyNotFound) => Response::status(STATUS_NOT_FOUND, key),
            Err(e) => internal(key, e),
        },
        Request::Set { key, value } => match store.insert(key.clone(), value) {
            Ok(()) => Response::ok(key),
            Err(RungError::DuplicateKey) => Response::status(STATUS_DUPLICATE, key),
            Err(e) => internal(key, e),
        },
        Request::Del { key } => match store.delete(&key) {
            Ok(()) => Response::ok(key),
            Err(RungError::KeyNotFound) => Response::status(STATUS_NOT_FOUND, key),
            Err(e) => internal(key, e),
        },
    }
}

fn internal(key: Blob, e: RungError) -> Response {
    tracing::error!(key = ?key, error = %e, "store operation failed");
    Response::status(STATUS_INTERNAL, key)
}

fn disconnect_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
    )
}
