//! Connect-per-call client.

use std::net::TcpStream;
use std::time::Duration;

use crate::blob::Blob;
use crate::error::{Result, RungError};
use crate::protocol::{
    read_response, write_request, Request, Response, STATUS_DUPLICATE, STATUS_EMPTY,
    STATUS_INTERNAL, STATUS_INVALID_REQUEST, STATUS_NOT_FOUND, STATUS_OK,
};

/// Client for the request service. Each call opens one connection, sends
/// one frame, and reads one frame back — the protocol's natural unit, so
/// there is no connection state to manage.
pub struct Client {
    addr: String,
    timeout: Duration,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_millis(5000),
        }
    }

    pub fn with_timeout(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Look `key` up, answering its value and 1-based rank.
    pub fn get(&self, key: &[u8]) -> Result<(Blob, u64)> {
        let response = self.call(Request::Get {
            key: Blob::new(key)?,
        })?;
        match response.status {
            rank if rank >= 1 => Ok((response.value, rank as u64)),
            STATUS_NOT_FOUND => Err(RungError::KeyNotFound),
            other => Err(sentinel(other)),
        }
    }

    /// Insert a key/value pair.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let response = self.call(Request::Set {
            key: Blob::new(key)?,
            value: Blob::new(value)?,
        })?;
        match response.status {
            STATUS_OK => Ok(()),
            STATUS_DUPLICATE => Err(RungError::DuplicateKey),
            other => Err(sentinel(other)),
        }
    }

    /// Delete a key.
    pub fn del(&self, key: &[u8]) -> Result<()> {
        let response = self.call(Request::Del {
            key: Blob::new(key)?,
        })?;
        match response.status {
            STATUS_OK => Ok(()),
            STATUS_NOT_FOUND => Err(RungError::KeyNotFound),
            other => Err(sentinel(other)),
        }
    }

    fn call(&self, request: Request) -> Result<Response> {
        let stream = TcpStream::connect(&self.addr)
            .map_err(|e| RungError::Network(format!("connect to {} failed: {e}", self.addr)))?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut writer = stream.try_clone()?;
        write_request(&mut writer, &request)?;
        let mut reader = stream;
        read_response(&mut reader)
    }
}

/// Map the wire's negative sentinels back onto crate errors.
fn sentinel(status: i32) -> RungError {
    match status {
        STATUS_INVALID_REQUEST => {
            RungError::Protocol("server rejected the request frame".to_string())
        }
        STATUS_INTERNAL => RungError::Network("server reported an internal error".to_string()),
        STATUS_EMPTY => RungError::Protocol("server answered with an empty message".to_string()),
        other => RungError::Protocol(format!("unexpected response status {other}")),
    }
}
