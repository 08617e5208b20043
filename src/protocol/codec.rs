//! Frame encoding and decoding.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::blob::{Blob, BLOB_CAPACITY};
use crate::error::{Result, RungError};

use super::request::{Request, TAG_DEL, TAG_GET, TAG_SET};
use super::response::Response;

/// Bytes per field: u16 stored length + the fixed cell.
const FIELD_SIZE: usize = 2 + BLOB_CAPACITY;

/// Every message on the wire is exactly this many bytes.
pub const FRAME_SIZE: usize = 4 + 2 * FIELD_SIZE;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request into one fixed-size frame.
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(FRAME_SIZE);
    frame.put_i32(request.tag());
    match request {
        Request::Get { key } | Request::Del { key } => {
            put_field(&mut frame, key);
            put_field(&mut frame, &Blob::empty());
        }
        Request::Set { key, value } => {
            put_field(&mut frame, key);
            put_field(&mut frame, value);
        }
    }
    frame.to_vec()
}

/// Decode one request frame.
pub fn decode_request(frame: &[u8]) -> Result<Request> {
    let mut buf = check_frame(frame)?;
    let tag = buf.get_i32();
    let key = get_field(&mut buf)?;
    let value = get_field(&mut buf)?;
    match tag {
        TAG_GET => Ok(Request::Get { key }),
        TAG_SET => Ok(Request::Set { key, value }),
        TAG_DEL => Ok(Request::Del { key }),
        other => Err(RungError::Protocol(format!("unknown request tag {other}"))),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response into one fixed-size frame.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(FRAME_SIZE);
    frame.put_i32(response.status);
    put_field(&mut frame, &response.key);
    put_field(&mut frame, &response.value);
    frame.to_vec()
}

/// Decode one response frame. Any status value is accepted; interpreting
/// it is the caller's job (GET success reuses the field for the rank).
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    let mut buf = check_frame(frame)?;
    let status = buf.get_i32();
    let key = get_field(&mut buf)?;
    let value = get_field(&mut buf)?;
    Ok(Response { status, key, value })
}

// =============================================================================
// Field helpers
// =============================================================================

fn check_frame(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() != FRAME_SIZE {
        return Err(RungError::Protocol(format!(
            "frame is {} bytes, expected {FRAME_SIZE}",
            frame.len()
        )));
    }
    Ok(frame)
}

/// Stored length 0 for an empty payload; otherwise payload + NUL, with the
/// stored length counting the terminator and the cell zero-padded.
fn put_field(frame: &mut BytesMut, blob: &Blob) {
    if blob.is_empty() {
        frame.put_u16(0);
        frame.put_bytes(0, BLOB_CAPACITY);
    } else {
        frame.put_u16(blob.len() as u16 + 1);
        frame.put_slice(blob.payload());
        frame.put_bytes(0, BLOB_CAPACITY - blob.len());
    }
}

fn get_field(buf: &mut &[u8]) -> Result<Blob> {
    let stored = buf.get_u16() as usize;
    let cell = &buf[..BLOB_CAPACITY];
    let blob = match stored {
        0 => Blob::empty(),
        n if n > BLOB_CAPACITY => {
            return Err(RungError::Protocol(format!(
                "field claims {n} stored bytes, cell is {BLOB_CAPACITY}"
            )))
        }
        n if cell[n - 1] != 0 => {
            return Err(RungError::Protocol(
                "field payload is not NUL-terminated".to_string(),
            ))
        }
        n => Blob::new(&cell[..n - 1])?,
    };
    buf.advance(BLOB_CAPACITY);
    Ok(blob)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read exactly one request frame from a stream.
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let mut frame = [0u8; FRAME_SIZE];
    reader.read_exact(&mut frame)?;
    decode_request(&frame)
}

/// Write one request frame to a stream.
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

/// Read exactly one response frame from a stream.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut frame = [0u8; FRAME_SIZE];
    reader.read_exact(&mut frame)?;
    decode_response(&frame)
}

/// Write one response frame to a stream.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::response::STATUS_NOT_FOUND;

    fn blob(payload: &[u8]) -> Blob {
        Blob::new(payload).unwrap()
    }

    #[test]
    fn request_frames_are_fixed_size() {
        assert_eq!(FRAME_SIZE, 2056);
        let get = encode_request(&Request::Get { key: blob(b"k") });
        let set = encode_request(&Request::Set {
            key: blob(b"k"),
            value: blob(b"a much longer value than the key"),
        });
        assert_eq!(get.len(), FRAME_SIZE);
        assert_eq!(set.len(), FRAME_SIZE);
    }

    #[test]
    fn request_round_trip() {
        for request in [
            Request::Get { key: blob(b"alpha") },
            Request::Set {
                key: blob(b"alpha"),
                value: blob(b"beta"),
            },
            Request::Del { key: blob(b"alpha") },
            Request::Set {
                key: blob(&[0xfe; 1023]),
                value: blob(b""),
            },
        ] {
            let frame = encode_request(&request);
            assert_eq!(decode_request(&frame).unwrap(), request);
        }
    }

    #[test]
    fn response_round_trip() {
        for response in [
            Response::found(blob(b"k"), blob(b"v"), 17),
            Response::ok(blob(b"k")),
            Response::status(STATUS_NOT_FOUND, blob(b"k")),
        ] {
            let frame = encode_response(&response);
            assert_eq!(decode_response(&frame).unwrap(), response);
        }
    }

    #[test]
    fn rejects_wrong_frame_length() {
        assert!(decode_request(&[0u8; FRAME_SIZE - 1]).is_err());
        assert!(decode_response(&[0u8; FRAME_SIZE + 1]).is_err());
    }

    #[test]
    fn rejects_unknown_tag() {
        let mut frame = encode_request(&Request::Get { key: blob(b"k") });
        frame[..4].copy_from_slice(&9i32.to_be_bytes());
        assert!(matches!(
            decode_request(&frame),
            Err(RungError::Protocol(_))
        ));
    }

    #[test]
    fn rejects_oversized_field_length() {
        let mut frame = encode_request(&Request::Get { key: blob(b"k") });
        frame[4..6].copy_from_slice(&2000u16.to_be_bytes());
        assert!(decode_request(&frame).is_err());
    }

    #[test]
    fn rejects_missing_terminator() {
        let mut frame = encode_request(&Request::Get { key: blob(b"kk") });
        // Stored length 3 says the third cell byte is the NUL; overwrite it.
        frame[4 + 2 + 2] = b'x';
        assert!(matches!(
            decode_request(&frame),
            Err(RungError::Protocol(_))
        ));
    }

    #[test]
    fn stream_helpers_round_trip() {
        let request = Request::Set {
            key: blob(b"stream"),
            value: blob(b"payload"),
        };
        let mut wire = Vec::new();
        write_request(&mut wire, &request).unwrap();
        let mut cursor = &wire[..];
        assert_eq!(read_request(&mut cursor).unwrap(), request);
    }
}
