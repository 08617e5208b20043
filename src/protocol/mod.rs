//! Wire protocol
//!
//! Fixed-size request/response frames for the request service. Every frame
//! is exactly [`FRAME_SIZE`] bytes, so one `read_exact` yields one message.
//!
//! ## Frame Format (big-endian)
//!
//! ```text
//! ┌──────────┬───────────────────────┬───────────────────────┐
//! │ tag (4)  │ key field (2 + 1024)  │ value field (2 + 1024)│
//! └──────────┴───────────────────────┴───────────────────────┘
//! ```
//!
//! Each field is a u16 stored length followed by a 1024-byte cell. Stored
//! length 0 means the field is absent or empty; a payload of n bytes
//! (n <= 1023) is stored as length n + 1 with a NUL terminator after it,
//! and the rest of the cell is zero.
//!
//! ### Request tags
//! - 1: GET   - key only
//! - 2: SET   - key and value
//! - 3: DEL   - key only
//!
//! ### Response status (the tag field, reinterpreted)
//! Success carries the operation's result: a GET answers with the key's
//! rank (>= 1) and its value, SET and DEL answer 0. The remaining codes
//! are per-key outcomes and sentinels:
//! - 1:    SET hit an existing key
//! - -1:   GET/DEL missed
//! - -10:  malformed request frame
//! - -11:  internal server error
//! - -127: empty/unset message
//!
//! Responses echo the request's key field back.

mod codec;
mod request;
mod response;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, FRAME_SIZE,
};
pub use request::{Request, TAG_DEL, TAG_GET, TAG_SET};
pub use response::{
    Response, STATUS_DUPLICATE, STATUS_EMPTY, STATUS_INTERNAL, STATUS_INVALID_REQUEST,
    STATUS_NOT_FOUND, STATUS_OK,
};
