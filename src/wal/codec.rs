//! Pluggable key/value byte codecs.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::blob::Blob;
use crate::error::{Result, RungError};

/// Turns keys and values into the byte blobs the log and snapshot formats
/// carry, and back. One codec instance serves both sides of a store when it
/// implements the trait for both the key and the value type.
pub trait BlobCodec<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Bincode-over-serde codec: works for any `Serialize + DeserializeOwned`
/// type, which makes it the default for heap-backed stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<T: Serialize + DeserializeOwned> BlobCodec<T> for BincodeCodec {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| RungError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| RungError::Serialization(e.to_string()))
    }
}

/// Identity codec for types that already are byte strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl BlobCodec<Vec<u8>> for RawCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

impl BlobCodec<Blob> for RawCodec {
    fn encode(&self, value: &Blob) -> Result<Vec<u8>> {
        Ok(value.payload().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Blob> {
        Blob::new(bytes)
    }
}
