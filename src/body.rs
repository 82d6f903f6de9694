//! Response body handles.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, DuplexStream};

use crate::config::TRANSFER_CHUNK_SIZE;
use crate::error::LoadError;

/// A response body: fully materialized or a live byte stream, never both.
pub enum Body {
    /// Sized buffer holding the complete body.
    Buffer(Bytes),
    /// Consumer half of a live byte stream; bytes arrive while the transport
    /// is still being read, and EOF on the stream means end-of-body.
    Stream(DuplexStream),
}

impl Body {
    /// Drains the body to completion, materializing a stream if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Failed`] if reading the stream half fails.
    pub async fn bytes(self) -> Result<Bytes, LoadError> {
        match self {
            Body::Buffer(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut out = BytesMut::new();
                let mut chunk = vec![0u8; TRANSFER_CHUNK_SIZE];
                loop {
                    let n = stream.read(&mut chunk).await.map_err(|e| {
                        log::debug!("draining body stream: {e}");
                        LoadError::Failed
                    })?;
                    if n == 0 {
                        return Ok(out.freeze());
                    }
                    out.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Buffer(bytes) => write!(f, "Body::Buffer({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

/// Copies `src` into a sized buffer of exactly `src.len()` bytes, moving one
/// transfer chunk at a time.
pub(crate) fn copy_into_sized_buffer(src: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(src.len());
    for chunk in src.chunks(TRANSFER_CHUNK_SIZE) {
        out.extend_from_slice(chunk);
    }
    Bytes::from(out)
}
