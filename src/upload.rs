//! Upload sources: caller-supplied units of request-body bytes.
//!
//! Two variants cover the callers this engine serves: fully-materialized
//! bytes, and an arbitrary async byte stream drained to EOF. Either way the
//! contract is the same — `read_all` moves every byte of the unit into the
//! request body buffer, or fails without producing a partial request.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::TRANSFER_CHUNK_SIZE;
use crate::error::LoadError;

/// One unit of request-body bytes.
pub enum UploadSource {
    /// Fully-materialized bytes.
    Buffer(Bytes),
    /// An async byte stream, drained to EOF.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl UploadSource {
    /// Creates a source from in-memory bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        UploadSource::Buffer(bytes.into())
    }

    /// Creates a source draining `reader` to EOF.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        UploadSource::Reader(Box::new(reader))
    }

    /// Drains this source's bytes into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Failed`] if the underlying reader fails; `out`
    /// then holds whatever was read and the caller must abort the build.
    pub async fn read_all(&mut self, out: &mut Vec<u8>) -> Result<(), LoadError> {
        match self {
            UploadSource::Buffer(bytes) => {
                out.extend_from_slice(bytes);
                Ok(())
            }
            UploadSource::Reader(reader) => {
                let mut chunk = vec![0u8; TRANSFER_CHUNK_SIZE];
                loop {
                    let n = reader.read(&mut chunk).await.map_err(|e| {
                        log::debug!("upload source read: {e}");
                        LoadError::Failed
                    })?;
                    if n == 0 {
                        return Ok(());
                    }
                    out.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadSource::Buffer(bytes) => write!(f, "UploadSource::Buffer({} bytes)", bytes.len()),
            UploadSource::Reader(_) => f.write_str("UploadSource::Reader"),
        }
    }
}
