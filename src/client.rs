//! The HTTP/1.1 client state machine.
//!
//! One instance per request attempt. [`HttpClient::fetch`] consumes the
//! instance and drives the phases strictly in order — write pump, status
//! line, headers, then body delivery in the pre-selected mode — so an
//! earlier phase can never be re-entered and a redirect never loops the
//! same instance. Each `.await` is one resumption point on a transport
//! event.
//!
//! All parsing works against a single growing receive buffer; every phase
//! claims (`split_to`) exactly the bytes it has semantically consumed and
//! leaves the remainder for the next phase.

use std::io::IoSlice;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::body::{copy_into_sized_buffer, Body};
use crate::config::{STREAM_WINDOW, TRANSFER_CHUNK_SIZE};
use crate::error::LoadError;
use crate::request::SerializedRequest;
use crate::response::{FetchOutcome, Response};
use crate::transport::Transport;

/// Body delivery mode. Decided once, before any body bytes are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Materialize the whole body into a sized buffer before delivery.
    Buffer,
    /// Deliver the body incrementally through a live byte stream.
    Stream,
}

/// An HTTP/1.1 client over an already-connected transport.
///
/// Owns the outbound request buffers, the shared receive buffer, and the
/// parsed status fields. Not reusable: `fetch` consumes it, and a redirect
/// is reported upward rather than followed here.
#[derive(Debug)]
pub struct HttpClient {
    transport: Transport,
    url: String,
    request: SerializedRequest,
    header_sent: usize,
    body_sent: usize,
    recv: BytesMut,
    version: String,
    status_code: u16,
    status_message: String,
}

impl HttpClient {
    /// Creates a client for one request attempt.
    pub fn new(transport: Transport, url: impl Into<String>, request: SerializedRequest) -> Self {
        Self {
            transport,
            url: url.into(),
            request,
            header_sent: 0,
            body_sent: 0,
            recv: BytesMut::new(),
            version: String::new(),
            status_code: 0,
            status_message: String::new(),
        }
    }

    /// Runs the request to its terminal outcome.
    ///
    /// In `Stream` mode the response object is returned as soon as the
    /// headers are parsed, with body bytes still arriving on its stream
    /// handle; in `Buffer` mode it is returned only once the transport hits
    /// EOF and the body is fully materialized.
    ///
    /// # Errors
    ///
    /// Exactly one [`LoadError`] per failed attempt; afterwards no further
    /// transport operations are issued by this instance.
    pub async fn fetch(mut self, mode: BodyMode) -> Result<FetchOutcome, LoadError> {
        self.write_request().await?;
        self.read_status_line().await?;
        let headers = self.read_headers().await?;

        if self.status_code == 301 || self.status_code == 302 {
            // No response object for a redirect. Location is matched
            // case-sensitively; absent means an empty target.
            let location = headers
                .into_iter()
                .find(|(name, _)| name == "Location")
                .map(|(_, value)| value)
                .unwrap_or_default();
            log::debug!("{} redirecting to {location:?}", self.url);
            return Ok(FetchOutcome::Redirect {
                status_code: self.status_code,
                location,
            });
        }

        // Every other status code is deliverable, 4xx and 5xx included;
        // success policy belongs to the caller.
        let status_line = self.status_line();
        match mode {
            BodyMode::Buffer => {
                let body = self.buffer_body().await?;
                Ok(FetchOutcome::Response(Response {
                    status_code: self.status_code,
                    status_line,
                    url: self.url,
                    headers,
                    body: Body::Buffer(body),
                }))
            }
            BodyMode::Stream => {
                let (producer, consumer) = tokio::io::duplex(STREAM_WINDOW);
                let response = Response {
                    status_code: self.status_code,
                    status_line,
                    url: self.url,
                    headers,
                    body: Body::Stream(consumer),
                };
                // The consumer half leaves with the response before any body
                // byte is read; the pump takes the transport and whatever
                // the header phase left in the receive buffer.
                tokio::spawn(stream_body(self.transport, self.recv, producer));
                Ok(FetchOutcome::Response(response))
            }
        }
    }

    fn status_line(&self) -> String {
        if self.status_message.is_empty() {
            format!("{} {}", self.version, self.status_code)
        } else {
            format!(
                "{} {} {}",
                self.version, self.status_code, self.status_message
            )
        }
    }

    /// Drives the (header, body) segments through as many partial writes as
    /// it takes. Transferred bytes are attributed to the header segment
    /// first; a fully-sent segment drops out of the next write's slice
    /// list.
    async fn write_request(&mut self) -> Result<(), LoadError> {
        while self.header_sent < self.request.header.len()
            || self.body_sent < self.request.body.len()
        {
            let transferred = {
                let mut segments: Vec<IoSlice<'_>> = Vec::with_capacity(2);
                if self.header_sent < self.request.header.len() {
                    segments.push(IoSlice::new(&self.request.header[self.header_sent..]));
                }
                if self.body_sent < self.request.body.len() {
                    segments.push(IoSlice::new(&self.request.body[self.body_sent..]));
                }
                self.transport.write_vectored(&segments).await
            }
            .map_err(|e| {
                log::debug!("write request: {e}");
                LoadError::Failed
            })?;

            if transferred == 0 {
                log::debug!("write request: zero-length write");
                return Err(LoadError::Failed);
            }

            let header_remaining = self.request.header.len() - self.header_sent;
            let from_header = transferred.min(header_remaining);
            self.header_sent += from_header;
            self.body_sent += transferred - from_header;
            debug_assert!(self.body_sent <= self.request.body.len());
        }
        Ok(())
    }

    /// Reads until `delimiter` is buffered and returns the index one past
    /// it. Only acts once the delimiter is actually present; EOF or a read
    /// error before that is terminal.
    async fn fill_until(&mut self, delimiter: &[u8]) -> Result<usize, LoadError> {
        loop {
            if let Some(pos) = find_delimiter(&self.recv, delimiter) {
                return Ok(pos + delimiter.len());
            }
            let n = read_some(&mut self.transport, &mut self.recv)
                .await
                .map_err(|e| {
                    log::debug!("read response: {e}");
                    LoadError::Failed
                })?;
            if n == 0 {
                log::debug!("connection closed before response delimiter");
                return Err(LoadError::Failed);
            }
        }
    }

    async fn read_status_line(&mut self) -> Result<(), LoadError> {
        let end = self.fill_until(b"\r\n").await?;
        let line = self.recv.split_to(end);
        let text = std::str::from_utf8(&line[..line.len() - 2]).map_err(|_| {
            log::debug!("status line: not valid UTF-8");
            LoadError::InvalidResponse
        })?;

        let (version, status_code, status_message) = parse_status_line(text)?;
        self.version = version;
        self.status_code = status_code;
        self.status_message = status_message;
        Ok(())
    }

    /// Claims the header block up to the blank line and parses it into an
    /// ordered, duplicate-preserving list. Any body bytes already received
    /// stay in the receive buffer for the body phase.
    async fn read_headers(&mut self) -> Result<Vec<(String, String)>, LoadError> {
        let end = self.fill_header_block().await?;
        let block = self.recv.split_to(end);
        let text = String::from_utf8_lossy(&block);

        let mut headers = Vec::new();
        for line in text.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            headers.push(parse_header_field(line));
        }
        Ok(headers)
    }

    /// Reads until the header block's blank-line terminator is buffered and
    /// returns the index one past it. The status-line phase already claimed
    /// its line terminator, so a block with no headers degenerates to a
    /// single leading CRLF.
    async fn fill_header_block(&mut self) -> Result<usize, LoadError> {
        loop {
            if self.recv.len() >= 2 && &self.recv[..2] == b"\r\n" {
                return Ok(2);
            }
            if let Some(pos) = find_delimiter(&self.recv, b"\r\n\r\n") {
                return Ok(pos + 4);
            }
            let n = read_some(&mut self.transport, &mut self.recv)
                .await
                .map_err(|e| {
                    log::debug!("read response: {e}");
                    LoadError::Failed
                })?;
            if n == 0 {
                log::debug!("connection closed before end of headers");
                return Err(LoadError::Failed);
            }
        }
    }

    /// Accumulates body bytes until transport EOF, then copies them into a
    /// buffer sized to the exact byte count.
    async fn buffer_body(&mut self) -> Result<Bytes, LoadError> {
        loop {
            let n = read_some(&mut self.transport, &mut self.recv)
                .await
                .map_err(|e| {
                    log::debug!("buffer body: {e}");
                    LoadError::Failed
                })?;
            if n == 0 {
                break;
            }
        }
        Ok(copy_into_sized_buffer(&self.recv))
    }
}

/// Streamed-body pump. Pushes buffered bytes to the producer half one
/// transfer chunk at a time, then reads at least one more byte, until
/// transport EOF or the consumer goes away. Dropping the producer is the
/// end-of-body signal; there is no explicit done marker.
async fn stream_body(mut transport: Transport, mut recv: BytesMut, mut producer: DuplexStream) {
    loop {
        while !recv.is_empty() {
            let take = recv.len().min(TRANSFER_CHUNK_SIZE);
            let chunk = recv.split_to(take);
            // write_all suspends while the consumer is not drainable and
            // never advances past an unpushed chunk. An error means the
            // consumer closed its half: clean early termination, not a
            // failure to report.
            if producer.write_all(&chunk).await.is_err() {
                log::debug!("stream body: consumer closed");
                return;
            }
        }
        match read_some(&mut transport, &mut recv).await {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                log::debug!("stream body: {e}");
                return;
            }
        }
    }
}

/// Appends more bytes from the transport into `recv`. Returns 0 on EOF.
///
/// A TLS peer that closes without `close_notify` surfaces as
/// `UnexpectedEof`; for a close-delimited body that is a benign EOF, not an
/// error.
async fn read_some(transport: &mut Transport, recv: &mut BytesMut) -> std::io::Result<usize> {
    recv.reserve(TRANSFER_CHUNK_SIZE);
    match transport.read_buf(recv).await {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && transport.is_tls() => Ok(0),
        Err(e) => Err(e),
    }
}

fn find_delimiter(data: &[u8], delimiter: &[u8]) -> Option<usize> {
    data.windows(delimiter.len())
        .position(|window| window == delimiter)
}

/// Splits a status line into version token, numeric code, and message.
///
/// The version must start with `HTTP/` and the code must be numeric;
/// anything else is an invalid response and stops parsing. The status code
/// value itself is never judged here — all codes proceed.
fn parse_status_line(line: &str) -> Result<(String, u16, String), LoadError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    let code = parts.next().unwrap_or("");
    let message = parts.next().unwrap_or("").trim_start();

    if !version.starts_with("HTTP/") {
        log::debug!("status line {line:?}: invalid response");
        return Err(LoadError::InvalidResponse);
    }
    let status_code: u16 = code.parse().map_err(|_| {
        log::debug!("status line {line:?}: invalid response");
        LoadError::InvalidResponse
    })?;

    Ok((version.to_string(), status_code, message.to_string()))
}

/// Splits a header line at the first colon. The value skips spaces right
/// after the colon and runs to the end of the line; a missing colon yields
/// an empty value rather than an error.
fn parse_header_field(line: &str) -> (String, String) {
    match line.split_once(':') {
        Some((name, rest)) => (name.to_string(), rest.trim_start_matches(' ').to_string()),
        None => (line.to_string(), String::new()),
    }
}
