// Shared test fixtures: canned-response TCP servers bound to loopback.
//
// Each fixture accepts its connection(s), captures the raw request bytes
// (reading through any Content-Length body the request announces), writes a
// canned response, and closes — matching the engine's Connection: close
// model.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use http_loader::Transport;

/// Serves `response` to a single connection. The join handle yields the
/// captured request bytes.
#[allow(dead_code)]
pub async fn serve_once(response: Vec<u8>) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    serve_fragmented(response, usize::MAX).await
}

/// Like `serve_once`, but writes the response `fragment` bytes at a time,
/// flushing and yielding between fragments so the client sees the body in
/// small pieces.
#[allow(dead_code)]
pub async fn serve_fragmented(
    response: Vec<u8>,
    fragment: usize,
) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        for chunk in response.chunks(fragment.max(1)) {
            socket.write_all(chunk).await.expect("write response");
            socket.flush().await.expect("flush response");
            tokio::task::yield_now().await;
        }
        socket.shutdown().await.ok();
        request
    });
    (addr, handle)
}

/// Serves one connection but tolerates write failures — for tests where the
/// client tears down mid-response.
#[allow(dead_code)]
pub async fn serve_ignore_errors(response: Vec<u8>) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
        request
    });
    (addr, handle)
}

/// Serves one connection per entry of `responses`, in order. The join
/// handle yields the captured request bytes per connection.
#[allow(dead_code)]
pub async fn serve_sequence(responses: Vec<Vec<u8>>) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for response in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            requests.push(read_request(&mut socket).await);
            socket.write_all(&response).await.expect("write response");
            socket.shutdown().await.ok();
        }
        requests
    });
    (addr, handle)
}

/// Connects a plain transport to a fixture.
#[allow(dead_code)]
pub async fn connect_plain(addr: SocketAddr) -> Transport {
    Transport::Plain(TcpStream::connect(addr).await.expect("connect"))
}

async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(end) = find(&request, b"\r\n\r\n") {
            let needed = end + 4 + content_length(&request[..end]);
            if request.len() >= needed {
                return request;
            }
        }
        let n = socket.read(&mut buf).await.expect("read request");
        if n == 0 {
            return request;
        }
        request.extend_from_slice(&buf[..n]);
    }
}

fn find(data: &[u8], delimiter: &[u8]) -> Option<usize> {
    data.windows(delimiter.len())
        .position(|window| window == delimiter)
}

fn content_length(head: &[u8]) -> usize {
    let text = String::from_utf8_lossy(head);
    for line in text.lines() {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                return value.trim().parse().unwrap_or(0);
            }
        }
    }
    0
}
