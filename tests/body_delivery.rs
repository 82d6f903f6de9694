// Buffered and streamed body delivery, fragmentation, and backpressure.

mod helpers;

use std::collections::BTreeMap;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use http_loader::{serialize, Body, BodyMode, FetchOutcome, HttpClient};

use helpers::{connect_plain, serve_fragmented, serve_ignore_errors, serve_once};

fn canned_response(body: &[u8]) -> Vec<u8> {
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
    response.extend_from_slice(body);
    response
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn fetch_body(addr: std::net::SocketAddr, mode: BodyMode) -> Body {
    let request = serialize("GET", "/", "example.com", &BTreeMap::new(), Vec::new()).unwrap();
    let client = HttpClient::new(connect_plain(addr).await, "http://example.com/", request);
    match client.fetch(mode).await.unwrap() {
        FetchOutcome::Response(response) => response.body,
        FetchOutcome::Redirect { .. } => panic!("unexpected redirect"),
    }
}

#[tokio::test]
async fn buffered_body_is_sized_exactly() {
    let body = patterned(200_000);
    let (addr, _served) = serve_once(canned_response(&body)).await;

    let delivered = fetch_body(addr, BodyMode::Buffer).await;
    let Body::Buffer(bytes) = delivered else {
        panic!("expected a buffered body");
    };
    assert_eq!(bytes.len(), body.len());
    assert_eq!(&bytes[..], &body[..]);
}

#[tokio::test]
async fn one_byte_fragments_deliver_identically_in_both_modes() {
    let body = patterned(4096);

    let (addr, _served) = serve_fragmented(canned_response(&body), 1).await;
    let buffered = fetch_body(addr, BodyMode::Buffer).await.bytes().await.unwrap();

    let (addr, _served) = serve_fragmented(canned_response(&body), 1).await;
    let streamed = fetch_body(addr, BodyMode::Stream).await.bytes().await.unwrap();

    assert_eq!(buffered, streamed);
    assert_eq!(&buffered[..], &body[..]);
}

#[tokio::test]
async fn streamed_response_is_delivered_before_the_body_finishes() {
    use tokio::net::TcpListener;

    let body = patterned(100_000);
    let head = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let body_clone = body.clone();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut discard = [0u8; 4096];
        // Read the request head, send only the response head, then hold the
        // body until released.
        loop {
            let n = socket.read(&mut discard).await.unwrap();
            if n == 0 || discard[..n].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        socket.write_all(&head).await.unwrap();
        socket.flush().await.unwrap();
        release_rx.await.unwrap();
        socket.write_all(&body_clone).await.unwrap();
        socket.shutdown().await.ok();
    });

    // The response object must come back while the server still holds the
    // entire body.
    let delivered = fetch_body(addr, BodyMode::Stream).await;
    let Body::Stream(mut stream) = delivered else {
        panic!("expected a streamed body");
    };

    release_tx.send(()).unwrap();
    let mut collected = Vec::new();
    stream.read_to_end(&mut collected).await.unwrap();
    assert_eq!(collected, body);
    server.await.unwrap();
}

#[tokio::test]
async fn stalled_consumer_loses_and_duplicates_nothing() {
    // Body far larger than the stream window, served in fragments, consumed
    // slowly after an initial stall.
    let body = patterned(256 * 1024);
    let (addr, _served) = serve_fragmented(canned_response(&body), 8 * 1024).await;

    let delivered = fetch_body(addr, BodyMode::Stream).await;
    let Body::Stream(mut stream) = delivered else {
        panic!("expected a streamed body");
    };

    // Stall: the pump must hold its pending chunk until we start draining.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let mut collected = Vec::new();
    let mut small = [0u8; 777];
    loop {
        let n = stream.read(&mut small).await.unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&small[..n]);
    }
    assert_eq!(collected.len(), body.len());
    assert_eq!(collected, body);
}

#[tokio::test]
async fn dropping_the_consumer_terminates_the_stream_cleanly() {
    let body = patterned(1024 * 1024);
    let (addr, served) = serve_ignore_errors(canned_response(&body)).await;

    let delivered = fetch_body(addr, BodyMode::Stream).await;
    drop(delivered);

    // The pump notices the closed consumer and releases the transport; the
    // fixture must come back rather than block on a reader that left.
    served.await.unwrap();
}

#[tokio::test]
async fn empty_body_yields_empty_buffer_and_immediate_stream_eof() {
    let (addr, _served) = serve_once(canned_response(b"")).await;
    let buffered = fetch_body(addr, BodyMode::Buffer).await.bytes().await.unwrap();
    assert!(buffered.is_empty());

    let (addr, _served) = serve_once(canned_response(b"")).await;
    let streamed = fetch_body(addr, BodyMode::Stream).await.bytes().await.unwrap();
    assert!(streamed.is_empty());
}
