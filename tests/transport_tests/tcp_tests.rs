//! TCP Transport Tests
//!
//! These tests verify, against a real socket on localhost:
//! - A response trickled across several segments is assembled
//! - Read deadlines surface as timeouts
//! - Peer hangup and out-of-band shutdown end blocked reads

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use litetable_client::protocol::{ReadRequest, Selector};
use litetable_client::transport::{TcpTransport, Transport};
use litetable_client::{Client, ClientConfig, ClientError, Phase, ReadResult};

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(addr: &str) -> ClientConfig {
    ClientConfig::builder()
        .endpoint(addr)
        .connect_timeout_ms(1000)
        .response_timeout_ms(1000)
        .rolling_timeout_ms(150)
        .build()
}

/// Read the command sent on a fresh connection
fn read_command(stream: &mut TcpStream) -> String {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).unwrap();
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

/// Serve one connection: read the command, then write each chunk after
/// `gap`. The stream is returned open.
fn serve(
    listener: TcpListener,
    chunks: Vec<&'static [u8]>,
    gap: Duration,
) -> JoinHandle<(String, TcpStream)> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let command = read_command(&mut stream);
        for chunk in chunks {
            thread::sleep(gap);
            stream.write_all(chunk).unwrap();
            stream.flush().unwrap();
        }
        (command, stream)
    })
}

fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

fn key_read(key: &str) -> ReadRequest {
    ReadRequest::new(Selector::Key(key.to_string())).family("profile")
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_trickled_response_over_tcp() {
    let (listener, addr) = local_listener();
    let server = serve(
        listener,
        vec![
            &b"{\"key\":\"user:42\","[..],
            &b"\"cols\":{\"profile\":{\"name\":"[..],
            &b"[{\"value\":\"Sm9obg==\",\"timestamp\":1700000000}]}}}"[..],
        ],
        Duration::from_millis(40),
    );

    let client = Client::tcp(&config_for(&addr)).unwrap();
    let result = client.read(&key_read("user:42")).unwrap();
    let (command, _stream) = server.join().unwrap();

    assert_eq!(command, "READ key=user:42 family=profile");
    match result {
        ReadResult::Row(row) => {
            assert_eq!(row.latest("profile", "name").unwrap().as_str(), "John");
        }
        other => panic!("Expected a row, got {:?}", other),
    }
}

#[test]
fn test_client_closes_connection_after_response() {
    let (listener, addr) = local_listener();
    let server = serve(listener, vec![&b"null"[..]], Duration::ZERO);

    let client = Client::tcp(&config_for(&addr)).unwrap();
    assert_eq!(client.read(&key_read("k")).unwrap(), ReadResult::NotFound);

    // The client shut its end down, so the server sees end of stream
    let (_, mut stream) = server.join().unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_stalled_server_times_out() {
    let (listener, addr) = local_listener();
    let server = serve(listener, vec![&b"{\"key\":"[..]], Duration::ZERO);

    let started = Instant::now();
    let client = Client::tcp(&config_for(&addr)).unwrap();
    let err = client.read(&key_read("k")).unwrap_err();

    assert!(matches!(err, ClientError::Timeout { .. }), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(3));
    server.join().unwrap();
}

#[test]
fn test_server_hangup_mid_response() {
    let (listener, addr) = local_listener();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_command(&mut stream);
        stream.write_all(b"{\"key\":\"k\",").unwrap();
        // stream dropped here
    });

    let client = Client::tcp(&config_for(&addr)).unwrap();
    let err = client.read(&key_read("k")).unwrap_err();
    server.join().unwrap();

    match err {
        ClientError::Incomplete { raw } => assert_eq!(&raw[..], b"{\"key\":\"k\","),
        other => panic!("Expected incomplete, got {:?}", other),
    }
}

#[test]
fn test_connection_refused() {
    let (listener, addr) = local_listener();
    drop(listener);

    let client = Client::tcp(&config_for(&addr)).unwrap();
    let err = client.read(&key_read("k")).unwrap_err();

    assert!(matches!(
        err,
        ClientError::Transport {
            phase: Phase::Connect,
            ..
        }
    ));
    assert!(err.is_retryable());
}

#[test]
fn test_unresolvable_endpoint() {
    let client = Client::tcp(&config_for("not an address")).unwrap();
    let err = client.read(&key_read("k")).unwrap_err();

    assert!(matches!(err, ClientError::Transport { phase: Phase::Connect, .. }));
}

// =============================================================================
// Transport Tests
// =============================================================================

#[test]
fn test_peer_addr() {
    let (listener, addr) = local_listener();
    let accept = thread::spawn(move || listener.accept().unwrap());

    let transport = TcpTransport::connect(&addr, Duration::from_secs(1)).unwrap();
    assert_eq!(transport.peer_addr(), addr);
    accept.join().unwrap();
}

#[test]
fn test_out_of_band_shutdown_unblocks_read() {
    let (listener, addr) = local_listener();
    let accept = thread::spawn(move || listener.accept().unwrap());

    let mut transport = TcpTransport::connect(&addr, Duration::from_secs(1)).unwrap();
    let _server_side = accept.join().unwrap();
    let handle = transport.shutdown_handle().unwrap();

    transport
        .set_read_deadline(Instant::now() + Duration::from_secs(5))
        .unwrap();

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.shutdown().unwrap();
    });

    let started = Instant::now();
    let mut buf = [0u8; 64];
    let read = transport.read(&mut buf);
    closer.join().unwrap();

    // Either a clean end of stream or an error, but never a full wait
    assert!(matches!(read, Ok(0) | Err(_)));
    assert!(started.elapsed() < Duration::from_secs(2));

    transport.close().unwrap();
}

#[test]
fn test_read_deadline_is_timeout() {
    let (listener, addr) = local_listener();
    let accept = thread::spawn(move || listener.accept().unwrap());

    let mut transport = TcpTransport::connect(&addr, Duration::from_secs(1)).unwrap();
    let _server_side = accept.join().unwrap();

    transport
        .set_read_deadline(Instant::now() + Duration::from_millis(50))
        .unwrap();

    let mut buf = [0u8; 64];
    let err = transport.read(&mut buf).unwrap_err();
    assert!(litetable_client::transport::is_timeout(&err));
}
