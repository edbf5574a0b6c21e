//! TLS Transport Tests
//!
//! These tests verify:
//! - The handshake is bounded by the connect timeout
//! - Handshake failures surface as connect errors
//! - Trust material is validated up front

use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;

use litetable_client::protocol::{ReadRequest, Selector};
use litetable_client::transport::TlsDialer;
use litetable_client::{Client, ClientConfig, ClientError, Phase};

// =============================================================================
// Helper Functions
// =============================================================================

fn self_signed_pem() -> String {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    certified.cert.pem()
}

fn tls_client(addr: &str, connect_timeout: Duration) -> Client<TlsDialer> {
    let dialer =
        TlsDialer::new(addr, "localhost", self_signed_pem().as_bytes(), connect_timeout).unwrap();
    let config = ClientConfig::builder()
        .endpoint(addr)
        .response_timeout_ms(200)
        .rolling_timeout_ms(100)
        .build();
    Client::with_dialer(dialer, &config).unwrap()
}

fn key_read() -> ReadRequest {
    ReadRequest::new(Selector::Key("k".to_string()))
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_silent_server_fails_handshake_in_time() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (done_tx, done_rx) = channel::bounded::<()>(1);

    // Accept TCP, then never answer the ClientHello
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let _ = done_rx.recv_timeout(Duration::from_secs(5));
        drop(stream);
    });

    let client = tls_client(&addr, Duration::from_millis(200));
    let started = Instant::now();
    let err = client.read(&key_read()).unwrap_err();
    let elapsed = started.elapsed();

    done_tx.send(()).unwrap();
    server.join().unwrap();

    assert!(
        matches!(
            err,
            ClientError::Transport {
                phase: Phase::Connect,
                ..
            }
        ),
        "got {:?}",
        err
    );
    assert!(err.is_retryable());
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
}

#[test]
fn test_server_hangup_during_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let client = tls_client(&addr, Duration::from_secs(1));
    let err = client.read(&key_read()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(
        err,
        ClientError::Transport {
            phase: Phase::Connect,
            ..
        }
    ));
}

// =============================================================================
// Trust Material Tests
// =============================================================================

#[test]
fn test_empty_trust_material_rejected() {
    let result = TlsDialer::new("127.0.0.1:1", "localhost", b"", Duration::from_secs(1));
    assert!(matches!(result, Err(ClientError::Config(_))));
}

#[test]
fn test_invalid_server_name_rejected() {
    let pem = self_signed_pem();
    let result = TlsDialer::new("127.0.0.1:1", "not a name!", pem.as_bytes(), Duration::from_secs(1));
    assert!(matches!(result, Err(ClientError::Config(_))));
}
