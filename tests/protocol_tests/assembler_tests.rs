//! Response Assembler Tests
//!
//! These tests verify:
//! - A response is complete as soon as it parses, with no extra reads
//! - The overall and rolling deadlines
//! - End of stream before completion
//! - Buffer limits and structural edge cases

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use litetable_client::protocol::{AssemblerConfig, AssemblyState, ResponseAssembler};
use litetable_client::transport::{channel_pair, Transport};
use litetable_client::ClientError;

// =============================================================================
// Helper Functions
// =============================================================================

fn fast_config() -> AssemblerConfig {
    AssemblerConfig {
        response_timeout: Duration::from_millis(500),
        rolling_timeout: Duration::from_millis(100),
        max_total: Duration::from_secs(1),
        read_chunk_size: 4096,
        max_response_bytes: 1024 * 1024,
    }
}

fn assembler() -> ResponseAssembler {
    ResponseAssembler::new(fast_config(), Instant::now())
}

/// Transport that is interrupted once, then fails with the given error kind
/// (`Other` first returns one byte of data)
struct FailingTransport {
    kind: io::ErrorKind,
    reads: usize,
}

impl Transport for FailingTransport {
    fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        // Interrupted once, then the real failure
        if self.reads == 1 {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        }
        if self.kind == io::ErrorKind::Other && self.reads == 2 {
            buf[..1].copy_from_slice(b"[");
            return Ok(1);
        }
        Err(io::Error::new(self.kind, "injected"))
    }

    fn set_read_deadline(&mut self, _deadline: Instant) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Completion Tests
// =============================================================================

#[test]
fn test_two_chunk_response_stops_reading() {
    let (mut transport, peer) = channel_pair();
    peer.send(&b"{\"a\":"[..]).unwrap();
    peer.send(&b"1}"[..]).unwrap();
    peer.send(&b"trailing"[..]).unwrap();

    let response = assembler().assemble(&mut transport).unwrap();

    assert_eq!(&response.bytes[..], b"{\"a\":1}");
    assert_eq!(response.reads, 2);
    assert_eq!(transport.stats().reads, 2);
}

#[test]
fn test_single_chunk_response() {
    let (mut transport, peer) = channel_pair();
    peer.send(&b"{\"key\":\"user:42\",\"cols\":{}}"[..]).unwrap();

    let response = assembler().assemble(&mut transport).unwrap();

    assert_eq!(response.reads, 1);
    assert!(response.elapsed < Duration::from_millis(500));
}

#[test]
fn test_many_small_chunks() {
    let body = br#"{"user:1":{"key":"user:1","cols":{"f":{"q":[{"value":"dg==","timestamp":1}]}}}}"#;
    let (mut transport, peer) = channel_pair();
    for b in body.iter() {
        peer.send(vec![*b]).unwrap();
    }

    let response = assembler().assemble(&mut transport).unwrap();

    assert_eq!(&response.bytes[..], &body[..]);
    assert_eq!(response.reads, body.len());
}

#[test]
fn test_chunk_larger_than_read_buffer() {
    let config = AssemblerConfig {
        read_chunk_size: 4,
        ..fast_config()
    };
    let (mut transport, peer) = channel_pair();
    peer.send(&b"[1,2,3,4,5]"[..]).unwrap();

    let response = ResponseAssembler::new(config, Instant::now())
        .assemble(&mut transport)
        .unwrap();

    assert_eq!(&response.bytes[..], b"[1,2,3,4,5]");
    assert_eq!(response.reads, 3);
}

#[test]
fn test_chunks_arriving_over_time() {
    let (mut transport, peer) = channel_pair();

    let server = thread::spawn(move || {
        for part in [&b"{\"rows\":"[..], &b"[1,"[..], &b"2]}"[..]] {
            thread::sleep(Duration::from_millis(30));
            peer.send(part).unwrap();
        }
        peer
    });

    let response = assembler().assemble(&mut transport).unwrap();
    assert_eq!(&response.bytes[..], b"{\"rows\":[1,2]}");
    assert_eq!(response.reads, 3);

    server.join().unwrap();
}

// =============================================================================
// Deadline Tests
// =============================================================================

#[test]
fn test_rolling_deadline_after_partial_read() {
    let config = AssemblerConfig {
        response_timeout: Duration::from_millis(150),
        rolling_timeout: Duration::from_millis(50),
        ..fast_config()
    };
    let (mut transport, peer) = channel_pair();
    peer.send(&b"{\"a\":"[..]).unwrap();

    let started = Instant::now();
    let err = ResponseAssembler::new(config, started)
        .assemble(&mut transport)
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        ClientError::Timeout { elapsed, received } => {
            assert_eq!(received, 5);
            assert!(elapsed >= Duration::from_millis(50));
            assert!(elapsed < Duration::from_secs(2));
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
    drop(peer);
}

#[test]
fn test_overall_deadline_with_no_data() {
    let config = AssemblerConfig {
        response_timeout: Duration::from_millis(100),
        rolling_timeout: Duration::from_millis(50),
        ..fast_config()
    };
    let (mut transport, _peer) = channel_pair();

    let started = Instant::now();
    let err = ResponseAssembler::new(config, started)
        .assemble(&mut transport)
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout { received: 0, .. }));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_trickle_cannot_outlast_total_ceiling() {
    let config = AssemblerConfig {
        response_timeout: Duration::from_millis(100),
        rolling_timeout: Duration::from_millis(50),
        max_total: Duration::from_millis(200),
        ..fast_config()
    };
    let (mut transport, peer) = channel_pair();

    // A chunk every 30ms lands inside every rolling window
    let server = thread::spawn(move || {
        if peer.send(&b"["[..]).is_err() {
            return;
        }
        for _ in 0..100 {
            thread::sleep(Duration::from_millis(30));
            if peer.send(&b"1,"[..]).is_err() {
                break;
            }
        }
    });

    let started = Instant::now();
    let err = ResponseAssembler::new(config, started)
        .assemble(&mut transport)
        .unwrap_err();
    let elapsed = started.elapsed();
    drop(transport);
    server.join().unwrap();

    assert!(matches!(err, ClientError::Timeout { .. }), "got {:?}", err);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(800), "took {:?}", elapsed);
}

#[test]
fn test_deadline_already_passed() {
    let (mut transport, peer) = channel_pair();
    peer.send(&b"{}"[..]).unwrap();

    // Command "sent" long enough ago that the overall deadline is behind us
    let sent_at = Instant::now() - Duration::from_secs(1);
    let err = ResponseAssembler::new(fast_config(), sent_at)
        .assemble(&mut transport)
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout { .. }));
    assert_eq!(transport.stats().reads, 0);
}

#[test]
fn test_push_tracks_reads_and_buffer() {
    let sent_at = Instant::now();
    let mut asm = ResponseAssembler::new(fast_config(), sent_at);
    assert_eq!(asm.deadline(), sent_at + Duration::from_millis(500));

    assert!(!asm.push(b"[").unwrap());
    assert_eq!(asm.state(), AssemblyState::Accumulating);
    assert_eq!(asm.reads(), 1);
    assert_eq!(asm.buffered(), 1);
}

// =============================================================================
// End of Stream Tests
// =============================================================================

#[test]
fn test_clean_close_before_completion() {
    let (mut transport, peer) = channel_pair();
    peer.send(&b"{\"partial\":"[..]).unwrap();
    drop(peer);

    let err = assembler().assemble(&mut transport).unwrap_err();

    match &err {
        ClientError::Incomplete { raw } => assert_eq!(&raw[..], b"{\"partial\":"),
        other => panic!("Expected incomplete, got {:?}", other),
    }
    assert_eq!(err.raw_response(), Some(&b"{\"partial\":"[..]));
    assert!(!err.is_retryable());
}

#[test]
fn test_close_with_nothing_received() {
    let (mut transport, peer) = channel_pair();
    drop(peer);

    let err = assembler().assemble(&mut transport).unwrap_err();
    assert!(matches!(err, ClientError::Incomplete { ref raw } if raw.is_empty()));
}

#[test]
fn test_interrupted_read_is_retried() {
    let mut transport = FailingTransport {
        kind: io::ErrorKind::ConnectionReset,
        reads: 0,
    };

    let err = assembler().assemble(&mut transport).unwrap_err();

    assert_eq!(transport.reads, 2);
    assert!(matches!(err, ClientError::Transport { .. }));
}

#[test]
fn test_unexpected_eof_is_incomplete() {
    let mut transport = FailingTransport {
        kind: io::ErrorKind::UnexpectedEof,
        reads: 0,
    };

    let err = assembler().assemble(&mut transport).unwrap_err();
    assert!(matches!(err, ClientError::Incomplete { .. }));
}

#[test]
fn test_would_block_is_timeout() {
    let mut transport = FailingTransport {
        kind: io::ErrorKind::WouldBlock,
        reads: 0,
    };

    let err = assembler().assemble(&mut transport).unwrap_err();
    assert!(matches!(err, ClientError::Timeout { .. }));
}

#[test]
fn test_read_error_after_partial_data() {
    let mut transport = FailingTransport {
        kind: io::ErrorKind::Other,
        reads: 0,
    };

    let err = assembler().assemble(&mut transport).unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(transport.reads, 3);
}

// =============================================================================
// Push / Structural Tests
// =============================================================================

#[test]
fn test_braces_inside_strings() {
    let mut asm = assembler();

    assert!(!asm.push(br#"{"v":"}"#).unwrap());
    assert!(!asm.push(br#"{\"}""#).unwrap());
    assert!(asm.push(b"}").unwrap());
    assert_eq!(asm.state(), AssemblyState::Complete);
}

#[test]
fn test_leading_whitespace() {
    let mut asm = assembler();

    assert!(!asm.push(b"  \n ").unwrap());
    assert!(!asm.push(b"[\"a\"").unwrap());
    assert!(asm.push(b"]").unwrap());
}

#[test]
fn test_bare_scalar_completes_immediately() {
    let (mut transport, peer) = channel_pair();
    peer.send(&b"\"OK\""[..]).unwrap();
    peer.send(&b"ignored"[..]).unwrap();

    let response = assembler().assemble(&mut transport).unwrap();
    assert_eq!(&response.bytes[..], b"\"OK\"");
    assert_eq!(response.reads, 1);
}

#[test]
fn test_split_number_completes_early() {
    // Documented limitation: "12" parses on its own
    let mut asm = assembler();
    assert!(asm.push(b"12").unwrap());
    assert!(asm.push(b"3").unwrap());
    assert_eq!(asm.buffered(), 2);
}

#[test]
fn test_split_string_scalar() {
    let mut asm = assembler();
    assert!(!asm.push(b"\"hel").unwrap());
    assert!(asm.push(b"lo\"").unwrap());
}

#[test]
fn test_malformed_input_never_completes() {
    let mut asm = assembler();
    assert!(!asm.push(b"}{").unwrap());
    assert!(!asm.push(b"garbage").unwrap());
    assert_eq!(asm.state(), AssemblyState::Accumulating);
}

#[test]
fn test_response_too_large() {
    let config = AssemblerConfig {
        read_chunk_size: 8,
        max_response_bytes: 16,
        ..fast_config()
    };
    let mut asm = ResponseAssembler::new(config, Instant::now());

    assert!(!asm.push(b"[\"aaaaaaaa").unwrap());
    let err = asm.push(b"bbbbbbbbbb").unwrap_err();

    match err {
        ClientError::ResponseTooLarge { limit, raw } => {
            assert_eq!(limit, 16);
            assert_eq!(raw.len(), 20);
        }
        other => panic!("Expected too large, got {:?}", other),
    }

    // Terminal: later bytes are not buffered
    assert_eq!(asm.state(), AssemblyState::TooLarge);
    assert!(!asm.push(b"\"]").unwrap());
    assert_eq!(asm.buffered(), 0);
    assert_eq!(asm.reads(), 2);
}

#[test]
fn test_complete_response_at_limit_is_accepted() {
    let config = AssemblerConfig {
        read_chunk_size: 4,
        max_response_bytes: 4,
        ..fast_config()
    };
    let mut asm = ResponseAssembler::new(config, Instant::now());

    assert!(asm.push(b"[1,2,3]").unwrap());
}
