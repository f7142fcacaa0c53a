//! Session framing and lifecycle tests.

use std::collections::VecDeque;
use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;

use crate::dispatch::router::RouterOptions;
use crate::host::{Host, MemoryHost};
use crate::scheduler::{ManualScheduler, OwnerScheduler};

use super::*;

/// In-memory stream that replays scripted reads and records writes.
#[derive(Default)]
struct ScriptedStream {
    reads: VecDeque<io::Result<Vec<u8>>>,
    written: Vec<u8>,
    failing_writes: usize,
}

impl ScriptedStream {
    fn with_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            reads: chunks.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    fn responses(&self) -> Vec<Response> {
        String::from_utf8(self.written.clone())
            .expect("utf8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("response line parses"))
            .collect()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(Ok(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Err(error)) => Err(error),
            None => Ok(0),
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[fixture]
fn router() -> CommandRouter {
    let host: Arc<dyn Host> = Arc::new(MemoryHost::with_scenes(["Intro"]));
    let scheduler: Arc<dyn OwnerScheduler> = Arc::new(ManualScheduler::new());
    CommandRouter::new(host, scheduler, RouterOptions::default())
}

fn run(
    router: &CommandRouter,
    stream: &mut ScriptedStream,
    max_request_bytes: usize,
) -> SessionEnd {
    Session::new(router, max_request_bytes).run(stream, &AtomicBool::new(false))
}

const INFO_REQUEST: &[u8] = br#"{"type": "get_session_info", "params": {}}"#;

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
#[case(17)]
#[case(INFO_REQUEST.len())]
fn chunked_request_yields_one_response(router: CommandRouter, #[case] chunk_size: usize) {
    let mut stream =
        ScriptedStream::with_chunks(INFO_REQUEST.chunks(chunk_size).map(<[u8]>::to_vec));

    assert_eq!(run(&router, &mut stream, 1024), SessionEnd::PeerClosed);
    let responses = stream.responses();
    assert_eq!(responses.len(), 1);
    assert!(matches!(
        &responses[0],
        Response::Success { result } if result["tempo"] == json!(120.0)
    ));
}

#[rstest]
fn several_documents_in_one_read_answer_in_order(router: CommandRouter) {
    let payload =
        b"{\"type\":\"bogus_a\"}\n{\"type\":\"get_scenes\"} {\"type\":\"bogus_b\"}".to_vec();
    let mut stream = ScriptedStream::with_chunks([payload]);

    run(&router, &mut stream, 1024);
    assert_eq!(
        stream.responses(),
        vec![
            Response::error("Unknown command: bogus_a"),
            Response::success(json!({"scenes": [{"index": 0, "name": "Intro"}]})),
            Response::error("Unknown command: bogus_b"),
        ]
    );
}

#[rstest]
fn leftover_bytes_join_the_next_read(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([
        b"{\"type\":\"bogus_a\"}{\"type\":".to_vec(),
        b"\"bogus_b\"}".to_vec(),
    ]);

    run(&router, &mut stream, 1024);
    assert_eq!(stream.responses().len(), 2);
}

#[rstest]
fn non_object_documents_get_a_structure_error(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([b"[1, 2]".to_vec()]);

    run(&router, &mut stream, 1024);
    assert_eq!(
        stream.responses(),
        vec![Response::error(
            "invalid request structure: expected a JSON object, got an array"
        )]
    );
}

#[rstest]
fn oversized_pending_input_closes_the_session(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([
        b"{\"type\": \"get_scenes\", \"params\": {\"padding\": \"".to_vec(),
        vec![b'x'; 64],
    ]);

    assert_eq!(run(&router, &mut stream, 64), SessionEnd::RequestTooLarge);
    let responses = stream.responses();
    assert_eq!(responses.len(), 1);
    assert!(matches!(
        &responses[0],
        Response::Error { message } if message.starts_with("request too large")
    ));
}

#[rstest]
fn read_timeouts_keep_the_session_alive(router: CommandRouter) {
    let mut stream = ScriptedStream::default();
    stream
        .reads
        .push_back(Err(io::Error::new(io::ErrorKind::WouldBlock, "idle")));
    stream.reads.push_back(Ok(INFO_REQUEST.to_vec()));

    assert_eq!(run(&router, &mut stream, 1024), SessionEnd::PeerClosed);
    assert_eq!(stream.responses().len(), 1);
}

#[rstest]
fn a_read_error_ends_the_session(router: CommandRouter) {
    let mut stream = ScriptedStream::default();
    stream
        .reads
        .push_back(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));

    assert_eq!(run(&router, &mut stream, 1024), SessionEnd::ReadFailed);
}

#[rstest]
fn one_failed_error_response_is_tolerated(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([
        b"{\"type\":\"bogus_a\"}".to_vec(),
        b"{\"type\":\"bogus_b\"}".to_vec(),
    ]);
    stream.failing_writes = 1;

    assert_eq!(run(&router, &mut stream, 1024), SessionEnd::PeerClosed);
    assert_eq!(
        stream.responses(),
        vec![Response::error("Unknown command: bogus_b")]
    );
}

#[rstest]
fn two_failed_error_responses_end_the_session(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([
        b"{\"type\":\"bogus_a\"}".to_vec(),
        b"{\"type\":\"bogus_b\"}".to_vec(),
        b"{\"type\":\"bogus_c\"}".to_vec(),
    ]);
    stream.failing_writes = 2;

    assert_eq!(run(&router, &mut stream, 1024), SessionEnd::WriteFailed);
    assert!(stream.responses().is_empty());
}

#[rstest]
fn a_failed_success_response_ends_the_session(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([INFO_REQUEST.to_vec(), INFO_REQUEST.to_vec()]);
    stream.failing_writes = 1;

    assert_eq!(run(&router, &mut stream, 1024), SessionEnd::WriteFailed);
}

#[rstest]
fn raised_shutdown_flag_stops_the_loop(router: CommandRouter) {
    let mut stream = ScriptedStream::with_chunks([INFO_REQUEST.to_vec()]);
    let end = Session::new(&router, 1024).run(&mut stream, &AtomicBool::new(true));

    assert_eq!(end, SessionEnd::Shutdown);
    assert!(stream.written.is_empty());
}

#[test]
fn split_documents_keeps_incomplete_tail() {
    let (documents, consumed) = split_documents(b"{\"a\":1} {\"b\":");
    assert_eq!(documents, vec![json!({"a": 1})]);
    assert_eq!(consumed, 7);
}

#[test]
fn split_documents_consumes_trailing_whitespace() {
    let buffer = b"{\"a\":1}\n \n";
    let (documents, consumed) = split_documents(buffer);
    assert_eq!(documents.len(), 1);
    assert_eq!(consumed, buffer.len());
}

#[test]
fn split_documents_waits_on_malformed_input() {
    let (documents, consumed) = split_documents(b"not json {\"a\":1}");
    assert!(documents.is_empty());
    assert_eq!(consumed, 0);
}
