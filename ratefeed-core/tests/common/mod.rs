//! Shared fakes for integration tests: scripted quote source, recording store,
//! pacer and progress, plus a one-shot HTTP server.

#![allow(dead_code)]

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use ratefeed_core::data::provider::{FetchError, FetchResult, QuoteSource};
use ratefeed_core::domain::RatePoint;
use ratefeed_core::persist::PersistOutcome;
use ratefeed_core::pipeline::{Pacer, PipelineProgress, RunOptions, RunReport};
use ratefeed_core::store::{RateRecord, RateStore, StoreError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::days(n)
}

pub fn points(values: &[f64]) -> Vec<RatePoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| RatePoint::new(day(i as i64), v).unwrap())
        .collect()
}

pub fn options(chunk_size: usize) -> RunOptions {
    RunOptions {
        window_days: 30,
        chunk_size,
        pacing: Duration::from_millis(1000),
        table: "historical_rates".into(),
    }
}

/// Ordered log of everything the fakes observed, shared across them.
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

// ── Quote source ─────────────────────────────────────────────────────

pub struct FakeSource {
    responses: HashMap<String, Result<Vec<RatePoint>, FetchError>>,
    log: EventLog,
}

impl FakeSource {
    pub fn new(log: EventLog) -> Self {
        Self {
            responses: HashMap::new(),
            log,
        }
    }

    pub fn with(mut self, symbol: &str, response: Result<Vec<RatePoint>, FetchError>) -> Self {
        self.responses.insert(symbol.to_string(), response);
        self
    }
}

impl QuoteSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch(&self, symbol: &str, _window_days: u32) -> Result<FetchResult, FetchError> {
        self.log.borrow_mut().push(format!("fetch {symbol}"));
        match self.responses.get(symbol) {
            Some(Ok(points)) => Ok(FetchResult {
                symbol: symbol.to_string(),
                points: points.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::Status { status: 404 }),
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

pub struct RecordingStore {
    pub batches: RefCell<Vec<Vec<RateRecord>>>,
    fail_calls: Vec<usize>,
    log: EventLog,
}

impl RecordingStore {
    pub fn new(log: EventLog) -> Self {
        Self::failing_on(log, vec![])
    }

    /// Fails the insert calls at the given zero-based call indices.
    pub fn failing_on(log: EventLog, fail_calls: Vec<usize>) -> Self {
        Self {
            batches: RefCell::new(Vec::new()),
            fail_calls,
            log,
        }
    }

    pub fn rows_for(&self, pair: &str) -> Vec<RateRecord> {
        self.batches
            .borrow()
            .iter()
            .flatten()
            .filter(|r| r.pair == pair)
            .cloned()
            .collect()
    }
}

impl RateStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    fn insert(&self, _table: &str, rows: &[RateRecord]) -> Result<(), StoreError> {
        let mut batches = self.batches.borrow_mut();
        let index = batches.len();
        batches.push(rows.to_vec());
        let pair = rows.first().map(|r| r.pair.as_str()).unwrap_or("-");
        self.log
            .borrow_mut()
            .push(format!("insert {pair} {}", rows.len()));
        if self.fail_calls.contains(&index) {
            Err(StoreError::Write(format!("injected failure on call {index}")))
        } else {
            Ok(())
        }
    }
}

// ── Pacer / progress ─────────────────────────────────────────────────

pub struct RecordingPacer {
    log: EventLog,
}

impl RecordingPacer {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, delay: Duration) {
        self.log
            .borrow_mut()
            .push(format!("pause {}ms", delay.as_millis()));
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub lines: RefCell<Vec<String>>,
}

impl PipelineProgress for RecordingProgress {
    fn on_fetch_start(&self, symbol: &str, index: usize, total: usize) {
        self.lines
            .borrow_mut()
            .push(format!("start {symbol} {}/{total}", index + 1));
    }

    fn on_fetch_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, FetchError>,
    ) {
        let line = match result {
            Ok(n) => format!("ok {symbol} {n}"),
            Err(e) => format!("fail {symbol}: {e}"),
        };
        self.lines.borrow_mut().push(line);
    }

    fn on_save_complete(&self, outcome: &PersistOutcome) {
        self.lines.borrow_mut().push(format!(
            "saved {} {}/{}",
            outcome.pair, outcome.written, outcome.requested
        ));
    }

    fn on_run_complete(&self, report: &RunReport) {
        self.lines
            .borrow_mut()
            .push(format!("done {}", report.total_written));
    }
}

// ── One-shot HTTP server ─────────────────────────────────────────────

/// Accepts a single connection, answers with a canned response and hands back
/// the raw request text.
pub struct OneShotServer {
    pub url: String,
    handle: JoinHandle<String>,
}

impl OneShotServer {
    pub fn start(status_line: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });

        Self {
            url: format!("http://{addr}"),
            handle,
        }
    }

    /// Raw request as received by the server.
    pub fn request(self) -> String {
        self.handle.join().unwrap()
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf).into_owned()
}
