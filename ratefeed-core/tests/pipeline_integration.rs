//! Integration tests for the ingestion pipeline: fetch → derive → pace →
//! persist → report, with scripted collaborators.

mod common;

use common::*;
use ratefeed_core::data::{parse_chart, FetchError};
use ratefeed_core::domain::{PairEntry, PairTable};
use ratefeed_core::pipeline::{Pipeline, QuietProgress};
use ratefeed_core::store::SqliteStore;

fn table(symbols: &[&str]) -> PairTable {
    PairTable::default_fx().restrict(symbols).unwrap()
}

#[test]
fn end_to_end_example_with_null_close() {
    // Three days, the last close is null.
    let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},
        "timestamp":[1704067200,1704153600,1704240000],
        "indicators":{"quote":[{"close":[5.0,4.0,null]}]}}],"error":null}}"#;
    let normalized = parse_chart(body).unwrap();
    assert_eq!(normalized.len(), 2);

    let log = event_log();
    let source = FakeSource::new(log.clone()).with("EURUSD=X", Ok(normalized));
    let store = RecordingStore::new(log.clone());
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["EURUSD=X"]);

    let pipeline = Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress);
    let report = pipeline.run(&options(1));

    // chunk size 1: two single-row writes per pair
    let batches = store.batches.borrow();
    assert_eq!(batches.len(), 4);
    assert!(batches.iter().all(|b| b.len() == 1));

    let direct: Vec<f64> = store.rows_for("eurusd").iter().map(|r| r.rate).collect();
    let derived: Vec<f64> = store.rows_for("usdeur").iter().map(|r| r.rate).collect();
    assert_eq!(direct, vec![5.0, 4.0]);
    assert_eq!(derived, vec![0.2, 0.25]);

    assert_eq!(store.rows_for("usdeur")[0].timestamp, "2024-01-01T00:00:00Z");
    assert_eq!(store.rows_for("usdeur")[1].timestamp, "2024-01-02T00:00:00Z");

    assert_eq!(report.total_written, 4);
    assert_eq!(report.total_requested, 4);
    assert_eq!(report.pairs_processed, 2);
    assert_eq!(report.per_pair["eurusd"].written, 2);
    assert_eq!(report.per_pair["usdeur"].written, 2);
    assert_eq!(report.per_pair["usdeur"].derived_from.as_deref(), Some("eurusd"));
    assert!(report.is_complete());
}

#[test]
fn failed_symbol_does_not_stop_the_run() {
    let log = event_log();
    let source = FakeSource::new(log.clone())
        .with("EURUSD=X", Ok(points(&[1.10, 1.11])))
        .with("GBPUSD=X", Err(FetchError::Transport("connection reset".into())))
        .with("USDJPY=X", Ok(points(&[145.0, 146.0, 147.0])));
    let store = RecordingStore::new(log.clone());
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["EURUSD=X", "GBPUSD=X", "USDJPY=X"]);

    let report =
        Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress).run(&options(1000));

    assert_eq!(report.failed_symbols.len(), 1);
    assert_eq!(report.failed_symbols[0].symbol, "GBPUSD=X");
    assert!(report.failed_symbols[0].error.contains("connection reset"));

    assert_eq!(report.pairs_processed, 4);
    assert_eq!(report.total_written, 10);
    assert!(report.per_pair.contains_key("jpyusd"));
    assert!(!report.per_pair.contains_key("gbpusd"));
    assert!(!report.per_pair.contains_key("usdgbp"));
    assert!(!report.is_complete());
}

#[test]
fn fetches_are_paced_and_precede_all_writes() {
    let log = event_log();
    let source = FakeSource::new(log.clone())
        .with("EURUSD=X", Ok(points(&[1.10])))
        .with("GBPUSD=X", Err(FetchError::Status { status: 429 }))
        .with("USDJPY=X", Ok(points(&[145.0, 146.0])));
    let store = RecordingStore::new(log.clone());
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["EURUSD=X", "GBPUSD=X", "USDJPY=X"]);

    Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress).run(&options(1000));

    assert_eq!(
        *log.borrow(),
        vec![
            "fetch EURUSD=X",
            "pause 1000ms",
            "fetch GBPUSD=X",
            "pause 1000ms",
            "fetch USDJPY=X",
            "insert eurusd 1",
            "insert usdeur 1",
            "insert usdjpy 2",
            "insert jpyusd 2",
        ]
    );
}

#[test]
fn failed_chunk_reduces_written_count_only() {
    let log = event_log();
    let source = FakeSource::new(log.clone()).with("EURUSD=X", Ok(points(&[1.0, 2.0, 4.0])));
    // Call 1 is the second chunk of the direct series.
    let store = RecordingStore::failing_on(log.clone(), vec![1]);
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["EURUSD=X"]);

    let report =
        Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress).run(&options(2));

    assert_eq!(store.batches.borrow().len(), 4);
    assert_eq!(report.total_requested, 6);
    assert_eq!(report.total_written, 5);
    assert_eq!(report.per_pair["eurusd"].written, 2);
    assert_eq!(report.per_pair["eurusd"].failed_chunks, 1);
    assert_eq!(report.per_pair["usdeur"].written, 3);
    assert!(report.failed_symbols.is_empty());
}

#[test]
fn dry_run_persists_nothing() {
    let log = event_log();
    let source = FakeSource::new(log.clone())
        .with("EURUSD=X", Ok(points(&[1.10, 1.12])))
        .with("USDJPY=X", Ok(points(&[145.0])));
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["EURUSD=X", "USDJPY=X"]);

    let report = Pipeline::new(&source, None, &pairs, &pacer, &QuietProgress).run(&options(1000));

    assert!(report.dry_run);
    assert_eq!(report.total_written, 0);
    assert_eq!(report.total_requested, 6);
    assert_eq!(report.pairs_processed, 4);
    assert_eq!(report.per_pair["usdeur"].requested, 2);
    assert!(!log.borrow().iter().any(|e| e.starts_with("insert")));
}

#[test]
fn progress_reports_each_phase() {
    let log = event_log();
    let source = FakeSource::new(log.clone())
        .with("EURUSD=X", Ok(points(&[1.10, 1.12])))
        .with("USDJPY=X", Err(FetchError::EmptyResult("result array is empty".into())));
    let store = RecordingStore::new(log.clone());
    let pacer = RecordingPacer::new(log.clone());
    let progress = RecordingProgress::default();
    let pairs = table(&["EURUSD=X", "USDJPY=X"]);

    Pipeline::new(&source, Some(&store), &pairs, &pacer, &progress).run(&options(1000));

    assert_eq!(
        *progress.lines.borrow(),
        vec![
            "start EURUSD=X 1/2",
            "ok EURUSD=X 2",
            "start USDJPY=X 2/2",
            "fail USDJPY=X: no usable series: result array is empty",
            "saved eurusd 2/2",
            "saved usdeur 2/2",
            "done 4",
        ]
    );
}

#[test]
fn sqlite_store_receives_direct_and_reciprocal_rows() {
    let log = event_log();
    let source = FakeSource::new(log.clone()).with("GBPUSD=X", Ok(points(&[1.25, 1.28])));
    let store = SqliteStore::open_in_memory("historical_rates").unwrap();
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["GBPUSD=X"]);

    let report =
        Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress).run(&options(1000));
    assert_eq!(report.total_written, 4);

    let direct = store.load("historical_rates", "gbpusd").unwrap();
    let reciprocal = store.load("historical_rates", "usdgbp").unwrap();
    assert_eq!(direct.len(), 2);
    assert_eq!(reciprocal.len(), 2);
    assert_eq!(reciprocal[0].rate, 0.8);
    assert_eq!(reciprocal[0].timestamp, direct[0].timestamp);
    assert_eq!(store.count("historical_rates", None).unwrap(), 4);
}

#[test]
fn report_serializes_to_json() {
    let log = event_log();
    let source = FakeSource::new(log.clone()).with("EURUSD=X", Ok(points(&[2.0])));
    let store = RecordingStore::new(log.clone());
    let pacer = RecordingPacer::new(log.clone());
    let pairs = table(&["EURUSD=X", "USDCAD=X"]);

    let report =
        Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress).run(&options(1000));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["total_written"], 2);
    assert_eq!(json["pairs_processed"], 2);
    assert_eq!(json["per_pair"]["usdeur"]["derived_from"], "eurusd");
    assert!(json["per_pair"]["eurusd"].get("derived_from").is_none());
    assert_eq!(json["failed_symbols"][0]["symbol"], "USDCAD=X");
}

#[test]
fn derived_series_uses_the_entry_reciprocal_code() {
    let log = event_log();
    let source = FakeSource::new(log.clone()).with("BRL=X", Ok(points(&[5.0, 4.0])));
    let store = RecordingStore::new(log.clone());
    let pacer = RecordingPacer::new(log.clone());
    let pairs = PairTable::new(vec![PairEntry::new("BRL=X", "usdbrl", "brlusd").unwrap()]).unwrap();

    let report =
        Pipeline::new(&source, Some(&store), &pairs, &pacer, &QuietProgress).run(&options(1000));

    let derived: Vec<f64> = store.rows_for("brlusd").iter().map(|r| r.rate).collect();
    assert_eq!(derived, vec![0.2, 0.25]);
    assert_eq!(report.per_pair["brlusd"].derived_from.as_deref(), Some("usdbrl"));
}
