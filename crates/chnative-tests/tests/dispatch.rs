//! End-to-end dispatch over realistic responses.
//!
//! Responses are produced by `ResponseEncoder` and read back by
//! `ResponseReader` through the public API only. Categories:
//!
//! - **Routing**: every handler sees its events in wire order
//! - **first_block**: stops at the first result block, side channels
//!   before it are still routed
//! - **Handlers**: callback sets, channels across threads, collectors
//! - **Compression**: framed blocks decode identically to plain ones
//! - **Truncation**: every prefix of a valid response fails cleanly

use std::cell::RefCell;
use std::io::{self, Cursor};
use std::sync::mpsc;
use std::thread;

use chnative_decoder::{
    CallbackSet, DecodeError, DecoderConfig, EventChannel, PacketHandler, QueryCollector,
    ResponseReader, ServerEvent,
};
use chnative_encoder::ResponseEncoder;
use chnative_tests::{
    failing_response, header_block, insert_preamble, log_entry, missing_table_exception,
    numbers_block, profile_events, progress, select_response,
};
use chnative_types::Block;
use chnative_wire::CompressionMethod;

fn reader(bytes: Vec<u8>) -> ResponseReader<Cursor<Vec<u8>>> {
    ResponseReader::new(Cursor::new(bytes))
}

fn compressed_reader(bytes: Vec<u8>) -> ResponseReader<Cursor<Vec<u8>>> {
    ResponseReader::with_config(Cursor::new(bytes), DecoderConfig::default().with_compression(true))
}

fn events_of(bytes: Vec<u8>) -> (Vec<ServerEvent>, Result<(), DecodeError>) {
    let mut events = Vec::new();
    let result = reader(bytes).process(&mut events);
    (events, result)
}

// ── Routing ─────────────────────────────────────────────────────────────

#[test]
fn select_response_routes_every_event_in_order() {
    let (events, result) = events_of(select_response(2, 100, None));
    result.unwrap();

    let names: Vec<_> = events.iter().map(ServerEvent::name).collect();
    assert_eq!(
        names,
        [
            "data",
            "logs",
            "progress",
            "data",
            "progress",
            "data",
            "profile events",
            "logs",
        ]
    );
    assert_eq!(events[3], ServerEvent::Data(numbers_block(0, 100)));
    assert_eq!(events[5], ServerEvent::Data(numbers_block(100, 100)));
    assert_eq!(events[6], ServerEvent::ProfileEvents(profile_events()));
}

#[test]
fn collector_sums_progress_and_counts_rows() {
    let mut collector = QueryCollector::new();
    reader(select_response(4, 250, None)).process(&mut collector).unwrap();

    // header block + 4 result blocks
    assert_eq!(collector.blocks.len(), 5);
    assert_eq!(collector.rows(), 1000);
    assert_eq!(collector.progress_packets, 4);
    assert_eq!(collector.progress.rows, 1000);
    assert_eq!(collector.progress.bytes, 16_000);
    assert_eq!(collector.logs.len(), 2);
    assert_eq!(collector.profile_events.len(), 3);
}

#[test]
fn totals_and_extremes_reach_the_data_handler() {
    let bytes = ResponseEncoder::new()
        .data(numbers_block(0, 3))
        .totals(numbers_block(3, 1))
        .extremes(numbers_block(0, 2))
        .end_of_stream()
        .encode()
        .unwrap();

    let mut blocks = Vec::new();
    let mut handler = CallbackSet::new().with_data(|b: Block| blocks.push(b.num_rows));
    reader(bytes).process(&mut handler).unwrap();
    drop(handler);
    assert_eq!(blocks, [3, 1, 2]);
}

#[test]
fn unset_callbacks_are_skipped() {
    let progress_rows = RefCell::new(Vec::new());
    let mut handler =
        CallbackSet::new().with_progress(|p| progress_rows.borrow_mut().push(p.rows));
    reader(select_response(3, 10, None)).process(&mut handler).unwrap();
    assert_eq!(*progress_rows.borrow(), [10, 10, 10]);
}

#[test]
fn table_columns_are_consumed_without_a_handler_call() {
    let (events, result) = events_of(insert_preamble());
    result.unwrap();
    assert_eq!(events, [ServerEvent::Data(numbers_block(0, 0))]);
}

#[test]
fn exception_stops_dispatch_and_surfaces_the_chain() {
    let (events, result) = events_of(failing_response());

    assert_eq!(events.len(), 2, "header and progress precede the exception");
    let err = result.unwrap_err();
    assert!(err.is_server_exception());
    let exception = err.server_exception().unwrap();
    assert_eq!(exception, &missing_table_exception());
    let codes: Vec<_> = exception.chain().map(|e| e.code).collect();
    assert_eq!(codes, [60, 1000]);
}

#[test]
fn reader_can_be_reused_for_the_next_response() {
    let mut bytes = select_response(1, 5, None);
    bytes.extend(select_response(1, 7, None));
    let mut r = reader(bytes);

    let mut first = QueryCollector::new();
    r.process(&mut first).unwrap();
    let mut second = QueryCollector::new();
    r.process(&mut second).unwrap();

    assert_eq!(first.rows(), 5);
    assert_eq!(second.rows(), 7);
    assert!(r.process(&mut ()).unwrap_err().is_end_of_input());
}

// ── first_block ─────────────────────────────────────────────────────────

#[test]
fn first_block_returns_the_header_and_routes_side_channels_before_it() {
    let bytes = ResponseEncoder::new()
        .logs(&[log_entry("query started")])
        .progress(progress(0))
        .data(header_block())
        .progress(progress(50))
        .data(numbers_block(0, 50))
        .end_of_stream()
        .encode()
        .unwrap();
    let mut r = reader(bytes);

    let mut before = Vec::new();
    let header = r.first_block(&mut before).unwrap();
    assert_eq!(header, header_block());
    let names: Vec<_> = before.iter().map(ServerEvent::name).collect();
    assert_eq!(names, ["logs", "progress"]);

    let mut rest = QueryCollector::new();
    r.process(&mut rest).unwrap();
    assert_eq!(rest.rows(), 50);
    assert_eq!(rest.progress_packets, 1);
}

#[test]
fn first_block_after_totals_still_waits_for_data() {
    let bytes = ResponseEncoder::new()
        .totals(numbers_block(9, 1))
        .data(numbers_block(0, 2))
        .end_of_stream()
        .encode()
        .unwrap();
    let mut events = Vec::new();
    let block = reader(bytes).first_block(&mut events).unwrap();
    assert_eq!(block.num_rows, 2);
    assert_eq!(events, [ServerEvent::Data(numbers_block(9, 1))]);
}

#[test]
fn first_block_on_an_empty_result_is_end_of_input() {
    let bytes = ResponseEncoder::new()
        .progress(progress(0))
        .end_of_stream()
        .encode()
        .unwrap();
    let err = reader(bytes).first_block(&mut ()).unwrap_err();
    assert!(err.is_end_of_input());
}

#[test]
fn first_block_surfaces_exceptions() {
    let bytes = ResponseEncoder::new()
        .exception(missing_table_exception())
        .encode()
        .unwrap();
    let err = reader(bytes).first_block(&mut ()).unwrap_err();
    assert_eq!(err.server_exception().map(|e| e.code), Some(60));
}

// ── Handlers ────────────────────────────────────────────────────────────

#[test]
fn channel_handler_feeds_a_consumer_thread() {
    let (tx, rx) = mpsc::channel::<ServerEvent>();
    let consumer = thread::spawn(move || {
        rx.iter()
            .filter_map(|event| match event {
                ServerEvent::Data(block) => Some(block.num_rows),
                _ => None,
            })
            .sum::<usize>()
    });

    let mut channel = EventChannel::new(tx);
    reader(select_response(5, 200, None)).process(&mut channel).unwrap();
    assert_eq!(channel.dropped(), 0);
    drop(channel);
    assert_eq!(consumer.join().unwrap(), 1000);
}

#[test]
fn disconnected_channel_reports_every_undelivered_event() {
    let (tx, rx) = mpsc::channel::<ServerEvent>();
    drop(rx);
    let mut channel = EventChannel::new(tx);
    let mut all = Vec::new();
    reader(select_response(2, 10, None)).process(&mut all).unwrap();

    reader(select_response(2, 10, None)).process(&mut channel).unwrap();
    assert!(channel.is_disconnected());
    assert_eq!(channel.dropped(), all.len());
}

/// A handler written against the trait directly.
#[derive(Default)]
struct RowBudget {
    rows: usize,
    warnings: Vec<String>,
}

impl PacketHandler for RowBudget {
    fn on_data(&mut self, block: Block) {
        self.rows += block.num_rows;
    }

    fn on_logs(&mut self, logs: Vec<chnative_types::LogEntry>) {
        self.warnings
            .extend(logs.into_iter().filter(|l| l.priority <= 4).map(|l| l.text));
    }
}

#[test]
fn custom_handler_only_sees_what_it_implements() {
    let mut warn = log_entry("Table is in readonly mode");
    warn.priority = 4;
    let bytes = ResponseEncoder::new()
        .logs(&[log_entry("Read 10 rows"), warn])
        .progress(progress(10))
        .data(numbers_block(0, 10))
        .end_of_stream()
        .encode()
        .unwrap();

    let mut budget = RowBudget::default();
    reader(bytes).process(&mut budget).unwrap();
    assert_eq!(budget.rows, 10);
    assert_eq!(budget.warnings, ["Table is in readonly mode"]);
}

#[test]
fn boxed_handler_dispatches_dynamically() {
    let mut handler: Box<dyn PacketHandler> = Box::new(QueryCollector::new());
    reader(select_response(1, 3, None)).process(handler.as_mut()).unwrap();
}

// ── Compression ─────────────────────────────────────────────────────────

#[test]
fn compressed_responses_match_plain_ones() {
    let plain = {
        let mut c = QueryCollector::new();
        reader(select_response(3, 5000, None)).process(&mut c).unwrap();
        c
    };
    for method in [CompressionMethod::None, CompressionMethod::Zstd] {
        let mut c = QueryCollector::new();
        compressed_reader(select_response(3, 5000, Some(method)))
            .process(&mut c)
            .unwrap();
        assert_eq!(c, plain, "{method:?}");
    }
}

#[test]
fn zstd_shrinks_repetitive_blocks() {
    let plain = select_response(4, 10_000, None);
    let zstd = select_response(4, 10_000, Some(CompressionMethod::Zstd));
    assert!(zstd.len() < plain.len(), "{} vs {}", zstd.len(), plain.len());
}

#[test]
fn blocks_spanning_many_frames_decode() {
    let bytes = ResponseEncoder::new()
        .compress_blocks(CompressionMethod::Zstd)
        .with_frame_size(512)
        .data(numbers_block(0, 20_000))
        .logs(&[log_entry("side channels are never framed")])
        .end_of_stream()
        .encode()
        .unwrap();

    let mut c = QueryCollector::new();
    compressed_reader(bytes).process(&mut c).unwrap();
    assert_eq!(c.blocks, [numbers_block(0, 20_000)]);
    assert_eq!(c.logs.len(), 1);
}

// ── Truncation ──────────────────────────────────────────────────────────

fn assert_clean_truncation(
    full: &[u8],
    mut open: impl FnMut(Vec<u8>) -> ResponseReader<Cursor<Vec<u8>>>,
) {
    let mut all = Vec::new();
    open(full.to_vec()).process(&mut all).unwrap();

    for cut in 0..full.len() {
        let mut seen = Vec::new();
        let err = open(full[..cut].to_vec())
            .process(&mut seen)
            .expect_err("a truncated response cannot reach EndOfStream");
        match &err {
            DecodeError::EndOfInput => {}
            DecodeError::Transport(e) => {
                assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof, "cut {cut}");
            }
            other => panic!("cut at {cut}: unexpected {other:?}"),
        }
        assert_eq!(seen[..], all[..seen.len()], "cut {cut}: events diverged");
    }
}

#[test]
fn every_prefix_of_a_plain_response_fails_cleanly() {
    let full = ResponseEncoder::new()
        .data(header_block())
        .logs(&[log_entry("a")])
        .progress(progress(3))
        .data(numbers_block(0, 3))
        .profile_info(chnative_tests::profile_info(3, 1))
        .profile_events(&profile_events()[..1])
        .end_of_stream()
        .encode()
        .unwrap();
    assert_clean_truncation(&full, reader);
}

#[test]
fn every_prefix_of_a_compressed_response_fails_cleanly() {
    let full = ResponseEncoder::new()
        .compress_blocks(CompressionMethod::Zstd)
        .with_frame_size(64)
        .progress(progress(30))
        .data(numbers_block(0, 30))
        .end_of_stream()
        .encode()
        .unwrap();
    assert_clean_truncation(&full, compressed_reader);
}
