//! Shared fixtures: realistic server responses built with
//! [`ResponseEncoder`], used by the integration tests, the benches and
//! the `write_fixtures` binary.

use chnative_encoder::ResponseEncoder;
use chnative_types::{
    Block, Column, ColumnData, LogEntry, ProfileEvent, ProfileEventType, ProfileInfo, Progress,
    ServerException, TableColumns,
};
use chnative_wire::CompressionMethod;

/// `SELECT number, toString(number) AS s FROM numbers(start, rows)`.
pub fn numbers_block(start: u64, rows: u64) -> Block {
    let numbers: Vec<u64> = (start..start + rows).collect();
    let strings = numbers.iter().map(ToString::to_string).collect();
    Block::from_columns(vec![
        Column::new("number", "UInt64", ColumnData::UInt64(numbers)).unwrap(),
        Column::new("s", "String", ColumnData::String(strings)).unwrap(),
    ])
    .unwrap()
}

/// The column header a server sends before the first result block.
pub fn header_block() -> Block {
    numbers_block(0, 0)
}

pub fn progress(rows: u64) -> Progress {
    Progress {
        rows,
        bytes: rows * 16,
        total_rows: 0,
        written_rows: 0,
        written_bytes: 0,
        elapsed_ns: 1_000 * rows,
    }
}

pub fn log_entry(text: &str) -> LogEntry {
    LogEntry {
        event_time: 1_700_000_000,
        event_time_microseconds: 0,
        host_name: "clickhouse-01".into(),
        query_id: "5d7e3a1c".into(),
        thread_id: 4242,
        priority: 6,
        source: "executeQuery".into(),
        text: text.into(),
    }
}

pub fn profile_events() -> Vec<ProfileEvent> {
    let event = |name: &str, event_type, value| ProfileEvent {
        host_name: "clickhouse-01".into(),
        current_time: 1_700_000_000,
        thread_id: 4242,
        event_type,
        name: name.into(),
        value,
    };
    vec![
        event("SelectedRows", ProfileEventType::Increment, 8192),
        event("SelectedBytes", ProfileEventType::Increment, 65536),
        event("MemoryTrackerUsage", ProfileEventType::Gauge, 4_194_304),
    ]
}

pub fn profile_info(rows: u64, blocks: u64) -> ProfileInfo {
    ProfileInfo {
        rows,
        blocks,
        bytes: rows * 16,
        ..ProfileInfo::default()
    }
}

/// A full `SELECT` response: header, `blocks` result blocks of `rows`
/// rows each with progress and logs interleaved, profile info, profile
/// events, EndOfStream.
pub fn select_response(blocks: u64, rows: u64, compression: Option<CompressionMethod>) -> Vec<u8> {
    let mut encoder = ResponseEncoder::new();
    if let Some(method) = compression {
        encoder.compress_blocks(method);
    }
    encoder
        .data(header_block())
        .logs(&[log_entry("SELECT number, toString(number) AS s FROM numbers(...)")]);
    for i in 0..blocks {
        encoder.progress(progress(rows)).data(numbers_block(i * rows, rows));
    }
    encoder
        .profile_info(profile_info(blocks * rows, blocks))
        .profile_events(&profile_events())
        .logs(&[log_entry("Peak memory usage: 4.00 MiB.")])
        .end_of_stream()
        .encode()
        .unwrap()
}

/// An `INSERT` preamble: the server describes the target table, then
/// sends its empty header block.
pub fn insert_preamble() -> Vec<u8> {
    ResponseEncoder::new()
        .table_columns(TableColumns {
            table_name: "events".into(),
            description: "columns format version: 1\n1 columns:\n`id` UInt64\n".into(),
        })
        .data(numbers_block(0, 0))
        .end_of_stream()
        .encode()
        .unwrap()
}

pub fn missing_table_exception() -> ServerException {
    ServerException::new(60, "DB::Exception", "Table default.missing does not exist")
        .with_nested(ServerException::new(
            1000,
            "DB::Exception",
            "while executing 'SELECT * FROM missing'",
        ))
}

/// A response that fails partway: progress, then an exception.
pub fn failing_response() -> Vec<u8> {
    ResponseEncoder::new()
        .data(header_block())
        .progress(progress(10))
        .exception(missing_table_exception())
        .encode()
        .unwrap()
}
