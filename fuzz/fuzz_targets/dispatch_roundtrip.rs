#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use chnative_decoder::{DecoderConfig, ResponseReader, ServerEvent};
use chnative_encoder::ResponseEncoder;
use chnative_types::{
    Block, Column, ColumnData, LogEntry, ProfileEvent, ProfileEventType, Progress,
};
use chnative_wire::CompressionMethod;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzPacket {
    Data {
        start: u32,
        rows: u8,
        label: String,
    },
    Progress {
        rows: u64,
        bytes: u64,
        total_rows: u64,
        written_rows: u64,
        written_bytes: u64,
        elapsed_ns: u64,
    },
    Logs(Vec<(u32, i8, String)>),
    ProfileEvents(Vec<(String, bool, i64)>),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    packets: Vec<FuzzPacket>,
    compress: bool,
    frame_size: u16,
}

fn block(start: u32, rows: u8, label: &str) -> Block {
    let numbers: Vec<u64> = (0..u64::from(rows)).map(|i| u64::from(start) + i).collect();
    let labels = vec![label.to_string(); numbers.len()];
    Block::from_columns(vec![
        Column::new("number", "UInt64", ColumnData::UInt64(numbers)).unwrap(),
        Column::new("label", "String", ColumnData::String(labels)).unwrap(),
    ])
    .unwrap()
}

// Fuzz target: encode an arbitrary packet sequence, dispatch it, and
// check the handler saw exactly the same events in the same order.
fuzz_target!(|input: FuzzInput| {
    let mut encoder = ResponseEncoder::new();
    if input.compress {
        encoder
            .compress_blocks(CompressionMethod::Zstd)
            .with_frame_size(usize::from(input.frame_size));
    }

    let mut expected = Vec::new();
    for packet in &input.packets {
        match packet {
            FuzzPacket::Data { start, rows, label } => {
                let b = block(*start, *rows, label);
                encoder.data(b.clone());
                expected.push(ServerEvent::Data(b));
            }
            FuzzPacket::Progress {
                rows,
                bytes,
                total_rows,
                written_rows,
                written_bytes,
                elapsed_ns,
            } => {
                let p = Progress {
                    rows: *rows,
                    bytes: *bytes,
                    total_rows: *total_rows,
                    written_rows: *written_rows,
                    written_bytes: *written_bytes,
                    elapsed_ns: *elapsed_ns,
                };
                encoder.progress(p);
                expected.push(ServerEvent::Progress(p));
            }
            FuzzPacket::Logs(lines) => {
                let entries: Vec<LogEntry> = lines
                    .iter()
                    .map(|(time, priority, text)| LogEntry {
                        event_time: *time,
                        priority: *priority,
                        text: text.clone(),
                        ..LogEntry::default()
                    })
                    .collect();
                encoder.logs(&entries);
                expected.push(ServerEvent::Logs(entries));
            }
            FuzzPacket::ProfileEvents(counters) => {
                let events: Vec<ProfileEvent> = counters
                    .iter()
                    .map(|(name, gauge, value)| ProfileEvent {
                        host_name: String::new(),
                        current_time: 0,
                        thread_id: 0,
                        event_type: if *gauge {
                            ProfileEventType::Gauge
                        } else {
                            ProfileEventType::Increment
                        },
                        name: name.clone(),
                        value: *value,
                    })
                    .collect();
                encoder.profile_events(&events);
                expected.push(ServerEvent::ProfileEvents(events));
            }
        }
    }
    let bytes = encoder.end_of_stream().encode().unwrap();

    let config = DecoderConfig::default().with_compression(input.compress);
    let mut reader = ResponseReader::with_config(Cursor::new(&bytes), config);
    let mut events = Vec::new();
    reader.process(&mut events).unwrap();

    assert_eq!(events, expected);
    assert_eq!(reader.offset(), bytes.len() as u64);
});
