#![no_main]

use std::io::Cursor;

use chnative_decoder::{DecoderConfig, ResponseReader, ServerEvent};
use libfuzzer_sys::fuzz_target;

// Fuzz target: the response dispatcher on arbitrary server bytes.
//
// The first byte picks the entry point and whether blocks are framed;
// the rest is the response. Catches bugs in:
// - Discriminator routing and unknown packet codes
// - Block, log and profile-event decoding on malformed columns
// - Compressed frame headers, zstd payloads, size limits
// - Exception chains of arbitrary depth
fuzz_target!(|data: &[u8]| {
    let Some((&mode, response)) = data.split_first() else {
        return;
    };
    let config = DecoderConfig::default()
        .with_compression(mode & 1 != 0)
        .with_max_block_size(1 << 20);
    let mut reader = ResponseReader::with_config(Cursor::new(response), config);
    let mut events: Vec<ServerEvent> = Vec::new();

    if mode & 2 != 0 {
        let _ = reader.first_block(&mut events);
    } else {
        let _ = reader.process(&mut events);
    }
    assert!(reader.offset() <= response.len() as u64);
});
