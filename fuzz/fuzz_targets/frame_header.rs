#![no_main]

use std::io::Cursor;

use chnative_wire::frame::{FrameHeader, FRAME_HEADER_SIZE};
use chnative_wire::ProtoReader;
use libfuzzer_sys::fuzz_target;

// Fuzz target: compressed frame header parsing.
//
// Any header that parses must describe a non-negative payload.
fuzz_target!(|data: &[u8]| {
    let mut r = ProtoReader::new(Cursor::new(data));
    if let Ok(header) = FrameHeader::read_from(&mut r) {
        assert!(header.compressed_size >= FRAME_HEADER_SIZE);
        assert_eq!(header.payload_len(), header.compressed_size - FRAME_HEADER_SIZE);
    }
});
